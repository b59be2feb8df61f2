//! Common test utilities.

use std::{
	cell::RefCell,
	collections::HashSet,
	io::{self, ErrorKind, Write},
};

use serde_json::{json, Value};

use crate::{
	cluster::{ClusterClient, FetchError},
	object::DesiredObject,
};

/// A writer that simulates a broken pipe (SIGPIPE scenario).
///
/// This writer immediately returns `ErrorKind::BrokenPipe` on any write attempt,
/// simulating what happens when stdout is connected to a process that has exited.
pub struct BrokenPipeWriter;

impl Write for BrokenPipeWriter {
	fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
		Err(io::Error::new(ErrorKind::BrokenPipe, "broken pipe"))
	}

	fn flush(&mut self) -> io::Result<()> {
		Err(io::Error::new(ErrorKind::BrokenPipe, "broken pipe"))
	}
}

pub fn object(value: Value) -> DesiredObject {
	DesiredObject::new(value).expect("valid test object")
}

pub fn configmap(name: &str) -> DesiredObject {
	object(json!({
		"apiVersion": "v1",
		"kind": "ConfigMap",
		"metadata": {"name": name}
	}))
}

pub fn service(name: &str) -> DesiredObject {
	object(json!({
		"apiVersion": "v1",
		"kind": "Service",
		"metadata": {"name": name},
		"spec": {"ports": [{"port": 80}]}
	}))
}

/// An in-memory cluster.
///
/// Resource names are the lower-cased kind with an `s` appended. Every
/// fetch is recorded as `<Kind> <namespace>/<name>` (or `<Kind> <name>`).
#[derive(Default)]
pub struct FakeCluster {
	live: Vec<Value>,
	cluster_scoped: HashSet<String>,
	failing: HashSet<String>,
	fetched: RefCell<Vec<String>>,
}

impl FakeCluster {
	pub fn new() -> Self {
		Self::default()
	}

	/// Add a live object. A missing namespace means `default`.
	pub fn with_live(mut self, value: Value) -> Self {
		self.live.push(value);
		self
	}

	pub fn cluster_scoped(mut self, kind: &str) -> Self {
		self.cluster_scoped.insert(kind.to_string());
		self
	}

	/// Fail every fetch of an object with this name.
	pub fn failing(mut self, name: &str) -> Self {
		self.failing.insert(name.to_string());
		self
	}

	pub fn fetched(&self) -> Vec<String> {
		self.fetched.borrow().clone()
	}

	fn find(&self, kind: &str, namespace: Option<&str>, name: &str) -> Option<Value> {
		self.live
			.iter()
			.find(|live| {
				let live_namespace = live
					.pointer("/metadata/namespace")
					.and_then(Value::as_str)
					.unwrap_or("default");
				live["kind"] == kind
					&& live["metadata"]["name"] == name
					&& namespace.is_none_or(|ns| ns == live_namespace)
			})
			.cloned()
	}
}

impl ClusterClient for FakeCluster {
	fn resource_kind_for(&self, object: &DesiredObject) -> String {
		format!("{}s", object.kind().to_lowercase())
	}

	fn is_namespaced(&self, object: &DesiredObject) -> bool {
		!self.cluster_scoped.contains(object.kind())
	}

	async fn get(
		&self,
		object: &DesiredObject,
		namespace: Option<&str>,
	) -> Result<Option<Value>, FetchError> {
		let key = match namespace {
			Some(ns) => format!("{} {}/{}", object.kind(), ns, object.name()),
			None => format!("{} {}", object.kind(), object.name()),
		};
		self.fetched.borrow_mut().push(key);

		if self.failing.contains(object.name()) {
			return Err(FetchError::UnknownResourceType {
				api_version: object.api_version().to_string(),
				kind: object.kind().to_string(),
			});
		}
		Ok(self.find(object.kind(), namespace, object.name()))
	}
}
