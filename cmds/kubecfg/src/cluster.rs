//! Read access to live cluster state.

use std::future::Future;

use serde_json::Value;
use thiserror::Error;

use crate::object::DesiredObject;

/// Errors that can occur while fetching a live object.
#[derive(Debug, Error)]
pub enum FetchError {
	#[error("unknown resource type: {api_version}/{kind}")]
	UnknownResourceType { api_version: String, kind: String },

	#[error("API request failed")]
	Request(#[source] Box<kube::Error>),

	#[error("decoding live object")]
	Decode(#[source] serde_json::Error),
}

/// The cluster as seen by the diff engine.
pub trait ClusterClient {
	/// Plural lower-case resource name used in reports, e.g. `deployments`.
	fn resource_kind_for(&self, object: &DesiredObject) -> String;

	/// Whether objects of this type live in a namespace.
	fn is_namespaced(&self, object: &DesiredObject) -> bool;

	/// Fetch the live counterpart of `object`. `Ok(None)` means it does not
	/// exist.
	fn get(
		&self,
		object: &DesiredObject,
		namespace: Option<&str>,
	) -> impl Future<Output = Result<Option<Value>, FetchError>>;
}
