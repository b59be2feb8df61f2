//! HTTP-based mock Kubernetes server using wiremock.
//!
//! The server is read-only: it answers discovery requests and GETs of single
//! objects, and records every request so tests can assert on what a client
//! fetched.

use std::{collections::HashMap, sync::Arc};

use bon::Builder;
use kube::config::{
	AuthInfo, Cluster, Context, Kubeconfig, NamedAuthInfo, NamedCluster, NamedContext,
};
use serde_json::{json, Value};
use tracing::{debug, trace};
use wiremock::{
	matchers::{header_regex, method, path, path_regex},
	Mock, MockServer, Request, ResponseTemplate,
};

use crate::{
	discovery::{DiscoveryMode, MockDiscovery},
	helpers::{api_path_for_manifest, split_resource_path, status},
};

type Resources = HashMap<(String, String), Value>;

/// A scripted failure for GETs of one object.
#[derive(Debug, Clone)]
pub struct MockFailure {
	/// Plural resource name, e.g. `configmaps`.
	pub resource: String,
	pub name: String,
	pub code: u16,
}

impl MockFailure {
	pub fn new(resource: &str, name: &str, code: u16) -> Self {
		Self {
			resource: resource.to_string(),
			name: name.to_string(),
			code,
		}
	}

	fn matches(&self, collection: &str, name: &str) -> bool {
		self.name == name && collection.rsplit('/').next() == Some(self.resource.as_str())
	}

	fn response(&self) -> ResponseTemplate {
		let reason = match self.code {
			401 => "Unauthorized",
			403 => "Forbidden",
			409 => "Conflict",
			_ => "InternalError",
		};
		let message = format!("{} \"{}\" failed with {}", self.resource, self.name, self.code);
		ResponseTemplate::new(self.code).set_body_json(status(self.code, reason, &message))
	}
}

/// A mock Kubernetes server exposed over HTTP.
#[derive(Builder)]
pub struct HttpMockK8sServer {
	#[builder(default)]
	discovery_mode: DiscoveryMode,
	#[builder(default)]
	discovery: MockDiscovery,
	/// Objects to serve. API paths are derived from apiVersion/kind using the
	/// discovery data; manifests of unknown kinds are ignored.
	#[builder(default)]
	resources: Vec<Value>,
	#[builder(default)]
	failures: Vec<MockFailure>,
}

/// A running HTTP mock server instance.
pub struct RunningHttpMockK8sServer {
	server: MockServer,
}

impl HttpMockK8sServer {
	/// Start the mock server with all configured resources.
	pub async fn start(self) -> RunningHttpMockK8sServer {
		let server = MockServer::start().await;
		debug!(uri = %server.uri(), "started mock K8s server");

		let mut resources = Resources::new();
		for manifest in self.resources {
			if let Some((api_path, name)) = api_path_for_manifest(&manifest, &self.discovery) {
				trace!(%api_path, %name, "registered resource");
				resources.insert((api_path, name), manifest);
			}
		}
		resources
			.entry(("/api/v1/namespaces".to_string(), "default".to_string()))
			.or_insert_with(|| {
				json!({
					"apiVersion": "v1",
					"kind": "Namespace",
					"metadata": { "name": "default" }
				})
			});

		mount_version(&server).await;
		mount_discovery(&server, &self.discovery, self.discovery_mode).await;
		mount_objects(&server, Arc::new(resources), Arc::new(self.failures)).await;

		RunningHttpMockK8sServer { server }
	}
}

impl RunningHttpMockK8sServer {
	/// Get the server's URI (e.g., "http://127.0.0.1:12345").
	pub fn uri(&self) -> String {
		self.server.uri()
	}

	/// Create a Kubeconfig pointing to this mock server.
	pub fn kubeconfig(&self) -> Kubeconfig {
		self.kubeconfig_with_context("mock-context")
	}

	/// Create a Kubeconfig pointing to this mock server with a custom context name.
	pub fn kubeconfig_with_context(&self, context_name: &str) -> Kubeconfig {
		let cluster_name = "mock-cluster";
		let user_name = "mock-user";

		Kubeconfig {
			clusters: vec![NamedCluster {
				name: cluster_name.to_string(),
				cluster: Some(Cluster {
					server: Some(self.uri()),
					insecure_skip_tls_verify: Some(true),
					..Default::default()
				}),
			}],
			contexts: vec![NamedContext {
				name: context_name.to_string(),
				context: Some(Context {
					cluster: cluster_name.to_string(),
					user: Some(user_name.to_string()),
					namespace: Some("default".to_string()),
					..Default::default()
				}),
			}],
			auth_infos: vec![NamedAuthInfo {
				name: user_name.to_string(),
				auth_info: Some(AuthInfo::default()),
			}],
			current_context: Some(context_name.to_string()),
			..Default::default()
		}
	}

	/// Paths of object GETs received so far, in arrival order.
	///
	/// Discovery and version requests are left out.
	pub async fn object_requests(&self) -> Vec<String> {
		self.server
			.received_requests()
			.await
			.unwrap_or_default()
			.into_iter()
			.filter(|req| req.method.as_str() == "GET")
			.map(|req| req.url.path().to_string())
			.filter(|p| is_object_path(p))
			.collect()
	}
}

/// Whether a path names a single object rather than a discovery document.
fn is_object_path(path: &str) -> bool {
	let segments = path.trim_matches('/').split('/').count();
	if path.starts_with("/apis/") {
		// apis/<group>/<version>/<plural>/<name>
		segments >= 5
	} else if path.starts_with("/api/") {
		// api/<version>/<plural>/<name>
		segments >= 4
	} else {
		false
	}
}

async fn mount_version(server: &MockServer) {
	Mock::given(method("GET"))
		.and(path("/version"))
		.respond_with(ResponseTemplate::new(200).set_body_json(json!({
			"major": "1",
			"minor": "31",
			"gitVersion": "v1.31.0",
			"gitCommit": "fake",
			"gitTreeState": "clean",
			"buildDate": "2024-01-01T00:00:00Z",
			"goVersion": "go1.22.0",
			"compiler": "gc",
			"platform": "linux/amd64"
		})))
		.mount(server)
		.await;
}

fn scope(namespaced: bool) -> &'static str {
	if namespaced {
		"Namespaced"
	} else {
		"Cluster"
	}
}

fn aggregated_group(group: &str, version: &str, resources: &[crate::MockApiResource]) -> Value {
	let resources: Vec<_> = resources
		.iter()
		.map(|r| {
			json!({
				"resource": r.name,
				"responseKind": { "group": group, "version": version, "kind": r.kind },
				"scope": scope(r.namespaced),
				"verbs": r.verbs,
			})
		})
		.collect();
	json!({
		"metadata": { "name": group },
		"versions": [{
			"version": version,
			"resources": resources,
			"freshness": "Current"
		}]
	})
}

fn legacy_resource_list(group_version: &str, resources: &[crate::MockApiResource]) -> Value {
	let resources: Vec<_> = resources
		.iter()
		.map(|r| {
			json!({
				"name": r.name,
				"singularName": "",
				"namespaced": r.namespaced,
				"kind": r.kind,
				"verbs": r.verbs,
			})
		})
		.collect();
	json!({
		"kind": "APIResourceList",
		"apiVersion": "v1",
		"groupVersion": group_version,
		"resources": resources
	})
}

async fn mount_discovery(server: &MockServer, discovery: &MockDiscovery, mode: DiscoveryMode) {
	// Aggregated responses need this exact content type to be parsed as such
	const AGGREGATED_DISCOVERY_CONTENT_TYPE: &str =
		"application/json;g=apidiscovery.k8s.io;v=v2;as=APIGroupDiscoveryList";

	let aggregated_core = json!({
		"kind": "APIGroupDiscoveryList",
		"apiVersion": "apidiscovery.k8s.io/v2",
		"items": [aggregated_group("", "v1", &discovery.core_resources)]
	});
	let aggregated_apis = json!({
		"kind": "APIGroupDiscoveryList",
		"apiVersion": "apidiscovery.k8s.io/v2",
		"items": discovery
			.group_resources
			.iter()
			.map(|(gv, rs)| {
				let (group, version) = gv.split_once('/').unwrap_or(("", gv));
				aggregated_group(group, version, rs)
			})
			.collect::<Vec<_>>()
	});

	for (endpoint, body) in [("/api", aggregated_core), ("/apis", aggregated_apis)] {
		let response = match mode {
			DiscoveryMode::Aggregated => ResponseTemplate::new(200)
				.set_body_raw(body.to_string().into_bytes(), AGGREGATED_DISCOVERY_CONTENT_TYPE),
			DiscoveryMode::Legacy => ResponseTemplate::new(406),
		};
		Mock::given(method("GET"))
			.and(path(endpoint))
			.and(header_regex("accept", "apidiscovery"))
			.respond_with(response)
			.mount(server)
			.await;
	}

	Mock::given(method("GET"))
		.and(path("/api"))
		.respond_with(ResponseTemplate::new(200).set_body_json(json!({
			"kind": "APIVersions",
			"versions": ["v1"],
			"serverAddressByClientCIDRs": []
		})))
		.mount(server)
		.await;

	let groups: Vec<_> = discovery
		.group_resources
		.keys()
		.map(|gv| {
			let (group, version) = gv.split_once('/').unwrap_or(("", gv));
			json!({
				"name": group,
				"versions": [{"groupVersion": gv, "version": version}],
				"preferredVersion": {"groupVersion": gv, "version": version}
			})
		})
		.collect();
	Mock::given(method("GET"))
		.and(path("/apis"))
		.respond_with(ResponseTemplate::new(200).set_body_json(json!({
			"kind": "APIGroupList",
			"apiVersion": "v1",
			"groups": groups
		})))
		.mount(server)
		.await;

	Mock::given(method("GET"))
		.and(path("/api/v1"))
		.respond_with(
			ResponseTemplate::new(200)
				.set_body_json(legacy_resource_list("v1", &discovery.core_resources)),
		)
		.mount(server)
		.await;

	for (gv, rs) in &discovery.group_resources {
		Mock::given(method("GET"))
			.and(path(format!("/apis/{gv}")))
			.respond_with(ResponseTemplate::new(200).set_body_json(legacy_resource_list(gv, rs)))
			.mount(server)
			.await;
	}
}

async fn mount_objects(server: &MockServer, resources: Arc<Resources>, failures: Arc<Vec<MockFailure>>) {
	Mock::given(method("GET"))
		.and(path_regex(r"^/api(s)?/.*"))
		.respond_with(move |req: &Request| {
			let (collection, name) = split_resource_path(req.url.path());

			if let Some(failure) = failures.iter().find(|f| f.matches(collection, name)) {
				trace!(%collection, %name, code = failure.code, "scripted failure");
				return failure.response();
			}

			match resources.get(&(collection.to_string(), name.to_string())) {
				Some(object) => ResponseTemplate::new(200).set_body_json(object),
				None => {
					let message = format!("\"{name}\" not found");
					ResponseTemplate::new(404).set_body_json(status(404, "NotFound", &message))
				}
			}
		})
		.mount(server)
		.await;
}
