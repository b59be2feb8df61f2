//! Helpers shared by the mock endpoints.

use serde_json::{json, Value};

use crate::discovery::MockDiscovery;

/// Derive the collection path and name for a manifest using discovery data.
///
/// Returns `None` when the manifest lacks identity fields or its kind is not
/// known to discovery.
pub fn api_path_for_manifest(manifest: &Value, discovery: &MockDiscovery) -> Option<(String, String)> {
	let api_version = manifest.get("apiVersion")?.as_str()?;
	let kind = manifest.get("kind")?.as_str()?;
	let name = manifest.pointer("/metadata/name")?.as_str()?;
	let namespace = manifest
		.pointer("/metadata/namespace")
		.and_then(Value::as_str)
		.unwrap_or("default");

	let resource = discovery.find(api_version, kind)?;
	let root = if api_version.contains('/') { "apis" } else { "api" };
	let path = if resource.namespaced {
		format!("/{root}/{api_version}/namespaces/{namespace}/{}", resource.name)
	} else {
		format!("/{root}/{api_version}/{}", resource.name)
	};
	Some((path, name.to_string()))
}

/// Split a request path into (collection path, object name).
///
/// `/api/v1/namespaces/default/configmaps/app` becomes
/// (`/api/v1/namespaces/default/configmaps`, `app`).
pub fn split_resource_path(path: &str) -> (&str, &str) {
	let path = path.trim_end_matches('/');
	path.rsplit_once('/').unwrap_or((path, ""))
}

/// A `Status` body the way the API server reports failures.
pub fn status(code: u16, reason: &str, message: &str) -> Value {
	json!({
		"kind": "Status",
		"apiVersion": "v1",
		"metadata": {},
		"status": "Failure",
		"message": message,
		"reason": reason,
		"code": code
	})
}
