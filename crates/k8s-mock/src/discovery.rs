//! Mock Kubernetes API discovery types.

use std::collections::BTreeMap;

/// Discovery mode for the mock server.
#[derive(Debug, Clone, Copy, Default)]
pub enum DiscoveryMode {
	/// Support aggregated discovery (APIGroupDiscoveryList).
	#[default]
	Aggregated,
	/// Return 406 for aggregated discovery, forcing fallback to legacy endpoints.
	Legacy,
}

/// Resources advertised by the mock server.
#[derive(Debug, Clone)]
pub struct MockDiscovery {
	pub core_resources: Vec<MockApiResource>,
	/// Keyed by group version, e.g. `apps/v1`.
	pub group_resources: BTreeMap<String, Vec<MockApiResource>>,
}

impl Default for MockDiscovery {
	fn default() -> Self {
		Self {
			core_resources: vec![
				MockApiResource::namespaced("configmaps", "ConfigMap"),
				MockApiResource::namespaced("secrets", "Secret"),
				MockApiResource::namespaced("services", "Service"),
				MockApiResource::namespaced("pods", "Pod"),
				MockApiResource::cluster_scoped("namespaces", "Namespace"),
			],
			group_resources: BTreeMap::from([
				(
					"apps/v1".to_string(),
					vec![
						MockApiResource::namespaced("deployments", "Deployment"),
						MockApiResource::namespaced("statefulsets", "StatefulSet"),
						MockApiResource::namespaced("daemonsets", "DaemonSet"),
					],
				),
				(
					"rbac.authorization.k8s.io/v1".to_string(),
					vec![
						MockApiResource::cluster_scoped("clusterroles", "ClusterRole"),
						MockApiResource::namespaced("roles", "Role"),
					],
				),
			]),
		}
	}
}

impl MockDiscovery {
	/// Advertise an additional resource, e.g. a custom resource definition.
	#[must_use]
	pub fn with_resource(mut self, group_version: &str, resource: MockApiResource) -> Self {
		if group_version.contains('/') {
			self.group_resources
				.entry(group_version.to_string())
				.or_default()
				.push(resource);
		} else {
			self.core_resources.push(resource);
		}
		self
	}

	/// Look up a resource by apiVersion and kind.
	pub fn find(&self, api_version: &str, kind: &str) -> Option<&MockApiResource> {
		let resources = if api_version.contains('/') {
			self.group_resources.get(api_version)?
		} else {
			&self.core_resources
		};
		resources.iter().find(|r| r.kind == kind)
	}
}

/// A mock API resource definition.
#[derive(Debug, Clone)]
pub struct MockApiResource {
	pub name: String,
	pub kind: String,
	pub namespaced: bool,
	pub verbs: Vec<String>,
}

impl MockApiResource {
	pub fn namespaced(name: &str, kind: &str) -> Self {
		Self::new(name, kind, true)
	}

	pub fn cluster_scoped(name: &str, kind: &str) -> Self {
		Self::new(name, kind, false)
	}

	fn new(name: &str, kind: &str, namespaced: bool) -> Self {
		Self {
			name: name.to_string(),
			kind: kind.to_string(),
			namespaced,
			verbs: vec!["get".into(), "list".into(), "watch".into()],
		}
	}
}
