//! Live object fetching backed by a kube client.

use std::collections::HashSet;

use kube::{
	api::{Api, DynamicObject},
	Client,
};
use serde_json::Value;
use tracing::{debug, instrument};

use super::{
	client::ClusterConnection,
	discovery::{gvk_for, ApiResourceCache, DiscoveredResource, DiscoveryError},
	ResourceScope,
};
use crate::{
	cluster::{ClusterClient, FetchError},
	object::DesiredObject,
};

/// Reads live objects through the Kubernetes API.
#[derive(Clone)]
pub struct KubeClusterClient {
	client: Client,
	cache: ApiResourceCache,
}

impl std::fmt::Debug for KubeClusterClient {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("KubeClusterClient")
			.field("resource_count", &self.cache.len())
			.finish_non_exhaustive()
	}
}

impl KubeClusterClient {
	/// Discover the resource types `objects` use.
	#[instrument(skip_all, fields(object_count = objects.len()))]
	pub async fn new(
		connection: &ClusterConnection,
		objects: &[DesiredObject],
	) -> Result<Self, DiscoveryError> {
		let required: HashSet<_> = objects
			.iter()
			.map(|object| gvk_for(object.api_version(), object.kind()))
			.collect();
		let cache = ApiResourceCache::build(connection.client(), required).await?;
		debug!(resource_count = cache.len(), "discovered API resources");
		Ok(Self::with_cache(connection.client().clone(), cache))
	}

	pub fn with_cache(client: Client, cache: ApiResourceCache) -> Self {
		Self { client, cache }
	}

	fn discovered(&self, object: &DesiredObject) -> Option<&DiscoveredResource> {
		self.cache
			.lookup(&gvk_for(object.api_version(), object.kind()))
	}
}

impl ClusterClient for KubeClusterClient {
	fn resource_kind_for(&self, object: &DesiredObject) -> String {
		match self.discovered(object) {
			Some(discovered) => discovered.api_resource.plural.clone(),
			None => object.kind().to_lowercase(),
		}
	}

	fn is_namespaced(&self, object: &DesiredObject) -> bool {
		self.discovered(object)
			.is_none_or(|discovered| discovered.scope == ResourceScope::Namespaced)
	}

	#[instrument(skip_all, fields(kind = object.kind(), name = object.name(), namespace = namespace.unwrap_or("")))]
	async fn get(
		&self,
		object: &DesiredObject,
		namespace: Option<&str>,
	) -> Result<Option<Value>, FetchError> {
		let Some(discovered) = self.discovered(object) else {
			return Err(FetchError::UnknownResourceType {
				api_version: object.api_version().to_string(),
				kind: object.kind().to_string(),
			});
		};

		let ar = &discovered.api_resource;
		let api: Api<DynamicObject> = match namespace {
			Some(ns) => Api::namespaced_with(self.client.clone(), ns, ar),
			None => Api::all_with(self.client.clone(), ar),
		};

		let Some(live) = api
			.get_opt(object.name())
			.await
			.map_err(|e| FetchError::Request(Box::new(e)))?
		else {
			debug!("object not found");
			return Ok(None);
		};
		serde_json::to_value(live)
			.map(Some)
			.map_err(FetchError::Decode)
	}
}
