//! Kubernetes API resource discovery and caching.
//!
//! Resources are discovered once per run, preferably through aggregated
//! discovery. Older servers fall back to discovering only the kinds the
//! desired objects use.

use std::{
	collections::{HashMap, HashSet},
	sync::Arc,
};

use kube::{
	core::GroupVersionKind,
	discovery::{oneshot::pinned_kind, ApiResource, Scope},
	Client, Discovery,
};
use thiserror::Error;
use tokio::{sync::Semaphore, task::JoinSet};
use tracing::{debug, instrument, warn};

use super::ResourceScope;

/// Errors that can occur during API resource discovery.
#[derive(Debug, Error)]
pub enum DiscoveryError {
	#[error("discovery task panicked")]
	TaskPanicked(#[source] tokio::task::JoinError),

	#[error("internal error: discovery semaphore unexpectedly closed")]
	SemaphoreClosed,

	#[error("failed to discover resource {api_version}/{kind}")]
	ResourceDiscovery {
		api_version: String,
		kind: String,
		#[source]
		source: Box<kube::Error>,
	},
}

/// GroupVersionKind for an apiVersion string and kind.
pub fn gvk_for(api_version: &str, kind: &str) -> GroupVersionKind {
	let (group, version) = api_version.split_once('/').unwrap_or(("", api_version));
	GroupVersionKind::gvk(group, version, kind)
}

fn scope_of(scope: &Scope) -> ResourceScope {
	match scope {
		Scope::Namespaced => ResourceScope::Namespaced,
		Scope::Cluster => ResourceScope::ClusterWide,
	}
}

/// Discovered API resource with its scope.
#[derive(Debug, Clone)]
pub struct DiscoveredResource {
	/// The kube ApiResource for making API calls.
	pub api_resource: ApiResource,
	pub scope: ResourceScope,
}

/// Cached API resource discovery results, keyed by GroupVersionKind.
#[derive(Debug, Clone, Default)]
pub struct ApiResourceCache {
	resources: HashMap<GroupVersionKind, DiscoveredResource>,
}

impl ApiResourceCache {
	/// Maximum concurrent discovery requests for lazy fallback.
	const MAX_CONCURRENT_DISCOVERIES: usize = 8;

	/// Build the cache by querying the cluster's discovery API.
	///
	/// Uses the Aggregated Discovery API (K8s 1.26+) which requires only 2 API calls,
	/// falling back to lazy discovery of `required` on older clusters.
	#[instrument(skip_all, fields(key_count = required.len()))]
	pub async fn build(
		client: &Client,
		required: HashSet<GroupVersionKind>,
	) -> Result<Self, DiscoveryError> {
		match Discovery::new(client.clone()).run_aggregated().await {
			Ok(discovery) => {
				debug!("using aggregated discovery");
				Ok(Self::from_discovery(&discovery))
			}
			Err(e) => {
				debug!(error = %e, "aggregated discovery not available, using lazy discovery");
				Self::build_lazy(client, required).await
			}
		}
	}

	fn from_discovery(discovery: &Discovery) -> Self {
		let mut resources = HashMap::new();
		for group in discovery.groups() {
			// All versions, so manifests using older API versions still resolve
			for version in group.versions() {
				for (api_resource, caps) in group.versioned_resources(version) {
					let gvk = GroupVersionKind::gvk(
						&api_resource.group,
						&api_resource.version,
						&api_resource.kind,
					);
					resources.insert(
						gvk,
						DiscoveredResource {
							api_resource,
							scope: scope_of(&caps.scope),
						},
					);
				}
			}
		}
		Self { resources }
	}

	/// Discover only the given kinds, with bounded parallelism.
	///
	/// Kinds the server does not know are left out of the cache. Fails only
	/// when every lookup failed.
	#[instrument(skip_all, fields(key_count = keys.len()))]
	async fn build_lazy(
		client: &Client,
		keys: HashSet<GroupVersionKind>,
	) -> Result<Self, DiscoveryError> {
		let semaphore = Arc::new(Semaphore::new(Self::MAX_CONCURRENT_DISCOVERIES));
		let mut join_set = JoinSet::new();

		for gvk in keys {
			let client = client.clone();
			let semaphore = semaphore.clone();

			join_set.spawn(async move {
				let Ok(_permit) = semaphore.acquire().await else {
					return Err(DiscoveryError::SemaphoreClosed);
				};
				debug!(api_version = %gvk.api_version(), kind = %gvk.kind, "discovering resource");

				let (api_resource, caps) =
					pinned_kind(&client, &gvk)
						.await
						.map_err(|e| DiscoveryError::ResourceDiscovery {
							api_version: gvk.api_version(),
							kind: gvk.kind.clone(),
							source: Box::new(e),
						})?;
				Ok((
					gvk,
					DiscoveredResource {
						api_resource,
						scope: scope_of(&caps.scope),
					},
				))
			});
		}

		let mut resources = HashMap::new();
		let mut first_error = None;
		while let Some(result) = join_set.join_next().await {
			match result.map_err(DiscoveryError::TaskPanicked)? {
				Ok((gvk, discovered)) => {
					resources.insert(gvk, discovered);
				}
				Err(DiscoveryError::SemaphoreClosed) => return Err(DiscoveryError::SemaphoreClosed),
				Err(e) => {
					warn!(error = %e, "resource discovery failed");
					first_error.get_or_insert(e);
				}
			}
		}

		match first_error {
			Some(e) if resources.is_empty() => Err(e),
			_ => Ok(Self { resources }),
		}
	}

	/// Look up a resource by its GroupVersionKind.
	pub fn lookup(&self, gvk: &GroupVersionKind) -> Option<&DiscoveredResource> {
		self.resources.get(gvk)
	}

	/// Add or replace a cache entry.
	pub fn insert(&mut self, gvk: GroupVersionKind, resource: DiscoveredResource) {
		self.resources.insert(gvk, resource);
	}

	pub fn len(&self) -> usize {
		self.resources.len()
	}

	pub fn is_empty(&self) -> bool {
		self.resources.is_empty()
	}
}
