//! Mock Kubernetes API server for testing.
//!
//! Serves discovery and single-object GETs over real HTTP, so it can be used
//! with kubeconfig-based connections.

pub mod discovery;
mod helpers;
pub mod http;

pub use discovery::{DiscoveryMode, MockApiResource, MockDiscovery};
pub use http::{HttpMockK8sServer, MockFailure, RunningHttpMockK8sServer};
