//! Integration tests for ClusterConnection using HTTP mock server.

use assert_matches::assert_matches;
use k8s_mock::{discovery::DiscoveryMode, http::HttpMockK8sServer};
use k8s_openapi::apimachinery::pkg::version::Info;
use kubecfg::k8s::client::{ClusterConnection, ConnectionError, DEFAULT_API_TIMEOUT};

fn expected_version() -> Info {
	Info {
		major: "1".to_string(),
		minor: "31".to_string(),
		git_version: "v1.31.0".to_string(),
		git_commit: "fake".to_string(),
		git_tree_state: "clean".to_string(),
		build_date: "2024-01-01T00:00:00Z".to_string(),
		go_version: "go1.22.0".to_string(),
		compiler: "gc".to_string(),
		platform: "linux/amd64".to_string(),
	}
}

async fn test_connect_impl(discovery_mode: DiscoveryMode) {
	let server = HttpMockK8sServer::builder()
		.discovery_mode(discovery_mode)
		.build()
		.start()
		.await;

	let conn = ClusterConnection::with_kubeconfig(server.kubeconfig(), None, DEFAULT_API_TIMEOUT)
		.await
		.expect("connection should succeed");

	assert_eq!(*conn.server_version(), expected_version());
	assert_eq!(conn.default_namespace(), "default");
	assert_eq!(conn.context(), Some("mock-context"));
}

#[tokio::test]
async fn test_connect_aggregated() {
	test_connect_impl(DiscoveryMode::Aggregated).await;
}

#[tokio::test]
async fn test_connect_legacy() {
	test_connect_impl(DiscoveryMode::Legacy).await;
}

#[tokio::test]
async fn test_connect_with_named_context() {
	let server = HttpMockK8sServer::builder().build().start().await;

	let conn = ClusterConnection::with_kubeconfig(
		server.kubeconfig_with_context("staging"),
		Some("staging"),
		DEFAULT_API_TIMEOUT,
	)
	.await
	.expect("connection should succeed");

	assert_eq!(conn.context(), Some("staging"));
	assert_eq!(*conn.server_version(), expected_version());
}

#[tokio::test]
async fn test_connect_unknown_context() {
	let server = HttpMockK8sServer::builder().build().start().await;

	let result =
		ClusterConnection::with_kubeconfig(server.kubeconfig(), Some("nope"), DEFAULT_API_TIMEOUT).await;

	assert_matches!(result, Err(ConnectionError::ContextNotFound(name)) if name == "nope");
}
