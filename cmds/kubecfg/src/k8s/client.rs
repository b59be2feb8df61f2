//! Kubernetes cluster connection management.

use std::time::Duration;

use k8s_openapi::apimachinery::pkg::version::Info;
use kube::{
	config::{KubeConfigOptions, Kubeconfig, KubeconfigError},
	Client, Config,
};
use thiserror::Error;
use tracing::{debug, instrument};

/// Default timeout for Kubernetes API requests.
pub const DEFAULT_API_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors that can occur when connecting to a Kubernetes cluster.
#[derive(Debug, Error)]
pub enum ConnectionError {
	#[error("no context named `{0}` was found. Please check your $KUBECONFIG")]
	ContextNotFound(String),

	#[error("loading kubeconfig")]
	Kubeconfig(#[from] KubeconfigError),

	#[error("creating Kubernetes client")]
	Kube(#[from] kube::Error),
}

/// Represents a connection to a Kubernetes cluster.
#[derive(Clone)]
pub struct ClusterConnection {
	client: Client,
	server_version: Info,
	context: Option<String>,
}

impl std::fmt::Debug for ClusterConnection {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ClusterConnection")
			.field("context", &self.context)
			.field("server_version", &self.server_version)
			.finish_non_exhaustive()
	}
}

impl ClusterConnection {
	/// Connect using `$KUBECONFIG` (or `~/.kube/config`).
	///
	/// Without an explicit `context` the kubeconfig's current context is used.
	#[instrument(skip_all, fields(context = context.unwrap_or("")))]
	pub async fn connect(context: Option<&str>, timeout: Duration) -> Result<Self, ConnectionError> {
		let kubeconfig = Kubeconfig::read()?;
		Self::with_kubeconfig(kubeconfig, context, timeout).await
	}

	/// Connect using a provided kubeconfig.
	#[instrument(skip_all, fields(context = context.unwrap_or("")))]
	pub async fn with_kubeconfig(
		kubeconfig: Kubeconfig,
		context: Option<&str>,
		timeout: Duration,
	) -> Result<Self, ConnectionError> {
		if let Some(name) = context {
			if !kubeconfig.contexts.iter().any(|c| c.name == name) {
				return Err(ConnectionError::ContextNotFound(name.to_string()));
			}
		}
		let context = context
			.map(str::to_string)
			.or_else(|| kubeconfig.current_context.clone());

		let mut config = Config::from_custom_kubeconfig(
			kubeconfig,
			&KubeConfigOptions {
				context: context.clone(),
				..Default::default()
			},
		)
		.await?;
		config.connect_timeout = Some(timeout);
		config.read_timeout = Some(timeout);

		let client = Client::try_from(config)?;
		let server_version = client.apiserver_version().await?;
		debug!(
			context = context.as_deref().unwrap_or(""),
			server = %server_version.git_version,
			"connected to cluster"
		);

		Ok(Self {
			client,
			server_version,
			context,
		})
	}

	/// Get a reference to the underlying kube client.
	pub fn client(&self) -> &Client {
		&self.client
	}

	pub fn server_version(&self) -> &Info {
		&self.server_version
	}

	/// Namespace of the selected kubeconfig context, `default` if it has none.
	pub fn default_namespace(&self) -> &str {
		self.client.default_namespace()
	}

	pub fn context(&self) -> Option<&str> {
		self.context.as_deref()
	}
}
