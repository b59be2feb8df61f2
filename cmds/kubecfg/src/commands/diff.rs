//! Diff command handler.

use std::{
	io::Write,
	path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use bon::Builder;
use clap::Args;
use tracing::{info, instrument};

use super::util::{request_timeout, ColorMode};
use crate::{
	config::KubecfgConfig,
	engine::{DiffEngine, DiffFormat, DiffStrategy, RunOutcome},
	expand::expand,
	k8s::{client::ClusterConnection, live::KubeClusterClient},
	object::DesiredObject,
};

/// Exit code when the configuration differs from the cluster.
pub const EXIT_DIFFERENCES_FOUND: u8 = 10;

#[derive(Args, Debug)]
pub struct DiffArgs {
	/// Files or directories with the desired objects ("-" reads standard input)
	#[arg(default_value = ".")]
	pub paths: Vec<PathBuf>,

	/// Compare the whole live object ("all") or only fields set in the configuration ("subset")
	#[arg(long, value_enum)]
	pub diff_strategy: Option<DiffStrategy>,

	/// Namespace for objects that do not set one
	#[arg(short = 'n', long)]
	pub namespace: Option<String>,

	/// Kubeconfig context to use
	#[arg(long)]
	pub context: Option<String>,

	/// Controls color in diff output
	#[arg(long, value_enum, default_value_t)]
	pub color: ColorMode,

	/// How differences are printed
	#[arg(long, value_enum)]
	pub diff_format: Option<DiffFormat>,

	/// Hide secret values, showing digests instead
	#[arg(long)]
	pub omit_secrets: bool,

	/// Exit with 0 even when differences are found
	#[arg(short = 'z', long, visible_alias = "no-error-on-diff")]
	pub exit_zero: bool,

	/// Timeout for API requests, in seconds
	#[arg(long, value_name = "SECONDS", value_parser = clap::value_parser!(u64).range(1..))]
	pub request_timeout: Option<u64>,
}

impl DiffArgs {
	/// Settings given on the command line, as config overrides.
	fn overrides(&self) -> KubecfgConfig {
		KubecfgConfig {
			diff_strategy: self.diff_strategy,
			namespace: self.namespace.clone(),
			context: self.context.clone(),
			omit_secrets: self.omit_secrets.then_some(true),
			diff_format: self.diff_format,
			request_timeout: self.request_timeout,
		}
	}
}

/// Resolved settings for one diff run.
#[derive(Debug, Clone, Builder)]
pub struct DiffOptions {
	#[builder(default)]
	pub strategy: DiffStrategy,
	/// Defaults to the namespace of the kubeconfig context.
	#[builder(into)]
	pub namespace: Option<String>,
	#[builder(default)]
	pub omit_secrets: bool,
	#[builder(default)]
	pub format: DiffFormat,
	#[builder(default)]
	pub use_color: bool,
}

impl DiffOptions {
	pub fn from_config(config: &KubecfgConfig, use_color: bool) -> Self {
		Self::builder()
			.strategy(config.diff_strategy.unwrap_or_default())
			.maybe_namespace(config.namespace.clone())
			.omit_secrets(config.omit_secrets.unwrap_or_default())
			.format(config.diff_format.unwrap_or_default())
			.use_color(use_color)
			.build()
	}
}

/// Process exit code for a finished run.
pub fn exit_code(outcome: RunOutcome, exit_zero: bool) -> u8 {
	match outcome {
		RunOutcome::DifferencesFound if !exit_zero => EXIT_DIFFERENCES_FOUND,
		_ => 0,
	}
}

/// Load `.kubecfg.yaml` from `dir` upward and apply command-line overrides.
pub fn resolve_config(dir: &Path, args: &DiffArgs) -> Result<KubecfgConfig> {
	let file = KubecfgConfig::load_from_directory(dir)?.unwrap_or_default();
	Ok(file.merged_with(args.overrides()))
}

/// Diff `objects` against the cluster behind `connection`.
#[instrument(skip_all, fields(object_count = objects.len(), strategy = %options.strategy))]
pub async fn diff_objects<W: Write>(
	connection: &ClusterConnection,
	objects: &[DesiredObject],
	options: &DiffOptions,
	mut writer: W,
) -> Result<RunOutcome> {
	let client = KubeClusterClient::new(connection, objects)
		.await
		.context("discovering API resources")?;

	let default_namespace = options
		.namespace
		.clone()
		.unwrap_or_else(|| connection.default_namespace().to_string());

	let engine = DiffEngine::builder()
		.client(client)
		.strategy(options.strategy)
		.default_namespace(default_namespace)
		.omit_secrets(options.omit_secrets)
		.renderer(options.format.renderer())
		.use_color(options.use_color)
		.build();

	Ok(engine.run(objects, &mut writer).await?)
}

/// Run the diff command.
pub fn run<W: Write>(args: DiffArgs, writer: W) -> Result<RunOutcome> {
	let cwd = std::env::current_dir().context("resolving working directory")?;
	let config = resolve_config(&cwd, &args)?;
	let objects = expand(&args.paths)?;
	if objects.is_empty() {
		info!("no objects to diff");
		return Ok(RunOutcome::Clean);
	}

	let options = DiffOptions::from_config(&config, args.color.should_colorize());
	let timeout = request_timeout(config.request_timeout);

	let runtime = tokio::runtime::Builder::new_current_thread()
		.enable_all()
		.build()
		.context("building async runtime")?;

	runtime.block_on(async {
		let connection = ClusterConnection::connect(config.context.as_deref(), timeout)
			.await
			.context("connecting to cluster")?;
		diff_objects(&connection, &objects, &options, writer).await
	})
}
