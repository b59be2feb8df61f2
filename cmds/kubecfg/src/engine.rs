//! Desired-vs-live reconciliation diff.
//!
//! The engine walks desired objects in report order, fetches each live
//! counterpart one at a time and streams a section per object to the output:
//!
//! ```text
//! ---
//! - live <kind> <namespace>/<name>
//! + config <kind> <namespace>/<name>
//! <"<desc> doesn't exist on server" | "<desc> unchanged" | rendered diff>
//! ```
//!
//! Fetch and render failures abort the run; sections already written stay
//! on the output.

use std::{fmt, io::Write};

use bon::Builder;
use clap::ValueEnum;
use kubecfg_diff::{elide, AsciiRenderer, DiffRenderer, DiffTree, RenderError, UnifiedRenderer};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, instrument};

use crate::{
	cluster::{ClusterClient, FetchError},
	object::DesiredObject,
	order, secrets,
};

/// Errors that abort a diff run.
#[derive(Debug, Error)]
pub enum DiffError {
	#[error("fetching {desc}")]
	Fetch {
		desc: String,
		#[source]
		source: FetchError,
	},

	#[error("rendering diff for {desc}")]
	Render {
		desc: String,
		#[source]
		source: RenderError,
	},

	#[error("writing diff output")]
	Write(#[from] std::io::Error),
}

/// How live state is compared against configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffStrategy {
	/// Compare the complete live object.
	#[default]
	#[value(name = "all", alias = "full")]
	#[serde(rename = "all", alias = "full")]
	Full,

	/// Compare only the fields present in the configuration.
	Subset,
}

impl fmt::Display for DiffStrategy {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			DiffStrategy::Full => write!(f, "all"),
			DiffStrategy::Subset => write!(f, "subset"),
		}
	}
}

/// Presentation of a modified object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffFormat {
	/// Structure with per-line markers.
	#[default]
	Ascii,

	/// Unified diff of both sides as YAML.
	Unified,
}

impl DiffFormat {
	pub fn renderer(self) -> Box<dyn DiffRenderer> {
		match self {
			DiffFormat::Ascii => Box::new(AsciiRenderer),
			DiffFormat::Unified => Box::new(UnifiedRenderer::default()),
		}
	}
}

/// Result of comparing one object.
#[derive(Debug, Clone, PartialEq)]
pub enum DiffOutcome {
	AbsentOnServer,
	Unchanged,
	Modified(DiffTree),
}

impl DiffOutcome {
	pub fn has_changes(&self) -> bool {
		!matches!(self, DiffOutcome::Unchanged)
	}
}

/// Result of a complete run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
	Clean,
	DifferencesFound,
}

/// Stage an object has reached during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
	Fetching,
	AbsentOnServer,
	Unchanged,
	Modified,
}

/// A progress event for one object.
#[derive(Debug, Clone, Copy)]
pub struct Progress<'a> {
	pub desc: &'a str,
	pub stage: Stage,
}

/// Receives progress events from a run.
pub trait ProgressSink {
	fn report(&mut self, progress: &Progress<'_>);
}

impl<F> ProgressSink for F
where
	F: FnMut(&Progress<'_>),
{
	fn report(&mut self, progress: &Progress<'_>) {
		self(progress);
	}
}

/// Logs progress events through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingProgress;

impl ProgressSink for TracingProgress {
	fn report(&mut self, progress: &Progress<'_>) {
		let desc = progress.desc;
		match progress.stage {
			Stage::Fetching => debug!(%desc, "fetching"),
			Stage::AbsentOnServer => info!(%desc, "doesn't exist on server"),
			Stage::Unchanged => debug!(%desc, "unchanged"),
			Stage::Modified => info!(%desc, "modified"),
		}
	}
}

/// `<kind> <namespace>/<name>`, or `<kind> <name>` without a namespace.
pub fn describe(kind: &str, namespace: Option<&str>, name: &str) -> String {
	match namespace {
		Some(ns) => format!("{kind} {ns}/{name}"),
		None => format!("{kind} {name}"),
	}
}

/// Compares desired objects against a cluster.
#[derive(Builder)]
pub struct DiffEngine<C> {
	client: C,
	#[builder(default)]
	strategy: DiffStrategy,
	/// Namespace for namespaced objects that do not name one.
	#[builder(into, default = "default".to_string())]
	default_namespace: String,
	/// Replace Secret payloads with digests on both sides.
	#[builder(default)]
	omit_secrets: bool,
	#[builder(default = DiffFormat::default().renderer())]
	renderer: Box<dyn DiffRenderer>,
	#[builder(default)]
	use_color: bool,
}

impl<C: ClusterClient> DiffEngine<C> {
	pub fn client(&self) -> &C {
		&self.client
	}

	/// Namespace `object` is fetched from, `None` if it is cluster-scoped.
	fn effective_namespace<'a>(&'a self, object: &'a DesiredObject) -> Option<&'a str> {
		self.client
			.is_namespaced(object)
			.then(|| object.namespace().unwrap_or(self.default_namespace.as_str()))
	}

	/// Description used in report headers and errors.
	pub fn describe(&self, object: &DesiredObject) -> String {
		describe(
			&self.client.resource_kind_for(object),
			self.effective_namespace(object),
			object.name(),
		)
	}

	/// Compare one object against its live counterpart.
	#[instrument(skip_all, fields(kind = object.kind(), name = object.name()))]
	pub async fn diff_object(&self, object: &DesiredObject) -> Result<DiffOutcome, FetchError> {
		let namespace = self.effective_namespace(object);
		let Some(live) = self.client.get(object, namespace).await? else {
			return Ok(DiffOutcome::AbsentOnServer);
		};

		let live = match self.strategy {
			DiffStrategy::Full => live,
			DiffStrategy::Subset => elide(object.value(), &live),
		};
		let tree = if self.omit_secrets {
			DiffTree::compute(
				&secrets::omit_secret_values(&live),
				&secrets::omit_secret_values(object.value()),
			)
		} else {
			DiffTree::compute(&live, object.value())
		};

		if tree.is_modified() {
			Ok(DiffOutcome::Modified(tree))
		} else {
			Ok(DiffOutcome::Unchanged)
		}
	}

	/// Diff every object and write the report to `out`.
	pub async fn run<W: Write>(
		&self,
		objects: &[DesiredObject],
		out: &mut W,
	) -> Result<RunOutcome, DiffError> {
		self.run_with_progress(objects, out, &mut TracingProgress)
			.await
	}

	/// Like [`DiffEngine::run`], reporting progress to `progress`.
	#[instrument(skip_all, fields(object_count = objects.len(), strategy = %self.strategy))]
	pub async fn run_with_progress<W: Write>(
		&self,
		objects: &[DesiredObject],
		out: &mut W,
		progress: &mut dyn ProgressSink,
	) -> Result<RunOutcome, DiffError> {
		let mut found = false;

		for object in order::sorted(objects) {
			let desc = self.describe(object);
			progress.report(&Progress {
				desc: &desc,
				stage: Stage::Fetching,
			});

			let outcome = self
				.diff_object(object)
				.await
				.map_err(|source| DiffError::Fetch {
					desc: desc.clone(),
					source,
				})?;

			let (body, stage) = match &outcome {
				DiffOutcome::AbsentOnServer => (
					format!("{desc} doesn't exist on server\n"),
					Stage::AbsentOnServer,
				),
				DiffOutcome::Unchanged => (format!("{desc} unchanged\n"), Stage::Unchanged),
				DiffOutcome::Modified(tree) => {
					let text = self
						.renderer
						.render(tree, self.use_color)
						.map_err(|source| DiffError::Render {
							desc: desc.clone(),
							source,
						})?;
					(text, Stage::Modified)
				}
			};

			// Sections are written whole, so an aborted object leaves nothing behind
			write!(out, "---\n- live {desc}\n+ config {desc}\n{body}")?;
			out.flush()?;

			progress.report(&Progress { desc: &desc, stage });
			found |= outcome.has_changes();
		}

		Ok(if found {
			RunOutcome::DifferencesFound
		} else {
			RunOutcome::Clean
		})
	}
}
