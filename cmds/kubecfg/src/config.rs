//! Configuration file support for kubecfg
//!
//! Supports `.kubecfg.yaml` files that can be placed anywhere in the directory
//! hierarchy. kubecfg searches from the working directory upward to the filesystem root.

use std::{
	fs, io,
	path::{Path, PathBuf},
};

use serde::Deserialize;
use thiserror::Error;

use crate::engine::{DiffFormat, DiffStrategy};

/// The name of the config file kubecfg looks for
pub const CONFIG_FILE_NAME: &str = ".kubecfg.yaml";

#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("failed to read config file: {}", path.display())]
	Io {
		path: PathBuf,
		#[source]
		source: io::Error,
	},

	#[error("failed to parse config file: {}", path.display())]
	Parse {
		path: PathBuf,
		#[source]
		source: serde_yaml_with_quirks::Error,
	},
}

/// Root configuration structure for .kubecfg.yaml
///
/// Every field is optional; unset fields fall back to command-line flags and
/// then to built-in defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct KubecfgConfig {
	#[serde(default)]
	pub diff_strategy: Option<DiffStrategy>,

	/// Namespace for namespaced objects that do not name one.
	#[serde(default)]
	pub namespace: Option<String>,

	/// Kubeconfig context to use instead of the current one.
	#[serde(default)]
	pub context: Option<String>,

	#[serde(default)]
	pub omit_secrets: Option<bool>,

	#[serde(default)]
	pub diff_format: Option<DiffFormat>,

	/// API request timeout in seconds; 0 uses the default.
	#[serde(default)]
	pub request_timeout: Option<u64>,
}

impl KubecfgConfig {
	/// Load config by searching from the given directory upward
	pub fn load_from_directory(start_dir: &Path) -> Result<Option<Self>, ConfigError> {
		find_config_file(start_dir)
			.map(|path| Self::load_from_file(&path))
			.transpose()
	}

	/// Load config from a specific file path
	pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
		let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
			path: path.to_path_buf(),
			source,
		})?;
		if content.trim().is_empty() {
			return Ok(Self::default());
		}
		serde_yaml_with_quirks::from_str(&content).map_err(|source| ConfigError::Parse {
			path: path.to_path_buf(),
			source,
		})
	}

	/// Overlay `overrides` on this config; set fields in `overrides` win.
	pub fn merged_with(self, overrides: KubecfgConfig) -> Self {
		Self {
			diff_strategy: overrides.diff_strategy.or(self.diff_strategy),
			namespace: overrides.namespace.or(self.namespace),
			context: overrides.context.or(self.context),
			omit_secrets: overrides.omit_secrets.or(self.omit_secrets),
			diff_format: overrides.diff_format.or(self.diff_format),
			request_timeout: overrides.request_timeout.or(self.request_timeout),
		}
	}
}

/// Search for a config file starting from `start_dir` and walking up to the filesystem root
pub fn find_config_file(start_dir: &Path) -> Option<PathBuf> {
	// Canonicalize if possible to handle relative paths
	let start = start_dir
		.canonicalize()
		.unwrap_or_else(|_| start_dir.to_path_buf());

	start
		.ancestors()
		.map(|dir| dir.join(CONFIG_FILE_NAME))
		.find(|path| path.is_file())
}
