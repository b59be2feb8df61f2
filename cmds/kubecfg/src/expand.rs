//! Expansion of configuration paths into desired objects.
//!
//! Paths may be files or directories. Directories are walked recursively in
//! file-name order and only `.yaml`, `.yml` and `.json` files are read.
//! Files given explicitly are always read. The path `-` reads YAML from
//! standard input.

use std::{
	fs,
	io::{self, Read},
	path::{Path, PathBuf},
};

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, instrument};
use walkdir::WalkDir;

use crate::object::{DesiredObject, ObjectError};

/// Path that stands for standard input.
pub const STDIN_PATH: &str = "-";

/// Errors that can occur while expanding configuration.
#[derive(Debug, Error)]
pub enum ExpandError {
	#[error("reading {}", path.display())]
	Io {
		path: PathBuf,
		#[source]
		source: io::Error,
	},

	#[error("walking {}", path.display())]
	Walk {
		path: PathBuf,
		#[source]
		source: walkdir::Error,
	},

	#[error("parsing YAML in {}", path.display())]
	Yaml {
		path: PathBuf,
		#[source]
		source: serde_yaml_with_quirks::Error,
	},

	#[error("parsing JSON in {}", path.display())]
	Json {
		path: PathBuf,
		#[source]
		source: serde_json::Error,
	},

	#[error("object #{index} in {}", path.display())]
	Object {
		path: PathBuf,
		index: usize,
		#[source]
		source: ObjectError,
	},
}

/// Source format of a configuration file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
	Yaml,
	Json,
}

impl Format {
	/// Format implied by a file extension, `None` if the extension is not a
	/// configuration extension.
	pub fn from_path(path: &Path) -> Option<Self> {
		match path.extension()?.to_str()? {
			"yaml" | "yml" => Some(Self::Yaml),
			"json" => Some(Self::Json),
			_ => None,
		}
	}
}

/// Expand every path into desired objects, in path order.
#[instrument(skip_all, fields(path_count = paths.len()))]
pub fn expand<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<DesiredObject>, ExpandError> {
	let mut objects = Vec::new();
	for path in paths {
		let path = path.as_ref();
		if path.as_os_str() == STDIN_PATH {
			objects.extend(expand_reader(path, io::stdin().lock())?);
		} else if path.is_dir() {
			for file in config_files(path)? {
				let format = Format::from_path(&file).unwrap_or(Format::Yaml);
				objects.extend(expand_file(&file, format)?);
			}
		} else {
			let format = Format::from_path(path).unwrap_or(Format::Yaml);
			objects.extend(expand_file(path, format)?);
		}
	}
	debug!(object_count = objects.len(), "expanded configuration");
	Ok(objects)
}

/// Configuration files below `dir`, sorted by file name at every level.
fn config_files(dir: &Path) -> Result<Vec<PathBuf>, ExpandError> {
	let mut files = Vec::new();
	for entry in WalkDir::new(dir).sort_by_file_name() {
		let entry = entry.map_err(|source| ExpandError::Walk {
			path: dir.to_path_buf(),
			source,
		})?;
		if entry.file_type().is_file() && Format::from_path(entry.path()).is_some() {
			files.push(entry.into_path());
		}
	}
	Ok(files)
}

fn expand_file(path: &Path, format: Format) -> Result<Vec<DesiredObject>, ExpandError> {
	debug!(path = %path.display(), ?format, "reading configuration file");
	let source = fs::read_to_string(path).map_err(|source| ExpandError::Io {
		path: path.to_path_buf(),
		source,
	})?;
	expand_source(path, &source, format)
}

/// Expand YAML documents read from `reader`; `name` is used in errors.
pub fn expand_reader(name: &Path, mut reader: impl Read) -> Result<Vec<DesiredObject>, ExpandError> {
	let mut source = String::new();
	reader
		.read_to_string(&mut source)
		.map_err(|source| ExpandError::Io {
			path: name.to_path_buf(),
			source,
		})?;
	expand_source(name, &source, Format::Yaml)
}

/// Expand the text of one file.
pub fn expand_source(path: &Path, source: &str, format: Format) -> Result<Vec<DesiredObject>, ExpandError> {
	let documents = match format {
		Format::Yaml => parse_yaml_documents(path, source)?,
		Format::Json => vec![serde_json::from_str(source).map_err(|source| ExpandError::Json {
			path: path.to_path_buf(),
			source,
		})?],
	};

	let mut values = Vec::new();
	for document in documents {
		flatten(document, &mut values);
	}

	values
		.into_iter()
		.enumerate()
		.map(|(index, value)| {
			DesiredObject::try_from(value).map_err(|source| ExpandError::Object {
				path: path.to_path_buf(),
				index,
				source,
			})
		})
		.collect()
}

fn parse_yaml_documents(path: &Path, source: &str) -> Result<Vec<Value>, ExpandError> {
	let mut documents = Vec::new();
	let quirks = serde_yaml_with_quirks::DeserializingQuirks { old_octals: true };
	for document in serde_yaml_with_quirks::Deserializer::from_str_with_quirks(source, quirks) {
		let value = Value::deserialize(document).map_err(|source| ExpandError::Yaml {
			path: path.to_path_buf(),
			source,
		})?;
		if !value.is_null() {
			documents.push(value);
		}
	}
	Ok(documents)
}

/// Flatten top-level sequences and `List` objects into individual values.
fn flatten(value: Value, out: &mut Vec<Value>) {
	match value {
		Value::Array(items) => {
			for item in items {
				flatten(item, out);
			}
		}
		Value::Object(mut map) if is_list_kind(map.get("kind")) && map.contains_key("items") => {
			match map.remove("items") {
				Some(Value::Array(items)) => {
					for item in items {
						flatten(item, out);
					}
				}
				Some(Value::Null) | None => {}
				Some(other) => out.push(other),
			}
		}
		Value::Null => {}
		other => out.push(other),
	}
}

fn is_list_kind(kind: Option<&Value>) -> bool {
	kind.and_then(Value::as_str)
		.is_some_and(|kind| kind.ends_with("List"))
}
