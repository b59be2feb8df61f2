//! Show command handler.

use std::{io::Write, path::PathBuf};

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use kubecfg_diff::yaml::to_yaml;

use crate::{expand::expand, object::DesiredObject, order};

/// Output format for expanded objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
	#[default]
	Yaml,
	Json,
}

#[derive(Args, Debug)]
pub struct ShowArgs {
	/// Files or directories with the desired objects ("-" reads standard input)
	#[arg(default_value = ".")]
	pub paths: Vec<PathBuf>,

	/// Output format
	#[arg(short = 'o', long = "format", value_enum, default_value_t)]
	pub format: OutputFormat,
}

/// Write `objects` in report order.
///
/// YAML output is a stream of `---` separated documents with sorted keys.
/// JSON output is one indented object per resource.
pub fn write_objects<W: Write>(objects: &[DesiredObject], format: OutputFormat, mut writer: W) -> Result<()> {
	for object in order::sorted(objects) {
		match format {
			OutputFormat::Yaml => {
				let yaml = to_yaml(object.value())
					.with_context(|| format!("serializing {}", object.identity(object.namespace())))?;
				write!(writer, "---\n{yaml}")?;
			}
			OutputFormat::Json => {
				serde_json::to_writer_pretty(&mut writer, object.value())?;
				writeln!(writer)?;
			}
		}
	}
	writer.flush()?;
	Ok(())
}

/// Run the show command.
pub fn run<W: Write>(args: ShowArgs, writer: W) -> Result<()> {
	let objects = expand(&args.paths)?;
	write_objects(&objects, args.format, writer)
}

#[cfg(test)]
mod tests {
	use indoc::indoc;
	use serde_json::{json, Value};

	use super::*;
	use crate::{
		commands::util::BrokenPipeGuard,
		test_utils::{configmap, object, BrokenPipeWriter},
	};

	fn show(objects: &[DesiredObject], format: OutputFormat) -> String {
		let mut out = Vec::new();
		write_objects(objects, format, &mut out).unwrap();
		String::from_utf8(out).unwrap()
	}

	#[test]
	fn test_yaml_sorted_documents() {
		let objects = [
			object(json!({
				"kind": "ConfigMap",
				"apiVersion": "v1",
				"metadata": {"name": "b"},
				"data": {"z": "last", "a": "first"}
			})),
			configmap("a"),
		];

		assert_eq!(
			show(&objects, OutputFormat::Yaml),
			indoc! {"
				---
				apiVersion: v1
				kind: ConfigMap
				metadata:
				  name: a
				---
				apiVersion: v1
				data:
				  a: first
				  z: last
				kind: ConfigMap
				metadata:
				  name: b
			"}
		);
	}

	#[test]
	fn test_json_stream() {
		let objects = [configmap("b"), configmap("a")];
		let output = show(&objects, OutputFormat::Json);

		let values: Vec<Value> = serde_json::Deserializer::from_str(&output)
			.into_iter()
			.collect::<Result<_, _>>()
			.unwrap();
		let names: Vec<_> = values.iter().map(|v| v["metadata"]["name"].clone()).collect();
		assert_eq!(names, vec![json!("a"), json!("b")]);
	}

	#[test]
	fn test_empty_input_prints_nothing() {
		assert_eq!(show(&[], OutputFormat::Yaml), "");
	}

	#[test]
	fn test_closed_pipe() {
		let guard = BrokenPipeGuard::new(BrokenPipeWriter);
		write_objects(&[configmap("a")], OutputFormat::Yaml, guard).unwrap();
	}
}
