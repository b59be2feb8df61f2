//! Integration tests for the show command.

use std::fs;

use indoc::indoc;
use kubecfg::commands::show::{run, OutputFormat, ShowArgs};
use tempfile::TempDir;

fn write_fixture(dir: &TempDir) {
	fs::write(
		dir.path().join("services.yaml"),
		indoc! {"
			apiVersion: v1
			kind: Service
			metadata:
			  name: web
			  namespace: prod
			spec:
			  ports:
			    - port: 80
			---
			apiVersion: v1
			kind: List
			items:
			  - apiVersion: v1
			    kind: ConfigMap
			    metadata:
			      name: settings
			      namespace: prod
			    data:
			      mode: fast
		"},
	)
	.unwrap();
	fs::write(
		dir.path().join("namespace.json"),
		r#"{"apiVersion": "v1", "kind": "Namespace", "metadata": {"name": "prod"}}"#,
	)
	.unwrap();
	fs::write(dir.path().join("notes.txt"), "ignored\n").unwrap();
}

#[test]
fn test_show_directory_as_yaml() {
	let temp = TempDir::new().unwrap();
	write_fixture(&temp);

	let mut out = Vec::new();
	run(
		ShowArgs {
			paths: vec![temp.path().to_path_buf()],
			format: OutputFormat::Yaml,
		},
		&mut out,
	)
	.unwrap();

	assert_eq!(
		String::from_utf8(out).unwrap(),
		indoc! {"
			---
			apiVersion: v1
			data:
			  mode: fast
			kind: ConfigMap
			metadata:
			  name: settings
			  namespace: prod
			---
			apiVersion: v1
			kind: Namespace
			metadata:
			  name: prod
			---
			apiVersion: v1
			kind: Service
			metadata:
			  name: web
			  namespace: prod
			spec:
			  ports:
			    - port: 80
		"}
	);
}

#[test]
fn test_show_file_as_json() {
	let temp = TempDir::new().unwrap();
	write_fixture(&temp);

	let mut out = Vec::new();
	run(
		ShowArgs {
			paths: vec![temp.path().join("namespace.json")],
			format: OutputFormat::Json,
		},
		&mut out,
	)
	.unwrap();

	let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
	assert_eq!(value["kind"], "Namespace");
	assert_eq!(value["metadata"]["name"], "prod");
}

#[test]
fn test_show_invalid_object_fails() {
	let temp = TempDir::new().unwrap();
	let path = temp.path().join("bad.yaml");
	fs::write(&path, "kind: ConfigMap\nmetadata:\n  name: x\n").unwrap();

	let err = run(
		ShowArgs {
			paths: vec![path],
			format: OutputFormat::Yaml,
		},
		Vec::new(),
	)
	.unwrap_err();
	assert!(err.to_string().contains("bad.yaml"), "{err:#}");
}
