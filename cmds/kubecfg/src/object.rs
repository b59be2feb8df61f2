//! Desired objects and their identity.

use std::fmt;

use serde_json::Value;
use thiserror::Error;

/// Errors raised when a value cannot be used as a desired object.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ObjectError {
	#[error("expected a mapping, found {0}")]
	NotAMapping(&'static str),

	#[error("missing {0}")]
	MissingField(&'static str),
}

/// Name of a value's variant, for error messages.
pub fn type_name(value: &Value) -> &'static str {
	match value {
		Value::Null => "null",
		Value::Bool(_) => "boolean",
		Value::Number(_) => "number",
		Value::String(_) => "string",
		Value::Array(_) => "sequence",
		Value::Object(_) => "mapping",
	}
}

/// One resource as the user wrote it down.
///
/// Identity fields are validated and extracted once at construction; the
/// value itself is never modified afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct DesiredObject {
	value: Value,
	api_version: String,
	kind: String,
	namespace: Option<String>,
	name: String,
}

impl DesiredObject {
	pub fn new(value: Value) -> Result<Self, ObjectError> {
		if !value.is_object() {
			return Err(ObjectError::NotAMapping(type_name(&value)));
		}

		let field = |pointer: &str, label: &'static str| {
			value
				.pointer(pointer)
				.and_then(Value::as_str)
				.filter(|s| !s.is_empty())
				.map(str::to_string)
				.ok_or(ObjectError::MissingField(label))
		};
		let api_version = field("/apiVersion", "apiVersion")?;
		let kind = field("/kind", "kind")?;
		let name = field("/metadata/name", "metadata.name")?;
		let namespace = field("/metadata/namespace", "metadata.namespace").ok();

		Ok(Self {
			value,
			api_version,
			kind,
			namespace,
			name,
		})
	}

	pub fn value(&self) -> &Value {
		&self.value
	}

	pub fn into_value(self) -> Value {
		self.value
	}

	pub fn api_version(&self) -> &str {
		&self.api_version
	}

	pub fn kind(&self) -> &str {
		&self.kind
	}

	/// The namespace written in the object, if any.
	pub fn namespace(&self) -> Option<&str> {
		self.namespace.as_deref()
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	/// Identity with the namespace the object will actually live in.
	pub fn identity(&self, namespace: Option<&str>) -> ResourceIdentity {
		ResourceIdentity {
			kind: self.kind.clone(),
			namespace: namespace.map(str::to_string),
			name: self.name.clone(),
		}
	}
}

impl TryFrom<Value> for DesiredObject {
	type Error = ObjectError;

	fn try_from(value: Value) -> Result<Self, Self::Error> {
		Self::new(value)
	}
}

/// `(kind, namespace, name)` of a resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceIdentity {
	pub kind: String,
	pub namespace: Option<String>,
	pub name: String,
}

impl fmt::Display for ResourceIdentity {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match &self.namespace {
			Some(ns) => write!(f, "{} {}/{}", self.kind, ns, self.name),
			None => write!(f, "{} {}", self.kind, self.name),
		}
	}
}

#[cfg(test)]
mod tests {
	use assert_matches::assert_matches;
	use rstest::rstest;
	use serde_json::json;

	use super::*;

	#[test]
	fn test_new_extracts_identity() {
		let obj = DesiredObject::new(json!({
			"apiVersion": "apps/v1",
			"kind": "Deployment",
			"metadata": {"name": "web", "namespace": "prod"}
		}))
		.unwrap();

		assert_eq!(obj.api_version(), "apps/v1");
		assert_eq!(obj.kind(), "Deployment");
		assert_eq!(obj.namespace(), Some("prod"));
		assert_eq!(obj.name(), "web");
	}

	#[test]
	fn test_namespace_optional() {
		let obj = DesiredObject::new(json!({
			"apiVersion": "v1",
			"kind": "Namespace",
			"metadata": {"name": "prod"}
		}))
		.unwrap();
		assert_eq!(obj.namespace(), None);
	}

	#[rstest]
	#[case::sequence(json!([1]), ObjectError::NotAMapping("sequence"))]
	#[case::string(json!("x"), ObjectError::NotAMapping("string"))]
	#[case::no_api_version(
		json!({"kind": "ConfigMap", "metadata": {"name": "a"}}),
		ObjectError::MissingField("apiVersion")
	)]
	#[case::no_kind(
		json!({"apiVersion": "v1", "metadata": {"name": "a"}}),
		ObjectError::MissingField("kind")
	)]
	#[case::no_name(
		json!({"apiVersion": "v1", "kind": "ConfigMap", "metadata": {}}),
		ObjectError::MissingField("metadata.name")
	)]
	#[case::empty_name(
		json!({"apiVersion": "v1", "kind": "ConfigMap", "metadata": {"name": ""}}),
		ObjectError::MissingField("metadata.name")
	)]
	#[case::numeric_kind(
		json!({"apiVersion": "v1", "kind": 3, "metadata": {"name": "a"}}),
		ObjectError::MissingField("kind")
	)]
	fn test_new_rejects(#[case] value: Value, #[case] expected: ObjectError) {
		assert_matches!(DesiredObject::new(value), Err(e) if e == expected);
	}

	#[test]
	fn test_identity_display() {
		let obj = DesiredObject::new(json!({
			"apiVersion": "v1",
			"kind": "Service",
			"metadata": {"name": "web"}
		}))
		.unwrap();

		assert_eq!(obj.identity(Some("default")).to_string(), "Service default/web");
		assert_eq!(obj.identity(None).to_string(), "Service web");
	}
}
