//! Redaction of Secret payloads in diff output.

use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

const SECRET_FIELDS: [&str; 2] = ["data", "stringData"];

/// Placeholder for a secret value: the first 12 hex digits of the SHA-256 of
/// its JSON text.
///
/// Equal values produce equal placeholders, so a changed secret still shows
/// up in the diff.
pub fn placeholder(value: &Value) -> String {
	let digest = Sha256::digest(value.to_string().as_bytes());
	let hex = format!("{digest:x}");
	format!("<omitted sha256:{}>", &hex[..12])
}

/// Copy of `object` with every `data`/`stringData` value replaced by its
/// placeholder. Objects that are not a `Secret` are returned unchanged.
pub fn omit_secret_values(object: &Value) -> Value {
	let Some(map) = object.as_object() else {
		return object.clone();
	};
	if map.get("kind").and_then(Value::as_str) != Some("Secret") {
		return object.clone();
	}

	let redacted = map
		.iter()
		.map(|(key, value)| {
			let value = match value {
				Value::Object(entries) if SECRET_FIELDS.contains(&key.as_str()) => {
					Value::Object(redact_entries(entries))
				}
				other => other.clone(),
			};
			(key.clone(), value)
		})
		.collect();
	Value::Object(redacted)
}

fn redact_entries(entries: &Map<String, Value>) -> Map<String, Value> {
	entries
		.iter()
		.map(|(key, value)| (key.clone(), Value::String(placeholder(value))))
		.collect()
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;

	#[test]
	fn test_placeholder_format() {
		let text = placeholder(&json!("hunter2"));
		assert!(text.starts_with("<omitted sha256:"));
		assert!(text.ends_with('>'));
		let hex = &text["<omitted sha256:".len()..text.len() - 1];
		assert_eq!(hex.len(), 12);
		assert!(hex.chars().all(|c| c.is_ascii_hexdigit()));
	}

	#[test]
	fn test_placeholder_tracks_value() {
		assert_eq!(placeholder(&json!("a")), placeholder(&json!("a")));
		assert_ne!(placeholder(&json!("a")), placeholder(&json!("b")));
	}

	#[test]
	fn test_omit_secret_values() {
		let secret = json!({
			"apiVersion": "v1",
			"kind": "Secret",
			"metadata": {"name": "creds"},
			"data": {"password": "aHVudGVyMg=="},
			"stringData": {"token": "abc"},
			"type": "Opaque"
		});

		let redacted = omit_secret_values(&secret);

		assert_eq!(redacted["data"]["password"], placeholder(&json!("aHVudGVyMg==")));
		assert_eq!(redacted["stringData"]["token"], placeholder(&json!("abc")));
		assert_eq!(redacted["metadata"], secret["metadata"]);
		assert_eq!(redacted["type"], "Opaque");
		assert_eq!(secret["data"]["password"], "aHVudGVyMg==");
	}

	#[test]
	fn test_other_kinds_untouched() {
		let config_map = json!({
			"apiVersion": "v1",
			"kind": "ConfigMap",
			"metadata": {"name": "c"},
			"data": {"password": "plain"}
		});
		assert_eq!(omit_secret_values(&config_map), config_map);
	}
}
