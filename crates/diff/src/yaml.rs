//! YAML serialization for human-facing output.

use serde_json::Value;

/// Rebuild a value with every mapping's keys in sorted order.
pub fn sort_keys(value: &Value) -> Value {
	match value {
		Value::Object(map) => {
			let mut entries: Vec<_> = map.iter().collect();
			entries.sort_by(|(a, _), (b, _)| a.cmp(b));
			Value::Object(
				entries
					.into_iter()
					.map(|(key, value)| (key.clone(), sort_keys(value)))
					.collect(),
			)
		}
		Value::Array(items) => Value::Array(items.iter().map(sort_keys).collect()),
		other => other.clone(),
	}
}

/// Serialize a value as a single YAML document body with sorted keys.
///
/// The leading document marker is dropped and the text always ends with a
/// newline, so documents can be concatenated with explicit `---` separators.
pub fn to_yaml(value: &Value) -> Result<String, serde_yaml_with_quirks::Error> {
	let text = serde_yaml_with_quirks::to_string(&sort_keys(value))?;
	let body = text
		.strip_prefix("---\n")
		.or_else(|| text.strip_prefix("--- "))
		.unwrap_or(&text);

	let mut body = body.to_string();
	if !body.ends_with('\n') {
		body.push('\n');
	}
	Ok(body)
}
