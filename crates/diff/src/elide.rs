//! Subset elision of live values.
//!
//! In subset mode only the fields a user actually wrote down are compared.
//! [`elide`] projects the live value onto the shape of the desired value,
//! dropping everything the server added on its own. The desired value is
//! never touched.

use serde_json::{Map, Value};

use crate::value::is_empty;

/// Project `live` onto the fields present in `desired`.
///
/// - Mappings keep only keys that `desired` has. A key missing from `live`
///   is carried over from `desired` when its desired value is empty, so an
///   explicit `""` or `{}` compares equal instead of being silently lost.
/// - Sequences are elided element by element. Live elements past the end
///   of the desired sequence are kept as-is so length differences show up.
/// - Anything else, including a shape mismatch between the two sides,
///   yields `live` unchanged.
pub fn elide(desired: &Value, live: &Value) -> Value {
	match (desired, live) {
		(Value::Object(desired), Value::Object(live)) => Value::Object(elide_map(desired, live)),
		(Value::Array(desired), Value::Array(live)) => Value::Array(elide_list(desired, live)),
		(_, live) => live.clone(),
	}
}

fn elide_map(desired: &Map<String, Value>, live: &Map<String, Value>) -> Map<String, Value> {
	let mut projected = Map::new();
	for (key, wanted) in desired {
		match live.get(key) {
			Some(current) => {
				projected.insert(key.clone(), elide(wanted, current));
			}
			None if is_empty(wanted) => {
				projected.insert(key.clone(), wanted.clone());
			}
			None => {}
		}
	}
	projected
}

fn elide_list(desired: &[Value], live: &[Value]) -> Vec<Value> {
	live.iter()
		.enumerate()
		.map(|(i, current)| match desired.get(i) {
			Some(wanted) => elide(wanted, current),
			None => current.clone(),
		})
		.collect()
}
