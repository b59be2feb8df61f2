//! Predicates over JSON-like values.

use serde_json::{Number, Value};

/// Whether a value is "empty": null, `false`, numeric zero, or an empty
/// string, sequence or mapping.
///
/// Numeric zero counts as empty no matter how it is represented, so `0`,
/// `0.0` and `-0.0` are all empty.
pub fn is_empty(value: &Value) -> bool {
	match value {
		Value::Null => true,
		Value::Bool(b) => !b,
		Value::Number(n) => is_zero(n),
		Value::String(s) => s.is_empty(),
		Value::Array(items) => items.is_empty(),
		Value::Object(map) => map.is_empty(),
	}
}

#[allow(clippy::float_cmp)]
fn is_zero(n: &Number) -> bool {
	if let Some(i) = n.as_i64() {
		return i == 0;
	}
	if let Some(u) = n.as_u64() {
		return u == 0;
	}
	n.as_f64().is_some_and(|f| f == 0.0)
}

/// Compare two numbers by value, so that `1` and `1.0` are equal.
#[allow(clippy::float_cmp)]
pub fn numbers_equal(a: &Number, b: &Number) -> bool {
	if let (Some(a), Some(b)) = (a.as_i64(), b.as_i64()) {
		return a == b;
	}
	if let (Some(a), Some(b)) = (a.as_u64(), b.as_u64()) {
		return a == b;
	}
	match (a.as_f64(), b.as_f64()) {
		(Some(a), Some(b)) => a == b,
		_ => false,
	}
}

/// Deep, type-sensitive equality.
///
/// Values of different kinds are never equal (`"1"` is not `1`, `null` is
/// not `{}`). Mappings are compared without regard to key order.
pub fn values_equal(a: &Value, b: &Value) -> bool {
	match (a, b) {
		(Value::Null, Value::Null) => true,
		(Value::Bool(a), Value::Bool(b)) => a == b,
		(Value::Number(a), Value::Number(b)) => numbers_equal(a, b),
		(Value::String(a), Value::String(b)) => a == b,
		(Value::Array(a), Value::Array(b)) => {
			a.len() == b.len() && a.iter().zip(b).all(|(a, b)| values_equal(a, b))
		}
		(Value::Object(a), Value::Object(b)) => {
			a.len() == b.len()
				&& a
					.iter()
					.all(|(key, a)| b.get(key).is_some_and(|b| values_equal(a, b)))
		}
		_ => false,
	}
}
