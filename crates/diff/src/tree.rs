//! Structural diff tree between two JSON-like values.

use std::{collections::BTreeSet, fmt};

use serde_json::{Map, Value};

use crate::value::values_equal;

/// A node of the structural diff.
///
/// The tree mirrors the compared structure: containers that exist on both
/// sides with the same shape become [`Delta::Object`] or [`Delta::Array`],
/// and every leaf records whether it is unchanged, added, removed or
/// replaced. Unchanged leaves are kept so renderers can show context.
#[derive(Debug, Clone, PartialEq)]
pub enum Delta {
	/// Present and equal on both sides.
	Same(Value),
	/// Only present on the right (config) side.
	Added(Value),
	/// Only present on the left (live) side.
	Removed(Value),
	/// Present on both sides with a different value or a different shape.
	Replaced { old: Value, new: Value },
	/// Mapping on both sides. Children are sorted by key.
	Object(Vec<(String, Delta)>),
	/// Sequence on both sides, compared position by position.
	Array(Vec<Delta>),
}

impl Delta {
	/// Compute the delta turning `left` into `right`.
	pub fn compute(left: &Value, right: &Value) -> Self {
		match (left, right) {
			(Value::Object(left), Value::Object(right)) => Self::Object(object_children(left, right)),
			(Value::Array(left), Value::Array(right)) => {
				let len = left.len().max(right.len());
				Self::Array(
					(0..len)
						.filter_map(|i| child_delta(left.get(i), right.get(i)))
						.collect(),
				)
			}
			(left, right) if values_equal(left, right) => Self::Same(left.clone()),
			(left, right) => Self::Replaced {
				old: left.clone(),
				new: right.clone(),
			},
		}
	}

	/// Whether this node or any node below it records a change.
	pub fn is_modified(&self) -> bool {
		match self {
			Self::Same(_) => false,
			Self::Added(_) | Self::Removed(_) | Self::Replaced { .. } => true,
			Self::Object(children) => children.iter().any(|(_, child)| child.is_modified()),
			Self::Array(items) => items.iter().any(Delta::is_modified),
		}
	}

	/// Rebuild the left-hand value, `None` if this node only exists on the right.
	pub fn left(&self) -> Option<Value> {
		match self {
			Self::Same(v) | Self::Removed(v) | Self::Replaced { old: v, .. } => Some(v.clone()),
			Self::Added(_) => None,
			Self::Object(children) => Some(Value::Object(
				children
					.iter()
					.filter_map(|(key, child)| child.left().map(|v| (key.clone(), v)))
					.collect(),
			)),
			Self::Array(items) => Some(Value::Array(items.iter().filter_map(Delta::left).collect())),
		}
	}

	/// Rebuild the right-hand value, `None` if this node only exists on the left.
	pub fn right(&self) -> Option<Value> {
		match self {
			Self::Same(v) | Self::Added(v) | Self::Replaced { new: v, .. } => Some(v.clone()),
			Self::Removed(_) => None,
			Self::Object(children) => Some(Value::Object(
				children
					.iter()
					.filter_map(|(key, child)| child.right().map(|v| (key.clone(), v)))
					.collect(),
			)),
			Self::Array(items) => Some(Value::Array(items.iter().filter_map(Delta::right).collect())),
		}
	}

	fn collect_changes<'a>(&'a self, path: &mut Vec<PathSegment>, out: &mut Vec<Change<'a>>) {
		let op = match self {
			Self::Same(_) => return,
			Self::Added(new) => Op::Add { new },
			Self::Removed(old) => Op::Remove { old },
			Self::Replaced { old, new } => Op::Replace { old, new },
			Self::Object(children) => {
				for (key, child) in children {
					path.push(PathSegment::Key(key.clone()));
					child.collect_changes(path, out);
					path.pop();
				}
				return;
			}
			Self::Array(items) => {
				for (index, child) in items.iter().enumerate() {
					path.push(PathSegment::Index(index));
					child.collect_changes(path, out);
					path.pop();
				}
				return;
			}
		};
		out.push(Change {
			path: path.clone(),
			op,
		});
	}
}

fn object_children(left: &Map<String, Value>, right: &Map<String, Value>) -> Vec<(String, Delta)> {
	let keys: BTreeSet<&String> = left.keys().chain(right.keys()).collect();
	keys.into_iter()
		.filter_map(|key| {
			child_delta(left.get(key), right.get(key)).map(|delta| (key.clone(), delta))
		})
		.collect()
}

fn child_delta(left: Option<&Value>, right: Option<&Value>) -> Option<Delta> {
	match (left, right) {
		(Some(left), Some(right)) => Some(Delta::compute(left, right)),
		(Some(left), None) => Some(Delta::Removed(left.clone())),
		(None, Some(right)) => Some(Delta::Added(right.clone())),
		(None, None) => None,
	}
}

/// One step of a path into a value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
	Key(String),
	Index(usize),
}

/// A single differing path with the operation that turns left into right.
#[derive(Debug, Clone, PartialEq)]
pub struct Change<'a> {
	pub path: Vec<PathSegment>,
	pub op: Op<'a>,
}

impl Change<'_> {
	/// The path as an RFC 6901 JSON pointer, e.g. `/spec/ports/0/port`.
	pub fn pointer(&self) -> String {
		let mut out = String::new();
		for segment in &self.path {
			out.push('/');
			match segment {
				PathSegment::Key(key) => out.push_str(&key.replace('~', "~0").replace('/', "~1")),
				PathSegment::Index(index) => out.push_str(&index.to_string()),
			}
		}
		out
	}
}

impl fmt::Display for Change<'_> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let path = self.pointer();
		let path = if path.is_empty() { "/" } else { path.as_str() };
		match self.op {
			Op::Add { new } => write!(f, "add {path}: {new}"),
			Op::Remove { old } => write!(f, "remove {path}: {old}"),
			Op::Replace { old, new } => write!(f, "replace {path}: {old} -> {new}"),
		}
	}
}

/// The operation recorded for a differing path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Op<'a> {
	Add { new: &'a Value },
	Remove { old: &'a Value },
	Replace { old: &'a Value, new: &'a Value },
}

/// Structural diff between a live (left) and a config (right) value.
#[derive(Debug, Clone, PartialEq)]
pub struct DiffTree {
	root: Delta,
}

impl DiffTree {
	pub fn compute(live: &Value, config: &Value) -> Self {
		Self {
			root: Delta::compute(live, config),
		}
	}

	pub fn root(&self) -> &Delta {
		&self.root
	}

	/// True iff the tree records at least one operation.
	pub fn is_modified(&self) -> bool {
		self.root.is_modified()
	}

	/// Every differing path in depth-first, key-sorted order.
	pub fn changes(&self) -> Vec<Change<'_>> {
		let mut out = Vec::new();
		self.root.collect_changes(&mut Vec::new(), &mut out);
		out
	}

	/// The live value the tree was computed from.
	pub fn live(&self) -> Value {
		self.root.left().unwrap_or(Value::Null)
	}

	/// The config value the tree was computed from.
	pub fn config(&self) -> Value {
		self.root.right().unwrap_or(Value::Null)
	}
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;

	fn rendered_changes(tree: &DiffTree) -> Vec<String> {
		tree.changes().iter().map(ToString::to_string).collect()
	}

	#[test]
	fn test_identical_values_unmodified() {
		let value = json!({"a": [1, {"b": null}], "c": "x"});
		let tree = DiffTree::compute(&value, &value);
		assert!(!tree.is_modified());
		assert!(tree.changes().is_empty());
	}

	#[test]
	fn test_changes_record_operations() {
		let live = json!({"keep": 1, "gone": true, "spec": {"replicas": 2}});
		let config = json!({"keep": 1, "spec": {"replicas": 3}, "new": "x"});
		let tree = DiffTree::compute(&live, &config);

		assert!(tree.is_modified());
		assert_eq!(
			rendered_changes(&tree),
			vec![
				"remove /gone: true",
				"add /new: \"x\"",
				"replace /spec/replicas: 2 -> 3",
			]
		);
	}

	#[test]
	fn test_arrays_compared_by_position() {
		let tree = DiffTree::compute(&json!(["p", "q", "r"]), &json!(["p"]));
		assert_eq!(
			rendered_changes(&tree),
			vec!["remove /1: \"q\"", "remove /2: \"r\""]
		);

		let tree = DiffTree::compute(&json!([1]), &json!([1, 2]));
		assert_eq!(rendered_changes(&tree), vec!["add /1: 2"]);
	}

	#[test]
	fn test_shape_change_is_replace() {
		let tree = DiffTree::compute(&json!({"a": {"b": 1}}), &json!({"a": [1]}));
		assert_eq!(rendered_changes(&tree), vec!["replace /a: {\"b\":1} -> [1]"]);

		let tree = DiffTree::compute(&json!("1"), &json!(1));
		assert_eq!(rendered_changes(&tree), vec!["replace /: \"1\" -> 1"]);
	}

	#[test]
	fn test_numeric_representation_is_not_a_change() {
		let tree = DiffTree::compute(&json!({"port": 80}), &json!({"port": 80.0}));
		assert!(!tree.is_modified());
	}

	#[test]
	fn test_pointer_escapes_keys() {
		let tree = DiffTree::compute(
			&json!({"metadata": {"annotations": {"a/b~c": "1"}}}),
			&json!({"metadata": {"annotations": {"a/b~c": "2"}}}),
		);
		let changes = tree.changes();
		assert_eq!(changes[0].pointer(), "/metadata/annotations/a~1b~0c");
	}

	#[test]
	fn test_sides_round_trip() {
		let live = json!({"a": [1, 2, 3], "b": {"c": "x"}, "d": null});
		let config = json!({"a": [1, 5], "b": {"c": "x", "e": []}, "f": false});
		let tree = DiffTree::compute(&live, &config);

		assert_eq!(tree.live(), live);
		assert_eq!(tree.config(), config);
	}

	#[test]
	fn test_compute_is_deterministic() {
		let live = json!({"z": 1, "a": {"y": [1, 2], "b": "x"}});
		let config = json!({"a": {"b": "y", "y": [2]}, "z": 1});
		assert_eq!(
			DiffTree::compute(&live, &config),
			DiffTree::compute(&live, &config)
		);
	}
}
