//! Deterministic ordering of desired objects.

use std::cmp::Ordering;

use crate::object::DesiredObject;

fn sort_key(obj: &DesiredObject) -> (&str, &str, &str, &str) {
	(
		obj.api_version(),
		obj.kind(),
		obj.namespace().unwrap_or(""),
		obj.name(),
	)
}

/// Compare by `(apiVersion, kind, namespace, name)`, a missing namespace
/// sorting as the empty string.
pub fn compare(a: &DesiredObject, b: &DesiredObject) -> Ordering {
	sort_key(a).cmp(&sort_key(b))
}

/// The objects in report order. Equal keys keep their input order.
pub fn sorted(objects: &[DesiredObject]) -> Vec<&DesiredObject> {
	let mut ordered: Vec<_> = objects.iter().collect();
	ordered.sort_by(|a, b| compare(a, b));
	ordered
}
