use crate::config::types::{Mapping, Value};

/// Merge two mappings, recursing through nested mappings.
///
/// For every key in either input: if both sides hold a mapping, the two are
/// merged recursively; otherwise the overlay's value wins when present.
/// Sequences are replaced wholesale, never merged element-wise. Neither
/// input is modified.
pub fn deep_merge(base: &Mapping, overlay: &Mapping) -> Mapping {
	let mut merged = base.clone();

	for (key, value) in overlay {
		let combined = match (merged.get(key), value) {
			(Some(Value::Mapping(existing)), Value::Mapping(incoming)) => {
				Value::Mapping(deep_merge(existing, incoming))
			}
			_ => value.clone(),
		};
		// an existing key keeps its position
		merged.insert(key.clone(), combined);
	}

	merged
}
