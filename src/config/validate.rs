use crate::config::types::{Mapping, Value};
use crate::error::{ConfigError, Result};

/// Collect a message for every `!REQUIRED` leaf below `value`.
///
/// Paths use dot notation for mapping keys and brackets for sequence
/// indices, e.g. `app.servers[0].host`.
pub fn detect_errors(value: &Value, path: &str) -> Vec<String> {
	let mut errors = Vec::new();
	collect(value, path, &mut errors);
	errors
}

fn collect(value: &Value, path: &str, errors: &mut Vec<String>) {
	match value {
		Value::Mapping(mapping) => {
			for (key, item) in mapping {
				collect(item, &format!("{path}.{key}"), errors);
			}
		}
		Value::Sequence(items) => {
			for (index, item) in items.iter().enumerate() {
				collect(item, &format!("{path}[{index}]"), errors);
			}
		}
		Value::Required => errors.push(format!("{path} is REQUIRED")),
		_ => {}
	}
}

/// Fail with every unmet required field, qualified by `environment`.
pub fn validate(mapping: &Mapping, name: &str, environment: &str) -> Result<()> {
	let mut errors = Vec::new();
	for (key, item) in mapping {
		collect(item, &format!("{name}.{key}"), &mut errors);
	}

	if errors.is_empty() {
		return Ok(());
	}

	Err(ConfigError::MissingRequired {
		environment: environment.to_string(),
		errors: errors
			.into_iter()
			.map(|error| format!("{error} for {environment}"))
			.collect(),
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::mapping;

	#[test]
	fn test_no_required_values() {
		let m = mapping! { "a" => "set", "b" => mapping! { "c" => 1_i64 } };
		assert!(validate(&m, "app", "test").is_ok());
	}

	#[test]
	fn test_paths_for_nested_and_sequence_values() {
		let value = Value::from(mapping! {
			"one" => Value::Required,
			"tree" => mapping! { "leaf" => Value::Required },
			"array" => vec![
				Value::from(mapping! { "key1" => "set" }),
				Value::from(mapping! { "key1" => Value::Required }),
			],
			"list" => vec![Value::Required],
		});

		assert_eq!(
			detect_errors(&value, "app"),
			vec![
				"app.one is REQUIRED",
				"app.tree.leaf is REQUIRED",
				"app.array[1].key1 is REQUIRED",
				"app.list[0] is REQUIRED",
			]
		);
	}

	#[test]
	fn test_all_errors_reported_together() {
		let m = mapping! {
			"one" => Value::Required,
			"array" => vec![Value::from(mapping! { "key1" => Value::Required })],
		};

		match validate(&m, "one", "staging").unwrap_err() {
			ConfigError::MissingRequired {
				environment,
				errors,
			} => {
				assert_eq!(environment, "staging");
				assert_eq!(
					errors,
					vec![
						"one.one is REQUIRED for staging",
						"one.array[0].key1 is REQUIRED for staging",
					]
				);
			}
			other => panic!("Expected MissingRequired error, got {other:?}"),
		}
	}

	#[test]
	fn test_error_message_lists_every_violation() {
		let m = mapping! { "a" => Value::Required, "b" => Value::Required };
		let message = validate(&m, "app", "production").unwrap_err().to_string();

		assert!(message.contains("app.a is REQUIRED for production"));
		assert!(message.contains("app.b is REQUIRED for production"));
	}
}
