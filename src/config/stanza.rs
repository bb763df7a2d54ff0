use crate::config::merge::deep_merge;
use crate::config::types::{Mapping, Value};
use crate::error::{ConfigError, Result};
use std::path::Path;

/// A family of top-level section labels sharing a common prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StanzaFamily {
	/// `defaults`, `defaults[env,...]`, and the bare environment label.
	Data,

	/// `env_vars` and `env_vars[env,...]`.
	EnvVars,
}

impl StanzaFamily {
	/// Get the label prefix for this family.
	pub fn prefix(&self) -> &'static str {
		match self {
			StanzaFamily::Data => "defaults",
			StanzaFamily::EnvVars => "env_vars",
		}
	}
}

/// Select the section labels that apply to `environment`.
///
/// Labels are returned least specific first:
/// 1. the bare prefix label (`defaults` / `env_vars`)
/// 2. every `prefix[...]` label whose bracket list mentions `environment`,
///    ordered by ascending comma count, so a label listing more environments
///    applies later and wins; ties keep document order
/// 3. for the data family, the label equal to `environment`
pub fn select_stanzas<'a>(
	document: &'a Mapping,
	environment: &str,
	family: StanzaFamily,
) -> Vec<&'a str> {
	let prefix = family.prefix();
	let mut labels = Vec::new();

	if let Some((label, _)) = document.get_key_value(prefix) {
		labels.push(label.as_str());
	}

	let mut bracketed: Vec<&str> = document
		.keys()
		.map(String::as_str)
		.filter(|label| {
			label
				.strip_prefix(prefix)
				.and_then(|rest| rest.strip_prefix('['))
				.is_some_and(|list| list.contains(environment))
		})
		.collect();
	// sort_by_key is stable
	bracketed.sort_by_key(|label| label.matches(',').count());
	labels.extend(bracketed);

	if family == StanzaFamily::Data
		&& environment != prefix
		&& let Some((label, _)) = document.get_key_value(environment)
	{
		labels.push(label.as_str());
	}

	labels
}

/// Deep-merge the sections named by `labels`, in order.
///
/// A section with a null body contributes nothing.
pub fn fold_stanzas(document: &Mapping, labels: &[&str], path: &Path) -> Result<Mapping> {
	let mut merged = Mapping::new();

	for label in labels {
		match document.get(*label) {
			None | Some(Value::Null) => {}
			Some(Value::Mapping(section)) => merged = deep_merge(&merged, section),
			Some(_) => {
				return Err(ConfigError::InvalidStanza {
					path: path.to_path_buf(),
					label: label.to_string(),
				});
			}
		}
	}

	Ok(merged)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::mapping;
	use std::path::PathBuf;

	fn section(key: &str, value: &str) -> Value {
		Value::Mapping(mapping! { key => value })
	}

	#[test]
	fn test_select_defaults_bracket_and_env() {
		let doc = mapping! {
			"staging" => section("a", "staging"),
			"defaults[staging,qa]" => section("a", "bracket"),
			"defaults" => section("a", "defaults"),
		};

		let labels = select_stanzas(&doc, "staging", StanzaFamily::Data);
		assert_eq!(labels, vec!["defaults", "defaults[staging,qa]", "staging"]);
	}

	#[test]
	fn test_more_environments_apply_later() {
		let doc = mapping! {
			"defaults[development]" => section("a", "one"),
			"defaults[development,test,staging]" => section("a", "three"),
			"defaults[development,test]" => section("a", "two"),
		};

		let labels = select_stanzas(&doc, "development", StanzaFamily::Data);
		assert_eq!(
			labels,
			vec![
				"defaults[development]",
				"defaults[development,test]",
				"defaults[development,test,staging]",
			]
		);

		let merged = fold_stanzas(&doc, &labels, &PathBuf::from("test.yml")).unwrap();
		assert_eq!(merged, mapping! { "a" => "three" });
	}

	#[test]
	fn test_ties_keep_document_order() {
		let doc = mapping! {
			"defaults[test,b]" => section("a", "first"),
			"defaults[a,test]" => section("a", "second"),
		};

		let labels = select_stanzas(&doc, "test", StanzaFamily::Data);
		assert_eq!(labels, vec!["defaults[test,b]", "defaults[a,test]"]);
	}

	#[test]
	fn test_non_matching_labels_excluded() {
		let doc = mapping! {
			"defaults" => section("a", "defaults"),
			"defaults[production]" => section("a", "prod"),
			"production" => section("a", "prod"),
			"env_vars" => section("a", "A"),
		};

		let labels = select_stanzas(&doc, "test", StanzaFamily::Data);
		assert_eq!(labels, vec!["defaults"]);
	}

	#[test]
	fn test_env_vars_family_has_no_bare_environment_label() {
		let doc = mapping! {
			"env_vars" => section("a", "A"),
			"env_vars[test]" => section("b", "B"),
			"test" => section("c", "c"),
			"defaults[test]" => section("d", "d"),
		};

		let labels = select_stanzas(&doc, "test", StanzaFamily::EnvVars);
		assert_eq!(labels, vec!["env_vars", "env_vars[test]"]);
	}

	#[test]
	fn test_fold_applies_later_stanzas_on_top() {
		let doc = mapping! {
			"defaults" => mapping! { "a" => "defaults", "b" => "defaults" },
			"defaults[staging,qa]" => mapping! { "b" => "bracket", "c" => "bracket" },
			"staging" => mapping! { "c" => "staging" },
		};

		let labels = select_stanzas(&doc, "staging", StanzaFamily::Data);
		let merged = fold_stanzas(&doc, &labels, &PathBuf::from("test.yml")).unwrap();

		assert_eq!(
			merged,
			mapping! { "a" => "defaults", "b" => "bracket", "c" => "staging" }
		);
	}

	#[test]
	fn test_fold_skips_empty_sections() {
		let doc = mapping! {
			"defaults" => mapping! { "a" => "defaults" },
			"test" => Value::Null,
		};

		let labels = select_stanzas(&doc, "test", StanzaFamily::Data);
		assert_eq!(labels, vec!["defaults", "test"]);

		let merged = fold_stanzas(&doc, &labels, &PathBuf::from("test.yml")).unwrap();
		assert_eq!(merged, mapping! { "a" => "defaults" });
	}

	#[test]
	fn test_fold_rejects_scalar_sections() {
		let doc = mapping! { "defaults" => "not a mapping" };
		let result = fold_stanzas(&doc, &["defaults"], &PathBuf::from("test.yml"));

		match result.unwrap_err() {
			ConfigError::InvalidStanza { label, .. } => assert_eq!(label, "defaults"),
			other => panic!("Expected InvalidStanza error, got {other:?}"),
		}
	}
}
