use crate::config::env::fill_env_vars;
use crate::config::merge::deep_merge;
use crate::config::parser::parse_config_file;
use crate::config::stanza::{StanzaFamily, fold_stanzas, select_stanzas};
use crate::config::types::Mapping;
use crate::config::validate::validate;
use crate::error::Result;
use crate::materialize::{ConfigValue, TypeNamespace, materialize};
use crate::preprocess::Preprocessor;
use std::path::{Path, PathBuf};

/// Config name used by [`build_from_mapping`] when none is given.
pub const DEFAULT_NAME: &str = "config";

/// Environment used by [`build_from_mapping`] when none is given.
pub const DEFAULT_ENVIRONMENT: &str = "development";

/// Options controlling how a configuration is loaded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadOptions {
	/// Text pass applied to each file before YAML parsing.
	pub preprocessor: Preprocessor,

	/// Tag records with synthesized per-shape types.
	pub typed: bool,
}

/// Paths of the primary and overrides files for a config name.
pub fn config_paths(name: &str, dir: &Path) -> (PathBuf, PathBuf) {
	(
		dir.join(format!("{name}.yml")),
		dir.join(format!("{name}-overrides.yml")),
	)
}

/// Load `dir/name.yml` (plus `dir/name-overrides.yml` if present) for
/// `environment` with default options.
pub fn load_config(name: &str, dir: &Path, environment: &str) -> Result<ConfigValue> {
	load_config_with(name, dir, environment, &LoadOptions::default())
}

/// Load, validate and materialize a configuration.
///
/// Every call re-reads the files; there is no caching between calls.
pub fn load_config_with(
	name: &str,
	dir: &Path,
	environment: &str,
	options: &LoadOptions,
) -> Result<ConfigValue> {
	let merged = load_merged(name, dir, environment, options.preprocessor)?;
	build(&merged, name, environment, options.typed)
}

/// Load the merged mapping for `environment` without validating it.
pub fn load_merged(
	name: &str,
	dir: &Path,
	environment: &str,
	preprocessor: Preprocessor,
) -> Result<Mapping> {
	let (primary, overrides) = config_paths(name, dir);

	let mut merged = load_file_for_env(&primary, environment, preprocessor)?;

	if overrides.exists() {
		tracing::debug!(path = %overrides.display(), "applying overrides file");
		let overrides = load_file_for_env(&overrides, environment, preprocessor)?;
		merged = deep_merge(&merged, &overrides);
	}

	Ok(merged)
}

/// Compute the merged data and env-var sections of one file.
pub fn load_file_for_env(
	path: &Path,
	environment: &str,
	preprocessor: Preprocessor,
) -> Result<Mapping> {
	tracing::debug!(path = %path.display(), environment, %preprocessor, "loading config file");
	let document = parse_config_file(path, preprocessor)?;

	let data_labels = select_stanzas(&document, environment, StanzaFamily::Data);
	tracing::debug!(path = %path.display(), labels = ?data_labels, "selected data stanzas");
	let data = fold_stanzas(&document, &data_labels, path)?;

	let env_labels = select_stanzas(&document, environment, StanzaFamily::EnvVars);
	tracing::debug!(path = %path.display(), labels = ?env_labels, "selected env_vars stanzas");
	let env_vars = fill_env_vars(&fold_stanzas(&document, &env_labels, path)?);

	Ok(deep_merge(&data, &env_vars))
}

/// Validate and materialize an in-memory mapping, bypassing file I/O.
///
/// `name` defaults to [`DEFAULT_NAME`] and `environment` to
/// [`DEFAULT_ENVIRONMENT`]; both only appear in paths and error messages.
pub fn build_from_mapping(
	mapping: &Mapping,
	name: Option<&str>,
	environment: Option<&str>,
	typed: bool,
) -> Result<ConfigValue> {
	build(
		mapping,
		name.unwrap_or(DEFAULT_NAME),
		environment.unwrap_or(DEFAULT_ENVIRONMENT),
		typed,
	)
}

fn build(mapping: &Mapping, name: &str, environment: &str, typed: bool) -> Result<ConfigValue> {
	validate(mapping, name, environment)?;

	if typed {
		let mut namespace = TypeNamespace::new();
		let config = materialize(mapping, name, Some(&mut namespace))?;
		tracing::debug!(root = namespace.root(), types = namespace.len(), "synthesized record types");
		Ok(config)
	} else {
		materialize(mapping, name, None)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::config::types::Value;
	use crate::error::ConfigError;
	use crate::mapping;
	use std::fs;

	#[test]
	fn test_config_paths() {
		let (primary, overrides) = config_paths("app", Path::new("/etc/myapp"));
		assert_eq!(primary, PathBuf::from("/etc/myapp/app.yml"));
		assert_eq!(overrides, PathBuf::from("/etc/myapp/app-overrides.yml"));
	}

	#[test]
	fn test_build_from_mapping_defaults() {
		let m = mapping! { "secret" => Value::Required };

		match build_from_mapping(&m, None, None, false).unwrap_err() {
			ConfigError::MissingRequired {
				environment,
				errors,
			} => {
				assert_eq!(environment, "development");
				assert_eq!(errors, vec!["config.secret is REQUIRED for development"]);
			}
			other => panic!("Expected MissingRequired error, got {other:?}"),
		}
	}

	#[test]
	fn test_build_from_mapping_named() {
		let m = mapping! { "name" => "demo" };
		let config = build_from_mapping(&m, Some("app"), Some("test"), true).unwrap();

		assert_eq!(config["name"], "demo");
		assert_eq!(config.as_record().unwrap().path(), "app");
		assert!(config.as_record().unwrap().type_name().is_some());
	}

	#[test]
	fn test_env_vars_override_data() {
		let dir = tempfile::tempdir().unwrap();
		fs::write(
			dir.path().join("app.yml"),
			r#"
defaults:
  database:
    host: localhost
    password: !REQUIRED
env_vars:
  database:
    password: HIERCONF_LOADER_TEST_PASSWORD
"#,
		)
		.unwrap();

		temp_env::with_var("HIERCONF_LOADER_TEST_PASSWORD", Some("s3cret"), || {
			let merged = load_merged("app", dir.path(), "test", Preprocessor::None).unwrap();
			assert_eq!(
				merged,
				mapping! {
					"database" => mapping! { "host" => "localhost", "password" => "s3cret" },
				}
			);
		});
	}

	#[test]
	fn test_env_vars_bracket_stanza() {
		let dir = tempfile::tempdir().unwrap();
		fs::write(
			dir.path().join("app.yml"),
			r#"
defaults:
  token: default
env_vars[production]:
  token: HIERCONF_LOADER_TEST_TOKEN
"#,
		)
		.unwrap();

		temp_env::with_var("HIERCONF_LOADER_TEST_TOKEN", Some("prod-token"), || {
			let prod = load_config("app", dir.path(), "production").unwrap();
			assert_eq!(prod["token"], "prod-token");

			let dev = load_config("app", dir.path(), "development").unwrap();
			assert_eq!(dev["token"], "default");
		});
	}

	#[test]
	fn test_missing_primary_file() {
		let dir = tempfile::tempdir().unwrap();
		let result = load_config("absent", dir.path(), "test");
		match result.unwrap_err() {
			ConfigError::Read { path, .. } => assert_eq!(path, dir.path().join("absent.yml")),
			other => panic!("Expected Read error, got {other:?}"),
		}
	}

	#[test]
	fn test_preprocessor_none_keeps_tags_verbatim() {
		let dir = tempfile::tempdir().unwrap();
		fs::write(
			dir.path().join("app.yml"),
			"defaults:\n  raw: \"<%= ENV['HOME'] %>\"\n",
		)
		.unwrap();

		let options = LoadOptions {
			preprocessor: Preprocessor::None,
			typed: false,
		};
		let config = load_config_with("app", dir.path(), "test", &options).unwrap();
		assert_eq!(config["raw"], "<%= ENV['HOME'] %>");
	}
}
