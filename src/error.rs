use std::path::PathBuf;

use crate::preprocess::TemplateError;

/// Library-level structured errors for hierconf.
///
/// Use `thiserror` for structured errors that library consumers can match on.
/// The CLI binary wraps these with `anyhow` for rich context chains.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
	#[error("Failed to read config file: {path}")]
	Read {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("Failed to preprocess config file: {path}")]
	Preprocess {
		path: PathBuf,
		#[source]
		source: TemplateError,
	},

	#[error("Failed to parse config file: {path}")]
	Parse {
		path: PathBuf,
		#[source]
		source: yaml_rust2::ScanError,
	},

	#[error("Integer {value} does not fit in 64 bits in config file: {path}")]
	IntegerOutOfRange { path: PathBuf, value: String },

	#[error("Unsupported YAML tag {tag} in config file: {path}")]
	UnsupportedTag { path: PathBuf, tag: String },

	#[error("Unsupported mapping key in config file: {path} (keys must be scalars)")]
	UnsupportedKey { path: PathBuf },

	#[error("Config file must contain a mapping of sections at the top level: {path}")]
	InvalidDocument { path: PathBuf },

	#[error("Section {label} must be a mapping in config file: {path}")]
	InvalidStanza { path: PathBuf, label: String },

	#[error("Unknown preprocessor <{name}>")]
	UnknownPreprocessor { name: String },

	#[error("Missing required configuration values for {environment}: {}", errors.join(", "))]
	MissingRequired {
		environment: String,
		errors: Vec<String>,
	},

	#[error("Unknown configuration field: {path}")]
	UnknownField { path: String },

	#[error("Invalid configuration field name: {path} (names may not end with '?')")]
	InvalidFieldName { path: String },

	#[error("Cannot look up {key}: configuration value is not a record")]
	NotARecord { key: String },

	#[error("Invalid configuration path: {path}")]
	InvalidPath { path: String },

	#[error("Required value was never validated: {path}")]
	UnvalidatedRequired { path: String },

	#[error("Failed to extract configuration into the requested type")]
	Extract {
		#[source]
		source: serde_yaml::Error,
	},
}

/// Result type alias using ConfigError.
pub type Result<T> = std::result::Result<T, ConfigError>;
