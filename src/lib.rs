//! Hierconf - hierarchical, environment-aware YAML configuration loading.
//!
//! This library provides:
//! - Stanza selection (`defaults`, `defaults[env,...]`, `<env>`) and deep merging
//! - `env_vars` substitution from the process environment
//! - Validation of fields tagged `!REQUIRED`, reporting every violation at once
//! - Immutable configuration values with field, truthiness and index access
//!
//! # Example
//!
//! ```no_run
//! use hierconf::load_config;
//! use std::path::Path;
//!
//! let config = load_config("database", Path::new("config"), "production").unwrap();
//!
//! let host = config.field("host").unwrap();
//! println!("host: {}", host.as_str().unwrap_or_default());
//!
//! if config.query("ssl").unwrap_or(false) {
//!     println!("ssl enabled");
//! }
//! ```

pub mod config;
pub mod error;
pub mod materialize;
pub mod preprocess;

pub use config::{
	LoadOptions, Mapping, Value, build_from_mapping, load_config, load_config_with, load_merged,
};
pub use error::{ConfigError, Result};
pub use materialize::{ConfigValue, Record, RecordType, Table, TypeNamespace};
pub use preprocess::Preprocessor;
