//! Configuration loading and merging for hierconf.
//!
//! This module handles:
//! - YAML config file parsing with the `!REQUIRED` marker
//! - Environment stanza selection and deep merging
//! - Environment-variable substitution
//! - Required-field validation

pub mod env;
pub mod loader;
pub mod merge;
pub mod parser;
pub mod stanza;
pub mod types;
pub mod validate;

pub use env::{fill_env_vars, fill_env_vars_with};
pub use loader::{
	DEFAULT_ENVIRONMENT, DEFAULT_NAME, LoadOptions, build_from_mapping, config_paths, load_config,
	load_config_with, load_file_for_env, load_merged,
};
pub use merge::deep_merge;
pub use parser::{REQUIRED_TAG, parse_config_file, parse_config_str};
pub use stanza::{StanzaFamily, fold_stanzas, select_stanzas};
pub use types::{Mapping, Value};
pub use validate::{detect_errors, validate};
