//! Text preprocessing applied to config files before YAML parsing.
//!
//! This module handles:
//! - Selecting the preprocessing mode by name
//! - Evaluating embedded `<%= ... %>` expressions in the raw file text

pub mod template;

pub use template::{TemplateError, render};

use crate::error::ConfigError;
use std::fmt;
use std::str::FromStr;

/// How raw config text is transformed before it is parsed as YAML.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Preprocessor {
	/// Evaluate embedded expression tags (`<%= ... %>`).
	#[default]
	Template,

	/// Pass the text through unmodified.
	None,
}

impl Preprocessor {
	/// Get the canonical name used on the command line.
	pub fn as_str(&self) -> &'static str {
		match self {
			Preprocessor::Template => "erb",
			Preprocessor::None => "none",
		}
	}

	/// Apply this preprocessing pass to the raw text of a config file.
	pub fn apply(&self, source: &str) -> Result<String, TemplateError> {
		match self {
			Preprocessor::Template => render(source),
			Preprocessor::None => Ok(source.to_string()),
		}
	}
}

impl FromStr for Preprocessor {
	type Err = ConfigError;

	fn from_str(name: &str) -> Result<Self, Self::Err> {
		match name {
			"erb" | "template" => Ok(Preprocessor::Template),
			"none" => Ok(Preprocessor::None),
			_ => Err(ConfigError::UnknownPreprocessor {
				name: name.to_string(),
			}),
		}
	}
}

impl fmt::Display for Preprocessor {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}
