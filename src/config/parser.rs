use crate::config::types::{Mapping, Value};
use crate::error::{ConfigError, Result};
use crate::preprocess::Preprocessor;
use chrono::NaiveDate;
use regex::Regex;
use std::collections::HashMap;
use std::path::Path;
use std::sync::LazyLock;
use yaml_rust2::parser::{Event, MarkedEventReceiver, Parser, Tag};
use yaml_rust2::scanner::{Marker, TScalarStyle};

/// Tag marking a mandatory field that must be supplied by a later stanza.
pub const REQUIRED_TAG: &str = "!REQUIRED";

const CORE_TAG_PREFIX: &str = "tag:yaml.org,2002:";

static INTEGER: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"^(?:[-+]?[0-9]+|0o[0-7]+|0x[0-9a-fA-F]+)$").expect("integer pattern is valid")
});

static FLOAT: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"^[-+]?(?:\.[0-9]+|[0-9]+(?:\.[0-9]*)?)(?:[eE][-+]?[0-9]+)?$")
		.expect("float pattern is valid")
});

static DATE: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("date pattern is valid"));

/// Read, preprocess, and parse a config file into its top-level sections.
pub fn parse_config_file(path: &Path, preprocessor: Preprocessor) -> Result<Mapping> {
	let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
		path: path.to_path_buf(),
		source,
	})?;

	let content = preprocessor
		.apply(&content)
		.map_err(|source| ConfigError::Preprocess {
			path: path.to_path_buf(),
			source,
		})?;

	parse_config_str(&content, path)
}

/// Parse a config document from a string (useful for testing).
///
/// An empty document yields an empty mapping. Only the first document of a
/// multi-document stream is read.
pub fn parse_config_str(content: &str, path: &Path) -> Result<Mapping> {
	let mut builder = DocumentBuilder::new(path);
	let mut parser = Parser::new_from_str(content);

	parser
		.load(&mut builder, false)
		.map_err(|source| ConfigError::Parse {
			path: path.to_path_buf(),
			source,
		})?;

	match builder.finish()? {
		Value::Null => Ok(Mapping::new()),
		Value::Mapping(mapping) => Ok(mapping),
		_ => Err(ConfigError::InvalidDocument {
			path: path.to_path_buf(),
		}),
	}
}

/// A collection still receiving child nodes.
enum Frame {
	Sequence {
		anchor: usize,
		items: Vec<Value>,
	},
	Mapping {
		anchor: usize,
		entries: Mapping,
		key: Option<String>,
	},
}

/// Event receiver that builds a [`Value`] tree, accepting only plain data
/// and `!REQUIRED`.
struct DocumentBuilder<'a> {
	path: &'a Path,
	stack: Vec<Frame>,
	anchors: HashMap<usize, Value>,
	root: Option<Value>,
	error: Option<ConfigError>,
}

impl<'a> DocumentBuilder<'a> {
	fn new(path: &'a Path) -> Self {
		DocumentBuilder {
			path,
			stack: Vec::new(),
			anchors: HashMap::new(),
			root: None,
			error: None,
		}
	}

	fn finish(self) -> Result<Value> {
		match self.error {
			Some(e) => Err(e),
			None => Ok(self.root.unwrap_or_default()),
		}
	}

	fn handle(&mut self, event: Event) -> Result<()> {
		match event {
			Event::Scalar(text, style, anchor, tag) => {
				let value = self.scalar(text, style, tag)?;
				self.complete(value, anchor)
			}
			Event::SequenceStart(anchor, tag) => {
				self.reject_tag(tag)?;
				self.stack.push(Frame::Sequence {
					anchor,
					items: Vec::new(),
				});
				Ok(())
			}
			Event::MappingStart(anchor, tag) => {
				self.reject_tag(tag)?;
				self.stack.push(Frame::Mapping {
					anchor,
					entries: Mapping::new(),
					key: None,
				});
				Ok(())
			}
			Event::SequenceEnd | Event::MappingEnd => match self.stack.pop() {
				Some(Frame::Sequence { anchor, items }) => {
					self.complete(Value::Sequence(items), anchor)
				}
				Some(Frame::Mapping {
					anchor, entries, ..
				}) => self.complete(Value::Mapping(entries), anchor),
				None => Err(ConfigError::InvalidDocument {
					path: self.path.to_path_buf(),
				}),
			},
			// the parser rejects aliases to unknown anchors
			Event::Alias(anchor) => {
				let value = self.anchors.get(&anchor).cloned().unwrap_or_default();
				self.complete(value, 0)
			}
			_ => Ok(()),
		}
	}

	/// Attach a finished node to its parent, or make it the document root.
	fn complete(&mut self, value: Value, anchor: usize) -> Result<()> {
		if anchor != 0 {
			self.anchors.insert(anchor, value.clone());
		}

		match self.stack.last_mut() {
			None => {
				self.root.get_or_insert(value);
			}
			Some(Frame::Sequence { items, .. }) => items.push(value),
			Some(Frame::Mapping { entries, key, .. }) => match key.take() {
				Some(name) => {
					entries.insert(name, value);
				}
				None => {
					let name = key_string(value).ok_or_else(|| ConfigError::UnsupportedKey {
						path: self.path.to_path_buf(),
					})?;
					*key = Some(name);
				}
			},
		}

		Ok(())
	}

	fn scalar(&self, text: String, style: TScalarStyle, tag: Option<Tag>) -> Result<Value> {
		match tag {
			Some(tag) if tag_name(&tag) == REQUIRED_TAG => Ok(Value::Required),
			Some(tag) if is_core_str(&tag) => Ok(Value::String(text)),
			Some(tag) => Err(ConfigError::UnsupportedTag {
				path: self.path.to_path_buf(),
				tag: tag_name(&tag),
			}),
			None if matches!(style, TScalarStyle::Plain) => self.resolve_plain(text),
			None => Ok(Value::String(text)),
		}
	}

	/// Resolve an unquoted scalar with the YAML 1.2 core schema, plus dates.
	fn resolve_plain(&self, text: String) -> Result<Value> {
		let value = match text.as_str() {
			"" | "~" | "null" | "Null" | "NULL" => Value::Null,
			"true" | "True" | "TRUE" => Value::Bool(true),
			"false" | "False" | "FALSE" => Value::Bool(false),
			".inf" | ".Inf" | ".INF" | "+.inf" | "+.Inf" | "+.INF" => Value::Float(f64::INFINITY),
			"-.inf" | "-.Inf" | "-.INF" => Value::Float(f64::NEG_INFINITY),
			".nan" | ".NaN" | ".NAN" => Value::Float(f64::NAN),
			s if INTEGER.is_match(s) => {
				let parsed = if let Some(octal) = s.strip_prefix("0o") {
					i64::from_str_radix(octal, 8)
				} else if let Some(hex) = s.strip_prefix("0x") {
					i64::from_str_radix(hex, 16)
				} else {
					s.parse()
				};
				match parsed {
					Ok(i) => Value::Integer(i),
					Err(_) => {
						return Err(ConfigError::IntegerOutOfRange {
							path: self.path.to_path_buf(),
							value: text,
						});
					}
				}
			}
			s if FLOAT.is_match(s) => match s.parse() {
				Ok(f) => Value::Float(f),
				Err(_) => Value::String(text),
			},
			s if DATE.is_match(s) => match NaiveDate::parse_from_str(s, "%Y-%m-%d") {
				Ok(date) => Value::Date(date),
				Err(_) => Value::String(text),
			},
			_ => Value::String(text),
		};

		Ok(value)
	}

	fn reject_tag(&self, tag: Option<Tag>) -> Result<()> {
		match tag {
			Some(tag) => Err(ConfigError::UnsupportedTag {
				path: self.path.to_path_buf(),
				tag: tag_name(&tag),
			}),
			None => Ok(()),
		}
	}
}

impl MarkedEventReceiver for DocumentBuilder<'_> {
	fn on_event(&mut self, event: Event, _mark: Marker) {
		if self.error.is_some() {
			return;
		}
		if let Err(e) = self.handle(event) {
			self.error = Some(e);
		}
	}
}

fn tag_name(tag: &Tag) -> String {
	format!("{}{}", tag.handle, tag.suffix)
}

/// `!!str`, which forces a plain scalar to stay a string.
fn is_core_str(tag: &Tag) -> bool {
	tag.suffix == "str" && (tag.handle == "!!" || tag.handle == CORE_TAG_PREFIX)
}

/// Normalize a scalar mapping key to its string form.
fn key_string(key: Value) -> Option<String> {
	match key {
		Value::String(s) => Some(s),
		Value::Null => Some(String::new()),
		Value::Bool(b) => Some(b.to_string()),
		Value::Integer(i) => Some(i.to_string()),
		Value::Float(f) => Some(f.to_string()),
		Value::Date(d) => Some(d.to_string()),
		Value::Sequence(_) | Value::Mapping(_) | Value::Required => None,
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::path::PathBuf;

	fn parse(content: &str) -> Result<Mapping> {
		parse_config_str(content, &PathBuf::from("test.yml"))
	}

	fn defaults(content: &str) -> Mapping {
		let doc = parse(content).unwrap();
		doc["defaults"].as_mapping().unwrap().clone()
	}

	#[test]
	fn test_parse_empty_document() {
		assert!(parse("").unwrap().is_empty());
		assert!(parse("# only a comment\n").unwrap().is_empty());
		assert!(parse("~\n").unwrap().is_empty());
	}

	#[test]
	fn test_parse_sections() {
		let content = r#"
defaults:
  name: demo
  port: 8080
  ratio: 0.5
  enabled: true
  hosts: [a, b]
production:
  port: 443
"#;
		let doc = parse(content).unwrap();
		let keys: Vec<_> = doc.keys().cloned().collect();
		assert_eq!(keys, vec!["defaults", "production"]);

		let defaults = doc["defaults"].as_mapping().unwrap();
		assert_eq!(defaults["name"], Value::from("demo"));
		assert_eq!(defaults["port"], Value::Integer(8080));
		assert_eq!(defaults["ratio"], Value::Float(0.5));
		assert_eq!(defaults["enabled"], Value::Bool(true));
		assert_eq!(
			defaults["hosts"],
			Value::Sequence(vec![Value::from("a"), Value::from("b")])
		);
	}

	#[test]
	fn test_parse_required_tag() {
		let content = r#"
defaults:
  secret: !REQUIRED
  nested:
    - token: !REQUIRED
"#;
		let doc = parse(content).unwrap();
		let defaults = doc["defaults"].as_mapping().unwrap();
		assert_eq!(defaults["secret"], Value::Required);

		let Value::Sequence(items) = &defaults["nested"] else {
			panic!("Expected a sequence");
		};
		assert_eq!(items[0].as_mapping().unwrap()["token"], Value::Required);
	}

	#[test]
	fn test_reject_unknown_tags() {
		let result = parse("defaults:\n  obj: !ruby/object:Kernel {}\n");
		match result.unwrap_err() {
			ConfigError::UnsupportedTag { tag, path } => {
				assert!(tag.contains("ruby/object"));
				assert_eq!(path, PathBuf::from("test.yml"));
			}
			other => panic!("Expected UnsupportedTag error, got {other:?}"),
		}

		let result = parse("defaults:\n  secret: !secret hunter2\n");
		assert!(matches!(result, Err(ConfigError::UnsupportedTag { .. })));
	}

	#[test]
	fn test_plain_dates_only() {
		let defaults = defaults(
			r#"
defaults:
  released: 2024-01-15
  single: '2024-01-15'
  double: "2024-01-15"
  forced: !!str 2024-01-15
  impossible: 2023-02-30
"#,
		);

		assert_eq!(
			defaults["released"],
			Value::Date(NaiveDate::from_ymd_opt(2024, 1, 15).unwrap())
		);
		assert_eq!(defaults["single"], Value::from("2024-01-15"));
		assert_eq!(defaults["double"], Value::from("2024-01-15"));
		assert_eq!(defaults["forced"], Value::from("2024-01-15"));
		assert_eq!(defaults["impossible"], Value::from("2023-02-30"));
	}

	#[test]
	fn test_quoted_scalars_are_strings() {
		let defaults = defaults("defaults:\n  port: \"8080\"\n  flag: 'true'\n  none: \"~\"\n");

		assert_eq!(defaults["port"], Value::from("8080"));
		assert_eq!(defaults["flag"], Value::from("true"));
		assert_eq!(defaults["none"], Value::from("~"));
	}

	#[test]
	fn test_core_schema_scalars() {
		let defaults = defaults(
			r#"
defaults:
  hex: 0x1F
  octal: 0o17
  negative: -42
  exponent: 1e3
  infinite: .inf
  nothing: ~
  yes_word: yes
  off_word: off
"#,
		);

		assert_eq!(defaults["hex"], Value::Integer(31));
		assert_eq!(defaults["octal"], Value::Integer(15));
		assert_eq!(defaults["negative"], Value::Integer(-42));
		assert_eq!(defaults["exponent"], Value::Float(1000.0));
		assert_eq!(defaults["infinite"], Value::Float(f64::INFINITY));
		assert_eq!(defaults["nothing"], Value::Null);
		// YAML 1.1 boolean words are plain strings under the core schema
		assert_eq!(defaults["yes_word"], Value::from("yes"));
		assert_eq!(defaults["off_word"], Value::from("off"));
	}

	#[test]
	fn test_reject_oversized_integer() {
		match parse("defaults:\n  big: 99999999999999999999\n").unwrap_err() {
			ConfigError::IntegerOutOfRange { value, path } => {
				assert_eq!(value, "99999999999999999999");
				assert_eq!(path, PathBuf::from("test.yml"));
			}
			other => panic!("Expected IntegerOutOfRange error, got {other:?}"),
		}
	}

	#[test]
	fn test_anchors_and_aliases() {
		let doc = parse(
			r#"
shared: &shared
  host: localhost
  port: 5432
defaults:
  primary: *shared
"#,
		)
		.unwrap();

		let defaults = doc["defaults"].as_mapping().unwrap();
		assert_eq!(defaults["primary"], doc["shared"]);
	}

	#[test]
	fn test_scalar_keys_are_normalized() {
		let defaults = defaults("defaults:\n  80: http\n  true: yes\n");
		assert_eq!(defaults["80"], Value::from("http"));
		assert!(defaults.contains_key("true"));
	}

	#[test]
	fn test_reject_complex_keys() {
		let result = parse("defaults:\n  ? [a, b]\n  : value\n");
		assert!(matches!(result, Err(ConfigError::UnsupportedKey { .. })));
	}

	#[test]
	fn test_reject_non_mapping_document() {
		let result = parse("- just\n- a list\n");
		assert!(matches!(result, Err(ConfigError::InvalidDocument { .. })));
	}

	#[test]
	fn test_parse_error_carries_path() {
		match parse("defaults: [unclosed\n").unwrap_err() {
			ConfigError::Parse { path, .. } => assert_eq!(path, PathBuf::from("test.yml")),
			other => panic!("Expected Parse error, got {other:?}"),
		}
	}

	#[test]
	fn test_read_error_carries_path() {
		let path = PathBuf::from("/nonexistent/hierconf/missing.yml");
		match parse_config_file(&path, Preprocessor::None).unwrap_err() {
			ConfigError::Read { path: p, .. } => assert_eq!(p, path),
			other => panic!("Expected Read error, got {other:?}"),
		}
	}
}
