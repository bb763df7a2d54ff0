//! Conversion of validated mappings into immutable configuration values.
//!
//! This module handles:
//! - Building `Record`s, `Table`s, sequences and frozen scalars
//! - Optional structural typing through a per-load `TypeNamespace`

pub mod shape;
pub mod value;

pub use shape::{RecordType, TypeNamespace, camelize};
pub use value::{ConfigValue, Fields, Record, Table};

use crate::config::types::{Mapping, Value};
use crate::error::{ConfigError, Result};
use regex::Regex;
use std::sync::LazyLock;

static NON_FIELD_KEY: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"^[0-9]|[- ]").expect("field key pattern is valid"));

/// Whether `key` can be used as a record field name.
pub fn is_field_name(key: &str) -> bool {
	!NON_FIELD_KEY.is_match(key)
}

/// Materialize a validated mapping rooted at `name`.
///
/// With a `namespace`, every record is tagged with a synthesized
/// [`RecordType`]; records that share a derived name and field set share a
/// type. The input mapping is never modified.
pub fn materialize(
	mapping: &Mapping,
	name: &str,
	namespace: Option<&mut TypeNamespace>,
) -> Result<ConfigValue> {
	let mut builder = Builder { namespace };
	builder.mapping(mapping, name, name, None)
}

struct Builder<'a> {
	namespace: Option<&'a mut TypeNamespace>,
}

impl Builder<'_> {
	fn value(
		&mut self,
		value: &Value,
		path: &str,
		segment: &str,
		parent: Option<&str>,
	) -> Result<ConfigValue> {
		let materialized = match value {
			Value::Null => ConfigValue::Null,
			Value::Bool(b) => ConfigValue::Bool(*b),
			Value::Integer(i) => ConfigValue::Integer(*i),
			Value::Float(f) => ConfigValue::Float(*f),
			Value::String(s) => ConfigValue::String(s.clone()),
			Value::Date(date) => ConfigValue::Date(*date),
			Value::Sequence(items) => {
				let items = items
					.iter()
					.enumerate()
					.map(|(index, item)| self.value(item, &format!("{path}[{index}]"), segment, parent))
					.collect::<Result<Vec<_>>>()?;
				ConfigValue::Sequence(items.into())
			}
			Value::Mapping(mapping) => self.mapping(mapping, path, segment, parent)?,
			Value::Required => {
				return Err(ConfigError::UnvalidatedRequired {
					path: path.to_string(),
				});
			}
		};

		Ok(materialized)
	}

	fn mapping(
		&mut self,
		mapping: &Mapping,
		path: &str,
		segment: &str,
		parent: Option<&str>,
	) -> Result<ConfigValue> {
		if !mapping.keys().all(|key| is_field_name(key)) {
			let mut entries = Fields::with_capacity(mapping.len());
			for (key, value) in mapping {
				let child = self.value(value, &format!("{path}.{key}"), key, parent)?;
				entries.insert(key.clone(), child);
			}
			return Ok(ConfigValue::Table(Table::new(path.to_string(), entries)));
		}

		if let Some(key) = mapping.keys().find(|key| key.ends_with('?')) {
			return Err(ConfigError::InvalidFieldName {
				path: format!("{path}.{key}"),
			});
		}

		let record_type = self
			.namespace
			.as_deref_mut()
			.map(|namespace| namespace.define(parent, segment, mapping.keys().cloned()));
		let type_name = record_type.as_ref().map(|t| t.name().to_string());

		let mut fields = Fields::with_capacity(mapping.len());
		for (key, value) in mapping {
			let child = self.value(value, &format!("{path}.{key}"), key, type_name.as_deref())?;
			fields.insert(key.clone(), child);
		}

		Ok(ConfigValue::Record(Record::new(
			path.to_string(),
			record_type,
			fields,
		)))
	}
}
