use crate::config::types::{Mapping, Value};
use crate::error::{ConfigError, Result};
use crate::materialize::shape::RecordType;
use chrono::NaiveDate;
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};
use std::ops::Index;
use std::sync::Arc;

/// Field storage shared by records and tables.
pub type Fields = IndexMap<String, ConfigValue>;

/// An immutable, materialized configuration value.
///
/// Containers share their storage through `Arc`, so cloning is cheap and no
/// API hands out mutable access. Assigning to a field does not compile:
///
/// ```compile_fail
/// let config = hierconf::build_from_mapping(
///     &hierconf::mapping! { "name" => "demo" },
///     None,
///     None,
///     false,
/// ).unwrap();
/// config["name"] = hierconf::ConfigValue::from("changed");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValue {
	Null,
	Bool(bool),
	Integer(i64),
	Float(f64),
	String(String),
	Date(NaiveDate),
	Sequence(Arc<[ConfigValue]>),

	/// A mapping whose keys are all usable as field names.
	Record(Record),

	/// A mapping with keys that are not field names (leading digit,
	/// embedded space or hyphen). Only index-style lookup is available.
	Table(Table),
}

impl ConfigValue {
	/// Look up `key` on a record or table, returning `None` when absent.
	pub fn get(&self, key: &str) -> Option<&ConfigValue> {
		match self {
			ConfigValue::Record(record) => record.fields.get(key),
			ConfigValue::Table(table) => table.entries.get(key),
			_ => None,
		}
	}

	/// Index-style lookup on a record or table.
	pub fn fetch(&self, key: &str) -> Result<&ConfigValue> {
		match self {
			ConfigValue::Record(record) => record.field(key),
			ConfigValue::Table(table) => table.fetch(key),
			_ => Err(ConfigError::NotARecord {
				key: key.to_string(),
			}),
		}
	}

	/// Named field access; only records have named fields.
	pub fn field(&self, name: &str) -> Result<&ConfigValue> {
		match self {
			ConfigValue::Record(record) => record.field(name),
			_ => Err(ConfigError::NotARecord {
				key: name.to_string(),
			}),
		}
	}

	/// Truthiness of a named field; only records have named fields.
	pub fn query(&self, name: &str) -> Result<bool> {
		match self {
			ConfigValue::Record(record) => record.query(name),
			_ => Err(ConfigError::NotARecord {
				key: name.to_string(),
			}),
		}
	}

	/// Element of a sequence, or `None` when out of range or not a sequence.
	pub fn at(&self, index: usize) -> Option<&ConfigValue> {
		self.as_sequence().and_then(|items| items.get(index))
	}

	/// Follow a dotted path such as `tree1.tree3.tree4` or `servers[0].host`.
	pub fn lookup(&self, path: &str) -> Result<&ConfigValue> {
		let invalid = || ConfigError::InvalidPath {
			path: path.to_string(),
		};
		let mut current = self;

		for segment in path.split('.') {
			let (name, mut indices) = match segment.find('[') {
				Some(open) => segment.split_at(open),
				None => (segment, ""),
			};

			if !name.is_empty() {
				current = current.fetch(name)?;
			} else if indices.is_empty() {
				return Err(invalid());
			}

			while let Some(rest) = indices.strip_prefix('[') {
				let close = rest.find(']').ok_or_else(invalid)?;
				let index: usize = rest[..close].parse().map_err(|_| invalid())?;
				current = current.at(index).ok_or_else(|| ConfigError::UnknownField {
					path: path.to_string(),
				})?;
				indices = &rest[close + 1..];
			}

			if !indices.is_empty() {
				return Err(invalid());
			}
		}

		Ok(current)
	}

	/// Truthiness of the value itself: null and `false` are false.
	pub fn is_truthy(&self) -> bool {
		!matches!(self, ConfigValue::Null | ConfigValue::Bool(false))
	}

	pub fn is_null(&self) -> bool {
		matches!(self, ConfigValue::Null)
	}

	pub fn as_str(&self) -> Option<&str> {
		match self {
			ConfigValue::String(s) => Some(s),
			_ => None,
		}
	}

	pub fn as_bool(&self) -> Option<bool> {
		match self {
			ConfigValue::Bool(b) => Some(*b),
			_ => None,
		}
	}

	pub fn as_i64(&self) -> Option<i64> {
		match self {
			ConfigValue::Integer(i) => Some(*i),
			_ => None,
		}
	}

	/// Numeric value; integers are widened.
	pub fn as_f64(&self) -> Option<f64> {
		match self {
			ConfigValue::Float(f) => Some(*f),
			ConfigValue::Integer(i) => Some(*i as f64),
			_ => None,
		}
	}

	pub fn as_date(&self) -> Option<NaiveDate> {
		match self {
			ConfigValue::Date(d) => Some(*d),
			_ => None,
		}
	}

	pub fn as_sequence(&self) -> Option<&[ConfigValue]> {
		match self {
			ConfigValue::Sequence(items) => Some(items),
			_ => None,
		}
	}

	pub fn as_record(&self) -> Option<&Record> {
		match self {
			ConfigValue::Record(record) => Some(record),
			_ => None,
		}
	}

	pub fn as_table(&self) -> Option<&Table> {
		match self {
			ConfigValue::Table(table) => Some(table),
			_ => None,
		}
	}

	/// Convert back to a plain [`Value`].
	pub fn to_value(&self) -> Value {
		match self {
			ConfigValue::Null => Value::Null,
			ConfigValue::Bool(b) => Value::Bool(*b),
			ConfigValue::Integer(i) => Value::Integer(*i),
			ConfigValue::Float(f) => Value::Float(*f),
			ConfigValue::String(s) => Value::String(s.clone()),
			ConfigValue::Date(d) => Value::Date(*d),
			ConfigValue::Sequence(items) => {
				Value::Sequence(items.iter().map(ConfigValue::to_value).collect())
			}
			ConfigValue::Record(record) => Value::Mapping(record.to_mapping()),
			ConfigValue::Table(table) => Value::Mapping(table.to_mapping()),
		}
	}

	/// Deserialize this value into a caller-defined type.
	pub fn extract<T: DeserializeOwned>(&self) -> Result<T> {
		let yaml = serde_yaml::to_value(self).map_err(|source| ConfigError::Extract { source })?;
		serde_yaml::from_value(yaml).map_err(|source| ConfigError::Extract { source })
	}
}

impl Index<&str> for ConfigValue {
	type Output = ConfigValue;

	/// # Panics
	///
	/// Panics when `key` is absent or this is not a record or table.
	fn index(&self, key: &str) -> &ConfigValue {
		match self.fetch(key) {
			Ok(value) => value,
			Err(e) => panic!("{e}"),
		}
	}
}

impl Index<usize> for ConfigValue {
	type Output = ConfigValue;

	/// # Panics
	///
	/// Panics when out of range or this is not a sequence.
	fn index(&self, index: usize) -> &ConfigValue {
		match self.at(index) {
			Some(value) => value,
			None => panic!("no sequence element at index {index}"),
		}
	}
}

impl From<&str> for ConfigValue {
	fn from(value: &str) -> Self {
		ConfigValue::String(value.to_string())
	}
}

impl From<String> for ConfigValue {
	fn from(value: String) -> Self {
		ConfigValue::String(value)
	}
}

impl From<bool> for ConfigValue {
	fn from(value: bool) -> Self {
		ConfigValue::Bool(value)
	}
}

impl From<i64> for ConfigValue {
	fn from(value: i64) -> Self {
		ConfigValue::Integer(value)
	}
}

impl PartialEq<str> for ConfigValue {
	fn eq(&self, other: &str) -> bool {
		self.as_str() == Some(other)
	}
}

impl PartialEq<&str> for ConfigValue {
	fn eq(&self, other: &&str) -> bool {
		self.as_str() == Some(*other)
	}
}

impl PartialEq<bool> for ConfigValue {
	fn eq(&self, other: &bool) -> bool {
		self.as_bool() == Some(*other)
	}
}

impl PartialEq<i64> for ConfigValue {
	fn eq(&self, other: &i64) -> bool {
		self.as_i64() == Some(*other)
	}
}

impl PartialEq<f64> for ConfigValue {
	fn eq(&self, other: &f64) -> bool {
		self.as_f64() == Some(*other)
	}
}

impl Serialize for ConfigValue {
	fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
		match self {
			ConfigValue::Null => serializer.serialize_unit(),
			ConfigValue::Bool(b) => serializer.serialize_bool(*b),
			ConfigValue::Integer(i) => serializer.serialize_i64(*i),
			ConfigValue::Float(f) => serializer.serialize_f64(*f),
			ConfigValue::String(s) => serializer.serialize_str(s),
			ConfigValue::Date(d) => serializer.collect_str(d),
			ConfigValue::Sequence(items) => {
				let mut seq = serializer.serialize_seq(Some(items.len()))?;
				for item in items.iter() {
					seq.serialize_element(item)?;
				}
				seq.end()
			}
			ConfigValue::Record(record) => serialize_fields(&record.fields, serializer),
			ConfigValue::Table(table) => serialize_fields(&table.entries, serializer),
		}
	}
}

fn serialize_fields<S: Serializer>(fields: &Fields, serializer: S) -> std::result::Result<S::Ok, S::Error> {
	let mut map = serializer.serialize_map(Some(fields.len()))?;
	for (key, value) in fields {
		map.serialize_entry(key, value)?;
	}
	map.end()
}

fn to_mapping(fields: &Fields) -> Mapping {
	fields
		.iter()
		.map(|(key, value)| (key.clone(), value.to_value()))
		.collect()
}

/// A materialized mapping with named, read-only fields.
#[derive(Debug, Clone)]
pub struct Record {
	path: String,
	record_type: Option<Arc<RecordType>>,
	fields: Arc<Fields>,
}

impl Record {
	pub(crate) fn new(path: String, record_type: Option<Arc<RecordType>>, fields: Fields) -> Self {
		Record {
			path,
			record_type,
			fields: Arc::new(fields),
		}
	}

	/// Dotted path of this record from the config root.
	pub fn path(&self) -> &str {
		&self.path
	}

	/// The synthesized type, when loaded with structural typing.
	pub fn record_type(&self) -> Option<&Arc<RecordType>> {
		self.record_type.as_ref()
	}

	pub fn type_name(&self) -> Option<&str> {
		self.record_type.as_deref().map(RecordType::name)
	}

	/// Get a field by name.
	pub fn field(&self, name: &str) -> Result<&ConfigValue> {
		self.fields.get(name).ok_or_else(|| ConfigError::UnknownField {
			path: format!("{}.{}", self.path, name),
		})
	}

	/// Whether a field is set to something other than null or `false`.
	pub fn query(&self, name: &str) -> Result<bool> {
		self.field(name).map(ConfigValue::is_truthy)
	}

	pub fn contains(&self, name: &str) -> bool {
		self.fields.contains_key(name)
	}

	pub fn len(&self) -> usize {
		self.fields.len()
	}

	pub fn is_empty(&self) -> bool {
		self.fields.is_empty()
	}

	pub fn keys(&self) -> impl Iterator<Item = &str> {
		self.fields.keys().map(String::as_str)
	}

	pub fn iter(&self) -> impl Iterator<Item = (&str, &ConfigValue)> {
		self.fields.iter().map(|(key, value)| (key.as_str(), value))
	}

	pub fn to_mapping(&self) -> Mapping {
		to_mapping(&self.fields)
	}
}

impl PartialEq for Record {
	fn eq(&self, other: &Self) -> bool {
		self.fields == other.fields
	}
}

impl Index<&str> for Record {
	type Output = ConfigValue;

	fn index(&self, name: &str) -> &ConfigValue {
		match self.field(name) {
			Ok(value) => value,
			Err(e) => panic!("{e}"),
		}
	}
}

/// A materialized mapping keyed by arbitrary strings.
#[derive(Debug, Clone)]
pub struct Table {
	path: String,
	entries: Arc<Fields>,
}

impl Table {
	pub(crate) fn new(path: String, entries: Fields) -> Self {
		Table {
			path,
			entries: Arc::new(entries),
		}
	}

	pub fn path(&self) -> &str {
		&self.path
	}

	pub fn get(&self, key: &str) -> Option<&ConfigValue> {
		self.entries.get(key)
	}

	pub fn fetch(&self, key: &str) -> Result<&ConfigValue> {
		self.entries.get(key).ok_or_else(|| ConfigError::UnknownField {
			path: format!("{}.{}", self.path, key),
		})
	}

	pub fn contains(&self, key: &str) -> bool {
		self.entries.contains_key(key)
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	pub fn keys(&self) -> impl Iterator<Item = &str> {
		self.entries.keys().map(String::as_str)
	}

	pub fn iter(&self) -> impl Iterator<Item = (&str, &ConfigValue)> {
		self.entries.iter().map(|(key, value)| (key.as_str(), value))
	}

	pub fn to_mapping(&self) -> Mapping {
		to_mapping(&self.entries)
	}
}

impl PartialEq for Table {
	fn eq(&self, other: &Self) -> bool {
		self.entries == other.entries
	}
}

impl Index<&str> for Table {
	type Output = ConfigValue;

	fn index(&self, key: &str) -> &ConfigValue {
		match self.fetch(key) {
			Ok(value) => value,
			Err(e) => panic!("{e}"),
		}
	}
}
