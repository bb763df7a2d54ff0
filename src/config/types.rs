use chrono::NaiveDate;
use indexmap::IndexMap;

/// An insertion-ordered mapping of string keys to parsed values.
pub type Mapping = IndexMap<String, Value>;

/// A value parsed from a config document, before materialization.
///
/// Mirrors the YAML data model restricted to the safe scalar types, plus an
/// explicit [`Value::Required`] case for fields tagged `!REQUIRED`.
/// Only unquoted `YYYY-MM-DD` scalars in a document become [`Value::Date`].
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Value {
	#[default]
	Null,
	Bool(bool),
	Integer(i64),
	Float(f64),
	String(String),
	Date(NaiveDate),
	Sequence(Vec<Value>),
	Mapping(Mapping),

	/// A mandatory field that no applicable stanza has supplied yet.
	Required,
}

impl Value {
	/// Borrow the inner mapping, if this is a mapping.
	pub fn as_mapping(&self) -> Option<&Mapping> {
		match self {
			Value::Mapping(mapping) => Some(mapping),
			_ => None,
		}
	}

	/// Borrow the inner string, if this is a string.
	pub fn as_str(&self) -> Option<&str> {
		match self {
			Value::String(s) => Some(s),
			_ => None,
		}
	}

	pub fn is_null(&self) -> bool {
		matches!(self, Value::Null)
	}

	pub fn is_required(&self) -> bool {
		matches!(self, Value::Required)
	}
}

impl From<bool> for Value {
	fn from(value: bool) -> Self {
		Value::Bool(value)
	}
}

impl From<i64> for Value {
	fn from(value: i64) -> Self {
		Value::Integer(value)
	}
}

impl From<f64> for Value {
	fn from(value: f64) -> Self {
		Value::Float(value)
	}
}

impl From<&str> for Value {
	fn from(value: &str) -> Self {
		Value::String(value.to_string())
	}
}

impl From<String> for Value {
	fn from(value: String) -> Self {
		Value::String(value)
	}
}

impl From<NaiveDate> for Value {
	fn from(value: NaiveDate) -> Self {
		Value::Date(value)
	}
}

impl From<Vec<Value>> for Value {
	fn from(value: Vec<Value>) -> Self {
		Value::Sequence(value)
	}
}

impl From<Mapping> for Value {
	fn from(value: Mapping) -> Self {
		Value::Mapping(value)
	}
}

impl<K, V> FromIterator<(K, V)> for Value
where
	K: Into<String>,
	V: Into<Value>,
{
	fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
		Value::Mapping(
			iter.into_iter()
				.map(|(key, value)| (key.into(), value.into()))
				.collect(),
		)
	}
}

/// Build a [`Mapping`] from `key => value` pairs.
///
/// ```
/// use hierconf::{mapping, Value};
///
/// let m = mapping! { "name" => "demo", "port" => 8080_i64 };
/// assert_eq!(m["port"], Value::Integer(8080));
/// ```
#[macro_export]
macro_rules! mapping {
	() => {
		$crate::Mapping::new()
	};
	($($key:expr => $value:expr),+ $(,)?) => {{
		let mut mapping = $crate::Mapping::new();
		$(mapping.insert(::std::string::String::from($key), $crate::Value::from($value));)+
		mapping
	}};
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_mapping_macro_preserves_order() {
		let m = mapping! { "b" => 1_i64, "a" => "two", "c" => true };
		let keys: Vec<_> = m.keys().cloned().collect();
		assert_eq!(keys, vec!["b", "a", "c"]);
		assert_eq!(m["a"], Value::String("two".to_string()));
	}

	#[test]
	fn test_nested_mapping_from_iter() {
		let value: Value = [("inner", Value::from(mapping! { "x" => 1_i64 }))]
			.into_iter()
			.collect();
		let inner = value.as_mapping().unwrap()["inner"].as_mapping().unwrap();
		assert_eq!(inner["x"], Value::Integer(1));
	}

	#[test]
	fn test_required_is_distinct_from_null() {
		assert!(Value::Required.is_required());
		assert!(!Value::Null.is_required());
		assert!(Value::default().is_null());
	}
}
