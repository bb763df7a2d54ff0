use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

static NEXT_ROOT: AtomicUsize = AtomicUsize::new(1);

/// A nominal record type synthesized for one record shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordType {
	name: String,
	fields: BTreeSet<String>,
}

impl RecordType {
	/// Fully qualified type name, e.g. `ConfigRoot3::App::Database`.
	pub fn name(&self) -> &str {
		&self.name
	}

	/// Field names of this shape, sorted.
	pub fn fields(&self) -> impl Iterator<Item = &str> {
		self.fields.iter().map(String::as_str)
	}

	pub fn has_field(&self, name: &str) -> bool {
		self.fields.contains(name)
	}
}

/// Per-load registry of synthesized record types.
///
/// Each namespace gets a process-unique root name, so types from separate
/// loads never collide even when loads run concurrently.
#[derive(Debug)]
pub struct TypeNamespace {
	root: String,
	types: HashMap<String, Arc<RecordType>>,
}

impl TypeNamespace {
	/// Allocate a fresh namespace.
	pub fn new() -> Self {
		let index = NEXT_ROOT.fetch_add(1, Ordering::Relaxed);
		TypeNamespace {
			root: format!("ConfigRoot{index}"),
			types: HashMap::new(),
		}
	}

	/// Name of the namespace root, e.g. `ConfigRoot3`.
	pub fn root(&self) -> &str {
		&self.root
	}

	/// Number of distinct types defined so far.
	pub fn len(&self) -> usize {
		self.types.len()
	}

	pub fn is_empty(&self) -> bool {
		self.types.is_empty()
	}

	/// Look up a type by its qualified name.
	pub fn get(&self, name: &str) -> Option<&Arc<RecordType>> {
		self.types.get(name)
	}

	/// All types defined so far, sorted by name.
	pub fn types(&self) -> Vec<&Arc<RecordType>> {
		let mut types: Vec<_> = self.types.values().collect();
		types.sort_by(|a, b| a.name.cmp(&b.name));
		types
	}

	/// Return the type for a record at `segment` below `parent`.
	///
	/// `parent` is a qualified type name or `None` for the namespace root.
	/// A type with the derived name and the same field set is reused; a
	/// different field set under the same name gets a numbered sibling
	/// (`Name2`, `Name3`, ...).
	pub fn define<I, S>(&mut self, parent: Option<&str>, segment: &str, fields: I) -> Arc<RecordType>
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		let fields: BTreeSet<String> = fields.into_iter().map(Into::into).collect();
		let base = format!("{}::{}", parent.unwrap_or(self.root.as_str()), camelize(segment));

		let mut candidate = base.clone();
		let mut suffix = 1;
		loop {
			match self.types.get(&candidate) {
				Some(existing) if existing.fields == fields => return Arc::clone(existing),
				Some(_) => {
					suffix += 1;
					candidate = format!("{base}{suffix}");
				}
				None => break,
			}
		}

		tracing::trace!(name = %candidate, "defining record type");
		let record_type = Arc::new(RecordType {
			name: candidate.clone(),
			fields,
		});
		self.types.insert(candidate, Arc::clone(&record_type));
		record_type
	}
}

impl Default for TypeNamespace {
	fn default() -> Self {
		Self::new()
	}
}

/// Convert a snake_case or kebab-case path segment to PascalCase.
pub fn camelize(segment: &str) -> String {
	segment
		.split(['_', '-'])
		.filter(|part| !part.is_empty())
		.map(|part| {
			let mut chars = part.chars();
			match chars.next() {
				Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
				None => String::new(),
			}
		})
		.collect()
}
