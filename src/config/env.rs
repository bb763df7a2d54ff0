use crate::config::types::{Mapping, Value};

/// Replace `env_vars` leaves with the values of the variables they name.
///
/// Reads the process environment. See [`fill_env_vars_with`].
pub fn fill_env_vars(mapping: &Mapping) -> Mapping {
	fill_env_vars_with(mapping, &|name| std::env::var(name).ok())
}

/// Replace each string leaf with `lookup(leaf)`, dropping anything unresolved.
///
/// Nested mappings are kept only when at least one of their leaves
/// resolved, so unset variables never leave null placeholders behind.
pub fn fill_env_vars_with<F>(mapping: &Mapping, lookup: &F) -> Mapping
where
	F: Fn(&str) -> Option<String>,
{
	let mut filled = Mapping::new();

	for (key, value) in mapping {
		match value {
			Value::Mapping(nested) => {
				let nested = fill_env_vars_with(nested, lookup);
				if !nested.is_empty() {
					filled.insert(key.clone(), Value::Mapping(nested));
				}
			}
			Value::String(var_name) => match lookup(var_name) {
				Some(resolved) => {
					tracing::trace!(key = %key, variable = %var_name, "substituting environment variable");
					filled.insert(key.clone(), Value::String(resolved));
				}
				None => {
					tracing::trace!(key = %key, variable = %var_name, "environment variable not set");
				}
			},
			_ => {}
		}
	}

	filled
}
