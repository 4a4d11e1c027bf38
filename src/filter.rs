use log::debug;

use crate::matcher::{lookup, wildcard_match};
use crate::registry::Registry;
use crate::{Error, Result};

/// Which registered tests a run should execute.
///
/// With neither a pattern nor names every test is selected. Names select
/// tests through [`lookup`]; `skip_mode` turns them into exclusions. A
/// pattern further restricts the selection with [`wildcard_match`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSpec {
	pub pattern: Option<String>,
	pub names: Vec<String>,
	pub skip_mode: bool,
}

impl FilterSpec {
	pub fn pattern(pattern: impl Into<String>) -> FilterSpec {
		FilterSpec {
			pattern: Some(pattern.into()),
			..FilterSpec::default()
		}
	}

	/// Returns one flag per registry entry.
	///
	/// Fails if one of the explicit names matches no test at all.
	pub fn select(&self, registry: &Registry) -> Result<Vec<bool>> {
		let mut named = vec![self.names.is_empty(); registry.len()];
		for name in &self.names {
			let hits = lookup(registry.names(), name);
			if hits.is_empty() {
				return Err(Error::UnknownTest(name.clone()));
			}
			debug!("'{name}' selects {} test(s)", hits.len());
			for hit in hits {
				named[hit] = true;
			}
		}

		let pattern = self.pattern.as_deref().unwrap_or_default();
		let selection = registry
			.names()
			.zip(named)
			.map(|(name, named)| {
				let named = if self.skip_mode && !self.names.is_empty() {
					!named
				} else {
					named
				};
				named && wildcard_match(pattern, name)
			})
			.collect();
		Ok(selection)
	}
}
