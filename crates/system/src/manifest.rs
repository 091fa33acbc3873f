//! Definition manifests.
//!
//! A manifest is a list of [`AspectDefinition`]s, one `[[aspect]]` table each:
//!
//! ```toml
//! [[aspect]]
//! name = "audit"
//! implementation = "bank.Auditor"
//! deployment-model = "perClass"
//!
//! [[aspect.advice]]
//! name = "log"
//! kind = "around"
//! pointcut = "bank::Account::*"
//! method = "log"
//! ```

use std::path::Path;

use crosscut_registry::AspectDefinition;
use rustc_hash::FxHashSet;
use serde::Deserialize;

use crate::error::{ConfigError, Result, read};

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
	#[serde(default, rename = "aspect")]
	pub aspects: Vec<AspectDefinition>,
}

impl Manifest {
	pub fn from_toml_str(input: &str) -> Result<Self> {
		let manifest: Self = toml::from_str(input)?;
		manifest.validate()?;
		Ok(manifest)
	}

	pub fn load(path: impl AsRef<Path>) -> Result<Self> {
		Self::from_toml_str(&read(path.as_ref())?)
	}

	fn validate(&self) -> Result<()> {
		let mut seen = FxHashSet::default();
		match self.aspects.iter().find(|aspect| !seen.insert(aspect.name.as_str())) {
			Some(duplicate) => Err(ConfigError::DuplicateAspect(duplicate.name.clone())),
			None => Ok(()),
		}
	}

	pub fn names(&self) -> impl Iterator<Item = &str> {
		self.aspects.iter().map(|aspect| aspect.name.as_str())
	}

	pub fn get(&self, name: &str) -> Option<&AspectDefinition> {
		self.aspects.iter().find(|aspect| aspect.name == name)
	}

	/// The aspect introducing mixin `mixin`.
	pub fn owner_of_mixin(&self, mixin: &str) -> Option<&AspectDefinition> {
		self.aspects.iter().find(|aspect| aspect.mixins.iter().any(|m| m.name == mixin))
	}
}
