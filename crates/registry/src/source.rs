use rustc_hash::FxHashMap;

use crate::binding::{AspectBinding, MixinBinding};
use crate::definition::AspectDefinition;
use crate::error::DefinitionError;

/// An aspect definition with the bindings needed to instantiate it.
#[derive(Debug, Clone)]
pub struct Registration {
	pub definition: AspectDefinition,
	pub binding: AspectBinding,
	/// Mixin bindings keyed by [`crate::MixinDefinition::implementation`].
	pub mixins: FxHashMap<String, MixinBinding>,
}

impl Registration {
	pub fn new(definition: AspectDefinition, binding: AspectBinding) -> Self {
		Self {
			definition,
			binding,
			mixins: FxHashMap::default(),
		}
	}

	pub fn with_mixin(mut self, implementation: impl Into<String>, binding: MixinBinding) -> Self {
		self.mixins.insert(implementation.into(), binding);
		self
	}
}

/// Deferred supply of definitions.
///
/// Consulted when a lookup misses, at most once per lookup.
pub trait DefinitionSource: Send + Sync {
	/// Produces the registration for aspect `name`, if this source knows it.
	fn load(&self, name: &str) -> Result<Option<Registration>, DefinitionError>;

	/// Every aspect name this source can supply.
	fn names(&self) -> Vec<String> {
		Vec::new()
	}

	/// Name of the aspect that introduces mixin `mixin`, if this source knows it.
	fn owner_of_mixin(&self, mixin: &str) -> Option<String> {
		let _ = mixin;
		None
	}
}
