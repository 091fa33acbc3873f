//! Implementation catalog.
//!
//! Definitions name their implementations by string; the catalog maps those names to the
//! bindings that construct and dispatch into them.

use crosscut_registry::{AspectBinding, AspectDefinition, DefinitionError, DefinitionKind, MixinBinding, Registration};
use rustc_hash::FxHashMap;

#[derive(Debug, Clone, Default)]
pub struct Catalog {
	aspects: FxHashMap<String, AspectBinding>,
	mixins: FxHashMap<String, MixinBinding>,
}

impl Catalog {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_aspect(mut self, implementation: impl Into<String>, binding: AspectBinding) -> Self {
		self.aspects.insert(implementation.into(), binding);
		self
	}

	pub fn with_mixin(mut self, implementation: impl Into<String>, binding: MixinBinding) -> Self {
		self.mixins.insert(implementation.into(), binding);
		self
	}

	pub fn aspect(&self, implementation: &str) -> Option<&AspectBinding> {
		self.aspects.get(implementation)
	}

	pub fn mixin(&self, implementation: &str) -> Option<&MixinBinding> {
		self.mixins.get(implementation)
	}

	/// Pairs `definition` with its bindings.
	///
	/// Mixins whose implementation is missing are left out here and reported by the registry
	/// when the registration is applied.
	pub fn registration(&self, definition: AspectDefinition) -> Result<Registration, DefinitionError> {
		let binding = self.aspects.get(&definition.implementation).cloned().ok_or_else(|| DefinitionError::Unbound {
			kind: DefinitionKind::Aspect,
			name: definition.name.clone(),
			implementation: definition.implementation.clone(),
		})?;
		let mixins: Vec<(String, MixinBinding)> = definition
			.mixins
			.iter()
			.filter_map(|mixin| self.mixins.get(&mixin.implementation).map(|binding| (mixin.implementation.clone(), binding.clone())))
			.collect();
		Ok(mixins
			.into_iter()
			.fold(Registration::new(definition, binding), |registration, (implementation, binding)| registration.with_mixin(implementation, binding)))
	}
}
