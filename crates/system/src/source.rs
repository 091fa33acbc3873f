use crosscut_registry::{DefinitionError, DefinitionSource, Registration};
use tracing::debug;

use crate::catalog::Catalog;
use crate::manifest::Manifest;

/// Supplies manifest definitions to a registry on demand.
///
/// Nothing is instantiated or validated until the registry first looks a name up.
#[derive(Debug, Clone)]
pub struct ManifestSource {
	manifest: Manifest,
	catalog: Catalog,
}

impl ManifestSource {
	pub fn new(manifest: Manifest, catalog: Catalog) -> Self {
		Self { manifest, catalog }
	}

	pub fn manifest(&self) -> &Manifest {
		&self.manifest
	}
}

impl DefinitionSource for ManifestSource {
	fn load(&self, name: &str) -> Result<Option<Registration>, DefinitionError> {
		let Some(definition) = self.manifest.get(name) else {
			return Ok(None);
		};
		debug!(aspect = name, implementation = %definition.implementation, "manifest.load");
		self.catalog.registration(definition.clone()).map(Some)
	}

	fn names(&self) -> Vec<String> {
		self.manifest.names().map(str::to_string).collect()
	}

	fn owner_of_mixin(&self, mixin: &str) -> Option<String> {
		self.manifest.owner_of_mixin(mixin).map(|aspect| aspect.name.clone())
	}
}
