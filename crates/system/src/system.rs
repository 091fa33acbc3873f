use std::sync::Arc;

use crosscut_cflow::CflowTracker;
use crosscut_container::PurgeReport;
use crosscut_dispatch::Dispatcher;
use crosscut_primitives::AspectIndex;
use crosscut_registry::{AspectBinding, AspectDefinition, AspectRegistry, DefinitionError, GlobMatcher, PointcutMatcher, Registration};
use tracing::info;
use uuid::Uuid;

use crate::catalog::Catalog;
use crate::config::SystemConfig;
use crate::error::Result;
use crate::manifest::Manifest;
use crate::source::ManifestSource;

/// One aspect system: a registry, the control-flow tracker its cflow advice consults, and
/// the dispatcher joining the two.
///
/// Systems share nothing. Instances, markers and cached plans of one are invisible to another.
pub struct AspectSystem {
	id: Uuid,
	config: SystemConfig,
	dispatcher: Dispatcher,
}

impl AspectSystem {
	/// Creates a system matching pointcuts with the bundled [`GlobMatcher`].
	pub fn new(config: SystemConfig) -> Result<Self> {
		Self::build(config, Arc::new(GlobMatcher::new()), None)
	}

	pub fn with_matcher(config: SystemConfig, matcher: Arc<dyn PointcutMatcher>) -> Result<Self> {
		Self::build(config, matcher, None)
	}

	/// Creates a system whose aspects are loaded from `manifest` on the first dispatch or lookup.
	pub fn with_manifest(config: SystemConfig, manifest: Manifest, catalog: Catalog) -> Result<Self> {
		Self::build(config, Arc::new(GlobMatcher::new()), Some(ManifestSource::new(manifest, catalog)))
	}

	fn build(config: SystemConfig, matcher: Arc<dyn PointcutMatcher>, source: Option<ManifestSource>) -> Result<Self> {
		let id = Uuid::new_v4();
		let mut registry = AspectRegistry::with_options(matcher, config.registry_options(id)?);
		if let Some(source) = source {
			registry = registry.with_source(Arc::new(source));
		}
		let dispatcher = Dispatcher::new(Arc::new(registry), Arc::new(CflowTracker::new())).with_cflow_tracking(config.cflow.enabled);
		info!(system = %id, cflow = config.cflow.enabled, "system.create");
		Ok(Self { id, config, dispatcher })
	}

	pub fn id(&self) -> Uuid {
		self.id
	}

	pub fn config(&self) -> &SystemConfig {
		&self.config
	}

	pub fn registry(&self) -> &Arc<AspectRegistry> {
		self.dispatcher.registry()
	}

	pub fn tracker(&self) -> &Arc<CflowTracker> {
		self.dispatcher.tracker()
	}

	pub fn dispatcher(&self) -> &Dispatcher {
		&self.dispatcher
	}

	pub fn deploy(&self, definition: AspectDefinition, binding: AspectBinding) -> std::result::Result<AspectIndex, DefinitionError> {
		self.registry().register_aspect(definition, binding)
	}

	pub fn deploy_registration(&self, registration: Registration) -> std::result::Result<AspectIndex, DefinitionError> {
		self.registry().register(registration)
	}

	/// Registers every aspect of `manifest` now, in manifest order.
	///
	/// Stops at the first failing definition; aspects registered before it stay registered.
	pub fn deploy_manifest(&self, manifest: &Manifest, catalog: &Catalog) -> std::result::Result<Vec<AspectIndex>, DefinitionError> {
		manifest
			.aspects
			.iter()
			.map(|definition| self.deploy_registration(catalog.registration(definition.clone())?))
			.collect()
	}

	/// Drops instances whose target object or thread has gone away.
	pub fn purge(&self) -> PurgeReport {
		self.registry().purge()
	}
}

impl std::fmt::Debug for AspectSystem {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("AspectSystem")
			.field("id", &self.id)
			.field("registry", self.registry())
			.finish_non_exhaustive()
	}
}
