use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::SystemConfig;
use crate::error::Result;
use crate::system::AspectSystem;

/// Live aspect systems by id.
///
/// An explicit object owned by whoever hosts the systems, shared as `Arc<SystemRegistry>`.
/// Tests create their own and tear it down with [`SystemRegistry::reset`].
#[derive(Debug, Default)]
pub struct SystemRegistry {
	systems: RwLock<FxHashMap<Uuid, Arc<AspectSystem>>>,
}

impl SystemRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	/// Creates a system from `config` and registers it under its fresh id.
	pub fn create(&self, config: SystemConfig) -> Result<Arc<AspectSystem>> {
		Ok(self.insert(AspectSystem::new(config)?))
	}

	pub fn insert(&self, system: AspectSystem) -> Arc<AspectSystem> {
		let system = Arc::new(system);
		self.systems.write().insert(system.id(), Arc::clone(&system));
		debug!(system = %system.id(), "systems.insert");
		system
	}

	pub fn get(&self, id: Uuid) -> Option<Arc<AspectSystem>> {
		self.systems.read().get(&id).cloned()
	}

	/// Unregisters system `id`. Holders of the returned handle keep it usable.
	pub fn remove(&self, id: Uuid) -> Option<Arc<AspectSystem>> {
		let removed = self.systems.write().remove(&id);
		if removed.is_some() {
			debug!(system = %id, "systems.remove");
		}
		removed
	}

	/// Removes every system, returning how many there were.
	pub fn reset(&self) -> usize {
		let drained = std::mem::take(&mut *self.systems.write());
		info!(count = drained.len(), "systems.reset");
		drained.len()
	}

	pub fn ids(&self) -> Vec<Uuid> {
		self.systems.read().keys().copied().collect()
	}

	pub fn len(&self) -> usize {
		self.systems.read().len()
	}

	pub fn is_empty(&self) -> bool {
		self.systems.read().is_empty()
	}
}
