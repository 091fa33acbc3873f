//! Strongly keyed slots: the per-process cell and the per-type map.
//!
//! # Invariants
//!
//! - Reads never take a lock; construction runs under the slot's own mutex and re-checks
//!   after acquiring it, so at most one instance is ever published per key.
//!   - Enforced in: [`ProcessSlot::get_or_try_init`], [`TypeMap::get_or_try_init`].
//!   - Tested by: `invariants::test_single_instance_under_contention`.
//!   - Failure symptom: two callers observe different per-process instances.
//! - A failed construction publishes nothing.
//!   - Enforced in: the `?` before publication in both slots.
//!   - Tested by: `invariants::test_failed_construction_is_not_cached`.
//!   - Failure symptom: later callers receive a half-built instance or a stale error.

use std::sync::Arc;

use arc_swap::{ArcSwap, ArcSwapOption};
use crosscut_primitives::{Instance, TypeKey};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;

/// Single process-wide instance.
#[derive(Default)]
pub(crate) struct ProcessSlot {
	cell: ArcSwapOption<Instance>,
	lock: Mutex<()>,
}

impl ProcessSlot {
	pub(crate) fn get(&self) -> Option<Instance> {
		self.cell.load().as_deref().cloned()
	}

	pub(crate) fn get_or_try_init<E>(&self, build: impl FnOnce() -> Result<Instance, E>) -> Result<Instance, E> {
		if let Some(instance) = self.get() {
			return Ok(instance);
		}
		let _guard = self.lock.lock();
		if let Some(instance) = self.get() {
			return Ok(instance);
		}
		let instance = build()?;
		self.cell.store(Some(Arc::new(instance.clone())));
		Ok(instance)
	}

	pub(crate) fn is_set(&self) -> bool {
		self.cell.load().is_some()
	}
}

/// Per-type instances, published copy-on-write.
#[derive(Default)]
pub(crate) struct TypeMap {
	map: ArcSwap<FxHashMap<TypeKey, Instance>>,
	lock: Mutex<()>,
}

impl TypeMap {
	pub(crate) fn get(&self, key: &TypeKey) -> Option<Instance> {
		self.map.load().get(key).cloned()
	}

	pub(crate) fn get_or_try_init<E>(&self, key: &TypeKey, build: impl FnOnce() -> Result<Instance, E>) -> Result<Instance, E> {
		if let Some(instance) = self.get(key) {
			return Ok(instance);
		}
		let _guard = self.lock.lock();
		let current = self.map.load_full();
		if let Some(instance) = current.get(key) {
			return Ok(instance.clone());
		}
		let instance = build()?;
		let mut next = FxHashMap::clone(&current);
		next.insert(key.clone(), instance.clone());
		self.map.store(Arc::new(next));
		Ok(instance)
	}

	pub(crate) fn len(&self) -> usize {
		self.map.load().len()
	}
}
