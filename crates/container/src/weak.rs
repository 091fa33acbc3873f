//! Weakly keyed maps: per-instance and per-thread instances.
//!
//! Keys never keep their referent alive. A per-instance entry holds a [`Weak`] to the target
//! allocation and is keyed by its address; while the weak handle exists the allocation cannot
//! be reused, so address equality implies identity. A per-thread entry holds a weak handle to
//! a token owned by the thread's local storage, which dies when the thread exits.
//!
//! Dead entries are pruned opportunistically every `prune_threshold` insertions and by an
//! explicit [`crate::InstanceContainer::purge`].

use std::any::Any;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::thread::{self, ThreadId};

use crosscut_primitives::{Instance, Target, identity_of};
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use tracing::warn;

struct InstanceEntry {
	key: Weak<dyn Any + Send + Sync>,
	instance: Instance,
}

impl InstanceEntry {
	fn is_live(&self) -> bool {
		self.key.strong_count() > 0
	}
}

/// Per-target-identity instances.
pub(crate) struct InstanceMap {
	map: RwLock<FxHashMap<usize, InstanceEntry>>,
	inserts: AtomicUsize,
	prune_threshold: usize,
}

impl InstanceMap {
	pub(crate) fn new(prune_threshold: usize) -> Self {
		Self {
			map: RwLock::new(FxHashMap::default()),
			inserts: AtomicUsize::new(0),
			prune_threshold: prune_threshold.max(1),
		}
	}

	pub(crate) fn get(&self, target: &Target) -> Option<Instance> {
		let addr = identity_of(target);
		let map = self.map.read();
		let entry = map.get(&addr)?;
		entry.is_live().then(|| entry.instance.clone())
	}

	pub(crate) fn get_or_try_init<E>(&self, target: &Target, build: impl FnOnce() -> Result<Instance, E>) -> Result<Instance, E> {
		if let Some(instance) = self.get(target) {
			return Ok(instance);
		}
		let addr = identity_of(target);
		let mut map = self.map.write();
		if let Some(entry) = map.get(&addr)
			&& entry.is_live()
		{
			return Ok(entry.instance.clone());
		}
		let instance = build()?;
		map.insert(
			addr,
			InstanceEntry {
				key: Arc::downgrade(target),
				instance: instance.clone(),
			},
		);
		if self.inserts.fetch_add(1, Ordering::Relaxed) % self.prune_threshold == self.prune_threshold - 1 {
			let pruned = prune(&mut map, InstanceEntry::is_live);
			if pruned > 0 {
				warn!(pruned, remaining = map.len(), "container.prune.per_instance");
			}
		}
		Ok(instance)
	}

	pub(crate) fn purge(&self) -> usize {
		prune(&mut self.map.write(), InstanceEntry::is_live)
	}

	pub(crate) fn live_len(&self) -> usize {
		self.map.read().values().filter(|entry| entry.is_live()).count()
	}

	pub(crate) fn len(&self) -> usize {
		self.map.read().len()
	}
}

thread_local! {
	static THREAD_TOKEN: Arc<()> = Arc::new(());
}

/// Weak handle that dies when the current thread's local storage is torn down.
fn current_thread_token() -> Weak<()> {
	THREAD_TOKEN.try_with(Arc::downgrade).unwrap_or_default()
}

struct ThreadEntry {
	alive: Weak<()>,
	instance: Instance,
}

impl ThreadEntry {
	fn is_live(&self) -> bool {
		self.alive.strong_count() > 0
	}
}

/// Per-thread instances.
pub(crate) struct ThreadMap {
	map: RwLock<FxHashMap<ThreadId, ThreadEntry>>,
	inserts: AtomicUsize,
	prune_threshold: usize,
}

impl ThreadMap {
	pub(crate) fn new(prune_threshold: usize) -> Self {
		Self {
			map: RwLock::new(FxHashMap::default()),
			inserts: AtomicUsize::new(0),
			prune_threshold: prune_threshold.max(1),
		}
	}

	pub(crate) fn get(&self) -> Option<Instance> {
		let id = thread::current().id();
		self.map.read().get(&id).map(|entry| entry.instance.clone())
	}

	pub(crate) fn get_or_try_init<E>(&self, build: impl FnOnce() -> Result<Instance, E>) -> Result<Instance, E> {
		if let Some(instance) = self.get() {
			return Ok(instance);
		}
		let id = thread::current().id();
		let mut map = self.map.write();
		if let Some(entry) = map.get(&id) {
			return Ok(entry.instance.clone());
		}
		let instance = build()?;
		map.insert(
			id,
			ThreadEntry {
				alive: current_thread_token(),
				instance: instance.clone(),
			},
		);
		if self.inserts.fetch_add(1, Ordering::Relaxed) % self.prune_threshold == self.prune_threshold - 1 {
			let pruned = prune(&mut map, ThreadEntry::is_live);
			if pruned > 0 {
				warn!(pruned, remaining = map.len(), "container.prune.per_thread");
			}
		}
		Ok(instance)
	}

	pub(crate) fn purge(&self) -> usize {
		prune(&mut self.map.write(), ThreadEntry::is_live)
	}

	pub(crate) fn live_len(&self) -> usize {
		self.map.read().values().filter(|entry| entry.is_live()).count()
	}
}

fn prune<K, V>(map: &mut FxHashMap<K, V>, is_live: impl Fn(&V) -> bool) -> usize {
	let before = map.len();
	map.retain(|_, entry| is_live(entry));
	before - map.len()
}
