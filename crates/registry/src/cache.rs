//! Pointcut-match cache.
//!
//! Matching is assumed expensive, so "which advice applies to `(type, member, kind)`" is computed
//! once and memoized. Unlike a never-evicting memo table, the cache has an explicit policy:
//!
//! - [`CachePolicy::Unbounded`] keeps every entry until it is invalidated.
//! - [`CachePolicy::Bounded`] keeps the most recently used `capacity` entries.
//!
//! Every registration or implementation swap invalidates the whole cache by bumping its epoch.
//! A value computed against an older epoch is returned to its caller but not stored.

use std::hash::Hash;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};

use crosscut_primitives::{JoinPointKind, MemberSignature, TypeKey};
use lru::LruCache;
use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;
use serde::Deserialize;
use tracing::trace;

/// Eviction policy of a [`MatchCache`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CachePolicy {
	#[default]
	Unbounded,
	/// Least-recently-used eviction beyond `capacity` entries.
	Bounded(NonZeroUsize),
}

/// Cache key: runtime target type, declaring type, member and join point kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MatchKey {
	pub target_type: TypeKey,
	pub declaring: TypeKey,
	pub member: MemberSignature,
	pub kind: JoinPointKind,
}

/// Counters since construction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
	pub hits: u64,
	pub misses: u64,
	pub invalidations: u64,
	pub entries: usize,
}

enum Store<K, V> {
	Unbounded(RwLock<FxHashMap<K, V>>),
	Bounded(Mutex<LruCache<K, V>>),
}

/// Memo table from [`MatchKey`] to computed match results.
pub struct MatchCache<V, K = MatchKey> {
	store: Store<K, V>,
	epoch: AtomicU64,
	hits: AtomicU64,
	misses: AtomicU64,
	invalidations: AtomicU64,
}

impl<K: Eq + Hash + Clone, V: Clone> MatchCache<V, K> {
	pub fn new(policy: CachePolicy) -> Self {
		let store = match policy {
			CachePolicy::Unbounded => Store::Unbounded(RwLock::new(FxHashMap::default())),
			CachePolicy::Bounded(capacity) => Store::Bounded(Mutex::new(LruCache::new(capacity))),
		};
		Self {
			store,
			epoch: AtomicU64::new(0),
			hits: AtomicU64::new(0),
			misses: AtomicU64::new(0),
			invalidations: AtomicU64::new(0),
		}
	}

	pub fn policy(&self) -> CachePolicy {
		match &self.store {
			Store::Unbounded(_) => CachePolicy::Unbounded,
			Store::Bounded(lru) => CachePolicy::Bounded(lru.lock().cap()),
		}
	}

	pub fn get(&self, key: &K) -> Option<V> {
		let found = match &self.store {
			Store::Unbounded(map) => map.read().get(key).cloned(),
			Store::Bounded(lru) => lru.lock().get(key).cloned(),
		};
		let counter = if found.is_some() { &self.hits } else { &self.misses };
		counter.fetch_add(1, Ordering::Relaxed);
		found
	}

	/// Returns the cached value for `key`, computing and storing it on a miss.
	pub fn get_or_compute(&self, key: &K, compute: impl FnOnce() -> V) -> V {
		if let Some(value) = self.get(key) {
			return value;
		}
		let epoch = self.epoch.load(Ordering::Acquire);
		let value = compute();
		self.insert_at(epoch, key.clone(), value.clone());
		value
	}

	fn insert_at(&self, epoch: u64, key: K, value: V) {
		match &self.store {
			Store::Unbounded(map) => {
				let mut map = map.write();
				if self.epoch.load(Ordering::Acquire) == epoch {
					map.insert(key, value);
				}
			}
			Store::Bounded(lru) => {
				let mut lru = lru.lock();
				if self.epoch.load(Ordering::Acquire) == epoch {
					lru.put(key, value);
				}
			}
		}
	}

	/// Drops every entry.
	pub fn clear(&self) {
		self.invalidations.fetch_add(1, Ordering::Relaxed);
		match &self.store {
			Store::Unbounded(map) => {
				let mut map = map.write();
				self.epoch.fetch_add(1, Ordering::AcqRel);
				map.clear();
			}
			Store::Bounded(lru) => {
				let mut lru = lru.lock();
				self.epoch.fetch_add(1, Ordering::AcqRel);
				lru.clear();
			}
		}
		trace!("match_cache.clear");
	}

	/// Drops entries whose key satisfies `pred`. Returns how many were removed.
	pub fn invalidate_where(&self, pred: impl Fn(&K) -> bool) -> usize {
		self.invalidations.fetch_add(1, Ordering::Relaxed);
		match &self.store {
			Store::Unbounded(map) => {
				let mut map = map.write();
				let before = map.len();
				map.retain(|key, _| !pred(key));
				before - map.len()
			}
			Store::Bounded(lru) => {
				let mut lru = lru.lock();
				let doomed: Vec<K> = lru.iter().filter(|(key, _)| pred(key)).map(|(key, _)| key.clone()).collect();
				for key in &doomed {
					lru.pop(key);
				}
				doomed.len()
			}
		}
	}

	pub fn len(&self) -> usize {
		match &self.store {
			Store::Unbounded(map) => map.read().len(),
			Store::Bounded(lru) => lru.lock().len(),
		}
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	pub fn stats(&self) -> CacheStats {
		CacheStats {
			hits: self.hits.load(Ordering::Relaxed),
			misses: self.misses.load(Ordering::Relaxed),
			invalidations: self.invalidations.load(Ordering::Relaxed),
			entries: self.len(),
		}
	}
}

impl<V: Clone> MatchCache<V, MatchKey> {
	/// Drops every entry computed for or declared by `ty`.
	pub fn invalidate_type(&self, ty: &TypeKey) -> usize {
		self.invalidate_where(|key| &key.target_type == ty || &key.declaring == ty)
	}
}
