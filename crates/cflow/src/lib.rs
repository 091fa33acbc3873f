//! Control-flow tracking.
//!
//! # Role
//!
//! A [`CflowTracker`] answers "is the current call nested inside flow X" for cflow pointcuts.
//! The weaving layer (or the dispatcher) brackets tracked calls with [`CflowTracker::enter`]
//! and [`CflowTracker::exit`]; advice gating queries [`CflowTracker::is_active`].
//!
//! # Concurrency
//!
//! Markers live in thread-local storage, so a thread only ever observes the flows it entered
//! itself and no locking is involved. The per-thread set is created lazily on first `enter`.
//! Each tracker has a process-unique id and keeps its own per-thread set, so two trackers on
//! the same thread never see each other's markers.
//!
//! # Invariants
//!
//! - `exit` of a marker that is not active is a no-op.
//!   - Enforced in: [`CflowTracker::exit`].
//!   - Tested by: `tests::exit_without_enter_is_a_noop`.
//!   - Failure symptom: unbalanced enter/exit from woven code panics the host.
//! - A marker entered recursively stays active until the matching outermost `exit`.
//!   - Enforced in: [`MarkerSet`] counts.
//!   - Tested by: `tests::recursive_entry_is_counted`.
//!   - Failure symptom: cflow advice stops firing after the first recursive return.

use std::cell::RefCell;
use std::fmt;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};

use crosscut_primitives::{JoinPointKind, JoinPointSite, MemberSignature, TypeKey};
use rustc_hash::FxHashMap;
use tracing::trace;

/// A flow currently entered: the shape of the join point that opened it.
///
/// Markers carry the full member signature, so overloads of one name are distinct flows, and
/// both the declaring and the runtime target type, so a cflow expression naming either one
/// sees the flow. The same shape is what the registry matches when deciding that a join point
/// opens a flow.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct CflowMarker {
	kind: JoinPointKind,
	declaring: TypeKey,
	target_type: TypeKey,
	member: MemberSignature,
}

impl CflowMarker {
	/// Method execution marker whose runtime type is the declaring type.
	pub fn new(declaring: impl Into<TypeKey>, member: impl Into<MemberSignature>) -> Self {
		let declaring = declaring.into();
		Self {
			kind: JoinPointKind::MethodExecution,
			target_type: declaring.clone(),
			declaring,
			member: member.into(),
		}
	}

	/// Marker for a join point site, taking the declaring type as the runtime type.
	pub fn for_site(site: &JoinPointSite) -> Self {
		Self::for_join_point(site, site.declaring_type())
	}

	/// Marker for `site` executing on a target whose runtime type is `target_type`.
	pub fn for_join_point(site: &JoinPointSite, target_type: &TypeKey) -> Self {
		Self {
			kind: site.kind(),
			declaring: site.declaring_type().clone(),
			target_type: target_type.clone(),
			member: site.member().clone(),
		}
	}

	pub fn kind(&self) -> JoinPointKind {
		self.kind
	}

	pub fn declaring_type(&self) -> &TypeKey {
		&self.declaring
	}

	pub fn target_type(&self) -> &TypeKey {
		&self.target_type
	}

	/// Member name.
	pub fn member(&self) -> &str {
		self.member.name()
	}

	pub fn signature(&self) -> &MemberSignature {
		&self.member
	}
}

impl fmt::Debug for CflowMarker {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		if self.target_type == self.declaring {
			write!(f, "CflowMarker({}::{})", self.declaring, self.member)
		} else {
			write!(f, "CflowMarker({}::{} on {})", self.declaring, self.member, self.target_type)
		}
	}
}

/// Counted set of entered markers for one tracker on one thread.
#[derive(Default)]
struct MarkerSet {
	counts: FxHashMap<CflowMarker, u32>,
}

impl MarkerSet {
	fn enter(&mut self, marker: CflowMarker) {
		*self.counts.entry(marker).or_insert(0) += 1;
	}

	/// Returns false when the marker was not active.
	fn exit(&mut self, marker: &CflowMarker) -> bool {
		let Some(count) = self.counts.get_mut(marker) else {
			return false;
		};
		*count -= 1;
		if *count == 0 {
			self.counts.remove(marker);
		}
		true
	}

	fn is_empty(&self) -> bool {
		self.counts.is_empty()
	}
}

thread_local! {
	static FLOWS: RefCell<FxHashMap<u64, MarkerSet>> = RefCell::new(FxHashMap::default());
}

static NEXT_TRACKER_ID: AtomicU64 = AtomicU64::new(1);

/// Per-thread registry of entered control flows.
#[derive(Debug)]
pub struct CflowTracker {
	id: u64,
}

impl Default for CflowTracker {
	fn default() -> Self {
		Self::new()
	}
}

impl CflowTracker {
	pub fn new() -> Self {
		Self {
			id: NEXT_TRACKER_ID.fetch_add(1, Ordering::Relaxed),
		}
	}

	/// Marks `marker` as entered on the current thread.
	pub fn enter(&self, marker: CflowMarker) {
		trace!(tracker = self.id, marker = ?marker, "cflow.enter");
		let _ = FLOWS.try_with(|flows| flows.borrow_mut().entry(self.id).or_default().enter(marker));
	}

	/// Leaves `marker` on the current thread.
	pub fn exit(&self, marker: &CflowMarker) {
		let _ = FLOWS.try_with(|flows| {
			let mut flows = flows.borrow_mut();
			let Some(set) = flows.get_mut(&self.id) else {
				trace!(tracker = self.id, marker = ?marker, "cflow.exit without enter");
				return;
			};
			if !set.exit(marker) {
				trace!(tracker = self.id, marker = ?marker, "cflow.exit without enter");
			}
			if set.is_empty() {
				flows.remove(&self.id);
			}
		});
	}

	/// Enters `marker` and leaves it again when the guard drops.
	pub fn enter_scoped(&self, marker: CflowMarker) -> CflowGuard<'_> {
		self.enter(marker.clone());
		CflowGuard {
			tracker: self,
			marker,
			_not_send: PhantomData,
		}
	}

	/// Returns true if any marker entered on the current thread satisfies `pattern`.
	pub fn is_active(&self, mut pattern: impl FnMut(&CflowMarker) -> bool) -> bool {
		FLOWS
			.try_with(|flows| {
				flows
					.borrow()
					.get(&self.id)
					.is_some_and(|set| set.counts.keys().any(&mut pattern))
			})
			.unwrap_or(false)
	}

	/// Returns true if exactly `marker` is active on the current thread.
	pub fn contains(&self, marker: &CflowMarker) -> bool {
		self.depth(marker) > 0
	}

	/// Nesting depth of `marker` on the current thread.
	pub fn depth(&self, marker: &CflowMarker) -> u32 {
		FLOWS
			.try_with(|flows| {
				flows
					.borrow()
					.get(&self.id)
					.and_then(|set| set.counts.get(marker).copied())
					.unwrap_or(0)
			})
			.unwrap_or(0)
	}

	/// Markers active on the current thread, in no particular order.
	pub fn snapshot(&self) -> Vec<CflowMarker> {
		FLOWS
			.try_with(|flows| {
				flows
					.borrow()
					.get(&self.id)
					.map(|set| set.counts.keys().cloned().collect())
					.unwrap_or_default()
			})
			.unwrap_or_default()
	}

	/// Drops every marker this tracker holds on the current thread.
	pub fn clear_current_thread(&self) {
		let _ = FLOWS.try_with(|flows| flows.borrow_mut().remove(&self.id));
	}
}

/// Leaves its marker on drop. Bound to the thread that created it.
#[must_use = "the flow is left as soon as the guard is dropped"]
pub struct CflowGuard<'a> {
	tracker: &'a CflowTracker,
	marker: CflowMarker,
	_not_send: PhantomData<*const ()>,
}

impl CflowGuard<'_> {
	pub fn marker(&self) -> &CflowMarker {
		&self.marker
	}
}

impl Drop for CflowGuard<'_> {
	fn drop(&mut self) {
		self.tracker.exit(&self.marker);
	}
}
