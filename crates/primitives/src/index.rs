//! Dense numeric handles.
//!
//! Join points resolve "who to call" through these handles instead of string lookups.
//! A handle is assigned once at registration and never changes afterwards.

use std::fmt;

/// A dense `u32` handle into an append-only table.
pub trait DenseId: Copy + Eq + Ord + std::hash::Hash + fmt::Debug + Send + Sync + 'static {
	/// Builds the handle from its raw position.
	fn from_u32(raw: u32) -> Self;

	/// Raw table position.
	fn as_u32(self) -> u32;

	/// Raw table position as `usize`.
	#[inline]
	fn as_usize(self) -> usize {
		self.as_u32() as usize
	}
}

macro_rules! dense_id {
	($(#[$meta:meta])* $name:ident, $label:literal) => {
		$(#[$meta])*
		#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
		pub struct $name(u32);

		impl $name {
			/// Builds the handle from its raw position.
			pub const fn new(raw: u32) -> Self {
				Self(raw)
			}
		}

		impl DenseId for $name {
			#[inline]
			fn from_u32(raw: u32) -> Self {
				Self(raw)
			}

			#[inline]
			fn as_u32(self) -> u32 {
				self.0
			}
		}

		impl fmt::Debug for $name {
			fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
				write!(f, concat!($label, "#{}"), self.0)
			}
		}

		impl fmt::Display for $name {
			fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
				write!(f, "{}", self.0)
			}
		}
	};
}

dense_id!(
	/// Position of an aspect in its registry.
	AspectIndex,
	"aspect"
);
dense_id!(
	/// Position of a method inside an aspect's or mixin's sorted method repository.
	MemberIndex,
	"member"
);
dense_id!(
	/// Position of a mixin in its registry.
	MixinIndex,
	"mixin"
);

/// Converts a table length into a handle, panicking only when a table outgrows `u32`.
#[inline]
pub fn u32_index(idx: usize, what: &'static str) -> u32 {
	u32::try_from(idx).unwrap_or_else(|_| panic!("{what}: index {idx} exceeds u32 range"))
}

/// Stable `(aspect, member)` handle substituting for name lookups on the hot path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IndexTuple {
	pub aspect: AspectIndex,
	pub member: MemberIndex,
}

impl IndexTuple {
	pub const fn new(aspect: AspectIndex, member: MemberIndex) -> Self {
		Self { aspect, member }
	}
}

impl fmt::Display for IndexTuple {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "({}, {})", self.aspect, self.member)
	}
}
