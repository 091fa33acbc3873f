//! Dynamically typed values crossing the dispatch boundary.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use smallvec::SmallVec;

/// Return value of an intercepted operation or an advice.
pub type Value = Box<dyn Any + Send>;

/// An advised object. Identity is the address of the shared allocation.
pub type Target = Arc<dyn Any + Send + Sync>;

/// An aspect or mixin instance vended by an instance container.
pub type Instance = Arc<dyn Any + Send + Sync>;

/// Error raised by an intercepted operation or an advice.
pub type Throwable = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The unit return value.
pub fn unit() -> Value {
	Box::new(())
}

/// Address identifying a shared allocation, independent of its vtable.
#[inline]
pub fn identity_of<T: ?Sized>(value: &Arc<T>) -> usize {
	Arc::as_ptr(value).cast::<()>() as usize
}

/// Argument list of an intercepted operation.
#[derive(Default)]
pub struct Args {
	values: SmallVec<[Value; 4]>,
}

impl Args {
	pub fn new() -> Self {
		Self::default()
	}

	/// Appends an argument.
	pub fn with(mut self, value: impl Any + Send) -> Self {
		self.values.push(Box::new(value));
		self
	}

	pub fn push(&mut self, value: Value) {
		self.values.push(value);
	}

	pub fn len(&self) -> usize {
		self.values.len()
	}

	pub fn is_empty(&self) -> bool {
		self.values.is_empty()
	}

	/// Typed view of argument `index`.
	pub fn get<T: Any>(&self, index: usize) -> Option<&T> {
		self.values.get(index)?.downcast_ref::<T>()
	}

	/// Mutable typed view of argument `index`.
	pub fn get_mut<T: Any>(&mut self, index: usize) -> Option<&mut T> {
		self.values.get_mut(index)?.downcast_mut::<T>()
	}

	/// Replaces argument `index`, returning the previous value.
	pub fn replace(&mut self, index: usize, value: Value) -> Option<Value> {
		let slot = self.values.get_mut(index)?;
		Some(std::mem::replace(slot, value))
	}
}

impl fmt::Debug for Args {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Args").field("len", &self.values.len()).finish()
	}
}

impl FromIterator<Value> for Args {
	fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
		Self {
			values: iter.into_iter().collect(),
		}
	}
}

/// Raised towards an advice when the dispatch machinery failed underneath it.
///
/// The dispatcher reports the underlying fault to the caller no matter what the advice does
/// with this error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("dispatch aborted: {detail}")]
pub struct InternalFault {
	pub detail: String,
}

impl InternalFault {
	pub fn new(detail: impl Into<String>) -> Self {
		Self { detail: detail.into() }
	}
}
