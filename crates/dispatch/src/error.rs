use std::sync::Arc;

use crosscut_container::ContainerError;
use crosscut_primitives::{InternalFault, Throwable};
use crosscut_registry::{DefinitionError, DefinitionKind};

/// Failures of the dispatch machinery itself, as opposed to errors raised by advice code.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
	#[error(transparent)]
	Definition(#[from] DefinitionError),
	#[error(transparent)]
	Container(#[from] ContainerError),
	#[error("{kind} `{name}` has no method `{member}` ({operation})")]
	UnknownMember {
		kind: DefinitionKind,
		name: Arc<str>,
		member: String,
		operation: &'static str,
	},
	#[error("{kind} `{name}` resolved to an instance that is not a `{expected}` ({operation})")]
	ReceiverMismatch {
		kind: DefinitionKind,
		name: Arc<str>,
		expected: &'static str,
		operation: &'static str,
	},
	/// An [`InternalFault`] surfaced through advice code.
	#[error(transparent)]
	Fault(#[from] InternalFault),
}

impl DispatchError {
	/// The fault advice code observes in place of this error.
	pub fn to_fault(&self) -> InternalFault {
		match self {
			Self::Fault(fault) => fault.clone(),
			other => InternalFault::new(other.to_string()),
		}
	}
}

/// Outcome of a failed dispatch.
#[derive(Debug, thiserror::Error)]
pub enum Raised {
	/// Raised by the original operation or by advice, passed through untouched.
	#[error("{0}")]
	Thrown(Throwable),
	/// The dispatch machinery failed. Never masked by advice.
	#[error("internal dispatch failure: {0}")]
	Internal(#[from] DispatchError),
}

impl Raised {
	/// Splits an error returned by advice or an original operation. An [`InternalFault`] always
	/// lands in [`Raised::Internal`].
	pub fn classify(err: Throwable) -> Self {
		match err.downcast::<InternalFault>() {
			Ok(fault) => Self::Internal(DispatchError::Fault(*fault)),
			Err(err) => Self::Thrown(err),
		}
	}

	pub fn is_internal(&self) -> bool {
		matches!(self, Self::Internal(_))
	}

	/// The error raised by user code, if that is what this is.
	pub fn thrown(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
		match self {
			Self::Thrown(err) => Some(&**err),
			Self::Internal(_) => None,
		}
	}

	/// Converts back into a throwable for a caller that is itself advised code.
	///
	/// Internal failures become an [`InternalFault`], which the enclosing dispatch classifies as
	/// internal again.
	pub fn into_throwable(self) -> Throwable {
		match self {
			Self::Thrown(err) => err,
			Self::Internal(err) => Box::new(err.to_fault()),
		}
	}
}

impl From<DefinitionError> for Raised {
	fn from(err: DefinitionError) -> Self {
		Self::Internal(err.into())
	}
}

impl From<ContainerError> for Raised {
	fn from(err: ContainerError) -> Self {
		Self::Internal(err.into())
	}
}
