use std::fmt;

use crosscut_container::ContainerError;
use crosscut_primitives::{DeploymentModel, ParseModelError};

/// What a failing lookup or definition refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DefinitionKind {
	Aspect,
	Advice,
	Mixin,
}

impl fmt::Display for DefinitionKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			Self::Aspect => "aspect",
			Self::Advice => "advice",
			Self::Mixin => "mixin",
		})
	}
}

/// Misconfigured or missing definitions.
///
/// Every variant names the definition involved; lookups also name the attempted operation.
#[derive(Debug, thiserror::Error)]
pub enum DefinitionError {
	#[error("{kind} `{name}` is not defined ({operation})")]
	NotDefined {
		kind: DefinitionKind,
		name: String,
		operation: &'static str,
	},
	#[error("{kind} index {index} is out of range ({operation})")]
	IndexOutOfRange {
		kind: DefinitionKind,
		index: u32,
		operation: &'static str,
	},
	#[error("{kind} `{name}` has an invalid deployment model: {source}")]
	InvalidModel {
		kind: DefinitionKind,
		name: String,
		#[source]
		source: ParseModelError,
	},
	#[error("mixin `{mixin}` ({mixin_model}) cannot belong to aspect `{aspect}` ({aspect_model})")]
	IncompatibleMixinModel {
		mixin: String,
		mixin_model: DeploymentModel,
		aspect: String,
		aspect_model: DeploymentModel,
	},
	#[error("{kind} `{name}` refers to method `{method}`, which `{implementation}` does not provide")]
	UnknownMethod {
		kind: DefinitionKind,
		name: String,
		method: String,
		implementation: String,
	},
	#[error("advice `{advice}` of aspect `{aspect}` has no pointcut")]
	MissingPointcut { aspect: String, advice: String },
	#[error("mixin `{mixin}` of aspect `{aspect}` is already introduced by aspect `{existing}`")]
	DuplicateMixin { mixin: String, aspect: String, existing: String },
	#[error("no implementation bound as `{implementation}` for {kind} `{name}`")]
	Unbound {
		kind: DefinitionKind,
		name: String,
		implementation: String,
	},
	#[error(transparent)]
	Container(#[from] ContainerError),
}

impl DefinitionError {
	pub(crate) fn not_defined(kind: DefinitionKind, name: impl Into<String>, operation: &'static str) -> Self {
		Self::NotDefined {
			kind,
			name: name.into(),
			operation,
		}
	}

	/// True for lookups that may succeed once deferred definitions are loaded.
	pub fn is_not_defined(&self) -> bool {
		matches!(self, Self::NotDefined { .. } | Self::IndexOutOfRange { .. })
	}
}
