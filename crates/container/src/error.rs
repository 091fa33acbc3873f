use std::sync::Arc;

use crosscut_primitives::{DeploymentModel, Throwable};

/// Instance container failures.
#[derive(Debug, thiserror::Error)]
pub enum ContainerError {
	/// The factory failed; nothing was cached.
	#[error("failed to construct `{name}` ({model}) for {referent}: {source}")]
	Construction {
		name: Arc<str>,
		model: DeploymentModel,
		referent: String,
		#[source]
		source: Throwable,
	},
	/// A replacement implementation lacks an interface the current one is required to provide.
	#[error("cannot swap `{name}` to `{implementation}`: interface `{interface}` is not implemented")]
	IncompatibleImplementation {
		name: Arc<str>,
		implementation: Arc<str>,
		interface: Arc<str>,
	},
	/// A replacement implementation's method table does not line up with the current one.
	#[error("cannot swap `{name}` to `{implementation}`: {detail}")]
	IncompatibleMethods {
		name: Arc<str>,
		implementation: Arc<str>,
		detail: String,
	},
}

impl ContainerError {
	/// Name of the aspect or mixin the failing container belongs to.
	pub fn name(&self) -> &str {
		match self {
			Self::Construction { name, .. } | Self::IncompatibleImplementation { name, .. } | Self::IncompatibleMethods { name, .. } => name,
		}
	}
}
