//! Deployment models.
//!
//! A deployment model decides how many instances of an aspect or mixin exist and
//! which referent each one is bound to.
//!
//! # Granularity
//!
//! The ordered models form the chain `PerProcess < PerType < PerInstance`. `PerThread`
//! stands apart: it is neither coarser nor finer than the type/instance models.
//!
//! # Mixin Compatibility
//!
//! | aspect \ mixin | PerProcess | PerType | PerInstance | PerThread |
//! |----------------|------------|---------|-------------|-----------|
//! | PerProcess     | yes        | yes (1) | no          | no        |
//! | PerType        | yes        | yes     | no          | no        |
//! | PerInstance    | yes        | yes     | yes         | no        |
//! | PerThread      | yes        | no      | no          | yes       |
//!
//! (1) A per-type mixin owned by a per-process aspect binds to the single process-wide
//! aspect instance.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use strum_macros::{EnumIter, EnumString, IntoStaticStr};

/// Sharing policy of an aspect, advice or mixin instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, EnumString, EnumIter, IntoStaticStr, Deserialize)]
#[strum(ascii_case_insensitive)]
#[serde(try_from = "String")]
pub enum DeploymentModel {
	/// One instance for the whole process.
	#[default]
	#[strum(to_string = "perProcess", serialize = "perJVM", serialize = "per-process")]
	PerProcess,
	/// One instance per target type.
	#[strum(to_string = "perType", serialize = "perClass", serialize = "per-type")]
	PerType,
	/// One instance per target object identity.
	#[strum(to_string = "perInstance", serialize = "per-instance")]
	PerInstance,
	/// One instance per thread.
	#[strum(to_string = "perThread", serialize = "per-thread")]
	PerThread,
}

impl DeploymentModel {
	/// Parses a deployment model string, treating an absent or blank value as [`DeploymentModel::PerProcess`].
	pub fn parse_or_default(value: Option<&str>) -> Result<Self, ParseModelError> {
		match value.map(str::trim) {
			None | Some("") => Ok(Self::default()),
			Some(text) => Self::from_name(text),
		}
	}

	/// Parses a deployment model name, accepting the legacy `perJVM`/`perClass` spellings.
	pub fn from_name(value: &str) -> Result<Self, ParseModelError> {
		<Self as FromStr>::from_str(value).map_err(|err| ParseModelError::from((value, err)))
	}

	/// Position in the `PerProcess < PerType < PerInstance` chain, `None` for [`DeploymentModel::PerThread`].
	pub const fn granularity(self) -> Option<u8> {
		match self {
			Self::PerProcess => Some(0),
			Self::PerType => Some(1),
			Self::PerInstance => Some(2),
			Self::PerThread => None,
		}
	}

	/// Canonical name.
	pub fn as_str(self) -> &'static str {
		self.into()
	}

	/// Returns true when a mixin deployed with `mixin` may belong to an aspect deployed with `aspect`.
	pub fn is_mixin_compatible(mixin: Self, aspect: Self) -> bool {
		match (mixin, aspect) {
			(Self::PerThread, aspect) => aspect == Self::PerThread,
			(Self::PerProcess, _) => true,
			(_, Self::PerThread) => false,
			(Self::PerType, Self::PerProcess) => true,
			(mixin, aspect) => mixin.granularity() <= aspect.granularity(),
		}
	}

	/// Model at which a mixin's owning aspect instance is resolved.
	///
	/// Only meaningful for pairs accepted by [`DeploymentModel::is_mixin_compatible`].
	pub fn related_aspect_model(mixin: Self, aspect: Self) -> Self {
		match (mixin.granularity(), aspect.granularity()) {
			(Some(m), Some(a)) if a < m => aspect,
			_ => mixin,
		}
	}
}

impl fmt::Display for DeploymentModel {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl TryFrom<String> for DeploymentModel {
	type Error = ParseModelError;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		Self::from_name(&value)
	}
}

/// Unrecognized deployment model string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown deployment model {value:?} (expected perProcess, perType, perInstance or perThread)")]
pub struct ParseModelError {
	pub value: String,
}

impl From<(&str, strum::ParseError)> for ParseModelError {
	fn from((value, _): (&str, strum::ParseError)) -> Self {
		Self { value: value.to_string() }
	}
}

/// Capability implemented by every definition that carries a deployment model.
pub trait HasDeploymentModel {
	/// The declared deployment model.
	fn deployment_model(&self) -> DeploymentModel;
}
