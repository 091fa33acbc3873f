//! Runtime configuration.
//!
//! ```toml
//! [match_cache]
//! policy = "bounded"   # or "unbounded" (default)
//! capacity = 4096
//!
//! [instances]
//! prune_threshold = 256
//!
//! [cflow]
//! enabled = true
//! ```
//!
//! Every field is optional. Unknown keys are rejected.

use std::num::NonZeroUsize;
use std::path::Path;

use crosscut_container::DEFAULT_PRUNE_THRESHOLD;
use crosscut_registry::{CachePolicy, RegistryOptions};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::{ConfigError, Result, read};

/// Capacity used when `policy = "bounded"` is given without one.
pub const DEFAULT_CACHE_CAPACITY: usize = 4096;

/// Parsed runtime configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SystemConfig {
	pub match_cache: MatchCacheConfig,
	pub instances: InstanceConfig,
	pub cflow: CflowConfig,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CachePolicyKind {
	#[default]
	Unbounded,
	Bounded,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MatchCacheConfig {
	pub policy: CachePolicyKind,
	pub capacity: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InstanceConfig {
	/// Insertions into a per-instance or per-thread store between prunes of dead entries.
	pub prune_threshold: usize,
}

impl Default for InstanceConfig {
	fn default() -> Self {
		Self {
			prune_threshold: DEFAULT_PRUNE_THRESHOLD,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CflowConfig {
	/// Whether join points opening a registered control flow are tracked.
	pub enabled: bool,
}

impl Default for CflowConfig {
	fn default() -> Self {
		Self { enabled: true }
	}
}

impl SystemConfig {
	/// Parse a TOML string into a validated [`SystemConfig`].
	pub fn parse(input: &str) -> Result<Self> {
		let config: Self = toml::from_str(input)?;
		config.cache_policy()?;
		Ok(config)
	}

	/// Load configuration from a file.
	pub fn load(path: impl AsRef<Path>) -> Result<Self> {
		Self::parse(&read(path.as_ref())?)
	}

	pub fn cache_policy(&self) -> Result<CachePolicy> {
		match self.match_cache.policy {
			CachePolicyKind::Unbounded => Ok(CachePolicy::Unbounded),
			CachePolicyKind::Bounded => {
				let capacity = self.match_cache.capacity.unwrap_or(DEFAULT_CACHE_CAPACITY);
				NonZeroUsize::new(capacity).map(CachePolicy::Bounded).ok_or(ConfigError::InvalidCapacity)
			}
		}
	}

	/// Registry options for the system `id`.
	pub fn registry_options(&self, id: Uuid) -> Result<RegistryOptions> {
		Ok(RegistryOptions {
			cache_policy: self.cache_policy()?,
			prune_threshold: self.instances.prune_threshold.max(1),
			system: Some(id),
		})
	}
}
