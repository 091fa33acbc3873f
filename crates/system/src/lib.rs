//! Aspect systems.
//!
//! # Role
//!
//! An [`AspectSystem`] bundles everything one deployment of aspects needs: the registry of
//! definitions and instance containers, the control-flow tracker, and the dispatcher that
//! woven code calls into. Systems are created from a [`SystemConfig`] and kept in an explicit
//! [`SystemRegistry`] keyed by id.
//!
//! Definitions come either from code ([`AspectSystem::deploy`]) or from a [`Manifest`] whose
//! implementation names a [`Catalog`] resolves to bindings. A manifest may be deployed eagerly
//! or attached as a lazy [`ManifestSource`] consulted on the first lookup of each name.
//!
//! # Key types
//!
//! | Type | Meaning |
//! |---|---|
//! | [`AspectSystem`] | registry + tracker + dispatcher for one deployment |
//! | [`SystemRegistry`] | live systems by [`uuid::Uuid`] |
//! | [`SystemConfig`] | match cache policy, prune threshold, cflow switch |
//! | [`Manifest`] | `[[aspect]]` definitions loaded from TOML |
//! | [`Catalog`] | implementation name to binding |

mod catalog;
mod config;
mod error;
mod manifest;
mod source;
mod system;
mod systems;

pub use catalog::Catalog;
pub use config::{CachePolicyKind, CflowConfig, DEFAULT_CACHE_CAPACITY, InstanceConfig, MatchCacheConfig, SystemConfig};
pub use crosscut_cflow as cflow;
pub use crosscut_container as container;
pub use crosscut_dispatch as dispatch;
pub use crosscut_primitives as primitives;
pub use crosscut_registry as registry;
pub use error::{ConfigError, Result};
pub use manifest::Manifest;
pub use source::ManifestSource;
pub use system::AspectSystem;
pub use systems::SystemRegistry;
