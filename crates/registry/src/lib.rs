//! Aspect, advice and mixin registry.
//!
//! # Role
//!
//! The [`AspectRegistry`] is the source of truth the dispatcher consults. It turns definitions
//! ([`AspectDefinition`] plus an [`AspectBinding`]) into dense, append-only tables of
//! [`AspectEntry`], [`AdviceDef`] and [`MixinEntry`], each aspect and mixin owning an
//! instance container. Join points are matched against advice pointcuts through a
//! [`PointcutMatcher`], and the result is memoized in a [`MatchCache`].
//!
//! # Key types
//!
//! | Type | Meaning |
//! |---|---|
//! | [`AspectRegistry`] | name/index tables, lazy loading, hot swap, advice plans |
//! | [`MethodRepository`] | sorted method table replacing reflective invocation |
//! | [`AdvicePlan`] | advice applying to one join point shape, split by kind |
//! | [`DefinitionSource`] | deferred supply of definitions, consulted on lookup misses |
//! | [`DefinitionError`] | misconfigured or missing definitions |

mod binding;
mod cache;
mod definition;
mod error;
mod matcher;
mod method;
mod registry;
mod source;

pub use binding::{AspectBinding, MixinBinding};
pub use cache::{CachePolicy, CacheStats, MatchCache, MatchKey};
pub use definition::{AdviceDefinition, AspectDefinition, MixinDefinition};
pub use error::{DefinitionError, DefinitionKind};
pub use matcher::{FnMatcher, GlobMatcher, MatchContext, PointcutMatcher};
pub use method::{AdviceFn, AdviceRepository, MethodEntry, MethodRepository, MethodRepositoryBuilder, MixinFn, MixinRepository};
pub use registry::{AdviceDef, AdvicePlan, AspectContainer, AspectEntry, AspectRegistry, MixinContainer, MixinEntry, RegistryOptions};
pub use source::{DefinitionSource, Registration};

#[cfg(test)]
mod invariants;
#[cfg(test)]
mod tests;
