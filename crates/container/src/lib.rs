//! Deployment-model scoped instance containers.
//!
//! # Role
//!
//! An [`InstanceContainer`] owns the prototype of one aspect or mixin and vends instances of
//! it: one per process, per target type, per target object, or per thread. The registry keeps
//! one container per aspect and per mixin; the dispatcher asks it for the instance bound to
//! the current join point.
//!
//! # Key types
//!
//! | Type | Meaning |
//! |---|---|
//! | [`Prototype`] | implementation descriptor, factory, parameters and per-implementation metadata |
//! | [`Scope`] | runtime target type and optional target of one resolution |
//! | [`Resolved`] | an instance plus the prototype generation it was built from |
//! | [`ContainerError`] | construction failure or rejected swap |
//!
//! # Concurrency
//!
//! The current generation (prototype plus the four stores) is published through an
//! `ArcSwap`. Swapping builds a fresh generation under a container-wide lock, so a swap is
//! all-or-nothing and every cache is emptied at once.

mod container;
mod error;
mod prototype;
mod slot;
mod weak;

pub use container::{ContainerStats, DEFAULT_PRUNE_THRESHOLD, InstanceContainer, PurgeReport, Resolved, Scope};
pub use error::ContainerError;
pub use prototype::{Factory, FactoryContext, Parameters, Prototype, factory_fn};

#[cfg(test)]
mod invariants;
