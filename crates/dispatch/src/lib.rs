//! Join point dispatcher.
//!
//! Woven code reaches the runtime through three entry points on [`Dispatcher`]:
//!
//! | Entry point | Used for |
//! |---|---|
//! | [`Dispatcher::invoke`] | an advised operation; runs the whole advice plan around it |
//! | [`Dispatcher::invoke_advice`] | one advice at a known [`IndexTuple`](crosscut_primitives::IndexTuple) |
//! | [`Dispatcher::invoke_mixin`] | an introduced method of a mixin |
//!
//! Errors raised by advice or the original operation come back as [`Raised::Thrown`] and are
//! the very values that were raised. Failures of the machinery (undefined aspects, factories
//! that fail, receivers of the wrong type) come back as [`Raised::Internal`].

mod chain;
mod dispatcher;
mod error;

pub use dispatcher::Dispatcher;
pub use error::{DispatchError, Raised};

#[cfg(test)]
mod invariants;
