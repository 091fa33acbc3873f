//! Pointcut matching seam.
//!
//! Expression grammars live outside this crate. The registry only needs a pure predicate over
//! an expression and a join point shape, which it memoizes per `(type, member, kind)`.

use std::error::Error;
use std::fmt;

use crosscut_cflow::CflowMarker;
use crosscut_primitives::{JoinPointKind, MemberSignature, TypeKey};
use globset::{Glob, GlobMatcher as CompiledGlob};
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use tracing::warn;

/// Join point shape a pointcut is matched against.
#[derive(Debug, Clone, Copy)]
pub struct MatchContext<'a> {
	pub kind: JoinPointKind,
	/// Type declaring the member.
	pub declaring: &'a TypeKey,
	/// Runtime type of the target.
	pub target_type: &'a TypeKey,
	pub member: &'a MemberSignature,
}

/// Evaluates pointcut expressions. Must be pure: results are cached.
pub trait PointcutMatcher: Send + Sync {
	fn matches(&self, expression: &str, ctx: &MatchContext<'_>) -> bool;

	/// Whether an entered control flow satisfies a cflow expression.
	///
	/// Matches the marker's join point shape exactly as [`PointcutMatcher::matches`] matched it
	/// when the flow was opened.
	fn matches_marker(&self, expression: &str, marker: &CflowMarker) -> bool {
		self.matches(
			expression,
			&MatchContext {
				kind: marker.kind(),
				declaring: marker.declaring_type(),
				target_type: marker.target_type(),
				member: marker.signature(),
			},
		)
	}

	/// Whether a raised error satisfies an after-throwing filter.
	fn matches_throwable(&self, expression: &str, error: &(dyn Error + 'static)) -> bool {
		let _ = (expression, error);
		true
	}
}

/// Matches `Type::member` text against glob patterns.
///
/// A pattern matches when it accepts either `target_type::member` or `declaring::member`, so
/// `bank::*::withdraw` and `bank::Account::*` both work. Throwing filters are matched against
/// the error's message. Invalid patterns never match.
#[derive(Default)]
pub struct GlobMatcher {
	compiled: RwLock<FxHashMap<Box<str>, Option<CompiledGlob>>>,
}

impl GlobMatcher {
	pub fn new() -> Self {
		Self::default()
	}

	fn with_glob<R>(&self, pattern: &str, default: R, f: impl FnOnce(&CompiledGlob) -> R) -> R {
		if let Some(entry) = self.compiled.read().get(pattern) {
			return entry.as_ref().map_or(default, f);
		}
		let compiled = match Glob::new(pattern) {
			Ok(glob) => Some(glob.compile_matcher()),
			Err(err) => {
				warn!(pattern, error = %err, "pointcut: invalid glob");
				None
			}
		};
		let result = compiled.as_ref().map_or(default, f);
		self.compiled.write().insert(pattern.into(), compiled);
		result
	}
}

impl PointcutMatcher for GlobMatcher {
	fn matches(&self, expression: &str, ctx: &MatchContext<'_>) -> bool {
		let by_target = format!("{}::{}", ctx.target_type, ctx.member.name());
		self.with_glob(expression, false, |glob| {
			glob.is_match(&by_target) || (ctx.declaring != ctx.target_type && glob.is_match(format!("{}::{}", ctx.declaring, ctx.member.name())))
		})
	}

	fn matches_throwable(&self, expression: &str, error: &(dyn Error + 'static)) -> bool {
		let message = error.to_string();
		self.with_glob(expression, false, |glob| glob.is_match(&message))
	}
}

impl fmt::Debug for GlobMatcher {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("GlobMatcher").field("compiled", &self.compiled.read().len()).finish()
	}
}

type MatchFn = Box<dyn Fn(&str, &MatchContext<'_>) -> bool + Send + Sync>;
type ThrowableFn = Box<dyn Fn(&str, &(dyn Error + 'static)) -> bool + Send + Sync>;

/// Adapts closures to [`PointcutMatcher`].
pub struct FnMatcher {
	matches: MatchFn,
	throwable: Option<ThrowableFn>,
}

impl FnMatcher {
	pub fn new(matches: impl Fn(&str, &MatchContext<'_>) -> bool + Send + Sync + 'static) -> Self {
		Self {
			matches: Box::new(matches),
			throwable: None,
		}
	}

	pub fn with_throwable(mut self, throwable: impl Fn(&str, &(dyn Error + 'static)) -> bool + Send + Sync + 'static) -> Self {
		self.throwable = Some(Box::new(throwable));
		self
	}
}

impl PointcutMatcher for FnMatcher {
	fn matches(&self, expression: &str, ctx: &MatchContext<'_>) -> bool {
		(self.matches)(expression, ctx)
	}

	fn matches_throwable(&self, expression: &str, error: &(dyn Error + 'static)) -> bool {
		self.throwable.as_ref().is_none_or(|f| f(expression, error))
	}
}

impl fmt::Debug for FnMatcher {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("FnMatcher").finish_non_exhaustive()
	}
}
