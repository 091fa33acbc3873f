//! Join point dispatch.
//!
//! # Role
//!
//! The [`Dispatcher`] is what woven code calls into. It asks the registry for the advice plan of
//! a join point, resolves every advice instance through its aspect's container under the
//! advice's deployment model, and threads the call through before, around and after advice.
//!
//! # Invariants
//!
//! - Around advice nests in declaration order with the original operation innermost.
//!   - Enforced in: [`Dispatcher::invoke`] via [`AroundChain`].
//!   - Tested by: `invariants::test_around_advice_nests_in_declaration_order`.
//!   - Failure symptom: a transaction aspect commits before the security check runs.
//! - Errors raised by advice or the original operation reach the caller unchanged.
//!   - Enforced in: [`Raised::classify`].
//!   - Tested by: `invariants::test_advice_errors_reach_the_caller_unchanged`.
//!   - Failure symptom: callers matching on their own error types stop matching once advised.
//! - A machinery failure inside the chain is reported even if an advice swallows it.
//!   - Enforced in: [`AroundChain`] fault recording, checked after the chain returns.
//!   - Tested by: `invariants::test_internal_faults_are_not_maskable`.
//!   - Failure symptom: a missing aspect silently turns into a default return value.

use std::error::Error;
use std::sync::Arc;

use crosscut_cflow::{CflowMarker, CflowTracker};
use crosscut_container::Scope;
use crosscut_primitives::{
	AdviceKind, Args, Continuation, Detached, IndexTuple, Instance, JoinPoint, JoinPointSite, MixinCall, MixinIndex, Rtti, Target, Throwable, TypeKey, Value, unit,
};
use crosscut_registry::{AdviceDef, AdviceFn, AspectRegistry, DefinitionKind, MethodEntry, MixinEntry};
use tracing::{trace, trace_span};

use crate::chain::AroundChain;
use crate::error::{DispatchError, Raised};

/// Executes advice chains for join points.
pub struct Dispatcher {
	registry: Arc<AspectRegistry>,
	tracker: Arc<CflowTracker>,
	track_cflow: bool,
}

impl Dispatcher {
	pub fn new(registry: Arc<AspectRegistry>, tracker: Arc<CflowTracker>) -> Self {
		Self {
			registry,
			tracker,
			track_cflow: true,
		}
	}

	/// Whether join points that open a registered cflow enter the tracker. Defaults to true.
	pub fn with_cflow_tracking(mut self, enabled: bool) -> Self {
		self.track_cflow = enabled;
		self
	}

	pub fn registry(&self) -> &Arc<AspectRegistry> {
		&self.registry
	}

	pub fn tracker(&self) -> &Arc<CflowTracker> {
		&self.tracker
	}

	/// Runs `original` at `site` wrapped in every applicable advice.
	///
	/// Order: before advice, then the around chain with `original` innermost, then
	/// after-returning or after-throwing advice, then after advice. An error from a before advice
	/// stops the join point before `original` runs. An error from an after advice replaces the
	/// outcome. Within each kind advice runs in declaration order.
	pub fn invoke<F>(&self, site: &JoinPointSite, target_type: &TypeKey, target: Option<&Target>, args: &mut Args, mut original: F) -> Result<Value, Raised>
	where
		F: FnMut(&mut Args) -> Result<Value, Throwable>,
	{
		let plan = self.registry.advice_plan(site, target_type);
		if plan.is_empty() {
			return original(args).map_err(Raised::classify);
		}
		let _span = trace_span!("dispatch.invoke", %site, %target_type, advices = plan.len()).entered();
		let _flow = (self.track_cflow && plan.enters_cflow).then(|| self.tracker.enter_scoped(CflowMarker::for_join_point(site, target_type)));

		for advice in &plan.before {
			self.run_detached(advice, site, target_type, target, args, Rtti::Pending)?;
		}

		let mut chain = AroundChain::new(self, &plan.around, original);
		let outcome = chain.proceed(site, target_type, target, args);
		if let Some(fault) = chain.into_fault() {
			return Err(Raised::Internal(fault));
		}
		let mut outcome = match outcome.map_err(Raised::classify) {
			Ok(value) => Ok(value),
			Err(Raised::Thrown(err)) => Err(err),
			Err(internal) => return Err(internal),
		};

		let result = match &outcome {
			Ok(value) => self.run_all(plan.after_returning.iter(), site, target_type, target, args, Rtti::Returned(value)),
			Err(err) => {
				let err: &(dyn Error + Send + Sync + 'static) = &**err;
				let applicable = plan.after_throwing.iter().filter(|advice| self.throwing_matches(advice, err));
				self.run_all(applicable, site, target_type, target, args, Rtti::Thrown(err))
			}
		};
		settle(&mut outcome, result)?;

		let result = match &outcome {
			Ok(value) => self.run_all(plan.after.iter(), site, target_type, target, args, Rtti::Returned(value)),
			Err(err) => self.run_all(plan.after.iter(), site, target_type, target, args, Rtti::Thrown(&**err)),
		};
		settle(&mut outcome, result)?;

		outcome.map_err(Raised::Thrown)
	}

	/// Invokes the advice at `tuple` directly, as woven code does for a resolved call site.
	///
	/// Cflow gating still applies: a gated around advice whose flow is inactive just proceeds,
	/// any other gated advice is skipped.
	pub fn invoke_advice(&self, tuple: IndexTuple, jp: &mut JoinPoint<'_>) -> Result<Value, Raised> {
		let advice = self.registry.advice(tuple)?;
		if !self.gate_open(&advice) {
			return match advice.kind {
				AdviceKind::Around => jp.proceed().map_err(Raised::classify),
				_ => Ok(unit()),
			};
		}
		let target_type = jp.target_type().clone();
		let target = jp.target().cloned();
		let (instance, call) = self.bind_advice(&advice, &target_type, target.as_ref(), "invoke_advice")?;
		trace!(aspect = %advice.aspect, advice = %advice.name, "dispatch.invoke_advice");
		call(&instance, jp).map_err(Raised::classify)
	}

	/// Calls introduced method `member` of mixin `mixin` on behalf of `target`.
	///
	/// The owning aspect instance is resolved first, at the coarser of the two deployment models,
	/// and bound to both the mixin's construction and the call.
	pub fn invoke_mixin(&self, mixin: MixinIndex, member: &str, target_type: &TypeKey, target: Option<&Target>, args: &mut Args) -> Result<Value, Raised> {
		let entry = self.registry.mixin(mixin)?;
		self.call_mixin(&entry, member, target_type, target, args)
	}

	/// [`Dispatcher::invoke_mixin`] by mixin name.
	pub fn invoke_mixin_by_name(&self, mixin: &str, member: &str, target_type: &TypeKey, target: Option<&Target>, args: &mut Args) -> Result<Value, Raised> {
		let entry = self.registry.mixin_by_name(mixin)?;
		self.call_mixin(&entry, member, target_type, target, args)
	}

	fn call_mixin(&self, entry: &MixinEntry, member: &str, target_type: &TypeKey, target: Option<&Target>, args: &mut Args) -> Result<Value, Raised> {
		let scope = Scope::new(target_type, target);
		let aspect = self.registry.aspect(entry.aspect)?;
		let related = aspect.container.resolve(entry.related_model(), &scope, None)?;
		let resolved = entry.container.resolve(entry.deployment_model, &scope, Some(&related.instance))?;
		let (_, method) = resolved.prototype.methods.resolve(member).ok_or_else(|| DispatchError::UnknownMember {
			kind: DefinitionKind::Mixin,
			name: entry.name.clone(),
			member: member.to_string(),
			operation: "invoke_mixin",
		})?;
		check_receiver(method, &resolved.instance, DefinitionKind::Mixin, &entry.name, "invoke_mixin")?;
		trace!(mixin = %entry.name, member, aspect = %entry.aspect_name, generation = resolved.generation, "dispatch.invoke_mixin");
		let mut call = MixinCall {
			target_type,
			target,
			args,
			aspect: Some(&related.instance),
		};
		(method.call)(&resolved.instance, &mut call).map_err(Raised::classify)
	}

	/// False when `advice` is gated by a control flow the current thread is not inside.
	pub(crate) fn gate_open(&self, advice: &AdviceDef) -> bool {
		advice.cflow.as_deref().is_none_or(|expression| self.registry.cflow_active(expression, &self.tracker))
	}

	fn throwing_matches(&self, advice: &AdviceDef, err: &(dyn Error + 'static)) -> bool {
		advice
			.throwing
			.as_deref()
			.is_none_or(|expression| self.registry.matcher().matches_throwable(expression, err))
	}

	/// Resolves the instance `advice` runs on and its method, from the same implementation
	/// generation.
	pub(crate) fn bind_advice(&self, advice: &AdviceDef, target_type: &TypeKey, target: Option<&Target>, operation: &'static str) -> Result<(Instance, AdviceFn), DispatchError> {
		let aspect = self.registry.aspect(advice.tuple.aspect)?;
		let resolved = aspect
			.container
			.resolve(advice.deployment_model, &Scope::new(target_type, target), None)?;
		let entry = resolved.prototype.methods.get(advice.tuple.member).ok_or_else(|| DispatchError::UnknownMember {
			kind: DefinitionKind::Advice,
			name: advice.name.clone(),
			member: advice.method.canonical(),
			operation,
		})?;
		check_receiver(entry, &resolved.instance, DefinitionKind::Aspect, &aspect.name, operation)?;
		let call = entry.call.clone();
		Ok((resolved.instance, call))
	}

	fn run_detached(&self, advice: &AdviceDef, site: &JoinPointSite, target_type: &TypeKey, target: Option<&Target>, args: &mut Args, rtti: Rtti<'_>) -> Result<(), Raised> {
		if !self.gate_open(advice) {
			return Ok(());
		}
		let (instance, call) = self.bind_advice(advice, target_type, target, "invoke")?;
		trace!(aspect = %advice.aspect, advice = %advice.name, kind = ?advice.kind, "dispatch.advice");
		let mut detached = Detached;
		let mut jp = JoinPoint::new(site, target_type, target, args, &mut detached).with_rtti(rtti);
		call(&instance, &mut jp).map(drop).map_err(Raised::classify)
	}

	fn run_all<'p>(
		&self,
		advices: impl Iterator<Item = &'p Arc<AdviceDef>>,
		site: &JoinPointSite,
		target_type: &TypeKey,
		target: Option<&Target>,
		args: &mut Args,
		rtti: Rtti<'_>,
	) -> Result<(), Raised> {
		for advice in advices {
			self.run_detached(advice, site, target_type, target, args, rtti)?;
		}
		Ok(())
	}
}

impl std::fmt::Debug for Dispatcher {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Dispatcher")
			.field("registry", &self.registry)
			.field("track_cflow", &self.track_cflow)
			.finish_non_exhaustive()
	}
}

fn check_receiver<F>(entry: &MethodEntry<F>, instance: &Instance, kind: DefinitionKind, name: &Arc<str>, operation: &'static str) -> Result<(), DispatchError> {
	if entry.accepts(instance) {
		return Ok(());
	}
	Err(DispatchError::ReceiverMismatch {
		kind,
		name: name.clone(),
		expected: entry.receiver_name,
		operation,
	})
}

/// Folds the result of an after phase into the outcome. A raised error replaces it; an internal
/// failure aborts the join point.
fn settle(outcome: &mut Result<Value, Throwable>, result: Result<(), Raised>) -> Result<(), Raised> {
	match result {
		Ok(()) => Ok(()),
		Err(Raised::Thrown(err)) => {
			*outcome = Err(err);
			Ok(())
		}
		Err(internal) => Err(internal),
	}
}
