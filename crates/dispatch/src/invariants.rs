use std::sync::{Arc, Mutex};

use crosscut_cflow::CflowTracker;
use crosscut_primitives::{AdviceKind, Args, JoinPointSite, Throwable, TypeKey, Value, unit};
use crosscut_registry::{AdviceDefinition, AspectBinding, AspectDefinition, AspectRegistry, GlobMatcher};
use pretty_assertions::assert_eq;

use crate::{Dispatcher, Raised};

/// Shared event log written by test aspects and original operations.
#[derive(Clone, Default)]
pub(crate) struct Log(Arc<Mutex<Vec<String>>>);

impl Log {
	pub(crate) fn push(&self, event: impl Into<String>) {
		self.0.lock().unwrap().push(event.into());
	}

	pub(crate) fn take(&self) -> Vec<String> {
		std::mem::take(&mut *self.0.lock().unwrap())
	}
}

#[derive(Debug, thiserror::Error)]
#[error("refused by {0}")]
pub(crate) struct Refused(pub String);

#[derive(Debug, PartialEq, thiserror::Error)]
#[error("overdraft of {0}")]
pub(crate) struct Overdraft(pub u64);

pub(crate) struct Recorder {
	name: String,
	log: Log,
}

/// Aspect whose advice methods record what they see in `log`.
pub(crate) fn recorder(log: &Log) -> AspectBinding {
	let log = log.clone();
	AspectBinding::of::<Recorder, _>(
		move |ctx| {
			Ok(Recorder {
				name: ctx.name.to_string(),
				log: log.clone(),
			})
		},
		|methods| {
			methods
				.advice("around", |r, jp| {
					r.log.push(format!("{}>", r.name));
					let out = jp.proceed();
					r.log.push(format!("<{}", r.name));
					out
				})
				.advice("before", |r, _| {
					r.log.push(format!("before {}", r.name));
					Ok(unit())
				})
				.advice("returned", |r, jp| {
					let value = jp.returned().and_then(|value| value.downcast_ref::<u64>()).copied();
					r.log.push(format!("returned {value:?}"));
					Ok(unit())
				})
				.advice("threw", |r, jp| {
					let err = jp.thrown().map(ToString::to_string).unwrap_or_default();
					r.log.push(format!("threw {err}"));
					Ok(unit())
				})
				.advice("finally", |r, jp| {
					r.log.push(if jp.returned().is_some() { "finally ok" } else { "finally err" });
					Ok(unit())
				})
				.advice("refuse", |r, _| Err(Box::new(Refused(r.name.clone())) as Throwable))
				.advice("skip", |_, _| Ok(Box::new(0u64) as Value))
				.advice("twice", |_, jp| {
					jp.proceed()?;
					jp.proceed()
				})
				.advice("swallow", |r, jp| {
					if let Err(err) = jp.proceed() {
						r.log.push(format!("swallowed {err}"));
					}
					Ok(Box::new(7u64) as Value)
				})
		},
	)
}

/// Aspect `name` with one advice per `(method, kind)` on `pointcut`.
pub(crate) fn aspect(name: &str, pointcut: &str, advices: &[(&str, AdviceKind)]) -> AspectDefinition {
	advices.iter().fold(AspectDefinition::new(name, "recorder"), |definition, &(method, kind)| {
		definition.with_advice(AdviceDefinition::new(method, kind, pointcut, method))
	})
}

pub(crate) fn dispatcher() -> Dispatcher {
	let registry = AspectRegistry::new(Arc::new(GlobMatcher::new()));
	Dispatcher::new(Arc::new(registry), Arc::new(CflowTracker::new()))
}

pub(crate) fn withdraw() -> (JoinPointSite, TypeKey) {
	(JoinPointSite::execution("bank::Account", "withdraw"), TypeKey::named("bank::Account"))
}

/// Original operation that logs and returns `5u64`.
pub(crate) fn original(log: &Log) -> impl FnMut(&mut Args) -> Result<Value, Throwable> + '_ {
	move |_| {
		log.push("original");
		Ok(Box::new(5u64) as Value)
	}
}

/// Invariant: around advice A, B, C declared in that order MUST run as A(B(C(original))).
pub(crate) fn inv_around_advice_nests_in_declaration_order() {
	let log = Log::default();
	let dispatcher = dispatcher();
	for name in ["a", "b", "c"] {
		dispatcher
			.registry()
			.register_aspect(aspect(name, "bank::Account::withdraw", &[("around", AdviceKind::Around)]), recorder(&log))
			.unwrap();
	}
	let (site, ty) = withdraw();

	let out = dispatcher.invoke(&site, &ty, None, &mut Args::new(), original(&log)).unwrap();
	assert_eq!(out.downcast_ref::<u64>(), Some(&5));
	assert_eq!(log.take(), ["a>", "b>", "c>", "original", "<c", "<b", "<a"]);
}

#[cfg_attr(test, test)]
pub(crate) fn test_around_advice_nests_in_declaration_order() {
	inv_around_advice_nests_in_declaration_order()
}

/// Invariant: an error raised under advice MUST reach the caller as the same value, not wrapped.
pub(crate) fn inv_advice_errors_reach_the_caller_unchanged() {
	let log = Log::default();
	let dispatcher = dispatcher();
	dispatcher
		.registry()
		.register_aspect(aspect("wrap", "bank::*", &[("around", AdviceKind::Around)]), recorder(&log))
		.unwrap();
	let (site, ty) = withdraw();

	let raised = dispatcher
		.invoke(&site, &ty, None, &mut Args::new(), |_| Err(Box::new(Overdraft(12)) as Throwable))
		.unwrap_err();
	let err = match raised {
		Raised::Thrown(err) => err,
		other => panic!("expected a thrown error, got {other:?}"),
	};
	assert_eq!(err.downcast_ref::<Overdraft>(), Some(&Overdraft(12)));
	assert_eq!(err.to_string(), "overdraft of 12");

	dispatcher
		.registry()
		.register_aspect(aspect("guard", "bank::*", &[("refuse", AdviceKind::Around)]), recorder(&log))
		.unwrap();
	let raised = dispatcher.invoke(&site, &ty, None, &mut Args::new(), original(&log)).unwrap_err();
	let refused = raised.thrown().and_then(|err| err.downcast_ref::<Refused>()).map(|err| err.0.clone());
	assert_eq!(refused.as_deref(), Some("guard"));
}

#[cfg_attr(test, test)]
pub(crate) fn test_advice_errors_reach_the_caller_unchanged() {
	inv_advice_errors_reach_the_caller_unchanged()
}

/// Invariant: a machinery failure under an advice that swallows errors MUST still reach the caller.
pub(crate) fn inv_internal_faults_are_not_maskable() {
	let log = Log::default();
	let dispatcher = dispatcher();
	let registry = dispatcher.registry();
	registry
		.register_aspect(aspect("outer", "bank::*", &[("swallow", AdviceKind::Around)]), recorder(&log))
		.unwrap();
	let broken = AspectBinding::of::<Recorder, _>(|_| Err("no ledger configured".into()), |methods| methods.advice("around", |_, jp| jp.proceed()));
	registry
		.register_aspect(aspect("broken", "bank::*", &[("around", AdviceKind::Around)]), broken)
		.unwrap();
	let (site, ty) = withdraw();

	let raised = dispatcher.invoke(&site, &ty, None, &mut Args::new(), original(&log)).unwrap_err();
	assert!(raised.is_internal(), "{raised:?}");
	let message = raised.to_string();
	assert!(message.contains("broken") && message.contains("no ledger configured"), "{message}");

	let events = log.take();
	assert!(!events.contains(&"original".to_string()));
	assert!(events.iter().any(|event| event.starts_with("swallowed dispatch aborted")), "{events:?}");
}

#[cfg_attr(test, test)]
pub(crate) fn test_internal_faults_are_not_maskable() {
	inv_internal_faults_are_not_maskable()
}
