use std::sync::{Arc, Barrier};
use std::thread;

use crosscut_primitives::{AdviceKind, AspectIndex, DenseId, DeploymentModel};
use proptest::prelude::*;

use crate::{AdviceDefinition, AspectBinding, AspectDefinition, AspectRegistry, DefinitionError, GlobMatcher, MixinBinding, MixinDefinition, Registration};

struct Tracer;

pub(crate) fn tracer_binding() -> AspectBinding {
	AspectBinding::of::<Tracer, _>(|_| Ok(Tracer), |methods| methods.advice("trace", |_, jp| jp.proceed()))
}

pub(crate) fn tracer(name: &str) -> AspectDefinition {
	AspectDefinition::new(name, "tracer").with_advice(AdviceDefinition::new("trace", AdviceKind::Around, "bank::*", "trace"))
}

fn registry() -> AspectRegistry {
	AspectRegistry::new(Arc::new(GlobMatcher::new()))
}

/// Invariant: an assigned index MUST keep naming the same aspect after further registrations.
pub(crate) fn inv_indices_are_stable_across_growth(names: &[String]) {
	let registry = registry();
	let mut assigned: Vec<(String, AspectIndex)> = Vec::new();
	for name in names {
		let index = registry.register_aspect(tracer(name), tracer_binding()).unwrap();
		if let Some((_, first)) = assigned.iter().find(|(known, _)| known == name) {
			assert_eq!(index, *first, "re-registration of `{name}` moved its index");
		} else {
			assert_eq!(index.as_usize(), assigned.len(), "indices must be dense");
			assigned.push((name.clone(), index));
		}
		for (known, index) in &assigned {
			assert_eq!(registry.aspect_index(known).unwrap(), *index);
			assert_eq!(&*registry.aspect(*index).unwrap().name, known.as_str());
		}
	}
	assert_eq!(registry.len(), assigned.len());
}

proptest! {
	#[test]
	fn test_indices_are_stable_across_growth(names in prop::collection::vec("[a-d]{1,2}", 1..24)) {
		inv_indices_are_stable_across_growth(&names);
	}
}

/// Invariant: concurrent registrations MUST all land, each under exactly one index.
pub(crate) fn inv_concurrent_registration_is_linearizable() {
	const THREADS: usize = 8;
	const PER_THREAD: usize = 16;
	let registry = registry();
	let barrier = Barrier::new(THREADS);

	thread::scope(|s| {
		for t in 0..THREADS {
			let registry = &registry;
			let barrier = &barrier;
			s.spawn(move || {
				barrier.wait();
				for i in 0..PER_THREAD {
					registry.register_aspect(tracer(&format!("aspect-{t}-{i}")), tracer_binding()).unwrap();
					registry.register_aspect(tracer(&format!("shared-{i}")), tracer_binding()).unwrap();
				}
			});
		}
	});

	let expected = THREADS * PER_THREAD + PER_THREAD;
	assert_eq!(registry.len(), expected);
	let mut seen = vec![false; expected];
	for entry in registry.aspects() {
		assert_eq!(registry.aspect_index(&entry.name).unwrap(), entry.index);
		assert_eq!(entry.advices.len(), 1);
		assert_eq!(entry.advices[0].tuple.aspect, entry.index);
		assert!(!std::mem::replace(&mut seen[entry.index.as_usize()], true));
	}
}

#[cfg_attr(test, test)]
pub(crate) fn test_concurrent_registration_is_linearizable() {
	inv_concurrent_registration_is_linearizable()
}

struct Tracked;

/// Invariant: a mixin finer-grained than its aspect MUST be rejected before anything is published.
pub(crate) fn inv_incompatible_mixin_is_rejected() {
	let registry = registry();
	let definition = tracer("audit")
		.with_model(DeploymentModel::PerProcess)
		.with_mixin(MixinDefinition::new("tracked", "tracked").with_model(DeploymentModel::PerInstance));
	let mixin = MixinBinding::of::<Tracked, _>(|_| Ok(Tracked), |methods| methods);
	let err = registry.register(Registration::new(definition, tracer_binding()).with_mixin("tracked", mixin)).unwrap_err();

	assert!(matches!(
		err,
		DefinitionError::IncompatibleMixinModel {
			mixin_model: DeploymentModel::PerInstance,
			aspect_model: DeploymentModel::PerProcess,
			..
		}
	));
	assert!(err.to_string().contains("tracked") && err.to_string().contains("audit"));
	assert!(registry.is_empty());
	assert!(registry.mixin_index("tracked").is_err());
}

#[cfg_attr(test, test)]
pub(crate) fn test_incompatible_mixin_is_rejected() {
	inv_incompatible_mixin_is_rejected()
}
