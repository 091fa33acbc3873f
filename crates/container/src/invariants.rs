use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use crosscut_primitives::{DeploymentModel, Instance, Target, TypeDescriptor, TypeKey, identity_of};

use crate::{ContainerError, InstanceContainer, Prototype, Scope, factory_fn};

struct Teller;

fn counting_container(builds: Arc<AtomicUsize>) -> InstanceContainer<()> {
	let factory = factory_fn(move |_| {
		builds.fetch_add(1, Ordering::SeqCst);
		// Widens the window in which racing resolutions overlap.
		#[allow(clippy::disallowed_methods)]
		thread::sleep(Duration::from_millis(2));
		Ok(Teller)
	});
	InstanceContainer::new("teller", Prototype::new(TypeDescriptor::of::<Teller>(), factory, ()))
}

/// Invariant: concurrent first resolutions of one key MUST publish exactly one instance.
pub(crate) fn inv_single_instance_under_contention(model: DeploymentModel) {
	const THREADS: usize = 8;
	let builds = Arc::new(AtomicUsize::new(0));
	let container = counting_container(builds.clone());
	let target_type = TypeKey::named("bank::Account");
	let target: Target = Arc::new(7u32);
	let barrier = Barrier::new(THREADS);

	let addresses: Vec<usize> = thread::scope(|s| {
		let handles: Vec<_> = (0..THREADS)
			.map(|_| {
				s.spawn(|| {
					barrier.wait();
					let scope = Scope::new(&target_type, Some(&target));
					identity_of(&container.instance(model, &scope).unwrap())
				})
			})
			.collect();
		handles.into_iter().map(|h| h.join().unwrap()).collect()
	});

	assert!(addresses.windows(2).all(|w| w[0] == w[1]), "{model}: callers observed different instances");
	assert_eq!(builds.load(Ordering::SeqCst), 1, "{model}: factory ran more than once");
	assert_eq!(container.stats().constructed, 1);
}

#[cfg_attr(test, test)]
pub(crate) fn test_single_instance_under_contention() {
	for model in [DeploymentModel::PerProcess, DeploymentModel::PerType, DeploymentModel::PerInstance] {
		inv_single_instance_under_contention(model);
	}
}

/// Invariant: a failed construction MUST NOT be cached; the next resolution retries.
pub(crate) fn inv_failed_construction_is_not_cached() {
	let attempts = Arc::new(AtomicUsize::new(0));
	let counter = attempts.clone();
	let factory = factory_fn(move |_| {
		if counter.fetch_add(1, Ordering::SeqCst) == 0 {
			return Err("database unavailable".into());
		}
		Ok(Teller)
	});
	let container = InstanceContainer::new("flaky", Prototype::new(TypeDescriptor::of::<Teller>(), factory, ()));
	let target_type = TypeKey::named("bank::Account");
	let scope = Scope::of_type(&target_type);

	for model in [DeploymentModel::PerProcess, DeploymentModel::PerType] {
		attempts.store(0, Ordering::SeqCst);
		let err = container.instance(model, &scope).unwrap_err();
		assert!(matches!(err, ContainerError::Construction { .. }));
		assert_eq!(err.name(), "flaky");
		let first = container.instance(model, &scope).unwrap();
		let second = container.instance(model, &scope).unwrap();
		assert_eq!(identity_of(&first), identity_of(&second));
		assert_eq!(attempts.load(Ordering::SeqCst), 2);
	}
}

#[cfg_attr(test, test)]
pub(crate) fn test_failed_construction_is_not_cached() {
	inv_failed_construction_is_not_cached()
}

/// Invariant: a per-instance entry MUST NOT keep its target alive.
pub(crate) fn inv_weak_keys_do_not_pin_targets() {
	let container = counting_container(Arc::new(AtomicUsize::new(0)));
	let target_type = TypeKey::named("bank::Account");
	let target: Target = Arc::new(String::from("acct-1"));
	let weak = Arc::downgrade(&target);

	let instance: Instance = container.instance(DeploymentModel::PerInstance, &Scope::new(&target_type, Some(&target))).unwrap();
	drop(target);
	assert!(weak.upgrade().is_none(), "container kept the target alive");
	assert_eq!(container.stats().per_instance, 0);
	assert_eq!(container.purge().per_instance, 1);
	assert_eq!(container.per_instance_entries(), 0);
	assert!(instance.downcast_ref::<Teller>().is_some());
}

#[cfg_attr(test, test)]
pub(crate) fn test_weak_keys_do_not_pin_targets() {
	inv_weak_keys_do_not_pin_targets()
}

/// Invariant: a rejected swap MUST leave prototype and caches untouched.
pub(crate) fn inv_rejected_swap_has_no_effect() {
	let container = counting_container(Arc::new(AtomicUsize::new(0))).with_required_interfaces(["bank::Auditing"]);
	let target_type = TypeKey::named("bank::Account");
	let scope = Scope::of_type(&target_type);
	let before = container.instance(DeploymentModel::PerProcess, &scope).unwrap();

	let replacement = Prototype::new(TypeDescriptor::new("bank::PlainTeller"), factory_fn(|_| Ok(Teller)), ());
	let err = container.swap_implementation(replacement).unwrap_err();
	assert!(matches!(err, ContainerError::IncompatibleImplementation { ref interface, .. } if &**interface == "bank::Auditing"));

	assert_eq!(container.generation(), 0);
	assert_eq!(&*container.prototype().implementation.name, std::any::type_name::<Teller>());
	let after = container.instance(DeploymentModel::PerProcess, &scope).unwrap();
	assert_eq!(identity_of(&before), identity_of(&after));
}

#[cfg_attr(test, test)]
pub(crate) fn test_rejected_swap_has_no_effect() {
	inv_rejected_swap_has_no_effect()
}
