use std::num::NonZeroUsize;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crosscut_cflow::{CflowMarker, CflowTracker};
use crosscut_container::Scope;
use crosscut_primitives::{
	AdviceKind, AspectIndex, DeploymentModel, InterfaceDescriptor, JoinPointKind, JoinPointSite, MemberIndex, MemberSignature, MixinIndex, Target, TypeDescriptor, TypeKey, unit,
};
use pretty_assertions::assert_eq;
use rstest::rstest;

use super::*;
use crate::invariants::{tracer, tracer_binding};

struct Auditor {
	level: String,
}

struct StrictAuditor;

fn auditor_binding() -> AspectBinding {
	AspectBinding::of::<Auditor, _>(
		|ctx| {
			Ok(Auditor {
				level: ctx.parameter("level").unwrap_or("normal").to_string(),
			})
		},
		|methods| {
			methods
				.advice("log", |_, jp| jp.proceed())
				.advice("check", |_, _| Ok(unit()))
				.advice(MemberSignature::new("alarm").with_params(["Error"]), |_, _| Ok(unit()))
		},
	)
}

fn audit_definition() -> AspectDefinition {
	AspectDefinition::new("audit", "auditor")
		.with_model(DeploymentModel::PerType)
		.with_parameter("level", "strict")
		.with_advice(AdviceDefinition::new("log", AdviceKind::Around, "bank::Account::*", "log"))
		.with_advice(AdviceDefinition::new("check", AdviceKind::Before, "bank::Account::withdraw", "check()"))
		.with_advice(AdviceDefinition::new("alarm", AdviceKind::AfterThrowing, "bank::*::withdraw", "alarm(Error)").with_throwing("*overdraft*"))
		.with_advice(AdviceDefinition::new("teller", AdviceKind::Around, "bank::Vault::*", "log").with_cflow("bank::Teller::*"))
}

struct Tracked;

fn tracked_binding() -> MixinBinding {
	MixinBinding::of::<Tracked, _>(|_| Ok(Tracked), |methods| methods.method("touch", |_, _| Ok(unit())))
		.with_descriptor(TypeDescriptor::new("bank::TrackedImpl").implementing(Arc::new(InterfaceDescriptor::new("bank::Tracked"))))
}

fn registry() -> AspectRegistry {
	AspectRegistry::new(Arc::new(GlobMatcher::new()))
}

fn withdraw() -> JoinPointSite {
	JoinPointSite::execution("bank::Account", "withdraw")
}

#[test]
fn register_assigns_tuples_from_sorted_methods() {
	let registry = registry();
	let index = registry.register_aspect(audit_definition(), auditor_binding()).unwrap();
	assert_eq!(index, AspectIndex::new(0));

	let entry = registry.aspect(index).unwrap();
	assert_eq!(entry.deployment_model, DeploymentModel::PerType);
	assert_eq!(entry.advices.len(), 4);

	// alarm(Error) < check() < log()
	assert_eq!(registry.advice_tuple("audit", "alarm").unwrap().member, MemberIndex::new(0));
	assert_eq!(registry.advice_tuple("audit", "check").unwrap().member, MemberIndex::new(1));
	let log = registry.advice_tuple("audit", "log").unwrap();
	assert_eq!(log.member, MemberIndex::new(2));
	assert_eq!(registry.advice_tuple("audit", "teller").unwrap(), log);
	assert_eq!(&*registry.advice(log).unwrap().name, "log");

	let err = registry.advice_tuple("audit", "missing").unwrap_err();
	assert!(matches!(err, DefinitionError::NotDefined { kind: DefinitionKind::Advice, .. }));
}

#[test]
fn parameters_reach_the_factory() {
	let registry = registry();
	registry.register_aspect(audit_definition(), auditor_binding()).unwrap();
	let entry = registry.aspect_by_name("audit").unwrap();
	let ty = TypeKey::named("bank::Account");
	let instance = entry.container.instance(entry.deployment_model, &Scope::of_type(&ty)).unwrap();
	assert_eq!(instance.downcast_ref::<Auditor>().unwrap().level, "strict");
}

#[test]
fn re_registration_keeps_the_first_definition() {
	let registry = registry();
	let first = registry.register_aspect(audit_definition(), auditor_binding()).unwrap();
	let again = registry.register_aspect(tracer("audit"), tracer_binding()).unwrap();
	assert_eq!(first, again);
	assert_eq!(registry.len(), 1);
	assert_eq!(registry.aspect(first).unwrap().advices.len(), 4);
}

#[rstest]
#[case(AdviceDefinition::new("log", AdviceKind::Around, "bank::*", "nope"), "nope")]
#[case(AdviceDefinition::new("log", AdviceKind::Around, "  ", "log"), "no pointcut")]
#[case(AdviceDefinition::new("log", AdviceKind::Around, "bank::*", "log").with_model(DeploymentModel::PerThread), "")]
fn advice_validation(#[case] advice: AdviceDefinition, #[case] needle: &str) {
	let registry = registry();
	let result = registry.register_aspect(AspectDefinition::new("a", "auditor").with_advice(advice), auditor_binding());
	if needle.is_empty() {
		let entry = registry.aspect(result.unwrap()).unwrap();
		assert_eq!(entry.advices[0].deployment_model, DeploymentModel::PerThread);
		assert_eq!(entry.deployment_model, DeploymentModel::PerProcess);
	} else {
		let err = result.unwrap_err();
		assert!(err.to_string().contains(needle), "{err}");
		assert!(registry.is_empty());
	}
}

#[test]
fn mixins_register_with_their_aspect() {
	let registry = registry();
	let definition = audit_definition().with_mixin(
		MixinDefinition::new("tracked", "tracked")
			.with_interface("bank::Tracked")
			.with_pointcut("bank::Account"),
	);
	registry.register(Registration::new(definition, auditor_binding()).with_mixin("tracked", tracked_binding())).unwrap();

	let index = registry.mixin_index("tracked").unwrap();
	assert_eq!(index, MixinIndex::new(0));
	let mixin = registry.mixin(index).unwrap();
	assert_eq!(mixin.deployment_model, DeploymentModel::PerType);
	assert_eq!(mixin.related_model(), DeploymentModel::PerType);
	assert_eq!(&*mixin.aspect_name, "audit");
	assert_eq!(registry.aspect(mixin.aspect).unwrap().mixins.to_vec(), vec![index]);
	assert_eq!(mixin.container.required_interfaces().len(), 1);
}

#[test]
fn per_type_mixin_under_per_process_aspect_resolves_through_the_process_instance() {
	let registry = registry();
	let definition = tracer("audit").with_mixin(MixinDefinition::new("tracked", "tracked").with_model(DeploymentModel::PerType));
	registry.register(Registration::new(definition, tracer_binding()).with_mixin("tracked", tracked_binding())).unwrap();
	let mixin = registry.mixin_by_name("tracked").unwrap();
	assert_eq!(mixin.aspect_model, DeploymentModel::PerProcess);
	assert_eq!(mixin.related_model(), DeploymentModel::PerProcess);
}

#[test]
fn mixin_errors_name_the_mixin() {
	let registry = registry();
	let unbound = tracer("a").with_mixin(MixinDefinition::new("tracked", "missing-impl"));
	let err = registry.register(Registration::new(unbound, tracer_binding())).unwrap_err();
	assert!(matches!(err, DefinitionError::Unbound { kind: DefinitionKind::Mixin, .. }));
	assert!(err.to_string().contains("missing-impl"));

	let first = tracer("a").with_mixin(MixinDefinition::new("tracked", "tracked"));
	registry.register(Registration::new(first, tracer_binding()).with_mixin("tracked", tracked_binding())).unwrap();
	let second = tracer("b").with_mixin(MixinDefinition::new("tracked", "tracked"));
	let err = registry.register(Registration::new(second, tracer_binding()).with_mixin("tracked", tracked_binding())).unwrap_err();
	assert!(matches!(err, DefinitionError::DuplicateMixin { ref existing, .. } if existing == "a"));
	assert_eq!(registry.len(), 1);
}

#[test]
fn advice_plan_splits_by_kind_in_declaration_order() {
	let registry = registry();
	registry.register_aspect(audit_definition(), auditor_binding()).unwrap();
	registry
		.register_aspect(
			AspectDefinition::new("second", "tracer").with_advice(AdviceDefinition::new("trace", AdviceKind::Around, "bank::Account::withdraw", "trace")),
			tracer_binding(),
		)
		.unwrap();

	let ty = TypeKey::named("bank::Account");
	let plan = registry.advice_plan(&withdraw(), &ty);
	let names = |advices: &[Arc<AdviceDef>]| advices.iter().map(|a| a.name.to_string()).collect::<Vec<_>>();
	assert_eq!(names(&plan.around), ["log", "trace"]);
	assert_eq!(names(&plan.before), ["check"]);
	assert_eq!(names(&plan.after_throwing), ["alarm"]);
	assert!(plan.after.is_empty() && plan.after_returning.is_empty());
	assert!(!plan.enters_cflow);

	let deposit = registry.advice_plan(&JoinPointSite::execution("bank::Account", "deposit"), &ty);
	assert_eq!(names(&deposit.around), ["log"]);
	assert!(deposit.before.is_empty());
}

#[test]
fn advice_plans_are_cached_until_the_registry_changes() {
	let registry = registry();
	registry.register_aspect(audit_definition(), auditor_binding()).unwrap();
	let ty = TypeKey::named("bank::Account");

	let first = registry.advice_plan(&withdraw(), &ty);
	let second = registry.advice_plan(&withdraw(), &ty);
	assert!(Arc::ptr_eq(&first, &second));
	assert_eq!(registry.cache_stats().hits, 1);

	registry
		.register_aspect(
			AspectDefinition::new("late", "tracer").with_advice(AdviceDefinition::new("trace", AdviceKind::Before, "bank::Account::*", "trace")),
			tracer_binding(),
		)
		.unwrap();
	let third = registry.advice_plan(&withdraw(), &ty);
	assert!(!Arc::ptr_eq(&first, &third));
	assert_eq!(third.before.len(), 2);

	assert_eq!(registry.invalidate_type(&ty), 1);
	assert_eq!(registry.cache_stats().entries, 0);
}

#[test]
fn bounded_plan_cache_respects_capacity() {
	let options = RegistryOptions {
		cache_policy: CachePolicy::Bounded(NonZeroUsize::new(1).unwrap()),
		..RegistryOptions::default()
	};
	let registry = AspectRegistry::with_options(Arc::new(GlobMatcher::new()), options);
	registry.register_aspect(audit_definition(), auditor_binding()).unwrap();
	let ty = TypeKey::named("bank::Account");
	registry.advice_plan(&withdraw(), &ty);
	registry.advice_plan(&JoinPointSite::execution("bank::Account", "deposit"), &ty);
	assert_eq!(registry.cache_stats().entries, 1);
}

#[test]
fn cflow_sites_and_activity() {
	let registry = registry();
	registry.register_aspect(audit_definition(), auditor_binding()).unwrap();
	let teller = TypeKey::named("bank::Teller");
	let serve = JoinPointSite::new(JoinPointKind::MethodExecution, "bank::Teller", "serve");
	assert!(registry.advice_plan(&serve, &teller).enters_cflow);

	let tracker = CflowTracker::new();
	assert!(!registry.cflow_active("bank::Teller::*", &tracker));
	let _guard = tracker.enter_scoped(CflowMarker::for_site(&serve));
	assert!(registry.cflow_active("bank::Teller::*", &tracker));
}

#[test]
fn swap_aspect_requires_identical_methods() {
	let registry = registry();
	registry.register_aspect(audit_definition(), auditor_binding()).unwrap();
	let entry = registry.aspect_by_name("audit").unwrap();
	let ty = TypeKey::named("bank::Account");
	let before = entry.container.instance(DeploymentModel::PerType, &Scope::of_type(&ty)).unwrap();

	let partial = AspectBinding::of::<StrictAuditor, _>(|_| Ok(StrictAuditor), |methods| methods.advice("log", |_, jp| jp.proceed()));
	let err = registry.swap_aspect_implementation("audit", partial).unwrap_err();
	assert!(err.to_string().contains("alarm(Error)"), "{err}");
	assert_eq!(entry.container.generation(), 0);

	let full = AspectBinding::of::<StrictAuditor, _>(
		|_| Ok(StrictAuditor),
		|methods| {
			methods
				.advice("check", |_, _| Ok(unit()))
				.advice("log", |_, jp| jp.proceed())
				.advice(MemberSignature::new("alarm").with_params(["Error"]), |_, _| Ok(unit()))
		},
	);
	assert_eq!(registry.swap_aspect_implementation("audit", full).unwrap(), 1);
	let after = entry.container.instance(DeploymentModel::PerType, &Scope::of_type(&ty)).unwrap();
	assert!(after.downcast_ref::<StrictAuditor>().is_some());
	assert!(before.downcast_ref::<Auditor>().is_some());

	let err = registry.swap_aspect_implementation("nobody", tracer_binding()).unwrap_err();
	assert!(matches!(err, DefinitionError::NotDefined { kind: DefinitionKind::Aspect, .. }));
}

#[test]
fn swap_mixin_keeps_introduced_interfaces() {
	let registry = registry();
	let definition = tracer("audit").with_mixin(MixinDefinition::new("tracked", "tracked").with_interface("bank::Tracked"));
	registry.register(Registration::new(definition, tracer_binding()).with_mixin("tracked", tracked_binding())).unwrap();

	let bare = MixinBinding::of::<Tracked, _>(|_| Ok(Tracked), |methods| methods.method("touch", |_, _| Ok(unit())));
	let err = registry.swap_mixin_implementation("tracked", bare).unwrap_err();
	assert!(matches!(err, DefinitionError::Container(crosscut_container::ContainerError::IncompatibleImplementation { .. })));

	assert_eq!(registry.swap_mixin_implementation("tracked", tracked_binding()).unwrap(), 1);
}

#[test]
fn purge_covers_every_container() {
	let registry = registry();
	registry.register_aspect(tracer("audit").with_model(DeploymentModel::PerInstance), tracer_binding()).unwrap();
	let entry = registry.aspect_by_name("audit").unwrap();
	let ty = TypeKey::named("bank::Account");
	{
		let target: Target = Arc::new(5u32);
		entry.container.instance(DeploymentModel::PerInstance, &Scope::new(&ty, Some(&target))).unwrap();
	}
	assert_eq!(registry.purge().per_instance, 1);
	assert_eq!(registry.purge().total(), 0);
}

struct CountingSource {
	loads: AtomicUsize,
}

impl DefinitionSource for CountingSource {
	fn load(&self, name: &str) -> Result<Option<Registration>, DefinitionError> {
		self.loads.fetch_add(1, Ordering::SeqCst);
		Ok(match name {
			"lazy" | "eager" => Some(Registration::new(tracer(name), tracer_binding())),
			"owner" => Some(
				Registration::new(tracer("owner").with_mixin(MixinDefinition::new("late-mixin", "tracked")), tracer_binding())
					.with_mixin("tracked", tracked_binding()),
			),
			_ => None,
		})
	}

	fn names(&self) -> Vec<String> {
		vec!["lazy".into(), "eager".into()]
	}

	fn owner_of_mixin(&self, mixin: &str) -> Option<String> {
		(mixin == "late-mixin").then(|| "owner".to_string())
	}
}

#[test]
fn lazy_source_is_consulted_once_per_miss() {
	let source = Arc::new(CountingSource { loads: AtomicUsize::new(0) });
	let registry = registry().with_source(source.clone());

	let err = registry.aspect_index("ghost").unwrap_err();
	assert!(err.is_not_defined());
	assert!(err.to_string().contains("ghost") && err.to_string().contains("aspect_index"));
	assert_eq!(source.loads.load(Ordering::SeqCst), 1);

	let index = registry.aspect_index("lazy").unwrap();
	assert_eq!(source.loads.load(Ordering::SeqCst), 2);
	assert_eq!(registry.aspect_index("lazy").unwrap(), index);
	assert_eq!(source.loads.load(Ordering::SeqCst), 2);

	// Out-of-range forces the remaining names to load.
	let eager = registry.aspect(AspectIndex::new(1)).unwrap();
	assert_eq!(&*eager.name, "eager");
	assert_eq!(source.loads.load(Ordering::SeqCst), 3);
	assert!(matches!(registry.aspect(AspectIndex::new(9)), Err(DefinitionError::IndexOutOfRange { index: 9, .. })));

	assert_eq!(registry.mixin_by_name("late-mixin").unwrap().aspect_name.as_ref(), "owner");
}

#[test]
fn first_advice_plan_loads_the_source() {
	let source = Arc::new(CountingSource { loads: AtomicUsize::new(0) });
	let registry = registry().with_source(source.clone());
	let ty = TypeKey::named("bank::Account");

	let plan = registry.advice_plan(&withdraw(), &ty);
	assert_eq!(plan.around.iter().map(|advice| &*advice.aspect).collect::<Vec<_>>(), ["lazy", "eager"]);
	assert_eq!(registry.len(), 2);
	assert_eq!(source.loads.load(Ordering::SeqCst), 2);

	// Later misses do not go back to the source.
	registry.advice_plan(&JoinPointSite::execution("bank::Account", "deposit"), &ty);
	assert_eq!(source.loads.load(Ordering::SeqCst), 2);
}

#[test]
fn flows_opened_on_a_subtype_are_visible_by_either_type() {
	let registry = registry();
	registry
		.register_aspect(
			AspectDefinition::new("vault", "tracer").with_advice(AdviceDefinition::new("trace", AdviceKind::Around, "bank::Vault::*", "trace").with_cflow("bank::SeniorTeller::*")),
			tracer_binding(),
		)
		.unwrap();
	let senior = TypeKey::named("bank::SeniorTeller");
	let serve = JoinPointSite::execution("bank::Teller", "serve");
	assert!(registry.advice_plan(&serve, &senior).enters_cflow);
	assert!(!registry.advice_plan(&serve, &TypeKey::named("bank::Teller")).enters_cflow);

	let tracker = CflowTracker::new();
	let _guard = tracker.enter_scoped(CflowMarker::for_join_point(&serve, &senior));
	assert!(registry.cflow_active("bank::SeniorTeller::*", &tracker));
	assert!(registry.cflow_active("bank::Teller::serve", &tracker));
}
