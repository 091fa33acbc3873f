//! Runtime aspect registry with atomic publication.
//!
//! # Role
//!
//! Maps aspect, advice and mixin names to dense indices, and indices to their containers and
//! definitions, so the dispatch hot path never performs string lookups.
//!
//! # Invariants
//!
//! - Tables only grow; an index assigned once keeps naming the same entry.
//!   - Enforced in: [`AspectRegistry::register`] (copy-on-grow under `write`).
//!   - Tested by: `invariants::test_indices_are_stable_across_growth`.
//!   - Failure symptom: a woven call site invokes the wrong aspect after a later deployment.
//! - Readers never observe a half-built table.
//!   - Enforced in: a single `ArcSwap::store` of the complete [`Tables`] per registration.
//!   - Tested by: `invariants::test_concurrent_registration_is_linearizable`.
//!   - Failure symptom: an aspect index resolves while its advice list is still missing.
//! - A lookup miss consults the definition source at most once.
//!   - Enforced in: [`AspectRegistry::aspect_index`], [`AspectRegistry::aspect`] and the mixin
//!     counterparts.
//!   - Tested by: `tests::lazy_source_is_consulted_once_per_miss`.
//!   - Failure symptom: an undefined name loops forever through the source.
//! - The first advice plan computed with a definition source attached sees every definition
//!   the source can supply.
//!   - Enforced in: [`AspectRegistry::advice_plan`] loading the source once before its first lookup.
//!   - Tested by: `tests::first_advice_plan_loads_the_source`.
//!   - Failure symptom: woven code that only dispatches never runs manifest advice.

use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwap;
use crosscut_cflow::{CflowMarker, CflowTracker};
use crosscut_container::{ContainerError, InstanceContainer, Parameters, Prototype, PurgeReport};
use crosscut_primitives::{
	AdviceKind, AspectIndex, DenseId, DeploymentModel, HasDeploymentModel, IndexTuple, JoinPointSite, MemberSignature, MixinIndex, TypeKey, u32_index,
};
use parking_lot::{Mutex, Once};
use rustc_hash::FxHashMap;
use tracing::{debug, trace, warn};
use uuid::Uuid;

use crate::binding::{AspectBinding, MixinBinding};
use crate::cache::{CachePolicy, CacheStats, MatchCache, MatchKey};
use crate::definition::AspectDefinition;
use crate::error::{DefinitionError, DefinitionKind};
use crate::matcher::{MatchContext, PointcutMatcher};
use crate::method::{AdviceRepository, MethodRepository, MixinRepository};
use crate::source::{DefinitionSource, Registration};

pub type AspectContainer = InstanceContainer<AdviceRepository>;
pub type MixinContainer = InstanceContainer<MixinRepository>;

/// Registered advice. Immutable once published.
#[derive(Debug)]
pub struct AdviceDef {
	pub name: Arc<str>,
	pub kind: AdviceKind,
	pub pointcut: Arc<str>,
	pub cflow: Option<Arc<str>>,
	pub throwing: Option<Arc<str>>,
	pub method: MemberSignature,
	/// Owning aspect and method position within its repository.
	pub tuple: IndexTuple,
	pub aspect: Arc<str>,
	pub deployment_model: DeploymentModel,
}

impl HasDeploymentModel for AdviceDef {
	fn deployment_model(&self) -> DeploymentModel {
		self.deployment_model
	}
}

/// Registered aspect.
pub struct AspectEntry {
	pub index: AspectIndex,
	pub name: Arc<str>,
	pub deployment_model: DeploymentModel,
	pub container: AspectContainer,
	/// Advice in declaration order.
	pub advices: Arc<[Arc<AdviceDef>]>,
	pub mixins: Arc<[MixinIndex]>,
	/// Aspect system that owns this registry, if any.
	pub system: Option<Uuid>,
}

impl AspectEntry {
	pub fn advice(&self, name: &str) -> Option<&Arc<AdviceDef>> {
		self.advices.iter().find(|advice| &*advice.name == name)
	}
}

impl HasDeploymentModel for AspectEntry {
	fn deployment_model(&self) -> DeploymentModel {
		self.deployment_model
	}
}

impl fmt::Debug for AspectEntry {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("AspectEntry")
			.field("index", &self.index)
			.field("name", &self.name)
			.field("deployment_model", &self.deployment_model)
			.field("advices", &self.advices.len())
			.field("mixins", &self.mixins)
			.finish_non_exhaustive()
	}
}

/// Registered mixin.
pub struct MixinEntry {
	pub index: MixinIndex,
	pub name: Arc<str>,
	pub deployment_model: DeploymentModel,
	pub aspect: AspectIndex,
	pub aspect_name: Arc<str>,
	pub aspect_model: DeploymentModel,
	pub interfaces: Arc<[Arc<str>]>,
	pub pointcut: Option<Arc<str>>,
	pub container: MixinContainer,
}

impl MixinEntry {
	/// Model at which the owning aspect instance is resolved for this mixin.
	pub fn related_model(&self) -> DeploymentModel {
		DeploymentModel::related_aspect_model(self.deployment_model, self.aspect_model)
	}
}

impl HasDeploymentModel for MixinEntry {
	fn deployment_model(&self) -> DeploymentModel {
		self.deployment_model
	}
}

impl fmt::Debug for MixinEntry {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("MixinEntry")
			.field("index", &self.index)
			.field("name", &self.name)
			.field("deployment_model", &self.deployment_model)
			.field("aspect", &self.aspect_name)
			.finish_non_exhaustive()
	}
}

/// Advice matching one join point shape, split by kind, each in declaration order.
#[derive(Debug, Default)]
pub struct AdvicePlan {
	pub before: Vec<Arc<AdviceDef>>,
	pub around: Vec<Arc<AdviceDef>>,
	pub after_returning: Vec<Arc<AdviceDef>>,
	pub after_throwing: Vec<Arc<AdviceDef>>,
	pub after: Vec<Arc<AdviceDef>>,
	/// The join point itself opens a flow that some cflow pointcut refers to.
	pub enters_cflow: bool,
}

impl AdvicePlan {
	pub fn len(&self) -> usize {
		self.before.len() + self.around.len() + self.after_returning.len() + self.after_throwing.len() + self.after.len()
	}

	/// True when nothing applies and the join point need not enter any flow.
	pub fn is_empty(&self) -> bool {
		self.len() == 0 && !self.enters_cflow
	}

	fn push(&mut self, advice: Arc<AdviceDef>) {
		match advice.kind {
			AdviceKind::Before => self.before.push(advice),
			AdviceKind::Around => self.around.push(advice),
			AdviceKind::AfterReturning => self.after_returning.push(advice),
			AdviceKind::AfterThrowing => self.after_throwing.push(advice),
			AdviceKind::After => self.after.push(advice),
		}
	}
}

/// Registry construction options.
#[derive(Debug, Clone)]
pub struct RegistryOptions {
	pub cache_policy: CachePolicy,
	/// Insertions between opportunistic prunes of weak instance maps.
	pub prune_threshold: usize,
	pub system: Option<Uuid>,
}

impl Default for RegistryOptions {
	fn default() -> Self {
		Self {
			cache_policy: CachePolicy::default(),
			prune_threshold: crosscut_container::DEFAULT_PRUNE_THRESHOLD,
			system: None,
		}
	}
}

/// One published generation of the registry tables.
#[derive(Clone, Default)]
struct Tables {
	aspects: Arc<[Arc<AspectEntry>]>,
	mixins: Arc<[Arc<MixinEntry>]>,
	/// Every advice, aspects in registration order, each aspect's advice in declaration order.
	advices: Arc<[Arc<AdviceDef>]>,
	aspect_names: Arc<FxHashMap<Arc<str>, AspectIndex>>,
	mixin_names: Arc<FxHashMap<Arc<str>, MixinIndex>>,
	/// Distinct cflow expressions referenced by any advice.
	cflows: Arc<[Arc<str>]>,
}

/// Authoritative name/index registry for aspects, advice and mixins.
pub struct AspectRegistry {
	tables: ArcSwap<Tables>,
	write: Mutex<()>,
	source: Option<Arc<dyn DefinitionSource>>,
	/// Guards the one eager load of `source` on the first plan miss.
	sourced: Once,
	matcher: Arc<dyn PointcutMatcher>,
	plans: MatchCache<Arc<AdvicePlan>>,
	options: RegistryOptions,
}

impl AspectRegistry {
	pub fn new(matcher: Arc<dyn PointcutMatcher>) -> Self {
		Self::with_options(matcher, RegistryOptions::default())
	}

	pub fn with_options(matcher: Arc<dyn PointcutMatcher>, options: RegistryOptions) -> Self {
		Self {
			tables: ArcSwap::from_pointee(Tables::default()),
			write: Mutex::new(()),
			source: None,
			sourced: Once::new(),
			matcher,
			plans: MatchCache::new(options.cache_policy),
			options,
		}
	}

	/// Consults `source` when a lookup misses.
	pub fn with_source(mut self, source: Arc<dyn DefinitionSource>) -> Self {
		self.source = Some(source);
		self
	}

	pub fn matcher(&self) -> &dyn PointcutMatcher {
		&*self.matcher
	}

	pub fn system(&self) -> Option<Uuid> {
		self.options.system
	}

	pub fn options(&self) -> &RegistryOptions {
		&self.options
	}

	/// Number of registered aspects.
	pub fn len(&self) -> usize {
		self.tables.load().aspects.len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Registered aspects in index order.
	pub fn aspects(&self) -> Vec<Arc<AspectEntry>> {
		self.tables.load().aspects.to_vec()
	}

	/// Registered mixins in index order.
	pub fn mixins(&self) -> Vec<Arc<MixinEntry>> {
		self.tables.load().mixins.to_vec()
	}

	/// Registers an aspect without mixins.
	pub fn register_aspect(&self, definition: AspectDefinition, binding: AspectBinding) -> Result<AspectIndex, DefinitionError> {
		self.register(Registration::new(definition, binding))
	}

	/// Validates and publishes an aspect with its advice and mixins.
	///
	/// Registering a name that already exists returns the existing index and changes nothing.
	/// Validation happens before anything is published, so a rejected registration leaves the
	/// tables untouched.
	pub fn register(&self, registration: Registration) -> Result<AspectIndex, DefinitionError> {
		let Registration { definition, binding, mixins } = registration;
		let _guard = self.write.lock();
		let current = self.tables.load_full();
		if let Some(&index) = current.aspect_names.get(definition.name.as_str()) {
			debug!(aspect = %definition.name, %index, "registry.register: already registered");
			return Ok(index);
		}

		let model = definition.model()?;
		let aspect_index = AspectIndex::new(u32_index(current.aspects.len(), "aspect table"));
		let name: Arc<str> = Arc::from(definition.name.as_str());

		let mut advices = Vec::with_capacity(definition.advices.len());
		for advice in &definition.advices {
			if advice.pointcut.trim().is_empty() {
				return Err(DefinitionError::MissingPointcut {
					aspect: definition.name.clone(),
					advice: advice.name.clone(),
				});
			}
			let (member, entry) = binding.methods.resolve(&advice.method).ok_or_else(|| DefinitionError::UnknownMethod {
				kind: DefinitionKind::Advice,
				name: advice.name.clone(),
				method: advice.method.clone(),
				implementation: binding.implementation.name.to_string(),
			})?;
			advices.push(Arc::new(AdviceDef {
				name: Arc::from(advice.name.as_str()),
				kind: advice.kind,
				pointcut: Arc::from(advice.pointcut.trim()),
				cflow: advice.cflow.as_deref().map(Arc::from),
				throwing: advice.throwing.as_deref().map(Arc::from),
				method: entry.signature.clone(),
				tuple: IndexTuple::new(aspect_index, member),
				aspect: name.clone(),
				deployment_model: advice.model(model)?,
			}));
		}

		let mut mixin_names = FxHashMap::clone(&current.mixin_names);
		let mut new_mixins = Vec::with_capacity(definition.mixins.len());
		for mixin in &definition.mixins {
			let mixin_model = mixin.model(model)?;
			if !DeploymentModel::is_mixin_compatible(mixin_model, model) {
				return Err(DefinitionError::IncompatibleMixinModel {
					mixin: mixin.name.clone(),
					mixin_model,
					aspect: definition.name.clone(),
					aspect_model: model,
				});
			}
			if let Some(&existing) = mixin_names.get(mixin.name.as_str()) {
				let owner = current
					.mixins
					.get(existing.as_usize())
					.map_or_else(|| definition.name.clone(), |entry| entry.aspect_name.to_string());
				return Err(DefinitionError::DuplicateMixin {
					mixin: mixin.name.clone(),
					aspect: definition.name.clone(),
					existing: owner,
				});
			}
			let mixin_binding: MixinBinding = mixins.get(&mixin.implementation).cloned().ok_or_else(|| DefinitionError::Unbound {
				kind: DefinitionKind::Mixin,
				name: mixin.name.clone(),
				implementation: mixin.implementation.clone(),
			})?;

			let index = MixinIndex::new(u32_index(current.mixins.len() + new_mixins.len(), "mixin table"));
			let mixin_name: Arc<str> = Arc::from(mixin.name.as_str());
			let interfaces: Arc<[Arc<str>]> = mixin.interfaces.iter().map(|iface| Arc::from(iface.as_str())).collect();
			let container = InstanceContainer::new(mixin_name.clone(), mixin_binding.into_prototype(mixin.parameters.clone()))
				.with_required_interfaces(interfaces.iter().cloned())
				.with_prune_threshold(self.options.prune_threshold);
			mixin_names.insert(mixin_name.clone(), index);
			new_mixins.push(Arc::new(MixinEntry {
				index,
				name: mixin_name,
				deployment_model: mixin_model,
				aspect: aspect_index,
				aspect_name: name.clone(),
				aspect_model: model,
				interfaces,
				pointcut: mixin.pointcut.as_deref().map(Arc::from),
				container,
			}));
		}

		let required = binding.implementation.all_interfaces();
		let container = InstanceContainer::new(name.clone(), binding.into_prototype(definition.parameters.clone()))
			.with_required_interfaces(required)
			.with_prune_threshold(self.options.prune_threshold);
		let entry = Arc::new(AspectEntry {
			index: aspect_index,
			name: name.clone(),
			deployment_model: model,
			container,
			advices: advices.iter().cloned().collect(),
			mixins: new_mixins.iter().map(|mixin| mixin.index).collect(),
			system: self.options.system,
		});

		let mut aspect_names = FxHashMap::clone(&current.aspect_names);
		aspect_names.insert(name.clone(), aspect_index);
		let mut cflows = current.cflows.to_vec();
		for expression in advices.iter().filter_map(|advice| advice.cflow.as_ref()) {
			if !cflows.contains(expression) {
				cflows.push(expression.clone());
			}
		}
		let next = Tables {
			aspects: current.aspects.iter().cloned().chain(std::iter::once(entry)).collect(),
			mixins: current.mixins.iter().cloned().chain(new_mixins.iter().cloned()).collect(),
			advices: current.advices.iter().cloned().chain(advices.iter().cloned()).collect(),
			aspect_names: Arc::new(aspect_names),
			mixin_names: Arc::new(mixin_names),
			cflows: cflows.into(),
		};
		self.tables.store(Arc::new(next));
		self.plans.clear();

		debug!(aspect = %name, index = %aspect_index, %model, advices = advices.len(), mixins = new_mixins.len(), "registry.register");
		Ok(aspect_index)
	}

	fn load_named(&self, name: &str) -> Result<bool, DefinitionError> {
		let Some(source) = &self.source else {
			return Ok(false);
		};
		match source.load(name)? {
			Some(registration) => {
				debug!(aspect = name, "registry: loading deferred definition");
				self.register(registration)?;
				Ok(true)
			}
			None => Ok(false),
		}
	}

	/// Registers every definition the source knows but the registry does not.
	fn load_all(&self) -> Result<bool, DefinitionError> {
		let Some(source) = &self.source else {
			return Ok(false);
		};
		let missing: Vec<String> = {
			let tables = self.tables.load();
			source.names().into_iter().filter(|name| !tables.aspect_names.contains_key(name.as_str())).collect()
		};
		let mut loaded = false;
		for name in missing {
			loaded |= self.load_named(&name)?;
		}
		Ok(loaded)
	}

	fn lookup_aspect(&self, name: &str) -> Option<AspectIndex> {
		self.tables.load().aspect_names.get(name).copied()
	}

	fn lookup_mixin(&self, name: &str) -> Option<MixinIndex> {
		self.tables.load().mixin_names.get(name).copied()
	}

	/// Index of aspect `name`, loading it from the definition source on a miss.
	pub fn aspect_index(&self, name: &str) -> Result<AspectIndex, DefinitionError> {
		if let Some(index) = self.lookup_aspect(name) {
			return Ok(index);
		}
		if self.load_named(name)?
			&& let Some(index) = self.lookup_aspect(name)
		{
			return Ok(index);
		}
		Err(DefinitionError::not_defined(DefinitionKind::Aspect, name, "aspect_index"))
	}

	/// Aspect at `index`. An out-of-range index forces deferred definitions to load once.
	pub fn aspect(&self, index: AspectIndex) -> Result<Arc<AspectEntry>, DefinitionError> {
		let get = || self.tables.load().aspects.get(index.as_usize()).cloned();
		if let Some(entry) = get() {
			return Ok(entry);
		}
		if self.load_all()?
			&& let Some(entry) = get()
		{
			return Ok(entry);
		}
		Err(DefinitionError::IndexOutOfRange {
			kind: DefinitionKind::Aspect,
			index: index.as_u32(),
			operation: "aspect",
		})
	}

	pub fn aspect_by_name(&self, name: &str) -> Result<Arc<AspectEntry>, DefinitionError> {
		self.aspect(self.aspect_index(name)?)
	}

	/// Index of mixin `name`, loading its owning aspect from the definition source on a miss.
	pub fn mixin_index(&self, name: &str) -> Result<MixinIndex, DefinitionError> {
		if let Some(index) = self.lookup_mixin(name) {
			return Ok(index);
		}
		let loaded = match self.source.as_ref().and_then(|source| source.owner_of_mixin(name)) {
			Some(owner) => self.load_named(&owner)?,
			None => self.load_all()?,
		};
		if loaded && let Some(index) = self.lookup_mixin(name) {
			return Ok(index);
		}
		Err(DefinitionError::not_defined(DefinitionKind::Mixin, name, "mixin_index"))
	}

	/// Mixin at `index`. An out-of-range index forces deferred definitions to load once.
	pub fn mixin(&self, index: MixinIndex) -> Result<Arc<MixinEntry>, DefinitionError> {
		let get = || self.tables.load().mixins.get(index.as_usize()).cloned();
		if let Some(entry) = get() {
			return Ok(entry);
		}
		if self.load_all()?
			&& let Some(entry) = get()
		{
			return Ok(entry);
		}
		Err(DefinitionError::IndexOutOfRange {
			kind: DefinitionKind::Mixin,
			index: index.as_u32(),
			operation: "mixin",
		})
	}

	pub fn mixin_by_name(&self, name: &str) -> Result<Arc<MixinEntry>, DefinitionError> {
		self.mixin(self.mixin_index(name)?)
	}

	/// `(aspect, method)` handle of advice `advice` in aspect `aspect`.
	pub fn advice_tuple(&self, aspect: &str, advice: &str) -> Result<IndexTuple, DefinitionError> {
		let entry = self.aspect_by_name(aspect)?;
		entry
			.advice(advice)
			.map(|def| def.tuple)
			.ok_or_else(|| DefinitionError::not_defined(DefinitionKind::Advice, format!("{aspect}/{advice}"), "advice_tuple"))
	}

	/// Advice registered under `tuple`.
	pub fn advice(&self, tuple: IndexTuple) -> Result<Arc<AdviceDef>, DefinitionError> {
		let entry = self.aspect(tuple.aspect)?;
		entry
			.advices
			.iter()
			.find(|advice| advice.tuple == tuple)
			.cloned()
			.ok_or(DefinitionError::IndexOutOfRange {
				kind: DefinitionKind::Advice,
				index: tuple.member.as_u32(),
				operation: "advice",
			})
	}

	/// Replaces the implementation of aspect `name`.
	///
	/// The new method table must carry exactly the same signatures so advice indices stay
	/// valid, and the new implementation must provide every interface the old one did.
	pub fn swap_aspect_implementation(&self, name: &str, binding: AspectBinding) -> Result<u64, DefinitionError> {
		let entry = self.aspect_by_name(name)?;
		let parameters = Parameters::clone(&entry.container.prototype().parameters);
		let generation = entry
			.container
			.swap_implementation_with(binding.into_prototype(parameters), |current, next| check_methods(&entry.name, current, next))?;
		self.plans.clear();
		Ok(generation)
	}

	/// Replaces the implementation of mixin `name`, keeping its introduced interfaces.
	pub fn swap_mixin_implementation(&self, name: &str, binding: MixinBinding) -> Result<u64, DefinitionError> {
		let entry = self.mixin_by_name(name)?;
		let parameters = Parameters::clone(&entry.container.prototype().parameters);
		let generation = entry
			.container
			.swap_implementation_with(binding.into_prototype(parameters), |current, next| check_methods(&entry.name, current, next))?;
		self.plans.clear();
		Ok(generation)
	}

	/// Advice applying to `site` when the target's runtime type is `target_type`. Memoized.
	pub fn advice_plan(&self, site: &JoinPointSite, target_type: &TypeKey) -> Arc<AdvicePlan> {
		let key = MatchKey {
			target_type: target_type.clone(),
			declaring: site.declaring_type().clone(),
			member: site.member().clone(),
			kind: site.kind(),
		};
		self.load_source_once();
		self.plans.get_or_compute(&key, || Arc::new(self.compute_plan(site, target_type)))
	}

	/// Registers everything the source supplies, once. Concurrent callers wait for the load.
	fn load_source_once(&self) {
		if self.source.is_none() {
			return;
		}
		self.sourced.call_once(|| {
			let names = self.source.as_ref().map(|source| source.names()).unwrap_or_default();
			for name in names {
				if let Err(err) = self.aspect_index(&name) {
					warn!(aspect = %name, error = %err, "registry.advice_plan: deferred definition failed to load");
				}
			}
		});
	}

	fn compute_plan(&self, site: &JoinPointSite, target_type: &TypeKey) -> AdvicePlan {
		let tables = self.tables.load();
		let ctx = MatchContext {
			kind: site.kind(),
			declaring: site.declaring_type(),
			target_type,
			member: site.member(),
		};
		let mut plan = AdvicePlan::default();
		for advice in tables.advices.iter().filter(|advice| self.matcher.matches(&advice.pointcut, &ctx)) {
			plan.push(advice.clone());
		}
		let marker = CflowMarker::for_join_point(site, target_type);
		plan.enters_cflow = tables.cflows.iter().any(|expression| self.matcher.matches_marker(expression, &marker));
		trace!(%site, %target_type, advices = plan.len(), enters_cflow = plan.enters_cflow, "registry.advice_plan");
		plan
	}

	/// Whether the current thread is inside a flow matching `expression`.
	pub fn cflow_active(&self, expression: &str, tracker: &CflowTracker) -> bool {
		tracker.is_active(|marker| self.matcher.matches_marker(expression, marker))
	}

	/// Drops cached plans computed for or declared by `ty`.
	pub fn invalidate_type(&self, ty: &TypeKey) -> usize {
		self.plans.invalidate_where(|key| &key.target_type == ty || &key.declaring == ty)
	}

	pub fn cache_stats(&self) -> CacheStats {
		self.plans.stats()
	}

	/// Purges dead weak entries from every aspect and mixin container.
	pub fn purge(&self) -> PurgeReport {
		let tables = self.tables.load();
		let reports = tables
			.aspects
			.iter()
			.map(|aspect| aspect.container.purge())
			.chain(tables.mixins.iter().map(|mixin| mixin.container.purge()));
		reports.fold(PurgeReport::default(), |acc, report| PurgeReport {
			per_instance: acc.per_instance + report.per_instance,
			per_thread: acc.per_thread + report.per_thread,
		})
	}
}

impl fmt::Debug for AspectRegistry {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let tables = self.tables.load();
		f.debug_struct("AspectRegistry")
			.field("aspects", &tables.aspects.len())
			.field("mixins", &tables.mixins.len())
			.field("advices", &tables.advices.len())
			.field("system", &self.options.system)
			.finish_non_exhaustive()
	}
}

fn check_methods<F>(name: &Arc<str>, current: &Prototype<MethodRepository<F>>, next: &Prototype<MethodRepository<F>>) -> Result<(), ContainerError> {
	current
		.methods
		.check_compatible(&next.methods)
		.map_err(|detail| ContainerError::IncompatibleMethods {
			name: name.clone(),
			implementation: next.implementation.name.clone(),
			detail,
		})
}
