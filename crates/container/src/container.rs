use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use arc_swap::ArcSwap;
use crosscut_primitives::{DeploymentModel, Instance, Target, TypeDescriptor, TypeKey};
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::error::ContainerError;
use crate::prototype::{FactoryContext, Prototype};
use crate::slot::{ProcessSlot, TypeMap};
use crate::weak::{InstanceMap, ThreadMap};

/// Insertions between opportunistic prunes of the weak maps.
pub const DEFAULT_PRUNE_THRESHOLD: usize = 256;

/// Referent supplier for one resolution: the runtime target type and, if any, the target.
#[derive(Clone, Copy)]
pub struct Scope<'a> {
	pub target_type: &'a TypeKey,
	pub target: Option<&'a Target>,
}

impl<'a> Scope<'a> {
	pub fn new(target_type: &'a TypeKey, target: Option<&'a Target>) -> Self {
		Self { target_type, target }
	}

	/// Scope with a target type but no target object (static members, constructors).
	pub fn of_type(target_type: &'a TypeKey) -> Self {
		Self { target_type, target: None }
	}
}

impl fmt::Debug for Scope<'_> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Scope")
			.field("target_type", self.target_type)
			.field("has_target", &self.target.is_some())
			.finish()
	}
}

/// An instance together with the implementation generation it came from.
pub struct Resolved<M> {
	pub instance: Instance,
	pub prototype: Arc<Prototype<M>>,
	pub generation: u64,
}

impl<M> Clone for Resolved<M> {
	fn clone(&self) -> Self {
		Self {
			instance: self.instance.clone(),
			prototype: self.prototype.clone(),
			generation: self.generation,
		}
	}
}

impl<M> fmt::Debug for Resolved<M> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Resolved")
			.field("implementation", &self.prototype.implementation.name)
			.field("generation", &self.generation)
			.finish_non_exhaustive()
	}
}

/// One implementation and every instance built from it.
struct Generation<M> {
	number: u64,
	prototype: Arc<Prototype<M>>,
	process: ProcessSlot,
	types: TypeMap,
	instances: InstanceMap,
	threads: ThreadMap,
}

impl<M> Generation<M> {
	fn new(number: u64, prototype: Arc<Prototype<M>>, prune_threshold: usize) -> Self {
		Self {
			number,
			prototype,
			process: ProcessSlot::default(),
			types: TypeMap::default(),
			instances: InstanceMap::new(prune_threshold),
			threads: ThreadMap::new(prune_threshold),
		}
	}
}

/// Live entry counts of the current generation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContainerStats {
	pub generation: u64,
	pub per_process: usize,
	pub per_type: usize,
	/// Per-instance entries whose target is still alive.
	pub per_instance: usize,
	/// Per-thread entries whose thread is still running.
	pub per_thread: usize,
	/// Factory invocations that produced an instance, over the container's lifetime.
	pub constructed: u64,
}

/// Entries removed by [`InstanceContainer::purge`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PurgeReport {
	pub per_instance: usize,
	pub per_thread: usize,
}

impl PurgeReport {
	pub fn total(&self) -> usize {
		self.per_instance + self.per_thread
	}
}

/// Vends aspect or mixin instances according to a deployment model.
///
/// Each deployment model has its own store. Reads of the per-process slot and the per-type map
/// are lock-free; construction is serialized per store and re-checked after the lock is taken,
/// so concurrent first callers all observe the single published instance. Per-instance and
/// per-thread stores never keep their keys alive.
///
/// [`InstanceContainer::swap_implementation`] replaces the prototype and all four stores in one
/// step. Instances vended earlier stay valid for whoever holds them but are never returned
/// again. A resolution racing with a swap may still complete against the generation it loaded.
pub struct InstanceContainer<M> {
	name: Arc<str>,
	required_interfaces: Vec<Arc<str>>,
	generation: ArcSwap<Generation<M>>,
	swap_lock: Mutex<()>,
	prune_threshold: usize,
	constructed: AtomicU64,
}

impl<M> InstanceContainer<M> {
	pub fn new(name: impl Into<Arc<str>>, prototype: Prototype<M>) -> Self {
		Self {
			name: name.into(),
			required_interfaces: Vec::new(),
			generation: ArcSwap::from_pointee(Generation::new(0, Arc::new(prototype), DEFAULT_PRUNE_THRESHOLD)),
			swap_lock: Mutex::new(()),
			prune_threshold: DEFAULT_PRUNE_THRESHOLD,
			constructed: AtomicU64::new(0),
		}
	}

	/// Interfaces every replacement implementation must provide.
	pub fn with_required_interfaces<I, S>(mut self, interfaces: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<Arc<str>>,
	{
		self.required_interfaces = interfaces.into_iter().map(Into::into).collect();
		self
	}

	pub fn with_prune_threshold(mut self, threshold: usize) -> Self {
		self.prune_threshold = threshold.max(1);
		let current = self.generation.load_full();
		self.generation = ArcSwap::from_pointee(Generation::new(current.number, current.prototype.clone(), self.prune_threshold));
		self
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn required_interfaces(&self) -> &[Arc<str>] {
		&self.required_interfaces
	}

	/// Current prototype.
	pub fn prototype(&self) -> Arc<Prototype<M>> {
		self.generation.load().prototype.clone()
	}

	/// Current implementation generation. Starts at 0 and grows by one per successful swap.
	pub fn generation(&self) -> u64 {
		self.generation.load().number
	}

	/// Returns the instance bound to the scope's referent under `model`, constructing it on
	/// first use.
	///
	/// A per-instance request without a target resolves per-type for the scope's target type.
	/// `related` is handed to the factory (the owning aspect instance for mixins).
	pub fn resolve(&self, model: DeploymentModel, scope: &Scope<'_>, related: Option<&Instance>) -> Result<Resolved<M>, ContainerError> {
		let generation = self.generation.load_full();
		let build = |model: DeploymentModel| self.construct(&generation, model, scope, related);
		let instance = match model {
			DeploymentModel::PerProcess => generation.process.get_or_try_init(|| build(model))?,
			DeploymentModel::PerType => generation.types.get_or_try_init(scope.target_type, || build(model))?,
			DeploymentModel::PerInstance => match scope.target {
				Some(target) => generation.instances.get_or_try_init(target, || build(model))?,
				None => {
					warn!(container = %self.name, target_type = %scope.target_type, "container.per_instance.no_target; resolving per type");
					generation.types.get_or_try_init(scope.target_type, || build(DeploymentModel::PerType))?
				}
			},
			DeploymentModel::PerThread => generation.threads.get_or_try_init(|| build(model))?,
		};
		Ok(Resolved {
			instance,
			prototype: generation.prototype.clone(),
			generation: generation.number,
		})
	}

	/// Instance-only shorthand for [`InstanceContainer::resolve`].
	pub fn instance(&self, model: DeploymentModel, scope: &Scope<'_>) -> Result<Instance, ContainerError> {
		self.resolve(model, scope, None).map(|resolved| resolved.instance)
	}

	fn construct(&self, generation: &Generation<M>, model: DeploymentModel, scope: &Scope<'_>, related: Option<&Instance>) -> Result<Instance, ContainerError> {
		let prototype = &generation.prototype;
		let ctx = FactoryContext {
			name: &self.name,
			model,
			parameters: &prototype.parameters,
			target_type: scope.target_type,
			target: scope.target,
			related,
		};
		match (prototype.factory)(&ctx) {
			Ok(instance) => {
				self.constructed.fetch_add(1, Ordering::Relaxed);
				debug!(
					container = %self.name,
					implementation = %prototype.implementation.name,
					%model,
					target_type = %scope.target_type,
					generation = generation.number,
					"container.construct"
				);
				Ok(instance)
			}
			Err(source) => {
				warn!(container = %self.name, %model, target_type = %scope.target_type, error = %source, "container.construct failed");
				Err(ContainerError::Construction {
					name: self.name.clone(),
					model,
					referent: referent_label(model, scope),
					source,
				})
			}
		}
	}

	/// Replaces the implementation, dropping every cached instance.
	///
	/// Fails without effect when the new implementation lacks a required interface.
	pub fn swap_implementation(&self, prototype: Prototype<M>) -> Result<u64, ContainerError> {
		self.swap_implementation_with(prototype, |_, _| Ok(()))
	}

	/// Like [`InstanceContainer::swap_implementation`], additionally running `check` against
	/// the current and the new prototype while the swap lock is held.
	pub fn swap_implementation_with(
		&self,
		prototype: Prototype<M>,
		check: impl FnOnce(&Prototype<M>, &Prototype<M>) -> Result<(), ContainerError>,
	) -> Result<u64, ContainerError> {
		let _guard = self.swap_lock.lock();
		let current = self.generation.load_full();
		self.check_interfaces(&prototype.implementation)?;
		check(&current.prototype, &prototype)?;

		let number = current.number + 1;
		debug!(
			container = %self.name,
			from = %current.prototype.implementation.name,
			to = %prototype.implementation.name,
			generation = number,
			"container.swap"
		);
		self.generation
			.store(Arc::new(Generation::new(number, Arc::new(prototype), self.prune_threshold)));
		Ok(number)
	}

	fn check_interfaces(&self, implementation: &TypeDescriptor) -> Result<(), ContainerError> {
		match self.required_interfaces.iter().find(|interface| !implementation.implements(interface)) {
			Some(interface) => Err(ContainerError::IncompatibleImplementation {
				name: self.name.clone(),
				implementation: implementation.name.clone(),
				interface: interface.clone(),
			}),
			None => Ok(()),
		}
	}

	/// Drops per-instance and per-thread entries whose key has died.
	pub fn purge(&self) -> PurgeReport {
		let generation = self.generation.load();
		let report = PurgeReport {
			per_instance: generation.instances.purge(),
			per_thread: generation.threads.purge(),
		};
		if report.total() > 0 {
			debug!(container = %self.name, per_instance = report.per_instance, per_thread = report.per_thread, "container.purge");
		}
		report
	}

	pub fn stats(&self) -> ContainerStats {
		let generation = self.generation.load();
		ContainerStats {
			generation: generation.number,
			per_process: usize::from(generation.process.is_set()),
			per_type: generation.types.len(),
			per_instance: generation.instances.live_len(),
			per_thread: generation.threads.live_len(),
			constructed: self.constructed.load(Ordering::Relaxed),
		}
	}

	/// Per-instance entries including dead ones not yet purged.
	pub fn per_instance_entries(&self) -> usize {
		self.generation.load().instances.len()
	}
}

impl<M> fmt::Debug for InstanceContainer<M> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("InstanceContainer")
			.field("name", &self.name)
			.field("generation", &self.generation())
			.field("required_interfaces", &self.required_interfaces)
			.finish_non_exhaustive()
	}
}

fn referent_label(model: DeploymentModel, scope: &Scope<'_>) -> String {
	match model {
		DeploymentModel::PerProcess => "the process".to_string(),
		DeploymentModel::PerType => format!("type `{}`", scope.target_type),
		DeploymentModel::PerInstance => format!("an instance of `{}`", scope.target_type),
		DeploymentModel::PerThread => format!("thread {:?}", std::thread::current().id()),
	}
}
