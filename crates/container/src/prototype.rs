//! Prototype descriptors and factories.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crosscut_primitives::{DeploymentModel, Instance, Target, Throwable, TypeDescriptor, TypeKey};

/// Definition parameters handed to every constructed instance.
pub type Parameters = BTreeMap<String, String>;

/// Builds a fresh instance for one scope key.
pub type Factory = Arc<dyn Fn(&FactoryContext<'_>) -> Result<Instance, Throwable> + Send + Sync>;

/// Everything a factory may consult while building an instance.
pub struct FactoryContext<'a> {
	/// Aspect or mixin name.
	pub name: &'a str,
	/// Model the instance is being created for.
	pub model: DeploymentModel,
	pub parameters: &'a Parameters,
	/// Runtime type of the referent.
	pub target_type: &'a TypeKey,
	/// Referent object for per-instance construction.
	pub target: Option<&'a Target>,
	/// Owning aspect instance, for mixins bound to aspect state.
	pub related: Option<&'a Instance>,
}

impl FactoryContext<'_> {
	pub fn parameter(&self, key: &str) -> Option<&str> {
		self.parameters.get(key).map(String::as_str)
	}
}

/// Template from which scoped instances are produced.
///
/// `M` is per-implementation metadata that must change together with the implementation, such
/// as a method table whose entries downcast to the implementation type.
pub struct Prototype<M> {
	pub implementation: Arc<TypeDescriptor>,
	pub factory: Factory,
	pub parameters: Arc<Parameters>,
	pub methods: M,
}

impl<M> Prototype<M> {
	pub fn new(implementation: TypeDescriptor, factory: Factory, methods: M) -> Self {
		Self {
			implementation: Arc::new(implementation),
			factory,
			parameters: Arc::new(Parameters::new()),
			methods,
		}
	}

	pub fn with_parameters(mut self, parameters: Parameters) -> Self {
		self.parameters = Arc::new(parameters);
		self
	}
}

impl<M> fmt::Debug for Prototype<M> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Prototype")
			.field("implementation", &self.implementation.name)
			.field("parameters", &self.parameters)
			.finish_non_exhaustive()
	}
}

/// Wraps a plain constructor as a [`Factory`].
pub fn factory_fn<T, F>(build: F) -> Factory
where
	T: std::any::Any + Send + Sync,
	F: Fn(&FactoryContext<'_>) -> Result<T, Throwable> + Send + Sync + 'static,
{
	Arc::new(move |ctx: &FactoryContext<'_>| build(ctx).map(|value| Arc::new(value) as Instance))
}
