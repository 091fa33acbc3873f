//! The Rust side of aspect and mixin definitions.

use std::any::Any;
use std::fmt;

use crosscut_container::{Factory, FactoryContext, Parameters, Prototype, factory_fn};
use crosscut_primitives::{Throwable, TypeDescriptor};

use crate::method::{AdviceFn, AdviceRepository, MethodRepository, MethodRepositoryBuilder, MixinFn, MixinRepository};

/// Implementation descriptor, factory and advice methods of an aspect.
#[derive(Clone)]
pub struct AspectBinding {
	pub implementation: TypeDescriptor,
	pub factory: Factory,
	pub methods: AdviceRepository,
}

impl AspectBinding {
	pub fn new(implementation: TypeDescriptor, factory: Factory, methods: AdviceRepository) -> Self {
		Self {
			implementation,
			factory,
			methods,
		}
	}

	/// Binding for aspect type `T`, described by its Rust type name.
	pub fn of<T, B>(build: B, methods: impl FnOnce(MethodRepositoryBuilder<T, AdviceFn>) -> MethodRepositoryBuilder<T, AdviceFn>) -> Self
	where
		T: Any + Send + Sync,
		B: Fn(&FactoryContext<'_>) -> Result<T, Throwable> + Send + Sync + 'static,
	{
		Self::new(TypeDescriptor::of::<T>(), factory_fn(build), methods(MethodRepository::builder::<T>()).build())
	}

	/// Replaces the implementation descriptor, e.g. to declare provided interfaces.
	pub fn with_descriptor(mut self, implementation: TypeDescriptor) -> Self {
		self.implementation = implementation;
		self
	}

	pub(crate) fn into_prototype(self, parameters: Parameters) -> Prototype<AdviceRepository> {
		Prototype::new(self.implementation, self.factory, self.methods).with_parameters(parameters)
	}
}

impl fmt::Debug for AspectBinding {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("AspectBinding")
			.field("implementation", &self.implementation.name)
			.field("methods", &self.methods)
			.finish_non_exhaustive()
	}
}

/// Implementation descriptor, factory and introduced methods of a mixin.
#[derive(Clone)]
pub struct MixinBinding {
	pub implementation: TypeDescriptor,
	pub factory: Factory,
	pub methods: MixinRepository,
}

impl MixinBinding {
	pub fn new(implementation: TypeDescriptor, factory: Factory, methods: MixinRepository) -> Self {
		Self {
			implementation,
			factory,
			methods,
		}
	}

	/// Binding for mixin type `T`, described by its Rust type name.
	pub fn of<T, B>(build: B, methods: impl FnOnce(MethodRepositoryBuilder<T, MixinFn>) -> MethodRepositoryBuilder<T, MixinFn>) -> Self
	where
		T: Any + Send + Sync,
		B: Fn(&FactoryContext<'_>) -> Result<T, Throwable> + Send + Sync + 'static,
	{
		Self::new(TypeDescriptor::of::<T>(), factory_fn(build), methods(MethodRepository::builder::<T>()).build())
	}

	pub fn with_descriptor(mut self, implementation: TypeDescriptor) -> Self {
		self.implementation = implementation;
		self
	}

	pub(crate) fn into_prototype(self, parameters: Parameters) -> Prototype<MixinRepository> {
		Prototype::new(self.implementation, self.factory, self.methods).with_parameters(parameters)
	}
}

impl fmt::Debug for MixinBinding {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("MixinBinding")
			.field("implementation", &self.implementation.name)
			.field("methods", &self.methods)
			.finish_non_exhaustive()
	}
}
