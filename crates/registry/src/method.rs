//! Method repositories: sorted tables of advice and mixin methods.
//!
//! A repository replaces reflective method lookup. It is built once per implementation, sorted
//! by canonical signature so that a [`MemberIndex`] names the same method on every run, and
//! indexed directly on the hot path.

use std::any::{self, Any, TypeId};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crosscut_primitives::{DenseId, Instance, InternalFault, JoinPoint, MemberIndex, MemberSignature, MixinCall, Throwable, Value, u32_index};
use tracing::warn;

/// An advice method bound to its aspect type.
pub type AdviceFn = Arc<dyn Fn(&Instance, &mut JoinPoint<'_>) -> Result<Value, Throwable> + Send + Sync>;

/// An introduced method bound to its mixin type.
pub type MixinFn = Arc<dyn Fn(&Instance, &mut MixinCall<'_>) -> Result<Value, Throwable> + Send + Sync>;

pub type AdviceRepository = MethodRepository<AdviceFn>;
pub type MixinRepository = MethodRepository<MixinFn>;

/// One method of a repository.
pub struct MethodEntry<F> {
	pub signature: MemberSignature,
	canonical: Box<str>,
	/// Concrete type the method expects as its receiver.
	pub receiver: TypeId,
	pub receiver_name: &'static str,
	pub call: F,
}

impl<F> MethodEntry<F> {
	pub fn canonical(&self) -> &str {
		&self.canonical
	}

	/// Returns true if `instance` is of the receiver type this method was built for.
	pub fn accepts(&self, instance: &Instance) -> bool {
		(**instance).type_id() == self.receiver
	}
}

/// Sorted, immutable method table. Cloning shares the table.
pub struct MethodRepository<F> {
	entries: Arc<[MethodEntry<F>]>,
}

impl<F> Clone for MethodRepository<F> {
	fn clone(&self) -> Self {
		Self {
			entries: self.entries.clone(),
		}
	}
}

impl<F> Default for MethodRepository<F> {
	fn default() -> Self {
		Self {
			entries: Arc::from(Vec::new()),
		}
	}
}

impl<F> MethodRepository<F> {
	/// Starts a repository whose methods take `T` as receiver.
	pub fn builder<T: Any + Send + Sync>() -> MethodRepositoryBuilder<T, F> {
		MethodRepositoryBuilder {
			entries: Vec::new(),
			_receiver: PhantomData,
		}
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	pub fn get(&self, index: MemberIndex) -> Option<&MethodEntry<F>> {
		self.entries.get(index.as_usize())
	}

	/// Index of the method whose canonical signature is `signature`, or failing that, the first
	/// method whose bare name is `signature`.
	pub fn index_of(&self, signature: &str) -> Option<MemberIndex> {
		self.resolve(signature).map(|(index, _)| index)
	}

	/// Like [`MethodRepository::index_of`], also returning the entry.
	pub fn resolve(&self, signature: &str) -> Option<(MemberIndex, &MethodEntry<F>)> {
		let position = self
			.entries
			.binary_search_by(|entry| entry.canonical().cmp(signature))
			.ok()
			.or_else(|| self.entries.iter().position(|entry| entry.signature.name() == signature))?;
		Some((MemberIndex::new(u32_index(position, "method repository")), &self.entries[position]))
	}

	pub fn iter(&self) -> impl Iterator<Item = (MemberIndex, &MethodEntry<F>)> {
		self.entries
			.iter()
			.enumerate()
			.map(|(i, entry)| (MemberIndex::new(u32_index(i, "method repository")), entry))
	}

	/// Canonical signatures in index order.
	pub fn signatures(&self) -> impl Iterator<Item = &str> {
		self.entries.iter().map(MethodEntry::canonical)
	}

	/// Checks that `replacement` assigns every signature the same index as `self`.
	pub fn check_compatible(&self, replacement: &Self) -> Result<(), String> {
		if let Some(missing) = self.signatures().find(|sig| !replacement.signatures().any(|other| other == *sig)) {
			return Err(format!("method `{missing}` is missing"));
		}
		if let Some(extra) = replacement.signatures().find(|sig| !self.signatures().any(|other| other == *sig)) {
			return Err(format!("method `{extra}` would shift existing method indices"));
		}
		Ok(())
	}
}

impl<F> fmt::Debug for MethodRepository<F> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_list().entries(self.signatures()).finish()
	}
}

/// Collects methods for a receiver type `T`.
pub struct MethodRepositoryBuilder<T, F> {
	entries: Vec<MethodEntry<F>>,
	_receiver: PhantomData<fn() -> T>,
}

impl<T: Any + Send + Sync, F> MethodRepositoryBuilder<T, F> {
	fn push(mut self, signature: MemberSignature, call: F) -> Self {
		self.entries.push(MethodEntry {
			canonical: signature.canonical().into_boxed_str(),
			signature,
			receiver: TypeId::of::<T>(),
			receiver_name: any::type_name::<T>(),
			call,
		});
		self
	}

	/// Sorts by canonical signature. The first of several identical signatures wins.
	pub fn build(mut self) -> MethodRepository<F> {
		self.entries.sort_by(|a, b| a.canonical.cmp(&b.canonical));
		let before = self.entries.len();
		self.entries.dedup_by(|later, earlier| later.canonical == earlier.canonical);
		if self.entries.len() != before {
			warn!(receiver = any::type_name::<T>(), dropped = before - self.entries.len(), "method repository: duplicate signatures");
		}
		MethodRepository {
			entries: self.entries.into(),
		}
	}
}

impl<T: Any + Send + Sync> MethodRepositoryBuilder<T, AdviceFn> {
	/// Adds an advice method.
	pub fn advice<G>(self, signature: impl Into<MemberSignature>, method: G) -> Self
	where
		G: Fn(&T, &mut JoinPoint<'_>) -> Result<Value, Throwable> + Send + Sync + 'static,
	{
		let call: AdviceFn = Arc::new(move |instance: &Instance, jp: &mut JoinPoint<'_>| method(receiver::<T>(instance)?, jp));
		self.push(signature.into(), call)
	}
}

impl<T: Any + Send + Sync> MethodRepositoryBuilder<T, MixinFn> {
	/// Adds an introduced method.
	pub fn method<G>(self, signature: impl Into<MemberSignature>, method: G) -> Self
	where
		G: Fn(&T, &mut MixinCall<'_>) -> Result<Value, Throwable> + Send + Sync + 'static,
	{
		let call: MixinFn = Arc::new(move |instance: &Instance, call: &mut MixinCall<'_>| method(receiver::<T>(instance)?, call));
		self.push(signature.into(), call)
	}
}

fn receiver<T: Any>(instance: &Instance) -> Result<&T, Throwable> {
	instance
		.downcast_ref::<T>()
		.ok_or_else(|| Box::new(InternalFault::new(format!("receiver is not a `{}`", any::type_name::<T>()))) as Throwable)
}

#[cfg(test)]
mod tests {
	use crosscut_primitives::{Args, JoinPointSite, TypeKey, unit};

	use super::*;

	struct Auditor;
	struct Other;

	fn repository() -> AdviceRepository {
		MethodRepository::builder::<Auditor>()
			.advice("zeta", |_, _| Ok(unit()))
			.advice(MemberSignature::new("alpha").with_params(["u64"]), |_, jp| Ok(Box::new(jp.args().len())))
			.advice("mid", |_, _| Ok(unit()))
			.build()
	}

	#[test]
	fn methods_sort_by_canonical_signature() {
		let repo = repository();
		assert_eq!(repo.signatures().collect::<Vec<_>>(), ["alpha(u64)", "mid()", "zeta()"]);
		assert_eq!(repo.index_of("alpha(u64)"), Some(MemberIndex::new(0)));
		assert_eq!(repo.index_of("zeta"), Some(MemberIndex::new(2)));
		assert_eq!(repo.index_of("missing"), None);
	}

	#[test]
	fn call_downcasts_its_receiver() {
		let repo = repository();
		let entry = repo.get(MemberIndex::new(0)).unwrap();
		let site = JoinPointSite::execution("bank::Account", "deposit");
		let ty = TypeKey::named("bank::Account");
		let mut args = Args::new().with(1u64).with(2u64);
		let mut chain = crosscut_primitives::Detached;
		let mut jp = JoinPoint::new(&site, &ty, None, &mut args, &mut chain);

		let good: Instance = Arc::new(Auditor);
		assert!(entry.accepts(&good));
		let out = (entry.call)(&good, &mut jp).unwrap();
		assert_eq!(out.downcast_ref::<usize>(), Some(&2));

		let bad: Instance = Arc::new(Other);
		assert!(!entry.accepts(&bad));
		let err = (entry.call)(&bad, &mut jp).unwrap_err();
		assert!(err.downcast_ref::<InternalFault>().is_some());
	}

	#[test]
	fn compatibility_requires_identical_signatures() {
		let old = repository();
		let same = MethodRepository::builder::<Other>()
			.advice("mid", |_, _| Ok(unit()))
			.advice("zeta", |_, _| Ok(unit()))
			.advice(MemberSignature::new("alpha").with_params(["u64"]), |_, _| Ok(unit()))
			.build();
		assert!(old.check_compatible(&same).is_ok());

		let fewer = MethodRepository::builder::<Other>().advice("mid", |_, _| Ok(unit())).build();
		assert!(old.check_compatible(&fewer).unwrap_err().contains("alpha(u64)"));

		let more = MethodRepository::builder::<Other>()
			.advice("aardvark", |_, _| Ok(unit()))
			.advice("mid", |_, _| Ok(unit()))
			.advice("zeta", |_, _| Ok(unit()))
			.advice(MemberSignature::new("alpha").with_params(["u64"]), |_, _| Ok(unit()))
			.build();
		assert!(old.check_compatible(&more).unwrap_err().contains("aardvark"));
	}

	#[test]
	fn duplicate_signatures_keep_the_first() {
		let repo = MethodRepository::builder::<Auditor>()
			.advice("twice", |_, _| Ok(Box::new(1u8)))
			.advice("twice", |_, _| Ok(Box::new(2u8)))
			.build();
		assert_eq!(repo.len(), 1);
	}
}
