//! Join point descriptors.
//!
//! # Role
//!
//! A [`JoinPointSite`] is the static half of an interception site and is created once per
//! call site by the weaving layer. A [`JoinPoint`] is the per-invocation half: it borrows the
//! site, the runtime target and the argument list, and carries the [`Continuation`] that
//! runs the rest of the advice chain.

use std::any::Any;
use std::error::Error;
use std::fmt;

use crate::ident::{MemberSignature, TypeKey};
use crate::kind::JoinPointKind;
use crate::value::{Args, Instance, InternalFault, Target, Throwable, Value};

/// Static description of an interception site.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JoinPointSite {
	kind: JoinPointKind,
	declaring: TypeKey,
	member: MemberSignature,
}

impl JoinPointSite {
	pub fn new(kind: JoinPointKind, declaring: impl Into<TypeKey>, member: impl Into<MemberSignature>) -> Self {
		Self {
			kind,
			declaring: declaring.into(),
			member: member.into(),
		}
	}

	/// Method execution site shorthand.
	pub fn execution(declaring: impl Into<TypeKey>, member: impl Into<MemberSignature>) -> Self {
		Self::new(JoinPointKind::MethodExecution, declaring, member)
	}

	pub fn kind(&self) -> JoinPointKind {
		self.kind
	}

	pub fn declaring_type(&self) -> &TypeKey {
		&self.declaring
	}

	pub fn member(&self) -> &MemberSignature {
		&self.member
	}
}

impl fmt::Display for JoinPointSite {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}({}::{})", self.kind.as_str(), self.declaring, self.member)
	}
}

/// Runtime type information about the outcome of the intercepted operation.
#[derive(Clone, Copy, Default)]
pub enum Rtti<'a> {
	/// The operation has not completed yet.
	#[default]
	Pending,
	/// The operation returned normally.
	Returned(&'a Value),
	/// The operation failed.
	Thrown(&'a (dyn Error + Send + Sync + 'static)),
}

/// Runs the remainder of an advice chain.
///
/// Implemented by the dispatcher; advice code only reaches it through [`JoinPoint::proceed`].
pub trait Continuation {
	fn proceed(&mut self, site: &JoinPointSite, target_type: &TypeKey, target: Option<&Target>, args: &mut Args) -> Result<Value, Throwable>;
}

/// Continuation for join points handed to non-around advice.
#[derive(Debug, Default, Clone, Copy)]
pub struct Detached;

impl Continuation for Detached {
	fn proceed(&mut self, site: &JoinPointSite, _: &TypeKey, _: Option<&Target>, _: &mut Args) -> Result<Value, Throwable> {
		Err(Box::new(InternalFault::new(format!("proceed() outside around advice at {site}"))))
	}
}

/// A reified interception, valid for the duration of one advice call.
pub struct JoinPoint<'a> {
	site: &'a JoinPointSite,
	target_type: &'a TypeKey,
	target: Option<&'a Target>,
	args: &'a mut Args,
	rtti: Rtti<'a>,
	chain: &'a mut (dyn Continuation + 'a),
}

impl<'a> JoinPoint<'a> {
	pub fn new(
		site: &'a JoinPointSite,
		target_type: &'a TypeKey,
		target: Option<&'a Target>,
		args: &'a mut Args,
		chain: &'a mut (dyn Continuation + 'a),
	) -> Self {
		Self {
			site,
			target_type,
			target,
			args,
			rtti: Rtti::Pending,
			chain,
		}
	}

	/// Attaches outcome information for after advice.
	pub fn with_rtti(mut self, rtti: Rtti<'a>) -> Self {
		self.rtti = rtti;
		self
	}

	/// Continues with the next around advice, or the original operation at the end of the chain.
	///
	/// May be called more than once; each call replays the remainder of the chain.
	pub fn proceed(&mut self) -> Result<Value, Throwable> {
		self.chain.proceed(self.site, self.target_type, self.target, &mut *self.args)
	}

	pub fn site(&self) -> &JoinPointSite {
		self.site
	}

	pub fn kind(&self) -> JoinPointKind {
		self.site.kind()
	}

	pub fn signature(&self) -> &MemberSignature {
		self.site.member()
	}

	pub fn declaring_type(&self) -> &TypeKey {
		self.site.declaring_type()
	}

	/// Runtime type of the target, which may differ from the declaring type.
	pub fn target_type(&self) -> &TypeKey {
		self.target_type
	}

	/// The advised object, `None` for static contexts.
	pub fn target(&self) -> Option<&Target> {
		self.target
	}

	/// Typed view of the advised object.
	pub fn target_as<T: Any>(&self) -> Option<&T> {
		self.target?.downcast_ref::<T>()
	}

	pub fn args(&self) -> &Args {
		&*self.args
	}

	pub fn args_mut(&mut self) -> &mut Args {
		&mut *self.args
	}

	pub fn rtti(&self) -> Rtti<'a> {
		self.rtti
	}

	/// Value returned by the operation, for after-returning and after advice.
	pub fn returned(&self) -> Option<&Value> {
		match self.rtti {
			Rtti::Returned(value) => Some(value),
			_ => None,
		}
	}

	/// Error raised by the operation, for after-throwing and after advice.
	pub fn thrown(&self) -> Option<&(dyn Error + Send + Sync + 'static)> {
		match self.rtti {
			Rtti::Thrown(err) => Some(err),
			_ => None,
		}
	}
}

impl fmt::Debug for JoinPoint<'_> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("JoinPoint")
			.field("site", &self.site)
			.field("target_type", &self.target_type)
			.field("has_target", &self.target.is_some())
			.field("args", &self.args)
			.finish()
	}
}

/// Call frame handed to an introduced (mixin) method.
pub struct MixinCall<'a> {
	pub target_type: &'a TypeKey,
	pub target: Option<&'a Target>,
	pub args: &'a mut Args,
	/// Owning aspect instance the mixin is bound to.
	pub aspect: Option<&'a Instance>,
}

impl MixinCall<'_> {
	/// Typed view of the owning aspect instance.
	pub fn aspect_as<T: Any>(&self) -> Option<&T> {
		self.aspect?.downcast_ref::<T>()
	}
}
