//! Type and member identity.

use std::fmt;
use std::sync::Arc;

/// Identity of a target type.
///
/// Two keys are equal when their names are equal. Cloning is a reference count bump.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TypeKey(Arc<str>);

impl TypeKey {
	/// Key for an arbitrary type name.
	pub fn named(name: impl Into<Arc<str>>) -> Self {
		Self(name.into())
	}

	/// Key for a Rust type, named by [`std::any::type_name`].
	pub fn of<T: ?Sized + 'static>() -> Self {
		Self(Arc::from(std::any::type_name::<T>()))
	}

	pub fn name(&self) -> &str {
		&self.0
	}

	/// Last path segment of the name.
	pub fn simple_name(&self) -> &str {
		self.0.rsplit("::").next().unwrap_or(&self.0)
	}
}

impl fmt::Debug for TypeKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "TypeKey({})", self.0)
	}
}

impl fmt::Display for TypeKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl From<&str> for TypeKey {
	fn from(value: &str) -> Self {
		Self::named(value)
	}
}

/// Signature of a method, constructor or field.
///
/// The canonical text form `name(p1,p2)->ret` drives the deterministic method sort, so the same
/// signature always lands at the same [`crate::MemberIndex`].
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct MemberSignature {
	name: Arc<str>,
	params: Arc<[Arc<str>]>,
	returns: Option<Arc<str>>,
}

impl MemberSignature {
	/// Signature with no parameters and no return type.
	pub fn new(name: impl Into<Arc<str>>) -> Self {
		Self {
			name: name.into(),
			params: Arc::from(Vec::new()),
			returns: None,
		}
	}

	/// Replaces the parameter type list.
	pub fn with_params<I, S>(mut self, params: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<Arc<str>>,
	{
		self.params = params.into_iter().map(Into::into).collect::<Vec<_>>().into();
		self
	}

	/// Sets the return type.
	pub fn with_returns(mut self, returns: impl Into<Arc<str>>) -> Self {
		self.returns = Some(returns.into());
		self
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn params(&self) -> &[Arc<str>] {
		&self.params
	}

	pub fn returns(&self) -> Option<&str> {
		self.returns.as_deref()
	}

	/// Canonical text form used for sorting and lookups.
	pub fn canonical(&self) -> String {
		let mut out = String::with_capacity(self.name.len() + 8);
		out.push_str(&self.name);
		out.push('(');
		for (i, param) in self.params.iter().enumerate() {
			if i > 0 {
				out.push(',');
			}
			out.push_str(param);
		}
		out.push(')');
		if let Some(ret) = &self.returns {
			out.push_str("->");
			out.push_str(ret);
		}
		out
	}
}

impl PartialOrd for MemberSignature {
	fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
		Some(self.cmp(other))
	}
}

impl Ord for MemberSignature {
	fn cmp(&self, other: &Self) -> std::cmp::Ordering {
		self.name
			.cmp(&other.name)
			.then_with(|| self.params.cmp(&other.params))
			.then_with(|| self.returns.cmp(&other.returns))
	}
}

impl fmt::Debug for MemberSignature {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "MemberSignature({})", self.canonical())
	}
}

impl fmt::Display for MemberSignature {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.canonical())
	}
}

impl From<&str> for MemberSignature {
	fn from(value: &str) -> Self {
		Self::new(value)
	}
}
