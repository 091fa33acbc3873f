use serde::Deserialize;
use strum_macros::{EnumString, IntoStaticStr};

/// Kind of interception site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoStaticStr)]
#[strum(serialize_all = "kebab-case")]
pub enum JoinPointKind {
	MethodExecution,
	MethodCall,
	ConstructorExecution,
	ConstructorCall,
	FieldGet,
	FieldSet,
	/// Exception handler entry.
	Handler,
	StaticInitialization,
}

impl JoinPointKind {
	pub fn as_str(self) -> &'static str {
		self.into()
	}
}

/// When an advice runs relative to the intercepted operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, IntoStaticStr, Deserialize)]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
#[serde(rename_all = "kebab-case")]
pub enum AdviceKind {
	/// Wraps the rest of the chain and decides whether to proceed.
	Around,
	/// Runs first; a failure prevents the operation.
	Before,
	/// Runs after a normal return.
	AfterReturning,
	/// Runs after a failure whose type the advice's throwing filter accepts.
	AfterThrowing,
	/// Runs after the operation regardless of outcome.
	After,
}

impl AdviceKind {
	pub fn as_str(self) -> &'static str {
		self.into()
	}
}
