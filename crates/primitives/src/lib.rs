//! Shared vocabulary of the crosscut runtime.
//!
//! Everything the instance container, registry and dispatcher exchange lives here: deployment
//! models, dense index handles, type and member identity, implementation descriptors, and the
//! join point descriptor advice code receives.

pub mod descriptor;
pub mod ident;
pub mod index;
pub mod joinpoint;
pub mod kind;
pub mod model;
pub mod value;

pub use descriptor::{InterfaceDescriptor, TypeDescriptor};
pub use ident::{MemberSignature, TypeKey};
pub use index::{AspectIndex, DenseId, IndexTuple, MemberIndex, MixinIndex, u32_index};
pub use joinpoint::{Continuation, Detached, JoinPoint, JoinPointSite, MixinCall, Rtti};
pub use kind::{AdviceKind, JoinPointKind};
pub use model::{DeploymentModel, HasDeploymentModel, ParseModelError};
pub use value::{Args, Instance, InternalFault, Target, Throwable, Value, identity_of, unit};
