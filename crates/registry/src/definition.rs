//! Definition records supplied by configuration or code.
//!
//! Definitions only describe; the Rust side of an aspect (its factory and method table) comes
//! from an [`crate::AspectBinding`] registered alongside.

use std::collections::BTreeMap;

use crosscut_primitives::{AdviceKind, DeploymentModel};
use serde::Deserialize;

use crate::error::{DefinitionError, DefinitionKind};

/// An aspect: its implementation, deployment model, parameters, advice and mixins.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct AspectDefinition {
	pub name: String,
	/// Name under which the implementation binding is registered.
	pub implementation: String,
	/// Deployment model text; absent or blank means per-process.
	#[serde(default)]
	pub deployment_model: Option<String>,
	#[serde(default)]
	pub parameters: BTreeMap<String, String>,
	#[serde(default, rename = "advice")]
	pub advices: Vec<AdviceDefinition>,
	#[serde(default, rename = "mixin")]
	pub mixins: Vec<MixinDefinition>,
}

impl AspectDefinition {
	pub fn new(name: impl Into<String>, implementation: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			implementation: implementation.into(),
			deployment_model: None,
			parameters: BTreeMap::new(),
			advices: Vec::new(),
			mixins: Vec::new(),
		}
	}

	pub fn with_model(mut self, model: DeploymentModel) -> Self {
		self.deployment_model = Some(model.as_str().to_string());
		self
	}

	pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.parameters.insert(key.into(), value.into());
		self
	}

	pub fn with_advice(mut self, advice: AdviceDefinition) -> Self {
		self.advices.push(advice);
		self
	}

	pub fn with_mixin(mut self, mixin: MixinDefinition) -> Self {
		self.mixins.push(mixin);
		self
	}

	/// Parsed deployment model.
	pub fn model(&self) -> Result<DeploymentModel, DefinitionError> {
		parse_model(DefinitionKind::Aspect, &self.name, self.deployment_model.as_deref(), DeploymentModel::default())
	}
}

/// One advice method of an aspect.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct AdviceDefinition {
	pub name: String,
	pub kind: AdviceKind,
	/// Pointcut expression selecting the join points this advice applies to.
	#[serde(default)]
	pub pointcut: String,
	/// Signature (canonical text or bare name) of the implementing method.
	pub method: String,
	/// Only run while the current thread is inside a flow matching this expression.
	#[serde(default)]
	pub cflow: Option<String>,
	/// After-throwing filter over the raised error.
	#[serde(default)]
	pub throwing: Option<String>,
	/// Overrides the aspect's deployment model for this advice.
	#[serde(default)]
	pub deployment_model: Option<String>,
}

impl AdviceDefinition {
	pub fn new(name: impl Into<String>, kind: AdviceKind, pointcut: impl Into<String>, method: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			kind,
			pointcut: pointcut.into(),
			method: method.into(),
			cflow: None,
			throwing: None,
			deployment_model: None,
		}
	}

	pub fn with_cflow(mut self, expression: impl Into<String>) -> Self {
		self.cflow = Some(expression.into());
		self
	}

	pub fn with_throwing(mut self, expression: impl Into<String>) -> Self {
		self.throwing = Some(expression.into());
		self
	}

	pub fn with_model(mut self, model: DeploymentModel) -> Self {
		self.deployment_model = Some(model.as_str().to_string());
		self
	}

	/// Parsed deployment model, inheriting `aspect` when unset.
	pub fn model(&self, aspect: DeploymentModel) -> Result<DeploymentModel, DefinitionError> {
		parse_model(DefinitionKind::Advice, &self.name, self.deployment_model.as_deref(), aspect)
	}
}

/// A mixin introduced by an aspect.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct MixinDefinition {
	pub name: String,
	pub implementation: String,
	/// Defaults to the owning aspect's model.
	#[serde(default)]
	pub deployment_model: Option<String>,
	/// Interfaces introduced onto the target; every replacement implementation must keep them.
	#[serde(default)]
	pub interfaces: Vec<String>,
	/// Types the mixin is introduced onto.
	#[serde(default)]
	pub pointcut: Option<String>,
	#[serde(default)]
	pub parameters: BTreeMap<String, String>,
}

impl MixinDefinition {
	pub fn new(name: impl Into<String>, implementation: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			implementation: implementation.into(),
			deployment_model: None,
			interfaces: Vec::new(),
			pointcut: None,
			parameters: BTreeMap::new(),
		}
	}

	pub fn with_model(mut self, model: DeploymentModel) -> Self {
		self.deployment_model = Some(model.as_str().to_string());
		self
	}

	pub fn with_interface(mut self, interface: impl Into<String>) -> Self {
		self.interfaces.push(interface.into());
		self
	}

	pub fn with_pointcut(mut self, expression: impl Into<String>) -> Self {
		self.pointcut = Some(expression.into());
		self
	}

	/// Parsed deployment model, inheriting `aspect` when unset.
	pub fn model(&self, aspect: DeploymentModel) -> Result<DeploymentModel, DefinitionError> {
		parse_model(DefinitionKind::Mixin, &self.name, self.deployment_model.as_deref(), aspect)
	}
}

fn parse_model(kind: DefinitionKind, name: &str, text: Option<&str>, inherited: DeploymentModel) -> Result<DeploymentModel, DefinitionError> {
	match text.map(str::trim) {
		None | Some("") => Ok(inherited),
		Some(text) => DeploymentModel::from_name(text).map_err(|source| DefinitionError::InvalidModel {
			kind,
			name: name.to_string(),
			source,
		}),
	}
}
