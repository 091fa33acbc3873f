//! Implementation type descriptors.
//!
//! Rust has no runtime class hierarchy, so implementations describe the interfaces they
//! provide explicitly. Hot swapping checks the new descriptor against the interfaces the
//! old implementation was required to provide.

use std::sync::Arc;

use rustc_hash::FxHashSet;

/// A named interface, optionally extending other interfaces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceDescriptor {
	pub name: Arc<str>,
	pub extends: Vec<Arc<InterfaceDescriptor>>,
}

impl InterfaceDescriptor {
	pub fn new(name: impl Into<Arc<str>>) -> Self {
		Self {
			name: name.into(),
			extends: Vec::new(),
		}
	}

	/// Adds a super-interface.
	pub fn extending(mut self, parent: Arc<InterfaceDescriptor>) -> Self {
		self.extends.push(parent);
		self
	}
}

/// Descriptor of a concrete aspect or mixin implementation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDescriptor {
	pub name: Arc<str>,
	pub interfaces: Vec<Arc<InterfaceDescriptor>>,
	pub superclass: Option<Arc<TypeDescriptor>>,
}

impl TypeDescriptor {
	pub fn new(name: impl Into<Arc<str>>) -> Self {
		Self {
			name: name.into(),
			interfaces: Vec::new(),
			superclass: None,
		}
	}

	/// Descriptor named after a Rust type.
	pub fn of<T: 'static>() -> Self {
		Self::new(std::any::type_name::<T>())
	}

	/// Adds a directly implemented interface.
	pub fn implementing(mut self, interface: Arc<InterfaceDescriptor>) -> Self {
		self.interfaces.push(interface);
		self
	}

	/// Sets the superclass.
	pub fn extending(mut self, superclass: Arc<TypeDescriptor>) -> Self {
		self.superclass = Some(superclass);
		self
	}

	/// Returns true when this type, any superclass, or any super-interface provides `interface`.
	pub fn implements(&self, interface: &str) -> bool {
		let mut seen = FxHashSet::default();
		let mut class = Some(self);
		while let Some(current) = class {
			for iface in &current.interfaces {
				if interface_search(iface, interface, &mut seen) {
					return true;
				}
			}
			class = current.superclass.as_deref();
		}
		false
	}

	/// Every interface name reachable from this type.
	pub fn all_interfaces(&self) -> Vec<Arc<str>> {
		let mut out = Vec::new();
		let mut seen = FxHashSet::default();
		let mut class = Some(self);
		let mut stack: Vec<&InterfaceDescriptor> = Vec::new();
		while let Some(current) = class {
			stack.extend(current.interfaces.iter().map(Arc::as_ref));
			class = current.superclass.as_deref();
		}
		while let Some(iface) = stack.pop() {
			if seen.insert(iface.name.clone()) {
				out.push(iface.name.clone());
				stack.extend(iface.extends.iter().map(Arc::as_ref));
			}
		}
		out.sort();
		out
	}
}

fn interface_search(iface: &InterfaceDescriptor, target: &str, seen: &mut FxHashSet<Arc<str>>) -> bool {
	if &*iface.name == target {
		return true;
	}
	if !seen.insert(iface.name.clone()) {
		return false;
	}
	iface.extends.iter().any(|parent| interface_search(parent, target, seen))
}
