//! Around advice chain.

use std::sync::Arc;

use crosscut_primitives::{Args, Continuation, InternalFault, JoinPoint, JoinPointSite, Target, Throwable, TypeKey, Value};
use crosscut_registry::AdviceDef;
use tracing::{debug, trace};

use crate::dispatcher::Dispatcher;
use crate::error::DispatchError;

/// Continuation threading a join point through around advice and finally the original
/// operation.
///
/// Each `proceed` moves the cursor one link down and restores it on return, so an advice may
/// proceed any number of times and every call replays the rest of the chain. The first
/// machinery failure is recorded; from then on every `proceed` fails, and the caller of the
/// join point sees the recorded failure whatever the advice returned.
pub(crate) struct AroundChain<'d, F> {
	dispatcher: &'d Dispatcher,
	around: &'d [Arc<AdviceDef>],
	cursor: usize,
	original: F,
	fault: Option<DispatchError>,
}

impl<'d, F> AroundChain<'d, F>
where
	F: FnMut(&mut Args) -> Result<Value, Throwable>,
{
	pub(crate) fn new(dispatcher: &'d Dispatcher, around: &'d [Arc<AdviceDef>], original: F) -> Self {
		Self {
			dispatcher,
			around,
			cursor: 0,
			original,
			fault: None,
		}
	}

	pub(crate) fn into_fault(self) -> Option<DispatchError> {
		self.fault
	}

	fn record(&mut self, fault: DispatchError) -> Throwable {
		debug!(error = %fault, cursor = self.cursor, "dispatch.chain.fault");
		let thrown = Box::new(fault.to_fault());
		if self.fault.is_none() {
			self.fault = Some(fault);
		}
		thrown
	}

	fn step(&mut self, site: &JoinPointSite, target_type: &TypeKey, target: Option<&Target>, args: &mut Args) -> Result<Value, Throwable> {
		let around = self.around;
		while let Some(advice) = around.get(self.cursor) {
			self.cursor += 1;
			if !self.dispatcher.gate_open(advice) {
				trace!(aspect = %advice.aspect, advice = %advice.name, "dispatch.around: cflow inactive");
				continue;
			}
			let (instance, call) = match self.dispatcher.bind_advice(advice, target_type, target, "proceed") {
				Ok(bound) => bound,
				Err(fault) => return Err(self.record(fault)),
			};
			trace!(aspect = %advice.aspect, advice = %advice.name, "dispatch.around");
			let mut jp = JoinPoint::new(site, target_type, target, args, self);
			return call(&instance, &mut jp);
		}
		(self.original)(args)
	}
}

impl<F> Continuation for AroundChain<'_, F>
where
	F: FnMut(&mut Args) -> Result<Value, Throwable>,
{
	fn proceed(&mut self, site: &JoinPointSite, target_type: &TypeKey, target: Option<&Target>, args: &mut Args) -> Result<Value, Throwable> {
		if let Some(fault) = &self.fault {
			return Err(Box::new(fault.to_fault()));
		}
		let entered = self.cursor;
		let result = self.step(site, target_type, target, args);
		self.cursor = entered;
		match result {
			Err(err) if self.fault.is_none() => match err.downcast::<InternalFault>() {
				Ok(fault) => Err(self.record(DispatchError::Fault(*fault))),
				Err(err) => Err(err),
			},
			result => result,
		}
	}
}
