// self
use crate::{_prelude::*, obs::RefreshTrigger};

/// A span builder used around token refreshes.
#[derive(Clone, Debug)]
pub struct RefreshSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl RefreshSpan {
	/// Creates a new span tagged with what triggered the refresh and the command it runs.
	pub fn new(trigger: RefreshTrigger, command: &str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span =
				tracing::info_span!("bearer_command.refresh", trigger = trigger.as_str(), command);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (trigger, command);

			Self {}
		}
	}

	/// Enters the span for the duration of the returned guard.
	pub fn entered(self) -> RefreshSpanGuard {
		#[cfg(feature = "tracing")]
		{
			RefreshSpanGuard { guard: self.span.entered() }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = self;

			RefreshSpanGuard {}
		}
	}
}

/// RAII guard returned by [`RefreshSpan::entered`].
pub struct RefreshSpanGuard {
	#[cfg(feature = "tracing")]
	#[allow(dead_code)]
	guard: tracing::span::EnteredSpan,
}
impl Debug for RefreshSpanGuard {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("RefreshSpanGuard(..)")
	}
}
