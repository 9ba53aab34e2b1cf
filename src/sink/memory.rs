//! In-memory [`TokenSink`] that records every notification, for tests and demos.

// self
use crate::{
	_prelude::*,
	auth::Token,
	sink::{SinkError, TokenSink},
};

/// Records notifications in arrival order.
#[derive(Clone, Debug, Default)]
pub struct MemorySink(Arc<RwLock<Vec<Option<Token>>>>);
impl MemorySink {
	/// Every notification received so far, oldest first.
	pub fn notifications(&self) -> Vec<Option<Token>> {
		self.0.read().clone()
	}

	/// Most recently persisted state: `Some` after a save, `None` after a clear or before any
	/// notification.
	pub fn current(&self) -> Option<Token> {
		self.0.read().last().cloned().flatten()
	}
}
impl TokenSink for MemorySink {
	fn notify(&self, token: Option<&Token>) -> Result<(), SinkError> {
		self.0.write().push(token.cloned());

		Ok(())
	}
}
