//! Token persistence contracts and built-in sinks.
//!
//! The cache notifies its sink after every refresh attempt: the new token on success, `None`
//! on failure so any persisted copy can be cleared. Sinks are best-effort; failures are logged
//! as warnings and never reach request callers.

pub mod file;
pub mod memory;

pub use file::FileSink;
pub use memory::MemorySink;

// self
use crate::{
	_prelude::*,
	auth::Token,
	obs::{self, Component},
};

/// Persistence callback invoked with the token produced by a refresh, or `None` after a failed
/// refresh.
pub trait TokenSink
where
	Self: Send + Sync,
{
	/// Persists `token`, or clears any persisted token when `None`.
	fn notify(&self, token: Option<&Token>) -> Result<(), SinkError>;
}
impl<F> TokenSink for F
where
	F: Send + Sync + Fn(Option<&Token>) -> Result<(), SinkError>,
{
	fn notify(&self, token: Option<&Token>) -> Result<(), SinkError> {
		self(token)
	}
}

/// Error type produced by [`TokenSink`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum SinkError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

/// Operation label used when a sink fails.
pub(crate) const fn operation(token: Option<&Token>) -> &'static str {
	if token.is_some() { "save" } else { "clear" }
}

/// Calls `sink` and downgrades any failure to a warning.
pub(crate) fn notify_quietly(sink: Option<&dyn TokenSink>, token: Option<&Token>) {
	let Some(sink) = sink else { return };

	if let Err(e) = sink.notify(token) {
		obs::warn(Component::Sink, format_args!("Failed to {} token: {e}", operation(token)));
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn closures_are_sinks() {
		let seen = Arc::new(Mutex::new(Vec::new()));
		let recorder = seen.clone();
		let sink = move |token: Option<&Token>| -> Result<(), SinkError> {
			recorder.lock().push(token.map(|token| token.expose().to_owned()));

			Ok(())
		};
		let token = Token::parse("abc").expect("Fixture token should parse.");

		notify_quietly(Some(&sink as &dyn TokenSink), Some(&token));
		notify_quietly(Some(&sink as &dyn TokenSink), None);

		assert_eq!(*seen.lock(), vec![Some("abc".to_owned()), None]);
	}

	#[test]
	fn sink_failures_are_swallowed() {
		let sink = |_: Option<&Token>| -> Result<(), SinkError> {
			Err(SinkError::Backend { message: "read-only config".into() })
		};

		notify_quietly(Some(&sink as &dyn TokenSink), None);
		notify_quietly(None, None);
	}

	#[test]
	fn operation_labels_follow_token_presence() {
		let token = Token::parse("abc").expect("Fixture token should parse.");

		assert_eq!(operation(Some(&token)), "save");
		assert_eq!(operation(None), "clear");
	}
}
