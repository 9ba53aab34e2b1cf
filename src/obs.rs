//! Observability helpers for token refreshes and request recovery.
//!
//! # Feature Flags
//!
//! - Enable `tracing` (default) to emit structured events tagged with `thread` + `component`, and
//!   spans named `bearer_command.refresh` with the `trigger` and `stage` fields.
//! - Enable `metrics` to increment the `bearer_command_refresh_total` counter for every
//!   attempt/success/failure/reuse, labeled by `trigger` + `outcome`.
//!
//! Command failures are always echoed to the process stderr, regardless of features.

mod events;
mod metrics;
mod tracing;

pub use events::*;
pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Why a refresh was requested.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RefreshTrigger {
	/// No token was cached when a request needed one.
	FirstUse,
	/// The remote answered 401 with the token that is still active.
	Unauthorized,
}
impl RefreshTrigger {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			RefreshTrigger::FirstUse => "first_use",
			RefreshTrigger::Unauthorized => "unauthorized",
		}
	}
}
impl Display for RefreshTrigger {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each refresh decision.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RefreshOutcome {
	/// The token command is about to run.
	Attempt,
	/// The command produced a new token.
	Success,
	/// The command failed; the cached token was cleared.
	Failure,
	/// Another thread already rotated the token, so no command ran.
	Reused,
}
impl RefreshOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			RefreshOutcome::Attempt => "attempt",
			RefreshOutcome::Success => "success",
			RefreshOutcome::Failure => "failure",
			RefreshOutcome::Reused => "reused",
		}
	}
}
impl Display for RefreshOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Component labels attached to every diagnostic event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Component {
	/// External command runner.
	TokenCommand,
	/// Token cache and refresh coordinator.
	TokenCache,
	/// Request wrapper driving 401 recovery.
	Client,
	/// Token persistence sinks.
	Sink,
	/// Shared client registry.
	Registry,
}
impl Component {
	/// Returns a stable label suitable for event fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Component::TokenCommand => "TokenCommand",
			Component::TokenCache => "TokenCache",
			Component::Client => "AuthenticatingClient",
			Component::Sink => "TokenSink",
			Component::Registry => "ClientRegistry",
		}
	}
}
impl Display for Component {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
