//! Token cache with a single-flight refresh coordinator.
//!
//! [`TokenCache`] owns the token currently rendered into outgoing `Authorization` headers and
//! the one mutex that serialises token command executions for a client. Readers take the
//! published token without touching the refresh mutex; a refresh (and the command it runs)
//! happens entirely inside the mutex, and the published token is only ever written while the
//! mutex is held. Callers that lose the race for the mutex re-check the token after acquiring it
//! so a refresh finished by another thread is reused instead of repeated.

mod metrics;

pub use metrics::RefreshMetrics;

// crates.io
use parking_lot::MutexGuard;
// self
use crate::{
	_prelude::*,
	auth::Token,
	command::TokenSource,
	error::CommandError,
	obs::{self, Component, RefreshOutcome, RefreshSpan, RefreshTrigger},
	sink::{self, TokenSink},
};

/// Result of a refresh attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AuthOutcome {
	/// A usable token is active, either freshly fetched or rotated in by another thread.
	Success(Token),
	/// The token command failed; the cached token has been cleared.
	Failure(CommandError),
}
impl AuthOutcome {
	/// Converts the outcome into a [`Result`] for callers that propagate failures.
	pub fn into_result(self) -> Result<Token, CommandError> {
		match self {
			Self::Success(token) => Ok(token),
			Self::Failure(err) => Err(err),
		}
	}

	/// Returns `true` for [`AuthOutcome::Success`].
	pub fn is_success(&self) -> bool {
		matches!(self, Self::Success(_))
	}
}

/// Current token plus the refresh coordinator for one client.
pub struct TokenCache {
	source: Arc<dyn TokenSource>,
	current: RwLock<Option<Token>>,
	refresh_lock: Mutex<()>,
	sink: RwLock<Option<Arc<dyn TokenSink>>>,
	metrics: RefreshMetrics,
}
impl TokenCache {
	/// Creates an empty cache that refreshes through `source`.
	pub fn new(source: Arc<dyn TokenSource>) -> Self {
		Self {
			source,
			current: RwLock::new(None),
			refresh_lock: Mutex::new(()),
			sink: RwLock::new(None),
			metrics: RefreshMetrics::default(),
		}
	}

	/// Attaches a persistence sink.
	pub fn with_sink(self, sink: Arc<dyn TokenSink>) -> Self {
		self.set_sink(Some(sink));

		self
	}

	/// Installs, replaces, or removes the persistence sink.
	pub fn set_sink(&self, sink: Option<Arc<dyn TokenSink>>) {
		*self.sink.write() = sink;
	}

	/// Token currently rendered into outgoing requests.
	pub fn current(&self) -> Option<Token> {
		self.current.read().clone()
	}

	/// Active `Authorization` header value, `Bearer <token>`, when a token is cached.
	pub fn header_value(&self) -> Option<String> {
		self.current.read().as_ref().map(Token::header_value)
	}

	/// Counters describing command executions driven by this cache.
	pub fn metrics(&self) -> &RefreshMetrics {
		&self.metrics
	}

	/// Returns the cached token, running the token command first if none is cached.
	///
	/// Concurrent callers on a cold cache block on the refresh lock; exactly one of them runs
	/// the command and the rest observe its result.
	pub fn ensure(&self) -> Result<Token, CommandError> {
		if let Some(token) = self.current() {
			return Ok(token);
		}

		let guard = self.refresh_lock.lock();

		if let Some(token) = self.current() {
			return Ok(token);
		}

		self.refresh_locked(&guard, RefreshTrigger::FirstUse).into_result()
	}

	/// Re-checks the token after the remote rejected `sent_header`.
	///
	/// Runs the token command only when the active header is still the one that was rejected
	/// (or no token is active). When another thread rotated the token in the meantime, its
	/// token is returned without running the command again.
	pub fn refresh_if_stale(&self, sent_header: Option<&str>) -> AuthOutcome {
		let guard = self.refresh_lock.lock();

		match self.current() {
			Some(token) if sent_header != Some(token.header_value().as_str()) => {
				self.metrics.record_reuse();
				obs::record_refresh_outcome(RefreshTrigger::Unauthorized, RefreshOutcome::Reused);
				obs::debug(
					Component::TokenCache,
					format_args!("Token already refreshed by another thread; reusing it."),
				);

				AuthOutcome::Success(token)
			},
			_ => self.refresh_locked(&guard, RefreshTrigger::Unauthorized),
		}
	}

	/// Replaces the cached token with an externally supplied one.
	///
	/// Surrounding whitespace is trimmed before use, so `" X "` installs `X`. Blank or absent
	/// values are ignored, as is a value equal to the cached token after trimming. The sink is
	/// never notified. Returns `true` when the token was replaced.
	pub fn update(&self, token: Option<&str>) -> bool {
		let Some(token) = token.and_then(Token::parse) else { return false };
		let _guard = self.refresh_lock.lock();
		let mut current = self.current.write();

		if current.as_ref() == Some(&token) {
			return false;
		}

		obs::debug(
			Component::TokenCache,
			format_args!("Installing supplied token {}.", token.fingerprint()),
		);

		*current = Some(token);

		true
	}

	// The guard parameter proves the caller holds `refresh_lock`.
	fn refresh_locked(
		&self,
		_guard: &MutexGuard<'_, ()>,
		trigger: RefreshTrigger,
	) -> AuthOutcome {
		let command = self.source.describe();
		let _span = RefreshSpan::new(trigger, &command).entered();

		obs::debug(Component::TokenCache, format_args!("Refreshing token via `{command}`."));
		obs::record_refresh_outcome(trigger, RefreshOutcome::Attempt);
		self.metrics.record_attempt();

		let sink = self.sink.read().clone();

		match self.source.fetch() {
			Ok(token) => {
				*self.current.write() = Some(token.clone());

				sink::notify_quietly(sink.as_deref(), Some(&token));
				self.metrics.record_success();
				obs::record_refresh_outcome(trigger, RefreshOutcome::Success);
				obs::debug(
					Component::TokenCache,
					format_args!("Token refreshed successfully ({}).", token.fingerprint()),
				);

				AuthOutcome::Success(token)
			},
			Err(err) => {
				*self.current.write() = None;

				sink::notify_quietly(sink.as_deref(), None);
				self.metrics.record_failure();
				obs::record_refresh_outcome(trigger, RefreshOutcome::Failure);

				AuthOutcome::Failure(err)
			},
		}
	}
}
impl Debug for TokenCache {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenCache")
			.field("source", &self.source.describe())
			.field("token_set", &self.current.read().is_some())
			.field("sink_set", &self.sink.read().is_some())
			.field("metrics", &self.metrics)
			.finish()
	}
}
