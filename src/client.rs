//! Authenticating wrapper around an [`HttpTransport`].
//!
//! Each call to [`AuthenticatingClient::send`] runs one pass of the recovery protocol:
//!
//! 1. [`TokenCache::ensure`] provides a token; failure here aborts the call, so a broken token
//!    command on a fresh client surfaces immediately.
//! 2. The request goes out with `Authorization: Bearer <token>`. Anything but 401 is returned
//!    unchanged.
//! 3. On 401 the header that was sent is handed to [`TokenCache::refresh_if_stale`], which
//!    either runs the command or reuses a token another thread already rotated in.
//! 4. If that refresh fails the original 401 is returned; a token rotation failing mid-flight
//!    never turns into an error for a caller whose client already worked.
//! 5. Otherwise the stale response is closed and the request is retried exactly once. The retry
//!    response is returned whatever its status.

// self
use crate::{
	_prelude::*,
	cache::{AuthOutcome, TokenCache},
	command::TokenSource,
	http::{HttpTransport, TransportResponse, UNAUTHORIZED},
	obs::{self, Component},
	sink::TokenSink,
};
#[cfg(feature = "reqwest")]
use crate::{
	config::RemoteConfig,
	http::ReqwestTransport,
	registry::ClientRegistry,
};

#[cfg(feature = "reqwest")]
/// Client specialized for the crate's default reqwest transport.
pub type ReqwestAuthenticatingClient = AuthenticatingClient<ReqwestTransport>;

/// Transport wrapper that attaches bearer tokens and recovers once from 401 responses.
///
/// The client is `Sync` when its transport is; share it behind an [`Arc`] and issue requests
/// from any number of threads. Only token refreshes are serialised.
pub struct AuthenticatingClient<T>
where
	T: HttpTransport,
{
	transport: T,
	cache: Arc<TokenCache>,
}
impl<T> AuthenticatingClient<T>
where
	T: HttpTransport,
{
	/// Creates a client with its own token cache over `source`.
	pub fn new(transport: T, source: Arc<dyn TokenSource>) -> Self {
		Self::with_cache(transport, Arc::new(TokenCache::new(source)))
	}

	/// Creates a client over an existing (possibly shared) token cache.
	pub fn with_cache(transport: T, cache: Arc<TokenCache>) -> Self {
		Self { transport, cache }
	}

	/// Underlying transport.
	pub fn transport(&self) -> &T {
		&self.transport
	}

	/// Token cache driving this client.
	pub fn cache(&self) -> &Arc<TokenCache> {
		&self.cache
	}

	/// Installs, replaces, or removes the persistence sink.
	pub fn set_sink(&self, sink: Option<Arc<dyn TokenSink>>) {
		self.cache.set_sink(sink);
	}

	/// Installs an externally supplied token; see [`TokenCache::update`].
	pub fn update_token(&self, token: Option<&str>) -> bool {
		self.cache.update(token)
	}

	/// Sends `request` with bearer authentication and one-shot 401 recovery.
	pub fn send(&self, request: &T::Request) -> Result<T::Response> {
		let sent = self.cache.ensure()?.header_value();
		let response = self.transport.send(request, Some(&sent)).map_err(Into::into)?;

		if response.status() != UNAUTHORIZED {
			return Ok(response);
		}

		obs::debug(Component::Client, format_args!("Received 401. Attempting recovery."));

		match self.cache.refresh_if_stale(Some(&sent)) {
			AuthOutcome::Success(token) => {
				response.close();

				self.transport.send(request, Some(&token.header_value())).map_err(Into::into)
			},
			AuthOutcome::Failure(err) => {
				obs::error(
					Component::Client,
					format_args!("Recovery failed: token refresh returned an error: {err}"),
				);

				Ok(response)
			},
		}
	}
}
#[cfg(feature = "reqwest")]
impl AuthenticatingClient<ReqwestTransport> {
	/// Builds a reqwest-backed client with a private token cache, seeded with the configured
	/// token when one is present.
	pub fn from_config(config: &RemoteConfig) -> Result<Self> {
		let transport = ReqwestTransport::from_config(&config.transport)?;
		let source = Arc::new(config.client.token_command()?);
		let client = Self::new(transport, source);

		client.update_token(config.client.token.as_deref());

		Ok(client)
	}

	/// Like [`from_config`](Self::from_config), but shares the token cache with every other
	/// remote in `registry` that uses the same token command.
	pub fn from_config_in(
		config: &RemoteConfig,
		registry: &ClientRegistry<TokenCache>,
	) -> Result<Self> {
		let transport = ReqwestTransport::from_config(&config.transport)?;
		let cache = registry.cache_for(&config.client)?;

		cache.update(config.client.token.as_deref());

		Ok(Self::with_cache(transport, cache))
	}
}
impl<T> Debug for AuthenticatingClient<T>
where
	T: HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AuthenticatingClient").field("cache", &self.cache).finish()
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::sync::Barrier;
	// self
	use super::*;
	use crate::{
		_preludet::*,
		error::{CommandError, TransportError},
		sink::MemorySink,
	};

	#[derive(Debug)]
	struct FakeResponse {
		status: u16,
		closed: Arc<Mutex<u32>>,
	}
	impl TransportResponse for FakeResponse {
		fn status(&self) -> u16 {
			self.status
		}

		fn close(self) {
			*self.closed.lock() += 1;
		}
	}

	/// Answers 200 only for headers in `accepted`; records every header it saw.
	#[derive(Default)]
	struct FakeTransport {
		accepted: Vec<String>,
		seen: Mutex<Vec<Option<String>>>,
		closed: Arc<Mutex<u32>>,
		barrier: Option<Arc<Barrier>>,
	}
	impl FakeTransport {
		fn accepting(tokens: &[&str]) -> Self {
			Self {
				accepted: tokens.iter().map(|token| format!("Bearer {token}")).collect(),
				..Default::default()
			}
		}

		fn seen(&self) -> Vec<Option<String>> {
			self.seen.lock().clone()
		}
	}
	impl HttpTransport for FakeTransport {
		type Error = TransportError;
		type Request = &'static str;
		type Response = FakeResponse;

		fn send(
			&self,
			_request: &Self::Request,
			authorization: Option<&str>,
		) -> Result<Self::Response, Self::Error> {
			let first_attempt = {
				let mut seen = self.seen.lock();

				seen.push(authorization.map(str::to_owned));

				seen.len()
			};
			let accepted = authorization
				.is_some_and(|value| self.accepted.iter().any(|accepted| accepted == value));

			// Hold the first rejected attempts until every caller has its 401 in hand.
			if let Some(barrier) = &self.barrier
				&& !accepted
				&& first_attempt <= 2
			{
				barrier.wait();
			}

			let status = if accepted { 200 } else { 401 };

			Ok(FakeResponse { status, closed: self.closed.clone() })
		}
	}

	fn client_with(
		transport: FakeTransport,
		source: Arc<ScriptedSource>,
	) -> (AuthenticatingClient<FakeTransport>, Arc<MemorySink>) {
		let (cache, sink) = build_test_cache(source);

		(AuthenticatingClient::with_cache(transport, cache), sink)
	}

	#[test]
	fn successful_request_passes_through() {
		let source = Arc::new(ScriptedSource::always("tok123"));
		let (client, sink) = client_with(FakeTransport::accepting(&["tok123"]), source.clone());
		let response = client.send(&"/data").expect("Authorized request should succeed.");

		assert_eq!(response.status, 200);
		assert_eq!(client.transport().seen(), vec![Some("Bearer tok123".to_owned())]);
		assert_eq!(sink.notifications().len(), 1);
		assert_eq!(source.calls(), 1);
	}

	#[test]
	fn first_use_failure_aborts_request() {
		let failure = CommandError::Failed { exit_code: Some(1), stderr: "denied".into() };
		let source = Arc::new(ScriptedSource::new([Err(failure.clone())]));
		let (client, sink) = client_with(FakeTransport::accepting(&[]), source);
		let err = client.send(&"/data").expect_err("Broken command should fail the request.");

		assert!(matches!(err, Error::Command(ref inner) if *inner == failure));
		assert!(client.transport().seen().is_empty());
		assert_eq!(sink.notifications(), vec![None]);
	}

	#[test]
	fn unauthorized_response_is_retried_once_with_new_token() {
		let source = Arc::new(ScriptedSource::new([Ok("old".into()), Ok("new".into())]));
		let (client, _sink) = client_with(FakeTransport::accepting(&["new"]), source.clone());
		let response = client.send(&"/data").expect("Recovered request should succeed.");

		assert_eq!(response.status, 200);
		assert_eq!(
			client.transport().seen(),
			vec![Some("Bearer old".to_owned()), Some("Bearer new".to_owned())]
		);
		assert_eq!(*client.transport().closed.lock(), 1);
		assert_eq!(source.calls(), 2);
	}

	#[test]
	fn retry_response_is_returned_even_if_still_unauthorized() {
		let source = Arc::new(ScriptedSource::new([Ok("old".into()), Ok("newer".into())]));
		let (client, _sink) = client_with(FakeTransport::accepting(&[]), source.clone());
		let response = client.send(&"/data").expect("Retry response should be surfaced.");

		assert_eq!(response.status, 401);
		assert_eq!(client.transport().seen().len(), 2);
		assert_eq!(source.calls(), 2);
	}

	#[test]
	fn refresh_failure_on_retry_path_returns_original_response() {
		let source = Arc::new(ScriptedSource::new([
			Ok("old".into()),
			Err(CommandError::Failed { exit_code: Some(2), stderr: "expired session".into() }),
		]));
		let (client, sink) = client_with(FakeTransport::accepting(&[]), source);
		let response = client.send(&"/data").expect("Retry-path failures must not raise.");

		assert_eq!(response.status, 401);
		assert_eq!(client.transport().seen(), vec![Some("Bearer old".to_owned())]);
		assert_eq!(*client.transport().closed.lock(), 0);
		assert_eq!(client.cache().current(), None);
		assert_eq!(sink.notifications().last(), Some(&None));
	}

	#[test]
	fn concurrent_stale_requests_refresh_once() {
		let source = Arc::new(ScriptedSource::new([Ok("old".into()), Ok("new".into())]));
		let transport = FakeTransport {
			barrier: Some(Arc::new(Barrier::new(2))),
			..FakeTransport::accepting(&["new"])
		};
		let (client, _sink) = client_with(transport, source.clone());
		let client = Arc::new(client);

		client.cache().ensure().expect("Initial token should be fetched.");

		let handles = (0..2)
			.map(|_| {
				let client = client.clone();

				std::thread::spawn(move || client.send(&"/data").map(|response| response.status))
			})
			.collect::<Vec<_>>();

		for handle in handles {
			let status = handle
				.join()
				.expect("Request thread should not panic.")
				.expect("Both requests should recover.");

			assert_eq!(status, 200);
		}

		assert_eq!(source.calls(), 2);
		assert_eq!(client.cache().metrics().reuses(), 1);
		assert_eq!(client.transport().seen().len(), 4);
	}

	#[test]
	fn supplied_token_is_used_without_running_command() {
		let source = Arc::new(ScriptedSource::always("from-command"));
		let (client, sink) = client_with(FakeTransport::accepting(&["seeded"]), source.clone());

		assert!(client.update_token(Some("seeded")));

		let response = client.send(&"/data").expect("Seeded token should be accepted.");

		assert_eq!(response.status, 200);
		assert_eq!(source.calls(), 0);
		assert!(sink.notifications().is_empty());
	}
}
