//! Command-sourced bearer tokens for blocking HTTP transports: single-flight refresh, one-shot
//! 401 recovery, and pluggable token persistence.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod cache;
pub mod client;
pub mod command;
pub mod config;
pub mod error;
pub mod http;
pub mod obs;
pub mod registry;
pub mod sink;
#[cfg(any(test, feature = "test"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// std
	use std::sync::atomic::{AtomicUsize, Ordering};
	// self
	use crate::{
		auth::Token,
		cache::TokenCache,
		command::TokenSource,
		error::CommandError,
		sink::{MemorySink, TokenSink},
	};

	/// Scripted [`TokenSource`] that hands out queued results and counts invocations.
	///
	/// Once the queue is drained the last configured result is repeated.
	#[derive(Debug, Default)]
	pub struct ScriptedSource {
		results: Mutex<Vec<Result<String, CommandError>>>,
		last: Mutex<Option<Result<String, CommandError>>>,
		delay: Option<Duration>,
		calls: AtomicUsize,
	}
	impl ScriptedSource {
		/// Builds a source that yields the provided results in order.
		pub fn new(results: impl IntoIterator<Item = Result<String, CommandError>>) -> Self {
			let mut results = results.into_iter().collect::<Vec<_>>();

			results.reverse();

			Self { results: Mutex::new(results), ..Default::default() }
		}

		/// Builds a source that always yields `token`.
		pub fn always(token: &str) -> Self {
			Self::new([Ok(token.to_owned())])
		}

		/// Sleeps for `delay` inside every fetch, widening race windows in concurrency tests.
		pub fn with_delay(mut self, delay: Duration) -> Self {
			self.delay = Some(delay);

			self
		}

		/// Number of times [`TokenSource::fetch`] ran.
		pub fn calls(&self) -> usize {
			self.calls.load(Ordering::SeqCst)
		}
	}
	impl TokenSource for ScriptedSource {
		fn fetch(&self) -> Result<Token, CommandError> {
			self.calls.fetch_add(1, Ordering::SeqCst);

			if let Some(delay) = self.delay {
				std::thread::sleep(delay);
			}

			let next = self.results.lock().pop();
			let result = match next {
				Some(result) => {
					*self.last.lock() = Some(result.clone());

					result
				},
				None => self.last.lock().clone().unwrap_or(Err(CommandError::EmptyToken)),
			};

			result.and_then(|raw| Token::parse(raw).ok_or(CommandError::EmptyToken))
		}

		fn describe(&self) -> String {
			"scripted".into()
		}
	}

	/// Builds a cache over `source` with a recording [`MemorySink`] attached.
	pub fn build_test_cache(source: Arc<ScriptedSource>) -> (Arc<TokenCache>, Arc<MemorySink>) {
		let sink = Arc::new(MemorySink::default());
		let cache = Arc::new(TokenCache::new(source));

		cache.set_sink(Some(sink.clone() as Arc<dyn TokenSink>));

		(cache, sink)
	}
}

mod _prelude {
	pub use std::{
		collections::HashMap,
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		path::{Path, PathBuf},
		sync::Arc,
		time::Duration,
	};

	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Error as ReqwestError, blocking::Client as ReqwestClient};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::OffsetDateTime;
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _, tempfile as _};
