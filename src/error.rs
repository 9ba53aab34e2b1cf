//! Crate-level error types shared across the command provider, cache, sinks, and transports.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Token command failed while acquiring the first token for a request.
	#[error(transparent)]
	Command(#[from] CommandError),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (DNS, TCP, TLS).
	#[error(transparent)]
	Transport(#[from] TransportError),
}

/// Failures raised while running the token-retrieval command.
///
/// These are the only failures that can escape [`TokenCache::ensure`](crate::cache::TokenCache::ensure).
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum CommandError {
	/// The program could not be located.
	#[error("Token command `{program}` was not found.")]
	NotFound {
		/// Program name (first argv element).
		program: String,
	},
	/// The command did not finish within its execution budget.
	#[error("Token command timed out after {timeout:?}.")]
	Timeout {
		/// Budget that elapsed before the child was killed.
		timeout: Duration,
	},
	/// The command exited unsuccessfully.
	#[error("Token command failed with exit code {}: {stderr}", display_exit_code(.exit_code))]
	Failed {
		/// Exit code, or `None` when the child was terminated by a signal.
		exit_code: Option<i32>,
		/// Trimmed standard error captured from the child.
		stderr: String,
	},
	/// The command succeeded but printed nothing usable.
	#[error("Token command executed successfully but returned an empty token.")]
	EmptyToken,
	/// Any other failure (spawn permissions, pipe errors, non UTF-8 output).
	#[error("Token command failed unexpectedly: {message}.")]
	Unexpected {
		/// Human-readable error payload.
		message: String,
	},
}

/// Configuration and validation failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// The token command is empty.
	#[error("Bearer token command must be a non-empty command.")]
	EmptyCommand,
	/// The token command string could not be split into arguments.
	#[error("Bearer token command `{command}` cannot be split into arguments.")]
	InvalidCommand {
		/// Raw command string.
		command: String,
		/// Underlying quoting failure.
		#[source]
		source: shell_words::ParseError,
	},
	/// Remote URL cannot be parsed.
	#[error("Remote URL `{url}` is invalid.")]
	InvalidUrl {
		/// Raw URL string.
		url: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Client certificate or key could not be read.
	#[error("Client certificate `{}` could not be loaded.", path.display())]
	Certificate {
		/// Offending file.
		path: PathBuf,
		/// Underlying IO failure.
		#[source]
		source: std::io::Error,
	},
	/// Configuration document could not be deserialized.
	#[error("Configuration is invalid at `{path}`.")]
	Parse {
		/// Dotted path to the offending field.
		path: String,
		/// Underlying JSON failure.
		#[source]
		source: serde_json::Error,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}
impl From<serde_path_to_error::Error<serde_json::Error>> for ConfigError {
	fn from(e: serde_path_to_error::Error<serde_json::Error>) -> Self {
		let path = e.path().to_string();

		Self::Parse { path, source: e.into_inner() }
	}
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the remote endpoint.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the remote endpoint.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}

fn display_exit_code(code: &Option<i32>) -> String {
	code.map_or_else(|| "<signal>".into(), |code| code.to_string())
}
