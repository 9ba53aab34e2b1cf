//! External token commands and the [`TokenSource`] seam the cache refreshes through.
//!
//! A [`TokenCommand`] is an argument vector executed directly (never through a shell) with a
//! bounded execution time. Standard output is decoded as UTF-8, trimmed, and must be non-empty;
//! a non-zero exit carries the captured standard error back to the caller. Every failure is
//! reported loudly through [`obs::report_command_failure`] before it propagates.

mod exec;

// self
use crate::{
	_prelude::*,
	auth::Token,
	error::{CommandError, ConfigError},
	obs::{self, Component},
};

/// Producer of fresh bearer tokens.
///
/// The cache calls [`fetch`](TokenSource::fetch) while holding its refresh lock, so an
/// implementation never observes concurrent invocations from the same cache.
pub trait TokenSource
where
	Self: Send + Sync,
{
	/// Produces a new token or the reason none could be obtained.
	fn fetch(&self) -> Result<Token, CommandError>;

	/// Human-readable label used in diagnostics.
	fn describe(&self) -> String;
}

/// Raw command as it appears in configuration: a shell-style line or an argument vector.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CommandLine {
	/// Split with shell quoting rules before execution.
	Line(String),
	/// Used as-is.
	Argv(Vec<String>),
}
impl CommandLine {
	/// Resolves the argument vector, rejecting empty commands and unbalanced quoting.
	pub fn to_argv(&self) -> Result<Vec<String>, ConfigError> {
		let argv = match self {
			Self::Line(line) => shell_words::split(line).map_err(|source| {
				ConfigError::InvalidCommand { command: line.clone(), source }
			})?,
			Self::Argv(argv) => argv.clone(),
		};

		match argv.first() {
			Some(program) if !program.trim().is_empty() => Ok(argv),
			_ => Err(ConfigError::EmptyCommand),
		}
	}
}
impl From<&str> for CommandLine {
	fn from(value: &str) -> Self {
		Self::Line(value.to_owned())
	}
}
impl From<String> for CommandLine {
	fn from(value: String) -> Self {
		Self::Line(value)
	}
}
impl From<Vec<String>> for CommandLine {
	fn from(value: Vec<String>) -> Self {
		Self::Argv(value)
	}
}

/// Token-retrieval command with an execution timeout.
#[derive(Clone, PartialEq, Eq)]
pub struct TokenCommand {
	argv: Vec<String>,
	timeout: Duration,
}
impl TokenCommand {
	/// Execution budget applied when none is configured.
	pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

	/// Builds a command from a shell-style line or argument vector.
	pub fn new(command: impl Into<CommandLine>) -> Result<Self, ConfigError> {
		let argv = command.into().to_argv()?;

		Ok(Self { argv, timeout: Self::DEFAULT_TIMEOUT })
	}

	/// Overrides the execution budget.
	pub fn with_timeout(mut self, timeout: Duration) -> Self {
		self.timeout = timeout;

		self
	}

	/// Resolved argument vector; the first element is the program.
	pub fn argv(&self) -> &[String] {
		&self.argv
	}

	/// Configured execution budget.
	pub fn timeout(&self) -> Duration {
		self.timeout
	}

	/// Runs the command and parses its output into a [`Token`].
	///
	/// Failures are reported at ERROR level and on stderr, then returned unchanged.
	pub fn execute(&self) -> Result<Token, CommandError> {
		obs::debug(
			Component::TokenCommand,
			format_args!("Running token command `{}`.", self.describe()),
		);

		let result = exec::run(&self.argv, self.timeout).and_then(|output| {
			Token::parse(output).ok_or(CommandError::EmptyToken)
		});

		if let Err(err) = &result {
			obs::report_command_failure(&self.describe(), err);
		}

		result
	}
}
impl TokenSource for TokenCommand {
	fn fetch(&self) -> Result<Token, CommandError> {
		self.execute()
	}

	fn describe(&self) -> String {
		shell_words::join(&self.argv)
	}
}
impl Debug for TokenCommand {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenCommand")
			.field("program", &self.argv[0])
			.field("args", &(self.argv.len() - 1))
			.field("timeout", &self.timeout)
			.finish()
	}
}
