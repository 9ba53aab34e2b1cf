//! Thread-tagged diagnostic events.

// std
use std::{
	fmt::Arguments,
	io::{self, Write},
	thread,
};
// self
use crate::{error::CommandError, obs::Component};

const BANNER: &str =
	"============================================================";

/// Emits a DEBUG event for `component`.
pub fn debug(component: Component, message: Arguments) {
	#[cfg(feature = "tracing")]
	tracing::debug!(thread = %thread_label(), component = component.as_str(), "{message}");
	#[cfg(not(feature = "tracing"))]
	let _ = (component, message);
}

/// Emits a WARN event for `component`.
pub fn warn(component: Component, message: Arguments) {
	#[cfg(feature = "tracing")]
	tracing::warn!(thread = %thread_label(), component = component.as_str(), "{message}");
	#[cfg(not(feature = "tracing"))]
	let _ = (component, message);
}

/// Emits an ERROR event for `component`.
pub fn error(component: Component, message: Arguments) {
	#[cfg(feature = "tracing")]
	tracing::error!(thread = %thread_label(), component = component.as_str(), "{message}");
	#[cfg(not(feature = "tracing"))]
	let _ = (component, message);
}

/// Reports a token command failure at the highest severity and on stderr.
///
/// Storage front-ends tend to read any failure here as "object missing", so the report must be
/// impossible to overlook even when no subscriber is installed.
pub fn report_command_failure(command: &str, err: &CommandError) {
	let block = render_command_failure(command, err);

	error(Component::TokenCommand, format_args!("{block}"));

	let mut stderr = io::stderr().lock();
	let _ = stderr.write_all(block.as_bytes());
	let _ = stderr.flush();
}

/// Name of the current thread, falling back to its id for unnamed threads.
pub fn thread_label() -> String {
	let current = thread::current();

	match current.name() {
		Some(name) => name.to_owned(),
		None => format!("{:?}", current.id()),
	}
}

fn render_command_failure(command: &str, err: &CommandError) -> String {
	let mut block = format!(
		"\n{BANNER}\n[CRITICAL] Bearer token retrieval failed.\n\
		 Callers may misread this as a missing file and skip it.\n\
		 Command: {command}\nError: {err}"
	);

	if let CommandError::Failed { stderr, .. } = err {
		block.push_str("\nStderr: ");
		block.push_str(stderr);
	}

	block.push('\n');
	block.push_str(BANNER);
	block.push('\n');

	block
}
