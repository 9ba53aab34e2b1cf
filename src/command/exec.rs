//! Child process execution with captured output and a hard deadline.
//!
//! The deadline covers the whole run: waiting for the child and collecting its output. A
//! background process that inherits the pipes cannot keep a refresh alive past the budget.

// std
use std::{
	io::{ErrorKind, Read},
	process::{Child, Command, ExitStatus, Stdio},
	sync::mpsc::{self, Receiver, RecvTimeoutError},
	thread,
	time::Instant,
};
// self
use crate::{_prelude::*, error::CommandError};

type PipeOutput = Receiver<std::io::Result<Vec<u8>>>;

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Runs `argv` directly and returns its standard output on success.
pub(super) fn run(argv: &[String], timeout: Duration) -> Result<String, CommandError> {
	let (program, args) =
		argv.split_first().ok_or(CommandError::NotFound { program: String::new() })?;
	let deadline = Instant::now() + timeout;
	let mut child = Command::new(program)
		.args(args)
		.stdin(Stdio::null())
		.stdout(Stdio::piped())
		.stderr(Stdio::piped())
		.spawn()
		.map_err(|e| match e.kind() {
			ErrorKind::NotFound => CommandError::NotFound { program: program.clone() },
			_ => unexpected(format!("failed to spawn `{program}`: {e}")),
		})?;
	let stdout = drain(child.stdout.take());
	let stderr = drain(child.stderr.take());
	let status = wait_with_deadline(&mut child, deadline, timeout)?;
	let stdout = collect(stdout, deadline, timeout)?;
	let stderr = collect(stderr, deadline, timeout)?;

	if !status.success() {
		return Err(CommandError::Failed {
			exit_code: status.code(),
			stderr: String::from_utf8_lossy(&stderr).trim().into(),
		});
	}

	String::from_utf8(stdout).map_err(|e| unexpected(format!("output is not valid UTF-8: {e}")))
}

fn wait_with_deadline(
	child: &mut Child,
	deadline: Instant,
	timeout: Duration,
) -> Result<ExitStatus, CommandError> {
	loop {
		match child.try_wait() {
			Ok(Some(status)) => return Ok(status),
			Ok(None) if Instant::now() >= deadline => {
				let _ = child.kill();
				let _ = child.wait();

				return Err(CommandError::Timeout { timeout });
			},
			Ok(None) => thread::sleep(POLL_INTERVAL),
			Err(e) => return Err(unexpected(format!("failed to wait for child: {e}"))),
		}
	}
}

// Pipes are drained on their own threads so a chatty child cannot block on a full buffer.
// A reader still blocked when the deadline passes is left to finish on its own.
fn drain<R>(pipe: Option<R>) -> Option<PipeOutput>
where
	R: 'static + Send + Read,
{
	let mut pipe = pipe?;
	let (tx, rx) = mpsc::channel();

	thread::spawn(move || {
		let mut buf = Vec::new();
		let read = pipe.read_to_end(&mut buf).map(|_| buf);

		let _ = tx.send(read);
	});

	Some(rx)
}

fn collect(
	output: Option<PipeOutput>,
	deadline: Instant,
	timeout: Duration,
) -> Result<Vec<u8>, CommandError> {
	let Some(output) = output else { return Ok(Vec::new()) };

	match output.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
		Ok(read) => read.map_err(|e| unexpected(format!("failed to read child output: {e}"))),
		Err(RecvTimeoutError::Timeout) => Err(CommandError::Timeout { timeout }),
		Err(RecvTimeoutError::Disconnected) => Err(unexpected("output reader panicked".into())),
	}
}

fn unexpected(message: String) -> CommandError {
	CommandError::Unexpected { message }
}
