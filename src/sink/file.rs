//! File-backed [`TokenSink`] that keeps one token per remote in a JSON document.

// std
use std::{
	collections::BTreeMap,
	fs::{self, File},
	io::Write,
};
// self
use crate::{
	_prelude::*,
	auth::Token,
	obs::{self, Component},
	sink::{SinkError, TokenSink},
};

type Snapshot = BTreeMap<String, PersistedToken>;

/// Token entry as stored on disk.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedToken {
	/// Persisted bearer token.
	pub token: Token,
	/// Instant the token was written.
	#[serde(with = "time::serde::rfc3339")]
	pub saved_at: OffsetDateTime,
}

/// Persists the token for one remote into a shared JSON file, rewriting it atomically.
///
/// Writes are skipped when the stored token already matches, and clearing a remote without a
/// stored token leaves the file untouched.
#[derive(Clone, Debug)]
pub struct FileSink {
	path: PathBuf,
	remote: String,
	write_lock: Arc<Mutex<()>>,
}
impl FileSink {
	/// Opens a sink for `remote` at `path`, creating parent directories as needed.
	pub fn open(path: impl Into<PathBuf>, remote: impl Into<String>) -> Result<Self, SinkError> {
		let path = path.into();

		Self::ensure_parent_exists(&path)?;

		Ok(Self { path, remote: remote.into(), write_lock: Default::default() })
	}

	/// Location of the backing file.
	pub fn path(&self) -> &Path {
		&self.path
	}

	/// Reads the persisted token for this remote, if any.
	pub fn load(&self) -> Result<Option<Token>, SinkError> {
		let snapshot = Self::load_snapshot(&self.path)?;

		Ok(snapshot.get(&self.remote).map(|entry| entry.token.clone()))
	}

	fn load_snapshot(path: &Path) -> Result<Snapshot, SinkError> {
		if !path.exists() {
			return Ok(Snapshot::new());
		}

		let bytes = fs::read(path).map_err(|e| SinkError::Backend {
			message: format!("Failed to read {}: {e}", path.display()),
		})?;

		if bytes.is_empty() {
			return Ok(Snapshot::new());
		}

		serde_json::from_slice(&bytes).map_err(|e| SinkError::Serialization {
			message: format!("Failed to parse {}: {e}", path.display()),
		})
	}

	fn ensure_parent_exists(path: &Path) -> Result<(), SinkError> {
		if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
			fs::create_dir_all(parent).map_err(|e| SinkError::Backend {
				message: format!("Failed to create sink directory {}: {e}", parent.display()),
			})?;
		}

		Ok(())
	}

	fn persist(&self, snapshot: &Snapshot) -> Result<(), SinkError> {
		Self::ensure_parent_exists(&self.path)?;

		let serialized =
			serde_json::to_vec_pretty(snapshot).map_err(|e| SinkError::Serialization {
				message: format!("Failed to serialize token snapshot: {e}"),
			})?;
		let mut tmp_path = self.path.clone();

		tmp_path.set_extension("tmp");

		{
			let mut file = File::create(&tmp_path).map_err(|e| SinkError::Backend {
				message: format!("Failed to create {}: {e}", tmp_path.display()),
			})?;

			file.write_all(&serialized).map_err(|e| SinkError::Backend {
				message: format!("Failed to write {}: {e}", tmp_path.display()),
			})?;
			file.sync_all().map_err(|e| SinkError::Backend {
				message: format!("Failed to sync {}: {e}", tmp_path.display()),
			})?;
		}

		fs::rename(&tmp_path, &self.path).map_err(|e| SinkError::Backend {
			message: format!("Failed to replace {}: {e}", self.path.display()),
		})
	}
}
impl TokenSink for FileSink {
	fn notify(&self, token: Option<&Token>) -> Result<(), SinkError> {
		let _guard = self.write_lock.lock();
		let mut snapshot = Self::load_snapshot(&self.path)?;

		match token {
			Some(token) => {
				if snapshot.get(&self.remote).is_some_and(|entry| &entry.token == token) {
					return Ok(());
				}

				snapshot.insert(
					self.remote.clone(),
					PersistedToken { token: token.clone(), saved_at: OffsetDateTime::now_utc() },
				);
				self.persist(&snapshot)?;
				obs::debug(
					Component::Sink,
					format_args!("Saved token for remote `{}`.", self.remote),
				);
			},
			None => {
				if snapshot.remove(&self.remote).is_none() {
					return Ok(());
				}

				self.persist(&snapshot)?;
				obs::debug(
					Component::Sink,
					format_args!("Unset token for remote `{}`.", self.remote),
				);
			},
		}

		Ok(())
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use tempfile::TempDir;
	// self
	use super::*;

	fn token(value: &str) -> Token {
		Token::parse(value).expect("Fixture token should parse.")
	}

	fn temp_sink(remote: &str) -> (TempDir, FileSink) {
		let dir = tempfile::tempdir().expect("Failed to create temporary directory.");
		let sink = FileSink::open(dir.path().join("nested/tokens.json"), remote)
			.expect("Failed to open file sink.");

		(dir, sink)
	}

	#[test]
	fn save_and_reload_round_trip() {
		let (_dir, sink) = temp_sink("storage");

		assert_eq!(sink.load().expect("Empty sink should load."), None);

		sink.notify(Some(&token("tok123"))).expect("Save should succeed.");

		let reopened =
			FileSink::open(sink.path(), "storage").expect("Failed to reopen file sink.");

		assert_eq!(reopened.load().expect("Sink should load."), Some(token("tok123")));
	}

	#[test]
	fn clear_only_touches_its_remote() {
		let (_dir, primary) = temp_sink("primary");
		let backup = FileSink::open(primary.path(), "backup").expect("Failed to open file sink.");

		primary.notify(Some(&token("p"))).expect("Save should succeed.");
		backup.notify(Some(&token("b"))).expect("Save should succeed.");
		primary.notify(None).expect("Clear should succeed.");

		assert_eq!(primary.load().expect("Sink should load."), None);
		assert_eq!(backup.load().expect("Sink should load."), Some(token("b")));
	}

	#[test]
	fn unchanged_token_is_not_rewritten() {
		let (_dir, sink) = temp_sink("storage");

		sink.notify(Some(&token("same"))).expect("Save should succeed.");

		let before = fs::read_to_string(sink.path()).expect("Sink file should exist.");

		sink.notify(Some(&token("same"))).expect("Repeated save should succeed.");

		let after = fs::read_to_string(sink.path()).expect("Sink file should exist.");

		assert_eq!(before, after);
	}

	#[test]
	fn clearing_without_file_is_a_noop() {
		let (_dir, sink) = temp_sink("storage");

		sink.notify(None).expect("Clear should succeed.");

		assert!(!sink.path().exists());
	}

	#[test]
	fn corrupt_file_reports_serialization_error() {
		let (_dir, sink) = temp_sink("storage");

		fs::write(sink.path(), b"not json").expect("Failed to write corrupt fixture.");

		assert!(matches!(sink.load(), Err(SinkError::Serialization { .. })));
		assert!(matches!(sink.notify(None), Err(SinkError::Serialization { .. })));
	}
}
