//! Explicit registry of shared per-command state.
//!
//! Remotes that authenticate with the same token command should share one token cache, so the
//! command runs once for all of them. The registry is owned by the application's composition
//! root and passed to whatever builds clients; nothing here is process-global.

// self
use crate::{
	_prelude::*,
	cache::TokenCache,
	config::ClientConfig,
	error::ConfigError,
	obs::{self, Component},
};

/// Map from a resolved command argument vector to shared state built for it.
#[derive(Debug)]
pub struct ClientRegistry<V> {
	entries: Mutex<HashMap<Vec<String>, Arc<V>>>,
}
impl<V> ClientRegistry<V> {
	/// Creates an empty registry.
	pub fn new() -> Self {
		Self { entries: Mutex::new(HashMap::new()) }
	}

	/// Returns the entry for `argv`, building it with `init` on first use.
	///
	/// `init` runs under the registry lock, so concurrent lookups for the same command build a
	/// single entry. A failed `init` leaves nothing behind.
	pub fn get_or_try_insert_with<E>(
		&self,
		argv: &[String],
		init: impl FnOnce() -> Result<V, E>,
	) -> Result<Arc<V>, E> {
		let mut entries = self.entries.lock();

		if let Some(existing) = entries.get(argv) {
			return Ok(existing.clone());
		}

		let value = Arc::new(init()?);

		entries.insert(argv.to_vec(), value.clone());

		Ok(value)
	}

	/// Looks up an existing entry.
	pub fn get(&self, argv: &[String]) -> Option<Arc<V>> {
		self.entries.lock().get(argv).cloned()
	}

	/// Number of registered commands.
	pub fn len(&self) -> usize {
		self.entries.lock().len()
	}

	/// Returns `true` when nothing is registered.
	pub fn is_empty(&self) -> bool {
		self.entries.lock().is_empty()
	}
}
impl<V> Default for ClientRegistry<V> {
	fn default() -> Self {
		Self::new()
	}
}
impl ClientRegistry<TokenCache> {
	/// Shared token cache for the command in `config`.
	///
	/// Entries are keyed by the resolved argument vector alone. The first registration of a
	/// command fixes its settings, so a later remote with the same command but another
	/// `command_timeout` shares the existing cache and its timeout.
	pub fn cache_for(&self, config: &ClientConfig) -> Result<Arc<TokenCache>, ConfigError> {
		let command = config.token_command()?;
		let argv = command.argv().to_vec();

		self.get_or_try_insert_with(&argv, || {
			obs::debug(
				Component::Registry,
				format_args!("Creating token cache for `{}`.", shell_words::join(&argv)),
			);

			Ok(TokenCache::new(Arc::new(command)))
		})
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn same_command_shares_one_cache() {
		let registry = ClientRegistry::<TokenCache>::new();
		let a = registry
			.cache_for(&ClientConfig::new("get-token --remote 'x y'"))
			.expect("Cache should be created.");
		let b = registry
			.cache_for(&ClientConfig::new(vec![
				"get-token".to_owned(),
				"--remote".to_owned(),
				"x y".to_owned(),
			]))
			.expect("Cache should be reused.");
		let c = registry
			.cache_for(&ClientConfig::new("get-token --remote z"))
			.expect("Cache should be created.");

		assert!(Arc::ptr_eq(&a, &b));
		assert!(!Arc::ptr_eq(&a, &c));
		assert_eq!(registry.len(), 2);
	}

	#[test]
	fn first_registration_fixes_command_timeout() {
		let registry = ClientRegistry::<TokenCache>::new();
		let mut fast = ClientConfig::new("get-token");
		let mut slow = ClientConfig::new("get-token");

		fast.command_timeout = 1;
		slow.command_timeout = 60;

		let a = registry.cache_for(&fast).expect("Cache should be created.");
		let b = registry.cache_for(&slow).expect("Cache should be reused.");

		assert!(Arc::ptr_eq(&a, &b));
		assert_eq!(registry.len(), 1);
		assert!(
			registry
				.get(&["get-token".to_owned()])
				.is_some_and(|cache| Arc::ptr_eq(&cache, &a))
		);
	}

	#[test]
	fn failed_init_is_not_cached() {
		let registry = ClientRegistry::<u32>::default();
		let argv = vec!["cmd".to_owned()];
		let err = registry
			.get_or_try_insert_with(&argv, || Err::<u32, _>("boom"))
			.expect_err("Init failure should surface.");

		assert_eq!(err, "boom");
		assert!(registry.is_empty());
		assert_eq!(
			*registry
				.get_or_try_insert_with(&argv, || Ok::<_, &str>(7))
				.expect("Second init should succeed."),
			7
		);
		assert_eq!(registry.get(&argv).as_deref(), Some(&7));
	}

	#[test]
	fn invalid_command_is_rejected_before_registration() {
		let registry = ClientRegistry::<TokenCache>::new();

		assert!(matches!(
			registry.cache_for(&ClientConfig::new("  ")),
			Err(ConfigError::EmptyCommand)
		));
		assert!(registry.is_empty());
	}
}
