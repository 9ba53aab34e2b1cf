//! Remote configuration: token command settings and transport settings.
//!
//! Both halves deserialize from one flat document (the shape a remote section of a storage
//! config takes), parsed with `serde_path_to_error` so failures name the offending field:
//!
//! ```json
//! {
//!   "url": "webdavs://dav.example.com/store",
//!   "ssl_verify": true,
//!   "timeout": 30,
//!   "bearer_token_command": "get-token --audience storage",
//!   "token": "optional-previously-saved-token"
//! }
//! ```

// std
use std::fs;
// self
use crate::{
	_prelude::*,
	command::{CommandLine, TokenCommand},
	error::ConfigError,
};

/// Token command settings for one client.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
	/// Command producing the bearer token: a shell-style string or an argument array.
	pub bearer_token_command: CommandLine,
	/// Execution budget for the command, in seconds.
	#[serde(default = "ClientConfig::default_command_timeout")]
	pub command_timeout: u64,
	/// Previously persisted token used until the remote rejects it.
	#[serde(default)]
	pub token: Option<String>,
}
impl ClientConfig {
	/// Creates settings for `command` with default timeout and no seed token.
	pub fn new(command: impl Into<CommandLine>) -> Self {
		Self {
			bearer_token_command: command.into(),
			command_timeout: Self::default_command_timeout(),
			token: None,
		}
	}

	/// Resolves the configured command.
	pub fn token_command(&self) -> Result<TokenCommand, ConfigError> {
		Ok(TokenCommand::new(self.bearer_token_command.clone())?
			.with_timeout(Duration::from_secs(self.command_timeout)))
	}

	fn default_command_timeout() -> u64 {
		TokenCommand::DEFAULT_TIMEOUT.as_secs()
	}
}

/// Transport settings for one remote.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportConfig {
	/// Remote URL; `webdav://` and `webdavs://` map to `http://` and `https://`.
	pub url: String,
	/// Verify the server certificate.
	#[serde(default = "TransportConfig::default_ssl_verify")]
	pub ssl_verify: bool,
	/// Client certificate (PEM), optionally bundling its key.
	#[serde(default)]
	pub cert_path: Option<PathBuf>,
	/// Client key (PEM) when it lives apart from the certificate.
	#[serde(default)]
	pub key_path: Option<PathBuf>,
	/// Connect + read timeout, in seconds.
	#[serde(default = "TransportConfig::default_timeout")]
	pub timeout: u64,
}
impl TransportConfig {
	/// Creates settings for `url` with verification on and the default timeout.
	pub fn new(url: impl Into<String>) -> Self {
		Self {
			url: url.into(),
			ssl_verify: Self::default_ssl_verify(),
			cert_path: None,
			key_path: None,
			timeout: Self::default_timeout(),
		}
	}

	/// Normalized base URL.
	pub fn base_url(&self) -> Result<Url, ConfigError> {
		normalize_url(&self.url)
	}

	/// Transport timeout.
	pub fn timeout(&self) -> Duration {
		Duration::from_secs(self.timeout)
	}

	/// Concatenated certificate and key PEM, when a client certificate is configured.
	pub fn identity_pem(&self) -> Result<Option<Vec<u8>>, ConfigError> {
		let Some(cert_path) = &self.cert_path else { return Ok(None) };
		let mut pem = read_pem(cert_path)?;

		if let Some(key_path) = &self.key_path {
			pem.push(b'\n');
			pem.extend(read_pem(key_path)?);
		}

		Ok(Some(pem))
	}

	const fn default_ssl_verify() -> bool {
		true
	}

	const fn default_timeout() -> u64 {
		30
	}
}

/// Complete settings for one authenticated remote.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteConfig {
	/// Transport half.
	#[serde(flatten)]
	pub transport: TransportConfig,
	/// Token command half.
	#[serde(flatten)]
	pub client: ClientConfig,
}
impl RemoteConfig {
	/// Parses a JSON document, reporting the path of the first invalid field.
	pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
		let mut de = serde_json::Deserializer::from_str(raw);

		Ok(serde_path_to_error::deserialize(&mut de)?)
	}
}

/// Maps `webdav[s]://` to `http[s]://`, drops query + fragment, and trims trailing slashes.
pub fn normalize_url(raw: &str) -> Result<Url, ConfigError> {
	let rewritten = if let Some(rest) = raw.strip_prefix("webdavs://") {
		format!("https://{rest}")
	} else if let Some(rest) = raw.strip_prefix("webdav://") {
		format!("http://{rest}")
	} else {
		raw.to_owned()
	};
	let mut url = Url::parse(&rewritten)
		.map_err(|source| ConfigError::InvalidUrl { url: raw.to_owned(), source })?;
	let path = url.path().trim_end_matches('/').to_owned();

	url.set_path(&path);
	url.set_query(None);
	url.set_fragment(None);

	Ok(url)
}

fn read_pem(path: &Path) -> Result<Vec<u8>, ConfigError> {
	fs::read(path).map_err(|source| ConfigError::Certificate { path: path.to_owned(), source })
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn remote_config_applies_defaults() {
		let config = RemoteConfig::from_json(
			r#"{"url":"webdavs://dav.example.com/store/","bearer_token_command":"get-token -q"}"#,
		)
		.expect("Minimal remote config should parse.");

		assert!(config.transport.ssl_verify);
		assert_eq!(config.transport.timeout(), Duration::from_secs(30));
		assert_eq!(config.client.command_timeout, 10);
		assert_eq!(config.client.token, None);
		assert_eq!(
			config.transport.base_url().expect("URL should normalize.").as_str(),
			"https://dav.example.com/store"
		);

		let command = config.client.token_command().expect("Command should resolve.");

		assert_eq!(command.argv(), ["get-token", "-q"]);
		assert_eq!(command.timeout(), Duration::from_secs(10));
	}

	#[test]
	fn remote_config_accepts_argv_commands_and_seed_token() {
		let config = RemoteConfig::from_json(
			r#"{
				"url": "https://dav.example.com",
				"ssl_verify": false,
				"timeout": 5,
				"bearer_token_command": ["get-token", "--remote", "a b"],
				"command_timeout": 3,
				"token": "saved"
			}"#,
		)
		.expect("Full remote config should parse.");

		assert!(!config.transport.ssl_verify);
		assert_eq!(config.client.token.as_deref(), Some("saved"));
		assert_eq!(
			config.client.token_command().expect("Command should resolve.").timeout(),
			Duration::from_secs(3)
		);
	}

	#[test]
	fn invalid_field_is_rejected_as_parse_error() {
		let err = RemoteConfig::from_json(
			r#"{"url":"https://h","bearer_token_command":"t","timeout":"slow"}"#,
		)
		.expect_err("String timeout should be rejected.");

		assert!(matches!(err, ConfigError::Parse { .. }));
		assert!(err.to_string().starts_with("Configuration is invalid"));
	}

	#[test]
	fn normalize_url_maps_webdav_schemes() {
		let http = normalize_url("webdav://host:8080/a/b//?x=1#frag").expect("URL should parse.");

		assert_eq!(http.as_str(), "http://host:8080/a/b");
		assert!(matches!(normalize_url("not a url"), Err(ConfigError::InvalidUrl { .. })));
	}

	#[test]
	fn identity_pem_concatenates_cert_and_key() {
		let dir = tempfile::tempdir().expect("Failed to create temporary directory.");
		let cert = dir.path().join("client.crt");
		let key = dir.path().join("client.key");

		fs::write(&cert, b"CERT").expect("Failed to write cert fixture.");
		fs::write(&key, b"KEY").expect("Failed to write key fixture.");

		let mut config = TransportConfig::new("https://h");

		assert_eq!(config.identity_pem().expect("No certificate is fine."), None);

		config.cert_path = Some(cert);
		config.key_path = Some(key);

		assert_eq!(
			config.identity_pem().expect("Certificate should load."),
			Some(b"CERT\nKEY".to_vec())
		);

		config.key_path = Some(dir.path().join("missing.key"));

		assert!(matches!(config.identity_pem(), Err(ConfigError::Certificate { .. })));
	}
}
