//! Redacted bearer token wrapper that keeps secrets out of logs.

// crates.io
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use sha2::{Digest, Sha256};
// self
use crate::_prelude::*;

/// Opaque, non-empty bearer credential.
///
/// The value is never inspected beyond trimming surrounding whitespace. `Debug` and `Display`
/// redact it; use [`Token::fingerprint`] when a log line needs to tell two tokens apart.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Token(String);
impl Token {
	/// Header scheme prefix rendered in front of every token.
	pub const SCHEME: &'static str = "Bearer";

	/// Trims `value` and wraps it, returning `None` when nothing remains.
	pub fn parse(value: impl AsRef<str>) -> Option<Self> {
		let trimmed = value.as_ref().trim();

		if trimmed.is_empty() { None } else { Some(Self(trimmed.to_owned())) }
	}

	/// Returns the inner token value. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		&self.0
	}

	/// Renders the `Authorization` header value, `Bearer <token>`.
	pub fn header_value(&self) -> String {
		format!("{} {}", Self::SCHEME, self.0)
	}

	/// Short, non-reversible digest suitable for diagnostics.
	pub fn fingerprint(&self) -> String {
		let digest = Sha256::digest(self.0.as_bytes());

		URL_SAFE_NO_PAD.encode(&digest[..8])
	}
}
impl AsRef<str> for Token {
	fn as_ref(&self) -> &str {
		self.expose()
	}
}
impl From<Token> for String {
	fn from(value: Token) -> Self {
		value.0
	}
}
impl TryFrom<String> for Token {
	type Error = EmptyTokenError;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		Self::parse(value).ok_or(EmptyTokenError)
	}
}
impl Debug for Token {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("Token").field(&"<redacted>").finish()
	}
}
impl Display for Token {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}

/// Error returned when a persisted or supplied token is blank.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ThisError)]
#[error("Token must not be empty.")]
pub struct EmptyTokenError;
