//! Transport primitives wrapped by [`AuthenticatingClient`](crate::client::AuthenticatingClient).
//!
//! [`HttpTransport`] is the client's only dependency on an HTTP stack: a blocking `send` that
//! takes a reusable request plus the `Authorization` header value to attach. The client never
//! inspects bodies; it only reads [`TransportResponse::status`] and, before retrying, releases a
//! stale response through [`TransportResponse::close`].
//!
//! With the `reqwest` feature, [`ReqwestTransport`] implements the trait on top of
//! `reqwest::blocking` and is configured from [`TransportConfig`].

// crates.io
#[cfg(feature = "reqwest")]
use reqwest::{
	Identity, Method,
	blocking::{Body, Response as ReqwestResponse},
	header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue},
};
// self
use crate::_prelude::*;
#[cfg(feature = "reqwest")]
use crate::{
	config::TransportConfig,
	error::{ConfigError, TransportError},
};

/// Status code that triggers the refresh-and-retry protocol.
pub const UNAUTHORIZED: u16 = 401;

/// Response surface the client needs from a transport.
pub trait TransportResponse {
	/// HTTP status code.
	fn status(&self) -> u16;

	/// Releases the response (and its connection) without reading the body.
	fn close(self)
	where
		Self: Sized,
	{
		drop(self);
	}
}

/// Blocking HTTP transport that can resend the same request with a different `Authorization`
/// header.
///
/// Implementations must be `Send + Sync`; one client is shared by every thread that issues
/// requests, and sends run concurrently outside the refresh lock.
pub trait HttpTransport
where
	Self: Send + Sync,
{
	/// Reusable request description; the client may send it twice.
	type Request;
	/// Response handed back to callers untouched.
	type Response: TransportResponse;
	/// Transport failure, converted into the crate [`Error`].
	type Error: Into<Error>;

	/// Sends `request`, attaching `authorization` as the `Authorization` header when present and
	/// omitting the header otherwise.
	fn send(
		&self,
		request: &Self::Request,
		authorization: Option<&str>,
	) -> Result<Self::Response, Self::Error>;
}

/// Request description accepted by [`ReqwestTransport`]; `path` is resolved against the base URL.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug)]
pub struct HttpRequest {
	/// HTTP method.
	pub method: Method,
	/// Path relative to the transport's base URL.
	pub path: String,
	/// Extra headers; any `Authorization` entry is replaced by the client's.
	pub headers: HeaderMap,
	/// Optional request body, cloned for each attempt.
	pub body: Option<Vec<u8>>,
}
#[cfg(feature = "reqwest")]
impl HttpRequest {
	/// Creates a request without headers or body.
	pub fn new(method: Method, path: impl Into<String>) -> Self {
		Self { method, path: path.into(), headers: HeaderMap::new(), body: None }
	}

	/// Shorthand for a `GET` request.
	pub fn get(path: impl Into<String>) -> Self {
		Self::new(Method::GET, path)
	}

	/// Adds a header.
	pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
		self.headers.insert(name, value);

		self
	}

	/// Sets the body.
	pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
		self.body = Some(body.into());

		self
	}
}

/// [`HttpTransport`] backed by a blocking reqwest client bound to a base URL.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug)]
pub struct ReqwestTransport {
	client: ReqwestClient,
	base_url: Url,
}
#[cfg(feature = "reqwest")]
impl ReqwestTransport {
	/// Wraps an existing client.
	pub fn with_client(client: ReqwestClient, base_url: Url) -> Self {
		Self { client, base_url: directory_url(base_url) }
	}

	/// Builds the client described by `config`: TLS verification, client certificate, timeout.
	pub fn from_config(config: &TransportConfig) -> Result<Self, ConfigError> {
		let mut builder = ReqwestClient::builder()
			.timeout(config.timeout())
			.danger_accept_invalid_certs(!config.ssl_verify);

		if let Some(pem) = config.identity_pem()? {
			builder = builder.identity(Identity::from_pem(&pem)?);
		}

		Ok(Self::with_client(builder.build()?, config.base_url()?))
	}

	/// Base URL every request path is resolved against.
	pub fn base_url(&self) -> &Url {
		&self.base_url
	}

	/// Resolves `path` below the base URL.
	pub fn resolve(&self, path: &str) -> Result<Url, TransportError> {
		self.base_url.join(path.trim_start_matches('/')).map_err(TransportError::network)
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestTransport {
	fn as_ref(&self) -> &ReqwestClient {
		&self.client
	}
}
#[cfg(feature = "reqwest")]
impl HttpTransport for ReqwestTransport {
	type Error = TransportError;
	type Request = HttpRequest;
	type Response = ReqwestResponse;

	fn send(
		&self,
		request: &Self::Request,
		authorization: Option<&str>,
	) -> Result<Self::Response, Self::Error> {
		let url = self.resolve(&request.path)?;
		let mut headers = request.headers.clone();

		headers.remove(AUTHORIZATION);

		let mut builder = self.client.request(request.method.clone(), url).headers(headers);

		if let Some(value) = authorization {
			builder = builder.header(AUTHORIZATION, value);
		}
		if let Some(body) = &request.body {
			builder = builder.body(Body::from(body.clone()));
		}

		Ok(builder.send()?)
	}
}
#[cfg(feature = "reqwest")]
impl TransportResponse for ReqwestResponse {
	fn status(&self) -> u16 {
		ReqwestResponse::status(self).as_u16()
	}
}

// `Url::join` replaces the last segment unless the base path ends with a slash.
#[cfg(feature = "reqwest")]
fn directory_url(mut url: Url) -> Url {
	if !url.path().ends_with('/') {
		let path = format!("{}/", url.path());

		url.set_path(&path);
	}

	url
}
