//! Transport primitives for provider API calls.
//!
//! [`HttpTransport`] is the proxy's only dependency on an HTTP stack. Discovery and token
//! minting call it directly with the app token; proxied release calls go through
//! [`AuthenticatingTransport`](crate::transport::AuthenticatingTransport), which decorates
//! the same trait object with installation tokens.

// std
use std::time::Duration as StdDuration;
// crates.io
use reqwest::{
	Method, Request, Response,
	header::{ACCEPT, AUTHORIZATION, HeaderName, HeaderValue, USER_AGENT},
};
use serde::de::DeserializeOwned;
// self
use crate::{
	_prelude::*,
	auth::{AccessToken, RepoRef},
	discovery::InstallationId,
	error::{ConfigError, TransportError, UpstreamError},
};

/// Boxed future returned by [`HttpTransport::execute`].
pub type TransportFuture<'a> =
	Pin<Box<dyn Future<Output = Result<Response, TransportError>> + 'a + Send>>;

/// Media type for provider JSON payloads.
pub const PROVIDER_JSON: &str = "application/vnd.github+json";
/// Pinned provider REST API version.
pub const PROVIDER_API_VERSION: &str = "2022-11-28";

const API_VERSION_HEADER: HeaderName = HeaderName::from_static("x-github-api-version");
const CONNECT_TIMEOUT: StdDuration = StdDuration::from_secs(10);

/// Executes fully built requests against the network.
///
/// Implementations must be `Send + Sync + 'static` so one instance can be shared by the
/// broker, every token source, and the router. Returned futures must be `Send` so handler
/// futures stay spawnable.
pub trait HttpTransport
where
	Self: 'static + Send + Sync,
{
	/// Sends `request` and resolves once response headers are available.
	fn execute(&self, request: Request) -> TransportFuture<'_>;
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
///
/// Redirects are followed with reqwest's default policy: asset downloads answer with a
/// redirect to storage, and reqwest drops the `Authorization` header when the redirect
/// leaves the provider host.
#[derive(Clone, Debug)]
pub struct ReqwestTransport(pub ReqwestClient);
impl ReqwestTransport {
	/// Builds the default client: rustls, crate user agent, bounded connect time.
	pub fn new() -> Result<Self, ConfigError> {
		let client = ReqwestClient::builder()
			.user_agent(user_agent())
			.connect_timeout(CONNECT_TIMEOUT)
			.build()?;

		Ok(Self(client))
	}
}
impl HttpTransport for ReqwestTransport {
	fn execute(&self, request: Request) -> TransportFuture<'_> {
		let endpoint = endpoint_label(request.method(), request.url());

		Box::pin(async move {
			self.0.execute(request).await.map_err(|e| TransportError::network(endpoint, e))
		})
	}
}

/// Provider API root plus the endpoint paths the proxy consumes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Endpoints {
	base: Url,
}
impl Endpoints {
	/// Parses and validates the API root.
	pub fn new(base: &str) -> Result<Self, ConfigError> {
		let url = Url::parse(base)
			.map_err(|source| ConfigError::InvalidBaseUrl { url: base.to_owned(), source })?;

		if url.cannot_be_a_base() {
			return Err(ConfigError::InvalidBaseUrl {
				url: base.to_owned(),
				source: url::ParseError::RelativeUrlWithCannotBeABaseBase,
			});
		}

		Ok(Self { base: url })
	}

	/// API root.
	pub fn base(&self) -> &Url {
		&self.base
	}

	/// `GET /app/installations`.
	pub fn app_installations(&self) -> Url {
		self.join(&["app", "installations"])
	}

	/// `POST /app/installations/{id}/access_tokens`.
	pub fn installation_access_tokens(&self, installation: InstallationId) -> Url {
		self.join(&["app", "installations", &installation.to_string(), "access_tokens"])
	}

	/// `GET /repos/{owner}/{repo}/installation`.
	pub fn repo_installation(&self, repo: &RepoRef) -> Url {
		self.join(&["repos", repo.owner.as_ref(), repo.repo.as_ref(), "installation"])
	}

	/// `GET /repos/{owner}/{repo}/releases/tags/{tag}`.
	pub fn release_by_tag(&self, repo: &RepoRef, tag: &str) -> Url {
		self.join(&["repos", repo.owner.as_ref(), repo.repo.as_ref(), "releases", "tags", tag])
	}

	fn join(&self, segments: &[&str]) -> Url {
		let mut url = self.base.clone();

		// `new` rejects cannot-be-a-base URLs, so the segments are always writable.
		if let Ok(mut path) = url.path_segments_mut() {
			path.pop_if_empty().extend(segments);
		}

		url
	}
}

/// Builds a provider API request carrying the JSON media type and pinned API version.
pub fn provider_request(method: Method, url: Url) -> Request {
	let mut request = Request::new(method, url);
	let headers = request.headers_mut();

	headers.insert(ACCEPT, HeaderValue::from_static(PROVIDER_JSON));
	headers.insert(API_VERSION_HEADER, HeaderValue::from_static(PROVIDER_API_VERSION));

	if let Ok(agent) = HeaderValue::from_str(&user_agent()) {
		headers.insert(USER_AGENT, agent);
	}

	request
}

/// Sets `Authorization: Bearer <token>` and marks the header sensitive.
pub fn authorize(request: &mut Request, token: &AccessToken) -> Result<()> {
	let mut value = HeaderValue::from_str(&token.bearer())
		.map_err(|_| Error::Authorization { reason: "credential is not a valid header value" })?;

	value.set_sensitive(true);
	request.headers_mut().insert(AUTHORIZATION, value);

	Ok(())
}

/// Human-readable endpoint label used in errors and logs.
pub fn endpoint_label(method: &Method, url: &Url) -> String {
	format!("{method} {url}")
}

/// Fails with [`UpstreamError::Status`] unless the response is a success.
pub fn ensure_success(
	response: Response,
	endpoint: &str,
	tenant: Option<&str>,
) -> Result<Response, UpstreamError> {
	let status = response.status();

	if status.is_success() {
		return Ok(response);
	}

	Err(UpstreamError::Status {
		endpoint: endpoint.to_owned(),
		status: status.as_u16(),
		tenant: tenant.map(ToOwned::to_owned),
	})
}

/// Checks the status, buffers the (small) JSON body, and decodes it with path-aware errors.
pub async fn read_json<T>(response: Response, endpoint: &str, tenant: Option<&str>) -> Result<T>
where
	T: DeserializeOwned,
{
	let response = ensure_success(response, endpoint, tenant)?;
	let body = response
		.bytes()
		.await
		.map_err(|e| TransportError::network(endpoint, e).with_tenant(tenant))?;
	let mut deserializer = serde_json::Deserializer::from_slice(&body);

	serde_path_to_error::deserialize(&mut deserializer)
		.map_err(|source| UpstreamError::Decode { endpoint: endpoint.to_owned(), source }.into())
}

fn user_agent() -> String {
	format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn repo() -> RepoRef {
		RepoRef::new("acme", "widgets").expect("Repo fixture should be valid.")
	}

	#[test]
	fn endpoints_append_to_base_path() {
		let endpoints = Endpoints::new("https://github.example.com/api/v3/")
			.expect("Enterprise base URL should parse.");

		assert_eq!(
			endpoints.repo_installation(&repo()).as_str(),
			"https://github.example.com/api/v3/repos/acme/widgets/installation"
		);
		assert_eq!(
			endpoints.installation_access_tokens(InstallationId(42)).as_str(),
			"https://github.example.com/api/v3/app/installations/42/access_tokens"
		);
	}

	#[test]
	fn release_tags_are_percent_encoded() {
		let endpoints =
			Endpoints::new("https://api.github.com").expect("Default base URL should parse.");

		assert_eq!(
			endpoints.release_by_tag(&repo(), "v1.2.3").as_str(),
			"https://api.github.com/repos/acme/widgets/releases/tags/v1.2.3"
		);
		assert_eq!(
			endpoints.release_by_tag(&repo(), "release candidate").as_str(),
			"https://api.github.com/repos/acme/widgets/releases/tags/release%20candidate"
		);
	}

	#[test]
	fn cannot_be_a_base_urls_are_rejected() {
		assert!(matches!(
			Endpoints::new("mailto:ops@example.com"),
			Err(ConfigError::InvalidBaseUrl { .. })
		));
	}

	#[test]
	fn provider_requests_carry_default_headers() {
		let url = Url::parse("https://api.github.com/app/installations")
			.expect("Fixture URL should parse.");
		let request = provider_request(Method::GET, url);

		assert_eq!(request.headers()[ACCEPT], PROVIDER_JSON);
		assert_eq!(request.headers()["x-github-api-version"], PROVIDER_API_VERSION);
		assert!(request.headers().contains_key(USER_AGENT));
	}

	#[test]
	fn authorize_sets_a_sensitive_bearer_header() {
		let url = Url::parse("https://api.github.com/repos/acme/widgets/releases/tags/v1")
			.expect("Fixture URL should parse.");
		let mut request = provider_request(Method::GET, url);
		let now = OffsetDateTime::now_utc();
		let token = AccessToken::new("ghs_fixture", now, now + Duration::hours(1));

		authorize(&mut request, &token).expect("Bearer header should be accepted.");

		let header = &request.headers()[AUTHORIZATION];

		assert_eq!(header, "Bearer ghs_fixture");
		assert!(header.is_sensitive());
	}
}
