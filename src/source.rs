//! Self-refreshing token sources.

// crates.io
use reqwest::Method;
// self
use crate::{
	_prelude::*,
	auth::{AccessToken, TenantKey},
	discovery::InstallationId,
	http::{self, Endpoints, HttpTransport},
	obs::{self, OperationKind},
	signer::AppTokenSource,
};

/// Boxed future returned by [`TokenSource::token`].
pub type TokenFuture<'a> = Pin<Box<dyn Future<Output = Result<AccessToken>> + 'a + Send>>;

/// Remaining validity below which an installation token is re-minted.
pub const INSTALLATION_TOKEN_REFRESH_MARGIN: Duration = Duration::seconds(120);

/// Produces a currently valid bearer token, refreshing transparently.
pub trait TokenSource
where
	Self: 'static + Send + Sync,
{
	/// Returns a token that is not expired at the time of the call.
	fn token(&self) -> TokenFuture<'_>;
}

#[derive(Debug, Deserialize)]
struct AccessTokenResponse {
	token: String,
	#[serde(with = "time::serde::rfc3339")]
	expires_at: OffsetDateTime,
}

/// Installation token source for one tenant.
///
/// Minting happens lazily on the first [`token`](TokenSource::token) call; concurrent callers
/// wait on the same async lock and share the result of one mint.
pub struct InstallationTokenSource {
	installation: InstallationId,
	tenant: TenantKey,
	app_source: Arc<AppTokenSource>,
	http: Arc<dyn HttpTransport>,
	endpoints: Endpoints,
	cached: AsyncMutex<Option<AccessToken>>,
}
impl InstallationTokenSource {
	/// Creates a source; no network call happens until a token is requested.
	pub fn new(
		installation: InstallationId,
		tenant: TenantKey,
		app_source: Arc<AppTokenSource>,
		http: Arc<dyn HttpTransport>,
		endpoints: Endpoints,
	) -> Self {
		Self { installation, tenant, app_source, http, endpoints, cached: AsyncMutex::new(None) }
	}

	async fn current(&self) -> Result<AccessToken> {
		let mut cached = self.cached.lock().await;
		let now = OffsetDateTime::now_utc();

		if let Some(token) = cached
			.as_ref()
			.filter(|token| !token.needs_refresh(now, INSTALLATION_TOKEN_REFRESH_MARGIN))
		{
			return Ok(token.clone());
		}

		let token = obs::observe(OperationKind::InstallationToken, "mint", self.mint()).await?;

		*cached = Some(token.clone());

		Ok(token)
	}

	async fn mint(&self) -> Result<AccessToken> {
		let app_token = self.app_source.current()?;
		let url = self.endpoints.installation_access_tokens(self.installation);
		let endpoint = http::endpoint_label(&Method::POST, &url);
		let mut request = http::provider_request(Method::POST, url);

		http::authorize(&mut request, &app_token)?;

		let response = self
			.http
			.execute(request)
			.await
			.map_err(|e| e.with_tenant(Some(self.tenant.as_ref())))?;
		let payload: AccessTokenResponse =
			http::read_json(response, &endpoint, Some(self.tenant.as_ref())).await?;

		tracing::debug!(
			installation = %self.installation,
			tenant = %self.tenant,
			expires_at = %payload.expires_at,
			"Minted installation token."
		);

		Ok(AccessToken::new(payload.token, OffsetDateTime::now_utc(), payload.expires_at))
	}
}
impl TokenSource for InstallationTokenSource {
	fn token(&self) -> TokenFuture<'_> {
		Box::pin(self.current())
	}
}
impl Debug for InstallationTokenSource {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("InstallationTokenSource")
			.field("installation", &self.installation)
			.field("tenant", &self.tenant)
			.finish_non_exhaustive()
	}
}
