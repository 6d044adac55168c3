//! App token signing.
//!
//! The provider authenticates the App itself with a short-lived RS256 JWT. The signer turns
//! an [`AppIdentity`] into such tokens; [`AppTokenSource`] caches the current one and
//! re-signs shortly before it expires.

// crates.io
use jsonwebtoken::{Algorithm, EncodingKey, Header};
// self
use crate::{
	_prelude::*,
	auth::{AccessToken, AppIdentity},
	error::ConfigError,
	obs::{self, OperationKind, OperationOutcome, OperationSpan},
	source::{TokenFuture, TokenSource},
};

/// Clock skew allowance applied to `iat`.
pub const APP_TOKEN_BACKDATE: Duration = Duration::seconds(60);
/// Validity of a signed app token; the provider rejects anything above ten minutes.
pub const APP_TOKEN_LIFETIME: Duration = Duration::minutes(9);
/// Remaining validity below which [`AppTokenSource`] re-signs.
pub const APP_TOKEN_REFRESH_MARGIN: Duration = Duration::seconds(30);

#[derive(Debug, Serialize, Deserialize)]
struct AppClaims {
	iat: i64,
	exp: i64,
	iss: String,
}

/// Signs app tokens for one App identity.
#[derive(Clone)]
pub struct AppCredentialSigner {
	issuer: String,
	key: EncodingKey,
}
impl AppCredentialSigner {
	/// Parses the identity's RSA key.
	pub fn new(identity: &AppIdentity) -> Result<Self, ConfigError> {
		let key = EncodingKey::from_rsa_pem(identity.private_key_pem.expose().as_bytes())
			.map_err(|source| ConfigError::InvalidPrivateKey { source })?;

		Ok(Self { issuer: identity.identifier.issuer(), key })
	}

	/// Value placed in the `iss` claim.
	pub fn issuer(&self) -> &str {
		&self.issuer
	}

	/// Signs a token valid from one minute before `now` until nine minutes after it.
	pub fn sign(&self, now: OffsetDateTime) -> Result<AccessToken> {
		let issued_at = now - APP_TOKEN_BACKDATE;
		let expires_at = now + APP_TOKEN_LIFETIME;
		let claims = AppClaims {
			iat: issued_at.unix_timestamp(),
			exp: expires_at.unix_timestamp(),
			iss: self.issuer.clone(),
		};
		let jwt = jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &self.key)
			.map_err(Error::Signing)?;

		Ok(AccessToken::new(jwt, issued_at, expires_at))
	}
}
impl Debug for AppCredentialSigner {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AppCredentialSigner")
			.field("issuer", &self.issuer)
			.field("key", &"<redacted>")
			.finish()
	}
}

/// Caching app token source shared by discovery and every installation token source.
#[derive(Debug)]
pub struct AppTokenSource {
	signer: AppCredentialSigner,
	cached: Mutex<Option<AccessToken>>,
}
impl AppTokenSource {
	/// Wraps a signer; the first token is signed on demand.
	pub fn new(signer: AppCredentialSigner) -> Self {
		Self { signer, cached: Mutex::new(None) }
	}

	/// Returns the cached app token, re-signing when it is within the refresh margin.
	pub fn current(&self) -> Result<AccessToken> {
		self.current_at(OffsetDateTime::now_utc())
	}

	/// Same as [`current`](Self::current) with an explicit clock.
	pub fn current_at(&self, now: OffsetDateTime) -> Result<AccessToken> {
		let mut cached = self.cached.lock();

		if let Some(token) =
			cached.as_ref().filter(|token| !token.needs_refresh(now, APP_TOKEN_REFRESH_MARGIN))
		{
			return Ok(token.clone());
		}

		let _span = OperationSpan::new(OperationKind::AppToken, "sign").entered();

		obs::record_operation_outcome(OperationKind::AppToken, OperationOutcome::Attempt);

		let token = match self.signer.sign(now) {
			Ok(token) => token,
			Err(e) => {
				obs::record_operation_outcome(OperationKind::AppToken, OperationOutcome::Failure);
				tracing::error!(error = %e, issuer = self.signer.issuer(), "Failed to sign app token.");

				return Err(e);
			},
		};

		obs::record_operation_outcome(OperationKind::AppToken, OperationOutcome::Success);
		tracing::debug!(expires_at = %token.expires_at, "Signed app token.");

		*cached = Some(token.clone());

		Ok(token)
	}
}
impl TokenSource for AppTokenSource {
	fn token(&self) -> TokenFuture<'_> {
		Box::pin(async move { self.current() })
	}
}
