//! Short-lived bearer tokens with lifecycle helpers.

// self
use crate::{_prelude::*, auth::token::secret::TokenSecret};

/// Current lifecycle status for an access token.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenStatus {
	/// Token is not yet valid because the issued-at instant is in the future.
	Pending,
	/// Token is currently valid.
	Active,
	/// Token exceeded its expiry instant.
	Expired,
}

/// Bearer credential (app token or installation token) with its validity window.
#[derive(Clone)]
pub struct AccessToken {
	/// Token secret; callers must avoid logging it.
	pub secret: TokenSecret,
	/// Instant the token became valid.
	pub issued_at: OffsetDateTime,
	/// Instant the provider stops accepting the token.
	pub expires_at: OffsetDateTime,
}
impl AccessToken {
	/// Creates a token valid from `issued_at` until `expires_at`.
	pub fn new(
		secret: impl Into<TokenSecret>,
		issued_at: OffsetDateTime,
		expires_at: OffsetDateTime,
	) -> Self {
		Self { secret: secret.into(), issued_at, expires_at }
	}

	/// Computes the lifecycle status at a given instant.
	pub fn status_at(&self, instant: OffsetDateTime) -> TokenStatus {
		if instant < self.issued_at {
			return TokenStatus::Pending;
		}
		if instant >= self.expires_at {
			return TokenStatus::Expired;
		}

		TokenStatus::Active
	}

	/// Returns `true` if the token has expired at the provided instant.
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		matches!(self.status_at(instant), TokenStatus::Expired)
	}

	/// Whether the token should be replaced: expired, or expiring within `window`.
	pub fn needs_refresh(&self, now: OffsetDateTime, window: Duration) -> bool {
		if self.is_expired_at(now) {
			return true;
		}

		let window = if window.is_negative() { Duration::ZERO } else { window };

		self.expires_at - now <= window
	}

	/// `Authorization` header value for this token.
	pub fn bearer(&self) -> String {
		format!("Bearer {}", self.secret.expose())
	}
}
impl Debug for AccessToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AccessToken")
			.field("secret", &"<redacted>")
			.field("issued_at", &self.issued_at)
			.field("expires_at", &self.expires_at)
			.finish()
	}
}
