//! App identity: who the proxy authenticates as before any installation is involved.

// self
use crate::{_prelude::*, auth::token::secret::TokenSecret};

/// Identifier the provider knows the App by.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AppIdentifier {
	/// Numeric App ID.
	AppId(u64),
	/// App client identifier.
	ClientId(String),
}
impl AppIdentifier {
	/// Value placed in the `iss` claim of signed app tokens.
	pub fn issuer(&self) -> String {
		match self {
			Self::AppId(id) => id.to_string(),
			Self::ClientId(id) => id.clone(),
		}
	}
}
impl Display for AppIdentifier {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match self {
			Self::AppId(id) => write!(f, "app {id}"),
			Self::ClientId(id) => write!(f, "client {id}"),
		}
	}
}

/// Validated App identity: one authoritative identifier plus its signing key.
#[derive(Clone)]
pub struct AppIdentity {
	/// Identifier used as the token issuer.
	pub identifier: AppIdentifier,
	/// PEM-encoded RSA private key.
	pub private_key_pem: TokenSecret,
}
impl AppIdentity {
	/// Builds an identity from the configured identifiers; the numeric ID wins when both are set.
	pub fn from_parts(
		app_id: Option<u64>,
		client_id: Option<&str>,
		private_key_pem: TokenSecret,
	) -> Result<Self, crate::error::ConfigError> {
		let identifier = match (app_id, client_id) {
			(Some(id), _) => AppIdentifier::AppId(id),
			(None, Some(id)) if !id.trim().is_empty() => AppIdentifier::ClientId(id.to_owned()),
			_ => return Err(crate::error::ConfigError::MissingAppIdentity),
		};

		Ok(Self { identifier, private_key_pem })
	}
}
impl Debug for AppIdentity {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AppIdentity")
			.field("identifier", &self.identifier)
			.field("private_key_pem", &self.private_key_pem)
			.finish()
	}
}
