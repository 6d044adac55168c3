//! Configuration consumed by the proxy core.
//!
//! Locating and parsing the configuration file belongs to the embedding binary; this
//! module only defines the deserializable shape and validates it into the typed values the
//! core needs ([`AppIdentity`], [`Endpoints`], [`InstallationId`]).

// self
use crate::{
	_prelude::*,
	auth::{AppIdentity, TokenSecret},
	discovery::InstallationId,
	error::ConfigError,
	http::Endpoints,
};

/// Default provider API root.
pub const DEFAULT_API_BASE_URL: &str = "https://api.github.com";
/// Default listen address for the local proxy.
pub const DEFAULT_LISTEN_ADDRESS: &str = "localhost:9443";

/// App credentials and proxy settings.
///
/// Exactly one of `app_id` / `client_id` must be set; when both are present the numeric
/// ID wins. Setting `installation_id` disables installation discovery entirely.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppConfig {
	/// Numeric App ID.
	pub app_id: Option<u64>,
	/// App client identifier, used when `app_id` is absent.
	pub client_id: Option<String>,
	/// Fixed installation used for every tenant.
	pub installation_id: Option<u64>,
	/// Resolve the installation per repository owner instead of requiring a single one.
	pub discover_per_repository: bool,
	/// PEM-encoded RSA private key bytes, already read by the loader.
	pub private_key_pem: TokenSecret,
	/// Provider API root (GitHub Enterprise servers use `https://host/api/v3`).
	pub api_base_url: String,
	/// Address the local proxy listens on.
	pub listen_address: String,
}
impl AppConfig {
	/// Validates the identity fields.
	pub fn identity(&self) -> Result<AppIdentity, ConfigError> {
		AppIdentity::from_parts(
			self.app_id,
			self.client_id.as_deref(),
			self.private_key_pem.clone(),
		)
	}

	/// Validates the provider API root.
	pub fn endpoints(&self) -> Result<Endpoints, ConfigError> {
		Endpoints::new(&self.api_base_url)
	}

	/// Fixed installation selector, if configured.
	pub fn installation_id(&self) -> Option<InstallationId> {
		self.installation_id.map(InstallationId)
	}
}
impl Default for AppConfig {
	fn default() -> Self {
		Self {
			app_id: None,
			client_id: None,
			installation_id: None,
			discover_per_repository: false,
			private_key_pem: TokenSecret::default(),
			api_base_url: DEFAULT_API_BASE_URL.into(),
			listen_address: DEFAULT_LISTEN_ADDRESS.into(),
		}
	}
}
