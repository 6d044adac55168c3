//! Proxy-level error types shared across signing, discovery, caching, and routing.

// self
use crate::{_prelude::*, auth::IdentifierError, discovery::Installation};

/// Proxy-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical proxy error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration problem; fatal at startup.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Provider API returned a non-success status or an undecodable body.
	#[error(transparent)]
	Upstream(#[from] UpstreamError),
	/// Transport failure (DNS, TCP, TLS) while talking to the provider.
	#[error(transparent)]
	Transport(#[from] TransportError),

	/// The App has several installations and no selector was configured.
	#[error(
		"The App is installed on {} accounts ({}); configure installationId or enable discoverPerRepository.",
		.installations.len(),
		summarize(.installations)
	)]
	DiscoveryAmbiguity {
		/// Every installation returned by the provider.
		installations: Vec<Installation>,
	},
	/// An installation token could not be obtained for the tenant.
	#[error("Failed to obtain an installation token for tenant `{tenant}`: {source}")]
	Authentication {
		/// Tenant key the token was requested for.
		tenant: String,
		/// Discovery, minting, or signing failure.
		#[source]
		source: Box<Error>,
	},
	/// Outbound request attempted without a tenant binding.
	#[error("Authorization failed: {reason}.")]
	Authorization {
		/// Contract violation description.
		reason: &'static str,
	},
	/// No release asset matched the requested name.
	#[error("Asset `{asset}` not found in release `{tag}`.")]
	NotFound {
		/// Release tag that was searched.
		tag: String,
		/// Requested asset name.
		asset: String,
	},
	/// App token could not be signed.
	#[error("Failed to sign the app token.")]
	Signing(#[source] jsonwebtoken::errors::Error),
}
impl Error {
	/// Wraps a token-retrieval failure for `tenant`.
	pub fn authentication(tenant: impl Display, source: Error) -> Self {
		Self::Authentication { tenant: tenant.to_string(), source: Box::new(source) }
	}

	/// Error raised when an outbound request carries no tenant binding.
	pub const fn unbound_request() -> Self {
		Self::Authorization { reason: "no tenant context bound to outbound request" }
	}
}

/// Configuration and validation failures; none of them are retried.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// Neither `appId` nor `clientId` is configured.
	#[error("Config must set either appId or clientId.")]
	MissingAppIdentity,
	/// The private key is not a valid RSA PEM document.
	#[error("Private key is not a valid RSA PEM key.")]
	InvalidPrivateKey {
		/// Underlying key parsing failure.
		#[source]
		source: jsonwebtoken::errors::Error,
	},
	/// The App is not installed on any account.
	#[error("App is not installed anywhere; install it on an account first.")]
	NotInstalled,
	/// The provider API base URL cannot be parsed.
	#[error("Provider API base URL `{url}` is invalid.")]
	InvalidBaseUrl {
		/// Offending URL.
		url: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// A path or identifier component failed validation.
	#[error(transparent)]
	InvalidIdentifier(#[from] IdentifierError),
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Provider API failures; surfaced to callers without retries.
#[derive(Debug, ThisError)]
pub enum UpstreamError {
	/// Provider answered with a non-success status.
	#[error("Provider API returned {status} for {endpoint}{}.", tenant_suffix(.tenant.as_deref()))]
	Status {
		/// Endpoint label (method and URL, never credentials).
		endpoint: String,
		/// HTTP status code.
		status: u16,
		/// Tenant the call was made for, when known.
		tenant: Option<String>,
	},
	/// Provider responded with JSON that could not be decoded.
	#[error("Provider API returned malformed JSON for {endpoint}.")]
	Decode {
		/// Endpoint label.
		endpoint: String,
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
}
impl UpstreamError {
	/// Returns the upstream HTTP status, if one was observed.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::Status { status, .. } => Some(*status),
			Self::Decode { .. } => None,
		}
	}
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error(
		"Network error occurred while calling {endpoint}{}: {source}",
		tenant_suffix(.tenant.as_deref())
	)]
	Network {
		/// Endpoint label (method and URL, never credentials).
		endpoint: String,
		/// Tenant the call was made for, when known.
		tenant: Option<String>,
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the provider API.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error raised while calling `endpoint`.
	pub fn network(
		endpoint: impl Into<String>,
		src: impl 'static + Send + Sync + std::error::Error,
	) -> Self {
		Self::Network { endpoint: endpoint.into(), tenant: None, source: Box::new(src) }
	}

	/// Records the tenant a failed call was made for.
	pub fn with_tenant(mut self, tenant: Option<&str>) -> Self {
		if let Self::Network { tenant: slot, .. } = &mut self {
			*slot = tenant.map(ToOwned::to_owned);
		}

		self
	}
}

fn tenant_suffix(tenant: Option<&str>) -> String {
	tenant.map(|t| format!(" (tenant `{t}`)")).unwrap_or_default()
}

fn summarize(installations: &[Installation]) -> String {
	installations
		.iter()
		.map(|i| format!("{} #{}", i.account.login, i.id))
		.collect::<Vec<_>>()
		.join(", ")
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::discovery::{InstallationAccount, InstallationId};

	#[test]
	fn authentication_error_exposes_source() {
		let upstream = UpstreamError::Status {
			endpoint: "GET /repos/acme/widgets/installation".into(),
			status: 404,
			tenant: Some("acme".into()),
		};
		let err = Error::authentication("acme", upstream.into());

		assert!(err.to_string().contains("tenant `acme`"));
		assert!(err.to_string().contains("404"));

		let source = StdError::source(&err).expect("Authentication errors should expose a source.");

		assert!(source.to_string().contains("/repos/acme/widgets/installation"));
	}

	#[test]
	fn ambiguity_lists_every_installation() {
		let installations = vec![
			Installation {
				id: InstallationId(1),
				account: InstallationAccount { login: "acme".into() },
				repository_selection: None,
			},
			Installation {
				id: InstallationId(2),
				account: InstallationAccount { login: "globex".into() },
				repository_selection: None,
			},
		];
		let message = Error::DiscoveryAmbiguity { installations }.to_string();

		assert!(message.contains("2 accounts"));
		assert!(message.contains("acme #1"));
		assert!(message.contains("globex #2"));
	}

	#[test]
	fn network_errors_name_endpoint_and_tenant() {
		let refused = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
		let err = TransportError::network("GET http://127.0.0.1:1/assets/1", refused)
			.with_tenant(Some("acme"));
		let message = Error::from(err).to_string();

		assert!(message.contains("GET http://127.0.0.1:1/assets/1"), "{message}");
		assert!(message.contains("tenant `acme`"), "{message}");
		assert!(message.contains("refused"), "{message}");
	}

	#[test]
	fn unbound_request_names_the_contract() {
		assert_eq!(
			Error::unbound_request().to_string(),
			"Authorization failed: no tenant context bound to outbound request."
		);
	}
}
