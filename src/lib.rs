//! Authenticating release-asset proxy for provider Apps: mint per-tenant installation tokens,
//! discover installations on demand, and stream private release assets behind one local endpoint.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod broker;
pub mod cache;
pub mod config;
pub mod discovery;
pub mod error;
pub mod http;
pub mod obs;
pub mod router;
pub mod server;
pub mod signer;
pub mod source;
pub mod transport;
#[cfg(any(test, feature = "test"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for tests; enabled via `cfg(test)` or the `test`
	//! crate feature.

	pub use crate::_prelude::*;

	// crates.io
	use time::format_description::well_known::Rfc3339;
	// self
	use crate::{
		broker::{InstallationSelector, TokenBroker},
		config::AppConfig,
		http::{HttpTransport, ReqwestTransport},
	};

	/// PEM-encoded RSA private key used to sign app tokens in tests.
	pub const TEST_PRIVATE_KEY: &str = include_str!("../tests/fixtures/app-key.pem");
	/// Public half of [`TEST_PRIVATE_KEY`] for verifying signed app tokens.
	pub const TEST_PUBLIC_KEY: &str = include_str!("../tests/fixtures/app-key.pub.pem");
	/// Numeric App ID used by test configurations.
	pub const TEST_APP_ID: u64 = 12345;

	/// Builds an [`AppConfig`] that authenticates with [`TEST_APP_ID`] against `api_base_url`.
	pub fn test_config(api_base_url: &str) -> AppConfig {
		AppConfig {
			app_id: Some(TEST_APP_ID),
			private_key_pem: TEST_PRIVATE_KEY.into(),
			api_base_url: api_base_url.to_owned(),
			..AppConfig::default()
		}
	}

	/// Constructs a [`TokenBroker`] backed by the reqwest transport without any startup calls.
	pub fn build_test_broker(config: &AppConfig, selector: InstallationSelector) -> Arc<TokenBroker> {
		let transport: Arc<dyn HttpTransport> =
			Arc::new(ReqwestTransport::new().expect("Failed to build reqwest transport for tests."));
		let broker = TokenBroker::with_selector(config, transport, selector)
			.expect("Test broker should build from the fixture configuration.");

		Arc::new(broker)
	}

	/// JSON body returned by a mocked installation access token endpoint.
	pub fn access_token_body(token: &str) -> String {
		let expires_at = (OffsetDateTime::now_utc() + Duration::hours(1))
			.format(&Rfc3339)
			.expect("Expiry fixture should format as RFC 3339.");

		serde_json::json!({ "token": token, "expires_at": expires_at }).to_string()
	}
}

mod _prelude {
	pub use std::{
		collections::HashMap,
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		hash::Hash,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use axum;
pub use reqwest;
pub use url;
#[cfg(test)]
use {color_eyre as _, http_body_util as _, httpmock as _, tower as _, tracing_subscriber as _};
