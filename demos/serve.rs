//! Runs the proxy against a mocked provider, downloads one asset through it, and shuts down.
//!
//! `RUST_LOG=release_proxy=debug cargo run --example serve` shows discovery and token
//! minting as they happen.

// std
use std::sync::Arc;
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
// self
use release_proxy::{
	broker::TokenBroker,
	config::AppConfig,
	http::{HttpTransport, ReqwestTransport},
	router::ReleaseAssetRouter,
	server::{self, LISTEN_ADDRESS_ENV},
};

const APP_KEY: &str = include_str!("../tests/fixtures/app-key.pem");

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;
	tracing_subscriber::registry()
		.with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
		.with(tracing_subscriber::fmt::layer())
		.init();

	let provider = MockServer::start_async().await;

	provider
		.mock_async(|when, then| {
			when.method(GET).path("/app/installations");
			then.status(200)
				.header("content-type", "application/json")
				.body(r#"[{"id":7,"account":{"login":"acme"},"repository_selection":"all"}]"#);
		})
		.await;
	provider
		.mock_async(|when, then| {
			when.method(POST).path("/app/installations/7/access_tokens");
			then.status(201)
				.header("content-type", "application/json")
				.body(r#"{"token":"ghs_demo","expires_at":"2099-01-01T00:00:00Z"}"#);
		})
		.await;
	provider
		.mock_async(|when, then| {
			when.method(GET).path("/repos/acme/widgets/releases/tags/v1.0.0");
			then.status(200).header("content-type", "application/json").body(
				serde_json::json!({
					"tag_name": "v1.0.0",
					"assets": [{ "name": "hello.txt", "url": provider.url("/assets/1") }]
				})
				.to_string(),
			);
		})
		.await;
	provider
		.mock_async(|when, then| {
			when.method(GET)
				.path("/assets/1")
				.header("accept", "application/octet-stream")
				.header("authorization", "Bearer ghs_demo");
			then.status(200).header("content-type", "text/plain").body("hello from a private release\n");
		})
		.await;

	let config = AppConfig {
		app_id: Some(12345),
		private_key_pem: APP_KEY.into(),
		api_base_url: provider.base_url(),
		listen_address: "127.0.0.1:0".into(),
		..AppConfig::default()
	};
	let http: Arc<dyn HttpTransport> = Arc::new(ReqwestTransport::new()?);
	let broker = Arc::new(TokenBroker::connect(&config, http).await?);
	let listener = server::bind(&config.listen_address).await?;
	let address = listener.local_addr()?;

	println!("{LISTEN_ADDRESS_ENV}={address}");

	let (stop, stopped) = tokio::sync::oneshot::channel::<()>();
	let proxy = tokio::spawn(server::serve(
		listener,
		ReleaseAssetRouter::new(broker).into_router(),
		async move {
			let _ = stopped.await;
		},
		server::DEFAULT_SHUTDOWN_GRACE,
	));
	let body = reqwest_get(&format!("http://{address}/acme/widgets/v1.0.0/hello.txt")).await?;

	print!("{body}");

	let _ = stop.send(());

	proxy.await??;

	Ok(())
}

async fn reqwest_get(url: &str) -> Result<String> {
	Ok(release_proxy::reqwest::get(url).await?.error_for_status()?.text().await?)
}
