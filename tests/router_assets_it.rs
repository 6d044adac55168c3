// crates.io
use http_body_util::BodyExt;
use httpmock::prelude::*;
use tower::ServiceExt;
// self
use release_proxy::{
	_preludet::*,
	axum::{
		Router,
		body::Body,
		http::{Request, StatusCode, header},
	},
	broker::InstallationSelector,
	discovery::InstallationId,
	router::ReleaseAssetRouter,
};

const CHECKSUMS: &str = "3f786850e387550fdab836ed7e6dc881de23001b  widgets.tar.gz\n";

struct Provider {
	server: MockServer,
}
impl Provider {
	async fn start() -> Self {
		let server = MockServer::start_async().await;

		server
			.mock_async(|when, then| {
				when.method(POST).path("/app/installations/7/access_tokens");
				then.status(201)
					.header("content-type", "application/json")
					.body(access_token_body("ghs_router"));
			})
			.await;

		Self { server }
	}

	fn router(&self) -> Router {
		let broker = build_test_broker(
			&test_config(&self.server.base_url()),
			InstallationSelector::Fixed(InstallationId(7)),
		);

		ReleaseAssetRouter::new(broker).into_router()
	}

	async fn release(&self, tag: &str, assets: serde_json::Value) -> httpmock::Mock<'_> {
		let path = format!("/repos/acme/widgets/releases/tags/{tag}");
		let body = serde_json::json!({ "tag_name": tag, "assets": assets }).to_string();

		self.server
			.mock_async(|when, then| {
				when.method(GET).path(path).header("authorization", "Bearer ghs_router");
				then.status(200).header("content-type", "application/json").body(body);
			})
			.await
	}

	async fn asset(&self, path: &str, body: &str) -> httpmock::Mock<'_> {
		let path = path.to_owned();
		let body = body.to_owned();

		self.server
			.mock_async(|when, then| {
				when.method(GET)
					.path(path)
					.header("accept", "application/octet-stream")
					.header("authorization", "Bearer ghs_router");
				then.status(200).header("content-type", "text/plain").body(body);
			})
			.await
	}

	fn asset_entry(&self, name: &str, path: &str) -> serde_json::Value {
		serde_json::json!({
			"name": name,
			"content_type": "application/octet-stream",
			"url": self.server.url(path),
			"browser_download_url": format!("https://github.com/acme/widgets/releases/download/v1.2.3/{name}"),
		})
	}
}

async fn get(router: &Router, uri: &str) -> (StatusCode, Option<String>, String) {
	let request = Request::builder()
		.uri(uri)
		.body(Body::empty())
		.expect("Test request should build.");
	let response = router.clone().oneshot(request).await.expect("Router should not fail.");
	let status = response.status();
	let content_type = response
		.headers()
		.get(header::CONTENT_TYPE)
		.and_then(|value| value.to_str().ok())
		.map(ToOwned::to_owned);
	let body = response
		.into_body()
		.collect()
		.await
		.expect("Response body should be readable.")
		.to_bytes();

	(status, content_type, String::from_utf8(body.to_vec()).expect("Body should be UTF-8."))
}

#[tokio::test]
async fn matching_asset_is_streamed_byte_for_byte() {
	let provider = Provider::start().await;
	let release = provider
		.release(
			"v1.2.3",
			serde_json::json!([
				provider.asset_entry("widgets.tar.gz", "/assets/1"),
				provider.asset_entry("checksums.txt", "/assets/2"),
			]),
		)
		.await;
	let tarball = provider.asset("/assets/1", "tarball").await;
	let checksums = provider.asset("/assets/2", CHECKSUMS).await;
	let router = provider.router();
	let (status, content_type, body) =
		get(&router, "/acme/widgets/releases/download/v1.2.3/checksums.txt").await;

	assert_eq!(status, StatusCode::OK);
	assert_eq!(content_type.as_deref(), Some("text/plain"));
	assert_eq!(body, CHECKSUMS);
	release.assert_calls_async(1).await;
	checksums.assert_calls_async(1).await;
	tarball.assert_calls_async(0).await;
}

#[tokio::test]
async fn missing_asset_is_404_without_a_download() {
	let provider = Provider::start().await;
	let release = provider
		.release("v1.2.3", serde_json::json!([provider.asset_entry("widgets.tar.gz", "/assets/1")]))
		.await;
	let tarball = provider.asset("/assets/1", "tarball").await;
	let router = provider.router();
	let (status, _, body) = get(&router, "/acme/widgets/v1.2.3/missing.zip").await;

	assert_eq!(status, StatusCode::NOT_FOUND);
	assert!(body.contains("missing.zip"));
	release.assert_calls_async(1).await;
	tarball.assert_calls_async(0).await;
}

#[tokio::test]
async fn tag_route_serves_the_asset_named_after_the_tag() {
	let provider = Provider::start().await;
	let _release = provider
		.release("installer.sh", serde_json::json!([provider.asset_entry("installer.sh", "/assets/9")]))
		.await;
	let script = provider.asset("/assets/9", "#!/bin/sh\necho hi\n").await;
	let router = provider.router();
	let (status, _, body) = get(&router, "/acme/widgets/installer.sh").await;

	assert_eq!(status, StatusCode::OK);
	assert_eq!(body, "#!/bin/sh\necho hi\n");
	script.assert_calls_async(1).await;
}

#[tokio::test]
async fn upstream_failures_are_500_with_the_status() {
	let provider = Provider::start().await;
	let _release = provider
		.server
		.mock_async(|when, then| {
			when.method(GET).path("/repos/acme/widgets/releases/tags/v9");
			then.status(502);
		})
		.await;
	let router = provider.router();
	let (status, _, body) = get(&router, "/acme/widgets/v9/widgets.tar.gz").await;

	assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
	assert!(body.contains("502"), "Body should name the upstream status: {body}");
	assert!(!body.contains("ghs_router"), "Body must not leak the credential: {body}");
}

#[tokio::test]
async fn unreachable_downloads_name_the_endpoint_and_tenant() {
	let provider = Provider::start().await;
	let _release = provider
		.release(
			"v1.2.3",
			serde_json::json!([{
				"name": "widgets.tar.gz",
				"url": "http://127.0.0.1:1/assets/1",
			}]),
		)
		.await;
	let router = provider.router();
	let (status, _, body) = get(&router, "/acme/widgets/v1.2.3/widgets.tar.gz").await;

	assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
	assert!(body.contains("GET http://127.0.0.1:1/assets/1"), "Body should name the endpoint: {body}");
	assert!(body.contains("tenant `acme`"), "Body should name the tenant: {body}");
	assert!(!body.contains("ghs_router"), "Body must not leak the credential: {body}");
}

#[tokio::test]
async fn dot_segments_never_reach_the_provider() {
	let provider = Provider::start().await;
	let release = provider
		.server
		.mock_async(|when, then| {
			when.method(GET).path("/repos/widgets/releases/tags/v1");
			then.status(200).header("content-type", "application/json").body(r#"{"assets":[]}"#);
		})
		.await;
	let router = provider.router();

	for uri in ["/../widgets/v1", "/acme/../v1", "/%2e%2e/widgets/v1"] {
		let (status, _, _) = get(&router, uri).await;

		assert_eq!(status, StatusCode::NOT_FOUND, "`{uri}` should be rejected.");
	}

	release.assert_calls_async(0).await;
}

#[tokio::test]
async fn repeated_downloads_fetch_independently() {
	let provider = Provider::start().await;
	let _release = provider
		.release("v1.2.3", serde_json::json!([provider.asset_entry("checksums.txt", "/assets/2")]))
		.await;
	let checksums = provider.asset("/assets/2", CHECKSUMS).await;
	let router = provider.router();
	let (_, _, first) = get(&router, "/acme/widgets/v1.2.3/checksums.txt").await;
	let (_, _, second) = get(&router, "/acme/widgets/v1.2.3/checksums.txt").await;

	assert_eq!(first, CHECKSUMS);
	assert_eq!(first, second);
	checksums.assert_calls_async(2).await;
}

#[tokio::test]
async fn unknown_paths_are_not_found() {
	let provider = Provider::start().await;
	let router = provider.router();

	for uri in ["/acme", "/acme/widgets", "/acme/widgets/a/b/c"] {
		let (status, _, _) = get(&router, uri).await;

		assert_eq!(status, StatusCode::NOT_FOUND, "`{uri}` should be rejected.");
	}
}
