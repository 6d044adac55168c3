//! HTTP front end that streams private release assets.
//!
//! Each inbound path names a repository, a release tag, and an asset. The router looks the
//! release up through the [`AuthenticatingTransport`], picks the asset by exact name, and
//! streams the download back without buffering it.

pub mod release;
pub mod route;

pub use release::*;
pub use route::*;

// crates.io
use axum::{
	Router,
	body::Body,
	extract::{Path, State},
	http::{
		HeaderValue, StatusCode,
		header::{ACCEPT, CONTENT_LENGTH, CONTENT_TYPE},
	},
	response::{IntoResponse, Response},
	routing,
};
use reqwest::Method;
// self
use crate::{
	_prelude::*,
	broker::TokenBroker,
	http::{self, Endpoints},
	obs::{self, OperationKind},
	transport::{AuthenticatingTransport, OutboundRequest},
};

const OCTET_STREAM: &str = "application/octet-stream";

/// Serves release assets for any repository the App can reach.
#[derive(Clone, Debug)]
pub struct ReleaseAssetRouter {
	transport: AuthenticatingTransport,
	endpoints: Endpoints,
}
impl ReleaseAssetRouter {
	/// Routes through the broker's transport and endpoints.
	pub fn new(broker: Arc<TokenBroker>) -> Self {
		let endpoints = broker.endpoints().clone();

		Self { transport: AuthenticatingTransport::new(broker), endpoints }
	}

	/// Routes through an explicit transport.
	pub fn with_transport(transport: AuthenticatingTransport, endpoints: Endpoints) -> Self {
		Self { transport, endpoints }
	}

	/// Builds the axum router (GET only).
	pub fn into_router(self) -> Router {
		Router::new().route("/*path", routing::get(proxy_asset)).with_state(Arc::new(self))
	}

	/// Fetches the asset named by `route` and returns a streaming response.
	pub async fn fetch(&self, route: &AssetRoute) -> Result<Response> {
		let release = self.fetch_release(route).await?;
		let name = route.asset_name();
		let asset = release
			.find_asset(name)
			.ok_or_else(|| Error::NotFound { tag: route.tag.clone(), asset: name.to_owned() })?;
		let download = self.download(route, asset).await?;

		Ok(stream_response(download, asset))
	}

	async fn fetch_release(&self, route: &AssetRoute) -> Result<Release> {
		obs::observe(OperationKind::ReleaseLookup, "fetch_release", async {
			let url = self.endpoints.release_by_tag(&route.repo, &route.tag);
			let endpoint = http::endpoint_label(&Method::GET, &url);
			let request = http::provider_request(Method::GET, url);
			let response = self
				.transport
				.execute(OutboundRequest::new(request).for_repo(route.repo.clone()))
				.await?;

			http::read_json(response, &endpoint, Some(route.repo.owner.as_ref())).await
		})
		.await
	}

	async fn download(&self, route: &AssetRoute, asset: &ReleaseAsset) -> Result<reqwest::Response> {
		obs::observe(OperationKind::AssetDownload, "download", async {
			let url = asset.api_url.clone();
			let endpoint = http::endpoint_label(&Method::GET, &url);
			let mut request = http::provider_request(Method::GET, url);

			request.headers_mut().insert(ACCEPT, HeaderValue::from_static(OCTET_STREAM));

			let response = self
				.transport
				.execute(OutboundRequest::new(request).for_repo(route.repo.clone()))
				.await?;

			Ok(http::ensure_success(response, &endpoint, Some(route.repo.owner.as_ref()))?)
		})
		.await
	}
}

impl IntoResponse for Error {
	fn into_response(self) -> Response {
		let status = match &self {
			Error::NotFound { .. } => StatusCode::NOT_FOUND,
			_ => StatusCode::INTERNAL_SERVER_ERROR,
		};

		if status.is_server_error() {
			tracing::error!(error = ?self, "Release asset request failed.");
		}

		(status, self.to_string()).into_response()
	}
}

async fn proxy_asset(
	State(router): State<Arc<ReleaseAssetRouter>>,
	Path(path): Path<String>,
) -> Response {
	let Some(route) = AssetRoute::parse(&path) else {
		return (StatusCode::NOT_FOUND, "not found").into_response();
	};

	tracing::info!(route = %route, "Proxying release asset.");

	router.fetch(&route).await.unwrap_or_else(IntoResponse::into_response)
}

fn stream_response(upstream: reqwest::Response, asset: &ReleaseAsset) -> Response {
	let content_type = upstream
		.headers()
		.get(CONTENT_TYPE)
		.cloned()
		.or_else(|| asset.content_type.as_deref().and_then(|v| HeaderValue::from_str(v).ok()))
		.unwrap_or_else(|| HeaderValue::from_static(OCTET_STREAM));
	let content_length = upstream.content_length();
	let mut response = Response::new(Body::from_stream(upstream.bytes_stream()));
	let headers = response.headers_mut();

	headers.insert(CONTENT_TYPE, content_type);

	if let Some(length) = content_length {
		headers.insert(CONTENT_LENGTH, HeaderValue::from(length));
	}

	response
}
