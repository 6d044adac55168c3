// std
use std::sync::atomic::{AtomicUsize, Ordering};
// crates.io
use httpmock::prelude::*;
// self
use release_proxy::{
	_preludet::*,
	auth::RepoRef,
	broker::InstallationSelector,
	discovery::InstallationId,
	error::TransportError,
	http::{HttpTransport, TransportFuture},
	reqwest::{Method, Request},
	transport::{AuthenticatingTransport, OutboundRequest},
};

/// Counts calls and never reaches the network.
#[derive(Default)]
struct CountingTransport(AtomicUsize);
impl HttpTransport for CountingTransport {
	fn execute(&self, _request: Request) -> TransportFuture<'_> {
		self.0.fetch_add(1, Ordering::SeqCst);

		Box::pin(async {
			Err(TransportError::Io(std::io::Error::other("counting transport never sends")))
		})
	}
}

fn repo() -> RepoRef {
	RepoRef::new("acme", "widgets").expect("Repository fixture should be valid.")
}

fn request(server: &MockServer, path: &str) -> Request {
	Request::new(Method::GET, Url::parse(&server.url(path)).expect("Mock URL should parse."))
}

#[tokio::test]
async fn unbound_requests_never_reach_the_network() {
	let server = MockServer::start_async().await;
	let broker = build_test_broker(
		&test_config(&server.base_url()),
		InstallationSelector::Fixed(InstallationId(7)),
	);
	let counting = Arc::new(CountingTransport::default());
	let transport = AuthenticatingTransport::with_inner(broker, counting.clone());
	let err = transport
		.execute(OutboundRequest::new(request(&server, "/repos/acme/widgets/releases/tags/v1")))
		.await
		.expect_err("Requests without a tenant must be refused.");

	assert!(matches!(err, Error::Authorization { .. }));
	assert_eq!(err.to_string(), "Authorization failed: no tenant context bound to outbound request.");
	assert_eq!(counting.0.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn token_failures_abort_before_sending() {
	let server = MockServer::start_async().await;
	let minting = server
		.mock_async(|when, then| {
			when.method(POST).path("/app/installations/7/access_tokens");
			then.status(500);
		})
		.await;
	let broker = build_test_broker(
		&test_config(&server.base_url()),
		InstallationSelector::Fixed(InstallationId(7)),
	);
	let counting = Arc::new(CountingTransport::default());
	let transport = AuthenticatingTransport::with_inner(broker, counting.clone());
	let err = transport
		.execute(
			OutboundRequest::new(request(&server, "/repos/acme/widgets/releases/tags/v1"))
				.for_repo(repo()),
		)
		.await
		.expect_err("Minting failures must surface.");

	assert!(matches!(err, Error::Authentication { .. }));
	assert!(err.to_string().contains("tenant `acme`"));
	assert_eq!(counting.0.load(Ordering::SeqCst), 0);
	minting.assert_calls_async(1).await;
}

#[tokio::test]
async fn bound_requests_carry_the_installation_token() {
	let server = MockServer::start_async().await;
	let _minted = server
		.mock_async(|when, then| {
			when.method(POST).path("/app/installations/7/access_tokens");
			then.status(201)
				.header("content-type", "application/json")
				.body(access_token_body("ghs_injected"));
		})
		.await;
	let upstream = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/repos/acme/widgets/releases/tags/v1")
				.header("authorization", "Bearer ghs_injected");
			then.status(200).body("{}");
		})
		.await;
	let broker = build_test_broker(
		&test_config(&server.base_url()),
		InstallationSelector::Fixed(InstallationId(7)),
	);
	let transport = AuthenticatingTransport::new(broker);
	let outbound =
		OutboundRequest::new(request(&server, "/repos/acme/widgets/releases/tags/v1")).for_repo(repo());

	assert_eq!(outbound.tenant(), Some(&repo()));

	let response = transport.execute(outbound).await.expect("Bound request should be sent.");

	assert_eq!(response.status().as_u16(), 200);
	upstream.assert_async().await;
}
