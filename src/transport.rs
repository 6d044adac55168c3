//! Outbound calls authorized with the calling tenant's installation token.
//!
//! The tenant travels with the request as an explicit [`OutboundRequest`] binding instead of
//! ambient per-request state. [`AuthenticatingTransport::execute`] refuses requests that carry
//! no binding before anything reaches the network.

// crates.io
use reqwest::{Request, Response};
// self
use crate::{
	_prelude::*,
	auth::RepoRef,
	broker::TokenBroker,
	http::{self, HttpTransport},
};

/// Request plus the repository whose tenant authorizes it.
#[derive(Debug)]
pub struct OutboundRequest {
	request: Request,
	tenant: Option<RepoRef>,
}
impl OutboundRequest {
	/// Wraps a request with no tenant binding.
	pub fn new(request: Request) -> Self {
		Self { request, tenant: None }
	}

	/// Binds the request to the tenant owning `repo`.
	pub fn for_repo(mut self, repo: RepoRef) -> Self {
		self.tenant = Some(repo);

		self
	}

	/// Bound repository, if any.
	pub fn tenant(&self) -> Option<&RepoRef> {
		self.tenant.as_ref()
	}
}

/// Decorates an [`HttpTransport`] with installation-token authorization.
#[derive(Clone)]
pub struct AuthenticatingTransport {
	broker: Arc<TokenBroker>,
	inner: Arc<dyn HttpTransport>,
}
impl AuthenticatingTransport {
	/// Delegates to the broker's own transport.
	pub fn new(broker: Arc<TokenBroker>) -> Self {
		let inner = broker.http().clone();

		Self { broker, inner }
	}

	/// Delegates to `inner` while tokens still come from `broker`.
	pub fn with_inner(broker: Arc<TokenBroker>, inner: Arc<dyn HttpTransport>) -> Self {
		Self { broker, inner }
	}

	/// Authorizes and sends `outbound`.
	///
	/// Fails with [`Error::Authorization`] when no tenant is bound and with
	/// [`Error::Authentication`] when no token can be obtained; in both cases the inner
	/// transport is never called.
	pub async fn execute(&self, outbound: OutboundRequest) -> Result<Response> {
		let OutboundRequest { mut request, tenant } = outbound;
		let Some(repo) = tenant else {
			tracing::error!(url = %request.url(), "Refusing outbound request without a tenant.");

			return Err(Error::unbound_request());
		};
		let token = self.broker.token_for(&repo).await?;

		http::authorize(&mut request, &token)?;

		let response = self
			.inner
			.execute(request)
			.await
			.map_err(|e| e.with_tenant(Some(repo.owner.as_ref())))?;

		Ok(response)
	}
}
impl Debug for AuthenticatingTransport {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AuthenticatingTransport").field("broker", &self.broker).finish()
	}
}
