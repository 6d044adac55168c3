//! Installation discovery.
//!
//! An installation binds the App to one account. Discovery answers two questions with the
//! app token: where is the App installed at all, and which installation covers a given
//! repository.

// crates.io
use reqwest::Method;
use serde::de::DeserializeOwned;
// self
use crate::{
	_prelude::*,
	auth::RepoRef,
	http::{self, Endpoints, HttpTransport},
	obs::{self, OperationKind},
	signer::AppTokenSource,
};

/// Provider-assigned installation identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstallationId(pub u64);
impl Display for InstallationId {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "{}", self.0)
	}
}

/// Which repositories of the account the installation may access.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepositorySelection {
	/// Every repository, including ones created later.
	All,
	/// An explicit subset.
	Selected,
}

/// Account the App is installed on.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallationAccount {
	/// Account login (user or organization name).
	pub login: String,
}

/// One deployment of the App onto one account.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Installation {
	/// Installation identifier.
	pub id: InstallationId,
	/// Owning account.
	pub account: InstallationAccount,
	/// Repository coverage; some payloads omit it.
	#[serde(default)]
	pub repository_selection: Option<RepositorySelection>,
}

/// Calls the provider's installation endpoints as the App.
#[derive(Clone)]
pub struct InstallationDiscoverer {
	http: Arc<dyn HttpTransport>,
	endpoints: Endpoints,
	app_source: Arc<AppTokenSource>,
}
impl InstallationDiscoverer {
	/// Creates a discoverer sharing the broker's transport and app token source.
	pub fn new(
		http: Arc<dyn HttpTransport>,
		endpoints: Endpoints,
		app_source: Arc<AppTokenSource>,
	) -> Self {
		Self { http, endpoints, app_source }
	}

	/// Lists every installation of the App.
	pub async fn list_installations(&self) -> Result<Vec<Installation>> {
		obs::observe(OperationKind::Discovery, "list_installations", async {
			let installations: Vec<Installation> =
				self.get_json(self.endpoints.app_installations(), None).await?;

			tracing::debug!(count = installations.len(), "Listed App installations.");

			Ok(installations)
		})
		.await
	}

	/// Resolves the installation covering `repo`.
	///
	/// A 404 from the provider means the App is not installed on the owner, or the
	/// installation does not include the repository.
	pub async fn resolve_installation_for_repo(&self, repo: &RepoRef) -> Result<InstallationId> {
		obs::observe(OperationKind::Discovery, "resolve_installation_for_repo", async {
			let installation: Installation = self
				.get_json(self.endpoints.repo_installation(repo), Some(repo.owner.as_ref()))
				.await?;

			tracing::info!(
				repo = %repo,
				installation = %installation.id,
				account = %installation.account.login,
				"Resolved installation for repository."
			);

			Ok(installation.id)
		})
		.await
	}

	async fn get_json<T>(&self, url: Url, tenant: Option<&str>) -> Result<T>
	where
		T: DeserializeOwned,
	{
		let app_token = self.app_source.current()?;
		let endpoint = http::endpoint_label(&Method::GET, &url);
		let mut request = http::provider_request(Method::GET, url);

		http::authorize(&mut request, &app_token)?;

		let response =
			self.http.execute(request).await.map_err(|e| e.with_tenant(tenant))?;

		http::read_json(response, &endpoint, tenant).await
	}
}
impl Debug for InstallationDiscoverer {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("InstallationDiscoverer").field("endpoints", &self.endpoints).finish()
	}
}
