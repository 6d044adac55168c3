//! Token broker: the explicitly owned service object behind every proxied request.
//!
//! [`TokenBroker`] owns the app token source, the installation discoverer, and the tenant
//! cache. It decides which installation serves a tenant and hands out the tenant's
//! [`TokenSource`]. Discovery for a tenant is serialized by a per-tenant singleflight guard
//! so racing requests for a new owner trigger one provider call; the cache map lock itself
//! is never held across I/O.

// self
use crate::{
	_prelude::*,
	auth::{AccessToken, RepoRef, TenantKey},
	cache::TenantTokenCache,
	config::AppConfig,
	discovery::{InstallationDiscoverer, InstallationId},
	error::ConfigError,
	http::{Endpoints, HttpTransport},
	signer::{AppCredentialSigner, AppTokenSource},
	source::{InstallationTokenSource, TokenSource},
};

/// How the broker picks the installation for a tenant.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InstallationSelector {
	/// Every tenant uses this installation; discovery never runs.
	Fixed(InstallationId),
	/// Each tenant's installation is resolved on first use.
	PerRepository,
}

/// Owns app credentials, discovery, and the tenant token cache.
pub struct TokenBroker {
	selector: InstallationSelector,
	http: Arc<dyn HttpTransport>,
	endpoints: Endpoints,
	app_source: Arc<AppTokenSource>,
	discoverer: InstallationDiscoverer,
	cache: TenantTokenCache,
	discovery_guards: Mutex<HashMap<TenantKey, Arc<AsyncMutex<()>>>>,
}
impl TokenBroker {
	/// Validates `config`, then chooses the installation selector.
	///
	/// - `installationId` configured: fixed selector.
	/// - `discoverPerRepository` enabled: per-repository selector.
	/// - Otherwise the installation list decides: none is a configuration error, exactly one
	///   becomes the fixed selector, several fail with [`Error::DiscoveryAmbiguity`].
	///
	/// In the first two cases the installation list is only logged, and failing to fetch it
	/// is a warning.
	pub async fn connect(config: &AppConfig, http: Arc<dyn HttpTransport>) -> Result<Self> {
		let mut broker = Self::with_selector(config, http, InstallationSelector::PerRepository)?;

		broker.selector = broker.startup_selector(config).await?;

		tracing::info!(selector = ?broker.selector, "Token broker ready.");

		Ok(broker)
	}

	/// Builds a broker with an explicit selector and no network calls.
	pub fn with_selector(
		config: &AppConfig,
		http: Arc<dyn HttpTransport>,
		selector: InstallationSelector,
	) -> Result<Self> {
		let identity = config.identity()?;
		let endpoints = config.endpoints()?;
		let app_source = Arc::new(AppTokenSource::new(AppCredentialSigner::new(&identity)?));
		let discoverer =
			InstallationDiscoverer::new(http.clone(), endpoints.clone(), app_source.clone());

		Ok(Self {
			selector,
			http,
			endpoints,
			app_source,
			discoverer,
			cache: TenantTokenCache::new(),
			discovery_guards: Default::default(),
		})
	}

	/// Active installation selector.
	pub fn selector(&self) -> InstallationSelector {
		self.selector
	}

	/// Transport shared by discovery, minting, and proxied calls.
	pub fn http(&self) -> &Arc<dyn HttpTransport> {
		&self.http
	}

	/// Provider endpoints.
	pub fn endpoints(&self) -> &Endpoints {
		&self.endpoints
	}

	/// Tenant cache, exposed for inspection.
	pub fn cache(&self) -> &TenantTokenCache {
		&self.cache
	}

	/// Returns the token source for the tenant owning `repo`, creating it on first use.
	pub async fn source_for(&self, repo: &RepoRef) -> Result<Arc<dyn TokenSource>> {
		let key = repo.tenant_key();

		if let Some(source) = self.cache.get(&key) {
			return Ok(source);
		}

		match self.selector {
			InstallationSelector::Fixed(installation) => Ok(self.insert_source(&key, installation)),
			InstallationSelector::PerRepository => {
				let guard = self.discovery_guard(&key);
				let _singleflight = guard.lock().await;

				if let Some(source) = self.cache.get(&key) {
					return Ok(source);
				}

				let installation = self.discoverer.resolve_installation_for_repo(repo).await?;

				Ok(self.insert_source(&key, installation))
			},
		}
	}

	/// Returns a current installation token for the tenant owning `repo`.
	///
	/// Failures are wrapped in [`Error::Authentication`]. Nothing is cached on failure, so the
	/// next call retries discovery and minting from scratch.
	pub async fn token_for(&self, repo: &RepoRef) -> Result<AccessToken> {
		let result = match self.source_for(repo).await {
			Ok(source) => source.token().await,
			Err(e) => Err(e),
		};

		result.map_err(|e| {
			tracing::warn!(repo = %repo, error = %e, "Failed to obtain installation token.");

			Error::authentication(repo.tenant_key(), e)
		})
	}

	async fn startup_selector(&self, config: &AppConfig) -> Result<InstallationSelector> {
		if let Some(installation) = config.installation_id() {
			self.log_installations().await;

			return Ok(InstallationSelector::Fixed(installation));
		}
		if config.discover_per_repository {
			self.log_installations().await;

			return Ok(InstallationSelector::PerRepository);
		}

		let installations = self.discoverer.list_installations().await?;

		match installations.len() {
			0 => Err(ConfigError::NotInstalled.into()),
			1 => {
				let only = &installations[0];

				tracing::info!(
					installation = %only.id,
					account = %only.account.login,
					"Using the App's only installation for every tenant."
				);

				Ok(InstallationSelector::Fixed(only.id))
			},
			_ => Err(Error::DiscoveryAmbiguity { installations }),
		}
	}

	async fn log_installations(&self) {
		match self.discoverer.list_installations().await {
			Ok(installations) =>
				for installation in installations {
					tracing::info!(
						installation = %installation.id,
						account = %installation.account.login,
						selection = ?installation.repository_selection,
						"App installation available."
					);
				},
			Err(e) => tracing::warn!(error = %e, "Failed to list App installations."),
		}
	}

	fn insert_source(&self, key: &TenantKey, installation: InstallationId) -> Arc<dyn TokenSource> {
		self.cache.get_or_insert_with(key, || {
			tracing::debug!(tenant = %key, installation = %installation, "Caching token source.");

			let source: Arc<dyn TokenSource> = Arc::new(InstallationTokenSource::new(
				installation,
				key.clone(),
				self.app_source.clone(),
				self.http.clone(),
				self.endpoints.clone(),
			));

			source
		})
	}

	fn discovery_guard(&self, key: &TenantKey) -> Arc<AsyncMutex<()>> {
		let mut guards = self.discovery_guards.lock();

		guards.entry(key.clone()).or_insert_with(|| Arc::new(AsyncMutex::new(()))).clone()
	}
}
impl Debug for TokenBroker {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenBroker")
			.field("selector", &self.selector)
			.field("endpoints", &self.endpoints)
			.field("cache", &self.cache)
			.finish()
	}
}
