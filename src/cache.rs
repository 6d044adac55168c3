//! Process-lifetime tenant cache of token sources.

// self
use crate::{_prelude::*, auth::TenantKey, source::TokenSource};

type SourceMap<S> = Arc<RwLock<HashMap<TenantKey, Arc<S>>>>;

/// Maps each tenant to exactly one token source.
///
/// Entries are never evicted: every source refreshes itself, so the map only grows with the
/// number of distinct tenants seen. Reads take the shared lock; a miss re-checks under the
/// exclusive lock before calling the factory, so racing callers for one key observe the
/// same `Arc` and the factory runs once.
pub struct TenantTokenCache<S = dyn TokenSource>(SourceMap<S>)
where
	S: ?Sized;
impl<S> TenantTokenCache<S>
where
	S: ?Sized,
{
	/// Creates an empty cache.
	pub fn new() -> Self {
		Self(Arc::new(RwLock::new(HashMap::new())))
	}

	/// Returns the source cached for `key`, if any.
	pub fn get(&self, key: &TenantKey) -> Option<Arc<S>> {
		self.0.read().get(key).cloned()
	}

	/// Returns the source for `key`, calling `factory` only if none exists yet.
	///
	/// `factory` runs while the exclusive lock is held and must not block or perform I/O.
	pub fn get_or_insert_with<F>(&self, key: &TenantKey, factory: F) -> Arc<S>
	where
		F: FnOnce() -> Arc<S>,
	{
		if let Some(source) = self.get(key) {
			return source;
		}

		self.0.write().entry(key.clone()).or_insert_with(factory).clone()
	}

	/// Whether a source exists for `key`.
	pub fn contains(&self, key: &TenantKey) -> bool {
		self.0.read().contains_key(key)
	}

	/// Number of tenants with a source.
	pub fn len(&self) -> usize {
		self.0.read().len()
	}

	/// Whether no tenant has been seen yet.
	pub fn is_empty(&self) -> bool {
		self.0.read().is_empty()
	}
}
impl<S> Clone for TenantTokenCache<S>
where
	S: ?Sized,
{
	fn clone(&self) -> Self {
		Self(self.0.clone())
	}
}
impl<S> Default for TenantTokenCache<S>
where
	S: ?Sized,
{
	fn default() -> Self {
		Self::new()
	}
}
impl<S> Debug for TenantTokenCache<S>
where
	S: ?Sized,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		let map = self.0.read();
		let mut tenants = map.keys().map(|key| key.as_ref()).collect::<Vec<_>>();

		tenants.sort_unstable();

		f.debug_struct("TenantTokenCache").field("tenants", &tenants).finish()
	}
}
