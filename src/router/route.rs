//! Request path parsing.

// self
use crate::{
	_prelude::*,
	auth::{self, RepoRef},
};

/// Asset request extracted from an inbound path.
///
/// Accepted shapes:
///
/// - `/{owner}/{repo}/{tag}`: the asset named like the tag.
/// - `/{owner}/{repo}/{tag}/{file}`
/// - `/{owner}/{repo}/releases/download/{tag}/{file}`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssetRoute {
	/// Repository the release belongs to.
	pub repo: RepoRef,
	/// Release tag.
	pub tag: String,
	/// Requested asset name, when it differs from the tag.
	pub file: Option<String>,
}
impl AssetRoute {
	/// Parses `path`; returns `None` for anything that is not one of the accepted shapes.
	pub fn parse(path: &str) -> Option<Self> {
		let segments = path.strip_prefix('/').unwrap_or(path).split('/').collect::<Vec<_>>();
		let (owner, repo, tag, file) = match segments.as_slice() {
			[owner, repo, "releases", "download", tag, file] => (*owner, *repo, *tag, Some(*file)),
			[owner, repo, tag, file] => (*owner, *repo, *tag, Some(*file)),
			[owner, repo, tag] => (*owner, *repo, *tag, None),
			_ => return None,
		};

		if tag.is_empty() || auth::is_dot_segment(tag) {
			return None;
		}
		if file.is_some_and(|file| file.is_empty() || auth::is_dot_segment(file)) {
			return None;
		}

		Some(Self {
			repo: RepoRef::new(owner, repo).ok()?,
			tag: tag.to_owned(),
			file: file.map(ToOwned::to_owned),
		})
	}

	/// Name the release asset must match exactly.
	pub fn asset_name(&self) -> &str {
		self.file.as_deref().unwrap_or(&self.tag)
	}
}
impl Display for AssetRoute {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "{}@{}/{}", self.repo, self.tag, self.asset_name())
	}
}
