//! Strongly typed identifiers for repository coordinates and cache partitions.

// std
use std::{borrow::Borrow, ops::Deref};
// self
use crate::_prelude::*;

macro_rules! def_id {
	($name:ident, $doc:literal, $kind:literal) => {
		#[doc = $doc]
		#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
		#[serde(try_from = "String", into = "String")]
		pub struct $name(String);
		impl $name {
			/// Creates a new identifier after validation.
			pub fn new(value: impl AsRef<str>) -> Result<Self, IdentifierError> {
				let view = value.as_ref();

				validate_view($kind, view)?;

				Ok(Self(view.to_owned()))
			}
		}
		impl Deref for $name {
			type Target = str;

			fn deref(&self) -> &Self::Target {
				&self.0
			}
		}
		impl AsRef<str> for $name {
			fn as_ref(&self) -> &str {
				&self.0
			}
		}
		impl From<$name> for String {
			fn from(value: $name) -> Self {
				value.0
			}
		}
		impl TryFrom<String> for $name {
			type Error = IdentifierError;

			fn try_from(value: String) -> Result<Self, Self::Error> {
				validate_view($kind, &value)?;

				Ok(Self(value))
			}
		}
		impl Borrow<str> for $name {
			fn borrow(&self) -> &str {
				&self.0
			}
		}
		impl Debug for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				write!(f, concat!($kind, "({})"), self.0)
			}
		}
		impl Display for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				f.write_str(&self.0)
			}
		}
		impl FromStr for $name {
			type Err = IdentifierError;

			fn from_str(s: &str) -> Result<Self, Self::Err> {
				Self::new(s)
			}
		}
	};
}

const IDENTIFIER_MAX_LEN: usize = 128;

/// Error returned when identifier validation fails.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ThisError)]
pub enum IdentifierError {
	/// The identifier was empty.
	#[error("{kind} identifier cannot be empty.")]
	Empty {
		/// Kind of identifier (owner, repository, tenant).
		kind: &'static str,
	},
	/// The identifier contains whitespace characters.
	#[error("{kind} identifier contains whitespace.")]
	ContainsWhitespace {
		/// Kind of identifier (owner, repository, tenant).
		kind: &'static str,
	},
	/// The identifier contains a path separator.
	#[error("{kind} identifier contains a path separator.")]
	ContainsSeparator {
		/// Kind of identifier (owner, repository, tenant).
		kind: &'static str,
	},
	/// The identifier is `.` or `..`, which URL path handling would drop or resolve.
	#[error("{kind} identifier cannot be a dot segment.")]
	DotSegment {
		/// Kind of identifier (owner, repository, tenant).
		kind: &'static str,
	},
	/// The identifier exceeded the allowed character count.
	#[error("{kind} identifier exceeds {max} characters.")]
	TooLong {
		/// Kind of identifier (owner, repository, tenant).
		kind: &'static str,
		/// Maximum permitted character count.
		max: usize,
	},
}

def_id! { Owner, "Account or organization that owns a repository.", "Owner" }
def_id! { RepoName, "Repository name, unique within its owner.", "Repo" }
def_id! { TenantKey, "Cache partition key derived from a repository owner.", "Tenant" }

impl From<&Owner> for TenantKey {
	fn from(owner: &Owner) -> Self {
		// Owners are validated with the same rules.
		Self(owner.0.clone())
	}
}

/// Fully qualified repository coordinate (`owner/repo`).
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepoRef {
	/// Owning account.
	pub owner: Owner,
	/// Repository name.
	pub repo: RepoName,
}
impl RepoRef {
	/// Validates both components and builds the coordinate.
	pub fn new(owner: impl AsRef<str>, repo: impl AsRef<str>) -> Result<Self, IdentifierError> {
		Ok(Self { owner: Owner::new(owner)?, repo: RepoName::new(repo)? })
	}

	/// Cache partition for this repository; repositories of one owner share it.
	pub fn tenant_key(&self) -> TenantKey {
		TenantKey::from(&self.owner)
	}
}
impl Debug for RepoRef {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "RepoRef({}/{})", self.owner, self.repo)
	}
}
impl Display for RepoRef {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "{}/{}", self.owner, self.repo)
	}
}

fn validate_view(kind: &'static str, view: &str) -> Result<(), IdentifierError> {
	if view.is_empty() {
		return Err(IdentifierError::Empty { kind });
	}
	if view.chars().any(char::is_whitespace) {
		return Err(IdentifierError::ContainsWhitespace { kind });
	}
	if view.contains('/') {
		return Err(IdentifierError::ContainsSeparator { kind });
	}
	if is_dot_segment(view) {
		return Err(IdentifierError::DotSegment { kind });
	}
	if view.len() > IDENTIFIER_MAX_LEN {
		return Err(IdentifierError::TooLong { kind, max: IDENTIFIER_MAX_LEN });
	}

	Ok(())
}

/// Whether `segment` is `.` or `..`.
pub fn is_dot_segment(segment: &str) -> bool {
	matches!(segment, "." | "..")
}
