//! Release metadata returned by the provider.

// self
use crate::_prelude::*;

/// Subset of a release payload the proxy reads.
#[derive(Clone, Debug, Deserialize)]
pub struct Release {
	/// Assets in provider order.
	#[serde(default)]
	pub assets: Vec<ReleaseAsset>,
}
impl Release {
	/// First asset whose name equals `name` exactly (case-sensitive).
	pub fn find_asset(&self, name: &str) -> Option<&ReleaseAsset> {
		self.assets.iter().find(|asset| asset.name == name)
	}
}

/// Downloadable release asset.
#[derive(Clone, Debug, Deserialize)]
pub struct ReleaseAsset {
	/// File name.
	pub name: String,
	/// Media type declared at upload.
	#[serde(default)]
	pub content_type: Option<String>,
	/// Browser download link; requires a session, so the proxy never fetches it.
	#[serde(rename = "browser_download_url", default)]
	pub download_url: Option<String>,
	/// API URL that serves the bytes when requested with `Accept: application/octet-stream`.
	#[serde(rename = "url")]
	pub api_url: Url,
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn first_exact_match_wins() {
		let release: Release = serde_json::from_value(serde_json::json!({
			"tag_name": "v1",
			"assets": [
				{ "name": "Widgets.tar.gz", "url": "https://api.example.com/assets/1" },
				{ "name": "widgets.tar.gz", "url": "https://api.example.com/assets/2",
				  "content_type": "application/gzip",
				  "browser_download_url": "https://example.com/download/widgets.tar.gz" },
				{ "name": "widgets.tar.gz", "url": "https://api.example.com/assets/3" }
			]
		}))
		.expect("Release fixture should deserialize.");
		let asset = release.find_asset("widgets.tar.gz").expect("Asset should match.");

		assert_eq!(asset.api_url.as_str(), "https://api.example.com/assets/2");
		assert_eq!(asset.content_type.as_deref(), Some("application/gzip"));
		assert!(release.find_asset("widgets").is_none());
		assert!(release.find_asset("WIDGETS.TAR.GZ").is_none());
	}
}
