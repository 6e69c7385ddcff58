//! NuGet v3 protocol documents.

use serde::Deserialize;

/// Resource type of the flat container (package content) endpoint.
pub const PACKAGE_BASE_ADDRESS: &str = "PackageBaseAddress/3.0.0";

/// The v3 service index.
#[derive(Debug, Deserialize)]
pub struct ServiceIndex {
    /// Advertised resources.
    #[serde(default)]
    pub resources: Vec<Resource>,
}

/// A resource advertised by the service index.
#[derive(Debug, Deserialize)]
pub struct Resource {
    /// Resource URL.
    #[serde(rename = "@id")]
    pub id: String,
    /// Resource type, including its protocol version.
    #[serde(rename = "@type")]
    pub kind: String,
}

impl ServiceIndex {
    /// Base URL of the flat container, without a trailing slash.
    #[must_use]
    pub fn package_base_address(&self) -> Option<&str> {
        self.resources
            .iter()
            .find(|r| r.kind == PACKAGE_BASE_ADDRESS)
            .map(|r| r.id.trim_end_matches('/'))
    }
}

/// Version listing from `{base}/{id}/index.json`.
#[derive(Debug, Deserialize)]
pub struct VersionListing {
    /// Published versions, normalized and lowercased by the feed.
    #[serde(default)]
    pub versions: Vec<String>,
}

/// URL of the version listing for a package.
#[must_use]
pub fn versions_url(base: &str, package_name: &str) -> String {
    format!("{}/{}/index.json", base, package_name.to_lowercase())
}

/// URL of the `.nupkg` for a package version.
#[must_use]
pub fn package_url(base: &str, package_name: &str, version: &str) -> String {
    let id = package_name.to_lowercase();
    let version = version.to_lowercase();
    format!("{base}/{id}/{version}/{id}.{version}.nupkg")
}
