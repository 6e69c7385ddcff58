//! Package acquisition trait.
//!
//! An acquirer turns a package identifier and a [`VersionSpecifier`] into a
//! concrete version staged on disk as `{destination}/{package}.{version}`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::Result;
use crate::version::VersionSpecifier;

/// Request parameters for a package acquisition.
#[derive(Debug, Clone, Copy)]
pub struct AcquireRequest<'a> {
    /// Package registry service index URL.
    pub index_url: &'a str,
    /// Package identifier (e.g., "Microsoft.Security.Devops.Cli.linux-x64").
    pub package_name: &'a str,
    /// Requested version.
    pub version: &'a VersionSpecifier,
    /// Directory the package is extracted under.
    pub destination: &'a Path,
}

/// Outcome of an acquisition attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallNuGetPackageResponse {
    /// Whether the package is present at the destination.
    pub success: bool,
    /// Concrete version the request resolved to.
    pub resolved_version: String,
    /// Whether the package directory already existed.
    pub in_cache: bool,
}

impl InstallNuGetPackageResponse {
    /// A package that was downloaded and extracted.
    #[must_use]
    pub fn installed(version: impl Into<String>) -> Self {
        Self {
            success: true,
            resolved_version: version.into(),
            in_cache: false,
        }
    }

    /// A package whose directory already existed.
    #[must_use]
    pub fn cached(version: impl Into<String>) -> Self {
        Self {
            success: true,
            resolved_version: version.into(),
            in_cache: true,
        }
    }
}

/// Trait for package registries the installer can acquire from.
///
/// # Example
///
/// ```ignore
/// let response = acquirer.acquire(&AcquireRequest {
///     index_url: DEFAULT_INDEX_URL,
///     package_name: "Microsoft.Security.Devops.Cli.linux-x64",
///     version: &VersionSpecifier::Latest,
///     destination: &versions_dir,
/// }).await?;
/// ```
#[async_trait]
pub trait PackageAcquirer: Send + Sync {
    /// Registry name for logs (e.g., "nuget").
    fn name(&self) -> &'static str;

    /// Resolve the version and stage the package under the destination.
    ///
    /// If `{destination}/{package}.{resolved}` already exists the package
    /// must not be downloaded again, and the response reports `in_cache`.
    ///
    /// # Errors
    ///
    /// Returns a registry error if resolution, download, or extraction fails.
    async fn acquire(&self, request: &AcquireRequest<'_>) -> Result<InstallNuGetPackageResponse>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_constructors() {
        assert_eq!(
            InstallNuGetPackageResponse::installed("2.0.0"),
            InstallNuGetPackageResponse {
                success: true,
                resolved_version: "2.0.0".into(),
                in_cache: false,
            }
        );
        assert!(InstallNuGetPackageResponse::cached("2.0.0").in_cache);
    }

    #[test]
    fn test_response_serialization() {
        let json = serde_json::to_string(&InstallNuGetPackageResponse::cached("1.9.0")).unwrap();
        assert!(json.contains("\"resolvedVersion\":\"1.9.0\""));
        assert!(json.contains("\"inCache\":true"));
    }
}
