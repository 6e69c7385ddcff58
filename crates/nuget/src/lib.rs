//! NuGet v3 package acquirer for msdo.
//!
//! Resolves a package version against a NuGet v3 feed and stages the
//! package under a versions directory. Supports:
//! - Exact versions, `latest` and `latest-prerelease`
//! - Reusing an already-extracted package directory without downloading
//! - Atomic extraction of `.nupkg` archives

mod extract;
mod index;
mod version;

use async_trait::async_trait;
use msdo_core::{AcquireRequest, Error, InstallNuGetPackageResponse, PackageAcquirer, Result};
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, info};

pub use extract::extract_package;
pub use index::{PACKAGE_BASE_ADDRESS, ServiceIndex, VersionListing, package_url, versions_url};
pub use version::{NuGetVersion, select_version};

/// Time allowed to establish a connection to the feed.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
/// Time allowed for a single request, package download included.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// Package acquirer backed by a NuGet v3 feed.
pub struct NuGetClient {
    client: Client,
}

impl NuGetClient {
    /// Create a client with the default HTTP configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be initialized.
    pub fn new() -> Result<Self> {
        Self::with_timeouts(CONNECT_TIMEOUT, REQUEST_TIMEOUT)
    }

    /// Create a client that gives up on a stalled feed after `request`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be initialized.
    pub fn with_timeouts(connect: Duration, request: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("msdo/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(connect)
            .timeout(request)
            .build()
            .map_err(|e| Error::registry(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self { client })
    }

    /// Create a client around an existing HTTP client.
    #[must_use]
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::registry(format!("Request to {url} failed: {e}")))?;

        if !response.status().is_success() {
            return Err(Error::registry(format!(
                "Request to {url} failed (HTTP {})",
                response.status()
            )));
        }
        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        self.get(url)
            .await?
            .json()
            .await
            .map_err(|e| Error::registry(format!("Failed to parse {url}: {e}")))
    }

    /// Find the flat container base address advertised by a service index.
    ///
    /// # Errors
    ///
    /// Returns a registry error if the index cannot be fetched or does not
    /// advertise a `PackageBaseAddress/3.0.0` resource.
    pub async fn package_base_address(&self, index_url: &str) -> Result<String> {
        debug!(%index_url, "Fetching NuGet service index");
        let index: ServiceIndex = self.get_json(index_url).await?;
        index
            .package_base_address()
            .map(String::from)
            .ok_or_else(|| {
                Error::registry(format!(
                    "Service index {index_url} has no {PACKAGE_BASE_ADDRESS} resource"
                ))
            })
    }

    /// List every published version of a package.
    ///
    /// # Errors
    ///
    /// Returns a registry error if the listing cannot be fetched or parsed.
    pub async fn list_versions(&self, base: &str, package_name: &str) -> Result<Vec<String>> {
        let url = versions_url(base, package_name);
        debug!(%url, "Fetching package versions");
        let listing: VersionListing = self.get_json(&url).await?;
        Ok(listing.versions)
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>> {
        debug!(%url, "Downloading package");
        self.get(url)
            .await?
            .bytes()
            .await
            .map(|b| b.to_vec())
            .map_err(|e| Error::registry(format!("Failed to read package from {url}: {e}")))
    }
}

#[async_trait]
impl PackageAcquirer for NuGetClient {
    fn name(&self) -> &'static str {
        "nuget"
    }

    async fn acquire(&self, request: &AcquireRequest<'_>) -> Result<InstallNuGetPackageResponse> {
        let base = self.package_base_address(request.index_url).await?;
        let versions = self.list_versions(&base, request.package_name).await?;

        let resolved = select_version(&versions, request.version).ok_or_else(|| {
            Error::registry(format!(
                "No version of {} matches '{}'",
                request.package_name, request.version
            ))
        })?;
        debug!(package = request.package_name, requested = %request.version, %resolved, "Resolved package version");

        let package_dir = request
            .destination
            .join(format!("{}.{}", request.package_name, resolved));
        if package_dir.exists() {
            debug!(?package_dir, "Package already extracted");
            return Ok(InstallNuGetPackageResponse::cached(resolved));
        }

        let data = self
            .download(&package_url(&base, request.package_name, resolved))
            .await?;
        extract_package(&data, &package_dir).map_err(|e| match e {
            Error::Io {
                source,
                path,
                operation,
            } => {
                let path = path.as_deref().unwrap_or(package_dir.as_path());
                Error::registry(format!(
                    "Failed to extract {} {resolved}: {operation} {} failed: {source}",
                    request.package_name,
                    path.display()
                ))
            }
            other => other,
        })?;

        info!(
            package = request.package_name,
            version = %resolved,
            bytes = data.len(),
            "Fetched NuGet package"
        );
        Ok(InstallNuGetPackageResponse::installed(resolved))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::tests::create_test_package;
    use msdo_core::VersionSpecifier;
    use serde_json::json;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const PACKAGE: &str = "Microsoft.Security.Devops.Cli.linux-x64";
    const PACKAGE_LOWER: &str = "microsoft.security.devops.cli.linux-x64";

    async fn mount_feed(server: &MockServer, versions: &[&str]) {
        Mock::given(method("GET"))
            .and(path("/v3/index.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "version": "3.0.0",
                "resources": [
                    {"@id": format!("{}/flat/", server.uri()), "@type": "PackageBaseAddress/3.0.0"}
                ]
            })))
            .mount(server)
            .await;

        Mock::given(method("GET"))
            .and(path(format!("/flat/{PACKAGE_LOWER}/index.json")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "versions": versions })))
            .mount(server)
            .await;
    }

    async fn mount_package(server: &MockServer, version: &str, expected_downloads: u64) {
        let body = create_test_package(&[("tools/guardian", b"#!/bin/sh\n")]);
        Mock::given(method("GET"))
            .and(path(format!(
                "/flat/{PACKAGE_LOWER}/{version}/{PACKAGE_LOWER}.{version}.nupkg"
            )))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(body))
            .expect(expected_downloads)
            .mount(server)
            .await;
    }

    fn client() -> NuGetClient {
        NuGetClient::with_client(Client::new())
    }

    #[tokio::test]
    async fn test_acquire_latest_downloads_and_extracts() {
        let server = MockServer::start().await;
        mount_feed(&server, &["1.0.0", "2.0.0", "2.1.0-preview"]).await;
        mount_package(&server, "2.0.0", 1).await;
        let temp = TempDir::new().unwrap();
        let index_url = format!("{}/v3/index.json", server.uri());

        let response = client()
            .acquire(&AcquireRequest {
                index_url: &index_url,
                package_name: PACKAGE,
                version: &VersionSpecifier::Latest,
                destination: temp.path(),
            })
            .await
            .unwrap();

        assert_eq!(response, InstallNuGetPackageResponse::installed("2.0.0"));
        assert!(
            temp.path()
                .join(format!("{PACKAGE}.2.0.0"))
                .join("tools")
                .join("guardian")
                .is_file()
        );
    }

    #[tokio::test]
    async fn test_acquire_twice_downloads_once() {
        let server = MockServer::start().await;
        mount_feed(&server, &["1.0.0", "1.1.0-beta"]).await;
        mount_package(&server, "1.1.0-beta", 1).await;
        let temp = TempDir::new().unwrap();
        let index_url = format!("{}/v3/index.json", server.uri());
        let spec = VersionSpecifier::LatestPrerelease;
        let request = AcquireRequest {
            index_url: &index_url,
            package_name: PACKAGE,
            version: &spec,
            destination: temp.path(),
        };
        let client = client();

        let first = client.acquire(&request).await.unwrap();
        let second = client.acquire(&request).await.unwrap();

        assert!(!first.in_cache);
        assert!(second.in_cache);
        assert_eq!(first.resolved_version, second.resolved_version);
        // MockServer verifies the single download on drop
    }

    #[tokio::test]
    async fn test_acquire_existing_directory_skips_download() {
        let server = MockServer::start().await;
        mount_feed(&server, &["3.0.0"]).await;
        mount_package(&server, "3.0.0", 0).await;
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join(format!("{PACKAGE}.3.0.0"))).unwrap();
        let index_url = format!("{}/v3/index.json", server.uri());

        let response = client()
            .acquire(&AcquireRequest {
                index_url: &index_url,
                package_name: PACKAGE,
                version: &VersionSpecifier::Latest,
                destination: temp.path(),
            })
            .await
            .unwrap();

        assert_eq!(response, InstallNuGetPackageResponse::cached("3.0.0"));
    }

    #[tokio::test]
    async fn test_acquire_unknown_exact_version() {
        let server = MockServer::start().await;
        mount_feed(&server, &["1.0.0"]).await;
        let temp = TempDir::new().unwrap();
        let index_url = format!("{}/v3/index.json", server.uri());

        let result = client()
            .acquire(&AcquireRequest {
                index_url: &index_url,
                package_name: PACKAGE,
                version: &VersionSpecifier::parse("9.9.9"),
                destination: temp.path(),
            })
            .await;

        assert!(matches!(result, Err(Error::Registry { .. })));
    }

    #[tokio::test]
    async fn test_service_index_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v3/index.json"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let result = client()
            .package_base_address(&format!("{}/v3/index.json", server.uri()))
            .await;

        let Err(Error::Registry { message }) = result else {
            panic!("expected registry error");
        };
        assert!(message.contains("503"));
    }

    #[tokio::test]
    async fn test_service_index_without_flat_container() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v3/index.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"resources": []})))
            .mount(&server)
            .await;

        let result = client()
            .package_base_address(&format!("{}/v3/index.json", server.uri()))
            .await;

        assert!(matches!(result, Err(Error::Registry { .. })));
    }

    #[tokio::test]
    async fn test_stalled_feed_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v3/index.json"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .mount(&server)
            .await;
        let temp = TempDir::new().unwrap();
        let index_url = format!("{}/v3/index.json", server.uri());
        let client =
            NuGetClient::with_timeouts(Duration::from_secs(1), Duration::from_millis(200)).unwrap();

        let result = tokio::time::timeout(
            Duration::from_secs(10),
            client.acquire(&AcquireRequest {
                index_url: &index_url,
                package_name: PACKAGE,
                version: &VersionSpecifier::Latest,
                destination: temp.path(),
            }),
        )
        .await
        .expect("request should time out on its own");

        assert!(matches!(result, Err(Error::Registry { .. })));
    }

    #[tokio::test]
    async fn test_package_download_failure() {
        let server = MockServer::start().await;
        mount_feed(&server, &["1.0.0"]).await;
        Mock::given(method("GET"))
            .and(path(format!(
                "/flat/{PACKAGE_LOWER}/1.0.0/{PACKAGE_LOWER}.1.0.0.nupkg"
            )))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        let temp = TempDir::new().unwrap();
        let index_url = format!("{}/v3/index.json", server.uri());

        let result = client()
            .acquire(&AcquireRequest {
                index_url: &index_url,
                package_name: PACKAGE,
                version: &VersionSpecifier::Latest,
                destination: temp.path(),
            })
            .await;

        let Err(Error::Registry { message }) = result else {
            panic!("expected registry error");
        };
        assert!(message.contains("500"));
        assert_eq!(std::fs::read_dir(temp.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_extraction_failure_is_registry_error() {
        let server = MockServer::start().await;
        mount_feed(&server, &["1.0.0"]).await;
        mount_package(&server, "1.0.0", 1).await;
        let temp = TempDir::new().unwrap();
        let destination = temp.path().join("versions");
        std::fs::write(&destination, b"not a directory").unwrap();
        let index_url = format!("{}/v3/index.json", server.uri());

        let result = client()
            .acquire(&AcquireRequest {
                index_url: &index_url,
                package_name: PACKAGE,
                version: &VersionSpecifier::Latest,
                destination: &destination,
            })
            .await;

        let Err(Error::Registry { message }) = result else {
            panic!("expected registry error");
        };
        assert!(message.contains(&destination.display().to_string()));
    }

    #[test]
    fn test_default_timeouts() {
        assert_eq!(CONNECT_TIMEOUT, Duration::from_secs(10));
        assert_eq!(REQUEST_TIMEOUT, Duration::from_secs(300));
        assert!(NuGetClient::new().is_ok());
    }

    #[test]
    fn test_acquirer_name() {
        assert_eq!(client().name(), "nuget");
    }
}
