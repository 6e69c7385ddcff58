//! Installer orchestration.

use crate::cache::{is_installed, set_variables};
use crate::retry::{RetryConfig, with_retry};
use msdo_core::environment::TOOL_NAME;
use msdo_core::{
    AcquireRequest, Error, InstallNuGetPackageResponse, InstallerSettings, PackageAcquirer,
    Platform, ResolvedEnvironment, Result, VersionSpecifier, resolve_package_name,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Working directory created under the agent root.
pub const MSDO_ROOT: &str = "_msdo";
/// Default packages directory under [`MSDO_ROOT`].
pub const PACKAGES_DIR: &str = "packages";
/// Versions directory under [`MSDO_ROOT`].
pub const VERSIONS_DIR: &str = "versions";

/// How the CLI location was determined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallOutcome {
    /// `MSDO_FILEPATH` pointed at an executable.
    ExecutableOverride,
    /// `MSDO_DIRECTORY` pointed at an installation.
    DirectoryOverride,
    /// The exact version was already present in the versions directory.
    AlreadyInstalled {
        /// Package identifier
        package: String,
    },
    /// The acquirer resolved and staged a package.
    Acquired {
        /// Package identifier
        package: String,
        /// Acquisition response
        response: InstallNuGetPackageResponse,
    },
}

/// Ensures the MSDO CLI is present and records where it lives.
pub struct Installer {
    settings: InstallerSettings,
    platform: Platform,
    acquirer: Arc<dyn PackageAcquirer>,
    retry: RetryConfig,
}

impl Installer {
    /// Create an installer for the current platform.
    #[must_use]
    pub fn new(settings: InstallerSettings, acquirer: Arc<dyn PackageAcquirer>) -> Self {
        Self {
            settings,
            platform: Platform::current(),
            acquirer,
            retry: RetryConfig::default(),
        }
    }

    /// Resolve packages for a different platform.
    #[must_use]
    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    /// Replace the retry configuration.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Settings this installer was created with.
    #[must_use]
    pub fn settings(&self) -> &InstallerSettings {
        &self.settings
    }

    /// Make the requested CLI version available and fill in `env`.
    ///
    /// On success `env.executable` is always set. On error the tool must not
    /// be run.
    ///
    /// # Errors
    ///
    /// - [`Error::Configuration`] if no agent root is configured
    /// - [`Error::Io`] if a working directory cannot be created
    /// - [`Error::InstallationFailed`] if every acquisition attempt failed or
    ///   the registry reported an unsuccessful install
    /// - [`Error::InstallationNotFound`] if the executable is missing after a
    ///   reported success
    pub async fn install(
        &self,
        version: &VersionSpecifier,
        env: &mut ResolvedEnvironment,
    ) -> Result<InstallOutcome> {
        info!("Installing Microsoft Security DevOps Cli version: {version}");

        if let Some(path) = &self.settings.executable_override {
            info!(
                "MSDO CLI File Path overriden by %MSDO_FILEPATH%: {}",
                path.display()
            );
            env.packages_dir.clone_from(&self.settings.packages_directory);
            env.executable = Some(path.clone());
            return Ok(InstallOutcome::ExecutableOverride);
        }

        if let Some(dir) = &self.settings.directory_override {
            info!(
                "MSDO CLI Directory overriden by %MSDO_DIRECTORY%: {}",
                dir.display()
            );
            let executable = dir.join(TOOL_NAME);
            debug!(?executable, "Resolved executable from directory override");
            env.packages_dir.clone_from(&self.settings.packages_directory);
            env.tool_dir = Some(dir.clone());
            env.executable = Some(executable);
            return Ok(InstallOutcome::DirectoryOverride);
        }

        let package_name = resolve_package_name(self.settings.flavor, self.platform);
        let versions_dir = self.prepare_directories(env)?;

        if is_installed(env, &versions_dir, package_name, version) {
            return Ok(InstallOutcome::AlreadyInstalled {
                package: package_name.to_string(),
            });
        }

        let response = self.acquire(package_name, version, &versions_dir).await?;

        set_variables(
            env,
            &versions_dir,
            package_name,
            &response.resolved_version,
            true,
        )?;

        if response.in_cache {
            info!(
                "{package_name} version {} already installed",
                response.resolved_version
            );
        } else {
            info!(
                "Installed {package_name} version {}",
                response.resolved_version
            );
        }

        Ok(InstallOutcome::Acquired {
            package: package_name.to_string(),
            response,
        })
    }

    /// Create `_msdo`, the packages directory and the versions directory.
    ///
    /// Returns the versions directory.
    fn prepare_directories(&self, env: &mut ResolvedEnvironment) -> Result<PathBuf> {
        let agent_root = self.settings.agent_root.as_ref().ok_or_else(|| {
            Error::configuration(
                "AGENT_ROOTDIRECTORY is not set; cannot locate the MSDO working directory",
            )
        })?;

        let agent_dir = agent_root.join(MSDO_ROOT);
        debug!(?agent_dir, "Ensuring agent directory");
        ensure_directory(&agent_dir)?;

        let packages_dir = if let Some(dir) = &self.settings.packages_directory {
            dir.clone()
        } else {
            let dir = agent_dir.join(PACKAGES_DIR);
            debug!(?dir, "Ensuring packages directory");
            ensure_directory(&dir)?;
            dir
        };
        env.packages_dir = Some(packages_dir);

        let versions_dir = agent_dir.join(VERSIONS_DIR);
        debug!(?versions_dir, "Ensuring versions directory");
        ensure_directory(&versions_dir)?;

        Ok(versions_dir)
    }

    async fn acquire(
        &self,
        package_name: &str,
        version: &VersionSpecifier,
        versions_dir: &Path,
    ) -> Result<InstallNuGetPackageResponse> {
        let request = AcquireRequest {
            index_url: &self.settings.index_url,
            package_name,
            version,
            destination: versions_dir,
        };
        let request = &request;

        debug!(
            acquirer = self.acquirer.name(),
            index_url = %self.settings.index_url,
            "Acquiring {package_name}"
        );

        let response = with_retry(&self.retry, |attempt| {
            debug!(attempt, "Acquisition attempt");
            self.acquirer.acquire(request)
        })
        .await
        .map_err(|exhausted| {
            debug!(error = %exhausted.last_error, "Last acquisition error");
            Error::installation_failed(
                package_name,
                format!(
                    "{} attempt(s) failed, last error: {}",
                    exhausted.attempts, exhausted.last_error
                ),
            )
        })?;

        if !response.success {
            return Err(Error::installation_failed(
                package_name,
                format!(
                    "the registry reported an unsuccessful install of version {}",
                    response.resolved_version
                ),
            ));
        }

        Ok(response)
    }
}

fn ensure_directory(path: &Path) -> Result<()> {
    std::fs::create_dir_all(path).map_err(|e| Error::io(e, path, "create"))
}
