//! Installer settings and resolved paths.
//!
//! [`InstallerSettings`] captures the agent environment the installer reads.
//! [`ResolvedEnvironment`] is what the installer produces for the runner:
//! the packages directory, the tool directory and the executable path.
//!
//! Overrides read from the environment:
//! - `MSDO_FILEPATH` - Use this executable and skip installation
//! - `MSDO_DIRECTORY` - Use `guardian` from this directory and skip installation
//! - `MSDO_VERSION` - Requested CLI version
//! - `MSDO_DOTNETDEPENDENTPACKAGE` - Install the framework-dependent package
//! - `AGENT_ROOTDIRECTORY` - Build agent root, parent of `_msdo`
//! - `MSDO_PACKAGES_DIRECTORY` - Guardian packages directory
//! - `MSDO_NUGET_INDEX_URL` - Alternate NuGet v3 service index

use crate::platform::PackageFlavor;
use serde::Serialize;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Environment variable holding an explicit executable path.
pub const MSDO_FILEPATH: &str = "MSDO_FILEPATH";
/// Environment variable holding an explicit installation directory.
pub const MSDO_DIRECTORY: &str = "MSDO_DIRECTORY";
/// Environment variable holding the requested version.
pub const MSDO_VERSION: &str = "MSDO_VERSION";
/// Environment variable selecting the framework-dependent package.
pub const MSDO_DOTNET_DEPENDENT_PACKAGE: &str = "MSDO_DOTNETDEPENDENTPACKAGE";
/// Environment variable holding the build agent root directory.
pub const AGENT_ROOT_DIRECTORY: &str = "AGENT_ROOTDIRECTORY";
/// Environment variable holding the packages directory.
pub const MSDO_PACKAGES_DIRECTORY: &str = "MSDO_PACKAGES_DIRECTORY";
/// Environment variable overriding the NuGet service index.
pub const MSDO_NUGET_INDEX_URL: &str = "MSDO_NUGET_INDEX_URL";
/// Environment variable the CLI reads its settings folders from.
pub const GDN_SETTINGS_FOLDERS: &str = "GDN_SETTINGS_FOLDERS";

/// Public NuGet v3 service index.
pub const DEFAULT_INDEX_URL: &str = "https://api.nuget.org/v3/index.json";

/// File name of the CLI executable, without platform suffix.
pub const TOOL_NAME: &str = "guardian";

/// Settings read from the build agent environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallerSettings {
    /// Explicit executable path; skips installation entirely.
    pub executable_override: Option<PathBuf>,
    /// Explicit installation directory; skips installation entirely.
    pub directory_override: Option<PathBuf>,
    /// Requested version, if set in the environment.
    pub version: Option<String>,
    /// Which package build to install.
    pub flavor: PackageFlavor,
    /// Agent root directory under which `_msdo` is created.
    pub agent_root: Option<PathBuf>,
    /// Explicit packages directory.
    pub packages_directory: Option<PathBuf>,
    /// NuGet v3 service index URL.
    pub index_url: String,
}

impl Default for InstallerSettings {
    fn default() -> Self {
        Self {
            executable_override: None,
            directory_override: None,
            version: None,
            flavor: PackageFlavor::default(),
            agent_root: None,
            packages_directory: None,
            index_url: DEFAULT_INDEX_URL.to_string(),
        }
    }
}

impl InstallerSettings {
    /// Read settings from the process environment.
    ///
    /// Empty values are treated as unset.
    #[must_use]
    pub fn from_env() -> Self {
        let framework_dependent = non_empty_var(MSDO_DOTNET_DEPENDENT_PACKAGE)
            .is_some_and(|v| !matches!(v.to_lowercase().as_str(), "false" | "0"));

        Self {
            executable_override: non_empty_var(MSDO_FILEPATH).map(PathBuf::from),
            directory_override: non_empty_var(MSDO_DIRECTORY).map(PathBuf::from),
            version: non_empty_var(MSDO_VERSION),
            flavor: if framework_dependent {
                PackageFlavor::FrameworkDependent
            } else {
                PackageFlavor::SelfContained
            },
            agent_root: non_empty_var(AGENT_ROOT_DIRECTORY).map(PathBuf::from),
            packages_directory: non_empty_var(MSDO_PACKAGES_DIRECTORY).map(PathBuf::from),
            index_url: non_empty_var(MSDO_NUGET_INDEX_URL)
                .unwrap_or_else(|| DEFAULT_INDEX_URL.to_string()),
        }
    }

    /// Set the agent root directory.
    #[must_use]
    pub fn with_agent_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.agent_root = Some(path.into());
        self
    }

    /// Set the service index URL.
    #[must_use]
    pub fn with_index_url(mut self, url: impl Into<String>) -> Self {
        self.index_url = url.into();
        self
    }

    /// Set the package flavor.
    #[must_use]
    pub fn with_flavor(mut self, flavor: PackageFlavor) -> Self {
        self.flavor = flavor;
        self
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

/// Paths resolved by the installer and consumed by the runner.
///
/// Starts empty. The installer fills it in once per run, either from an
/// override or from the installed package.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResolvedEnvironment {
    /// Guardian packages directory.
    pub packages_dir: Option<PathBuf>,
    /// Directory containing the executable.
    pub tool_dir: Option<PathBuf>,
    /// Path of the executable.
    pub executable: Option<PathBuf>,
}

impl ResolvedEnvironment {
    /// Create an empty environment.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Executable path, if resolved.
    #[must_use]
    pub fn executable(&self) -> Option<&Path> {
        self.executable.as_deref()
    }

    /// Value for `GDN_SETTINGS_FOLDERS`, if the packages directory is known.
    #[must_use]
    pub fn gdn_settings_folders(&self) -> Option<String> {
        self.packages_dir
            .as_ref()
            .map(|dir| format!("Install={}", dir.display()))
    }

    /// Variables to export into the tool's process environment.
    #[must_use]
    pub fn exports(&self) -> Vec<(&'static str, OsString)> {
        let mut vars = Vec::new();
        if let Some(dir) = &self.packages_dir {
            vars.push((MSDO_PACKAGES_DIRECTORY, dir.clone().into_os_string()));
        }
        if let Some(dir) = &self.tool_dir {
            vars.push((MSDO_DIRECTORY, dir.clone().into_os_string()));
        }
        if let Some(path) = &self.executable {
            vars.push((MSDO_FILEPATH, path.clone().into_os_string()));
        }
        if let Some(folders) = self.gdn_settings_folders() {
            vars.push((GDN_SETTINGS_FOLDERS, OsString::from(folders)));
        }
        vars
    }
}

/// Whether the executable exists at `path`.
///
/// On platforms with an executable suffix, `path` + suffix is accepted too.
#[must_use]
pub fn executable_exists(path: &Path) -> bool {
    if path.exists() {
        return true;
    }
    let suffix = std::env::consts::EXE_SUFFIX;
    if suffix.is_empty() {
        return false;
    }
    let mut with_suffix = path.as_os_str().to_owned();
    with_suffix.push(suffix);
    Path::new(&with_suffix).exists()
}
