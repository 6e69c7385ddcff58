//! Platform identification and package name resolution.
//!
//! The MSDO CLI is published to NuGet under four identifiers: a
//! framework-dependent package that runs anywhere .NET is installed, and
//! three self-contained packages for Windows x64, Linux x64 and Linux ARM64.

use tracing::debug;

/// Identifier of the framework-dependent (cross-platform) package.
pub const GENERIC_PACKAGE: &str = "Microsoft.Security.Devops.Cli";
/// Identifier of the self-contained Windows x64 package.
pub const WIN_X64_PACKAGE: &str = "Microsoft.Security.Devops.Cli.win-x64";
/// Identifier of the self-contained Linux x64 package.
pub const LINUX_X64_PACKAGE: &str = "Microsoft.Security.Devops.Cli.linux-x64";
/// Identifier of the self-contained Linux ARM64 package.
pub const LINUX_ARM64_PACKAGE: &str = "Microsoft.Security.Devops.Cli.linux-arm64";

/// Platform identifier combining OS and architecture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Platform {
    pub os: Os,
    pub arch: Arch,
}

impl Platform {
    /// Create a new platform.
    #[must_use]
    pub fn new(os: Os, arch: Arch) -> Self {
        Self { os, arch }
    }

    /// Get the current platform.
    #[must_use]
    pub fn current() -> Self {
        Self {
            os: Os::current(),
            arch: Arch::current(),
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.os, self.arch)
    }
}

/// Operating system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Os {
    Windows,
    Linux,
    MacOs,
    Other,
}

impl Os {
    /// Get the current OS.
    #[must_use]
    pub fn current() -> Self {
        Self::parse(std::env::consts::OS)
    }

    /// Parse from string. Unknown systems map to [`Os::Other`].
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "windows" | "win32" => Self::Windows,
            "linux" => Self::Linux,
            "macos" | "darwin" => Self::MacOs,
            _ => Self::Other,
        }
    }
}

impl std::fmt::Display for Os {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Windows => write!(f, "windows"),
            Self::Linux => write!(f, "linux"),
            Self::MacOs => write!(f, "macos"),
            Self::Other => write!(f, "other"),
        }
    }
}

/// CPU architecture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arch {
    X64,
    Arm64,
    Other,
}

impl Arch {
    /// Get the current architecture.
    #[must_use]
    pub fn current() -> Self {
        Self::parse(std::env::consts::ARCH)
    }

    /// Parse from string. Unknown architectures map to [`Arch::Other`].
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "x86_64" | "amd64" | "x64" => Self::X64,
            "aarch64" | "arm64" => Self::Arm64,
            _ => Self::Other,
        }
    }
}

impl std::fmt::Display for Arch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::X64 => write!(f, "x64"),
            Self::Arm64 => write!(f, "arm64"),
            Self::Other => write!(f, "other"),
        }
    }
}

/// Which build of the CLI to install.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PackageFlavor {
    /// Self-contained package for the agent platform.
    #[default]
    SelfContained,
    /// Package that depends on an installed .NET runtime.
    FrameworkDependent,
}

/// Resolve the NuGet package identifier for a platform.
///
/// The framework-dependent flavor always wins; otherwise Windows gets the
/// x64 build, Linux gets the ARM64 or x64 build, and everything else falls
/// back to the framework-dependent package.
#[must_use]
pub fn resolve_package_name(flavor: PackageFlavor, platform: Platform) -> &'static str {
    let package_name = match (flavor, platform.os, platform.arch) {
        (PackageFlavor::FrameworkDependent, _, _) => GENERIC_PACKAGE,
        (PackageFlavor::SelfContained, Os::Windows, _) => WIN_X64_PACKAGE,
        (PackageFlavor::SelfContained, Os::Linux, Arch::Arm64) => LINUX_ARM64_PACKAGE,
        (PackageFlavor::SelfContained, Os::Linux, Arch::X64 | Arch::Other) => LINUX_X64_PACKAGE,
        (PackageFlavor::SelfContained, Os::MacOs | Os::Other, _) => GENERIC_PACKAGE,
    };
    debug!(%platform, ?flavor, package_name, "Resolved package name");
    package_name
}
