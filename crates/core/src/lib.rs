//! Core types for the msdo installer.
//!
//! - [`platform`] - Platform detection and package name resolution
//! - [`version`] - Requested version parsing
//! - [`environment`] - Agent settings and resolved paths
//! - [`acquire`] - The package acquisition trait
//! - [`error`] - Shared error type

pub mod acquire;
pub mod environment;
pub mod error;
pub mod platform;
pub mod version;

pub use acquire::{AcquireRequest, InstallNuGetPackageResponse, PackageAcquirer};
pub use environment::{InstallerSettings, ResolvedEnvironment};
pub use error::{Error, Result};
pub use platform::{Arch, Os, PackageFlavor, Platform, resolve_package_name};
pub use version::VersionSpecifier;
