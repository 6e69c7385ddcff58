//! Installation of the Microsoft Security DevOps CLI.
//!
//! The [`Installer`] decides where the CLI comes from: an explicit
//! executable, an explicit directory, an existing cached version, or a
//! fresh acquisition through a [`PackageAcquirer`](msdo_core::PackageAcquirer).
//! The result is written into a [`ResolvedEnvironment`](msdo_core::ResolvedEnvironment).

pub mod cache;
mod installer;
pub mod retry;

pub use cache::{is_installed, package_directory, set_variables};
pub use installer::{InstallOutcome, Installer, MSDO_ROOT, PACKAGES_DIR, VERSIONS_DIR};
pub use retry::{RetryConfig, RetryExhausted, with_retry};
