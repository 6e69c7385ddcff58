//! Error types shared by the msdo crates

// Rust 1.92 compiler bug: false positives for thiserror/miette derive macro fields
// https://github.com/rust-lang/rust/issues/147648
#![allow(unused_assignments)]

use miette::Diagnostic;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Error type for installer and runner operations
#[derive(Error, Debug, Diagnostic)]
pub enum Error {
    /// The package registry could not resolve or deliver a package.
    #[error("Package registry error: {message}")]
    #[diagnostic(
        code(msdo::registry),
        help("Check network access to the NuGet service index")
    )]
    Registry {
        /// Description of the failure
        message: String,
    },

    /// Every acquisition attempt failed, or the registry reported an unsuccessful install.
    #[error("Failed to install the MSDO CLI nuget package {package}: {reason}")]
    #[diagnostic(
        code(msdo::install_failed),
        help("Run with --level debug to see each acquisition attempt")
    )]
    InstallationFailed {
        /// Package identifier that was being installed
        package: String,
        /// Why the installation was abandoned
        reason: String,
    },

    /// The package was reported installed but the executable is missing.
    #[error("MSDO CLI v{version} was not found after installation. Expected location: {}", path.display())]
    #[diagnostic(
        code(msdo::install_not_found),
        help("The cached package may be incomplete; delete the package directory and retry")
    )]
    InstallationNotFound {
        /// Version that was installed
        version: String,
        /// Expected executable location
        path: PathBuf,
    },

    /// Missing or invalid configuration.
    #[error("Configuration error: {message}")]
    #[diagnostic(code(msdo::config))]
    Configuration {
        /// Description of the problem
        message: String,
    },

    /// I/O error with optional path context
    #[error("I/O {operation} failed{}", path.as_ref().map_or(String::new(), |p| format!(": {}", p.display())))]
    #[diagnostic(
        code(msdo::io),
        help("Check file permissions and ensure the path exists")
    )]
    Io {
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
        /// Path that caused the error, if available
        path: Option<Box<Path>>,
        /// Operation that failed (e.g., "create", "read")
        operation: String,
    },

    /// The scanning tool could not be started.
    #[error("Failed to execute MSDO CLI: {message}")]
    #[diagnostic(code(msdo::tool_execution))]
    ToolExecution {
        /// Description of the failure
        message: String,
    },

    /// The scanning tool exited with an unexpected code.
    #[error("MSDO CLI exited with an error exit code: {code}")]
    #[diagnostic(code(msdo::tool_exit_code))]
    ToolExitCode {
        /// Process exit code
        code: i32,
    },
}

impl Error {
    /// Create a registry error
    #[must_use]
    pub fn registry(message: impl Into<String>) -> Self {
        Self::Registry {
            message: message.into(),
        }
    }

    /// Create an installation failed error
    #[must_use]
    pub fn installation_failed(package: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InstallationFailed {
            package: package.into(),
            reason: reason.into(),
        }
    }

    /// Create an installation not found error
    #[must_use]
    pub fn installation_not_found(version: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self::InstallationNotFound {
            version: version.into(),
            path: path.into(),
        }
    }

    /// Create a configuration error
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create an I/O error with path context
    #[must_use]
    pub fn io(
        source: std::io::Error,
        path: impl AsRef<Path>,
        operation: impl Into<String>,
    ) -> Self {
        Self::Io {
            source,
            path: Some(path.as_ref().into()),
            operation: operation.into(),
        }
    }

    /// Create an I/O error without path context
    #[must_use]
    pub fn io_no_path(source: std::io::Error, operation: impl Into<String>) -> Self {
        Self::Io {
            source,
            path: None,
            operation: operation.into(),
        }
    }

    /// Create a tool execution error
    #[must_use]
    pub fn tool_execution(message: impl Into<String>) -> Self {
        Self::ToolExecution {
            message: message.into(),
        }
    }
}

/// Result type for msdo operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_installation_not_found_names_path() {
        let err = Error::installation_not_found(
            "2.0.0",
            "/versions/Pkg.2.0.0/tools/guardian",
        );
        let msg = err.to_string();
        assert!(msg.contains("v2.0.0"));
        assert!(msg.contains("/versions/Pkg.2.0.0/tools/guardian"));
    }

    #[test]
    fn test_installation_failed_display() {
        let err = Error::installation_failed(
            "Microsoft.Security.Devops.Cli.linux-x64",
            "3 attempt(s) failed",
        );
        assert_eq!(
            err.to_string(),
            "Failed to install the MSDO CLI nuget package Microsoft.Security.Devops.Cli.linux-x64: 3 attempt(s) failed"
        );
    }

    #[test]
    fn test_io_error_display() {
        let err = Error::io(
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
            "/agent/_msdo",
            "create",
        );
        assert_eq!(err.to_string(), "I/O create failed: /agent/_msdo");

        let err = Error::io_no_path(std::io::Error::other("boom"), "read");
        assert_eq!(err.to_string(), "I/O read failed");
    }

    #[test]
    fn test_diagnostic_codes() {
        let err = Error::registry("timeout");
        assert_eq!(err.code().map(|c| c.to_string()), Some("msdo::registry".to_string()));
        assert!(err.help().is_some());
    }
}
