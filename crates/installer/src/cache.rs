//! Installed-package detection.
//!
//! An installation is proven only by the executable existing at
//! `{versions}/{package}.{version}/tools/guardian`. There is no manifest.
//!
//! Layout:
//! ```text
//! {agent}/_msdo/versions/
//! └── Microsoft.Security.Devops.Cli.linux-x64.0.150.0/
//!     └── tools/
//!         └── guardian
//! ```

use msdo_core::environment::{TOOL_NAME, executable_exists};
use msdo_core::{Error, ResolvedEnvironment, Result, VersionSpecifier};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Directory a package version is extracted to.
#[must_use]
pub fn package_directory(versions_root: &Path, package_name: &str, version: &str) -> PathBuf {
    versions_root.join(format!("{package_name}.{version}"))
}

/// Check whether a requested version is already installed.
///
/// Quantified requests (`latest`, `latest-prerelease`) are never considered
/// installed; they always go back to the registry. For exact versions this
/// points `env` at the candidate paths even when nothing is installed there.
pub fn is_installed(
    env: &mut ResolvedEnvironment,
    versions_root: &Path,
    package_name: &str,
    version: &VersionSpecifier,
) -> bool {
    let Some(exact) = version.exact() else {
        debug!(%version, "MSDO CLI version contains a latest quantifier. Continuing with install...");
        return false;
    };

    let installed = publish_paths(env, versions_root, package_name, exact);
    if installed {
        info!("MSDO CLI v{exact} already installed.");
    }
    installed
}

/// Point `env` at a package version and report whether its executable exists.
///
/// `tool_dir` and `executable` are overwritten unconditionally. With
/// `validate` set, a missing executable is an
/// [`Error::InstallationNotFound`].
///
/// # Errors
///
/// Returns [`Error::InstallationNotFound`] when `validate` is true and the
/// executable does not exist.
pub fn set_variables(
    env: &mut ResolvedEnvironment,
    versions_root: &Path,
    package_name: &str,
    version: &str,
    validate: bool,
) -> Result<bool> {
    let exists = publish_paths(env, versions_root, package_name, version);

    if validate && !exists {
        let expected = env
            .executable
            .clone()
            .unwrap_or_else(|| tool_paths(versions_root, package_name, version).1);
        return Err(Error::installation_not_found(version, expected));
    }

    Ok(exists)
}

fn tool_paths(versions_root: &Path, package_name: &str, version: &str) -> (PathBuf, PathBuf) {
    let tool_dir = package_directory(versions_root, package_name, version).join("tools");
    let executable = tool_dir.join(TOOL_NAME);
    (tool_dir, executable)
}

fn publish_paths(
    env: &mut ResolvedEnvironment,
    versions_root: &Path,
    package_name: &str,
    version: &str,
) -> bool {
    let (tool_dir, executable) = tool_paths(versions_root, package_name, version);
    debug!(?tool_dir, ?executable, "Resolved MSDO CLI paths");

    let exists = executable_exists(&executable);
    env.tool_dir = Some(tool_dir);
    env.executable = Some(executable);
    exists
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn install_fake(versions_root: &Path, package_name: &str, version: &str) -> PathBuf {
        let (tool_dir, executable) = tool_paths(versions_root, package_name, version);
        std::fs::create_dir_all(&tool_dir).unwrap();
        std::fs::write(&executable, b"").unwrap();
        executable
    }

    #[test]
    fn test_missing_version_still_sets_paths() {
        let mut env = ResolvedEnvironment::new();

        let installed = is_installed(
            &mut env,
            Path::new("/versions"),
            "Pkg.win-x64",
            &VersionSpecifier::parse("1.2.3"),
        );

        assert!(!installed);
        assert_eq!(
            env.executable,
            Some(PathBuf::from("/versions/Pkg.win-x64.1.2.3/tools/guardian"))
        );
        assert_eq!(
            env.tool_dir,
            Some(PathBuf::from("/versions/Pkg.win-x64.1.2.3/tools"))
        );
    }

    #[test]
    fn test_installed_version_is_found() {
        let temp = TempDir::new().unwrap();
        let executable = install_fake(temp.path(), "Pkg", "1.0.0");
        let mut env = ResolvedEnvironment::new();

        assert!(is_installed(
            &mut env,
            temp.path(),
            "Pkg",
            &VersionSpecifier::parse("1.0.0")
        ));
        assert_eq!(env.executable, Some(executable));
    }

    #[test]
    fn test_quantifiers_are_never_installed() {
        let temp = TempDir::new().unwrap();
        install_fake(temp.path(), "Pkg", "latest");
        install_fake(temp.path(), "Pkg", "latest-prerelease");

        for spec in [VersionSpecifier::Latest, VersionSpecifier::LatestPrerelease] {
            let mut env = ResolvedEnvironment::new();
            assert!(!is_installed(&mut env, temp.path(), "Pkg", &spec));
            assert!(env.executable.is_none());
        }
    }

    #[test]
    fn test_is_installed_is_deterministic() {
        let temp = TempDir::new().unwrap();
        install_fake(temp.path(), "Pkg", "1.0.0");

        for version in ["1.0.0", "2.0.0"] {
            let spec = VersionSpecifier::parse(version);
            let mut env = ResolvedEnvironment::new();
            let first = is_installed(&mut env, temp.path(), "Pkg", &spec);
            let second = is_installed(&mut env, temp.path(), "Pkg", &spec);
            assert_eq!(first, second);
        }
    }

    #[test]
    fn test_exact_version_is_case_sensitive_in_paths() {
        let mut env = ResolvedEnvironment::new();
        is_installed(
            &mut env,
            Path::new("/v"),
            "Pkg",
            &VersionSpecifier::parse("1.0.0-Beta"),
        );
        assert_eq!(
            env.executable,
            Some(PathBuf::from("/v/Pkg.1.0.0-Beta/tools/guardian"))
        );
    }

    #[test]
    fn test_set_variables_validate_missing() {
        let temp = TempDir::new().unwrap();
        let mut env = ResolvedEnvironment::new();

        let result = set_variables(&mut env, temp.path(), "Pkg", "2.0.0", true);

        let expected = temp.path().join("Pkg.2.0.0").join("tools").join("guardian");
        match result {
            Err(Error::InstallationNotFound { version, path }) => {
                assert_eq!(version, "2.0.0");
                assert_eq!(path, expected);
            }
            other => panic!("expected InstallationNotFound, got {other:?}"),
        }
        assert_eq!(env.executable, Some(expected));
    }

    #[test]
    fn test_set_variables_validate_present() {
        let temp = TempDir::new().unwrap();
        install_fake(temp.path(), "Pkg", "2.0.0");
        let mut env = ResolvedEnvironment::new();

        assert!(set_variables(&mut env, temp.path(), "Pkg", "2.0.0", true).unwrap());
    }

    #[test]
    fn test_set_variables_without_validate_never_fails() {
        let temp = TempDir::new().unwrap();
        let mut env = ResolvedEnvironment::new();

        assert!(!set_variables(&mut env, temp.path(), "Pkg", "2.0.0", false).unwrap());
    }

    #[test]
    fn test_directory_without_executable_is_not_installed() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join("Pkg.1.0.0").join("tools")).unwrap();
        let mut env = ResolvedEnvironment::new();

        assert!(!is_installed(
            &mut env,
            temp.path(),
            "Pkg",
            &VersionSpecifier::parse("1.0.0")
        ));
    }
}
