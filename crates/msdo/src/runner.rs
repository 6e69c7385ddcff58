//! Runs the MSDO CLI inside an Azure Pipelines task.
//!
//! [`MsdoClient::run`] installs the CLI, initializes it, runs it with
//! pipeline-friendly arguments, publishes the SARIF results and reports the
//! task result through the agent's logging commands.

use crate::pipeline::{
    BUILD_STAGING_DIRECTORY, GDN_LOGGER_LEVEL, Pipeline, SYSTEM_DEBUG, TaskResult, get_variable,
};
use msdo_core::{Error, ResolvedEnvironment, Result, VersionSpecifier};
use msdo_installer::{InstallOutcome, Installer};
use std::ffi::OsString;
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, error, info};

/// Version installed when `MSDO_VERSION` is not set.
pub const DEFAULT_CLI_VERSION: &str = "Latest";
/// Artifact name used when none is configured.
pub const DEFAULT_ARTIFACT_NAME: &str = "CodeAnalysisLogs";
/// Variable carrying the SARIF path to later steps.
pub const MSDO_SARIF_FILE: &str = "MSDO_SARIF_FILE";

const SEPARATOR: &str =
    "------------------------------------------------------------------------------";

/// Pipeline state the runner reads.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineContext {
    /// `BUILD_STAGINGDIRECTORY`
    pub staging_directory: Option<PathBuf>,
    /// `system.debug` is `true`
    pub system_debug: bool,
    /// `GDN_LOGGERLEVEL`
    pub logger_level: Option<String>,
}

impl PipelineContext {
    /// Read the context from pipeline variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            staging_directory: get_variable(BUILD_STAGING_DIRECTORY).map(PathBuf::from),
            system_debug: get_variable(SYSTEM_DEBUG).as_deref() == Some("true"),
            logger_level: get_variable(GDN_LOGGER_LEVEL),
        }
    }

    /// Where the CLI writes its breaking results.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when no staging directory is set.
    pub fn sarif_file(&self) -> Result<PathBuf> {
        self.staging_directory
            .as_ref()
            .map(|dir| dir.join(".gdn").join("msdo.sarif"))
            .ok_or_else(|| {
                Error::configuration(format!("{BUILD_STAGING_DIRECTORY} is not set"))
            })
    }
}

/// Options for a single CLI run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    /// Arguments passed after `run`.
    pub args: Vec<String>,
    /// Exit codes treated as success.
    pub successful_exit_codes: Vec<i32>,
    /// Upload the SARIF file as a build artifact.
    pub publish: bool,
    /// Artifact name; blank falls back to [`DEFAULT_ARTIFACT_NAME`].
    pub artifact_name: Option<String>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            args: Vec::new(),
            successful_exit_codes: vec![0],
            publish: true,
            artifact_name: None,
        }
    }
}

impl RunOptions {
    /// Artifact name with blank values replaced by the default.
    #[must_use]
    pub fn artifact_name(&self) -> &str {
        self.artifact_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(DEFAULT_ARTIFACT_NAME)
    }
}

/// Arguments for `guardian run`.
#[must_use]
pub fn build_run_args(args: &[String], sarif_file: &Path, context: &PipelineContext) -> Vec<OsString> {
    let mut out: Vec<OsString> = vec!["run".into()];
    out.extend(args.iter().map(OsString::from));
    out.push("--logger-pipeline".into());

    if context.system_debug {
        out.push("--logger-level".into());
        out.push("trace".into());
        out.push("--logger-show-level".into());
    } else if let Some(level) = &context.logger_level {
        out.push("--logger-level".into());
        out.push(level.into());
    }

    out.push("--export-breaking-results-to-file".into());
    out.push(sarif_file.into());
    out.push("--telemetry-environment".into());
    out.push("azdevops".into());
    out
}

/// Installs and runs the MSDO CLI.
pub struct MsdoClient<W> {
    installer: Installer,
    pipeline: Pipeline<W>,
    context: PipelineContext,
    env: ResolvedEnvironment,
}

impl<W: Write> MsdoClient<W> {
    /// Create a client.
    #[must_use]
    pub fn new(installer: Installer, pipeline: Pipeline<W>, context: PipelineContext) -> Self {
        Self {
            installer,
            pipeline,
            context,
            env: ResolvedEnvironment::new(),
        }
    }

    /// Paths resolved so far.
    #[must_use]
    pub fn environment(&self) -> &ResolvedEnvironment {
        &self.env
    }

    /// Logging command sink.
    #[must_use]
    pub fn pipeline(&self) -> &Pipeline<W> {
        &self.pipeline
    }

    /// Requested CLI version, `MSDO_VERSION` or [`DEFAULT_CLI_VERSION`].
    #[must_use]
    pub fn resolve_cli_version(&self) -> VersionSpecifier {
        let version = self.installer.settings().version.as_deref();
        VersionSpecifier::parse(version.unwrap_or(DEFAULT_CLI_VERSION))
    }

    /// Install the CLI, or pick up an override, and resolve its paths.
    ///
    /// # Errors
    ///
    /// Returns the installer's error. The CLI must not be run afterwards.
    pub async fn setup_environment(&mut self) -> Result<InstallOutcome> {
        info!("{SEPARATOR}");
        let version = self.resolve_cli_version();
        let outcome = self.installer.install(&version, &mut self.env).await?;
        if let Some(folders) = self.env.gdn_settings_folders() {
            debug!(%folders, "Guardian settings folders");
        }
        info!("{SEPARATOR}");
        Ok(outcome)
    }

    fn executable(&self) -> Result<&Path> {
        self.env
            .executable()
            .ok_or_else(|| Error::tool_execution("the MSDO CLI path has not been resolved"))
    }

    /// Run `guardian init --force`. Failures are ignored.
    pub async fn init(&self) {
        let Ok(executable) = self.executable() else {
            debug!("Skipping init: MSDO CLI path not resolved");
            return;
        };

        let status = Command::new(executable)
            .arg("init")
            .arg("--force")
            .envs(self.env.exports())
            .status()
            .await;

        match status {
            Ok(status) if status.success() => {}
            Ok(status) => debug!(?status, "guardian init exited unsuccessfully"),
            Err(e) => debug!(error = %e, "guardian init failed to start"),
        }
    }

    /// Run the CLI and report the task result.
    ///
    /// Setup failures fail the task before the CLI is started. A run that
    /// exits with a code outside `successful_exit_codes` fails the task
    /// after results are published.
    ///
    /// # Errors
    ///
    /// Returns the error that failed the task.
    pub async fn run(&mut self, options: &RunOptions) -> Result<i32> {
        let prepared = self.prepare(options).await;
        let (executable, args, sarif_file) = match prepared {
            Ok(prepared) => prepared,
            Err(e) => {
                error!("Exception occurred while initializing MSDO:");
                return Err(self.fail(e));
            }
        };

        match self.execute(&executable, &args, &sarif_file, options).await {
            Ok(code) => Ok(code),
            Err(e) => Err(self.fail(e)),
        }
    }

    async fn prepare(&mut self, options: &RunOptions) -> Result<(PathBuf, Vec<OsString>, PathBuf)> {
        let sarif_file = self.context.sarif_file()?;
        debug!(?sarif_file, "Resolved SARIF output path");

        self.setup_environment().await?;
        self.init().await;

        let executable = self.executable()?.to_path_buf();
        debug!(?executable, "Resolved MSDO CLI path");
        debug!(logger_level = ?self.context.logger_level, system_debug = self.context.system_debug, "Pipeline logging settings");

        let args = build_run_args(&options.args, &sarif_file, &self.context);

        self.pipeline
            .set_variable(MSDO_SARIF_FILE, &sarif_file.display().to_string())?;

        Ok((executable, args, sarif_file))
    }

    async fn execute(
        &mut self,
        executable: &Path,
        args: &[OsString],
        sarif_file: &Path,
        options: &RunOptions,
    ) -> Result<i32> {
        debug!("Running Microsoft Security DevOps...");

        let status = Command::new(executable)
            .args(args)
            .envs(self.env.exports())
            .env(MSDO_SARIF_FILE, sarif_file)
            .status()
            .await
            .map_err(|e| Error::tool_execution(format!("{}: {e}", executable.display())))?;

        if options.publish && sarif_file.exists() {
            self.pipeline
                .upload_artifact(options.artifact_name(), sarif_file)?;
        }

        let code = status
            .code()
            .ok_or_else(|| Error::tool_execution("the MSDO CLI was terminated by a signal"))?;

        if options.successful_exit_codes.contains(&code) {
            Ok(code)
        } else {
            Err(Error::ToolExitCode { code })
        }
    }

    fn fail(&mut self, error: Error) -> Error {
        error!("{error}");
        if let Err(e) = self.pipeline.complete(TaskResult::Failed, &error.to_string()) {
            error!(error = %e, "Failed to report task result");
        }
        error
    }
}
