//! Subcommand execution.

use crate::cli::{Cli, Commands, EXIT_FAILED, EXIT_OK};
use crate::pipeline::Pipeline;
use crate::runner::{MsdoClient, PipelineContext, RunOptions};
use msdo_core::{Error, InstallerSettings, ResolvedEnvironment, Result};
use msdo_installer::Installer;
use msdo_nuget::NuGetClient;
use serde::Serialize;
use std::io::{self, Write};
use std::sync::Arc;
use tracing::debug;

/// JSON envelope for successful command output.
#[derive(Debug, Serialize)]
pub struct OkEnvelope<T> {
    /// Always "ok"
    pub status: &'static str,
    /// Payload
    pub data: T,
}

impl<T> OkEnvelope<T> {
    /// Wrap a payload.
    #[must_use]
    pub const fn new(data: T) -> Self {
        Self { status: "ok", data }
    }
}

/// Installer settings from the environment with CLI overrides applied.
#[must_use]
pub fn settings_for(cli: &Cli) -> InstallerSettings {
    let mut settings = InstallerSettings::from_env();
    if let Some(url) = &cli.index_url {
        settings = settings.with_index_url(url.clone());
    }
    if let Commands::Install {
        cli_version: Some(version),
        ..
    } = &cli.command
    {
        settings.version = Some(version.clone());
    }
    settings
}

/// Build an installer backed by the NuGet feed.
///
/// # Errors
///
/// Returns an error if the HTTP client cannot be created.
pub fn nuget_installer(settings: InstallerSettings) -> Result<Installer> {
    let acquirer = NuGetClient::new()?;
    Ok(Installer::new(settings, Arc::new(acquirer)))
}

/// Render the result of `msdo install`.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn render_install(env: &ResolvedEnvironment, json: bool) -> Result<String> {
    if json {
        return serde_json::to_string_pretty(&OkEnvelope::new(env))
            .map_err(|e| Error::configuration(format!("Failed to serialize output: {e}")));
    }

    let mut lines = Vec::new();
    if let Some(path) = &env.executable {
        lines.push(format!("executable: {}", path.display()));
    }
    if let Some(path) = &env.tool_dir {
        lines.push(format!("tool directory: {}", path.display()));
    }
    if let Some(path) = &env.packages_dir {
        lines.push(format!("packages directory: {}", path.display()));
    }
    Ok(lines.join("\n"))
}

/// Execute a parsed command line and return the process exit code.
///
/// # Errors
///
/// Returns the error that failed the command.
pub async fn execute(cli: Cli) -> Result<i32> {
    let settings = settings_for(&cli);
    let installer = nuget_installer(settings)?;
    let mut client = MsdoClient::new(installer, Pipeline::stdout(), PipelineContext::from_env());

    match cli.command {
        Commands::Install { json, .. } => {
            let outcome = client.setup_environment().await?;
            debug!(?outcome, "Install finished");
            let rendered = render_install(client.environment(), json)?;
            writeln!(io::stdout(), "{rendered}")
                .map_err(|e| Error::io_no_path(e, "write output"))?;
            Ok(EXIT_OK)
        }
        Commands::Run {
            successful_exit_codes,
            no_publish,
            artifact_name,
            args,
        } => {
            let mut options = RunOptions {
                args,
                publish: !no_publish,
                artifact_name,
                ..RunOptions::default()
            };
            if !successful_exit_codes.is_empty() {
                options.successful_exit_codes = successful_exit_codes;
            }

            match client.run(&options).await {
                Ok(_) => Ok(EXIT_OK),
                // The task result has already been reported to the agent
                Err(_) => Ok(EXIT_FAILED),
            }
        }
    }
}
