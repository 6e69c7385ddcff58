use crate::tracing::{LogLevel, TracingFormat};
use clap::{Parser, Subcommand};

/// Successful exit code
pub const EXIT_OK: i32 = 0;
/// Task failure exit code
pub const EXIT_FAILED: i32 = 1;

/// Command line for the msdo task runner
#[derive(Parser, Debug)]
#[command(name = "msdo")]
#[command(about = "Install and run the Microsoft Security DevOps CLI in Azure Pipelines")]
#[command(long_about = None)]
#[command(version)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,

    /// Logging level
    #[arg(
        short = 'l',
        long,
        global = true,
        help = "Set logging level",
        default_value = "info",
        value_enum
    )]
    pub level: LogLevel,

    /// Log output format
    #[arg(
        long,
        global = true,
        help = "Log output format",
        default_value = "compact",
        value_enum
    )]
    pub format: TracingFormat,

    /// NuGet v3 service index
    #[arg(
        long,
        global = true,
        env = "MSDO_NUGET_INDEX_URL",
        help = "NuGet v3 service index to install from"
    )]
    pub index_url: Option<String>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Install the CLI and print where it lives
    #[command(about = "Install the MSDO CLI and print the resolved paths")]
    Install {
        /// Version to install
        #[arg(
            long = "cli-version",
            value_name = "VERSION",
            help = "Version to install: an exact version, latest or latest-prerelease [default: MSDO_VERSION or Latest]"
        )]
        cli_version: Option<String>,

        /// Print JSON
        #[arg(long, help = "Print the resolved paths as JSON")]
        json: bool,
    },

    /// Install and run the CLI
    #[command(about = "Install the MSDO CLI, run it and publish its results")]
    Run {
        /// Exit codes treated as success
        #[arg(
            long = "successful-exit-code",
            value_name = "CODE",
            allow_negative_numbers = true,
            help = "Exit code treated as success (repeatable) [default: 0]"
        )]
        successful_exit_codes: Vec<i32>,

        /// Skip artifact upload
        #[arg(long, help = "Do not upload the SARIF file as a build artifact")]
        no_publish: bool,

        /// Artifact name
        #[arg(long, help = "Artifact name for the SARIF file [default: CodeAnalysisLogs]")]
        artifact_name: Option<String>,

        /// Arguments passed to `guardian run`
        #[arg(last = true, value_name = "ARGS")]
        args: Vec<String>,
    },
}

/// Parse the process arguments
#[must_use]
pub fn parse() -> Cli {
    Cli::parse()
}
