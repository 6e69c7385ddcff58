//! Azure Pipelines task runner for the Microsoft Security DevOps CLI.
//!
//! - [`cli`] - Command line definition
//! - [`commands`] - Subcommand execution
//! - [`pipeline`] - Agent logging commands and pipeline variables
//! - [`runner`] - Install, initialize and run the CLI
//! - [`tracing`] - Log output configuration

/// Command line definition
pub mod cli;
pub mod commands;
pub mod pipeline;
pub mod runner;
pub mod tracing;

pub use runner::{MsdoClient, PipelineContext, RunOptions};
