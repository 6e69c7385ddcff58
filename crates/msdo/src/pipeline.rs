//! Azure Pipelines agent integration.
//!
//! The agent reads logging commands of the form
//! `##vso[area.action key=value;...]message` from the task's stdout.
//! Pipeline variables are exposed to the task as environment variables.

use msdo_core::{Error, Result};
use std::fmt;
use std::io::{self, Write};
use std::path::Path;

/// Pipeline variable that enables verbose diagnostics.
pub const SYSTEM_DEBUG: &str = "system.debug";
/// Pipeline variable forwarding a log level to the CLI.
pub const GDN_LOGGER_LEVEL: &str = "GDN_LOGGERLEVEL";
/// Staging directory of the current build.
pub const BUILD_STAGING_DIRECTORY: &str = "BUILD_STAGINGDIRECTORY";

/// Final result reported for the task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskResult {
    /// The task failed.
    Failed,
}

impl fmt::Display for TaskResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failed => write!(f, "Failed"),
        }
    }
}

/// Name of the environment variable backing a pipeline variable.
///
/// `system.debug` is exposed as `SYSTEM_DEBUG`.
#[must_use]
pub fn variable_env_name(name: &str) -> String {
    name.replace('.', "_").to_uppercase()
}

/// Read a pipeline variable. Empty values are treated as unset.
#[must_use]
pub fn get_variable(name: &str) -> Option<String> {
    std::env::var(variable_env_name(name))
        .ok()
        .filter(|v| !v.is_empty())
}

/// Escape a logging command message.
#[must_use]
pub fn escape_data(value: &str) -> String {
    value
        .replace('%', "%AZP25")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

/// Escape a logging command property value.
#[must_use]
pub fn escape_property(value: &str) -> String {
    escape_data(value).replace(']', "%5D").replace(';', "%3B")
}

/// A single `##vso[...]` logging command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingCommand {
    command: &'static str,
    properties: Vec<(&'static str, String)>,
    message: String,
}

impl LoggingCommand {
    /// Create a command with no properties.
    #[must_use]
    pub fn new(command: &'static str, message: impl Into<String>) -> Self {
        Self {
            command,
            properties: Vec::new(),
            message: message.into(),
        }
    }

    /// Add a property.
    #[must_use]
    pub fn property(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.properties.push((key, value.into()));
        self
    }

    /// `task.setvariable`
    #[must_use]
    pub fn set_variable(name: &str, value: &str) -> Self {
        Self::new("task.setvariable", value)
            .property("variable", name)
            .property("issecret", "false")
    }

    /// `artifact.upload`
    #[must_use]
    pub fn upload_artifact(artifact_name: &str, path: &Path) -> Self {
        Self::new("artifact.upload", path.display().to_string())
            .property("artifactname", artifact_name)
    }

    /// `task.complete`
    #[must_use]
    pub fn complete(result: TaskResult, message: &str) -> Self {
        Self::new("task.complete", message).property("result", result.to_string())
    }
}

impl fmt::Display for LoggingCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "##vso[{}", self.command)?;
        if !self.properties.is_empty() {
            f.write_str(" ")?;
            for (key, value) in &self.properties {
                write!(f, "{key}={};", escape_property(value))?;
            }
        }
        write!(f, "]{}", escape_data(&self.message))
    }
}

/// Writes logging commands for the agent.
#[derive(Debug)]
pub struct Pipeline<W> {
    out: W,
}

impl Pipeline<io::Stdout> {
    /// Write to the process stdout, which the agent parses.
    #[must_use]
    pub fn stdout() -> Self {
        Self { out: io::stdout() }
    }
}

impl<W: Write> Pipeline<W> {
    /// Write to an arbitrary sink.
    pub fn new(out: W) -> Self {
        Self { out }
    }

    /// Underlying sink.
    pub fn get_ref(&self) -> &W {
        &self.out
    }

    /// Emit a logging command.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the sink cannot be written.
    pub fn emit(&mut self, command: &LoggingCommand) -> Result<()> {
        writeln!(self.out, "{command}")
            .and_then(|()| self.out.flush())
            .map_err(|e| Error::io_no_path(e, "write logging command"))
    }

    /// Set a pipeline variable for downstream tasks.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the sink cannot be written.
    pub fn set_variable(&mut self, name: &str, value: &str) -> Result<()> {
        self.emit(&LoggingCommand::set_variable(name, value))
    }

    /// Upload a file as a build artifact.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the sink cannot be written.
    pub fn upload_artifact(&mut self, artifact_name: &str, path: &Path) -> Result<()> {
        self.emit(&LoggingCommand::upload_artifact(artifact_name, path))
    }

    /// Report the task result.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the sink cannot be written.
    pub fn complete(&mut self, result: TaskResult, message: &str) -> Result<()> {
        self.emit(&LoggingCommand::complete(result, message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output(pipeline: &Pipeline<Vec<u8>>) -> String {
        String::from_utf8(pipeline.get_ref().clone()).unwrap()
    }

    #[test]
    fn test_variable_env_name() {
        assert_eq!(variable_env_name("system.debug"), "SYSTEM_DEBUG");
        assert_eq!(variable_env_name("GDN_LOGGERLEVEL"), "GDN_LOGGERLEVEL");
    }

    #[test]
    fn test_get_variable() {
        temp_env::with_var("SYSTEM_DEBUG", Some("true"), || {
            assert_eq!(get_variable(SYSTEM_DEBUG).as_deref(), Some("true"));
        });
        temp_env::with_var("GDN_LOGGERLEVEL", Some(""), || {
            assert!(get_variable(GDN_LOGGER_LEVEL).is_none());
        });
        temp_env::with_var_unset("GDN_LOGGERLEVEL", || {
            assert!(get_variable(GDN_LOGGER_LEVEL).is_none());
        });
    }

    #[test]
    fn test_escaping() {
        assert_eq!(escape_data("50%\r\ndone"), "50%AZP25%0D%0Adone");
        assert_eq!(escape_property("a;b]c"), "a%3Bb%5Dc");
        assert_eq!(escape_data("a;b]c"), "a;b]c");
    }

    #[test]
    fn test_set_variable_command() {
        let mut pipeline = Pipeline::new(Vec::new());
        pipeline
            .set_variable("MSDO_SARIF_FILE", "/staging/.gdn/msdo.sarif")
            .unwrap();
        assert_eq!(
            output(&pipeline),
            "##vso[task.setvariable variable=MSDO_SARIF_FILE;issecret=false;]/staging/.gdn/msdo.sarif\n"
        );
    }

    #[test]
    fn test_upload_artifact_command() {
        let mut pipeline = Pipeline::new(Vec::new());
        pipeline
            .upload_artifact("CodeAnalysisLogs", Path::new("/staging/.gdn/msdo.sarif"))
            .unwrap();
        assert_eq!(
            output(&pipeline),
            "##vso[artifact.upload artifactname=CodeAnalysisLogs;]/staging/.gdn/msdo.sarif\n"
        );
    }

    #[test]
    fn test_complete_command_escapes_message() {
        let mut pipeline = Pipeline::new(Vec::new());
        pipeline
            .complete(TaskResult::Failed, "line one\nline two")
            .unwrap();
        assert_eq!(
            output(&pipeline),
            "##vso[task.complete result=Failed;]line one%0Aline two\n"
        );
    }

    #[test]
    fn test_command_without_properties() {
        let command = LoggingCommand::new("task.logissue", "hello");
        assert_eq!(command.to_string(), "##vso[task.logissue]hello");
    }
}
