//! External database export/import commands.
//!
//! A command is an argument vector prepared by the configuration layer. The
//! engine only substitutes the placeholder token and runs the result; it
//! never interprets shell syntax. Templates are trusted operator input and
//! nothing is escaped.

use crate::error::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::process::{Command, Stdio};
use tracing::{debug, info};

/// Placeholder substituted with the staged dump path.
pub const DEFAULT_PLACEHOLDER: &str = "DATABASE_TEMPFILE";

/// Delimiter of the legacy single-string command form.
pub const LEGACY_DELIMITER: &str = ", ";

/// An external command as an argument vector.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct CommandTemplate {
    args: Vec<String>,
}

impl CommandTemplate {
    pub fn new<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Splits the legacy `"/bin/sh, script.sh, DATABASE_TEMPFILE"` form on `", "`.
    pub fn from_legacy(line: &str) -> Self {
        if line.trim().is_empty() {
            return Self::default();
        }
        Self::new(line.split(LEGACY_DELIMITER))
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// A template with no arguments counts as "not configured".
    pub fn is_configured(&self) -> bool {
        self.args.iter().any(|a| !a.trim().is_empty())
    }

    /// Replaces every occurrence of `placeholder` in every argument with `path`.
    pub fn resolve(&self, placeholder: &str, path: &str) -> Vec<String> {
        self.args
            .iter()
            .map(|arg| {
                if placeholder.is_empty() {
                    arg.clone()
                } else {
                    arg.replace(placeholder, path)
                }
            })
            .collect()
    }
}

impl<'de> Deserialize<'de> for CommandTemplate {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Legacy(String),
            Args(Vec<String>),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Legacy(line) => CommandTemplate::from_legacy(&line),
            Raw::Args(args) => CommandTemplate::new(args),
        })
    }
}

/// Runs a resolved argument vector and reports its exit code.
pub trait CommandRunner {
    /// Executes `argv`, blocking until the process exits.
    fn execute(&self, argv: &[String]) -> Result<i32>;

    /// Substitutes `placeholder` with `path` in `template` and executes it.
    fn run(&self, template: &CommandTemplate, placeholder: &str, path: &str) -> Result<i32> {
        let argv = template.resolve(placeholder, path);
        if argv.is_empty() {
            return Err(Error::EmptyCommand);
        }
        self.execute(&argv)
    }
}

/// Spawns the command as a child process inheriting working directory and environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl CommandRunner for ProcessRunner {
    fn execute(&self, argv: &[String]) -> Result<i32> {
        let (program, args) = argv.split_first().ok_or(Error::EmptyCommand)?;
        info!("Running external command: {}", program);
        debug!("Arguments: {:?}", args);

        let status = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .status()
            .map_err(|source| Error::CommandSpawn {
                program: program.clone(),
                source,
            })?;

        // Termination by signal has no exit code
        let code = status.code().unwrap_or(-1);
        debug!("{} exited with {}", program, code);
        Ok(code)
    }
}
