//! CLI command implementations

pub mod excludes;
pub mod export;
pub mod import;

use anyhow::{Context, Result};
use camino::Utf8Path;
use clap::Args;
use goobi_exchange_dump::{DumpConfig, LogicalTree, MessageLog, RunState, TreeSelection};
use serde::Serialize;

use crate::output;

/// Logical tree selection shared by export and import.
#[derive(Args, Debug, Clone, Default)]
pub struct TreeArgs {
    /// Select every tree
    #[arg(long)]
    pub all: bool,

    /// Rulesets folder
    #[arg(long)]
    pub rulesets: bool,

    /// Scripts folder
    #[arg(long)]
    pub scripts: bool,

    /// Configuration folder
    #[arg(long)]
    pub configuration: bool,

    /// Metadata folder
    #[arg(long)]
    pub metadata: bool,

    /// Docket stylesheets (xslt folder)
    #[arg(long)]
    pub dockets: bool,

    /// Plugins folder
    #[arg(long)]
    pub plugins: bool,

    /// SQL database dump
    #[arg(long)]
    pub sql_dump: bool,
}

impl TreeArgs {
    pub fn selection(&self) -> TreeSelection {
        if self.all {
            return TreeSelection::all();
        }
        TreeSelection {
            rulesets: self.rulesets,
            scripts: self.scripts,
            configuration: self.configuration,
            metadata: self.metadata,
            dockets: self.dockets,
            plugins: self.plugins,
            sql_dump: self.sql_dump,
        }
    }
}

/// Non-empty selection or an error naming the flags.
pub(crate) fn require_selection(trees: &TreeArgs) -> Result<TreeSelection> {
    let selection = trees.selection();
    if selection.is_empty() {
        anyhow::bail!(
            "Nothing selected. Pass --all or at least one of --rulesets, --scripts, \
             --configuration, --metadata, --dockets, --plugins, --sql-dump"
        );
    }
    Ok(selection)
}

pub(crate) fn load_config(path: Option<&Utf8Path>) -> Result<DumpConfig> {
    let config = DumpConfig::load(path).context("Failed to load goobi-exchange configuration")?;
    if let Some(origin) = config.config_path() {
        tracing::debug!("Loaded configuration from {}", origin);
    }
    Ok(config)
}

pub(crate) fn describe_selection(selection: &TreeSelection) -> String {
    selection
        .selected()
        .iter()
        .map(LogicalTree::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RunReport<'a> {
    finished: bool,
    progress: u64,
    files_total: u64,
    files_processed: u64,
    messages: &'a MessageLog,
}

/// Prints the run's messages and fails unless the run succeeded.
pub(crate) fn report(state: &RunState, json: bool, quiet: bool, operation: &str) -> Result<()> {
    if json {
        let report = RunReport {
            finished: state.is_finished(),
            progress: state.progress(),
            files_total: state.files_total(),
            files_processed: state.files_processed(),
            messages: state.messages(),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if !quiet {
        for message in state.messages() {
            output::message(message);
        }
        println!();
        output::kv(
            "Files",
            &format!("{}/{}", state.files_processed(), state.files_total()),
        );
    }

    if !state.succeeded() {
        anyhow::bail!("{} did not complete successfully", operation);
    }
    if !json && !quiet {
        output::success(&format!("{} finished", operation));
    }
    Ok(())
}
