//! Import command
//!
//! Replaces live trees of the installation, so it asks before touching
//! anything unless `--yes` is given.

use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use clap::Args;
use goobi_exchange_dump::{Importer, ProgressHandle, ProgressWatcher};
use std::fs::File;
use std::io::BufReader;

use super::{describe_selection, load_config, report, require_selection, TreeArgs};
use crate::output;

#[derive(Args, Debug)]
pub struct ImportArgs {
    /// Archive created by `goobi-exchange export`
    pub archive: Utf8PathBuf,

    #[command(flatten)]
    pub trees: TreeArgs,

    /// Skip confirmation prompt
    #[arg(short, long)]
    pub yes: bool,

    /// Print the run report as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn run(args: ImportArgs, config_path: Option<&Utf8Path>, quiet: bool) -> Result<()> {
    let selection = require_selection(&args.trees)?;
    let config = load_config(config_path)?;

    if !args.archive.is_file() {
        anyhow::bail!("Archive not found: {}", args.archive);
    }
    let interactive = !quiet && !args.json;

    if interactive {
        output::header("Import Goobi installation");
        output::kv("Archive", args.archive.as_str());
        output::kv("Goobi folder", config.goobi_folder.as_str());
        output::kv("Staging folder", config.staging_folder.as_str());
        output::kv("Trees", &describe_selection(&selection));
        println!();
        output::warning("Selected folders will be replaced by the archive's content!");
        if selection.sql_dump {
            output::warning("The database will be overwritten by the archived dump!");
        }
        println!();
    }

    if !args.yes {
        use dialoguer::Confirm;
        if !Confirm::new()
            .with_prompt("Proceed with import?")
            .default(false)
            .interact()?
        {
            output::info("Import cancelled");
            return Ok(());
        }
    }

    let file = File::open(&args.archive)
        .with_context(|| format!("Failed to open archive {}", args.archive))?;

    let handle = ProgressHandle::new();
    let watcher = interactive.then(|| ProgressWatcher::spawn(handle.clone(), "Importing"));
    let state = Importer::new(&config)
        .with_progress(handle)
        .run(BufReader::new(file), &selection);
    if let Some(watcher) = watcher {
        watcher.finish();
    }

    report(&state, args.json, quiet, "Import")
}
