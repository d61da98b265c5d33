//! Export command

use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use clap::Args;
use goobi_exchange_dump::{DumpConfig, Exporter, ProgressHandle, ProgressWatcher, Restriction};
use std::fs::File;
use std::io::BufWriter;

use super::{describe_selection, load_config, report, require_selection, TreeArgs};
use crate::output;

#[derive(Args, Debug)]
pub struct ExportArgs {
    #[command(flatten)]
    pub trees: TreeArgs,

    /// Only export these metadata record ids (comma separated)
    #[arg(long, value_name = "IDS")]
    pub restrict_ids: Option<String>,

    /// Enable the exclude rule with this label for this run
    #[arg(long, value_name = "LABEL")]
    pub enable_exclude: Vec<String>,

    /// Disable the exclude rule with this label for this run
    #[arg(long, value_name = "LABEL")]
    pub disable_exclude: Vec<String>,

    /// Output location (directory or file path)
    #[arg(short, long)]
    pub output: Option<Utf8PathBuf>,

    /// Print the run report as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn run(args: ExportArgs, config_path: Option<&Utf8Path>, quiet: bool) -> Result<()> {
    let selection = require_selection(&args.trees)?;
    let mut config = load_config(config_path)?;
    apply_exclude_toggles(&mut config, &args)?;

    let restriction = parse_restriction(args.restrict_ids.as_deref())?;
    let output_path = resolve_output(args.output.as_deref());
    let interactive = !quiet && !args.json;

    if interactive {
        output::header("Export Goobi installation");
        output::kv("Goobi folder", config.goobi_folder.as_str());
        output::kv("Trees", &describe_selection(&selection));
        if restriction.is_active() {
            output::kv("Restricted to", args.restrict_ids.as_deref().unwrap_or_default());
        }
        output::kv("Archive", output_path.as_str());
        println!();
    }

    let file = File::create(&output_path)
        .with_context(|| format!("Failed to create archive {}", output_path))?;

    let handle = ProgressHandle::new();
    let watcher = interactive.then(|| ProgressWatcher::spawn(handle.clone(), "Exporting"));
    let state = Exporter::new(&config).with_progress(handle).run(
        BufWriter::new(file),
        &selection,
        &restriction,
    );
    if let Some(watcher) = watcher {
        watcher.finish();
    }

    if !state.succeeded() {
        // A failed run never leaves a usable archive
        if let Err(e) = std::fs::remove_file(&output_path) {
            tracing::warn!("Failed to remove incomplete archive {}: {}", output_path, e);
        }
    }

    report(&state, args.json, quiet, "Export")?;
    if interactive {
        output::kv("Location", output_path.as_str());
        output::info("Import with:");
        println!("  goobi-exchange import {} --all", output_path);
    }
    Ok(())
}

fn apply_exclude_toggles(config: &mut DumpConfig, args: &ExportArgs) -> Result<()> {
    let toggles = args
        .enable_exclude
        .iter()
        .map(|label| (label, true))
        .chain(args.disable_exclude.iter().map(|label| (label, false)));

    for (label, enabled) in toggles {
        if !config.exclude_rules.set_enabled(label, enabled) {
            anyhow::bail!("Unknown exclude rule '{}'", label);
        }
    }
    Ok(())
}

fn parse_restriction(ids: Option<&str>) -> Result<Restriction> {
    let Some(ids) = ids else {
        return Ok(Restriction::default());
    };
    if let Some(invalid) = ids
        .split(',')
        .map(str::trim)
        .find(|id| !id.is_empty() && !Restriction::is_valid_id(id))
    {
        anyhow::bail!("Invalid record id '{}': expected a single folder name", invalid);
    }
    Ok(Restriction::parse(ids))
}

/// `goobidump-<timestamp>.zip` in the given directory, or the given file.
fn resolve_output(output: Option<&Utf8Path>) -> Utf8PathBuf {
    let timestamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
    let archive_name = format!("goobidump-{}.zip", timestamp);
    match output {
        Some(path) if path.is_dir() => path.join(&archive_name),
        Some(path) => path.to_owned(),
        None => Utf8PathBuf::from(archive_name),
    }
}
