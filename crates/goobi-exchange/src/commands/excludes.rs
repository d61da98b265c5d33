//! Excludes command

use anyhow::Result;
use camino::Utf8Path;
use clap::Args;
use console::style;
use goobi_exchange_dump::ExcludeRules;
use serde::Serialize;

use super::load_config;
use crate::output;

#[derive(Args, Debug)]
pub struct ExcludesArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
struct RuleEntry<'a> {
    label: &'a str,
    regex: &'a str,
    enabled: bool,
}

fn entries(rules: &ExcludeRules) -> Vec<RuleEntry<'_>> {
    rules
        .iter()
        .map(|rule| RuleEntry {
            label: rule.label(),
            regex: rule.pattern(),
            enabled: rule.is_enabled(),
        })
        .collect()
}

pub fn run(args: ExcludesArgs, config_path: Option<&Utf8Path>) -> Result<()> {
    let config = load_config(config_path)?;
    let rules = entries(&config.exclude_rules);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&rules)?);
        return Ok(());
    }

    output::header("Exclude rules");
    if rules.is_empty() {
        output::info("No exclude rules configured");
        return Ok(());
    }
    for rule in &rules {
        let state = if rule.enabled {
            style("enabled").green()
        } else {
            style("disabled").dim()
        };
        println!("  {:<20} {:<10} {}", rule.label, state, rule.regex);
    }
    Ok(())
}
