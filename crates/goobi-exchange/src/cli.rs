//! CLI argument parsing with clap

use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};

// Re-export command types for convenience
pub use crate::commands::excludes::ExcludesArgs;
pub use crate::commands::export::ExportArgs;
pub use crate::commands::import::ImportArgs;

/// Goobi Exchange - export and import Goobi installations
#[derive(Parser, Debug)]
#[command(name = "goobi-exchange")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to goobi-exchange.yaml config file
    #[arg(short, long, global = true, env = "GOOBI_EXCHANGE_CONFIG")]
    pub config: Option<Utf8PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write selected trees into a zip archive
    Export(ExportArgs),

    /// Replace selected trees from a zip archive
    Import(ImportArgs),

    /// List configured exclude rules
    Excludes(ExcludesArgs),
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "goobi-exchange",
            "excludes",
            "-vv",
            "--config",
            "/etc/goobi-exchange.yaml",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.config.as_deref().map(|p| p.as_str()), Some("/etc/goobi-exchange.yaml"));
        assert!(matches!(cli.command, Commands::Excludes(_)));
    }

    #[test]
    fn test_export_flags() {
        let cli = Cli::try_parse_from([
            "goobi-exchange",
            "export",
            "--metadata",
            "--sql-dump",
            "--restrict-ids",
            "10,15",
            "--enable-exclude",
            "tifs",
            "-o",
            "/tmp/dump.zip",
        ])
        .unwrap();
        let Commands::Export(args) = cli.command else {
            panic!("expected export");
        };
        let selection = args.trees.selection();
        assert!(selection.metadata);
        assert!(selection.sql_dump);
        assert!(!selection.rulesets);
        assert_eq!(args.restrict_ids.as_deref(), Some("10,15"));
        assert_eq!(args.enable_exclude, vec!["tifs"]);
    }

    #[test]
    fn test_import_requires_archive() {
        assert!(Cli::try_parse_from(["goobi-exchange", "import", "--all"]).is_err());

        let cli =
            Cli::try_parse_from(["goobi-exchange", "import", "dump.zip", "--all", "-y"]).unwrap();
        let Commands::Import(args) = cli.command else {
            panic!("expected import");
        };
        assert!(args.yes);
        assert_eq!(args.trees.selection(), goobi_exchange_dump::TreeSelection::all());
    }
}
