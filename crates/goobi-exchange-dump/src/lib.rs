//! Goobi Exchange Dump
//!
//! Selective export and staged import of a Goobi installation's persistent
//! state: the SQL database dump and the on-disk trees for metadata,
//! configuration, rulesets, scripts, dockets and plugins.
//!
//! # Features
//!
//! ## Export
//! - **Selective trees**: any subset of the logical trees goes into one zip archive
//! - **Exclude rules**: labelled regular expressions drop matching metadata paths
//! - **Record restriction**: limit the metadata tree to a list of record ids
//! - **Database dump**: an external command writes the dump before archiving starts
//!
//! ## Import
//! - **Staging**: uploads are unpacked into an isolated staging folder first
//! - **Staged swap**: each selected live tree is replaced by its staged counterpart
//! - **Database restore**: an external command is fed the staged dump
//!
//! Every run returns a [`RunState`] carrying the ordered message log and the
//! `finished` flag. Progress can be polled from another thread through a
//! [`ProgressHandle`].
//!
//! # Examples
//!
//! ```no_run
//! use goobi_exchange_dump::{DumpConfig, Exporter, Restriction, TreeSelection};
//! use std::fs::File;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = DumpConfig::load(None)?;
//!     let sink = File::create("goobidump.zip")?;
//!
//!     let state = Exporter::new(&config).run(
//!         sink,
//!         &TreeSelection::all(),
//!         &Restriction::parse("10,15"),
//!     );
//!
//!     for message in state.messages() {
//!         println!("{}: {}", message.severity, message.text);
//!     }
//!     Ok(())
//! }
//! ```

pub mod archive;
pub mod command;
pub mod config;
pub mod error;
pub mod export;
pub mod filters;
pub mod message;
pub mod progress;
pub mod restore;
pub mod tree;

// Re-export commonly used types
pub use archive::{count_files, ArchiveWriter};
pub use command::{CommandRunner, CommandTemplate, ProcessRunner, DEFAULT_PLACEHOLDER};
pub use config::{DumpConfig, DumpConfigFile, TreeOverrides, CONFIG_FILE_NAMES};
pub use error::{Error, Result};
pub use export::Exporter;
pub use filters::{ExcludeRule, ExcludeRules, FilterDecision, PathFilter, Restriction};
pub use message::{Message, MessageLog, Severity};
pub use progress::{ProgressHandle, ProgressWatcher, RunState};
pub use restore::{ArchiveReader, Importer, ReplaceEngine};
pub use tree::{LogicalTree, TreeSelection, DATABASE_DIR, SQL_DUMP_ENTRY};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
