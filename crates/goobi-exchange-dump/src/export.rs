//! Selective export of a Goobi installation into one zip archive.

use crate::archive::ArchiveWriter;
use crate::command::{CommandRunner, ProcessRunner};
use crate::config::DumpConfig;
use crate::error::{Error, Result};
use crate::filters::{PathFilter, Restriction};
use crate::progress::{ProgressHandle, RunState};
use crate::tree::{LogicalTree, TreeSelection, SQL_DUMP_ENTRY};
use std::io::{Seek, Write};
use tracing::info;

/// Runs export invocations against a resolved configuration.
pub struct Exporter<'a, R: CommandRunner = ProcessRunner> {
    config: &'a DumpConfig,
    runner: R,
    progress: ProgressHandle,
}

impl<'a> Exporter<'a, ProcessRunner> {
    pub fn new(config: &'a DumpConfig) -> Self {
        Self::with_runner(config, ProcessRunner)
    }
}

impl<'a, R: CommandRunner> Exporter<'a, R> {
    pub fn with_runner(config: &'a DumpConfig, runner: R) -> Self {
        Self {
            config,
            runner,
            progress: ProgressHandle::new(),
        }
    }

    /// Reports counters through `handle`, which is reset at the start of each run.
    pub fn with_progress(mut self, handle: ProgressHandle) -> Self {
        self.progress = handle;
        self
    }

    /// Writes the selected trees into `sink`.
    ///
    /// Never returns an error: failures end up as an ERROR message and
    /// leave the run unfinished. An archive written by a failed run is not
    /// usable.
    pub fn run<W: Write + Seek>(
        &self,
        sink: W,
        selection: &TreeSelection,
        restriction: &Restriction,
    ) -> RunState {
        let mut state = RunState::with_handle(self.progress.clone());
        info!("Starting export: {:?}", selection.selected());

        match self.export(sink, selection, restriction, &mut state) {
            Ok(()) => state.finish("Entire Goobi dump export finished successfully."),
            Err(e @ Error::CommandFailed { .. }) => {
                state.fail("Error during creation of database dump", &e)
            }
            Err(e) => state.fail("Exception while executing the export", &e),
        }
        state
    }

    fn export<W: Write + Seek>(
        &self,
        sink: W,
        selection: &TreeSelection,
        restriction: &Restriction,
        state: &mut RunState,
    ) -> Result<()> {
        // The dump must succeed before a single archive byte is written.
        let include_dump = selection.sql_dump && self.create_database_dump(state)?;

        let config = self.config;
        let filter = PathFilter::new(config.metadata_root(), restriction, &config.exclude_rules);
        let mut writer = ArchiveWriter::new(sink);

        if include_dump {
            state.log().ok("Add database dump to archive.");
            writer.add_file(&config.sql_dump_file, SQL_DUMP_ENTRY, state)?;
        }

        for tree in LogicalTree::EXPORT_ORDER {
            if !selection.is_selected(tree) {
                continue;
            }
            let Some(root) = config.tree_root(tree) else {
                continue;
            };
            if !root.exists() {
                state.log().warning(format!(
                    "Folder {} does not exist and gets skipped.",
                    root
                ));
                continue;
            }
            writer.write_tree(
                root,
                tree.dir_name(),
                &filter,
                tree == LogicalTree::Metadata,
                state,
            )?;
        }

        writer.finish()?;
        Ok(())
    }

    /// Returns whether a dump file is ready to be archived.
    fn create_database_dump(&self, state: &mut RunState) -> Result<bool> {
        let config = self.config;
        if !config.command_export.is_configured() {
            state
                .log()
                .warning("Skipping the database dump as no export command is configured.");
            return Ok(false);
        }

        state.log().ok("Creating Goobi dump.");
        if let Some(parent) = config.sql_dump_file.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let code = self.runner.run(
            &config.command_export,
            &config.placeholder,
            config.sql_dump_file.as_str(),
        )?;
        if code != 0 {
            return Err(Error::CommandFailed {
                kind: "Database export".to_string(),
                code,
            });
        }

        state.log().ok("Created SQL dump successfully.");
        Ok(true)
    }
}
