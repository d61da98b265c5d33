//! Replacement of live trees by their staged counterparts.

use super::swap::swap_tree;
use crate::command::CommandRunner;
use crate::config::DumpConfig;
use crate::error::{Error, Result};
use crate::progress::RunState;
use crate::tree::{LogicalTree, TreeSelection, DATABASE_DIR, SQL_DUMP_ENTRY};
use camino::Utf8Path;
use tracing::{debug, info};

/// Swaps selected staged trees into the live installation.
///
/// Trees are replaced one at a time. A fatal error leaves earlier trees
/// replaced and later ones untouched.
pub struct ReplaceEngine<'a, R: CommandRunner> {
    config: &'a DumpConfig,
    runner: &'a R,
}

impl<'a, R: CommandRunner> ReplaceEngine<'a, R> {
    pub fn new(config: &'a DumpConfig, runner: &'a R) -> Self {
        Self { config, runner }
    }

    /// Replaces every selected tree in [`LogicalTree::REPLACE_ORDER`], then
    /// restores the database when the SQL dump is selected.
    pub fn replace_selected_trees(
        &self,
        selection: &TreeSelection,
        state: &mut RunState,
    ) -> Result<()> {
        for tree in LogicalTree::REPLACE_ORDER {
            if !selection.is_selected(tree) {
                continue;
            }
            let Some(live) = self.config.tree_root(tree) else {
                continue;
            };
            let replaced = self.replace_tree(tree.dir_name(), live, state)?;
            if replaced && tree == LogicalTree::Scripts {
                make_scripts_executable(live)?;
            }
        }

        if selection.sql_dump {
            self.restore_database(state);
            self.replace_database_files(state)?;
        }
        Ok(())
    }

    /// Swaps `staging/<dir_name>` into `live`. Returns false when the upload
    /// did not contain the tree.
    fn replace_tree(&self, dir_name: &str, live: &Utf8Path, state: &mut RunState) -> Result<bool> {
        let staged = self.config.staging_folder.join(dir_name);
        if !staged.is_dir() {
            state.log().warning(format!(
                "Folder {} was not contained in the uploaded file and gets skipped.",
                dir_name
            ));
            return Ok(false);
        }

        info!("Replacing {} with {}", live, staged);
        let report = swap_tree(&staged, live)?;
        if !report.replaced_existing {
            debug!("{} did not exist before the swap", live);
        }
        state.log().ok(format!("Deleted old folder: {}", live));
        if let Some(shadow) = report.leftover_shadow {
            state.log().warning(format!(
                "Old content of {} could not be deleted and remains in {}",
                live, shadow
            ));
        }
        state
            .log()
            .ok(format!("Folder {} replaced successfully", dir_name));
        Ok(true)
    }

    /// Feeds the staged dump to the import command. Failures are logged and
    /// never abort the run.
    fn restore_database(&self, state: &mut RunState) {
        let config = self.config;
        let dump = config.staging_folder.join(SQL_DUMP_ENTRY);
        if !dump.is_file() {
            state.log().warning(
                "The uploaded file does not contain a database dump, skipping database import.",
            );
            return;
        }
        if !config.command_import.is_configured() {
            state
                .log()
                .warning("Skipping the database import as no import command is configured.");
            return;
        }

        state.log().ok("Importing database dump.");
        match self
            .runner
            .run(&config.command_import, &config.placeholder, dump.as_str())
        {
            Ok(0) => state.log().ok("Database import finished successfully."),
            Ok(code) => state.fail(
                "Error during import of database dump",
                &Error::CommandFailed {
                    kind: "Database import".to_string(),
                    code,
                },
            ),
            Err(e) => state.fail("Error during import of database dump", &e),
        }
    }

    /// Swaps a staged raw `db/` tree into the configured database folder.
    fn replace_database_files(&self, state: &mut RunState) -> Result<()> {
        let staged = self.config.staging_folder.join(DATABASE_DIR);
        if !staged.is_dir() {
            debug!("No raw database files staged");
            return Ok(());
        }
        match &self.config.database_folder {
            Some(live) => {
                self.replace_tree(DATABASE_DIR, live, state)?;
            }
            None => state.log().warning(format!(
                "Folder {} is contained in the uploaded file but no database folder is configured, skipping.",
                DATABASE_DIR
            )),
        }
        Ok(())
    }
}

/// Marks regular files directly below `scripts` executable. Subfolders are
/// left as they are.
#[cfg(unix)]
fn make_scripts_executable(scripts: &Utf8Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    for entry in std::fs::read_dir(scripts)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let mut permissions = entry.metadata()?.permissions();
        permissions.set_mode(permissions.mode() | 0o111);
        std::fs::set_permissions(entry.path(), permissions)?;
    }
    Ok(())
}

#[cfg(not(unix))]
fn make_scripts_executable(_scripts: &Utf8Path) -> Result<()> {
    Ok(())
}
