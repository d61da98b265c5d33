//! Import of an uploaded archive into the live installation.
//!
//! An import runs in two phases. The archive is first unpacked into the
//! staging area; only when that succeeded are the selected trees swapped
//! into place and the database restored.

use crate::command::{CommandRunner, ProcessRunner};
use crate::config::DumpConfig;
use crate::error::Result;
use crate::progress::{ProgressHandle, RunState};
use crate::tree::TreeSelection;
use std::io::{self, Read, Seek};
use tracing::info;

pub mod extract;
pub mod replace;
pub mod swap;

pub use extract::ArchiveReader;
pub use replace::ReplaceEngine;
pub use swap::{swap_tree, SwapReport};

/// Runs import invocations against a resolved configuration.
pub struct Importer<'a, R: CommandRunner = ProcessRunner> {
    config: &'a DumpConfig,
    runner: R,
    progress: ProgressHandle,
}

impl<'a> Importer<'a, ProcessRunner> {
    pub fn new(config: &'a DumpConfig) -> Self {
        Self::with_runner(config, ProcessRunner)
    }
}

impl<'a, R: CommandRunner> Importer<'a, R> {
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

    /// Imports the archive read from `source`.
    ///
    /// The source is spooled to a temporary file first, so any byte stream
    /// works. Failures are reported as ERROR messages on the returned state.
    pub fn run<S: Read>(&self, mut source: S, selection: &TreeSelection) -> RunState {
        let mut state = RunState::with_handle(self.progress.clone());
        info!("Starting import: {:?}", selection.selected());

        match self.import(&mut source, selection, &mut state) {
            Ok(()) => state.finish("Entire Goobi dump import finished successfully."),
            Err(e) => state.fail("Exception while executing the import", &e),
        }
        state
    }

    fn import<S: Read>(
        &self,
        source: &mut S,
        selection: &TreeSelection,
        state: &mut RunState,
    ) -> Result<()> {
        let mut spool = tempfile::tempfile()?;
        io::copy(source, &mut spool)?;
        spool.rewind()?;

        ArchiveReader::new(&self.config.staging_folder).extract(spool, state)?;
        ReplaceEngine::new(self.config, &self.runner).replace_selected_trees(selection, state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Severity;
    use camino::Utf8PathBuf;
    use std::fs;
    use std::io::{Cursor, Write};
    use tempfile::TempDir;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    struct NoCommands;

    impl CommandRunner for NoCommands {
        fn execute(&self, argv: &[String]) -> Result<i32> {
            panic!("unexpected command {:?}", argv);
        }
    }

    fn fixture() -> (TempDir, DumpConfig) {
        let temp = TempDir::new().unwrap();
        let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
        let config = DumpConfig::new(root.join("goobi")).with_staging_folder(root.join("staging"));
        (temp, config)
    }

    fn upload(entries: &[(&str, &str)]) -> Vec<u8> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, content) in entries {
            zip.start_file(*name, SimpleFileOptions::default()).unwrap();
            zip.write_all(content.as_bytes()).unwrap();
        }
        zip.finish().unwrap().into_inner()
    }

    #[test]
    fn test_import_replaces_selected_tree_only() {
        let (_temp, config) = fixture();
        let xslt = config.tree_root(crate::LogicalTree::Dockets).unwrap().to_owned();
        fs::create_dir_all(&xslt).unwrap();
        fs::write(xslt.join("old.xsl"), "old").unwrap();

        let bytes = upload(&[("xslt/new.xsl", "new"), ("rulesets/r.xml", "r")]);
        let importer = Importer::with_runner(&config, NoCommands);
        let state = importer.run(
            bytes.as_slice(),
            &TreeSelection::only(&[crate::LogicalTree::Dockets]),
        );

        assert!(state.succeeded(), "{:?}", state.messages());
        assert!(xslt.join("new.xsl").exists());
        assert!(!xslt.join("old.xsl").exists());
        assert!(!config.tree_root(crate::LogicalTree::Rulesets).unwrap().exists());
    }

    #[test]
    fn test_broken_upload_leaves_live_trees_alone() {
        let (_temp, config) = fixture();
        let metadata = config.metadata_root().to_owned();
        fs::create_dir_all(metadata.join("10")).unwrap();

        let importer = Importer::with_runner(&config, NoCommands);
        let state = importer.run(&b"PK\x03\x04 truncated"[..], &TreeSelection::all());

        assert!(!state.is_finished());
        assert_eq!(state.messages().count(Severity::Error), 1);
        assert!(metadata.join("10").is_dir());
    }
}
