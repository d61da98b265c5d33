//! Streaming zip archive writer.
//!
//! One [`ArchiveWriter`] spans a whole export: every selected tree is written
//! into the same open sink and the container is finished exactly once.

use crate::error::Result;
use crate::filters::{entry_name, PathFilter};
use crate::progress::RunState;
use camino::{Utf8Path, Utf8PathBuf};
use std::fs::{self, File};
use std::io::{self, Seek, Write};
use std::path::Path;
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Counts regular files below `root`, following symbolic links. Directories
/// are not counted; a single file counts as one. Broken links and link
/// cycles are skipped.
pub fn count_files(root: &Path) -> Result<u64> {
    let mut count = 0;
    for entry in WalkDir::new(root).follow_links(true) {
        match entry {
            Ok(entry) if entry.file_type().is_file() => count += 1,
            Ok(_) => {}
            Err(e) if is_unreachable_link(&e) => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(count)
}

/// A link cycle or a link whose target does not exist.
fn is_unreachable_link(err: &walkdir::Error) -> bool {
    err.depth() > 0
        && (err.loop_ancestor().is_some()
            || err.io_error().map(io::Error::kind) == Some(io::ErrorKind::NotFound))
}

/// Filter and entry names are built from a lossy conversion, so names that
/// are not valid UTF-8 still reach the archive.
fn lossy_path(path: &Path) -> Utf8PathBuf {
    Utf8PathBuf::from(path.to_string_lossy().into_owned())
}

#[cfg(unix)]
fn permissions_of(meta: &fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    meta.permissions().mode() & 0o7777
}

#[cfg(not(unix))]
fn permissions_of(meta: &fs::Metadata) -> u32 {
    if meta.is_dir() {
        0o755
    } else {
        0o644
    }
}

/// Writes filtered trees into a zip container.
pub struct ArchiveWriter<W: Write + Seek> {
    zip: ZipWriter<W>,
}

impl<W: Write + Seek> ArchiveWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            zip: ZipWriter::new(sink),
        }
    }

    /// Streams `source_root` into the archive below `archive_prefix`.
    ///
    /// `source_root` may be a directory or a single file such as a database
    /// dump. Excluded directories are not descended into. `files_total` is
    /// seeded by a full count of the source before writing starts.
    pub fn write_tree(
        &mut self,
        source_root: &Utf8Path,
        archive_prefix: &str,
        filter: &PathFilter<'_>,
        is_metadata_tree: bool,
        state: &mut RunState,
    ) -> Result<()> {
        let root_meta = fs::metadata(source_root)?;

        if root_meta.is_file() {
            let name = entry_name(archive_prefix, source_root.file_name().unwrap_or_default());
            return self.add_file(source_root, &name, state);
        }

        state.add_total(count_files(source_root.as_std_path())?);

        let prefix = archive_prefix.trim_matches('/');
        if !prefix.is_empty() {
            self.write_directory(prefix, &root_meta)?;
        }
        state
            .log()
            .ok(format!("Add folder {} to archive.", display_name(prefix)));

        let mut walker = WalkDir::new(source_root)
            .min_depth(1)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter();

        while let Some(entry) = walker.next() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) if is_unreachable_link(&e) => {
                    let path = e.path().map(lossy_path).unwrap_or_default();
                    state.log().warning(format!("not archived: {} ({})", path, e));
                    continue;
                }
                Err(e) => return Err(e.into()),
            };
            let path = lossy_path(entry.path());
            let file_type = entry.file_type();

            let decision = filter.should_include(&path, is_metadata_tree);
            if !decision.include {
                if let Some(message) = decision.message {
                    state.log().push(message);
                }
                if file_type.is_dir() {
                    walker.skip_current_dir();
                }
                continue;
            }

            let relative = entry
                .path()
                .strip_prefix(source_root)
                .map_err(|_| io::Error::other(format!("{} is outside {}", path, source_root)))?;
            let name = entry_name(prefix, &relative.to_string_lossy());
            if entry.file_name().to_str().is_none() {
                state
                    .log()
                    .warning(format!("name is not valid UTF-8, archived as {}", name));
            }

            if file_type.is_dir() {
                self.write_directory(&name, &entry.metadata()?)?;
                state.log().ok(format!("Add folder {} to archive.", name));
            } else if file_type.is_file() {
                self.write_file(entry.path(), &name, &entry.metadata()?)?;
                state.inc_processed();
                if let Some(message) = decision.message {
                    state.log().push(message);
                }
            } else {
                state.log().warning(format!("not archived: {} (special file)", path));
            }
        }

        Ok(())
    }

    /// Writes the single file `source` as entry `name`, bypassing any filter.
    pub fn add_file(&mut self, source: &Utf8Path, name: &str, state: &mut RunState) -> Result<()> {
        let meta = fs::metadata(source)?;
        state.add_total(1);
        self.write_file(source.as_std_path(), name, &meta)?;
        state.inc_processed();
        state.log().ok(format!("added: {}", name));
        Ok(())
    }

    fn write_directory(&mut self, name: &str, meta: &fs::Metadata) -> Result<()> {
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Stored)
            .unix_permissions(permissions_of(meta));
        self.zip.add_directory(format!("{}/", name), options)?;
        Ok(())
    }

    fn write_file(&mut self, path: &Path, name: &str, meta: &fs::Metadata) -> Result<()> {
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .unix_permissions(permissions_of(meta))
            .large_file(meta.len() > u32::MAX as u64);

        self.zip.start_file(name, options)?;
        let mut file = File::open(path)?;
        io::copy(&mut file, &mut self.zip)?;
        Ok(())
    }

    /// Finalises the container and flushes the sink.
    pub fn finish(self) -> Result<W> {
        let mut sink = self.zip.finish()?;
        sink.flush()?;
        Ok(sink)
    }
}

fn display_name(prefix: &str) -> &str {
    if prefix.is_empty() {
        "/"
    } else {
        prefix
    }
}
