//! Extraction of an uploaded archive into the staging area.

use crate::error::Result;
use crate::progress::RunState;
use camino::Utf8Path;
use std::fs::{self, File};
use std::io::{self, Read, Seek};
use tracing::debug;
use zip::ZipArchive;

/// Dotfiles and dot-directories are never extracted.
fn is_hidden(name: &str) -> bool {
    name.trim_end_matches('/')
        .rsplit('/')
        .next()
        .is_some_and(|last| last.starts_with('.'))
}

/// Unpacks archives into one staging root.
pub struct ArchiveReader<'a> {
    staging_root: &'a Utf8Path,
}

impl<'a> ArchiveReader<'a> {
    pub fn new(staging_root: &'a Utf8Path) -> Self {
        Self { staging_root }
    }

    /// Empties the staging root, leaving it as an existing empty directory.
    pub fn clear_staging(&self) -> Result<()> {
        if fs::symlink_metadata(self.staging_root).is_ok() {
            debug!("Clearing staging folder {}", self.staging_root);
            fs::remove_dir_all(self.staging_root)?;
        }
        fs::create_dir_all(self.staging_root)?;
        Ok(())
    }

    /// Extracts every entry of `source` below the staging root.
    ///
    /// `files_total` is seeded from a counting pass over the archive's
    /// central directory before any entry is written.
    pub fn extract<R: Read + Seek>(&self, mut source: R, state: &mut RunState) -> Result<()> {
        self.clear_staging()?;

        {
            let archive = ZipArchive::new(&mut source)?;
            let files = archive
                .file_names()
                .filter(|name| !name.ends_with('/') && !is_hidden(name))
                .count();
            state.add_total(files as u64);
        }
        source.rewind()?;

        let mut archive = ZipArchive::new(source)?;
        for index in 0..archive.len() {
            let mut entry = archive.by_index(index)?;
            let name = entry.name().to_string();

            let Some(relative) = entry.enclosed_name() else {
                state
                    .log()
                    .warning(format!("Refusing entry outside the staging folder: {}", name));
                continue;
            };
            if is_hidden(&name) {
                debug!("Skipping hidden entry {}", name);
                continue;
            }

            let target = self.staging_root.as_std_path().join(relative);
            if entry.is_dir() {
                fs::create_dir_all(&target)?;
                state.log().ok(format!("Creating directory: {}", name));
                continue;
            }

            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            let mut out = File::create(&target)?;
            io::copy(&mut entry, &mut out)?;

            #[cfg(unix)]
            if let Some(mode) = entry.unix_mode() {
                use std::os::unix::fs::PermissionsExt;
                fs::set_permissions(&target, fs::Permissions::from_mode(mode & 0o7777))?;
            }

            state.inc_processed();
        }

        state.log().ok("File successfully extracted.");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use camino::Utf8PathBuf;
    use std::io::{Cursor, Write};
    use tempfile::TempDir;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    fn archive_of(entries: &[(&str, Option<&str>)]) -> Cursor<Vec<u8>> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, content) in entries {
            match content {
                Some(content) => {
                    zip.start_file(*name, SimpleFileOptions::default()).unwrap();
                    zip.write_all(content.as_bytes()).unwrap();
                }
                None => zip
                    .add_directory(*name, SimpleFileOptions::default())
                    .unwrap(),
            }
        }
        let mut cursor = zip.finish().unwrap();
        cursor.set_position(0);
        cursor
    }

    fn staging() -> (TempDir, Utf8PathBuf) {
        let temp = TempDir::new().unwrap();
        let root = Utf8PathBuf::from_path_buf(temp.path().join("dump")).unwrap();
        (temp, root)
    }

    #[test]
    fn test_hidden_names() {
        assert!(is_hidden(".htaccess"));
        assert!(is_hidden("config/.git/"));
        assert!(is_hidden("metadata/1/.DS_Store"));
        assert!(!is_hidden("metadata/1/meta.xml"));
        assert!(!is_hidden("metadata/.hidden/visible.xml"));
    }

    #[test]
    fn test_extract_directories_and_files() {
        let (_temp, root) = staging();
        let source = archive_of(&[
            ("rulesets/", None),
            ("rulesets/ruleset.xml", Some("<ruleset/>")),
            ("metadata/10/meta.xml", Some("<mets/>")),
        ]);

        let mut state = RunState::new();
        ArchiveReader::new(&root).extract(source, &mut state).unwrap();

        assert!(root.join("rulesets").is_dir());
        assert_eq!(
            fs::read_to_string(root.join("metadata/10/meta.xml")).unwrap(),
            "<mets/>"
        );
        assert_eq!(state.files_total(), 2);
        assert_eq!(state.files_processed(), 2);
        assert_eq!(state.progress(), 100);
    }

    #[test]
    fn test_hidden_entries_are_skipped() {
        let (_temp, root) = staging();
        let source = archive_of(&[
            ("config/.git/", None),
            ("config/.htaccess", Some("deny")),
            ("config/goobi_config.properties", Some("a=b")),
        ]);

        let mut state = RunState::new();
        ArchiveReader::new(&root).extract(source, &mut state).unwrap();

        assert!(!root.join("config/.htaccess").exists());
        assert!(!root.join("config/.git").exists());
        assert_eq!(state.files_processed(), 1);
        assert_eq!(state.files_total(), 1);
    }

    #[test]
    fn test_previous_staging_content_is_cleared() {
        let (_temp, root) = staging();
        fs::create_dir_all(root.join("scripts")).unwrap();
        fs::write(root.join("scripts/stale.sh"), "old").unwrap();

        let source = archive_of(&[("scripts/fresh.sh", Some("new"))]);
        let mut state = RunState::new();
        ArchiveReader::new(&root).extract(source, &mut state).unwrap();

        assert!(!root.join("scripts/stale.sh").exists());
        assert!(root.join("scripts/fresh.sh").exists());
    }

    #[test]
    fn test_escaping_entry_is_refused() {
        let (temp, root) = staging();
        let source = archive_of(&[
            ("../outside.txt", Some("nope")),
            ("xslt/docket.xsl", Some("<xsl/>")),
        ]);

        let mut state = RunState::new();
        ArchiveReader::new(&root).extract(source, &mut state).unwrap();

        assert!(!temp.path().join("outside.txt").exists());
        assert!(root.join("xslt/docket.xsl").exists());
        assert_eq!(
            state
                .messages()
                .count(crate::message::Severity::Warning),
            1
        );
    }

    #[test]
    fn test_garbage_input_is_archive_error() {
        let (_temp, root) = staging();
        let mut state = RunState::new();
        let result =
            ArchiveReader::new(&root).extract(Cursor::new(b"not a zip".to_vec()), &mut state);
        assert!(matches!(result, Err(Error::Zip(_))));
    }
}
