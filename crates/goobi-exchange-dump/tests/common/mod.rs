//! Common test helpers for goobi-exchange-dump integration tests
//!
//! - A throwaway Goobi installation below a `TempDir`
//! - A mock `CommandRunner` recording database command invocations
//! - Archive inspection helpers

use camino::{Utf8Path, Utf8PathBuf};
use goobi_exchange_dump::{CommandRunner, CommandTemplate, DumpConfig, Result};
use std::collections::BTreeMap;
use std::fs;
use std::io::{Cursor, Read};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use walkdir::WalkDir;

// ─── Installation fixture ────────────────────────────────────────────────────

/// A Goobi folder and a staging folder side by side in a temp directory.
pub struct GoobiFixture {
    _temp: TempDir,
    pub root: Utf8PathBuf,
    pub config: DumpConfig,
}

impl GoobiFixture {
    pub fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).expect("valid UTF-8");
        let goobi = root.join("goobi");
        fs::create_dir_all(&goobi).unwrap();
        let config = DumpConfig::new(&goobi)
            .with_staging_folder(root.join("staging"))
            .with_sql_dump_file(root.join("work/goobi.sql"));
        Self {
            _temp: temp,
            root,
            config,
        }
    }

    pub fn goobi(&self) -> &Utf8Path {
        &self.config.goobi_folder
    }

    /// Writes `content` to `<goobi>/<relative>`, creating parents.
    pub fn write(&self, relative: &str, content: &str) -> Utf8PathBuf {
        let path = self.goobi().join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        path
    }

    /// A small but complete installation.
    #[allow(dead_code)]
    pub fn populate(&self) {
        self.write("rulesets/ruleset.xml", "<Preferences/>");
        self.write("config/goobi_config.properties", "MetadatenVerzeichnis=/x");
        self.write("config/modules/export.xml", "<config/>");
        self.write("scripts/script_createDirMeta.sh", "#!/bin/sh");
        self.write("xslt/docket.xsl", "<xsl:stylesheet/>");
        self.write("plugins/step/plugin_intranda_step.jar", "jar");
        self.write("metadata/10/meta.xml", "<mets:mets/>");
        self.write("metadata/10/images/master/0001.tif", "TIFF");
        self.write("metadata/11/meta.xml", "<mets:mets/>");
        fs::create_dir_all(self.goobi().join("metadata/12/ocr")).unwrap();
    }
}

/// Relative path → content of every regular file below `root`.
#[allow(dead_code)]
pub fn snapshot(root: &Utf8Path) -> BTreeMap<String, String> {
    let mut files = BTreeMap::new();
    for entry in WalkDir::new(root) {
        let entry = entry.unwrap();
        if entry.file_type().is_file() {
            let relative = entry.path().strip_prefix(root).unwrap();
            files.insert(
                relative.to_string_lossy().replace('\\', "/"),
                fs::read_to_string(entry.path()).unwrap(),
            );
        }
    }
    files
}

/// Entry names of an archive, in archive order.
#[allow(dead_code)]
pub fn entry_names(bytes: &[u8]) -> Vec<String> {
    let archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    archive.file_names().map(str::to_string).collect()
}

/// Content of one archive entry.
#[allow(dead_code)]
pub fn entry_content(bytes: &[u8], name: &str) -> String {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    let mut content = String::new();
    archive
        .by_name(name)
        .unwrap()
        .read_to_string(&mut content)
        .unwrap();
    content
}

// ─── Command mock ────────────────────────────────────────────────────────────

/// Stands in for the database tools.
///
/// With `dump_content` set, the last argument is treated as the dump path
/// and the content is written there, as an export script would.
#[derive(Debug, Clone, Default)]
pub struct MockRunner {
    pub exit_code: i32,
    pub dump_content: Option<String>,
    pub calls: Arc<Mutex<Vec<Vec<String>>>>,
}

#[allow(dead_code)]
impl MockRunner {
    pub fn succeeding() -> Self {
        Self::default()
    }

    pub fn failing(exit_code: i32) -> Self {
        Self {
            exit_code,
            ..Self::default()
        }
    }

    pub fn dumping(content: &str) -> Self {
        Self {
            dump_content: Some(content.to_string()),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }
}

impl CommandRunner for MockRunner {
    fn execute(&self, argv: &[String]) -> Result<i32> {
        self.calls.lock().unwrap().push(argv.to_vec());
        if let (Some(content), Some(path)) = (&self.dump_content, argv.last()) {
            fs::write(path, content)?;
        }
        Ok(self.exit_code)
    }
}

/// `/bin/sh <script> DATABASE_TEMPFILE`
#[allow(dead_code)]
pub fn script_template(script: &str) -> CommandTemplate {
    CommandTemplate::new(["/bin/sh", script, "DATABASE_TEMPFILE"])
}
