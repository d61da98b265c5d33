//! Configuration file loading and resolution.
//!
//! The YAML file is parsed into [`DumpConfigFile`] and then resolved into a
//! [`DumpConfig`] value object that is passed explicitly to every component.

use crate::command::{CommandTemplate, DEFAULT_PLACEHOLDER};
use crate::error::{Error, Result};
use crate::filters::{ExcludeRule, ExcludeRules};
use crate::tree::LogicalTree;
use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;

/// Configuration file names to search for
pub const CONFIG_FILE_NAMES: &[&str] = &["goobi-exchange.yaml", "goobi-exchange.yml"];

/// Per-tree overrides of the default `<goobi_folder>/<dir>` locations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeOverrides {
    pub rulesets: Option<Utf8PathBuf>,
    pub scripts: Option<Utf8PathBuf>,
    pub configuration: Option<Utf8PathBuf>,
    pub metadata: Option<Utf8PathBuf>,
    pub dockets: Option<Utf8PathBuf>,
    pub plugins: Option<Utf8PathBuf>,
    /// Raw database directory replaced from a staged `db/` tree
    pub database: Option<Utf8PathBuf>,
}

impl TreeOverrides {
    fn get(&self, tree: LogicalTree) -> Option<&Utf8PathBuf> {
        match tree {
            LogicalTree::Rulesets => self.rulesets.as_ref(),
            LogicalTree::Scripts => self.scripts.as_ref(),
            LogicalTree::Configuration => self.configuration.as_ref(),
            LogicalTree::Metadata => self.metadata.as_ref(),
            LogicalTree::Dockets => self.dockets.as_ref(),
            LogicalTree::Plugins => self.plugins.as_ref(),
            LogicalTree::SqlDump => None,
        }
    }
}

/// On-disk configuration format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DumpConfigFile {
    pub goobi_folder: Utf8PathBuf,

    #[serde(default)]
    pub staging_folder: Option<Utf8PathBuf>,

    #[serde(default)]
    pub sql_dump_file: Option<Utf8PathBuf>,

    #[serde(default)]
    pub placeholder: Option<String>,

    #[serde(default)]
    pub command_export: CommandTemplate,

    #[serde(default)]
    pub command_import: CommandTemplate,

    #[serde(default)]
    pub trees: TreeOverrides,

    #[serde(default)]
    pub excludes: Vec<ExcludeRule>,
}

/// Resolved configuration consumed by the exporter and importer.
#[derive(Debug, Clone)]
pub struct DumpConfig {
    pub goobi_folder: Utf8PathBuf,
    pub staging_folder: Utf8PathBuf,
    pub sql_dump_file: Utf8PathBuf,
    pub placeholder: String,
    pub command_export: CommandTemplate,
    pub command_import: CommandTemplate,
    pub database_folder: Option<Utf8PathBuf>,
    pub exclude_rules: ExcludeRules,
    roots: BTreeMap<LogicalTree, Utf8PathBuf>,
    config_path: Option<Utf8PathBuf>,
}

impl DumpConfig {
    /// Creates a configuration with default locations below `goobi_folder`
    /// and no commands or exclude rules.
    pub fn new(goobi_folder: impl Into<Utf8PathBuf>) -> Self {
        let goobi_folder = goobi_folder.into();
        let roots = LogicalTree::EXPORT_ORDER
            .iter()
            .map(|tree| (*tree, goobi_folder.join(tree.dir_name())))
            .collect();

        Self {
            staging_folder: goobi_folder.join("tmp").join("dump"),
            sql_dump_file: goobi_folder.join("tmp").join("goobi.sql"),
            placeholder: DEFAULT_PLACEHOLDER.to_string(),
            command_export: CommandTemplate::default(),
            command_import: CommandTemplate::default(),
            database_folder: None,
            exclude_rules: ExcludeRules::default(),
            roots,
            config_path: None,
            goobi_folder,
        }
    }

    /// Load configuration from the specified path or search for it
    pub fn load(path: Option<&Utf8Path>) -> Result<Self> {
        let (config_path, content) = if let Some(p) = path {
            let content = fs::read_to_string(p).map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    Error::config_not_found(p.as_str())
                } else {
                    Error::Io(e)
                }
            })?;
            (p.to_owned(), content)
        } else {
            Self::find_config()?
        };

        let mut config = Self::from_yaml(&content)?;
        config.config_path = Some(config_path);
        Ok(config)
    }

    /// Parse and resolve configuration from YAML text
    pub fn from_yaml(content: &str) -> Result<Self> {
        let file: DumpConfigFile = serde_yaml_ng::from_str(content)?;
        Self::from_file(file)
    }

    /// Resolve a parsed configuration file, compiling exclude rules.
    pub fn from_file(file: DumpConfigFile) -> Result<Self> {
        if file.goobi_folder.as_str().trim().is_empty() {
            return Err(Error::invalid_config("goobi_folder must not be empty"));
        }

        let mut config = Self::new(file.goobi_folder);
        for tree in LogicalTree::EXPORT_ORDER {
            if let Some(root) = file.trees.get(tree) {
                config.roots.insert(tree, root.clone());
            }
        }
        config.database_folder = file.trees.database;
        if let Some(staging) = file.staging_folder {
            config.staging_folder = staging;
        }
        if let Some(dump) = file.sql_dump_file {
            config.sql_dump_file = dump;
        }
        if let Some(placeholder) = file.placeholder {
            config.placeholder = placeholder;
        }
        config.command_export = file.command_export;
        config.command_import = file.command_import;
        config.exclude_rules = ExcludeRules::compile(&file.excludes)?;

        config.validate()?;
        Ok(config)
    }

    /// Find configuration file in current directory or parent directories
    fn find_config() -> Result<(Utf8PathBuf, String)> {
        let cwd = std::env::current_dir().map_err(Error::Io)?;
        let cwd = Utf8PathBuf::try_from(cwd)
            .map_err(|_| Error::invalid_config("Current directory path is not valid UTF-8"))?;

        let mut current = cwd.as_path();

        loop {
            for name in CONFIG_FILE_NAMES {
                let path = current.join(name);
                if path.exists() {
                    let content = fs::read_to_string(&path)?;
                    return Ok((path, content));
                }
            }

            match current.parent() {
                Some(parent) => current = parent,
                None => break,
            }
        }

        Err(Error::config_not_found(
            "goobi-exchange.yaml (searched current and parent directories)",
        ))
    }

    /// Checks invariants that must hold before any run.
    pub fn validate(&self) -> Result<()> {
        if self.placeholder.is_empty() {
            return Err(Error::invalid_config("placeholder must not be empty"));
        }

        let mut live: Vec<&Utf8Path> = self.roots.values().map(|p| p.as_path()).collect();
        if let Some(db) = &self.database_folder {
            live.push(db);
        }
        for root in live {
            if self.staging_folder.starts_with(root) || root.starts_with(&self.staging_folder) {
                return Err(Error::invalid_config(format!(
                    "staging_folder {} overlaps live tree {}",
                    self.staging_folder, root
                )));
            }
        }
        Ok(())
    }

    /// Live root of a directory tree. `None` for the SQL dump, which is a single file.
    pub fn tree_root(&self, tree: LogicalTree) -> Option<&Utf8Path> {
        self.roots.get(&tree).map(|p| p.as_path())
    }

    /// Live metadata root, the anchor of the record-id restriction.
    pub fn metadata_root(&self) -> &Utf8Path {
        self.roots
            .get(&LogicalTree::Metadata)
            .map(|p| p.as_path())
            .unwrap_or(self.goobi_folder.as_path())
    }

    /// Path the configuration was loaded from, if any
    pub fn config_path(&self) -> Option<&Utf8Path> {
        self.config_path.as_deref()
    }

    pub fn with_tree_root(mut self, tree: LogicalTree, root: impl Into<Utf8PathBuf>) -> Self {
        if tree != LogicalTree::SqlDump {
            self.roots.insert(tree, root.into());
        }
        self
    }

    pub fn with_staging_folder(mut self, staging: impl Into<Utf8PathBuf>) -> Self {
        self.staging_folder = staging.into();
        self
    }

    pub fn with_sql_dump_file(mut self, dump: impl Into<Utf8PathBuf>) -> Self {
        self.sql_dump_file = dump.into();
        self
    }

    pub fn with_database_folder(mut self, folder: impl Into<Utf8PathBuf>) -> Self {
        self.database_folder = Some(folder.into());
        self
    }

    pub fn with_export_command(mut self, command: CommandTemplate) -> Self {
        self.command_export = command;
        self
    }

    pub fn with_import_command(mut self, command: CommandTemplate) -> Self {
        self.command_import = command;
        self
    }

    pub fn with_exclude_rules(mut self, rules: &[ExcludeRule]) -> Result<Self> {
        self.exclude_rules = ExcludeRules::compile(rules)?;
        Ok(self)
    }
}
