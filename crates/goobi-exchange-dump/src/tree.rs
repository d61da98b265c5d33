//! Logical trees of a Goobi installation and the operator's selection of them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Archive entry of the SQL dump, independent of the live dump file's name.
pub const SQL_DUMP_ENTRY: &str = "sql/goobi.sql";

/// Top-level archive directory holding raw database files.
pub const DATABASE_DIR: &str = "db";

/// One independently selectable category of persisted content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LogicalTree {
    Rulesets,
    Scripts,
    Configuration,
    Metadata,
    Dockets,
    Plugins,
    SqlDump,
}

impl LogicalTree {
    pub const ALL: [LogicalTree; 7] = [
        LogicalTree::Rulesets,
        LogicalTree::Scripts,
        LogicalTree::Configuration,
        LogicalTree::Metadata,
        LogicalTree::Dockets,
        LogicalTree::Plugins,
        LogicalTree::SqlDump,
    ];

    /// Directory trees written by an export, in archive order.
    pub const EXPORT_ORDER: [LogicalTree; 6] = [
        LogicalTree::Rulesets,
        LogicalTree::Configuration,
        LogicalTree::Scripts,
        LogicalTree::Dockets,
        LogicalTree::Plugins,
        LogicalTree::Metadata,
    ];

    /// Directory trees swapped by an import. SQL is handled after these.
    pub const REPLACE_ORDER: [LogicalTree; 6] = [
        LogicalTree::Rulesets,
        LogicalTree::Scripts,
        LogicalTree::Dockets,
        LogicalTree::Plugins,
        LogicalTree::Metadata,
        LogicalTree::Configuration,
    ];

    /// Name of the tree's top-level directory inside an archive and inside
    /// the Goobi folder.
    pub fn dir_name(&self) -> &'static str {
        match self {
            LogicalTree::Rulesets => "rulesets",
            LogicalTree::Scripts => "scripts",
            LogicalTree::Configuration => "config",
            LogicalTree::Metadata => "metadata",
            LogicalTree::Dockets => "xslt",
            LogicalTree::Plugins => "plugins",
            LogicalTree::SqlDump => "sql",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LogicalTree::Rulesets => "rulesets",
            LogicalTree::Scripts => "scripts",
            LogicalTree::Configuration => "configuration",
            LogicalTree::Metadata => "metadata",
            LogicalTree::Dockets => "dockets",
            LogicalTree::Plugins => "plugins",
            LogicalTree::SqlDump => "sqlDump",
        }
    }
}

impl fmt::Display for LogicalTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which logical trees take part in a run. Read once at the start of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TreeSelection {
    pub rulesets: bool,
    pub scripts: bool,
    pub configuration: bool,
    pub metadata: bool,
    pub dockets: bool,
    pub plugins: bool,
    pub sql_dump: bool,
}

impl TreeSelection {
    /// Selects every tree.
    pub fn all() -> Self {
        Self {
            rulesets: true,
            scripts: true,
            configuration: true,
            metadata: true,
            dockets: true,
            plugins: true,
            sql_dump: true,
        }
    }

    pub fn only(trees: &[LogicalTree]) -> Self {
        let mut selection = Self::default();
        for tree in trees {
            selection.set(*tree, true);
        }
        selection
    }

    pub fn is_selected(&self, tree: LogicalTree) -> bool {
        match tree {
            LogicalTree::Rulesets => self.rulesets,
            LogicalTree::Scripts => self.scripts,
            LogicalTree::Configuration => self.configuration,
            LogicalTree::Metadata => self.metadata,
            LogicalTree::Dockets => self.dockets,
            LogicalTree::Plugins => self.plugins,
            LogicalTree::SqlDump => self.sql_dump,
        }
    }

    pub fn set(&mut self, tree: LogicalTree, selected: bool) {
        let slot = match tree {
            LogicalTree::Rulesets => &mut self.rulesets,
            LogicalTree::Scripts => &mut self.scripts,
            LogicalTree::Configuration => &mut self.configuration,
            LogicalTree::Metadata => &mut self.metadata,
            LogicalTree::Dockets => &mut self.dockets,
            LogicalTree::Plugins => &mut self.plugins,
            LogicalTree::SqlDump => &mut self.sql_dump,
        };
        *slot = selected;
    }

    pub fn is_empty(&self) -> bool {
        !LogicalTree::ALL.iter().any(|t| self.is_selected(*t))
    }

    pub fn selected(&self) -> Vec<LogicalTree> {
        LogicalTree::ALL
            .into_iter()
            .filter(|t| self.is_selected(*t))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_selection_is_empty() {
        assert!(TreeSelection::default().is_empty());
        assert!(!TreeSelection::all().is_empty());
    }

    #[test]
    fn test_only_selects_given_trees() {
        let selection = TreeSelection::only(&[LogicalTree::Metadata, LogicalTree::SqlDump]);
        assert!(selection.metadata);
        assert!(selection.sql_dump);
        assert!(!selection.scripts);
        assert_eq!(
            selection.selected(),
            vec![LogicalTree::Metadata, LogicalTree::SqlDump]
        );
    }

    #[test]
    fn test_replace_order_is_fixed() {
        let names: Vec<_> = LogicalTree::REPLACE_ORDER
            .iter()
            .map(|t| t.dir_name())
            .collect();
        assert_eq!(
            names,
            vec!["rulesets", "scripts", "xslt", "plugins", "metadata", "config"]
        );
    }

    #[test]
    fn test_selection_deserializes_camel_case() {
        let selection: TreeSelection =
            serde_json::from_str(r#"{"metadata": true, "sqlDump": true}"#).unwrap();
        assert!(selection.metadata);
        assert!(selection.sql_dump);
        assert!(!selection.rulesets);
    }
}
