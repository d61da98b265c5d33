//! Path filtering for export operations.
//!
//! Exclude rules and the record-id restriction only ever apply to the
//! metadata tree. Every other tree is exported unfiltered.

use crate::error::{Error, Result};
use crate::message::Message;
use camino::{Utf8Component, Utf8Path};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Exclude rule as written in the configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExcludeRule {
    pub label: String,
    pub regex: String,
    #[serde(default)]
    pub enabled: bool,
}

impl ExcludeRule {
    pub fn new(label: impl Into<String>, regex: impl Into<String>, enabled: bool) -> Self {
        Self {
            label: label.into(),
            regex: regex.into(),
            enabled,
        }
    }
}

/// An exclude rule with its pattern compiled for full-string matching.
#[derive(Debug, Clone)]
pub struct CompiledRule {
    label: String,
    source: String,
    pattern: Regex,
    enabled: bool,
}

impl CompiledRule {
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn pattern(&self) -> &str {
        &self.source
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// True when the pattern matches the whole of `path`.
    pub fn matches(&self, path: &str) -> bool {
        self.pattern.is_match(path)
    }
}

/// Ordered, compiled exclude rules.
#[derive(Debug, Clone, Default)]
pub struct ExcludeRules {
    rules: Vec<CompiledRule>,
}

impl ExcludeRules {
    /// Compiles the configured rules, keeping their order.
    pub fn compile(rules: &[ExcludeRule]) -> Result<Self> {
        let mut compiled = Vec::with_capacity(rules.len());
        for rule in rules {
            let invalid = |source| Error::InvalidExcludePattern {
                label: rule.label.clone(),
                pattern: rule.regex.clone(),
                source,
            };
            // The raw pattern must parse on its own; wrapping alone could
            // turn an unbalanced pattern into a valid one.
            Regex::new(&rule.regex).map_err(invalid)?;
            let pattern = Regex::new(&format!("^(?:{})$", rule.regex)).map_err(invalid)?;
            compiled.push(CompiledRule {
                label: rule.label.clone(),
                source: rule.regex.clone(),
                pattern,
                enabled: rule.enabled,
            });
        }
        Ok(Self { rules: compiled })
    }

    /// Toggles the rule with the given label. Returns false if no rule has that label.
    pub fn set_enabled(&mut self, label: &str, enabled: bool) -> bool {
        let mut found = false;
        for rule in self.rules.iter_mut().filter(|r| r.label == label) {
            rule.enabled = enabled;
            found = true;
        }
        found
    }

    /// First enabled rule, in configured order, that fully matches `path`.
    pub fn first_match(&self, path: &str) -> Option<&CompiledRule> {
        self.rules
            .iter()
            .filter(|r| r.enabled)
            .find(|r| r.matches(path))
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CompiledRule> {
        self.rules.iter()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Optional allow-list of record ids for the metadata tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Restriction {
    pub enabled: bool,
    pub allowed_ids: BTreeSet<String>,
}

impl Restriction {
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn new<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            enabled: true,
            allowed_ids: ids
                .into_iter()
                .map(Into::into)
                .map(|id: String| id.trim().to_string())
                .filter(|id| {
                    let valid = Self::is_valid_id(id);
                    if !valid && !id.is_empty() {
                        tracing::warn!("Ignoring invalid record id '{}'", id);
                    }
                    valid
                })
                .collect(),
        }
    }

    /// A record id names exactly one folder directly below the metadata root.
    pub fn is_valid_id(id: &str) -> bool {
        let mut components = Utf8Path::new(id).components();
        matches!(
            (components.next(), components.next()),
            (Some(Utf8Component::Normal(_)), None)
        )
    }

    /// Parses a comma separated id list such as `"10,15"`.
    pub fn parse(ids: &str) -> Self {
        Self::new(ids.split(',').map(str::to_string))
    }

    /// The restriction only takes part in filtering when enabled and non-empty.
    pub fn is_active(&self) -> bool {
        self.enabled && !self.allowed_ids.is_empty()
    }

    /// True when `path` equals or lies below `<metadata_root>/<id>` for an allowed id.
    pub fn allows(&self, metadata_root: &Utf8Path, path: &Utf8Path) -> bool {
        self.allowed_ids
            .iter()
            .any(|id| path.starts_with(metadata_root.join(id)))
    }
}

/// Outcome of evaluating one candidate path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterDecision {
    pub include: bool,
    pub message: Option<Message>,
}

impl FilterDecision {
    fn include(message: Option<Message>) -> Self {
        Self {
            include: true,
            message,
        }
    }

    fn exclude(message: Option<Message>) -> Self {
        Self {
            include: false,
            message,
        }
    }
}

/// Decides which paths enter an export archive.
#[derive(Debug, Clone)]
pub struct PathFilter<'a> {
    metadata_root: &'a Utf8Path,
    restriction: &'a Restriction,
    rules: &'a ExcludeRules,
}

impl<'a> PathFilter<'a> {
    pub fn new(
        metadata_root: &'a Utf8Path,
        restriction: &'a Restriction,
        rules: &'a ExcludeRules,
    ) -> Self {
        Self {
            metadata_root,
            restriction,
            rules,
        }
    }

    pub fn metadata_root(&self) -> &Utf8Path {
        self.metadata_root
    }

    /// Evaluates `path` (an absolute live path).
    ///
    /// Restriction failures exclude silently; exclude-rule matches exclude
    /// with a WARNING; anything else is included with an OK message.
    pub fn should_include(&self, path: &Utf8Path, is_metadata_tree: bool) -> FilterDecision {
        if !is_metadata_tree || path == self.metadata_root {
            return FilterDecision::include(None);
        }

        if self.restriction.is_active() && !self.restriction.allows(self.metadata_root, path) {
            tracing::debug!("Outside of restricted ids: {}", path);
            return FilterDecision::exclude(None);
        }

        match self.rules.first_match(path.as_str()) {
            Some(rule) => FilterDecision::exclude(Some(Message::warning(format!(
                "ignored: {} (matches exclude rule '{}')",
                path,
                rule.label()
            )))),
            None => FilterDecision::include(Some(Message::ok(format!("added: {}", path)))),
        }
    }
}

/// Joins an archive prefix and a relative name with `/`; an empty prefix yields the name.
pub fn entry_name(prefix: &str, name: &str) -> String {
    let prefix = prefix.trim_matches('/');
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", prefix, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Severity;

    const ROOT: &str = "/opt/digiverso/goobi/metadata";

    fn rules(defs: &[(&str, &str, bool)]) -> ExcludeRules {
        let defs: Vec<_> = defs
            .iter()
            .map(|(l, r, e)| ExcludeRule::new(*l, *r, *e))
            .collect();
        ExcludeRules::compile(&defs).unwrap()
    }

    fn decide(
        path: &str,
        metadata: bool,
        restriction: &Restriction,
        rules: &ExcludeRules,
    ) -> FilterDecision {
        PathFilter::new(Utf8Path::new(ROOT), restriction, rules)
            .should_include(Utf8Path::new(path), metadata)
    }

    #[test]
    fn test_non_metadata_tree_always_included() {
        let rules = rules(&[("all", ".*", true)]);
        let restriction = Restriction::parse("10");
        let decision = decide("/opt/digiverso/goobi/config/a.xml", false, &restriction, &rules);
        assert!(decision.include);
        assert!(decision.message.is_none());
    }

    #[test]
    fn test_metadata_root_always_included() {
        let rules = rules(&[("all", ".*", true)]);
        let restriction = Restriction::parse("10");
        assert!(decide(ROOT, true, &restriction, &rules).include);
    }

    #[test]
    fn test_enabled_rule_excludes_with_warning() {
        let rules = rules(&[("tifs", r".*\.tif", true)]);
        let decision = decide(
            &format!("{ROOT}/1/images/a.tif"),
            true,
            &Restriction::disabled(),
            &rules,
        );
        assert!(!decision.include);
        assert_eq!(decision.message.unwrap().severity, Severity::Warning);
    }

    #[test]
    fn test_disabled_rule_is_skipped() {
        let rules = rules(&[("tifs", r".*\.tif", false)]);
        let decision = decide(
            &format!("{ROOT}/1/a.tif"),
            true,
            &Restriction::disabled(),
            &rules,
        );
        assert!(decision.include);
        assert_eq!(decision.message.unwrap().severity, Severity::Ok);
    }

    #[test]
    fn test_rules_match_full_string_only() {
        let rules = rules(&[("tif", "tif", true)]);
        let decision = decide(
            &format!("{ROOT}/1/a.tif"),
            true,
            &Restriction::disabled(),
            &rules,
        );
        assert!(decision.include, "substring match must not exclude");
    }

    #[test]
    fn test_later_rule_excludes() {
        let rules = rules(&[("xml", r".*\.xml", true), ("tifs", r".*\.tif", true)]);
        let decision = decide(
            &format!("{ROOT}/1/a.tif"),
            true,
            &Restriction::disabled(),
            &rules,
        );
        assert!(!decision.include);
        assert!(decision.message.unwrap().text.contains("tifs"));
    }

    #[test]
    fn test_restriction_excludes_unlisted_ids_silently() {
        let rules = ExcludeRules::default();
        let restriction = Restriction::parse("10,15");
        let decision = decide(&format!("{ROOT}/11/meta.xml"), true, &restriction, &rules);
        assert!(!decision.include);
        assert!(decision.message.is_none());

        assert!(decide(&format!("{ROOT}/10"), true, &restriction, &rules).include);
        assert!(decide(&format!("{ROOT}/15/meta.xml"), true, &restriction, &rules).include);
    }

    #[test]
    fn test_restriction_matches_whole_components() {
        let restriction = Restriction::parse("10");
        let rules = ExcludeRules::default();
        assert!(!decide(&format!("{ROOT}/100/meta.xml"), true, &restriction, &rules).include);
    }

    #[test]
    fn test_restriction_decides_against_rules() {
        // No rule would exclude 11, yet the restriction does.
        let none = rules(&[("tifs", r".*\.tif", true)]);
        let restriction = Restriction::parse("10");
        assert!(decide(&format!("{ROOT}/11/a.xml"), true, &Restriction::disabled(), &none).include);
        assert!(!decide(&format!("{ROOT}/11/a.xml"), true, &restriction, &none).include);

        // A rule matching everything still excludes inside an allowed id.
        let all = rules(&[("all", ".*", true)]);
        assert!(!decide(&format!("{ROOT}/10/x"), true, &restriction, &all).include);
    }

    #[test]
    fn test_ids_must_be_single_folder_names() {
        assert!(Restriction::is_valid_id("10"));
        assert!(!Restriction::is_valid_id("."));
        assert!(!Restriction::is_valid_id(".."));
        assert!(!Restriction::is_valid_id("10/11"));
        assert!(!Restriction::is_valid_id("/10"));
        assert!(!Restriction::is_valid_id(""));

        let restriction = Restriction::parse("., 10/11, 15");
        assert_eq!(restriction.allowed_ids.len(), 1);
        assert!(restriction.allowed_ids.contains("15"));

        let rules = ExcludeRules::default();
        assert!(!decide(&format!("{ROOT}/11/a.xml"), true, &restriction, &rules).include);
        assert!(!decide(&format!("{ROOT}/10/11/a.xml"), true, &restriction, &rules).include);
    }

    #[test]
    fn test_disabled_or_empty_restriction_is_inactive() {
        let mut restriction = Restriction::parse("10");
        restriction.enabled = false;
        assert!(!restriction.is_active());
        assert!(!Restriction::parse(" , ").is_active());

        let rules = ExcludeRules::default();
        assert!(decide(&format!("{ROOT}/11/a.xml"), true, &restriction, &rules).include);
    }

    #[test]
    fn test_invalid_pattern_is_config_error() {
        let err = ExcludeRules::compile(&[ExcludeRule::new("broken", "a)(b", true)]).unwrap_err();
        assert!(err.is_config_error());
    }

    #[test]
    fn test_set_enabled_by_label() {
        let mut rules = rules(&[("tifs", r".*\.tif", false)]);
        assert!(rules.first_match("/x/a.tif").is_none());
        assert!(rules.set_enabled("tifs", true));
        assert!(rules.first_match("/x/a.tif").is_some());
        assert!(!rules.set_enabled("unknown", true));
    }

    #[test]
    fn test_entry_name() {
        assert_eq!(entry_name("", "a.xml"), "a.xml");
        assert_eq!(entry_name("metadata", "10"), "metadata/10");
        assert_eq!(entry_name("/metadata/", "10/a.xml"), "metadata/10/a.xml");
    }
}
