//! The embedded rule catalog: one JSON document listing every rule's code,
//! message template, severity, and applicability flags.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::rules::finding::Severity;

const CATALOG_JSON: &str = include_str!("catalog.json");

/// One entry of the rule catalog.
#[derive(Debug, Clone, Deserialize)]
pub struct RuleDefinition {
    /// The rule's stable code, e.g. `"XML-030"`.
    pub code: String,
    /// A message template with `{named}` placeholders, substituted
    /// defensively (a missing placeholder renders as the literal `{name}`).
    pub message: String,
    #[serde(default)]
    severity: CatalogSeverity,
    /// Overrides [`Self::severity`] when the rule runs against a CSV package.
    #[serde(default)]
    pub csv_severity: Option<CatalogSeverity>,
    /// Overrides [`Self::message`] when the rule runs against a CSV package.
    #[serde(default)]
    pub csv_message: Option<String>,
    /// Applies to XBRL-XML instances.
    #[serde(default)]
    pub xml: bool,
    /// Applies to XBRL-CSV packages.
    #[serde(default)]
    pub csv: bool,
    /// Only runs when the caller requested EBA-taxonomy mode.
    #[serde(default)]
    pub eba: bool,
    /// Only runs for post-conversion (CSV-package) validation.
    #[serde(default)]
    pub post_conversion: bool,
    /// An optional reference to the EBA filing-rules document this rule enforces.
    #[serde(default)]
    pub eba_ref: Option<String>,
}

impl RuleDefinition {
    /// The severity to use for the given rule set (xml vs. csv override).
    #[must_use]
    pub fn severity_for(&self, rule_set: crate::rules::finding::RuleSet) -> Severity {
        if matches!(rule_set, crate::rules::finding::RuleSet::Csv) {
            if let Some(severity) = self.csv_severity {
                return severity.into();
            }
        }
        self.severity.into()
    }

    /// The message template to use for the given rule set (xml vs. csv override).
    #[must_use]
    pub fn message_for(&self, rule_set: crate::rules::finding::RuleSet) -> &str {
        if matches!(rule_set, crate::rules::finding::RuleSet::Csv) {
            if let Some(message) = &self.csv_message {
                return message;
            }
        }
        &self.message
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
enum CatalogSeverity {
    #[default]
    Warning,
    Error,
}

impl From<CatalogSeverity> for Severity {
    fn from(value: CatalogSeverity) -> Self {
        match value {
            CatalogSeverity::Warning => Self::Warning,
            CatalogSeverity::Error => Self::Error,
        }
    }
}

/// The full ordered rule catalog, loaded once from the embedded JSON.
#[derive(Debug, Clone)]
pub struct RuleCatalog {
    /// Rule definitions in catalog (execution) order.
    pub definitions: Vec<RuleDefinition>,
}

impl RuleCatalog {
    /// Parses the embedded catalog JSON.
    ///
    /// # Panics
    ///
    /// Panics if the embedded catalog is malformed — this would be a build
    /// defect, not a runtime condition a caller can recover from.
    #[must_use]
    pub fn embedded() -> Self {
        let definitions: Vec<RuleDefinition> =
            serde_json::from_str(CATALOG_JSON).expect("embedded rule catalog is valid JSON");
        Self { definitions }
    }

    /// Looks up a definition by code.
    #[must_use]
    pub fn get(&self, code: &str) -> Option<&RuleDefinition> {
        self.definitions.iter().find(|d| d.code == code)
    }
}

/// Renders a message template against a context dict, substituting `{name}`
/// placeholders. A placeholder with no matching key is left verbatim —
/// message rendering is never allowed to fail a rule invocation.
#[must_use]
pub fn render_template(template: &str, context: &BTreeMap<String, String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '{' {
            let mut name = String::new();
            let mut closed = false;
            for c2 in chars.by_ref() {
                if c2 == '}' {
                    closed = true;
                    break;
                }
                name.push(c2);
            }
            if closed {
                match context.get(&name) {
                    Some(value) => out.push_str(value),
                    None => {
                        out.push('{');
                        out.push_str(&name);
                        out.push('}');
                    }
                }
            } else {
                out.push('{');
                out.push_str(&name);
            }
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_catalog_parses_and_is_non_empty() {
        let catalog = RuleCatalog::embedded();
        assert!(!catalog.definitions.is_empty());
        assert!(catalog.get("XML-030").is_some());
    }

    #[test]
    fn renders_known_placeholders() {
        let mut ctx = BTreeMap::new();
        ctx.insert("context".to_string(), "c1".to_string());
        let rendered = render_template("context '{context}' is bad", &ctx);
        assert_eq!(rendered, "context 'c1' is bad");
    }

    #[test]
    fn missing_placeholder_renders_literally() {
        let ctx = BTreeMap::new();
        let rendered = render_template("value is {missing}", &ctx);
        assert_eq!(rendered, "value is {missing}");
    }
}
