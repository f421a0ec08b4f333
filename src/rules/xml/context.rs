//! XML-030..035: context structural rules.
//!
//! XML-030 (invalid instant date) and XML-031 (duration period) are already
//! enforced as fatal parse failures by [`crate::xml::parse_instance`] — a
//! successfully parsed instance can never violate them, so these two are
//! registered for catalog completeness but only ever see the condition
//! indirectly, through XML-001's wrapped parse-failure reason.

use std::collections::BTreeMap;

use regex::Regex;

use crate::rules::context::ValidationContext;
use crate::rules::registry::{RuleOutput, RuleRegistry};

fn no_op(_ctx: &ValidationContext<'_>) -> RuleOutput {
    Vec::new()
}

fn check_single_reference_date(ctx: &ValidationContext<'_>) -> RuleOutput {
    let Some(instance) = ctx.instance else {
        return Vec::new();
    };
    let dates: std::collections::BTreeSet<String> = instance
        .contexts
        .values()
        .map(|c| c.instant.to_string())
        .collect();
    if dates.len() <= 1 {
        return Vec::new();
    }
    let mut dict = BTreeMap::new();
    dict.insert("dates".to_string(), dates.into_iter().collect::<Vec<_>>().join(", "));
    vec![(None, dict)]
}

fn check_single_entity_identifier(ctx: &ValidationContext<'_>) -> RuleOutput {
    let Some(instance) = ctx.instance else {
        return Vec::new();
    };
    let identifiers: std::collections::BTreeSet<String> = instance
        .contexts
        .values()
        .map(|c| format!("{}:{}", c.entity_identifier.0, c.entity_identifier.1))
        .collect();
    if identifiers.len() <= 1 {
        return Vec::new();
    }
    let mut dict = BTreeMap::new();
    dict.insert(
        "identifiers".to_string(),
        identifiers.into_iter().collect::<Vec<_>>().join(", "),
    );
    vec![(None, dict)]
}

fn scenario_block_regex() -> Regex {
    Regex::new(r"(?s)<[\w.-]*:?scenario[^>]*>(.*?)</[\w.-]*:?scenario>").expect("valid regex")
}

fn scenario_child_tag_regex() -> Regex {
    Regex::new(r"<([\w.-]*:?[\w.-]+)[ />]").expect("valid regex")
}

/// Heuristic raw-text scan: `scenario` may only contain `explicitMember` and
/// `typedMember` children. The typed data model discards anything else during
/// parsing, so this rule recovers the violation with a direct text scan
/// rather than from the parsed [`crate::xml::Scenario`].
fn check_scenario_children(ctx: &ValidationContext<'_>) -> RuleOutput {
    if ctx.instance.is_none() {
        return Vec::new();
    }
    let text = String::from_utf8_lossy(ctx.raw_bytes);
    let mut findings = Vec::new();
    for block in scenario_block_regex().captures_iter(&text) {
        let inner = &block[1];
        for tag in scenario_child_tag_regex().captures_iter(inner) {
            let name = tag[1].trim_end_matches('/');
            let local = name.rsplit_once(':').map_or(name, |(_, l)| l);
            if local != "explicitMember" && local != "typedMember" {
                let mut dict = BTreeMap::new();
                dict.insert("child".to_string(), name.to_string());
                dict.insert("context".to_string(), String::new());
                findings.push((None, dict));
            }
        }
    }
    findings
}

pub fn register(registry: &mut RuleRegistry) {
    registry.register("XML-030", None, no_op);
    registry.register("XML-031", None, no_op);
    registry.register("XML-032", None, check_single_reference_date);
    registry.register("XML-033", None, check_single_entity_identifier);
    registry.register("XML-034", None, no_op);
    registry.register("XML-035", None, check_scenario_children);
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use indexmap::IndexMap;

    fn context(id: &str, date: &str, entity: &str) -> crate::xml::Context {
        crate::xml::Context {
            id: id.to_string(),
            entity_identifier: ("scheme".to_string(), entity.to_string()),
            instant: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            scenario: crate::xml::Scenario::default(),
        }
    }

    #[test]
    fn flags_multiple_reference_dates() {
        let mut contexts = IndexMap::new();
        contexts.insert("c1".to_string(), context("c1", "2024-12-31", "e1"));
        contexts.insert("c2".to_string(), context("c2", "2023-12-31", "e1"));
        let instance = crate::xml::Instance {
            schema_ref: String::new(),
            contexts,
            units: IndexMap::new(),
            facts: vec![],
            filing_indicators: vec![],
        };
        let mut ctx = ValidationContext::new(b"");
        ctx.instance = Some(&instance);
        assert_eq!(check_single_reference_date(&ctx).len(), 1);
    }
}
