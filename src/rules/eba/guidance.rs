//! EBA-GUIDE-001..007: namespace hygiene and fact-content style guidance.

use std::collections::BTreeMap;

use regex::Regex;

use crate::rules::context::{canonical_prefix_for, ValidationContext};
use crate::rules::registry::{RuleOutput, RuleRegistry};

fn check_unused_prefixes(ctx: &ValidationContext<'_>) -> RuleOutput {
    let scan = ctx.namespace_scan();
    scan.bindings
        .keys()
        .filter(|prefix| !scan.used_prefixes.contains(prefix))
        .map(|prefix| {
            let mut dict = BTreeMap::new();
            dict.insert("prefix".to_string(), prefix.clone());
            (None, dict)
        })
        .collect()
}

fn check_non_canonical_prefix(ctx: &ValidationContext<'_>) -> RuleOutput {
    let scan = ctx.namespace_scan();
    scan.bindings
        .iter()
        .filter_map(|(prefix, uri)| {
            let canonical = canonical_prefix_for(uri)?;
            if canonical == prefix {
                return None;
            }
            let mut dict = BTreeMap::new();
            dict.insert("uri".to_string(), uri.clone());
            dict.insert("prefix".to_string(), prefix.clone());
            Some((None, dict))
        })
        .collect()
}

fn fact_id_regex() -> Regex {
    Regex::new(r#"<([\w.:-]+)((?:\s+[\w.:-]+\s*=\s*"[^"]*")*)\s*/?>"#).expect("valid regex")
}

/// Heuristic raw-text scan: a fact's `@id` attribute isn't retained by the
/// typed [`crate::xml::Fact`] model, which only keeps what conversion needs.
fn check_discourages_fact_id(ctx: &ValidationContext<'_>) -> RuleOutput {
    if ctx.instance.is_none() {
        return Vec::new();
    }
    let text = String::from_utf8_lossy(ctx.raw_bytes);
    fact_id_regex()
        .captures_iter(&text)
        .filter(|c| c[2].contains("contextRef") && c[2].contains(" id="))
        .map(|c| {
            let mut dict = BTreeMap::new();
            dict.insert("fact".to_string(), c[1].to_string());
            (Some(c[1].to_string()), dict)
        })
        .collect()
}

fn check_string_fact_length(ctx: &ValidationContext<'_>) -> RuleOutput {
    let Some(instance) = ctx.instance else {
        return Vec::new();
    };
    instance
        .facts
        .iter()
        .filter(|f| f.unit_id.is_none() && f.value.chars().count() > 10_000)
        .map(|f| {
            let mut dict = BTreeMap::new();
            dict.insert("fact".to_string(), f.element_qname.clone());
            dict.insert("length".to_string(), f.value.chars().count().to_string());
            (Some(f.element_qname.clone()), dict)
        })
        .collect()
}

fn redeclare_regex() -> Regex {
    Regex::new(r#"<([\w.:-]+)[^>]*\bxmlns:([\w.-]+)\s*=\s*"([^"]*)""#).expect("valid regex")
}

/// Heuristic raw-text scan: flags a non-root element redeclaring a prefix
/// already bound to the same URI at the document root.
fn check_redundant_redeclaration(ctx: &ValidationContext<'_>) -> RuleOutput {
    let Some(root_namespaces) = ctx.root_namespaces else {
        return Vec::new();
    };
    let text = String::from_utf8_lossy(ctx.raw_bytes);
    let mut findings = Vec::new();
    let mut seen_first = false;
    for m in redeclare_regex().captures_iter(&text) {
        if !seen_first {
            // The first match set is the root element's own declarations.
            seen_first = true;
            continue;
        }
        let element = &m[1];
        let prefix = &m[2];
        let uri = &m[3];
        if root_namespaces.bindings.get(prefix).map(String::as_str) == Some(uri) {
            let mut dict = BTreeMap::new();
            dict.insert("element".to_string(), element.to_string());
            dict.insert("uri".to_string(), uri.to_string());
            findings.push((Some(element.to_string()), dict));
        }
    }
    findings
}

fn check_shared_uri_multiple_prefixes(ctx: &ValidationContext<'_>) -> RuleOutput {
    ctx.namespace_scan()
        .uri_to_prefixes
        .iter()
        .filter(|(_, prefixes)| prefixes.len() > 1)
        .map(|(uri, prefixes)| {
            let mut dict = BTreeMap::new();
            dict.insert("uri".to_string(), uri.clone());
            dict.insert("prefixes".to_string(), prefixes.join(", "));
            (None, dict)
        })
        .collect()
}

fn check_fact_value_whitespace(ctx: &ValidationContext<'_>) -> RuleOutput {
    let Some(instance) = ctx.instance else {
        return Vec::new();
    };
    instance
        .facts
        .iter()
        .filter(|f| f.value != f.value.trim())
        .map(|f| {
            let mut dict = BTreeMap::new();
            dict.insert("fact".to_string(), f.element_qname.clone());
            (Some(f.element_qname.clone()), dict)
        })
        .collect()
}

pub fn register(registry: &mut RuleRegistry) {
    registry.register("EBA-GUIDE-001", None, check_unused_prefixes);
    registry.register("EBA-GUIDE-002", None, check_non_canonical_prefix);
    registry.register("EBA-GUIDE-003", None, check_discourages_fact_id);
    registry.register("EBA-GUIDE-004", None, check_string_fact_length);
    registry.register("EBA-GUIDE-005", None, check_redundant_redeclaration);
    registry.register("EBA-GUIDE-006", None, check_shared_uri_multiple_prefixes);
    registry.register("EBA-GUIDE-007", None, check_fact_value_whitespace);
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;

    fn instance_with_string_fact(value: &str) -> crate::xml::Instance {
        crate::xml::Instance {
            schema_ref: String::new(),
            contexts: IndexMap::new(),
            units: IndexMap::new(),
            facts: vec![crate::xml::Fact {
                element_qname: "eba_met:s1".to_string(),
                context_id: "c1".to_string(),
                unit_id: None,
                decimals: None,
                value: value.to_string(),
            }],
            filing_indicators: vec![],
        }
    }

    #[test]
    fn flags_whitespace_padded_value() {
        let instance = instance_with_string_fact("  padded ");
        let mut ctx = ValidationContext::new(b"");
        ctx.instance = Some(&instance);
        assert_eq!(check_fact_value_whitespace(&ctx).len(), 1);
    }

    #[test]
    fn flags_overlong_string_fact() {
        let instance = instance_with_string_fact(&"a".repeat(10_001));
        let mut ctx = ValidationContext::new(b"");
        ctx.instance = Some(&instance);
        assert_eq!(check_string_fact_length(&ctx).len(), 1);
    }

    #[test]
    fn flags_non_canonical_prefix_for_instance_namespace() {
        use crate::xml::RootNamespaces;
        let mut bindings = BTreeMap::new();
        bindings.insert("x".to_string(), "http://www.xbrl.org/2003/instance".to_string());
        let root_namespaces = RootNamespaces { bindings };
        let mut ctx = ValidationContext::new(b"");
        ctx.root_namespaces = Some(&root_namespaces);
        assert_eq!(check_non_canonical_prefix(&ctx).len(), 1);
    }
}
