//! XML-060..069: document-hygiene rules, built from the shared [`crate::rules::context::DocumentScan`].
//!
//! The disallowed-construct checks (060, 061, 063-066) are global booleans —
//! the scan records whether the construct appears anywhere in the document,
//! not which element carries it, so these findings report without a specific
//! location.

use std::collections::BTreeMap;

use crate::rules::context::ValidationContext;
use crate::rules::registry::{RuleOutput, RuleRegistry};

fn flag_if(condition: bool) -> RuleOutput {
    if condition {
        vec![(None, BTreeMap::new())]
    } else {
        Vec::new()
    }
}

fn check_xml_base(ctx: &ValidationContext<'_>) -> RuleOutput {
    flag_if(ctx.document_scan().has_xml_base)
}

fn check_linkbase_ref(ctx: &ValidationContext<'_>) -> RuleOutput {
    flag_if(ctx.document_scan().has_linkbase_ref)
}

fn check_forever(ctx: &ValidationContext<'_>) -> RuleOutput {
    flag_if(ctx.document_scan().has_forever)
}

fn check_schema_location(ctx: &ValidationContext<'_>) -> RuleOutput {
    flag_if(ctx.document_scan().has_schema_location)
}

fn check_no_namespace_schema_location(ctx: &ValidationContext<'_>) -> RuleOutput {
    flag_if(ctx.document_scan().has_no_namespace_schema_location)
}

fn check_xi_include(ctx: &ValidationContext<'_>) -> RuleOutput {
    flag_if(ctx.document_scan().has_xi_include)
}

fn check_standalone(ctx: &ValidationContext<'_>) -> RuleOutput {
    flag_if(ctx.document_scan().has_standalone)
}

fn check_unused_contexts(ctx: &ValidationContext<'_>) -> RuleOutput {
    ctx.document_scan()
        .unused_contexts
        .iter()
        .map(|id| {
            let mut dict = BTreeMap::new();
            dict.insert("context".to_string(), id.clone());
            (Some(id.clone()), dict)
        })
        .collect()
}

fn check_duplicate_contexts(ctx: &ValidationContext<'_>) -> RuleOutput {
    ctx.document_scan()
        .duplicate_contexts
        .iter()
        .map(|(id, original)| {
            let mut dict = BTreeMap::new();
            dict.insert("context".to_string(), id.clone());
            dict.insert("original".to_string(), original.clone());
            (Some(id.clone()), dict)
        })
        .collect()
}

fn check_unused_units(ctx: &ValidationContext<'_>) -> RuleOutput {
    ctx.document_scan()
        .unused_units
        .iter()
        .map(|id| {
            let mut dict = BTreeMap::new();
            dict.insert("unit".to_string(), id.clone());
            (Some(id.clone()), dict)
        })
        .collect()
}

pub fn register(registry: &mut RuleRegistry) {
    registry.register("XML-060", None, check_xml_base);
    registry.register("XML-061", None, check_linkbase_ref);
    registry.register("XML-062", None, check_forever);
    registry.register("XML-063", None, check_schema_location);
    registry.register("XML-064", None, check_no_namespace_schema_location);
    registry.register("XML-065", None, check_xi_include);
    registry.register("XML-066", None, check_standalone);
    registry.register("XML-067", None, check_unused_contexts);
    registry.register("XML-068", None, check_duplicate_contexts);
    registry.register("XML-069", None, check_unused_units);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_xml_base_presence() {
        let ctx = ValidationContext::new(b"<xbrl xml:base=\"http://x\"/>");
        assert_eq!(check_xml_base(&ctx).len(), 1);
    }

    #[test]
    fn no_findings_on_clean_document() {
        let ctx = ValidationContext::new(b"<xbrl></xbrl>");
        assert!(check_xml_base(&ctx).is_empty());
        assert!(check_linkbase_ref(&ctx).is_empty());
        assert!(check_forever(&ctx).is_empty());
        assert!(check_standalone(&ctx).is_empty());
    }
}
