//! EBA-2.5, EBA-2.16.1, EBA-2.24, EBA-2.25: miscellaneous EBA filing-rules document clauses.

use std::collections::{BTreeMap, BTreeSet};

use crate::rules::context::ValidationContext;
use crate::rules::registry::{RuleOutput, RuleRegistry};
use crate::xml::UnitExpr;

fn local_name(qname: &str) -> &str {
    qname.rsplit_once(':').map_or(qname, |(_, l)| l)
}

fn check_no_comments(ctx: &ValidationContext<'_>) -> RuleOutput {
    if ctx.document_scan().comment_count > 0 {
        vec![(None, BTreeMap::new())]
    } else {
        Vec::new()
    }
}

fn check_concept_single_unit_per_context(ctx: &ValidationContext<'_>) -> RuleOutput {
    let Some(instance) = ctx.instance else {
        return Vec::new();
    };
    let mut units_seen: BTreeMap<(String, String), BTreeSet<String>> = BTreeMap::new();
    for fact in &instance.facts {
        let Some(unit_id) = &fact.unit_id else { continue };
        units_seen
            .entry((local_name(&fact.element_qname).to_string(), fact.context_id.clone()))
            .or_default()
            .insert(unit_id.clone());
    }
    units_seen
        .into_iter()
        .filter(|(_, units)| units.len() > 1)
        .map(|((concept, context), units)| {
            let mut dict = BTreeMap::new();
            dict.insert("concept".to_string(), concept);
            dict.insert("context".to_string(), context.clone());
            dict.insert("units".to_string(), units.into_iter().collect::<Vec<_>>().join(", "));
            (Some(context), dict)
        })
        .collect()
}

fn is_basic_unscaled_iso4217(expr: &UnitExpr) -> bool {
    matches!(expr, UnitExpr::Simple(measures) if measures.len() == 1 && measures[0].starts_with("iso4217:"))
}

fn mentions_iso4217(expr: &UnitExpr) -> bool {
    match expr {
        UnitExpr::Simple(measures) => measures.iter().any(|m| m.starts_with("iso4217:")),
        UnitExpr::Divide { numerator, denominator } => {
            numerator.iter().chain(denominator).any(|m| m.starts_with("iso4217:"))
        }
    }
}

fn check_monetary_units_basic(ctx: &ValidationContext<'_>) -> RuleOutput {
    let Some(instance) = ctx.instance else {
        return Vec::new();
    };
    instance
        .units
        .values()
        .filter(|unit| mentions_iso4217(&unit.expr) && !is_basic_unscaled_iso4217(&unit.expr))
        .map(|unit| {
            let mut dict = BTreeMap::new();
            dict.insert("unit".to_string(), unit.id.clone());
            (Some(unit.id.clone()), dict)
        })
        .collect()
}

fn check_no_footnote_links(ctx: &ValidationContext<'_>) -> RuleOutput {
    if ctx.document_scan().footnote_link_count > 0 {
        vec![(None, BTreeMap::new())]
    } else {
        Vec::new()
    }
}

pub fn register(registry: &mut RuleRegistry) {
    registry.register("EBA-2.5", None, check_no_comments);
    registry.register("EBA-2.16.1", None, check_concept_single_unit_per_context);
    registry.register("EBA-2.24", None, check_monetary_units_basic);
    registry.register("EBA-2.25", None, check_no_footnote_links);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_xml_comment() {
        let ctx = ValidationContext::new(b"<xbrl><!-- note --></xbrl>");
        assert_eq!(check_no_comments(&ctx).len(), 1);
    }

    #[test]
    fn flags_footnote_link() {
        let ctx = ValidationContext::new(b"<link:footnoteLink/>");
        assert_eq!(check_no_footnote_links(&ctx).len(), 1);
    }

    #[test]
    fn flags_divide_monetary_unit() {
        let unit = crate::xml::Unit {
            id: "u1".to_string(),
            expr: UnitExpr::Divide {
                numerator: vec!["iso4217:EUR".to_string()],
                denominator: vec!["xbrli:shares".to_string()],
            },
        };
        assert!(mentions_iso4217(&unit.expr));
        assert!(!is_basic_unscaled_iso4217(&unit.expr));
    }
}
