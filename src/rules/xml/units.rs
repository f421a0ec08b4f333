//! XML-050: unit measures must come from a UTR-recognised namespace.

use std::collections::BTreeMap;

use crate::rules::context::ValidationContext;
use crate::rules::registry::{RuleOutput, RuleRegistry};
use crate::xml::UnitExpr;

/// Namespaces the EBA Unit Type Registry recognises for measure QNames.
/// `xbrli:pure` and `xbrli:shares` live in the core instance namespace;
/// everything else comes from the ISO 4217 currency namespace or the UTR
/// itself.
const RECOGNISED_NAMESPACE_PREFIXES: &[&str] = &["iso4217", "xbrli", "utr"];

fn measure_prefix(measure: &str) -> &str {
    measure.split_once(':').map_or("", |(prefix, _)| prefix)
}

fn check(ctx: &ValidationContext<'_>) -> RuleOutput {
    let Some(instance) = ctx.instance else {
        return Vec::new();
    };
    let mut findings = Vec::new();
    for unit in instance.units.values() {
        let measures: Vec<&String> = match &unit.expr {
            UnitExpr::Simple(m) => m.iter().collect(),
            UnitExpr::Divide { numerator, denominator } => numerator.iter().chain(denominator).collect(),
        };
        for measure in measures {
            let prefix = measure_prefix(measure);
            if !RECOGNISED_NAMESPACE_PREFIXES.contains(&prefix) {
                let mut dict = BTreeMap::new();
                dict.insert("unit".to_string(), unit.id.clone());
                dict.insert("measure".to_string(), measure.clone());
                findings.push((Some(unit.id.clone()), dict));
            }
        }
    }
    findings
}

pub fn register(registry: &mut RuleRegistry) {
    registry.register("XML-050", None, check);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml::Unit;
    use indexmap::IndexMap;

    fn instance_with_unit(expr: UnitExpr) -> crate::xml::Instance {
        let mut units = IndexMap::new();
        units.insert(
            "u1".to_string(),
            Unit {
                id: "u1".to_string(),
                expr,
            },
        );
        crate::xml::Instance {
            schema_ref: String::new(),
            contexts: IndexMap::new(),
            units,
            facts: vec![],
            filing_indicators: vec![],
        }
    }

    #[test]
    fn accepts_iso4217_measure() {
        let instance = instance_with_unit(UnitExpr::Simple(vec!["iso4217:EUR".to_string()]));
        let mut ctx = ValidationContext::new(b"");
        ctx.instance = Some(&instance);
        assert!(check(&ctx).is_empty());
    }

    #[test]
    fn flags_unrecognised_measure_namespace() {
        let instance = instance_with_unit(UnitExpr::Simple(vec!["foo:bar".to_string()]));
        let mut ctx = ValidationContext::new(b"");
        ctx.instance = Some(&instance);
        assert_eq!(check(&ctx).len(), 1);
    }
}
