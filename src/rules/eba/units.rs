//! EBA-UNIT-001/002: non-monetary facts should use `xbrli:pure`, and
//! suspiciously large pure-unit values likely belong in percentage notation.

use std::collections::BTreeMap;

use crate::rules::context::ValidationContext;
use crate::rules::registry::{RuleOutput, RuleRegistry};
use crate::xml::UnitExpr;

fn simple_measure(expr: &UnitExpr) -> Option<&str> {
    match expr {
        UnitExpr::Simple(measures) if measures.len() == 1 => Some(measures[0].as_str()),
        _ => None,
    }
}

fn check_non_monetary_uses_pure(ctx: &ValidationContext<'_>) -> RuleOutput {
    let Some(instance) = ctx.instance else {
        return Vec::new();
    };
    let mut findings = Vec::new();
    for fact in &instance.facts {
        let Some(unit_id) = &fact.unit_id else { continue };
        let Some(unit) = instance.units.get(unit_id) else { continue };
        let Some(measure) = simple_measure(&unit.expr) else { continue };
        if measure.starts_with("iso4217:") || measure == "xbrli:pure" {
            continue;
        }
        let mut dict = BTreeMap::new();
        dict.insert("fact".to_string(), fact.element_qname.clone());
        findings.push((Some(fact.element_qname.clone()), dict));
    }
    findings
}

fn check_pure_value_magnitude(ctx: &ValidationContext<'_>) -> RuleOutput {
    let Some(instance) = ctx.instance else {
        return Vec::new();
    };
    let mut findings = Vec::new();
    for fact in &instance.facts {
        let Some(unit_id) = &fact.unit_id else { continue };
        let Some(unit) = instance.units.get(unit_id) else { continue };
        if simple_measure(&unit.expr) != Some("xbrli:pure") {
            continue;
        }
        let Ok(value) = fact.value.trim().parse::<f64>() else { continue };
        if value.abs() > 50.0 {
            let mut dict = BTreeMap::new();
            dict.insert("fact".to_string(), fact.element_qname.clone());
            dict.insert("value".to_string(), fact.value.clone());
            findings.push((Some(fact.element_qname.clone()), dict));
        }
    }
    findings
}

pub fn register(registry: &mut RuleRegistry) {
    registry.register("EBA-UNIT-001", None, check_non_monetary_uses_pure);
    registry.register("EBA-UNIT-002", None, check_pure_value_magnitude);
}
