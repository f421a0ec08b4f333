//! EBA-CUR-001..003: single-currency reporting and currency-of-denomination consistency.

use std::collections::{BTreeMap, BTreeSet};

use crate::rules::context::ValidationContext;
use crate::rules::registry::{RuleOutput, RuleRegistry};
use crate::xml::{DimensionValue, UnitExpr};

/// Dimension values marking a fact as "currency of denomination" rather than
/// the filer's reporting currency — hard-coded per EBA filing-indicator
/// guidance, since the loaded module carries no such marker.
const DENOMINATION_DIMENSION_VALUES: &[&str] = &["eba_CA:x1", "eba_qCA:qx2000"];

fn unit_currency(expr: &UnitExpr) -> Option<&str> {
    match expr {
        UnitExpr::Simple(measures) if measures.len() == 1 => {
            measures[0].strip_prefix("iso4217:")
        }
        _ => None,
    }
}

fn is_denomination_fact(dims: &BTreeMap<String, DimensionValue>) -> bool {
    dims.values().any(|v| match v {
        DimensionValue::Explicit(m) => DENOMINATION_DIMENSION_VALUES.contains(&m.as_str()),
        DimensionValue::Typed(_) => false,
    })
}

fn check_single_currency(ctx: &ValidationContext<'_>) -> RuleOutput {
    let Some(instance) = ctx.instance else {
        return Vec::new();
    };
    let mut currencies = BTreeSet::new();
    for fact in &instance.facts {
        let Some(unit_id) = &fact.unit_id else { continue };
        let Some(unit) = instance.units.get(unit_id) else { continue };
        let Some(context) = instance.contexts.get(&fact.context_id) else { continue };
        if is_denomination_fact(&context.scenario.dimensions) {
            continue;
        }
        if let Some(currency) = unit_currency(&unit.expr) {
            currencies.insert(currency.to_string());
        }
    }
    if currencies.len() <= 1 {
        return Vec::new();
    }
    let mut dict = BTreeMap::new();
    dict.insert("currencies".to_string(), currencies.into_iter().collect::<Vec<_>>().join(", "));
    vec![(None, dict)]
}

fn check_denomination_has_monetary_unit(ctx: &ValidationContext<'_>) -> RuleOutput {
    let Some(instance) = ctx.instance else {
        return Vec::new();
    };
    let mut findings = Vec::new();
    for fact in &instance.facts {
        let Some(context) = instance.contexts.get(&fact.context_id) else { continue };
        if !is_denomination_fact(&context.scenario.dimensions) {
            continue;
        }
        let has_monetary_unit = fact
            .unit_id
            .as_ref()
            .and_then(|id| instance.units.get(id))
            .and_then(|u| unit_currency(&u.expr))
            .is_some();
        if !has_monetary_unit {
            let mut dict = BTreeMap::new();
            dict.insert("fact".to_string(), fact.element_qname.clone());
            findings.push((Some(fact.element_qname.clone()), dict));
        }
    }
    findings
}

/// Dimension local-names whose explicit member may encode an ISO 4217
/// currency as its trailing path segment, e.g. `eba_CU:EUR`.
const CURRENCY_ENCODING_DIMENSIONS: &[&str] = &["CUS", "CUA"];

fn check_encoded_currency_matches_unit(ctx: &ValidationContext<'_>) -> RuleOutput {
    let Some(instance) = ctx.instance else {
        return Vec::new();
    };
    let mut findings = Vec::new();
    for fact in &instance.facts {
        let Some(context) = instance.contexts.get(&fact.context_id) else { continue };
        let Some(unit_id) = &fact.unit_id else { continue };
        let Some(unit) = instance.units.get(unit_id) else { continue };
        let Some(unit_currency) = unit_currency(&unit.expr) else { continue };
        for (dim, value) in &context.scenario.dimensions {
            let dim_local = dim.rsplit_once(':').map_or(dim.as_str(), |(_, l)| l);
            if !CURRENCY_ENCODING_DIMENSIONS.contains(&dim_local) {
                continue;
            }
            let DimensionValue::Explicit(member) = value else { continue };
            let Some((_, encoded)) = member.rsplit_once(':') else { continue };
            if encoded.len() == 3 && encoded.chars().all(|c| c.is_ascii_uppercase()) && encoded != unit_currency {
                let mut dict = BTreeMap::new();
                dict.insert("dimension_value".to_string(), member.clone());
                dict.insert("encoded".to_string(), encoded.to_string());
                dict.insert("unit_currency".to_string(), unit_currency.to_string());
                findings.push((Some(fact.element_qname.clone()), dict));
            }
        }
    }
    findings
}

pub fn register(registry: &mut RuleRegistry) {
    registry.register("EBA-CUR-001", None, check_single_currency);
    registry.register("EBA-CUR-002", None, check_denomination_has_monetary_unit);
    registry.register("EBA-CUR-003", None, check_encoded_currency_matches_unit);
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use indexmap::IndexMap;

    fn context(id: &str, dims: BTreeMap<String, DimensionValue>) -> crate::xml::Context {
        crate::xml::Context {
            id: id.to_string(),
            entity_identifier: ("scheme".to_string(), "e1".to_string()),
            instant: NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
            scenario: crate::xml::Scenario { dimensions: dims },
        }
    }

    fn instance_with_currencies(currencies: &[&str]) -> crate::xml::Instance {
        let mut contexts = IndexMap::new();
        contexts.insert("c1".to_string(), context("c1", BTreeMap::new()));
        let mut units = IndexMap::new();
        let mut facts = Vec::new();
        for (i, currency) in currencies.iter().enumerate() {
            let unit_id = format!("u{i}");
            units.insert(
                unit_id.clone(),
                crate::xml::Unit {
                    id: unit_id.clone(),
                    expr: UnitExpr::Simple(vec![format!("iso4217:{currency}")]),
                },
            );
            facts.push(crate::xml::Fact {
                element_qname: format!("eba_met:f{i}"),
                context_id: "c1".to_string(),
                unit_id: Some(unit_id),
                decimals: Some(crate::xml::Decimals::Value(2)),
                value: "1".to_string(),
            });
        }
        crate::xml::Instance {
            schema_ref: String::new(),
            contexts,
            units,
            facts,
            filing_indicators: vec![],
        }
    }

    #[test]
    fn flags_multiple_currencies() {
        let instance = instance_with_currencies(&["EUR", "USD"]);
        let mut ctx = ValidationContext::new(b"");
        ctx.instance = Some(&instance);
        assert_eq!(check_single_currency(&ctx).len(), 1);
    }

    #[test]
    fn accepts_single_currency() {
        let instance = instance_with_currencies(&["EUR", "EUR"]);
        let mut ctx = ValidationContext::new(b"");
        ctx.instance = Some(&instance);
        assert!(check_single_currency(&ctx).is_empty());
    }

    #[test]
    fn flags_denomination_fact_without_monetary_unit() {
        let mut dims = BTreeMap::new();
        dims.insert("CCA".to_string(), DimensionValue::Explicit("eba_CA:x1".to_string()));
        let mut contexts = IndexMap::new();
        contexts.insert("c1".to_string(), context("c1", dims));
        let instance = crate::xml::Instance {
            schema_ref: String::new(),
            contexts,
            units: IndexMap::new(),
            facts: vec![crate::xml::Fact {
                element_qname: "eba_met:f1".to_string(),
                context_id: "c1".to_string(),
                unit_id: None,
                decimals: None,
                value: "USD".to_string(),
            }],
            filing_indicators: vec![],
        };
        let mut ctx = ValidationContext::new(b"");
        ctx.instance = Some(&instance);
        assert_eq!(check_denomination_has_monetary_unit(&ctx).len(), 1);
    }
}
