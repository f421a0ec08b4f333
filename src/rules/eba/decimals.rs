//! EBA-DEC-001..004: per-datatype `@decimals` accuracy floors.
//!
//! A fact's numeric type comes from the loaded module's `attributes` marker
//! when one is loaded; otherwise it falls back to inference from the unit
//! measure (`iso4217:*` → monetary, `xbrli:pure` → percentage). Integer and
//! decimal classification is only ever known through the module — there is
//! no unit-based fallback for it.

use std::collections::BTreeMap;

use eba_taxonomy::{Architecture, Module, NumericAttribute};

use crate::rules::context::ValidationContext;
use crate::rules::registry::{RuleOutput, RuleRegistry};
use crate::xml::{Decimals, Fact, Instance, UnitExpr};

/// Module URL path segments under which the monetary decimals floor relaxes
/// from -4 to -6.
const RELAXED_MONETARY_MODULES: &[&str] = &["/fws/fp/", "/fws/esg/", "/fws/pillar3/", "/fws/rem/"];

fn local_name(qname: &str) -> &str {
    qname.rsplit_once(':').map_or(qname, |(_, l)| l)
}

fn attribute_from_module(fact: &Fact, module: &Module) -> Option<NumericAttribute> {
    let concept = local_name(&fact.element_qname);
    for table in &module.tables {
        let found = match table.architecture {
            Architecture::Datapoints => table
                .variables
                .iter()
                .find(|v| v.datapoint_id == concept)
                .and_then(|v| v.attributes),
            Architecture::Headers => table
                .columns
                .iter()
                .find(|c| c.datapoint_id == concept)
                .and_then(|c| c.attributes),
        };
        if found.is_some() {
            return found;
        }
    }
    None
}

fn attribute_from_unit(fact: &Fact, instance: &Instance) -> Option<NumericAttribute> {
    let unit = instance.units.get(fact.unit_id.as_ref()?)?;
    match &unit.expr {
        UnitExpr::Simple(measures) if measures.len() == 1 => {
            if measures[0].starts_with("iso4217:") {
                Some(NumericAttribute::Monetary)
            } else if measures[0] == "xbrli:pure" {
                Some(NumericAttribute::Percentage)
            } else {
                None
            }
        }
        _ => None,
    }
}

fn classify(fact: &Fact, instance: &Instance, module: Option<&Module>) -> Option<NumericAttribute> {
    if fact.unit_id.is_none() {
        return None;
    }
    if let Some(module) = module {
        if let Some(attr) = attribute_from_module(fact, module) {
            return Some(attr);
        }
    }
    attribute_from_unit(fact, instance)
}

fn render_decimals(decimals: Decimals) -> String {
    match decimals {
        Decimals::Value(v) => v.to_string(),
        Decimals::Infinite => "INF".to_string(),
    }
}

fn monetary_minimum(module: Option<&Module>) -> i32 {
    let relaxed = module.is_some_and(|m| {
        RELAXED_MONETARY_MODULES.iter().any(|seg| m.url.contains(seg))
    });
    if relaxed {
        -6
    } else {
        -4
    }
}

fn check_monetary_floor(ctx: &ValidationContext<'_>) -> RuleOutput {
    let Some(instance) = ctx.instance else {
        return Vec::new();
    };
    let minimum = monetary_minimum(ctx.module);
    let mut findings = Vec::new();
    for fact in &instance.facts {
        if classify(fact, instance, ctx.module) != Some(NumericAttribute::Monetary) {
            continue;
        }
        if let Some(Decimals::Value(v)) = fact.decimals {
            if v < minimum {
                let mut dict = BTreeMap::new();
                dict.insert("fact".to_string(), fact.element_qname.clone());
                dict.insert("value".to_string(), v.to_string());
                dict.insert("minimum".to_string(), minimum.to_string());
                findings.push((Some(fact.element_qname.clone()), dict));
            }
        }
    }
    findings
}

fn check_percentage_floor(ctx: &ValidationContext<'_>) -> RuleOutput {
    let Some(instance) = ctx.instance else {
        return Vec::new();
    };
    let mut findings = Vec::new();
    for fact in &instance.facts {
        if classify(fact, instance, ctx.module) != Some(NumericAttribute::Percentage) {
            continue;
        }
        if let Some(Decimals::Value(v)) = fact.decimals {
            if v < 4 {
                let mut dict = BTreeMap::new();
                dict.insert("fact".to_string(), fact.element_qname.clone());
                dict.insert("value".to_string(), v.to_string());
                findings.push((Some(fact.element_qname.clone()), dict));
            }
        }
    }
    findings
}

fn check_integer_exact(ctx: &ValidationContext<'_>) -> RuleOutput {
    let Some(instance) = ctx.instance else {
        return Vec::new();
    };
    let mut findings = Vec::new();
    for fact in &instance.facts {
        if classify(fact, instance, ctx.module) != Some(NumericAttribute::Integer) {
            continue;
        }
        let Some(decimals) = fact.decimals else { continue };
        let is_exact_zero = matches!(decimals, Decimals::Value(0));
        if !is_exact_zero {
            let mut dict = BTreeMap::new();
            dict.insert("fact".to_string(), fact.element_qname.clone());
            dict.insert("value".to_string(), render_decimals(decimals));
            findings.push((Some(fact.element_qname.clone()), dict));
        }
    }
    findings
}

fn check_unrealistic(ctx: &ValidationContext<'_>) -> RuleOutput {
    let Some(instance) = ctx.instance else {
        return Vec::new();
    };
    instance
        .facts
        .iter()
        .filter_map(|fact| {
            let decimals = fact.decimals?;
            let unrealistic = match decimals {
                Decimals::Value(v) => v > 20,
                Decimals::Infinite => true,
            };
            if !unrealistic {
                return None;
            }
            let mut dict = BTreeMap::new();
            dict.insert("fact".to_string(), fact.element_qname.clone());
            dict.insert("value".to_string(), render_decimals(decimals));
            Some((Some(fact.element_qname.clone()), dict))
        })
        .collect()
}

pub fn register(registry: &mut RuleRegistry) {
    registry.register("EBA-DEC-001", None, check_monetary_floor);
    registry.register("EBA-DEC-002", None, check_percentage_floor);
    registry.register("EBA-DEC-003", None, check_integer_exact);
    registry.register("EBA-DEC-004", None, check_unrealistic);
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use indexmap::IndexMap;

    fn instance_with(unit_measure: &str, decimals: Decimals) -> crate::xml::Instance {
        let mut contexts = IndexMap::new();
        contexts.insert(
            "c1".to_string(),
            crate::xml::Context {
                id: "c1".to_string(),
                entity_identifier: ("scheme".to_string(), "e1".to_string()),
                instant: NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
                scenario: crate::xml::Scenario::default(),
            },
        );
        let mut units = IndexMap::new();
        units.insert(
            "u1".to_string(),
            crate::xml::Unit {
                id: "u1".to_string(),
                expr: UnitExpr::Simple(vec![unit_measure.to_string()]),
            },
        );
        crate::xml::Instance {
            schema_ref: String::new(),
            contexts,
            units,
            facts: vec![Fact {
                element_qname: "eba_met:f1".to_string(),
                context_id: "c1".to_string(),
                unit_id: Some("u1".to_string()),
                decimals: Some(decimals),
                value: "1".to_string(),
            }],
            filing_indicators: vec![],
        }
    }

    #[test]
    fn flags_monetary_below_default_floor() {
        let instance = instance_with("iso4217:EUR", Decimals::Value(-5));
        let mut ctx = ValidationContext::new(b"");
        ctx.instance = Some(&instance);
        assert_eq!(check_monetary_floor(&ctx).len(), 1);
    }

    #[test]
    fn accepts_monetary_at_relaxed_floor_for_fws_module() {
        let instance = instance_with("iso4217:EUR", Decimals::Value(-5));
        let module = Module {
            url: "https://example.org/fws/fp/mod.xsd".to_string(),
            code: "FP".to_string(),
            tables: vec![],
        };
        let mut ctx = ValidationContext::new(b"");
        ctx.instance = Some(&instance);
        ctx.module = Some(&module);
        assert!(check_monetary_floor(&ctx).is_empty());
    }

    #[test]
    fn flags_unrealistic_decimals() {
        let instance = instance_with("xbrli:pure", Decimals::Infinite);
        let mut ctx = ValidationContext::new(b"");
        ctx.instance = Some(&instance);
        assert_eq!(check_unrealistic(&ctx).len(), 1);
    }
}
