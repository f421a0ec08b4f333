//! XML-070..072: facts and dimensional content must conform to the loaded
//! taxonomy module — known concepts, known dimensions, known members.
//!
//! The loaded [`eba_taxonomy::Module`] has no separate concept catalog; a
//! datapoint's identity is its `datapoint_id`, which is also the metric's
//! local name by convention (mirroring [`crate::resolve`]'s signature
//! matching), so "declared concept" here means "appears as some table's
//! `datapoint_id`".

use std::collections::{BTreeMap, BTreeSet};

use eba_taxonomy::{Architecture, Module};

use crate::rules::context::ValidationContext;
use crate::rules::registry::{RuleOutput, RuleRegistry};
use crate::xml::DimensionValue;

fn local_name(qname: &str) -> &str {
    qname.rsplit_once(':').map_or(qname, |(_, local)| local)
}

/// Declared concepts (datapoint ids), declared dimension local-names, and per-dimension
/// allowed explicit member local-names, gathered across every table of `module`.
struct Declarations {
    concepts: BTreeSet<String>,
    dimensions: BTreeSet<String>,
    members_by_dimension: BTreeMap<String, BTreeSet<String>>,
}

fn gather_declarations(module: &Module) -> Declarations {
    let mut concepts = BTreeSet::new();
    let mut dimensions = BTreeSet::new();
    let mut members_by_dimension: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();

    let mut visit = |datapoint_id: &str, dims: &BTreeMap<String, String>| {
        concepts.insert(datapoint_id.to_string());
        for (dim, expected) in dims {
            if dim == "unit" {
                continue;
            }
            dimensions.insert(dim.clone());
            if expected != "$unit" && expected != "$baseCurrency" {
                members_by_dimension
                    .entry(dim.clone())
                    .or_default()
                    .insert(local_name(expected).to_string());
            }
        }
    };

    for table in &module.tables {
        for key in &table.open_keys {
            dimensions.insert(key.clone());
        }
        match table.architecture {
            Architecture::Datapoints => {
                for variable in &table.variables {
                    visit(&variable.datapoint_id, &variable.dimensions);
                }
            }
            Architecture::Headers => {
                for column in &table.columns {
                    visit(&column.datapoint_id, &column.dimensions);
                }
            }
        }
    }

    Declarations {
        concepts,
        dimensions,
        members_by_dimension,
    }
}

fn check_known_concepts(ctx: &ValidationContext<'_>) -> RuleOutput {
    let (Some(instance), Some(module)) = (ctx.instance, ctx.module) else {
        return Vec::new();
    };
    let declarations = gather_declarations(module);
    instance
        .facts
        .iter()
        .filter(|fact| !declarations.concepts.contains(local_name(&fact.element_qname)))
        .map(|fact| {
            let mut dict = BTreeMap::new();
            dict.insert("concept".to_string(), fact.element_qname.clone());
            (Some(fact.element_qname.clone()), dict)
        })
        .collect()
}

fn check_known_dimensions(ctx: &ValidationContext<'_>) -> RuleOutput {
    let (Some(instance), Some(module)) = (ctx.instance, ctx.module) else {
        return Vec::new();
    };
    let declarations = gather_declarations(module);
    let mut findings = Vec::new();
    for context in instance.contexts.values() {
        for dim_qname in context.scenario.dimensions.keys() {
            let dim = local_name(dim_qname);
            if !declarations.dimensions.contains(dim) {
                let mut dict = BTreeMap::new();
                dict.insert("dimension".to_string(), dim_qname.clone());
                dict.insert("context".to_string(), context.id.clone());
                findings.push((Some(context.id.clone()), dict));
            }
        }
    }
    findings
}

fn check_known_members(ctx: &ValidationContext<'_>) -> RuleOutput {
    let (Some(instance), Some(module)) = (ctx.instance, ctx.module) else {
        return Vec::new();
    };
    let declarations = gather_declarations(module);
    let mut findings = Vec::new();
    for context in instance.contexts.values() {
        for (dim_qname, value) in &context.scenario.dimensions {
            let DimensionValue::Explicit(member) = value else {
                continue;
            };
            let dim = local_name(dim_qname);
            let Some(allowed) = declarations.members_by_dimension.get(dim) else {
                continue;
            };
            if !allowed.contains(local_name(member)) {
                let mut dict = BTreeMap::new();
                dict.insert("member".to_string(), member.clone());
                dict.insert("dimension".to_string(), dim_qname.clone());
                findings.push((Some(context.id.clone()), dict));
            }
        }
    }
    findings
}

pub fn register(registry: &mut RuleRegistry) {
    registry.register("XML-070", None, check_known_concepts);
    registry.register("XML-071", None, check_known_dimensions);
    registry.register("XML-072", None, check_known_members);
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use eba_taxonomy::{Architecture, Table, Variable};
    use indexmap::IndexMap;

    fn module_with_concept(datapoint_id: &str, dims: BTreeMap<String, String>) -> Module {
        Module {
            url: "https://example.org/mod.xsd".to_string(),
            code: "TEST".to_string(),
            tables: vec![Table {
                code: "R_01.00".to_string(),
                filing_indicator_code: "R_01.00".to_string(),
                url: "https://example.org/mod/R_01.00.xsd".to_string(),
                architecture: Architecture::Datapoints,
                open_keys: vec![],
                attributes_header: vec![],
                variables: vec![Variable {
                    datapoint_id: datapoint_id.to_string(),
                    dimensions: dims,
                    attributes: None,
                    allowed_values: None,
                }],
                columns: vec![],
            }],
        }
    }

    fn instance_with_fact(element_qname: &str) -> crate::xml::Instance {
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
        crate::xml::Instance {
            schema_ref: String::new(),
            contexts,
            units: IndexMap::new(),
            facts: vec![crate::xml::Fact {
                element_qname: element_qname.to_string(),
                context_id: "c1".to_string(),
                unit_id: None,
                decimals: None,
                value: "x".to_string(),
            }],
            filing_indicators: vec![],
        }
    }

    #[test]
    fn flags_unknown_concept() {
        let instance = instance_with_fact("eba_met:unknown");
        let module = module_with_concept("ii774", BTreeMap::new());
        let mut ctx = ValidationContext::new(b"");
        ctx.instance = Some(&instance);
        ctx.module = Some(&module);
        assert_eq!(check_known_concepts(&ctx).len(), 1);
    }

    #[test]
    fn accepts_declared_concept() {
        let instance = instance_with_fact("eba_met:ii774");
        let module = module_with_concept("ii774", BTreeMap::new());
        let mut ctx = ValidationContext::new(b"");
        ctx.instance = Some(&instance);
        ctx.module = Some(&module);
        assert!(check_known_concepts(&ctx).is_empty());
    }

    #[test]
    fn flags_unknown_dimension_and_member() {
        let mut instance = instance_with_fact("eba_met:ii774");
        instance.contexts[0].scenario.dimensions.insert(
            "ROW".to_string(),
            DimensionValue::Explicit("eba_RW:unknown".to_string()),
        );
        let module = module_with_concept(
            "ii774",
            BTreeMap::from([("ROW".to_string(), "eba_RW:r1".to_string())]),
        );
        let mut ctx = ValidationContext::new(b"");
        ctx.instance = Some(&instance);
        ctx.module = Some(&module);
        assert!(check_known_dimensions(&ctx).is_empty());
        assert_eq!(check_known_members(&ctx).len(), 1);
    }
}
