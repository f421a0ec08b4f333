//! Datapoint resolver: binds parsed facts to taxonomy-module cells.
//!
//! Handles both the `datapoints` (every cell enumerated) and `headers` (open
//! keys × partially-dimensioned columns) architectures with one matching
//! algorithm, since [`eba_taxonomy::Variable`] and [`eba_taxonomy::Column`]
//! carry the same shape.

use std::collections::BTreeMap;

use eba_taxonomy::{Architecture, Module, Table};

use crate::error::{Error, Result};
use crate::xml::{DimensionValue, Fact, Instance};

/// A normalised dimensional signature derived from a fact and its context.
#[derive(Debug, Clone, Default)]
struct Signature {
    metric: String,
    /// Dimension local-name → member value, as observed (still possibly prefixed).
    dims: BTreeMap<String, String>,
    has_unit: bool,
}

fn local_name(qname: &str) -> &str {
    qname.rsplit_once(':').map_or(qname, |(_, local)| local)
}

fn dimension_value_text(value: &DimensionValue) -> &str {
    match value {
        DimensionValue::Explicit(qname) => qname,
        DimensionValue::Typed(text) => text,
    }
}

fn build_signature(fact: &Fact, instance: &Instance) -> Option<Signature> {
    let context = instance.contexts.get(&fact.context_id)?;
    let mut dims = BTreeMap::new();
    for (dim_qname, value) in &context.scenario.dimensions {
        dims.insert(
            local_name(dim_qname).to_string(),
            dimension_value_text(value).to_string(),
        );
    }
    let has_unit = fact.unit_id.is_some();
    if has_unit {
        dims.insert("unit".to_string(), "$unit".to_string());
    }
    Some(Signature {
        metric: local_name(&fact.element_qname).to_string(),
        dims,
        has_unit,
    })
}

/// A candidate datapoint definition, unifying [`eba_taxonomy::Variable`] and
/// [`eba_taxonomy::Column`] (same shape, different architecture).
struct Candidate<'a> {
    datapoint_id: &'a str,
    dimensions: &'a BTreeMap<String, String>,
    allowed_values: Option<&'a Vec<String>>,
    has_unit_dim: bool,
}

/// Outcome of matching a signature against one candidate.
enum MatchOutcome {
    NoMatch,
    Matched { open_key_values: BTreeMap<String, String> },
}

fn try_match(sig: &Signature, table: &Table, candidate: &Candidate<'_>) -> MatchOutcome {
    if candidate.datapoint_id != sig.metric {
        return MatchOutcome::NoMatch;
    }

    let mut consumed: Vec<&str> = Vec::new();

    for (dim, expected) in candidate.dimensions {
        if expected == "$unit" || expected == "$baseCurrency" {
            if !sig.has_unit {
                return MatchOutcome::NoMatch;
            }
            consumed.push(dim.as_str());
            continue;
        }
        match sig.dims.get(dim) {
            Some(actual) if actual == expected => {
                consumed.push(dim.as_str());
            }
            _ => return MatchOutcome::NoMatch,
        }
    }

    let mut open_key_values = BTreeMap::new();
    for key in &table.open_keys {
        match sig.dims.get(key) {
            Some(value) => {
                open_key_values.insert(key.clone(), value.clone());
                consumed.push(key.as_str());
            }
            None => return MatchOutcome::NoMatch,
        }
    }

    for dim in sig.dims.keys() {
        if !consumed.contains(&dim.as_str()) {
            return MatchOutcome::NoMatch;
        }
    }

    MatchOutcome::Matched { open_key_values }
}

/// A resolved (table, datapoint) cell, ready for aggregation and CSV emission.
#[derive(Debug, Clone)]
pub struct ResolvedCell {
    /// Index into the originating `Instance::facts`, shared by every table a
    /// fact resolves against (a fact may bind to more than one table, §4.C.4).
    pub fact_index: usize,
    /// The table the fact was bound to.
    pub table_code: String,
    /// The datapoint/column identifier.
    pub datapoint_id: String,
    /// Open-key dimension values (row identity within the table).
    pub open_keys: BTreeMap<String, String>,
    /// The fact's value, after allowed-value normalisation.
    pub value: String,
    /// The bound unit id, or `None` when the datapoint carries no unit dimension.
    pub unit_id: Option<String>,
    /// The fact's `@decimals`, when numeric.
    pub decimals: Option<crate::xml::Decimals>,
    /// Numeric-type classification, when known.
    pub attributes: Option<eba_taxonomy::NumericAttribute>,
}

/// Result of resolving every fact in an instance against a taxonomy module.
#[derive(Debug, Clone, Default)]
pub struct ResolvedReport {
    /// Cells grouped by originating table code, in document order.
    pub cells: Vec<ResolvedCell>,
    /// Indices (into `instance.facts`) of facts that matched no table.
    pub orphaned_fact_indices: Vec<usize>,
}

/// Resolves every fact in `instance` against `module`.
///
/// # Errors
///
/// Returns [`Error::FatalConversion`] when an emitted cell's value is outside
/// its column's `allowed_values` set and no same-local-name, different-prefix
/// member can be substituted.
pub fn resolve(instance: &Instance, module: &Module) -> Result<ResolvedReport> {
    let mut report = ResolvedReport::default();

    for (index, fact) in instance.facts.iter().enumerate() {
        let Some(sig) = build_signature(fact, instance) else {
            report.orphaned_fact_indices.push(index);
            continue;
        };

        let mut matched_any = false;
        for table in &module.tables {
            match table.architecture {
                Architecture::Datapoints => {
                    for variable in &table.variables {
                        let candidate = Candidate {
                            datapoint_id: &variable.datapoint_id,
                            dimensions: &variable.dimensions,
                            allowed_values: variable.allowed_values.as_ref(),
                            has_unit_dim: variable.has_unit_dim(),
                        };
                        if let MatchOutcome::Matched { open_key_values } =
                            try_match(&sig, table, &candidate)
                        {
                            matched_any = true;
                            report.cells.push(emit_cell(
                                index,
                                table,
                                &candidate,
                                open_key_values,
                                fact,
                            )?);
                        }
                    }
                }
                Architecture::Headers => {
                    for column in &table.columns {
                        let candidate = Candidate {
                            datapoint_id: &column.datapoint_id,
                            dimensions: &column.dimensions,
                            allowed_values: column.allowed_values.as_ref(),
                            has_unit_dim: column.has_unit_dim(),
                        };
                        if let MatchOutcome::Matched { open_key_values } =
                            try_match(&sig, table, &candidate)
                        {
                            matched_any = true;
                            report.cells.push(emit_cell(
                                index,
                                table,
                                &candidate,
                                open_key_values,
                                fact,
                            )?);
                        }
                    }
                }
            }
        }

        if !matched_any {
            report.orphaned_fact_indices.push(index);
        }
    }

    Ok(report)
}

fn emit_cell(
    fact_index: usize,
    table: &Table,
    candidate: &Candidate<'_>,
    open_keys: BTreeMap<String, String>,
    fact: &Fact,
) -> Result<ResolvedCell> {
    let value = normalise_value(candidate, &fact.value)?;
    let unit_id = if candidate.has_unit_dim {
        fact.unit_id.clone()
    } else {
        None
    };

    Ok(ResolvedCell {
        fact_index,
        table_code: table.code.clone(),
        datapoint_id: candidate.datapoint_id.to_string(),
        open_keys,
        value,
        unit_id,
        decimals: fact.decimals,
        attributes: candidate_attributes(table, candidate),
    })
}

fn candidate_attributes(
    table: &Table,
    candidate: &Candidate<'_>,
) -> Option<eba_taxonomy::NumericAttribute> {
    match table.architecture {
        Architecture::Datapoints => table
            .variables
            .iter()
            .find(|v| v.datapoint_id == candidate.datapoint_id)
            .and_then(|v| v.attributes),
        Architecture::Headers => table
            .columns
            .iter()
            .find(|c| c.datapoint_id == candidate.datapoint_id)
            .and_then(|c| c.attributes),
    }
}

/// Normalises an enumerated fact value against a column's `allowed_values`.
///
/// A value already in the set passes through unchanged. Otherwise, a member
/// with the same local name but a different prefix is substituted (taxonomy
/// modules are generated per jurisdiction and reuse local names across
/// namespace prefixes). No match is a fatal conversion error.
fn normalise_value(candidate: &Candidate<'_>, raw_value: &str) -> Result<String> {
    let Some(allowed) = candidate.allowed_values else {
        return Ok(raw_value.to_string());
    };
    if allowed.iter().any(|v| v == raw_value) {
        return Ok(raw_value.to_string());
    }
    let raw_local = local_name(raw_value);
    if let Some(rewritten) = allowed.iter().find(|v| local_name(v) == raw_local) {
        return Ok(rewritten.clone());
    }
    let accepted_locals: Vec<&str> = allowed.iter().map(|v| local_name(v)).collect();
    Err(Error::fatal_conversion(format!(
        "datapoint '{}': value '{raw_value}' is not an accepted member (accepted local names: {})",
        candidate.datapoint_id,
        accepted_locals.join(", ")
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use eba_taxonomy::{Architecture, Column, Module, NumericAttribute, Table, Variable};
    use indexmap::IndexMap;

    use crate::xml::{Context, Scenario, Unit, UnitExpr};

    fn sample_instance() -> Instance {
        let mut contexts = IndexMap::new();
        contexts.insert(
            "c1".to_string(),
            Context {
                id: "c1".to_string(),
                entity_identifier: (
                    "http://standards.iso.org/iso/17442".to_string(),
                    "529900T8BM49AURSDO55".to_string(),
                ),
                instant: NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
                scenario: Scenario::default(),
            },
        );
        let mut units = IndexMap::new();
        units.insert(
            "u1".to_string(),
            Unit {
                id: "u1".to_string(),
                expr: UnitExpr::Simple(vec!["iso4217:EUR".to_string()]),
            },
        );
        Instance {
            schema_ref: "https://example.org/mod.xsd".to_string(),
            contexts,
            units,
            facts: vec![Fact {
                element_qname: "{http://www.eba.europa.eu/met}ii774".to_string(),
                context_id: "c1".to_string(),
                unit_id: Some("u1".to_string()),
                decimals: Some(crate::xml::Decimals::Value(2)),
                value: "100.00".to_string(),
            }],
            filing_indicators: Vec::new(),
        }
    }

    fn sample_module_datapoints() -> Module {
        Module {
            url: "https://example.org/mod.xsd".to_string(),
            code: "TEST".to_string(),
            tables: vec![Table {
                code: "R_01.00".to_string(),
                filing_indicator_code: "R_01.00".to_string(),
                url: "https://example.org/mod/R_01.00.xsd".to_string(),
                architecture: Architecture::Datapoints,
                open_keys: vec![],
                attributes_header: vec!["unit".to_string(), "decimals".to_string()],
                variables: vec![Variable {
                    datapoint_id: "ii774".to_string(),
                    dimensions: BTreeMap::from([(
                        "unit".to_string(),
                        "$unit".to_string(),
                    )]),
                    attributes: Some(NumericAttribute::Monetary),
                    allowed_values: None,
                }],
                columns: vec![],
            }],
        }
    }

    #[test]
    fn resolves_simple_datapoints_fact() {
        let instance = sample_instance();
        let module = sample_module_datapoints();
        let report = resolve(&instance, &module).unwrap();
        assert_eq!(report.cells.len(), 1);
        assert!(report.orphaned_fact_indices.is_empty());
        assert_eq!(report.cells[0].datapoint_id, "ii774");
        assert_eq!(report.cells[0].unit_id.as_deref(), Some("u1"));
    }

    #[test]
    fn unit_dropped_when_variable_has_no_unit_dim() {
        let instance = sample_instance();
        let mut module = sample_module_datapoints();
        module.tables[0].variables[0].dimensions.clear();
        let report = resolve(&instance, &module).unwrap();
        assert_eq!(report.cells.len(), 1);
        assert_eq!(report.cells[0].unit_id, None);
    }

    #[test]
    fn no_matching_table_orphans_fact() {
        let instance = sample_instance();
        let module = Module {
            url: instance.schema_ref.clone(),
            code: "EMPTY".to_string(),
            tables: vec![],
        };
        let report = resolve(&instance, &module).unwrap();
        assert!(report.cells.is_empty());
        assert_eq!(report.orphaned_fact_indices, vec![0]);
    }

    #[test]
    fn allowed_value_rewritten_by_local_name() {
        let mut instance = sample_instance();
        instance.facts[0].element_qname = "{http://www.eba.europa.eu/met}code".to_string();
        instance.facts[0].value = "other_prefix:x1".to_string();
        let mut module = sample_module_datapoints();
        module.tables[0].variables[0].datapoint_id = "code".to_string();
        module.tables[0].variables[0].dimensions.clear();
        module.tables[0].variables[0].allowed_values =
            Some(vec!["eba_CA:x1".to_string(), "eba_CA:x2".to_string()]);
        let report = resolve(&instance, &module).unwrap();
        assert_eq!(report.cells[0].value, "eba_CA:x1");
    }

    #[test]
    fn allowed_value_with_no_match_is_fatal() {
        let mut instance = sample_instance();
        instance.facts[0].value = "eba_CA:unknown".to_string();
        let mut module = sample_module_datapoints();
        module.tables[0].variables[0].allowed_values = Some(vec!["eba_CA:x1".to_string()]);
        module.tables[0].variables[0].dimensions.clear();
        let err = resolve(&instance, &module).unwrap_err();
        assert!(matches!(err, Error::FatalConversion { .. }));
    }

    #[test]
    fn headers_architecture_matches_on_open_key_and_column() {
        let mut instance = sample_instance();
        instance.contexts[0].scenario.dimensions.insert(
            "ROW".to_string(),
            DimensionValue::Explicit("eba_RW:r1".to_string()),
        );
        let module = Module {
            url: instance.schema_ref.clone(),
            code: "TEST".to_string(),
            tables: vec![Table {
                code: "R_02.00".to_string(),
                filing_indicator_code: "R_02.00".to_string(),
                url: "https://example.org/mod/R_02.00.xsd".to_string(),
                architecture: Architecture::Headers,
                open_keys: vec!["ROW".to_string()],
                attributes_header: vec![],
                variables: vec![],
                columns: vec![Column {
                    datapoint_id: "ii774".to_string(),
                    dimensions: BTreeMap::from([("unit".to_string(), "$unit".to_string())]),
                    attributes: Some(NumericAttribute::Monetary),
                    allowed_values: None,
                }],
            }],
        };
        let report = resolve(&instance, &module).unwrap();
        assert_eq!(report.cells.len(), 1);
        assert_eq!(
            report.cells[0].open_keys.get("ROW").map(String::as_str),
            Some("eba_RW:r1")
        );
    }
}
