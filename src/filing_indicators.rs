//! Post-resolution filing-indicator orphan detection.
//!
//! Runs after the datapoint resolver, before CSV emission: a fact is
//! orphaned when it would be placed by some non-reported table and by no
//! reported table.

use std::collections::{BTreeMap, BTreeSet};

use eba_taxonomy::Module;

use crate::error::{Error, Result};
use crate::resolve::ResolvedCell;
use crate::xml::Instance;

/// Per-non-reported-table orphan counts, used to build the strict-mode error
/// message and the permissive-mode warning.
#[derive(Debug, Clone)]
pub struct OrphanSummary {
    /// The non-reported table's code.
    pub table_code: String,
    /// Facts this table would contain that no reported table also contains.
    pub orphaned_count: usize,
    /// Facts this table would contain that some reported table also contains.
    pub shared_count: usize,
}

/// Outcome of a filing-indicator check.
#[derive(Debug, Clone, Default)]
pub struct FilingIndicatorReport {
    /// Non-empty iff at least one non-reported table has orphaned facts.
    pub orphan_summaries: Vec<OrphanSummary>,
}

impl FilingIndicatorReport {
    /// True when any non-reported table has orphaned facts.
    #[must_use]
    pub fn has_orphans(&self) -> bool {
        self.orphan_summaries.iter().any(|s| s.orphaned_count > 0)
    }
}

/// Checks `cells` against the instance's filing indicators.
///
/// `strict` controls the outcome when orphans are found: `true` returns
/// [`Error::FatalConversion`]; `false` returns `Ok` with a populated report
/// the caller surfaces as a warning.
///
/// # Errors
///
/// Returns [`Error::FatalConversion`] in strict mode when any fact is
/// orphaned (placed by a non-reported table and no reported table).
pub fn check(
    instance: &Instance,
    module: &Module,
    cells: &[ResolvedCell],
    strict: bool,
) -> Result<FilingIndicatorReport> {
    let reported: BTreeSet<&str> = instance
        .filing_indicators
        .iter()
        .filter(|fi| fi.filed)
        .map(|fi| fi.table_code.as_str())
        .collect();

    // Identify, for each fact index that was resolved, the set of table
    // codes it was bound to (a fact can match multiple tables, §4.C.4).
    let mut fact_tables: BTreeMap<usize, BTreeSet<&str>> = BTreeMap::new();
    for cell in cells {
        fact_tables
            .entry(cell.fact_index)
            .or_default()
            .insert(cell.table_code.as_str());
    }

    let mut per_table_orphaned: BTreeMap<&str, usize> = BTreeMap::new();
    let mut per_table_shared: BTreeMap<&str, usize> = BTreeMap::new();

    for tables in fact_tables.values() {
        let in_reported = tables.iter().any(|t| reported.contains(t));
        for table in tables {
            if reported.contains(table) {
                continue;
            }
            if in_reported {
                *per_table_shared.entry(table).or_insert(0) += 1;
            } else {
                *per_table_orphaned.entry(table).or_insert(0) += 1;
            }
        }
    }

    let module_tables: BTreeSet<&str> = module.tables.iter().map(|t| t.code.as_str()).collect();
    let mut summaries = Vec::new();
    for table in module_tables {
        if reported.contains(table) {
            continue;
        }
        let orphaned_count = per_table_orphaned.get(table).copied().unwrap_or(0);
        let shared_count = per_table_shared.get(table).copied().unwrap_or(0);
        if orphaned_count > 0 || shared_count > 0 {
            summaries.push(OrphanSummary {
                table_code: table.to_string(),
                orphaned_count,
                shared_count,
            });
        }
    }

    let report = FilingIndicatorReport {
        orphan_summaries: summaries,
    };

    if strict && report.has_orphans() {
        let detail = report
            .orphan_summaries
            .iter()
            .filter(|s| s.orphaned_count > 0)
            .map(|s| {
                format!(
                    "{}: {} orphaned, {} shared with a reported table",
                    s.table_code, s.orphaned_count, s.shared_count
                )
            })
            .collect::<Vec<_>>()
            .join("; ");
        return Err(Error::fatal_conversion(format!(
            "orphaned facts found in non-reported tables: {detail}"
        )));
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use eba_taxonomy::{Architecture, Module, Table};
    use std::collections::BTreeMap;

    fn module_with(codes: &[&str]) -> Module {
        Module {
            url: "u".to_string(),
            code: "TEST".to_string(),
            tables: codes
                .iter()
                .map(|c| Table {
                    code: (*c).to_string(),
                    filing_indicator_code: (*c).to_string(),
                    url: String::new(),
                    architecture: Architecture::Datapoints,
                    open_keys: vec![],
                    attributes_header: vec![],
                    variables: vec![],
                    columns: vec![],
                })
                .collect(),
        }
    }

    fn cell(fact_index: usize, table_code: &str) -> ResolvedCell {
        ResolvedCell {
            fact_index,
            table_code: table_code.to_string(),
            datapoint_id: "dp".to_string(),
            open_keys: BTreeMap::new(),
            value: "1".to_string(),
            unit_id: None,
            decimals: None,
            attributes: None,
        }
    }

    fn instance_with_indicators(indicators: &[(&str, bool)]) -> Instance {
        use indexmap::IndexMap;
        Instance {
            schema_ref: String::new(),
            contexts: IndexMap::new(),
            units: IndexMap::new(),
            facts: vec![],
            filing_indicators: indicators
                .iter()
                .map(|(code, filed)| crate::xml::FilingIndicator {
                    table_code: (*code).to_string(),
                    filed: *filed,
                })
                .collect(),
        }
    }

    #[test]
    fn no_orphans_when_only_one_table_matches_and_is_reported() {
        let instance = instance_with_indicators(&[("R_01.00", true)]);
        let module = module_with(&["R_01.00"]);
        let cells = vec![cell(0, "R_01.00")];
        let report = check(&instance, &module, &cells, true).unwrap();
        assert!(!report.has_orphans());
    }

    #[test]
    fn strict_mode_fails_on_orphan() {
        let instance = instance_with_indicators(&[("R_01.00", false)]);
        let module = module_with(&["R_01.00"]);
        let cells = vec![cell(0, "R_01.00")];
        let err = check(&instance, &module, &cells, true).unwrap_err();
        assert!(matches!(err, Error::FatalConversion { .. }));
    }

    #[test]
    fn permissive_mode_surfaces_orphan_as_report_only() {
        let instance = instance_with_indicators(&[("R_01.00", false)]);
        let module = module_with(&["R_01.00"]);
        let cells = vec![cell(0, "R_01.00")];
        let report = check(&instance, &module, &cells, false).unwrap();
        assert!(report.has_orphans());
    }

    #[test]
    fn fact_shared_with_reported_table_is_not_orphaned() {
        let instance = instance_with_indicators(&[("R_01.00", true), ("R_02.00", false)]);
        let module = module_with(&["R_01.00", "R_02.00"]);
        // Same fact resolves against both tables, so R_02.00's copy is shared, not orphaned.
        let fact_cells = vec![cell(0, "R_01.00"), cell(0, "R_02.00")];
        let report = check(&instance, &module, &fact_cells, true).unwrap();
        assert!(!report.has_orphans());
    }
}
