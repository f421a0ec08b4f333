//! Core types for a loaded EBA taxonomy module.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// How a table's datapoints are enumerated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Architecture {
    /// Every cell of the table is enumerated as a [`Variable`].
    Datapoints,
    /// The table is a grid of open-key rows times partially-dimensioned columns.
    Headers,
}

/// A marker classifying a datapoint's numeric type, used by the decimal-precision
/// aggregator and the EBA-DEC-* rule family to pick the right threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NumericAttribute {
    /// `$decimalsMonetary`.
    Monetary,
    /// `$decimalsPercentage`.
    Percentage,
    /// `$decimalsInteger`.
    Integer,
    /// `$decimalsDecimal`.
    Decimal,
}

/// One enumerated cell of a `datapoints`-architecture table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Variable {
    /// Stable string key used as the `datapoint` column value in the output CSV.
    pub datapoint_id: String,
    /// Dimension local-name → expected member QName, or a `$unit`/`$baseCurrency`
    /// placeholder meaning "bind the context's unit here".
    pub dimensions: BTreeMap<String, String>,
    /// Numeric-type classification, when the datapoint is numeric.
    pub attributes: Option<NumericAttribute>,
    /// Accepted member QNames for an enumerated-valued fact, if restricted.
    pub allowed_values: Option<Vec<String>>,
}

impl Variable {
    /// True iff `dimensions` binds a `unit` key to a `$unit`/`$baseCurrency` placeholder.
    #[must_use]
    pub fn has_unit_dim(&self) -> bool {
        matches!(
            self.dimensions.get("unit").map(String::as_str),
            Some("$unit" | "$baseCurrency")
        )
    }
}

/// One column of a `headers`-architecture table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Column {
    /// Stable string key used as the `datapoint` column value in the output CSV.
    pub datapoint_id: String,
    /// Partial dimensions this column fixes, on top of the table's open keys.
    pub dimensions: BTreeMap<String, String>,
    /// Numeric-type classification, when the datapoint is numeric.
    pub attributes: Option<NumericAttribute>,
    /// Accepted member QNames for an enumerated-valued fact, if restricted.
    pub allowed_values: Option<Vec<String>>,
}

/// A logical grid of datapoints identified by a filing-indicator code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Table {
    /// The table's own code (e.g. `R_01.00`).
    pub code: String,
    /// The filing-indicator code gating whether this table is reported.
    pub filing_indicator_code: String,
    /// The table's taxonomy URL.
    pub url: String,
    /// Which of the two architectures this table uses.
    pub architecture: Architecture,
    /// Dimension local-names whose members are not enumerated; accepted without
    /// value validation.
    pub open_keys: Vec<String>,
    /// Trailing metadata columns the CSV for this table carries (e.g. `unit`, `decimals`).
    pub attributes_header: Vec<String>,
    /// Cells, when `architecture == Datapoints`.
    #[serde(default)]
    pub variables: Vec<Variable>,
    /// Columns, when `architecture == Headers`.
    #[serde(default)]
    pub columns: Vec<Column>,
}

/// An immutable, loaded taxonomy module, keyed by entry-point URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Module {
    /// The entry-point URL this module was loaded for.
    pub url: String,
    /// The module's short code.
    pub code: String,
    /// The tables defined by this module.
    pub tables: Vec<Table>,
}

impl Module {
    /// Returns the table with the given filing-indicator code, if any.
    #[must_use]
    pub fn table_by_filing_indicator(&self, code: &str) -> Option<&Table> {
        self.tables
            .iter()
            .find(|t| t.filing_indicator_code == code)
    }
}
