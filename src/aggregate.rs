//! Decimal-precision aggregation: derives the `$decimalsMonetary`,
//! `$decimalsPercentage`, `$decimalsInteger`, and `$decimalsDecimal`
//! parameters written to `parameters.csv`.

use eba_taxonomy::NumericAttribute;

use crate::resolve::ResolvedCell;
use crate::xml::Decimals;

/// A per-datatype decimals value: either a settled integer precision or the
/// special `INF`/`#none` marker (collapsed to one variant — both special
/// values lose to any integer seen, and neither is distinguishable once
/// collapsed, per §4.E.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Aggregated {
    Integer(i32),
    Special,
}

impl Aggregated {
    fn from_decimals(d: Decimals) -> Self {
        match d {
            Decimals::Value(v) => Self::Integer(v),
            Decimals::Infinite => Self::Special,
        }
    }

    /// Folds a newly observed value into the current state per §4.E's
    /// precedence: numeric always wins over `INF`/special; between two
    /// numerics the minimum (lowest precision) wins; two specials stay special.
    fn fold(self, new: Self) -> Self {
        match (self, new) {
            (Self::Integer(a), Self::Integer(b)) => Self::Integer(a.min(b)),
            (Self::Integer(a), Self::Special) => Self::Integer(a),
            (Self::Special, Self::Integer(b)) => Self::Integer(b),
            (Self::Special, Self::Special) => Self::Special,
        }
    }
}

/// The four decimals parameters written to `parameters.csv`.
#[derive(Debug, Clone, Default)]
pub struct DecimalsParameters {
    /// `$decimalsMonetary`, rendered `"INF"` when unresolved to an integer.
    pub monetary: Option<String>,
    /// `$decimalsPercentage`.
    pub percentage: Option<String>,
    /// `$decimalsInteger`.
    pub integer: Option<String>,
    /// `$decimalsDecimal`.
    pub decimal: Option<String>,
}

fn render(state: Option<Aggregated>) -> Option<String> {
    state.map(|s| match s {
        Aggregated::Integer(v) => v.to_string(),
        Aggregated::Special => "INF".to_string(),
    })
}

/// Aggregates the `@decimals` of every numeric cell in `cells`, grouped by
/// the datatype classification each cell's datapoint carries.
#[must_use]
pub fn aggregate(cells: &[ResolvedCell]) -> DecimalsParameters {
    let mut monetary: Option<Aggregated> = None;
    let mut percentage: Option<Aggregated> = None;
    let mut integer: Option<Aggregated> = None;
    let mut decimal: Option<Aggregated> = None;

    for cell in cells {
        let Some(decimals) = cell.decimals else {
            continue;
        };
        let Some(attribute) = cell.attributes else {
            continue;
        };
        let new = Aggregated::from_decimals(decimals);
        let slot = match attribute {
            NumericAttribute::Monetary => &mut monetary,
            NumericAttribute::Percentage => &mut percentage,
            NumericAttribute::Integer => &mut integer,
            NumericAttribute::Decimal => &mut decimal,
        };
        *slot = Some(match slot {
            Some(existing) => existing.fold(new),
            None => new,
        });
    }

    DecimalsParameters {
        monetary: render(monetary),
        percentage: render(percentage),
        integer: render(integer),
        decimal: render(decimal),
    }
}
