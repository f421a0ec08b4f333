//! Typed data model for a parsed XBRL-XML instance.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use indexmap::IndexMap;

/// A resolved `(namespace_uri, local_name)` pair — the canonical identity of a
/// QName once its prefix has been resolved against the namespace scope it was
/// read in.
pub type UriLocal = (String, String);

/// The `@decimals` attribute of a numeric fact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decimals {
    /// A parsed integer precision value.
    Value(i32),
    /// The literal `INF` (infinite precision).
    Infinite,
}

impl Decimals {
    /// Parses a raw `@decimals` attribute value.
    ///
    /// Returns `None` when `raw` is neither `INF` (case-insensitive) nor a
    /// strict integer (no surrounding whitespace, matching the source's
    /// rejection of strings Python's `int()` would accept but the spec
    /// doesn't, such as `" 2 "`).
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        if raw.eq_ignore_ascii_case("inf") {
            return Some(Self::Infinite);
        }
        if raw.trim() != raw {
            return None;
        }
        raw.parse::<i32>().ok().map(Self::Value)
    }
}

/// A dimension member value observed in a context's scenario.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum DimensionValue {
    /// An `xbrldi:explicitMember` value: a member QName, kept as the raw
    /// `prefix:local` text observed (prefix resolution happens at the scope
    /// of the element it was read from, not at parse time).
    Explicit(String),
    /// An `xbrldi:typedMember` value: free-form typed content, captured verbatim.
    Typed(String),
}

/// The dimensional scenario of a context.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scenario {
    /// Dimension QName (as observed, not yet local-name-normalised) → member value.
    pub dimensions: BTreeMap<String, DimensionValue>,
}

/// An entity identifier: `(scheme, value)`.
pub type EntityIdentifier = (String, String);

/// A parsed `xbrli:context`.
#[derive(Debug, Clone)]
pub struct Context {
    /// The context's `@id`.
    pub id: String,
    /// The context's entity identifier.
    pub entity_identifier: EntityIdentifier,
    /// The context's single reporting instant (periods are instant-only; see XML-030/031).
    pub instant: NaiveDate,
    /// The context's dimensional scenario (empty if none).
    pub scenario: Scenario,
}

/// A canonical, hashable unit expression used for duplicate detection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum UnitExpr {
    /// A simple unit: sorted measure QNames.
    Simple(Vec<String>),
    /// A divide unit: sorted numerator measures over sorted denominator measures.
    Divide {
        /// Sorted numerator measure QNames.
        numerator: Vec<String>,
        /// Sorted denominator measure QNames.
        denominator: Vec<String>,
    },
}

/// A parsed `xbrli:unit`.
#[derive(Debug, Clone)]
pub struct Unit {
    /// The unit's `@id`.
    pub id: String,
    /// The unit's canonical expression.
    pub expr: UnitExpr,
}

/// A parsed fact (a non-infrastructure direct child of the root element).
#[derive(Debug, Clone)]
pub struct Fact {
    /// The fact's element QName (the "metric"), as observed (not yet resolved).
    pub element_qname: String,
    /// The `@contextRef` this fact reports against.
    pub context_id: String,
    /// The `@unitRef`, present for numeric facts, absent for string facts.
    pub unit_id: Option<String>,
    /// The `@decimals` attribute, present for numeric facts.
    pub decimals: Option<Decimals>,
    /// The fact's raw text content.
    pub value: String,
}

/// A parsed `find:filingIndicator`.
#[derive(Debug, Clone)]
pub struct FilingIndicator {
    /// The table code this indicator refers to.
    pub table_code: String,
    /// Whether the filer reports this table.
    pub filed: bool,
}

/// The fully parsed instance document.
#[derive(Debug, Clone)]
pub struct Instance {
    /// The single entry-point schema URL (`link:schemaRef/@xlink:href`).
    pub schema_ref: String,
    /// Contexts keyed by `@id`, insertion-ordered (document order).
    pub contexts: IndexMap<String, Context>,
    /// Units keyed by `@id`, insertion-ordered (document order).
    pub units: IndexMap<String, Unit>,
    /// Facts in document order.
    pub facts: Vec<Fact>,
    /// Filing indicators in document order.
    pub filing_indicators: Vec<FilingIndicator>,
}

impl Instance {
    /// Returns the entity identifier shared by every context, if any context exists.
    ///
    /// The parser enforces (XML-033) that every context shares one entity
    /// identifier, so the first context's is authoritative.
    #[must_use]
    pub fn entity_identifier(&self) -> Option<&EntityIdentifier> {
        self.contexts.values().next().map(|c| &c.entity_identifier)
    }

    /// Returns the single reference period shared by every context, if any.
    ///
    /// The parser enforces (XML-031/032) that every context shares one instant.
    #[must_use]
    pub fn reference_period(&self) -> Option<NaiveDate> {
        self.contexts.values().next().map(|c| c.instant)
    }
}
