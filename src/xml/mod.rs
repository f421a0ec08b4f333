//! XBRL-XML instance parsing: the typed data model and the `quick-xml`-based
//! parser that produces it.

mod model;
mod parser;

pub use model::{
    Context, Decimals, DimensionValue, EntityIdentifier, Fact, FilingIndicator, Instance,
    Scenario, Unit, UnitExpr, UriLocal,
};
pub use parser::{parse_instance, RootNamespaces};
