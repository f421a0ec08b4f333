//! Rule implementations that apply to XBRL-XML instance documents.

pub mod context;
pub mod document;
pub mod facts;
pub mod filing_indicators;
pub mod root_element;
pub mod schema_ref;
pub mod taxonomy;
pub mod units;
pub mod wellformedness;
