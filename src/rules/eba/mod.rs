//! EBA-specific rules: taxonomy-filing conventions layered on top of the
//! generic XBRL-XML rules, only run when EBA mode is enabled.

pub mod additional;
pub mod currency;
pub mod decimals;
pub mod entity;
pub mod guidance;
pub mod naming;
pub mod units;
