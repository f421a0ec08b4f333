//! The rule-based validation engine: an embedded JSON catalog, a per-job
//! registry mapping rule codes to implementations, shared single-pass tree
//! scans, and the dispatch loop that ties them together.

pub mod catalog;
pub mod context;
pub mod engine;
pub mod finding;
pub mod registry;

mod eba;
mod xml;

pub use catalog::{RuleCatalog, RuleDefinition};
pub use context::ValidationContext;
pub use engine::{detect_rule_set, Validator};
pub use finding::{Finding, FindingCollection, RuleSet, Severity};
pub use registry::{RuleFn, RuleOutput, RuleRegistry};
