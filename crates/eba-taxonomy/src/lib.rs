//! Loader for pre-serialized EBA XBRL taxonomy modules.
//!
//! A taxonomy catalog is an on-disk directory produced by a separate,
//! read-only compiler step: `index.json` maps entry-point URLs to module
//! file names, and each module file enumerates a taxonomy's tables,
//! datapoints (or headers/columns), open keys, and allowed values.

mod error;
mod loader;
mod types;

pub use error::{Error, Result};
pub use loader::{ModuleLoader, TaxonomyIndex};
pub use types::{Architecture, Column, Module, NumericAttribute, Table, Variable};
