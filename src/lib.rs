//! # xbridge
//!
//! Converts XBRL-XML regulatory instances into XBRL-CSV packages and runs a
//! rule-based compliance validator against either form, under the EBA
//! taxonomy filing conventions.
//!
//! ## Quick start
//!
//! ```no_run
//! use std::fs;
//! use std::path::Path;
//! use xbridge::Config;
//! use xbridge::rules::Validator;
//!
//! let path = Path::new("report.xbrl");
//! let bytes = fs::read(path)?;
//! let config = Config::new().with_eba_mode(true);
//! let validator = Validator::new(None);
//! let report = validator.run_validation(path, &bytes, &config)?;
//! for finding in &report.findings {
//!     println!("{finding}");
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Pipeline
//!
//! 1. [`xml::parse_instance`] parses an XBRL-XML instance into a typed [`xml::Instance`].
//! 2. [`resolve::resolve`] binds each fact to a taxonomy-module datapoint.
//! 3. [`filing_indicators::check`] cross-checks resolved cells against reported filing indicators.
//! 4. [`aggregate::aggregate`] derives per-datapoint `decimals` parameters.
//! 5. [`csv_package`] renders and writes the XBRL-CSV package.
//! 6. [`rules::Validator`] independently validates either the XML instance or the CSV package
//!    against the embedded rule catalog.

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all)]

pub mod aggregate;
pub mod config;
pub mod csv_package;
mod error;
pub mod filing_indicators;
pub mod resolve;
pub mod rules;
pub mod xml;

pub use config::Config;
pub use error::{Error, Result};
