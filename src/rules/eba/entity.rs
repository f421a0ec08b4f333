//! EBA-ENTITY-001/002: entity-identifier scheme and LEI format.

use std::collections::BTreeMap;

use regex::Regex;

use crate::rules::context::ValidationContext;
use crate::rules::registry::{RuleOutput, RuleRegistry};

const LEI_SCHEME: &str = "http://standards.iso.org/iso/17442";
const QUALIFIED_SCHEME: &str = "https://eurofiling.info/eu/rs";
const ACCEPTED_SCHEMES: &[&str] = &[LEI_SCHEME, QUALIFIED_SCHEME];

const RECOGNISED_LEI_SUFFIXES: &[&str] = &[".CON", ".IND", ".CRDLIQSUBGRP"];

fn lei_base_regex() -> Regex {
    Regex::new(r"^[A-Z0-9]{20}$").expect("valid regex")
}

fn check_accepted_scheme(ctx: &ValidationContext<'_>) -> RuleOutput {
    let Some(instance) = ctx.instance else {
        return Vec::new();
    };
    let Some((scheme, _)) = instance.entity_identifier() else {
        return Vec::new();
    };
    if ACCEPTED_SCHEMES.contains(&scheme.as_str()) {
        return Vec::new();
    }
    let mut dict = BTreeMap::new();
    dict.insert("scheme".to_string(), scheme.clone());
    vec![(None, dict)]
}

fn check_lei_format(ctx: &ValidationContext<'_>) -> RuleOutput {
    let Some(instance) = ctx.instance else {
        return Vec::new();
    };
    let Some((scheme, value)) = instance.entity_identifier() else {
        return Vec::new();
    };
    if scheme != LEI_SCHEME {
        return Vec::new();
    }
    let base = RECOGNISED_LEI_SUFFIXES
        .iter()
        .find_map(|suffix| value.strip_suffix(suffix))
        .unwrap_or(value.as_str());
    if lei_base_regex().is_match(base) {
        return Vec::new();
    }
    let mut dict = BTreeMap::new();
    dict.insert("value".to_string(), value.clone());
    vec![(None, dict)]
}

pub fn register(registry: &mut RuleRegistry) {
    registry.register("EBA-ENTITY-001", None, check_accepted_scheme);
    registry.register("EBA-ENTITY-002", None, check_lei_format);
}
