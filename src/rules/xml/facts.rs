//! XML-040..043: fact-level structural rules.

use std::collections::BTreeMap;

use regex::Regex;

use crate::rules::context::ValidationContext;
use crate::rules::registry::{RuleOutput, RuleRegistry};
use crate::xml::Decimals;

fn check_no_precision(ctx: &ValidationContext<'_>) -> RuleOutput {
    ctx.facts_scan()
        .facts_with_precision
        .iter()
        .map(|fact| {
            let mut dict = BTreeMap::new();
            dict.insert("fact".to_string(), fact.clone());
            (Some(fact.clone()), dict)
        })
        .collect()
}

fn decimals_attr_regex() -> Regex {
    Regex::new(r#"<([\w.:-]+)[^>]*\bdecimals\s*=\s*"([^"]*)""#).expect("valid regex")
}

fn check_decimals_format(ctx: &ValidationContext<'_>) -> RuleOutput {
    let text = String::from_utf8_lossy(ctx.raw_bytes);
    decimals_attr_regex()
        .captures_iter(&text)
        .filter_map(|c| {
            let fact = c[1].to_string();
            let raw = c[2].to_string();
            if Decimals::parse(&raw).is_some() {
                return None;
            }
            let mut dict = BTreeMap::new();
            dict.insert("fact".to_string(), fact.clone());
            dict.insert("value".to_string(), raw);
            Some((Some(fact), dict))
        })
        .collect()
}

fn check_no_nil(ctx: &ValidationContext<'_>) -> RuleOutput {
    ctx.facts_scan()
        .facts_with_nil
        .iter()
        .map(|fact| {
            let mut dict = BTreeMap::new();
            dict.insert("fact".to_string(), fact.clone());
            (Some(fact.clone()), dict)
        })
        .collect()
}

fn check_non_empty_string_facts(ctx: &ValidationContext<'_>) -> RuleOutput {
    let Some(instance) = ctx.instance else {
        return Vec::new();
    };
    instance
        .facts
        .iter()
        .filter(|f| f.unit_id.is_none() && f.value.trim().is_empty())
        .map(|f| {
            let mut dict = BTreeMap::new();
            dict.insert("fact".to_string(), f.element_qname.clone());
            (Some(f.element_qname.clone()), dict)
        })
        .collect()
}

pub fn register(registry: &mut RuleRegistry) {
    registry.register("XML-040", None, check_no_precision);
    registry.register("XML-041", None, check_decimals_format);
    registry.register("XML-042", None, check_no_nil);
    registry.register("XML-043", None, check_non_empty_string_facts);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_invalid_decimals_value() {
        let ctx = ValidationContext::new(br#"<eba_met:ii774 decimals=" 2 ">1</eba_met:ii774>"#);
        assert_eq!(check_decimals_format(&ctx).len(), 1);
    }

    #[test]
    fn accepts_inf_decimals_case_insensitively() {
        let ctx = ValidationContext::new(br#"<eba_met:ii774 decimals="inf">1</eba_met:ii774>"#);
        assert!(check_decimals_format(&ctx).is_empty());
    }
}
