//! XML-010 (exactly one schema reference) and XML-012 (known taxonomy entry point).

use std::collections::BTreeMap;

use crate::rules::context::ValidationContext;
use crate::rules::registry::{RuleOutput, RuleRegistry};

fn count_schema_refs(ctx: &ValidationContext<'_>) -> RuleOutput {
    if ctx.instance.is_some() {
        // The parser already enforces "exactly one" as a fatal condition, so
        // a successfully parsed instance always has exactly one.
        return Vec::new();
    }
    let text = String::from_utf8_lossy(ctx.raw_bytes);
    let count = text.matches("schemaRef").count() / 2; // open + close/self-close tag mentions
    if count == 1 {
        return Vec::new();
    }
    let mut dict = BTreeMap::new();
    dict.insert("count".to_string(), count.to_string());
    vec![(None, dict)]
}

fn known_entry_point(ctx: &ValidationContext<'_>) -> RuleOutput {
    let Some(instance) = ctx.instance else {
        return Vec::new();
    };
    if ctx.module.is_some() {
        return Vec::new();
    }
    let mut dict = BTreeMap::new();
    dict.insert("href".to_string(), instance.schema_ref.clone());
    vec![(None, dict)]
}

pub fn register(registry: &mut RuleRegistry) {
    registry.register("XML-010", None, count_schema_refs);
    registry.register("XML-012", None, known_entry_point);
}
