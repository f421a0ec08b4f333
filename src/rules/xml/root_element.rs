//! XML-003: the document's root element must be `{http://www.xbrl.org/2003/instance}xbrl`.

use std::collections::BTreeMap;

use regex::Regex;

use crate::rules::context::ValidationContext;
use crate::rules::registry::{RuleOutput, RuleRegistry};

fn root_tag_regex() -> Regex {
    Regex::new(r"<\?[^>]*\?>\s*(?:<!--.*?-->\s*)*<([A-Za-z_][\w.:-]*)").expect("valid regex")
}

/// Extracts the root element's raw tag name with a lightweight scan, so this
/// rule can run even when the full parse failed for an unrelated reason.
fn raw_root_tag(text: &str) -> Option<String> {
    root_tag_regex()
        .captures(text)
        .map(|c| c[1].to_string())
        .or_else(|| {
            // No XML declaration: fall back to the first element in the document.
            let trimmed = text.trim_start();
            let start = trimmed.find('<')? + 1;
            let rest = &trimmed[start..];
            let end = rest
                .find(|c: char| c.is_whitespace() || c == '>' || c == '/')
                .unwrap_or(rest.len());
            Some(rest[..end].to_string())
        })
}

fn check(ctx: &ValidationContext<'_>) -> RuleOutput {
    if let Some(instance) = ctx.instance {
        let _ = instance;
        return Vec::new();
    }
    let text = String::from_utf8_lossy(ctx.raw_bytes);
    let Some(root) = raw_root_tag(&text) else {
        return Vec::new();
    };
    let local = root.rsplit_once(':').map_or(root.as_str(), |(_, l)| l);
    if local == "xbrl" {
        return Vec::new();
    }
    let mut dict = BTreeMap::new();
    dict.insert("root".to_string(), root);
    vec![(None, dict)]
}

pub fn register(registry: &mut RuleRegistry) {
    registry.register("XML-003", None, check);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_wrong_root_element() {
        let ctx = ValidationContext::new(b"<?xml version=\"1.0\"?><notxbrl/>");
        assert_eq!(check(&ctx).len(), 1);
    }

    #[test]
    fn accepts_xbrl_root_regardless_of_prefix() {
        let ctx = ValidationContext::new(b"<?xml version=\"1.0\"?><xbrli:xbrl/>");
        assert!(check(&ctx).is_empty());
    }
}
