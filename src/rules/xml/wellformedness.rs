//! XML-001 (well-formedness) and XML-002 (declared encoding).

use std::collections::BTreeMap;

use crate::rules::context::ValidationContext;
use crate::rules::registry::{RuleOutput, RuleRegistry};
use crate::xml::parse_instance;

fn check_wellformedness(ctx: &ValidationContext<'_>) -> RuleOutput {
    if ctx.instance.is_some() {
        return Vec::new();
    }
    match parse_instance(ctx.raw_bytes) {
        Ok(_) => Vec::new(),
        Err(e) => {
            let mut dict = BTreeMap::new();
            dict.insert("reason".to_string(), e.to_string());
            vec![(None, dict)]
        }
    }
}

fn declared_encoding(raw: &str) -> Option<String> {
    let decl_start = raw.find("<?xml")?;
    let decl_end = raw[decl_start..].find("?>")? + decl_start;
    let decl = &raw[decl_start..decl_end];
    let idx = decl.find("encoding")?;
    let rest = &decl[idx + "encoding".len()..];
    let quote_start = rest.find(['"', '\''])?;
    let quote_char = rest.as_bytes()[quote_start] as char;
    let after = &rest[quote_start + 1..];
    let quote_end = after.find(quote_char)?;
    Some(after[..quote_end].to_string())
}

fn check_encoding(ctx: &ValidationContext<'_>) -> RuleOutput {
    let text = String::from_utf8_lossy(ctx.raw_bytes);
    let Some(encoding) = declared_encoding(&text) else {
        return Vec::new();
    };
    if encoding.eq_ignore_ascii_case("utf-8") {
        return Vec::new();
    }
    let mut dict = BTreeMap::new();
    dict.insert("encoding".to_string(), encoding);
    vec![(None, dict)]
}

pub fn register(registry: &mut RuleRegistry) {
    registry.register("XML-001", None, check_wellformedness);
    registry.register("XML-002", None, check_encoding);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_non_utf8_declared_encoding() {
        let ctx = ValidationContext::new(b"<?xml version=\"1.0\" encoding=\"iso-8859-1\"?><a/>");
        let findings = check_encoding(&ctx);
        assert_eq!(findings.len(), 1);
    }

    #[test]
    fn accepts_missing_encoding_declaration() {
        let ctx = ValidationContext::new(b"<?xml version=\"1.0\"?><a/>");
        assert!(check_encoding(&ctx).is_empty());
    }

    #[test]
    fn flags_malformed_document() {
        let ctx = ValidationContext::new(b"<a><b></a>");
        assert_eq!(check_wellformedness(&ctx).len(), 1);
    }
}
