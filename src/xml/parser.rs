//! Single-pass XBRL-XML instance parser, built on `quick-xml`'s pull reader.
//!
//! `quick-xml` does not resolve namespaces itself, so the parser maintains its
//! own stack of `(prefix → uri)` scopes, pushed on `Start` and popped on `End`,
//! matching the spec's requirement to resolve `prefix:local` strings against
//! "the nsmap observed at the resolving element".

use std::collections::BTreeMap;

use chrono::NaiveDate;
use indexmap::IndexMap;
use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::{Error, Result};

use super::model::{
    Context, Decimals, DimensionValue, Fact, FilingIndicator, Instance, Scenario, Unit, UnitExpr,
};

const XBRLI_NS: &str = "http://www.xbrl.org/2003/instance";
const LINK_NS: &str = "http://www.xbrl.org/2003/linkbase";
const FIND_NS: &str = "http://www.eurofiling.info/xbrl/ext/filing-indicators";

/// Namespaces of infrastructure elements — direct root children in one of
/// these namespaces are not facts.
fn is_infra_ns(ns: &str) -> bool {
    matches!(ns, XBRLI_NS | LINK_NS | FIND_NS)
}

/// The namespace map observed at the root element, used by rules that check
/// for redundant or missing local declarations. Preserved alongside the parsed
/// instance for rules that need it (not part of [`Instance`] itself, since the
/// data model §3 does not mention it as instance-owned state).
#[derive(Debug, Clone, Default)]
pub struct RootNamespaces {
    /// Prefix (empty string for the default namespace) → URI, as bound at the
    /// document root element.
    pub bindings: BTreeMap<String, String>,
}

struct Scope {
    bindings: BTreeMap<String, String>,
}

struct NsStack(Vec<Scope>);

impl NsStack {
    fn new() -> Self {
        Self(vec![Scope {
            bindings: BTreeMap::new(),
        }])
    }

    fn push(&mut self, bindings: BTreeMap<String, String>) {
        self.0.push(Scope { bindings });
    }

    fn pop(&mut self) {
        self.0.pop();
    }

    fn resolve_prefix(&self, prefix: &str) -> Option<&str> {
        self.0
            .iter()
            .rev()
            .find_map(|scope| scope.bindings.get(prefix))
            .map(String::as_str)
    }

    /// Resolves a `prefix:local` or bare `local` QName string to `(uri, local)`.
    fn resolve_qname(&self, qname: &str) -> Option<(String, String)> {
        match qname.split_once(':') {
            Some((prefix, local)) => self
                .resolve_prefix(prefix)
                .map(|uri| (uri.to_string(), local.to_string())),
            None => self
                .resolve_prefix("")
                .map(|uri| (uri.to_string(), qname.to_string())),
        }
    }

    fn flattened(&self) -> BTreeMap<String, String> {
        let mut out = BTreeMap::new();
        for scope in &self.0 {
            out.extend(scope.bindings.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        out
    }
}

fn byte_pos_to_line_col(bytes: &[u8], pos: usize) -> (u64, u64) {
    let pos = pos.min(bytes.len());
    let mut line = 1u64;
    let mut col = 1u64;
    for &b in &bytes[..pos] {
        if b == b'\n' {
            line += 1;
            col = 1;
        } else {
            col += 1;
        }
    }
    (line, col)
}

fn extract_scope_bindings(attrs_raw: &[(Vec<u8>, Vec<u8>)]) -> BTreeMap<String, String> {
    let mut bindings = BTreeMap::new();
    for (key, value) in attrs_raw {
        let key = String::from_utf8_lossy(key);
        let value = String::from_utf8_lossy(value).into_owned();
        if key.as_ref() == "xmlns" {
            bindings.insert(String::new(), value);
        } else if let Some(prefix) = key.strip_prefix("xmlns:") {
            bindings.insert(prefix.to_string(), value);
        }
    }
    bindings
}

/// Parses `bytes` as an XBRL-XML instance document.
///
/// # Errors
///
/// Returns [`Error::FatalParse`] when the document is not well-formed, when
/// the schema reference is missing/duplicated, when a context has anything
/// other than exactly one `instant` period, or when a filing indicator's
/// `filed` value is not one of `{true, false, 0, 1}`.
pub fn parse_instance(bytes: &[u8]) -> Result<(Instance, RootNamespaces)> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| Error::fatal_parse(format!("document is not valid UTF-8: {e}")))?;

    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);

    let mut ns = NsStack::new();
    let mut root_namespaces = RootNamespaces::default();
    let mut schema_ref: Option<String> = None;
    let mut contexts: IndexMap<String, Context> = IndexMap::new();
    let mut units: IndexMap<String, Unit> = IndexMap::new();
    let mut facts = Vec::new();
    let mut filing_indicators = Vec::new();

    let mut depth: u32 = 0;
    let mut seen_root = false;

    loop {
        let pos = reader.buffer_position() as usize;
        let event = reader.read_event().map_err(|e| {
            let (line, col) = byte_pos_to_line_col(bytes, pos);
            Error::fatal_parse_at(format!("XML syntax error: {e}"), line, col)
        })?;

        match event {
            Event::Eof => break,
            Event::Start(ref e) | Event::Empty(ref e) => {
                let is_empty = matches!(event, Event::Empty(_));
                let raw_attrs: Vec<(Vec<u8>, Vec<u8>)> = e
                    .attributes()
                    .flatten()
                    .map(|a| (a.key.as_ref().to_vec(), a.value.to_vec()))
                    .collect();
                let scope_bindings = extract_scope_bindings(&raw_attrs);
                ns.push(scope_bindings);

                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                let resolved = ns.resolve_qname(&name);

                if !seen_root {
                    seen_root = true;
                    root_namespaces.bindings = ns.flattened();
                    if resolved.as_ref().map(|(u, l)| (u.as_str(), l.as_str()))
                        != Some((XBRLI_NS, "xbrl"))
                    {
                        return Err(Error::fatal_parse(format!(
                            "root element must be {{{XBRLI_NS}}}xbrl, found {name}"
                        )));
                    }
                } else if depth == 1 {
                    handle_top_level_child(
                        &resolved,
                        &raw_attrs,
                        &ns,
                        &mut reader,
                        is_empty,
                        &mut schema_ref,
                        &mut contexts,
                        &mut units,
                        &mut facts,
                        &mut filing_indicators,
                    )?;
                }

                depth += 1;
                if is_empty {
                    depth -= 1;
                    ns.pop();
                }
            }
            Event::End(_) => {
                depth = depth.saturating_sub(1);
                ns.pop();
            }
            _ => {}
        }
    }

    let schema_ref = schema_ref
        .ok_or_else(|| Error::fatal_parse("missing or multiply-declared link:schemaRef"))?;

    Ok((
        Instance {
            schema_ref,
            contexts,
            units,
            facts,
            filing_indicators,
        },
        root_namespaces,
    ))
}

#[allow(clippy::too_many_arguments)]
fn handle_top_level_child(
    resolved: &Option<(String, String)>,
    raw_attrs: &[(Vec<u8>, Vec<u8>)],
    ns: &NsStack,
    reader: &mut Reader<&[u8]>,
    is_empty: bool,
    schema_ref: &mut Option<String>,
    contexts: &mut IndexMap<String, Context>,
    units: &mut IndexMap<String, Unit>,
    facts: &mut Vec<Fact>,
    filing_indicators: &mut Vec<FilingIndicator>,
) -> Result<()> {
    let Some((uri, local)) = resolved.clone() else {
        return Ok(());
    };

    let get_attr = |name: &str| -> Option<String> {
        raw_attrs.iter().find_map(|(k, v)| {
            (String::from_utf8_lossy(k).as_ref() == name)
                .then(|| String::from_utf8_lossy(v).into_owned())
        })
    };

    match (uri.as_str(), local.as_str()) {
        (LINK_NS, "schemaRef") => {
            let href = get_attr("xlink:href")
                .ok_or_else(|| Error::fatal_parse("link:schemaRef missing xlink:href"))?;
            if schema_ref.is_some() {
                return Err(Error::fatal_parse("multiple link:schemaRef elements"));
            }
            *schema_ref = Some(href);
        }
        (XBRLI_NS, "context") => {
            let id = get_attr("id")
                .ok_or_else(|| Error::fatal_parse("xbrli:context missing @id"))?;
            if !is_empty {
                let ctx = parse_context(reader, ns, &id)?;
                contexts.insert(id, ctx);
            }
        }
        (XBRLI_NS, "unit") => {
            let id = get_attr("id").ok_or_else(|| Error::fatal_parse("xbrli:unit missing @id"))?;
            if !is_empty {
                let unit = parse_unit(reader, &id)?;
                units.insert(id, unit);
            }
        }
        (FIND_NS, "filingIndicators") => {
            // Children are read in subsequent top-level-child calls only when
            // this element itself is depth 1; filingIndicator entries are one
            // level deeper, so parse them eagerly here.
            if !is_empty {
                parse_filing_indicators(reader, filing_indicators)?;
            }
        }
        _ if !is_infra_ns(&uri) => {
            let context_id = get_attr("contextRef").unwrap_or_default();
            let unit_id = get_attr("unitRef");
            let decimals = get_attr("decimals").and_then(|raw| Decimals::parse(&raw));
            let value = if is_empty {
                String::new()
            } else {
                read_text_until_end(reader)?
            };
            facts.push(Fact {
                element_qname: format!("{{{uri}}}{local}"),
                context_id,
                unit_id,
                decimals,
                value,
            });
        }
        _ => {}
    }

    Ok(())
}

fn read_text_until_end(reader: &mut Reader<&[u8]>) -> Result<String> {
    let mut text = String::new();
    loop {
        match reader
            .read_event()
            .map_err(|e| Error::fatal_parse(format!("XML syntax error: {e}")))?
        {
            Event::Text(t) => {
                text.push_str(&t.unescape().unwrap_or_default());
            }
            Event::CData(t) => {
                text.push_str(&String::from_utf8_lossy(t.as_ref()));
            }
            Event::End(_) => break,
            Event::Eof => {
                return Err(Error::fatal_parse("unexpected end of document"));
            }
            _ => {}
        }
    }
    Ok(text)
}

fn parse_context(reader: &mut Reader<&[u8]>, ns: &NsStack, id: &str) -> Result<Context> {
    let mut entity_identifier: Option<(String, String)> = None;
    let mut instant: Option<NaiveDate> = None;
    let mut scenario = Scenario::default();
    let mut stack_depth = 0u32;

    loop {
        match reader
            .read_event()
            .map_err(|e| Error::fatal_parse(format!("XML syntax error: {e}")))?
        {
            Event::Start(e) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                let resolved = ns.resolve_qname(&name);
                stack_depth += 1;
                if let Some((uri, local)) = resolved {
                    if uri == XBRLI_NS && local == "identifier" {
                        let scheme = e
                            .attributes()
                            .flatten()
                            .find(|a| a.key.as_ref() == b"scheme")
                            .map(|a| String::from_utf8_lossy(&a.value).into_owned())
                            .unwrap_or_default();
                        let value = read_text_until_end(reader)?;
                        entity_identifier = Some((scheme, value.trim().to_string()));
                        stack_depth -= 1;
                    } else if uri == XBRLI_NS && local == "instant" {
                        let text = read_text_until_end(reader)?;
                        instant = Some(NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d").map_err(
                            |_| Error::fatal_parse(format!("invalid instant date '{text}'")),
                        )?);
                        stack_depth -= 1;
                    } else if uri == XBRLI_NS && (local == "startDate" || local == "endDate") {
                        return Err(Error::fatal_parse(format!(
                            "context '{id}' uses a duration period; only instant is supported"
                        )));
                    } else if local == "explicitMember" {
                        let dimension = e
                            .attributes()
                            .flatten()
                            .find(|a| a.key.as_ref() == b"dimension")
                            .map(|a| String::from_utf8_lossy(&a.value).into_owned())
                            .unwrap_or_default();
                        let member = read_text_until_end(reader)?;
                        scenario.dimensions.insert(
                            dimension,
                            DimensionValue::Explicit(member.trim().to_string()),
                        );
                        stack_depth -= 1;
                    } else if local == "typedMember" {
                        let dimension = e
                            .attributes()
                            .flatten()
                            .find(|a| a.key.as_ref() == b"dimension")
                            .map(|a| String::from_utf8_lossy(&a.value).into_owned())
                            .unwrap_or_default();
                        let content = read_inner_xml_until_end(reader)?;
                        scenario
                            .dimensions
                            .insert(dimension, DimensionValue::Typed(content));
                        stack_depth -= 1;
                    }
                }
            }
            Event::End(_) => {
                if stack_depth == 0 {
                    break;
                }
                stack_depth -= 1;
            }
            Event::Eof => return Err(Error::fatal_parse("unexpected end of document")),
            _ => {}
        }
    }

    let entity_identifier = entity_identifier
        .ok_or_else(|| Error::fatal_parse(format!("context '{id}' missing entity identifier")))?;
    let instant =
        instant.ok_or_else(|| Error::fatal_parse(format!("context '{id}' missing instant period")))?;

    Ok(Context {
        id: id.to_string(),
        entity_identifier,
        instant,
        scenario,
    })
}

/// Reads the raw inner XML of a typed-member element verbatim (used because
/// typed dimension content is captured as-is, not re-parsed).
fn read_inner_xml_until_end(reader: &mut Reader<&[u8]>) -> Result<String> {
    let mut depth = 0i32;
    let mut out = String::new();
    loop {
        match reader
            .read_event()
            .map_err(|e| Error::fatal_parse(format!("XML syntax error: {e}")))?
        {
            Event::Start(e) => {
                depth += 1;
                out.push_str(&String::from_utf8_lossy(&e.to_owned().into_inner()));
            }
            Event::Text(t) | Event::CData(t) => {
                out.push_str(&t.unescape().unwrap_or_default());
            }
            Event::End(e) => {
                if depth == 0 {
                    break;
                }
                depth -= 1;
                out.push_str(&String::from_utf8_lossy(&e.to_owned().into_inner()));
            }
            Event::Eof => return Err(Error::fatal_parse("unexpected end of document")),
            _ => {}
        }
    }
    Ok(out)
}

fn parse_unit(reader: &mut Reader<&[u8]>, id: &str) -> Result<Unit> {
    let mut measures: Vec<String> = Vec::new();
    let mut numerator: Vec<String> = Vec::new();
    let mut denominator: Vec<String> = Vec::new();
    let mut in_divide = false;
    let mut in_numerator = false;
    let mut in_denominator = false;
    let mut stack_depth = 0u32;

    loop {
        match reader
            .read_event()
            .map_err(|e| Error::fatal_parse(format!("XML syntax error: {e}")))?
        {
            Event::Start(e) => {
                stack_depth += 1;
                let local = local_name(&e);
                match local.as_str() {
                    "divide" => in_divide = true,
                    "unitNumerator" => in_numerator = true,
                    "unitDenominator" => in_denominator = true,
                    "measure" => {
                        let text = read_text_until_end(reader)?.trim().to_string();
                        stack_depth -= 1;
                        if in_numerator {
                            numerator.push(text);
                        } else if in_denominator {
                            denominator.push(text);
                        } else {
                            measures.push(text);
                        }
                    }
                    _ => {}
                }
            }
            Event::End(e) => {
                if stack_depth == 0 {
                    break;
                }
                stack_depth -= 1;
                match local_name(&e).as_str() {
                    "unitNumerator" => in_numerator = false,
                    "unitDenominator" => in_denominator = false,
                    _ => {}
                }
            }
            Event::Eof => return Err(Error::fatal_parse("unexpected end of document")),
            _ => {}
        }
    }

    let expr = if in_divide || !numerator.is_empty() || !denominator.is_empty() {
        numerator.sort();
        denominator.sort();
        UnitExpr::Divide {
            numerator,
            denominator,
        }
    } else {
        measures.sort();
        UnitExpr::Simple(measures)
    };

    Ok(Unit {
        id: id.to_string(),
        expr,
    })
}

fn local_name(e: &quick_xml::events::BytesStart<'_>) -> String {
    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
    match name.split_once(':') {
        Some((_, local)) => local.to_string(),
        None => name,
    }
}

fn parse_filing_indicators(
    reader: &mut Reader<&[u8]>,
    out: &mut Vec<FilingIndicator>,
) -> Result<()> {
    let mut stack_depth = 0u32;
    loop {
        match reader
            .read_event()
            .map_err(|e| Error::fatal_parse(format!("XML syntax error: {e}")))?
        {
            Event::Start(e) => {
                stack_depth += 1;
                if local_name(&e) == "filingIndicator" {
                    let filed_attr = e
                        .attributes()
                        .flatten()
                        .find(|a| a.key.as_ref() == b"filed")
                        .map(|a| String::from_utf8_lossy(&a.value).into_owned());
                    let table_code = read_text_until_end(reader)?.trim().to_string();
                    stack_depth -= 1;
                    let filed = match filed_attr.as_deref() {
                        None | Some("true") | Some("1") => true,
                        Some("false") | Some("0") => false,
                        Some(other) => {
                            return Err(Error::fatal_parse(format!(
                                "filing indicator '{table_code}' has invalid @filed value '{other}'"
                            )));
                        }
                    };
                    out.push(FilingIndicator { table_code, filed });
                }
            }
            Event::End(_) => {
                if stack_depth == 0 {
                    break;
                }
                stack_depth -= 1;
            }
            Event::Eof => return Err(Error::fatal_parse("unexpected end of document")),
            _ => {}
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<xbrli:xbrl xmlns:xbrli="http://www.xbrl.org/2003/instance"
            xmlns:link="http://www.xbrl.org/2003/linkbase"
            xmlns:xlink="http://www.w3.org/1999/xlink"
            xmlns:find="http://www.eurofiling.info/xbrl/ext/filing-indicators"
            xmlns:iso4217="http://www.xbrl.org/2003/iso4217"
            xmlns:eba_met="http://www.eba.europa.eu/met">
  <link:schemaRef xlink:href="https://example.org/mod/foo.xsd"/>
  <xbrli:context id="c1">
    <xbrli:entity>
      <xbrli:identifier scheme="http://standards.iso.org/iso/17442">529900T8BM49AURSDO55</xbrli:identifier>
    </xbrli:entity>
    <xbrli:period>
      <xbrli:instant>2024-12-31</xbrli:instant>
    </xbrli:period>
  </xbrli:context>
  <xbrli:unit id="u1">
    <xbrli:measure>iso4217:EUR</xbrli:measure>
  </xbrli:unit>
  <find:filingIndicators>
    <find:filingIndicator filed="true">R_01.00</find:filingIndicator>
  </find:filingIndicators>
  <eba_met:ii774 contextRef="c1" unitRef="u1" decimals="2">100.00</eba_met:ii774>
</xbrli:xbrl>
"#;

    #[test]
    fn parses_sample_instance() {
        let (instance, ns) = parse_instance(SAMPLE.as_bytes()).unwrap();
        assert_eq!(instance.schema_ref, "https://example.org/mod/foo.xsd");
        assert_eq!(instance.contexts.len(), 1);
        assert_eq!(instance.units.len(), 1);
        assert_eq!(instance.facts.len(), 1);
        assert_eq!(instance.filing_indicators.len(), 1);
        assert!(instance.filing_indicators[0].filed);
        assert_eq!(instance.facts[0].decimals, Some(Decimals::Value(2)));
        assert!(ns.bindings.contains_key("xbrli"));
    }

    #[test]
    fn rejects_wrong_root_element() {
        let bad = SAMPLE.replace("xbrli:xbrl", "xbrli:notxbrl");
        assert!(parse_instance(bad.as_bytes()).is_err());
    }

    #[test]
    fn rejects_invalid_filed_value() {
        let bad = SAMPLE.replace(r#"filed="true""#, r#"filed="yes""#);
        assert!(parse_instance(bad.as_bytes()).is_err());
    }

    #[test]
    fn rejects_duration_period() {
        let bad = SAMPLE.replace(
            "<xbrli:instant>2024-12-31</xbrli:instant>",
            "<xbrli:startDate>2024-01-01</xbrli:startDate><xbrli:endDate>2024-12-31</xbrli:endDate>",
        );
        assert!(parse_instance(bad.as_bytes()).is_err());
    }
}
