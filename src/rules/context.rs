//! The per-invocation [`ValidationContext`] and its shared, lazily-computed
//! single-pass tree scans.
//!
//! The engine builds one `ValidationContext` per validated artefact and
//! passes it by reference to every selected rule; scans are computed once,
//! on first access, and shared by every rule that needs them (§4.G).

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::rc::Rc;

use eba_taxonomy::Module;
use once_cell_scans::OnceCell;
use regex::Regex;

use crate::xml::{DimensionValue, Instance, RootNamespaces};

/// Tiny local `OnceCell`-alike so this module doesn't need the `once_cell`
/// crate just for single-slot lazy fields (the scans are `Rc`-cached, not
/// behind interior mutability elsewhere in the crate, so a dependency purely
/// for this would be disproportionate).
mod once_cell_scans {
    use std::cell::RefCell;

    /// A single-slot lazily-initialised cache.
    #[derive(Debug, Default)]
    pub struct OnceCell<T>(RefCell<Option<T>>);

    impl<T: Clone> OnceCell<T> {
        pub fn new() -> Self {
            Self(RefCell::new(None))
        }

        pub fn get_or_init(&self, init: impl FnOnce() -> T) -> T {
            if let Some(value) = self.0.borrow().as_ref() {
                return value.clone();
            }
            let value = init();
            *self.0.borrow_mut() = Some(value.clone());
            value
        }
    }
}

/// Context/unit inventory, document-hygiene flags, comment/footnote counts —
/// everything that requires walking the whole document once (§4.G: document scan).
#[derive(Debug, Clone, Default)]
pub struct DocumentScan {
    /// Context ids with no referencing fact.
    pub unused_contexts: Vec<String>,
    /// `(duplicate_id, original_id)` pairs sharing the same canonical key.
    pub duplicate_contexts: Vec<(String, String)>,
    /// Unit ids with no referencing fact.
    pub unused_units: Vec<String>,
    /// `(duplicate_id, original_id)` pairs sharing the same canonical key.
    pub duplicate_units: Vec<(String, String)>,
    /// Number of `<!--` XML comments found in the raw document.
    pub comment_count: usize,
    /// Number of `link:footnoteLink` elements found in the raw document.
    pub footnote_link_count: usize,
    /// Whether any element carries an `xml:base` attribute.
    pub has_xml_base: bool,
    /// Whether any `link:linkbaseRef` element is present.
    pub has_linkbase_ref: bool,
    /// Whether any context uses `xbrli:forever`.
    pub has_forever: bool,
    /// Whether any element carries `xsi:schemaLocation`.
    pub has_schema_location: bool,
    /// Whether any element carries `xsi:noNamespaceSchemaLocation`.
    pub has_no_namespace_schema_location: bool,
    /// Whether any `xi:include` element is present.
    pub has_xi_include: bool,
    /// Whether the document declares `standalone="..."`.
    pub has_standalone: bool,
}

/// Per-context usage, built from facts and the parsed contexts (§4.G: context scan).
#[derive(Debug, Clone, Default)]
pub struct ContextScan {
    /// Context id → number of referencing facts.
    pub fact_counts: BTreeMap<String, usize>,
}

/// Precision/decimals/nil/empty-string observations (§4.G: facts scan).
///
/// Precision and `xsi:nil` are not represented in the typed [`crate::xml::Fact`]
/// model (the parser only captures the attributes conversion needs), so this
/// scan recovers them with a direct regex pass over the raw document, mirroring
/// what the source's full-tree scan would see.
#[derive(Debug, Clone, Default)]
pub struct FactsScan {
    /// Element local names observed with a `@precision` attribute.
    pub facts_with_precision: Vec<String>,
    /// Element local names observed with `xsi:nil="true"`.
    pub facts_with_nil: Vec<String>,
}

/// Namespace usage across the document (§4.G: namespace scan).
#[derive(Debug, Clone, Default)]
pub struct NamespaceScan {
    /// Prefix → URI, as bound at the root element.
    pub bindings: BTreeMap<String, String>,
    /// URI → prefixes bound to it (fan-out detection).
    pub uri_to_prefixes: BTreeMap<String, Vec<String>>,
    /// Prefixes whose bound URI is referenced by at least one fact, unit
    /// measure, or dimension/member value.
    pub used_prefixes: Vec<String>,
}

fn canonical_key(measures_or_dims: &str) -> String {
    measures_or_dims.to_string()
}

fn build_document_scan(instance: Option<&Instance>, raw_text: &str) -> DocumentScan {
    let mut scan = DocumentScan {
        comment_count: raw_text.matches("<!--").count(),
        footnote_link_count: raw_text.matches("footnoteLink").count(),
        has_xml_base: raw_text.contains("xml:base"),
        has_linkbase_ref: raw_text.contains("linkbaseRef"),
        has_forever: raw_text.contains("xbrli:forever") || raw_text.contains(":forever>"),
        has_schema_location: raw_text.contains("xsi:schemaLocation"),
        has_no_namespace_schema_location: raw_text.contains("xsi:noNamespaceSchemaLocation"),
        has_xi_include: raw_text.contains("xi:include"),
        has_standalone: raw_text.contains("standalone=\"yes\"") || raw_text.contains("standalone='yes'"),
        ..Default::default()
    };

    let Some(instance) = instance else {
        return scan;
    };

    let mut fact_context_refs: BTreeMap<&str, usize> = BTreeMap::new();
    let mut fact_unit_refs: BTreeMap<&str, usize> = BTreeMap::new();
    for fact in &instance.facts {
        *fact_context_refs.entry(fact.context_id.as_str()).or_insert(0) += 1;
        if let Some(unit_id) = &fact.unit_id {
            *fact_unit_refs.entry(unit_id.as_str()).or_insert(0) += 1;
        }
    }

    let mut seen_context_keys: BTreeMap<String, String> = BTreeMap::new();
    for (id, context) in &instance.contexts {
        if !fact_context_refs.contains_key(id.as_str()) {
            scan.unused_contexts.push(id.clone());
        }
        let mut dims: Vec<String> = context
            .scenario
            .dimensions
            .iter()
            .map(|(k, v)| {
                format!(
                    "{k}={}",
                    match v {
                        DimensionValue::Explicit(m) => m.clone(),
                        DimensionValue::Typed(t) => t.clone(),
                    }
                )
            })
            .collect();
        dims.sort();
        let key = canonical_key(&format!(
            "{}|{}|{}",
            context.entity_identifier.1,
            context.instant,
            dims.join(",")
        ));
        if let Some(original) = seen_context_keys.get(&key) {
            scan.duplicate_contexts.push((id.clone(), original.clone()));
        } else {
            seen_context_keys.insert(key, id.clone());
        }
    }

    let mut seen_unit_keys: BTreeMap<String, String> = BTreeMap::new();
    for (id, unit) in &instance.units {
        if !fact_unit_refs.contains_key(id.as_str()) {
            scan.unused_units.push(id.clone());
        }
        let key = format!("{:?}", unit.expr);
        if let Some(original) = seen_unit_keys.get(&key) {
            scan.duplicate_units.push((id.clone(), original.clone()));
        } else {
            seen_unit_keys.insert(key, id.clone());
        }
    }

    scan
}

fn build_context_scan(instance: Option<&Instance>) -> ContextScan {
    let mut scan = ContextScan::default();
    let Some(instance) = instance else {
        return scan;
    };
    for fact in &instance.facts {
        *scan.fact_counts.entry(fact.context_id.clone()).or_insert(0) += 1;
    }
    scan
}

fn precision_regex() -> Regex {
    Regex::new(r"<([A-Za-z_][\w.:-]*)[^>]*\bprecision\s*=").expect("valid regex")
}

fn nil_regex() -> Regex {
    Regex::new(r#"<([A-Za-z_][\w.:-]*)[^>]*\bxsi:nil\s*=\s*"true""#).expect("valid regex")
}

fn build_facts_scan(raw_text: &str) -> FactsScan {
    FactsScan {
        facts_with_precision: precision_regex()
            .captures_iter(raw_text)
            .map(|c| c[1].to_string())
            .collect(),
        facts_with_nil: nil_regex()
            .captures_iter(raw_text)
            .map(|c| c[1].to_string())
            .collect(),
    }
}

const CANONICAL_PREFIXES: &[(&str, &str)] = &[
    ("http://www.xbrl.org/2003/instance", "xbrli"),
    ("http://www.xbrl.org/2003/linkbase", "link"),
    ("http://www.w3.org/1999/xlink", "xlink"),
    ("http://www.w3.org/2001/XMLSchema-instance", "xsi"),
    ("http://www.eurofiling.info/xbrl/ext/filing-indicators", "find"),
    ("http://xbrl.org/2006/xbrldi", "xbrldi"),
    ("http://www.xbrl.org/2003/iso4217", "iso4217"),
];

fn build_namespace_scan(instance: Option<&Instance>, root_namespaces: Option<&RootNamespaces>) -> NamespaceScan {
    let mut scan = NamespaceScan::default();
    let Some(root_namespaces) = root_namespaces else {
        return scan;
    };
    scan.bindings = root_namespaces.bindings.clone();

    for (prefix, uri) in &scan.bindings {
        scan.uri_to_prefixes
            .entry(uri.clone())
            .or_default()
            .push(prefix.clone());
    }

    let Some(instance) = instance else {
        return scan;
    };

    let mut used_uris: Vec<&str> = Vec::new();
    for fact in &instance.facts {
        if let Some(uri) = fact
            .element_qname
            .strip_prefix('{')
            .and_then(|s| s.split_once('}'))
            .map(|(uri, _)| uri)
        {
            used_uris.push(uri);
        }
    }

    let mut used_prefix_literals: Vec<&str> = Vec::new();
    for unit in instance.units.values() {
        match &unit.expr {
            crate::xml::UnitExpr::Simple(measures) => {
                for m in measures {
                    if let Some((prefix, _)) = m.split_once(':') {
                        used_prefix_literals.push(prefix);
                    }
                }
            }
            crate::xml::UnitExpr::Divide { numerator, denominator } => {
                for m in numerator.iter().chain(denominator) {
                    if let Some((prefix, _)) = m.split_once(':') {
                        used_prefix_literals.push(prefix);
                    }
                }
            }
        }
    }
    for context in instance.contexts.values() {
        for value in context.scenario.dimensions.values() {
            if let DimensionValue::Explicit(m) = value {
                if let Some((prefix, _)) = m.split_once(':') {
                    used_prefix_literals.push(prefix);
                }
            }
        }
    }

    for (prefix, uri) in &scan.bindings {
        let used_by_uri = used_uris.contains(&uri.as_str());
        let used_by_literal = used_prefix_literals.contains(&prefix.as_str());
        if used_by_uri || used_by_literal {
            scan.used_prefixes.push(prefix.clone());
        }
    }

    scan
}

/// The per-rule-invocation context: the parsed artefacts plus shared,
/// lazily-computed single-pass scans.
pub struct ValidationContext<'a> {
    /// The file path the artefact was read from, when known.
    pub file_path: Option<PathBuf>,
    /// The artefact's raw bytes, always available.
    pub raw_bytes: &'a [u8],
    /// The parsed instance, when parsing succeeded.
    pub instance: Option<&'a Instance>,
    /// The namespace bindings observed at the document root, when parsing succeeded.
    pub root_namespaces: Option<&'a RootNamespaces>,
    /// The loaded taxonomy module, when the schema reference resolved to one.
    pub module: Option<&'a Module>,
    /// The path to the ZIP archive, when validating a CSV package.
    pub zip_path: Option<PathBuf>,

    document_scan: OnceCell<Rc<DocumentScan>>,
    context_scan: OnceCell<Rc<ContextScan>>,
    facts_scan: OnceCell<Rc<FactsScan>>,
    namespace_scan: OnceCell<Rc<NamespaceScan>>,
}

impl<'a> ValidationContext<'a> {
    /// Builds a new context over `raw_bytes`, with optional parsed artefacts.
    #[must_use]
    pub fn new(raw_bytes: &'a [u8]) -> Self {
        Self {
            file_path: None,
            raw_bytes,
            instance: None,
            root_namespaces: None,
            module: None,
            zip_path: None,
            document_scan: OnceCell::new(),
            context_scan: OnceCell::new(),
            facts_scan: OnceCell::new(),
            namespace_scan: OnceCell::new(),
        }
    }

    fn raw_text(&self) -> std::borrow::Cow<'a, str> {
        String::from_utf8_lossy(self.raw_bytes)
    }

    /// Returns the cached document scan, computing it on first access.
    pub fn document_scan(&self) -> Rc<DocumentScan> {
        self.document_scan
            .get_or_init(|| Rc::new(build_document_scan(self.instance, &self.raw_text())))
    }

    /// Returns the cached context scan, computing it on first access.
    pub fn context_scan(&self) -> Rc<ContextScan> {
        self.context_scan
            .get_or_init(|| Rc::new(build_context_scan(self.instance)))
    }

    /// Returns the cached facts scan, computing it on first access.
    pub fn facts_scan(&self) -> Rc<FactsScan> {
        self.facts_scan
            .get_or_init(|| Rc::new(build_facts_scan(&self.raw_text())))
    }

    /// Returns the cached namespace scan, computing it on first access.
    pub fn namespace_scan(&self) -> Rc<NamespaceScan> {
        self.namespace_scan.get_or_init(|| {
            Rc::new(build_namespace_scan(self.instance, self.root_namespaces))
        })
    }
}

/// Canonical prefixes for well-known XBRL namespaces, used by EBA-GUIDE-002.
#[must_use]
pub fn canonical_prefix_for(uri: &str) -> Option<&'static str> {
    CANONICAL_PREFIXES
        .iter()
        .find(|(u, _)| *u == uri)
        .map(|(_, p)| *p)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_scan_is_cached_across_calls() {
        let ctx = ValidationContext::new(b"<!-- a --><!-- b -->");
        let first = ctx.document_scan();
        let second = ctx.document_scan();
        assert!(Rc::ptr_eq(&first, &second));
        assert_eq!(first.comment_count, 2);
    }

    #[test]
    fn facts_scan_detects_precision_and_nil() {
        let ctx = ValidationContext::new(
            br#"<eba_met:ii774 precision="2">1</eba_met:ii774><eba_met:ii775 xsi:nil="true"/>"#,
        );
        let scan = ctx.facts_scan();
        assert_eq!(scan.facts_with_precision, vec!["eba_met:ii774"]);
        assert_eq!(scan.facts_with_nil, vec!["eba_met:ii775"]);
    }
}
