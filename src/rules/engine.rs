//! The validation engine: detects the rule set, parses once, loads the
//! taxonomy module, and dispatches every selected rule over one shared
//! [`ValidationContext`].

use std::io::Read;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};

use eba_taxonomy::ModuleLoader;

use crate::config::Config;
use crate::error::Result;
use crate::xml::{parse_instance, Instance, RootNamespaces};

use super::catalog::{render_template, RuleCatalog};
use super::context::ValidationContext;
use super::finding::{Finding, FindingCollection, RuleSet, Severity};
use super::registry::RuleRegistry;

/// Detects whether `path`/`bytes` is an XBRL-XML instance or an XBRL-CSV package.
///
/// # Errors
///
/// Returns [`crate::error::Error::CorruptPackage`] when a `.zip` archive is
/// neither a recognisable CSV package nor a single wrapped `.xbrl`/`.xml` file.
pub fn detect_rule_set(path: &Path, bytes: &[u8]) -> Result<RuleSet> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("xbrl" | "xml") => return Ok(RuleSet::Xml),
        Some("zip") => {}
        _ => {
            return Err(crate::error::Error::corrupt_package(
                "unrecognised file extension for rule-set detection",
            ))
        }
    }

    let reader = std::io::Cursor::new(bytes);
    let mut archive = zip::ZipArchive::new(reader)
        .map_err(|e| crate::error::Error::corrupt_package(format!("not a valid zip: {e}")))?;

    let has_report_json = (0..archive.len()).any(|i| {
        archive
            .by_index(i)
            .map(|f| f.name().ends_with("reports/report.json"))
            .unwrap_or(false)
    });
    if has_report_json {
        return Ok(RuleSet::Csv);
    }

    let xbrl_entries: Vec<String> = (0..archive.len())
        .filter_map(|i| {
            archive.by_index(i).ok().and_then(|f| {
                let name = f.name().to_string();
                (name.ends_with(".xbrl") || name.ends_with(".xml")).then_some(name)
            })
        })
        .collect();
    if xbrl_entries.len() == 1 {
        return Ok(RuleSet::Xml);
    }

    Err(crate::error::Error::corrupt_package(
        "zip archive is neither a recognisable XBRL-CSV package nor a single wrapped instance",
    ))
}

fn single_xbrl_entry(bytes: &[u8]) -> Result<Vec<u8>> {
    let reader = std::io::Cursor::new(bytes);
    let mut archive = zip::ZipArchive::new(reader)
        .map_err(|e| crate::error::Error::corrupt_package(format!("not a valid zip: {e}")))?;
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let name = entry.name().to_string();
        if name.ends_with(".xbrl") || name.ends_with(".xml") {
            let mut content = Vec::new();
            entry.read_to_end(&mut content)?;
            return Ok(content);
        }
    }
    Err(crate::error::Error::corrupt_package(
        "no wrapped .xbrl/.xml entry found",
    ))
}

/// Runs the full rule-registry dispatch over one artefact.
pub struct Validator {
    registry: RuleRegistry,
    catalog: RuleCatalog,
    taxonomy_catalog_dir: Option<PathBuf>,
}

impl Validator {
    /// Builds a validator with every built-in rule registered and the embedded
    /// catalog loaded. `taxonomy_catalog_dir`, when given, is used to load the
    /// module a validated instance's schema reference points at.
    #[must_use]
    pub fn new(taxonomy_catalog_dir: Option<PathBuf>) -> Self {
        Self {
            registry: RuleRegistry::with_defaults(),
            catalog: RuleCatalog::embedded(),
            taxonomy_catalog_dir,
        }
    }

    /// Validates `bytes` (read from `path`, used for extension-based rule-set
    /// detection and filename-based naming rules) under `config`.
    ///
    /// A rule implementation that panics does not abort the run: the panic is
    /// caught and degrades to a synthetic [`Severity::Info`] finding under
    /// that rule's code, and the remaining rules still run.
    ///
    /// # Errors
    ///
    /// Returns an error only when the rule set cannot be detected at all; a
    /// failure to parse the artefact itself is tolerated and surfaced as
    /// findings from rules that can still run against raw bytes.
    pub fn run_validation(
        &self,
        path: &Path,
        bytes: &[u8],
        config: &Config,
    ) -> Result<FindingCollection> {
        let rule_set = detect_rule_set(path, bytes)?;

        let xml_bytes: Option<Vec<u8>> = match rule_set {
            RuleSet::Xml if path.extension().and_then(|e| e.to_str()) == Some("zip") => {
                single_xbrl_entry(bytes).ok()
            }
            RuleSet::Xml => Some(bytes.to_vec()),
            RuleSet::Csv => None,
        };

        let parsed: Option<(Instance, RootNamespaces)> = xml_bytes
            .as_deref()
            .and_then(|b| parse_instance(b).ok());

        let module = parsed.as_ref().and_then(|(instance, _)| {
            self.taxonomy_catalog_dir.as_ref().and_then(|dir| {
                ModuleLoader::from_catalog_dir(dir)
                    .ok()?
                    .load(&instance.schema_ref)
                    .ok()?
            })
        });

        let mut ctx = ValidationContext::new(xml_bytes.as_deref().unwrap_or(bytes));
        ctx.file_path = Some(path.to_path_buf());
        if rule_set == RuleSet::Csv {
            ctx.zip_path = Some(path.to_path_buf());
        }
        if let Some((instance, ns)) = &parsed {
            ctx.instance = Some(instance);
            ctx.root_namespaces = Some(ns);
        }
        ctx.module = module.as_deref();

        let mut findings = Vec::new();
        for def in &self.catalog.definitions {
            let applies = match rule_set {
                RuleSet::Xml => def.xml,
                RuleSet::Csv => def.csv,
            };
            if !applies {
                continue;
            }
            if def.eba && !config.eba_mode {
                continue;
            }
            if rule_set == RuleSet::Csv && config.post_conversion && !def.post_conversion {
                continue;
            }

            let Some(implementation) = self.registry.lookup(&def.code, rule_set) else {
                continue;
            };

            match panic::catch_unwind(AssertUnwindSafe(|| implementation(&ctx))) {
                Ok(outputs) => {
                    for (location, context_dict) in outputs {
                        let message = render_template(def.message_for(rule_set), &context_dict);
                        findings.push(Finding {
                            rule_code: def.code.clone(),
                            message,
                            severity: def.severity_for(rule_set),
                            location,
                        });
                    }
                }
                Err(payload) => {
                    let reason = payload
                        .downcast_ref::<&str>()
                        .map(|s| (*s).to_string())
                        .or_else(|| payload.downcast_ref::<String>().cloned())
                        .unwrap_or_else(|| "no panic message".to_string());
                    findings.push(Finding {
                        rule_code: def.code.clone(),
                        message: format!("rule implementation panicked: {reason}"),
                        severity: Severity::Info,
                        location: None,
                    });
                }
            }
        }

        Ok(FindingCollection { findings })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_xml_by_extension() {
        let path = Path::new("report.xbrl");
        assert_eq!(detect_rule_set(path, b"<xbrl/>").unwrap(), RuleSet::Xml);
    }

    #[test]
    fn rejects_unrecognised_extension() {
        let path = Path::new("report.txt");
        assert!(detect_rule_set(path, b"hello").is_err());
    }

    #[test]
    fn runs_without_a_taxonomy_catalog() {
        let validator = Validator::new(None);
        let config = Config::default();
        let path = Path::new("report.xbrl");
        let bytes = b"<not-well-formed";
        let report = validator.run_validation(path, bytes, &config).unwrap();
        assert!(report.findings.iter().any(|f| f.rule_code == "XML-001"));
    }

    #[test]
    fn panicking_rule_degrades_to_info_finding_and_others_still_run() {
        let mut registry = RuleRegistry::with_defaults();
        registry.register("TEST-PANIC", Some(RuleSet::Xml), |_ctx| {
            panic!("deliberate test panic")
        });

        let mut catalog = RuleCatalog::embedded();
        let panicking_def: super::catalog::RuleDefinition = serde_json::from_str(
            r#"{"code":"TEST-PANIC","message":"should never render","xml":true}"#,
        )
        .unwrap();
        catalog.definitions.push(panicking_def);

        let validator = Validator { registry, catalog, taxonomy_catalog_dir: None };
        let config = Config::default();
        let path = Path::new("report.xbrl");
        let bytes = b"<xbrl/>";
        let report = validator.run_validation(path, bytes, &config).unwrap();

        let panic_finding = report
            .findings
            .iter()
            .find(|f| f.rule_code == "TEST-PANIC")
            .expect("a panicking rule should degrade to a finding, not abort the run");
        assert_eq!(panic_finding.severity, Severity::Info);
        assert!(panic_finding.message.contains("deliberate test panic"));
        assert!(report.findings.iter().any(|f| f.rule_code != "TEST-PANIC"));
    }
}
