//! EBA-NAME-001, 010-014, 020, 030, 040, 050, 060, 070: the submission-package
//! filename convention, `ReportSubject_Country_Framework_Module_ReferenceDate_CreationTimestamp`.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use regex::Regex;

use crate::rules::context::ValidationContext;
use crate::rules::registry::{RuleOutput, RuleRegistry};

fn stem(ctx: &ValidationContext<'_>) -> Option<String> {
    ctx.file_path
        .as_ref()?
        .file_stem()
        .and_then(|s| s.to_str())
        .map(str::to_string)
}

fn components(ctx: &ValidationContext<'_>) -> Option<Vec<String>> {
    let stem = stem(ctx)?;
    let parts: Vec<String> = stem.split('_').map(str::to_string).collect();
    (parts.len() == 6).then_some(parts)
}

fn check_six_components(ctx: &ValidationContext<'_>) -> RuleOutput {
    let Some(stem) = stem(ctx) else {
        return Vec::new();
    };
    if stem.split('_').count() == 6 {
        return Vec::new();
    }
    let mut dict = BTreeMap::new();
    dict.insert("filename".to_string(), stem.clone());
    vec![(Some(stem), dict)]
}

fn lei_regex() -> Regex {
    Regex::new(r"^[A-Z0-9]{20}(\.(CON|IND|CRDLIQSUBGRP))?$").expect("valid regex")
}

fn country_aggregate_regex() -> Regex {
    Regex::new(r"^[A-Z]{2}000\.[A-Z]+$").expect("valid regex")
}

fn authority_aggregate_regex() -> Regex {
    Regex::new(r"^[A-Za-z0-9]+\.AUTALL$").expect("valid regex")
}

fn mica_regex() -> Regex {
    Regex::new(r"^[A-Za-z0-9]+-[A-Za-z0-9]+\.IND$").expect("valid regex")
}

/// True when `subject` matches at least one of the four accepted shapes.
fn subject_matches_any_shape(subject: &str) -> bool {
    lei_regex().is_match(subject)
        || country_aggregate_regex().is_match(subject)
        || authority_aggregate_regex().is_match(subject)
        || mica_regex().is_match(subject)
}

fn check_report_subject_shape(ctx: &ValidationContext<'_>) -> RuleOutput {
    let Some(parts) = components(ctx) else {
        return Vec::new();
    };
    let subject = &parts[0];
    if subject_matches_any_shape(subject) {
        return Vec::new();
    }
    let mut dict = BTreeMap::new();
    dict.insert("subject".to_string(), subject.clone());
    vec![(Some(subject.clone()), dict)]
}

#[derive(PartialEq, Eq)]
enum SubjectHint {
    Lei,
    CountryAggregate,
    AuthorityAggregate,
    Mica,
}

/// Picks which shape family a non-conforming `ReportSubject` was most likely
/// intended as, from its own punctuation (a `-`, a `.AUTALL` suffix, or a
/// `CC000` prefix). A subject with none of those hints is presumed to have
/// been intended as an LEI.
fn subject_hint(subject: &str) -> SubjectHint {
    if subject.contains('-') {
        SubjectHint::Mica
    } else if subject.ends_with(".AUTALL") {
        SubjectHint::AuthorityAggregate
    } else if Regex::new(r"^[A-Z]{2}000").expect("valid regex").is_match(subject) {
        SubjectHint::CountryAggregate
    } else {
        SubjectHint::Lei
    }
}

fn specific_subject_finding(ctx: &ValidationContext<'_>, wanted: &SubjectHint) -> RuleOutput {
    let Some(parts) = components(ctx) else {
        return Vec::new();
    };
    let subject = &parts[0];
    if subject_matches_any_shape(subject) || subject_hint(subject) != *wanted {
        return Vec::new();
    }
    let mut dict = BTreeMap::new();
    dict.insert("subject".to_string(), subject.clone());
    vec![(Some(subject.clone()), dict)]
}

fn check_lei_subject(ctx: &ValidationContext<'_>) -> RuleOutput {
    specific_subject_finding(ctx, &SubjectHint::Lei)
}

fn check_country_aggregate_subject(ctx: &ValidationContext<'_>) -> RuleOutput {
    specific_subject_finding(ctx, &SubjectHint::CountryAggregate)
}

fn check_authority_aggregate_subject(ctx: &ValidationContext<'_>) -> RuleOutput {
    specific_subject_finding(ctx, &SubjectHint::AuthorityAggregate)
}

fn check_mica_subject(ctx: &ValidationContext<'_>) -> RuleOutput {
    specific_subject_finding(ctx, &SubjectHint::Mica)
}

fn check_country(ctx: &ValidationContext<'_>) -> RuleOutput {
    let Some(parts) = components(ctx) else {
        return Vec::new();
    };
    let country = &parts[1];
    // Format check only (two uppercase ASCII letters); the full ISO 3166-1
    // alpha-2 list changes over time and isn't embedded here.
    if Regex::new(r"^[A-Z]{2}$").expect("valid regex").is_match(country) {
        return Vec::new();
    }
    let mut dict = BTreeMap::new();
    dict.insert("country".to_string(), country.clone());
    vec![(Some(country.clone()), dict)]
}

fn check_framework(ctx: &ValidationContext<'_>) -> RuleOutput {
    let Some(parts) = components(ctx) else {
        return Vec::new();
    };
    let framework = &parts[2];
    if Regex::new(r"^[A-Z]+\d{6}$").expect("valid regex").is_match(framework) {
        return Vec::new();
    }
    let mut dict = BTreeMap::new();
    dict.insert("framework".to_string(), framework.clone());
    vec![(Some(framework.clone()), dict)]
}

fn check_module(ctx: &ValidationContext<'_>) -> RuleOutput {
    let Some(parts) = components(ctx) else {
        return Vec::new();
    };
    let module = &parts[3];
    if Regex::new(r"^[A-Z0-9]+$").expect("valid regex").is_match(module) {
        return Vec::new();
    }
    let mut dict = BTreeMap::new();
    dict.insert("module".to_string(), module.clone());
    vec![(Some(module.clone()), dict)]
}

fn check_reference_date(ctx: &ValidationContext<'_>) -> RuleOutput {
    let Some(parts) = components(ctx) else {
        return Vec::new();
    };
    let date = &parts[4];
    if NaiveDate::parse_from_str(date, "%Y-%m-%d").is_ok() {
        return Vec::new();
    }
    let mut dict = BTreeMap::new();
    dict.insert("date".to_string(), date.clone());
    vec![(Some(date.clone()), dict)]
}

fn check_creation_timestamp(ctx: &ValidationContext<'_>) -> RuleOutput {
    let Some(parts) = components(ctx) else {
        return Vec::new();
    };
    let timestamp = &parts[5];
    if timestamp.len() == 17 && timestamp.chars().all(|c| c.is_ascii_digit()) {
        return Vec::new();
    }
    let mut dict = BTreeMap::new();
    dict.insert("timestamp".to_string(), timestamp.clone());
    vec![(Some(timestamp.clone()), dict)]
}

/// Only meaningful for CSV-package validation (the catalog gates it to
/// `csv: true`): when the package ZIP happens to also carry exactly one
/// wrapped `.xbrl`/`.xml` entry, that entry's stem must equal the archive's.
fn check_inner_stem_matches_archive(ctx: &ValidationContext<'_>) -> RuleOutput {
    let (Some(_zip_path), Some(archive_stem)) = (&ctx.zip_path, stem(ctx)) else {
        return Vec::new();
    };
    let Ok(mut archive) = zip::ZipArchive::new(std::io::Cursor::new(ctx.raw_bytes)) else {
        return Vec::new();
    };
    let entries: Vec<String> = (0..archive.len())
        .filter_map(|i| {
            archive.by_index(i).ok().and_then(|f| {
                let name = f.name().to_string();
                (name.ends_with(".xbrl") || name.ends_with(".xml")).then_some(name)
            })
        })
        .collect();
    let [entry] = entries.as_slice() else {
        return Vec::new();
    };
    let inner_stem = std::path::Path::new(entry)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(entry);
    if inner_stem == archive_stem {
        return Vec::new();
    }
    let mut dict = BTreeMap::new();
    dict.insert("inner_stem".to_string(), inner_stem.to_string());
    dict.insert("archive_stem".to_string(), archive_stem.clone());
    vec![(Some(inner_stem.to_string()), dict)]
}

pub fn register(registry: &mut RuleRegistry) {
    registry.register("EBA-NAME-001", None, check_six_components);
    registry.register("EBA-NAME-010", None, check_report_subject_shape);
    registry.register("EBA-NAME-011", None, check_lei_subject);
    registry.register("EBA-NAME-012", None, check_country_aggregate_subject);
    registry.register("EBA-NAME-013", None, check_authority_aggregate_subject);
    registry.register("EBA-NAME-014", None, check_mica_subject);
    registry.register("EBA-NAME-020", None, check_country);
    registry.register("EBA-NAME-030", None, check_framework);
    registry.register("EBA-NAME-040", None, check_module);
    registry.register("EBA-NAME-050", None, check_reference_date);
    registry.register("EBA-NAME-060", None, check_creation_timestamp);
    registry.register("EBA-NAME-070", None, check_inner_stem_matches_archive);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn ctx_for(filename: &str) -> ValidationContext<'static> {
        let mut ctx = ValidationContext::new(b"");
        ctx.file_path = Some(PathBuf::from(filename));
        ctx
    }

    #[test]
    fn flags_five_component_filename() {
        let ctx = ctx_for("A_B_C_D_E.xbrl");
        assert_eq!(check_six_components(&ctx).len(), 1);
    }

    #[test]
    fn accepts_six_component_filename() {
        let ctx = ctx_for("529900T8BM49AURSDO55_DE_FINREP030_COREP_2024-12-31_20241231235959000.xbrl");
        assert!(check_six_components(&ctx).is_empty());
        assert!(check_report_subject_shape(&ctx).is_empty());
        assert!(check_country(&ctx).is_empty());
        assert!(check_reference_date(&ctx).is_empty());
        assert!(check_creation_timestamp(&ctx).is_empty());
    }

    #[test]
    fn flags_bad_framework_component() {
        let ctx = ctx_for("529900T8BM49AURSDO55_DE_bad_COREP_2024-12-31_20241231235959000.xbrl");
        assert_eq!(check_framework(&ctx).len(), 1);
    }

    #[test]
    fn flags_malformed_lei_shaped_subject() {
        let ctx = ctx_for("not-a-lei-at-all-xx_DE_FINREP030_COREP_2024-12-31_20241231235959000.xbrl");
        assert_eq!(check_report_subject_shape(&ctx).len(), 1);
        assert_eq!(check_mica_subject(&ctx).len(), 1);
        assert!(check_lei_subject(&ctx).is_empty());
    }
}
