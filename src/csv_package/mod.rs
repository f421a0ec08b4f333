//! XBRL-CSV package writer: manifest, parameters, filing indicators, and
//! per-table CSVs, zipped with the input's stem as the top-level folder.
//!
//! Mirrors the teacher crate's streaming-writer split (stage to a temp
//! directory, then zip, then atomically rename into place) rather than
//! building the archive incrementally in memory.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use eba_taxonomy::Module;
use serde::Serialize;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use crate::aggregate::DecimalsParameters;
use crate::error::{Error, Result};
use crate::resolve::ResolvedCell;
use crate::xml::Instance;

#[derive(Serialize)]
struct ReportPackageManifest<'a> {
    #[serde(rename = "documentInfo")]
    document_info: DocumentInfo<'a>,
}

#[derive(Serialize)]
struct DocumentInfo<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
}

#[derive(Serialize)]
struct ReportManifest {
    #[serde(rename = "documentInfo")]
    document_info: ReportDocumentInfo,
    #[serde(rename = "tableTemplates")]
    table_templates: BTreeMap<String, TableTemplateRef>,
}

#[derive(Serialize)]
struct ReportDocumentInfo {
    parameters: &'static str,
}

#[derive(Serialize)]
struct TableTemplateRef {
    url: String,
}

/// Builds the in-memory layout of an XBRL-CSV package (tables, manifests,
/// parameters) without touching the filesystem; kept separate from
/// [`write_package`] so the CSV content can be unit-tested without a temp dir.
pub struct PackageContents {
    /// Table code → CSV text (header + rows).
    pub tables: BTreeMap<String, String>,
    /// `parameters.csv` text.
    pub parameters_csv: String,
    /// `FilingIndicators.csv` text.
    pub filing_indicators_csv: String,
    /// `reports/report.json` text.
    pub report_json: String,
    /// `META-INF/reportPackage.json` text.
    pub report_package_json: String,
}

/// Builds package contents from resolved cells and the originating instance.
///
/// # Errors
///
/// Returns [`Error::Io`] if CSV row serialisation fails (a writer error, not
/// a filesystem error, since everything here is in-memory).
pub fn build_contents(
    instance: &Instance,
    cells: &[ResolvedCell],
    decimals: &DecimalsParameters,
    module: &Module,
    base_currency: Option<&str>,
) -> Result<PackageContents> {
    let mut by_table: BTreeMap<&str, Vec<&ResolvedCell>> = BTreeMap::new();
    for cell in cells {
        by_table.entry(&cell.table_code).or_default().push(cell);
    }

    let mut tables = BTreeMap::new();
    for (table_code, table_cells) in &by_table {
        let attributes_header = module
            .tables
            .iter()
            .find(|t| t.code == *table_code)
            .map_or(&[][..], |t| t.attributes_header.as_slice());
        tables.insert(
            (*table_code).to_string(),
            render_table_csv(table_cells, attributes_header)?,
        );
    }

    let parameters_csv = render_parameters_csv(instance, decimals, base_currency)?;
    let filing_indicators_csv = render_filing_indicators_csv(instance)?;

    let mut table_templates = BTreeMap::new();
    for table_code in tables.keys() {
        table_templates.insert(
            table_code.clone(),
            TableTemplateRef {
                url: format!("{table_code}.json"),
            },
        );
    }
    let report_json = serde_json::to_string_pretty(&ReportManifest {
        document_info: ReportDocumentInfo {
            parameters: "parameters.csv",
        },
        table_templates,
    })
    .map_err(|e| Error::fatal_conversion(format!("failed to serialise report.json: {e}")))?;

    let report_package_json = serde_json::to_string_pretty(&ReportPackageManifest {
        document_info: DocumentInfo {
            kind: "https://xbrl.org/WGWD/YYYY-MM-DD/report-package",
        },
    })
    .map_err(|e| Error::fatal_conversion(format!("failed to serialise reportPackage.json: {e}")))?;

    Ok(PackageContents {
        tables,
        parameters_csv,
        filing_indicators_csv,
        report_json,
        report_package_json,
    })
}

/// Renders one table's CSV. `attributes_header` is the table's declared
/// trailing metadata columns (e.g. `["unit", "decimals"]`) — only those
/// columns are emitted, in the declared order, after `datapoint`/`value`.
fn render_table_csv(cells: &[&ResolvedCell], attributes_header: &[String]) -> Result<String> {
    let mut open_key_columns: Vec<&str> = Vec::new();
    for cell in cells {
        for key in cell.open_keys.keys() {
            if !open_key_columns.contains(&key.as_str()) {
                open_key_columns.push(key.as_str());
            }
        }
    }
    open_key_columns.sort_unstable();

    let mut writer = csv::WriterBuilder::new().from_writer(vec![]);
    let mut header: Vec<&str> = open_key_columns.clone();
    header.push("datapoint");
    header.push("value");
    header.extend(attributes_header.iter().map(String::as_str));
    writer.write_record(&header)?;

    for cell in cells {
        let mut record: Vec<String> = open_key_columns
            .iter()
            .map(|key| cell.open_keys.get(*key).cloned().unwrap_or_default())
            .collect();
        record.push(cell.datapoint_id.clone());
        record.push(cell.value.clone());
        for attr in attributes_header {
            let field = match attr.as_str() {
                "unit" => cell.unit_id.clone().unwrap_or_default(),
                "decimals" => cell
                    .decimals
                    .map(|d| match d {
                        crate::xml::Decimals::Value(v) => v.to_string(),
                        crate::xml::Decimals::Infinite => "INF".to_string(),
                    })
                    .unwrap_or_default(),
                _ => String::new(),
            };
            record.push(field);
        }
        writer.write_record(&record)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| Error::fatal_conversion(format!("csv writer error: {e}")))?;
    String::from_utf8(bytes)
        .map_err(|e| Error::fatal_conversion(format!("csv writer produced non-UTF8 output: {e}")))
}

fn render_parameters_csv(
    instance: &Instance,
    decimals: &DecimalsParameters,
    base_currency: Option<&str>,
) -> Result<String> {
    let mut writer = csv::WriterBuilder::new().from_writer(vec![]);
    writer.write_record(["name", "value"])?;

    if let Some((_, value)) = instance.entity_identifier() {
        writer.write_record(["entityID", value])?;
    }
    if let Some(period) = instance.reference_period() {
        writer.write_record(["refPeriod", &period.to_string()])?;
    }
    if let Some(currency) = base_currency {
        writer.write_record(["baseCurrency", currency])?;
    }
    if let Some(v) = &decimals.monetary {
        writer.write_record(["decimalsMonetary", v])?;
    }
    if let Some(v) = &decimals.percentage {
        writer.write_record(["decimalsPercentage", v])?;
    }
    if let Some(v) = &decimals.integer {
        writer.write_record(["decimalsInteger", v])?;
    }
    if let Some(v) = &decimals.decimal {
        writer.write_record(["decimalsDecimal", v])?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| Error::fatal_conversion(format!("csv writer error: {e}")))?;
    String::from_utf8(bytes)
        .map_err(|e| Error::fatal_conversion(format!("csv writer produced non-UTF8 output: {e}")))
}

fn render_filing_indicators_csv(instance: &Instance) -> Result<String> {
    let mut writer = csv::WriterBuilder::new().from_writer(vec![]);
    writer.write_record(["tableCode"])?;
    for indicator in &instance.filing_indicators {
        if indicator.filed {
            writer.write_record([&indicator.table_code])?;
        }
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| Error::fatal_conversion(format!("csv writer error: {e}")))?;
    String::from_utf8(bytes)
        .map_err(|e| Error::fatal_conversion(format!("csv writer produced non-UTF8 output: {e}")))
}

/// Writes `contents` as a ZIP package at `output_path`, named after
/// `stem` as the top-level folder inside the archive.
///
/// The archive is staged under a [`tempfile::TempDir`] sibling of
/// `output_path`, then renamed into place, so a reader never observes a
/// partially-written file.
///
/// # Errors
///
/// Returns [`Error::Io`] on any filesystem or zip-encoding failure.
pub fn write_package(contents: &PackageContents, stem: &str, output_path: &Path) -> Result<()> {
    let parent = output_path
        .parent()
        .ok_or_else(|| Error::corrupt_package("output path has no parent directory"))?;
    fs::create_dir_all(parent)?;

    let staging = tempfile::Builder::new()
        .prefix(".xbridge-pkg-")
        .tempdir_in(parent)?;
    let temp_zip_path = staging.path().join(format!("{stem}.zip.tmp"));

    {
        let file = File::create(&temp_zip_path)?;
        let mut zip = ZipWriter::new(file);
        let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

        zip.start_file(
            format!("{stem}/META-INF/reportPackage.json"),
            options,
        )?;
        zip.write_all(contents.report_package_json.as_bytes())?;

        zip.start_file(format!("{stem}/reports/report.json"), options)?;
        zip.write_all(contents.report_json.as_bytes())?;

        zip.start_file(format!("{stem}/reports/parameters.csv"), options)?;
        zip.write_all(contents.parameters_csv.as_bytes())?;

        zip.start_file(format!("{stem}/reports/FilingIndicators.csv"), options)?;
        zip.write_all(contents.filing_indicators_csv.as_bytes())?;

        for (table_code, csv_text) in &contents.tables {
            zip.start_file(format!("{stem}/reports/{table_code}.csv"), options)?;
            zip.write_all(csv_text.as_bytes())?;
        }

        zip.finish()?;
    }

    fs::rename(&temp_zip_path, output_path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;

    fn empty_instance() -> Instance {
        Instance {
            schema_ref: String::new(),
            contexts: IndexMap::new(),
            units: IndexMap::new(),
            facts: vec![],
            filing_indicators: vec![],
        }
    }

    #[test]
    fn table_csv_includes_open_keys_and_core_columns() {
        let cell = ResolvedCell {
            fact_index: 0,
            table_code: "R_01.00".to_string(),
            datapoint_id: "ii774".to_string(),
            open_keys: BTreeMap::from([("ROW".to_string(), "r1".to_string())]),
            value: "100.00".to_string(),
            unit_id: Some("u1".to_string()),
            decimals: Some(crate::xml::Decimals::Value(2)),
            attributes: None,
        };
        let attributes_header = vec!["unit".to_string(), "decimals".to_string()];
        let csv_text = render_table_csv(&[&cell], &attributes_header).unwrap();
        assert!(csv_text.starts_with("ROW,datapoint,value,unit,decimals"));
        assert!(csv_text.contains("r1,ii774,100.00,u1,2"));
    }

    #[test]
    fn table_csv_omits_columns_not_in_attributes_header() {
        let cell = ResolvedCell {
            fact_index: 0,
            table_code: "R_01.00".to_string(),
            datapoint_id: "ii774".to_string(),
            open_keys: BTreeMap::new(),
            value: "100.00".to_string(),
            unit_id: Some("u1".to_string()),
            decimals: Some(crate::xml::Decimals::Value(2)),
            attributes: None,
        };
        let csv_text = render_table_csv(&[&cell], &[]).unwrap();
        assert!(csv_text.starts_with("datapoint,value"));
        assert!(!csv_text.contains("unit"));
        assert!(!csv_text.contains("decimals"));
    }

    #[test]
    fn parameters_csv_omits_base_currency_when_unavailable() {
        let instance = empty_instance();
        let decimals = DecimalsParameters::default();
        let csv_text = render_parameters_csv(&instance, &decimals, None).unwrap();
        assert!(!csv_text.contains("baseCurrency"));
    }

    #[test]
    fn filing_indicators_csv_only_lists_reported_tables() {
        let mut instance = empty_instance();
        instance.filing_indicators = vec![
            crate::xml::FilingIndicator {
                table_code: "R_01.00".to_string(),
                filed: true,
            },
            crate::xml::FilingIndicator {
                table_code: "R_02.00".to_string(),
                filed: false,
            },
        ];
        let csv_text = render_filing_indicators_csv(&instance).unwrap();
        assert!(csv_text.contains("R_01.00"));
        assert!(!csv_text.contains("R_02.00"));
    }

    #[test]
    fn write_package_produces_a_valid_zip() {
        let dir = tempfile::tempdir().unwrap();
        let contents = PackageContents {
            tables: BTreeMap::from([("R_01.00".to_string(), "datapoint,value\n".to_string())]),
            parameters_csv: "name,value\n".to_string(),
            filing_indicators_csv: "tableCode\n".to_string(),
            report_json: "{}".to_string(),
            report_package_json: "{}".to_string(),
        };
        let output_path = dir.path().join("out.zip");
        write_package(&contents, "out", &output_path).unwrap();
        assert!(output_path.exists());

        let file = File::open(&output_path).unwrap();
        let mut archive = zip::ZipArchive::new(file).unwrap();
        assert!(archive.by_name("out/reports/report.json").is_ok());
        assert!(archive.by_name("out/reports/R_01.00.csv").is_ok());
    }
}
