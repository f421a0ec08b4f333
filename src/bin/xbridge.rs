//! Command line frontend: convert an XBRL-XML instance to an XBRL-CSV
//! package, or validate an instance/package against the rule catalog.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::{error, info, warn};

use xbridge::config::Verbosity;
use xbridge::rules::Validator;
use xbridge::xml::parse_instance;
use xbridge::{resolve, Config};

#[derive(Parser)]
#[command(
    name = "xbridge",
    about = "Convert XBRL-XML regulatory instances to XBRL-CSV, and validate either form.",
    version,
    arg_required_else_help = true
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Input XBRL-XML instance to convert (ignored when a subcommand is given).
    input: Option<PathBuf>,

    /// Directory to write the output package into, instead of alongside the input.
    #[arg(long = "output-path")]
    output_path: Option<PathBuf>,

    /// Use the `headers` architecture for tables that support both.
    #[arg(long)]
    headers_as_datapoints: bool,

    /// Fail the conversion on any orphaned fact (default).
    #[arg(long, conflicts_with = "no_strict_validation")]
    strict_validation: bool,

    /// Report orphaned facts as warnings instead of failing the conversion.
    #[arg(long)]
    no_strict_validation: bool,

    /// Directory holding the taxonomy catalog (`index.json` + module files).
    #[arg(long)]
    taxonomy_dir: Option<PathBuf>,

    /// Diagnostic verbosity.
    #[arg(long, value_enum, default_value = "warn", global = true)]
    verbosity: Verbosity,
}

#[derive(Subcommand)]
enum Command {
    /// Validate an instance or package against the rule catalog.
    Validate {
        /// Input XBRL-XML instance, or XBRL-CSV package ZIP.
        input: PathBuf,

        /// Include EBA-taxonomy-specific rules.
        #[arg(long)]
        eba: bool,

        /// Only run rules flagged `post_conversion` (meaningful for CSV packages).
        #[arg(long)]
        post_conversion: bool,

        /// Print findings as a JSON array instead of human-readable lines.
        #[arg(long)]
        json: bool,

        /// Directory holding the taxonomy catalog (`index.json` + module files).
        #[arg(long)]
        taxonomy_dir: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.verbosity != Verbosity::None {
        tracing_subscriber::fmt()
            .with_max_level(cli.verbosity.to_tracing_level())
            .with_target(false)
            .init();
    }

    match cli.command {
        Some(Command::Validate { input, eba, post_conversion, json, taxonomy_dir }) => {
            run_validate(&input, eba, post_conversion, json, taxonomy_dir, cli.verbosity)
        }
        None => {
            let Some(input) = cli.input else {
                eprintln!("an input path is required; see --help");
                return ExitCode::FAILURE;
            };
            let strict = cli.strict_validation || !cli.no_strict_validation;
            let config = (if strict { Config::strict() } else { Config::permissive() })
                .with_headers_as_datapoints(cli.headers_as_datapoints)
                .with_verbosity(cli.verbosity);
            run_convert(&input, cli.output_path.as_deref(), &config, cli.taxonomy_dir)
        }
    }
}

fn run_convert(
    input: &Path,
    output_dir: Option<&Path>,
    config: &Config,
    taxonomy_dir: Option<PathBuf>,
) -> ExitCode {
    info!(path = %input.display(), "starting conversion");

    let bytes = match fs::read(input) {
        Ok(bytes) => bytes,
        Err(e) => {
            error!("could not read {}: {e}", input.display());
            return ExitCode::FAILURE;
        }
    };

    let (instance, _namespaces) = match parse_instance(&bytes) {
        Ok(parsed) => parsed,
        Err(e) => {
            error!("parse failed: {e}");
            return ExitCode::FAILURE;
        }
    };

    let Some(taxonomy_dir) = taxonomy_dir else {
        error!("--taxonomy-dir is required for conversion");
        return ExitCode::FAILURE;
    };
    let module = match eba_taxonomy::ModuleLoader::from_catalog_dir(&taxonomy_dir)
        .and_then(|loader| loader.load(&instance.schema_ref))
    {
        Ok(Some(module)) => module,
        Ok(None) => {
            error!("no taxonomy module found for {}", instance.schema_ref);
            return ExitCode::FAILURE;
        }
        Err(e) => {
            error!("taxonomy load failed: {e}");
            return ExitCode::FAILURE;
        }
    };

    let report = match resolve::resolve(&instance, &module) {
        Ok(report) => report,
        Err(e) => {
            error!("resolution failed: {e}");
            return ExitCode::FAILURE;
        }
    };
    if !report.orphaned_fact_indices.is_empty() {
        warn!(count = report.orphaned_fact_indices.len(), "facts matched no table");
    }

    if let Err(e) =
        xbridge::filing_indicators::check(&instance, &module, &report.cells, config.strict_filing_indicators)
    {
        error!("filing-indicator check failed: {e}");
        return ExitCode::FAILURE;
    }

    let decimals = xbridge::aggregate::aggregate(&report.cells);

    let contents = match xbridge::csv_package::build_contents(
        &instance,
        &report.cells,
        &decimals,
        &module,
        None,
    ) {
        Ok(contents) => contents,
        Err(e) => {
            error!("package assembly failed: {e}");
            return ExitCode::FAILURE;
        }
    };

    let stem = input.file_stem().and_then(|s| s.to_str()).unwrap_or("report");
    let out_dir = output_dir.unwrap_or_else(|| input.parent().unwrap_or_else(|| Path::new(".")));
    let output_path = out_dir.join(format!("{stem}.zip"));

    if let Err(e) = xbridge::csv_package::write_package(&contents, stem, &output_path) {
        error!("failed to write package: {e}");
        return ExitCode::FAILURE;
    }

    println!("{}", output_path.display());
    ExitCode::SUCCESS
}

fn run_validate(
    input: &Path,
    eba: bool,
    post_conversion: bool,
    json: bool,
    taxonomy_dir: Option<PathBuf>,
    verbosity: Verbosity,
) -> ExitCode {
    let bytes = match fs::read(input) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("could not read {}: {e}", input.display());
            return ExitCode::FAILURE;
        }
    };

    let config = Config::new()
        .with_eba_mode(eba)
        .with_post_conversion(post_conversion)
        .with_verbosity(verbosity);
    let validator = Validator::new(taxonomy_dir);

    let findings = match validator.run_validation(input, &bytes, &config) {
        Ok(findings) => findings,
        Err(e) => {
            eprintln!("validation could not run: {e}");
            return ExitCode::FAILURE;
        }
    };

    if json {
        print_json(&findings);
    } else {
        for finding in &findings.findings {
            println!("{finding}");
        }
        println!("{} finding(s)", findings.findings.len());
    }

    if findings.is_clean() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn print_json(findings: &xbridge::rules::FindingCollection) {
    let entries: Vec<String> = findings
        .findings
        .iter()
        .map(|f| {
            format!(
                r#"{{"rule_id":{:?},"severity":{:?},"message":{:?},"location":{}}}"#,
                f.rule_code,
                f.severity.to_string(),
                f.message,
                f.location.as_deref().map_or("null".to_string(), |l| format!("{l:?}")),
            )
        })
        .collect();
    println!("[{}]", entries.join(","));
}
