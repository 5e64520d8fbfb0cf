// src/main.rs
mod utils;
mod filing;
mod extractors;
mod storage;

use std::io::Write;
use std::path::{Path, PathBuf};
use clap::Parser;
use utils::AppError;
use extractors::{ExtractOptions, SectionSplitter, TablePolicy, DEFAULT_ACCESSION_SCAN_LINES};
use filing::{AccessionNumber, Document, Severity};
use storage::StorageManager;

/// Command Line Interface for the 10-K section splitter
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Filing text files with `## SECTION:` markers
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Output directory for extracted content
    #[arg(short, long, default_value = "./output", env = "FILING_OUTPUT_DIR")]
    output_dir: String,

    /// SEC accession number of the input (single input only)
    #[arg(short, long)]
    accession_number: Option<String>,

    /// What to do with table rows whose width differs from the header
    #[arg(long, value_enum, default_value_t = TablePolicy::Pad, env = "FILING_TABLE_POLICY")]
    table_policy: TablePolicy,

    /// How many leading lines to search for an accession number
    #[arg(long, default_value_t = DEFAULT_ACCESSION_SCAN_LINES)]
    accession_scan_lines: usize,

    /// Print the document JSON to stdout instead of writing files
    #[arg(long)]
    stdout: bool,

    /// Compact JSON instead of pretty-printed
    #[arg(long)]
    compact: bool,

    /// Debug mode - write a marker report next to the outputs
    #[arg(short, long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // 1. Setup Logging (reads RUST_LOG env var)
    utils::logging::setup_logging();

    // 2. Parse CLI Arguments
    let args = Args::parse();
    tracing::info!("Starting processing for args: {:?}", args);

    let cli_accession = match &args.accession_number {
        Some(_) if args.inputs.len() > 1 => {
            return Err(AppError::Config(
                "--accession-number can only be used with a single input".to_string(),
            ));
        }
        Some(raw) => Some(raw.parse::<AccessionNumber>()?),
        None => None,
    };

    // 3. Initialize storage (not needed when printing to stdout)
    let mut storage = if args.stdout {
        None
    } else {
        Some(StorageManager::new(&args.output_dir)?)
    };

    // 4. Initialize section splitter
    let options = ExtractOptions {
        table_policy: args.table_policy,
        accession_scan_lines: args.accession_scan_lines,
    };
    let splitter = SectionSplitter::new(&options);

    // 5. Process each input
    let mut success_count = 0;
    let mut failure_count = 0;

    for path in &args.inputs {
        tracing::info!("Processing input: {}", path.display());

        let content = match read_input(path).await {
            Ok(content) => content,
            Err(e) => {
                tracing::error!("{}", e);
                failure_count += 1;
                continue;
            }
        };

        let (source_hint, name_accession) = source_from_path(path);
        let mut document = splitter.split(&content, &source_hint, cli_accession.clone().or(name_accession));

        let errors = document.count_diagnostics(Severity::Error);
        if errors > 0 {
            tracing::warn!("{} table(s) rejected in {}", errors, document.source);
        }

        let written = match storage.as_mut() {
            None => print_document(&document, args.compact),
            Some(storage) => {
                storage.claim_source(&mut document);
                save_outputs(storage, &document, &args)
            }
        };
        match written {
            Ok(()) => success_count += 1,
            Err(e) => {
                tracing::error!("Failed to write output for {}: {}", document.source, e);
                failure_count += 1;
            }
        }
    }

    tracing::info!("Processing finished. Success: {}, Failures: {}", success_count, failure_count);

    if success_count == 0 && failure_count > 0 {
        return Err(AppError::Processing(format!("Failed to process any of {} inputs", failure_count)));
    }

    Ok(())
}

/// Reads one input as UTF-8. This is the only failure that stops a document.
async fn read_input(path: &Path) -> Result<String, AppError> {
    let bytes = tokio::fs::read(path).await.map_err(|e| AppError::UnreadableInput {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    String::from_utf8(bytes).map_err(|e| AppError::UnreadableInput {
        path: path.display().to_string(),
        reason: format!("not valid UTF-8 ({})", e.utf8_error()),
    })
}

/// File stem, plus the accession number when the stem is one.
fn source_from_path(path: &Path) -> (String, Option<AccessionNumber>) {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());
    let accession = stem.parse().ok();
    (stem, accession)
}

fn print_document(document: &Document, compact: bool) -> Result<(), AppError> {
    let json = storage::to_json(document, compact)?;
    let mut out = std::io::stdout().lock();
    writeln!(out, "{}", json)?;
    Ok(())
}

fn save_outputs(storage: &StorageManager, document: &Document, args: &Args) -> Result<(), AppError> {
    let path = storage.save_document(document, args.compact)?;
    tracing::info!("Saved document JSON to: {}", path.display());

    let sections = storage.save_sections(document)?;
    tracing::info!("Saved {} section files", sections.len());

    match storage.save_document_metadata(document, args.table_policy) {
        Ok(path) => tracing::info!("Saved document metadata to: {}", path.display()),
        Err(e) => tracing::error!("Failed to save document metadata: {}", e),
    }

    if args.debug {
        let report_path = storage.document_dir(document).join("debug").join("markers.txt");
        if let Err(e) = utils::debug_report::create_marker_report(document, &report_path) {
            tracing::warn!("Failed to create marker report: {}", e);
        } else {
            tracing::info!("Created marker report: {}", report_path.display());
        }
    }

    Ok(())
}
