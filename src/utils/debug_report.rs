// src/utils/debug_report.rs
use std::fs;
use std::path::Path;
use crate::filing::{Block, Document};
use crate::utils::error::AppError;

/// Renders a line-ordered listing of every marker, table and diagnostic.
pub fn marker_report(document: &Document) -> String {
    let mut entries: Vec<(usize, String)> = Vec::new();

    for section in &document.sections {
        entries.push((
            section.line,
            format!("{} SECTION [{}] {} -> {}", "#".repeat(section.level as usize), section.index, section.title, section.label),
        ));
        for block in &section.blocks {
            if let Block::Table(table) = block {
                entries.push((
                    table.line,
                    format!("  table {} cols x {} rows (header: {})", table.width, table.row_count(), table.header.is_some()),
                ));
            }
        }
    }
    for diag in &document.diagnostics {
        entries.push((diag.line, format!("  {:?}: {}", diag.severity, diag.message)));
    }
    entries.sort_by_key(|(line, _)| *line);

    let marker_bytes = document.raw_text.len().saturating_sub(document.reassemble().len());
    let mut report = format!(
        "source: {}\npreamble bytes: {}\nmarker bytes: {}\n",
        document.source, document.preamble.len(), marker_bytes
    );
    for (line, text) in entries {
        report.push_str(&format!("{:>6}: {}\n", line, text));
    }
    report
}

/// Writes the marker report to `path`, creating parent directories.
pub fn create_marker_report(document: &Document, path: &Path) -> Result<(), AppError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, marker_report(document))?;
    Ok(())
}
