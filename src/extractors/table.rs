// src/extractors/table.rs

// --- Imports ---
use crate::filing::{Alignment, Table};
use crate::utils::error::ExtractError;
use once_cell::sync::Lazy;
use regex::Regex;

// --- Regex Patterns (Lazy Static) ---
// One cell of a header delimiter row: `---`, `:--`, `--:`, `:-:`
static DELIMITER_CELL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^:?-+:?$").expect("Failed to compile DELIMITER_CELL_RE")
});

/// What to do with rows whose cell count differs from the table width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum TablePolicy {
    /// Pad short rows with empty cells, truncate long rows
    #[default]
    Pad,
    /// Reject the whole table on the first ragged row
    Strict,
}

impl TablePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            TablePolicy::Pad => "pad",
            TablePolicy::Strict => "strict",
        }
    }
}

/// A normalized table plus the non-fatal problems found while fitting it.
#[derive(Debug, Clone)]
pub struct TableOutcome {
    pub table: Table,
    pub warnings: Vec<ExtractError>,
}

pub struct TableNormalizer {
    policy: TablePolicy,
}

impl TableNormalizer {
    pub fn new(policy: TablePolicy) -> Self {
        Self { policy }
    }

    /// Normalizes one run of consecutive table lines (`(line_no, text)` pairs).
    ///
    /// If the second line is a delimiter row the first line is the header and
    /// fixes the width. Without one, the first row fixes the width and every
    /// line is data.
    pub fn normalize(&self, lines: &[(usize, &str)]) -> Result<TableOutcome, ExtractError> {
        let mut warnings = Vec::new();

        let (first_line_no, first_text) = match lines.first() {
            Some(first) => *first,
            None => {
                return Ok(TableOutcome {
                    table: Table { header: None, alignments: Vec::new(), rows: Vec::new(), width: 0, line: 0 },
                    warnings,
                })
            }
        };

        let first_row = split_row(first_text);
        let width = first_row.len();

        let delimiter = lines
            .get(1)
            .and_then(|(line_no, text)| parse_delimiter_row(&split_row(text)).map(|a| (*line_no, a)));

        let (header, alignments, data_lines) = match delimiter {
            Some((delim_line_no, aligns)) => {
                let aligns = if aligns.len() != width {
                    if self.policy == TablePolicy::Strict {
                        return Err(ExtractError::RaggedRow {
                            line: delim_line_no,
                            expected: width,
                            found: aligns.len(),
                        });
                    }
                    tracing::debug!(
                        "Delimiter row at line {} has {} cells, header has {}",
                        delim_line_no, aligns.len(), width
                    );
                    fit_to_width(aligns, width, Alignment::None)
                } else {
                    aligns
                };
                (Some(first_row), aligns, &lines[2..])
            }
            None => (None, vec![Alignment::None; width], lines),
        };

        let mut rows = Vec::with_capacity(data_lines.len());
        for (line_no, text) in data_lines {
            let cells = split_row(text);
            let found = cells.len();
            if found != width {
                let err = ExtractError::RaggedRow { line: *line_no, expected: width, found };
                match self.policy {
                    TablePolicy::Strict => return Err(err),
                    TablePolicy::Pad if found > width => {
                        tracing::warn!("{}; truncating", err);
                        warnings.push(err);
                    }
                    TablePolicy::Pad => {
                        tracing::debug!("{}; padding", err);
                    }
                }
            }
            rows.push(fit_to_width(cells, width, String::new()));
        }

        Ok(TableOutcome {
            table: Table { header, alignments, rows, width, line: first_line_no },
            warnings,
        })
    }
}

/// A line belongs to a table if it starts with a pipe once indentation is removed.
pub fn is_table_line(line: &str) -> bool {
    line.trim_start().starts_with('|')
}

/// Tokenizes one pipe-table row into trimmed cells.
/// Outer pipes are optional and `\|` is a literal pipe inside a cell.
pub fn split_row(line: &str) -> Vec<String> {
    let trimmed = line.trim();
    let inner = trimmed.strip_prefix('|').unwrap_or(trimmed);
    let inner = match inner.strip_suffix('|') {
        Some(rest) if !rest.ends_with('\\') => rest,
        _ => inner,
    };

    let mut cells = Vec::new();
    let mut current = String::new();
    let mut chars = inner.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' if chars.peek() == Some(&'|') => {
                current.push('|');
                chars.next();
            }
            '|' => {
                cells.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(c),
        }
    }
    cells.push(current.trim().to_string());
    cells
}

/// Returns the column alignments if every cell is a delimiter cell.
pub fn parse_delimiter_row(cells: &[String]) -> Option<Vec<Alignment>> {
    if cells.is_empty() || !cells.iter().all(|c| DELIMITER_CELL_RE.is_match(c)) {
        return None;
    }
    Some(
        cells
            .iter()
            .map(|c| match (c.starts_with(':'), c.ends_with(':')) {
                (true, true) => Alignment::Center,
                (false, true) => Alignment::Right,
                (true, false) => Alignment::Left,
                (false, false) => Alignment::None,
            })
            .collect(),
    )
}

fn fit_to_width<T: Clone>(mut items: Vec<T>, width: usize, fill: T) -> Vec<T> {
    items.resize(width, fill);
    items
}
