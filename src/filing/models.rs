// src/filing/models.rs
use crate::utils::error::{ExtractError, InvalidAccession};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// 10-digit filer id, 2-digit year, 6-digit sequence. Dashes optional.
static ACCESSION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{10})-?(\d{2})-?(\d{6})$").expect("Failed to compile ACCESSION_RE")
});

// Same shape, but found anywhere inside a line of text (dashed form only).
static ACCESSION_IN_TEXT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(\d{10}-\d{2}-\d{6})\b").expect("Failed to compile ACCESSION_IN_TEXT_RE")
});

/// SEC accession number, e.g. `0000320193-23-000106`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AccessionNumber {
    filer_id: String,
    year: String,
    sequence: String,
}

impl AccessionNumber {
    /// Id of the entity that submitted the filing (often, not always, the company CIK).
    pub fn filer_id(&self) -> &str {
        &self.filer_id
    }

    /// The 18-digit form used in EDGAR archive paths.
    pub fn no_dashes(&self) -> String {
        format!("{}{}{}", self.filer_id, self.year, self.sequence)
    }

    /// Looks for a dashed accession number within the first `max_lines` lines of `text`.
    pub fn find_in_text(text: &str, max_lines: usize) -> Option<Self> {
        text.lines()
            .take(max_lines)
            .find_map(|line| ACCESSION_IN_TEXT_RE.captures(line))
            .and_then(|caps| caps[1].parse().ok())
    }
}

impl FromStr for AccessionNumber {
    type Err = InvalidAccession;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let caps = ACCESSION_RE
            .captures(s.trim())
            .ok_or_else(|| InvalidAccession(s.to_string()))?;
        Ok(Self {
            filer_id: caps[1].to_string(),
            year: caps[2].to_string(),
            sequence: caps[3].to_string(),
        })
    }
}

impl TryFrom<String> for AccessionNumber {
    type Error = InvalidAccession;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<AccessionNumber> for String {
    fn from(value: AccessionNumber) -> Self {
        value.to_string()
    }
}

impl fmt::Display for AccessionNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", self.filer_id, self.year, self.sequence)
    }
}

/// A filing document split into labeled sections.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Accession number when known, otherwise the input file stem
    pub source: String,
    pub accession_number: Option<AccessionNumber>,
    /// Text before the first section marker
    pub preamble: String,
    pub sections: Vec<Section>,
    pub diagnostics: Vec<Diagnostic>,
    #[serde(skip)]
    pub raw_text: String,
}

impl Document {
    pub fn labels(&self) -> Vec<&str> {
        self.sections.iter().map(|s| s.label.as_str()).collect()
    }

    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.sections.iter().flat_map(|s| s.tables())
    }

    pub fn count_diagnostics(&self, severity: Severity) -> usize {
        self.diagnostics.iter().filter(|d| d.severity == severity).count()
    }

    /// Preamble followed by every section body, in order. Equals the raw
    /// text with the marker lines removed.
    pub fn reassemble(&self) -> String {
        let mut out = self.preamble.clone();
        for section in &self.sections {
            out.push_str(&section.text);
        }
        out
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Section {
    /// Position in document order, starting at 0
    pub index: usize,
    /// Normalized, unique within the document (e.g. `part_i_item_1a`)
    pub label: String,
    /// Label as written after `SECTION:`
    pub title: String,
    /// Heading level of the marker (2 or 3)
    pub level: u8,
    /// 1-based line of the marker
    pub line: usize,
    /// Body lines exactly as they appear in the source
    pub text: String,
    pub blocks: Vec<Block>,
}

impl Section {
    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.blocks.iter().filter_map(|b| match b {
            Block::Table(table) => Some(table),
            Block::Paragraph { .. } => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Paragraph { text: String, line: usize },
    Table(Table),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Alignment {
    #[default]
    None,
    Left,
    Center,
    Right,
}

/// A Markdown pipe table with every row fitted to `width` cells.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub header: Option<Vec<String>>,
    pub alignments: Vec<Alignment>,
    pub rows: Vec<Vec<String>>,
    pub width: usize,
    /// 1-based line of the first table row
    pub line: usize,
}

impl Table {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Warning,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    MalformedMarker,
    DuplicateLabel,
    RaggedRow,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub line: usize,
    pub severity: Severity,
    pub kind: DiagnosticKind,
    pub message: String,
}

impl Diagnostic {
    pub fn new(severity: Severity, err: &ExtractError) -> Self {
        let kind = match err {
            ExtractError::MalformedMarker { .. } => DiagnosticKind::MalformedMarker,
            ExtractError::DuplicateLabel { .. } => DiagnosticKind::DuplicateLabel,
            ExtractError::RaggedRow { .. } => DiagnosticKind::RaggedRow,
        };
        Self {
            line: err.line(),
            severity,
            kind,
            message: err.to_string(),
        }
    }

    pub fn warning(err: &ExtractError) -> Self {
        Self::new(Severity::Warning, err)
    }

    pub fn error(err: &ExtractError) -> Self {
        Self::new(Severity::Error, err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accession_number_parsing() {
        let acc: AccessionNumber = "0000320193-23-000106".parse().unwrap();
        assert_eq!(acc.filer_id(), "0000320193");
        assert_eq!(acc.no_dashes(), "000032019323000106");
        assert_eq!(acc.to_string(), "0000320193-23-000106");

        let dashless: AccessionNumber = "000032019323000106".parse().unwrap();
        assert_eq!(dashless, acc);
    }

    #[test]
    fn test_accession_number_rejects_garbage() {
        assert!("320193-23-000106".parse::<AccessionNumber>().is_err());
        assert!("0000320193-2023-000106".parse::<AccessionNumber>().is_err());
        assert!("".parse::<AccessionNumber>().is_err());
    }

    #[test]
    fn test_accession_found_in_leading_lines_only() {
        let text = "Apple Inc.\nAccession No. 0000320193-23-000106\nbody";
        let acc = AccessionNumber::find_in_text(text, 5).unwrap();
        assert_eq!(acc.to_string(), "0000320193-23-000106");
        assert!(AccessionNumber::find_in_text(text, 1).is_none());
    }

    #[test]
    fn test_accession_serializes_as_string() {
        let acc: AccessionNumber = "0001804176-24-000007".parse().unwrap();
        let json = serde_json::to_string(&acc).unwrap();
        assert_eq!(json, "\"0001804176-24-000007\"");
        let back: AccessionNumber = serde_json::from_str(&json).unwrap();
        assert_eq!(back, acc);
        assert!(serde_json::from_str::<AccessionNumber>("\"nope\"").is_err());
    }

    #[test]
    fn test_block_serializes_with_type_tag() {
        let block = Block::Paragraph { text: "Risk factors.".into(), line: 3 };
        let json = serde_json::to_value(&block).unwrap();
        assert_eq!(json["type"], "paragraph");
        assert_eq!(json["text"], "Risk factors.");
    }

    #[test]
    fn test_diagnostic_from_error() {
        let err = ExtractError::RaggedRow { line: 7, expected: 2, found: 4 };
        let diag = Diagnostic::error(&err);
        assert_eq!(diag.line, 7);
        assert_eq!(diag.kind, DiagnosticKind::RaggedRow);
        assert_eq!(diag.severity, Severity::Error);
    }
}
