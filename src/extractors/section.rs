// src/extractors/section.rs

// --- Imports ---
use crate::extractors::blocks::BlockScanner;
use crate::extractors::table::TableNormalizer;
use crate::extractors::ExtractOptions;
use crate::filing::{AccessionNumber, Diagnostic, Document, Section};
use crate::utils::error::ExtractError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

// --- Regex Patterns (Lazy Static) ---
// Anything that looks like it wants to be a marker: hashes, then SECTION as a word.
// Whether it is well formed is decided in `parse_marker`.
static MARKER_CANDIDATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^ {0,3}(#+)([ \t]*)SECTION\b(.*)$").expect("Failed to compile MARKER_CANDIDATE_RE")
});

static LABEL_SEPARATOR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[^a-z0-9]+").expect("Failed to compile LABEL_SEPARATOR_RE")
});

/// Result of looking at one line for a section marker.
#[derive(Debug, PartialEq, Eq)]
enum Marker {
    None,
    Valid { level: u8, title: String, label: String },
    Malformed(ExtractError),
}

/// Section being filled while the splitter walks the lines.
struct OpenSection {
    label: String,
    title: String,
    level: u8,
    line: usize,
    text: String,
}

pub struct SectionSplitter {
    blocks: BlockScanner,
    accession_scan_lines: usize,
}

impl SectionSplitter {
    pub fn new(options: &ExtractOptions) -> Self {
        Self {
            blocks: BlockScanner::new(TableNormalizer::new(options.table_policy)),
            accession_scan_lines: options.accession_scan_lines,
        }
    }

    /// Splits `raw_text` on its `##`/`###` `SECTION:` markers.
    ///
    /// `source_hint` (usually the file stem) names the document unless an
    /// accession number is given or can be found in the leading lines.
    /// Never fails: malformed markers and tables become diagnostics.
    pub fn split(
        &self,
        raw_text: &str,
        source_hint: &str,
        accession_number: Option<AccessionNumber>,
    ) -> Document {
        let accession_number = accession_number
            .or_else(|| AccessionNumber::find_in_text(raw_text, self.accession_scan_lines));
        let source = accession_number
            .as_ref()
            .map(|a| a.to_string())
            .unwrap_or_else(|| source_hint.to_string());
        tracing::info!("Splitting document {} ({} bytes)", source, raw_text.len());

        let mut preamble = String::new();
        let mut sections = Vec::new();
        let mut diagnostics = Vec::new();
        let mut used_labels = HashSet::new();
        let mut open: Option<OpenSection> = None;

        for (idx, line) in raw_text.split_inclusive('\n').enumerate() {
            let line_no = idx + 1;
            match parse_marker(line, line_no) {
                Marker::Valid { level, title, label } => {
                    if let Some(done) = open.take() {
                        sections.push(self.close_section(done, sections.len(), &mut diagnostics));
                    }
                    let label = unique_label(label, line_no, &mut used_labels, &mut diagnostics);
                    tracing::debug!("Found section marker '{}' at line {}", label, line_no);
                    open = Some(OpenSection { label, title, level, line: line_no, text: String::new() });
                }
                Marker::Malformed(err) => {
                    tracing::warn!("Skipping marker: {}", err);
                    diagnostics.push(Diagnostic::warning(&err));
                    push_body_line(&mut open, &mut preamble, line);
                }
                Marker::None => push_body_line(&mut open, &mut preamble, line),
            }
        }
        if let Some(done) = open.take() {
            sections.push(self.close_section(done, sections.len(), &mut diagnostics));
        }

        // Table diagnostics are collected per section, after later marker warnings.
        diagnostics.sort_by_key(|d| d.line);

        tracing::info!(
            "Document {}: {} sections, {} diagnostics",
            source, sections.len(), diagnostics.len()
        );

        Document {
            source,
            accession_number,
            preamble,
            sections,
            diagnostics,
            raw_text: raw_text.to_string(),
        }
    }

    fn close_section(
        &self,
        open: OpenSection,
        index: usize,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Section {
        let scanned = self.blocks.scan(&open.text, open.line + 1);
        diagnostics.extend(scanned.diagnostics);
        Section {
            index,
            label: open.label,
            title: open.title,
            level: open.level,
            line: open.line,
            text: open.text,
            blocks: scanned.blocks,
        }
    }
}

fn push_body_line(open: &mut Option<OpenSection>, preamble: &mut String, line: &str) {
    match open {
        Some(section) => section.text.push_str(line),
        None => preamble.push_str(line),
    }
}

fn parse_marker(line: &str, line_no: usize) -> Marker {
    let line = line.trim_end_matches(['\r', '\n']);
    let Some(caps) = MARKER_CANDIDATE_RE.captures(line) else {
        return Marker::None;
    };
    let malformed = |reason: String| Marker::Malformed(ExtractError::MalformedMarker { line: line_no, reason });

    let hashes = caps[1].len();
    if !(2..=3).contains(&hashes) {
        return malformed(format!("heading level {} is not 2 or 3", hashes));
    }
    if caps[2].is_empty() {
        return malformed("no space between '#' and SECTION".to_string());
    }
    let Some(title) = caps[3].trim_start().strip_prefix(':') else {
        return malformed("missing ':' after SECTION".to_string());
    };
    let title = title.trim();
    if title.is_empty() {
        return malformed("empty label".to_string());
    }
    let label = normalize_label(title);
    if label.is_empty() {
        return malformed(format!("label '{}' has no letters or digits", title));
    }

    Marker::Valid { level: hashes as u8, title: title.to_string(), label }
}

/// `Part I, Item 1A. Risk Factors` -> `part_i_item_1a_risk_factors`
pub fn normalize_label(title: &str) -> String {
    let lowered = title.to_lowercase();
    LABEL_SEPARATOR_RE
        .replace_all(&lowered, "_")
        .trim_matches('_')
        .to_string()
}

fn unique_label(
    label: String,
    line_no: usize,
    used: &mut HashSet<String>,
    diagnostics: &mut Vec<Diagnostic>,
) -> String {
    if used.insert(label.clone()) {
        return label;
    }
    let renamed = (2..)
        .map(|n| format!("{}_{}", label, n))
        .find(|candidate| !used.contains(candidate))
        .unwrap_or_default();
    let err = ExtractError::DuplicateLabel { line: line_no, label, renamed: renamed.clone() };
    tracing::warn!("{}", err);
    diagnostics.push(Diagnostic::warning(&err));
    used.insert(renamed.clone());
    renamed
}

// --- Tests ---
#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractors::table::TablePolicy;
    use crate::filing::{Block, DiagnosticKind, Severity};

    const FILING: &str = "\
Apple Inc. Form 10-K
## SECTION: part_i_item_1
Item 1. Business
The Company designs smartphones.

### SECTION: Part I Item 1A
Risk Factors
## SECTION: part_ii_item_7
| Segment | 2023 | 2022 |
| --- | ---: | ---: |
| Americas | 162,560 | 169,658 |
| Europe | 94,294 |
";

    fn splitter(policy: TablePolicy) -> SectionSplitter {
        SectionSplitter::new(&ExtractOptions { table_policy: policy, ..Default::default() })
    }

    // Preamble, a duplicate label at ###, two malformed markers, a table and
    // no trailing newline. Four well-formed markers.
    const MIXED: &str = "\
Preamble line

## SECTION: Item 1
body one
### SECTION: Item 1
sub body
##SECTION: glued
## SECTION no colon
### SECTION: Item 7
| a | b |
|---|---|
| 1 | 2 |
## SECTION: tail
last line without newline";

    #[test]
    fn test_one_section_per_marker_in_order() {
        let doc = splitter(TablePolicy::Pad).split(FILING, "aapl", None);
        assert_eq!(doc.sections.len(), 3);
        assert_eq!(doc.labels(), vec!["part_i_item_1", "part_i_item_1a", "part_ii_item_7"]);
        assert_eq!(
            doc.sections.iter().map(|s| s.index).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
        assert_eq!(doc.sections[1].level, 3);
        assert_eq!(doc.sections[1].title, "Part I Item 1A");
        assert_eq!(
            doc.sections[1].blocks,
            vec![Block::Paragraph { text: "Risk Factors".into(), line: 7 }]
        );
        assert_eq!(doc.sections[2].line, 8);
        assert_eq!(doc.preamble, "Apple Inc. Form 10-K\n");
        assert_eq!(doc.source, "aapl");
    }

    #[test]
    fn test_mixed_markers_give_one_section_per_valid_marker() {
        let doc = splitter(TablePolicy::Pad).split(MIXED, "doc", None);
        assert_eq!(doc.sections.len(), 4);
        assert_eq!(doc.labels(), vec!["item_1", "item_1_2", "item_7", "tail"]);
        assert_eq!(doc.sections.iter().map(|s| s.level).collect::<Vec<_>>(), vec![2, 3, 3, 2]);
        assert_eq!(doc.sections.iter().map(|s| s.line).collect::<Vec<_>>(), vec![3, 5, 9, 13]);
        assert_eq!(doc.preamble, "Preamble line\n\n");
        assert_eq!(
            doc.diagnostics.iter().map(|d| (d.line, d.kind)).collect::<Vec<_>>(),
            vec![
                (5, DiagnosticKind::DuplicateLabel),
                (7, DiagnosticKind::MalformedMarker),
                (8, DiagnosticKind::MalformedMarker),
            ]
        );
        assert_eq!(doc.sections[3].text, "last line without newline");
    }

    #[test]
    fn test_reassemble_reproduces_text_without_markers() {
        let doc = splitter(TablePolicy::Pad).split(FILING, "aapl", None);
        let expected: String = FILING
            .split_inclusive('\n')
            .filter(|l| !l.contains("SECTION:"))
            .collect();
        assert_eq!(doc.reassemble(), expected);
        assert_eq!(doc.raw_text, FILING);
    }

    #[test]
    fn test_reassemble_keeps_malformed_markers_and_unterminated_last_line() {
        let doc = splitter(TablePolicy::Pad).split(MIXED, "doc", None);
        assert_eq!(
            doc.reassemble(),
            "Preamble line\n\nbody one\nsub body\n##SECTION: glued\n## SECTION no colon\n\
| a | b |\n|---|---|\n| 1 | 2 |\nlast line without newline"
        );

        let doc = splitter(TablePolicy::Pad).split("x\n## SECTION: end", "doc", None);
        assert_eq!(doc.labels(), vec!["end"]);
        assert_eq!(doc.sections[0].text, "");
        assert_eq!(doc.reassemble(), "x\n");
    }

    #[test]
    fn test_markdown_table_example() {
        let doc = splitter(TablePolicy::Pad)
            .split("## SECTION: s\n| a | b |\n| --- | --- |\n| 1 | 2 |", "doc", None);
        let tables: Vec<_> = doc.tables().collect();
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].header, Some(vec!["a".to_string(), "b".to_string()]));
        assert_eq!(tables[0].rows, vec![vec!["1".to_string(), "2".to_string()]]);
    }

    #[test]
    fn test_tables_are_padded_to_header_width() {
        let doc = splitter(TablePolicy::Pad).split(FILING, "aapl", None);
        let table = doc.sections[2].tables().next().unwrap();
        assert_eq!(table.line, 9);
        assert_eq!(table.width, 3);
        assert!(table.rows.iter().all(|r| r.len() == table.width));
        assert_eq!(table.rows[1], vec!["Europe", "94,294", ""]);
        assert!(doc.diagnostics.is_empty());
    }

    #[test]
    fn test_strict_policy_records_error_without_aborting() {
        let doc = splitter(TablePolicy::Strict).split(FILING, "aapl", None);
        assert_eq!(doc.sections.len(), 3);
        let section = &doc.sections[2];
        assert_eq!(section.tables().count(), 0);
        assert!(matches!(section.blocks[0], Block::Paragraph { line: 9, .. }));
        assert_eq!(doc.count_diagnostics(Severity::Error), 1);
        assert_eq!(doc.diagnostics[0].line, 12);
    }

    #[test]
    fn test_malformed_markers_are_skipped_with_warning() {
        let text = "\
## SECTION: intro
text
## SECTION part_i
#### SECTION: too_deep
## SECTION:
## SECTION: ---
##SECTION:foo
## SECTION: outro
";
        let doc = splitter(TablePolicy::Pad).split(text, "doc", None);
        assert_eq!(doc.labels(), vec!["intro", "outro"]);
        assert_eq!(doc.diagnostics.len(), 5);
        assert!(doc
            .diagnostics
            .iter()
            .all(|d| d.kind == DiagnosticKind::MalformedMarker && d.severity == Severity::Warning));
        assert_eq!(
            doc.diagnostics.iter().map(|d| d.line).collect::<Vec<_>>(),
            vec![3, 4, 5, 6, 7]
        );
        // Skipped marker lines stay in the enclosing section.
        assert!(doc.sections[0].text.contains("## SECTION part_i"));
    }

    #[test]
    fn test_duplicate_labels_are_made_unique() {
        let text = "## SECTION: notes\na\n## SECTION: Notes\nb\n## SECTION: notes\nc\n";
        let doc = splitter(TablePolicy::Pad).split(text, "doc", None);
        assert_eq!(doc.labels(), vec!["notes", "notes_2", "notes_3"]);
        assert_eq!(doc.diagnostics.len(), 2);
        assert_eq!(doc.diagnostics[0].kind, DiagnosticKind::DuplicateLabel);
    }

    #[test]
    fn test_accession_number_found_in_text_becomes_source() {
        let text = "ACCESSION NUMBER: 0001804176-23-000012\n## SECTION: item_1\nbody\n";
        let doc = splitter(TablePolicy::Pad).split(text, "bfly", None);
        assert_eq!(doc.source, "0001804176-23-000012");
        assert!(doc.accession_number.is_some());
    }

    #[test]
    fn test_document_without_markers() {
        let doc = splitter(TablePolicy::Pad).split("just prose\n", "doc", None);
        assert!(doc.sections.is_empty());
        assert_eq!(doc.preamble, "just prose\n");
    }

    #[test]
    fn test_crlf_line_endings() {
        let text = "## SECTION: a\r\nline one\r\n## SECTION: b\r\n";
        let doc = splitter(TablePolicy::Pad).split(text, "doc", None);
        assert_eq!(doc.labels(), vec!["a", "b"]);
        assert_eq!(doc.sections[0].text, "line one\r\n");
    }

    #[test]
    fn test_normalize_label() {
        assert_eq!(normalize_label("Part I, Item 1A. Risk Factors"), "part_i_item_1a_risk_factors");
        assert_eq!(normalize_label("part_ii_item_7"), "part_ii_item_7");
        assert_eq!(normalize_label("  --  "), "");
    }
}
