// src/extractors/blocks.rs
use crate::extractors::table::{is_table_line, TableNormalizer};
use crate::filing::{Block, Diagnostic};

/// Blocks of one section body plus whatever went wrong building them.
#[derive(Debug, Default)]
pub struct ScannedBlocks {
    pub blocks: Vec<Block>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Segments a section body into paragraphs and tables.
pub struct BlockScanner {
    tables: TableNormalizer,
}

impl BlockScanner {
    pub fn new(tables: TableNormalizer) -> Self {
        Self { tables }
    }

    /// `first_line` is the 1-based line number of the first line of `text`.
    pub fn scan(&self, text: &str, first_line: usize) -> ScannedBlocks {
        let mut out = ScannedBlocks::default();
        let mut paragraph: Vec<(usize, &str)> = Vec::new();
        let mut table_run: Vec<(usize, &str)> = Vec::new();

        for (offset, line) in text.lines().enumerate() {
            let line_no = first_line + offset;
            if line.trim().is_empty() {
                flush_paragraph(&mut paragraph, &mut out);
                self.flush_table(&mut table_run, &mut out);
            } else if is_table_line(line) {
                flush_paragraph(&mut paragraph, &mut out);
                table_run.push((line_no, line));
            } else {
                self.flush_table(&mut table_run, &mut out);
                paragraph.push((line_no, line));
            }
        }
        flush_paragraph(&mut paragraph, &mut out);
        self.flush_table(&mut table_run, &mut out);

        out
    }

    fn flush_table(&self, lines: &mut Vec<(usize, &str)>, out: &mut ScannedBlocks) {
        if lines.is_empty() {
            return;
        }
        match self.tables.normalize(lines) {
            Ok(outcome) => {
                out.diagnostics.extend(outcome.warnings.iter().map(Diagnostic::warning));
                out.blocks.push(Block::Table(outcome.table));
            }
            Err(e) => {
                // Rejected tables stay in the output as plain text.
                tracing::warn!("Table rejected: {}", e);
                out.diagnostics.push(Diagnostic::error(&e));
                if let Some(block) = paragraph_block(lines) {
                    out.blocks.push(block);
                }
            }
        }
        lines.clear();
    }
}

fn flush_paragraph(lines: &mut Vec<(usize, &str)>, out: &mut ScannedBlocks) {
    if let Some(block) = paragraph_block(lines) {
        out.blocks.push(block);
    }
    lines.clear();
}

fn paragraph_block(lines: &[(usize, &str)]) -> Option<Block> {
    let (line, _) = lines.first()?;
    let text = lines
        .iter()
        .map(|(_, l)| l.trim_end())
        .collect::<Vec<_>>()
        .join("\n");
    Some(Block::Paragraph { text, line: *line })
}
