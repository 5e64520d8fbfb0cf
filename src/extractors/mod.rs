// src/extractors/mod.rs
pub mod blocks;
pub mod section;
pub mod table;

// Re-export key extraction types for convenience
#[allow(unused_imports)]
pub use section::{normalize_label, SectionSplitter};
#[allow(unused_imports)]
pub use table::{TableNormalizer, TableOutcome, TablePolicy};

/// How many leading lines are searched for an accession number by default.
pub const DEFAULT_ACCESSION_SCAN_LINES: usize = 20;

/// Knobs for a splitting run.
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    pub table_policy: TablePolicy,
    pub accession_scan_lines: usize,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            table_policy: TablePolicy::Pad,
            accession_scan_lines: DEFAULT_ACCESSION_SCAN_LINES,
        }
    }
}
