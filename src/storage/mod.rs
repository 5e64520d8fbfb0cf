// src/storage/mod.rs
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use crate::extractors::TablePolicy;
use crate::filing::{Document, Severity};
use crate::utils::error::StorageError;

/// Serializes a document, pretty-printed unless `compact`.
pub fn to_json(document: &Document, compact: bool) -> Result<String, StorageError> {
    let result = if compact {
        serde_json::to_string(document)
    } else {
        serde_json::to_string_pretty(document)
    };
    result.map_err(|e| StorageError::SerializationError(e.to_string()))
}

pub struct StorageManager {
    base_dir: PathBuf,
    /// Document directories already written during this run
    claimed: HashSet<String>,
}

impl StorageManager {
    /// Creates a new StorageManager with the specified base directory
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self, StorageError> {
        let base_path = base_dir.as_ref().to_path_buf();

        // Create the base directory if it doesn't exist
        if !base_path.exists() {
            fs::create_dir_all(&base_path)
                .map_err(StorageError::IoError)?;
        }

        Ok(Self { base_dir: base_path, claimed: HashSet::new() })
    }

    /// Reserves the output directory for `document`. If an earlier document in
    /// this run already took the same directory, the source is renamed
    /// `<source>_2`, `<source>_3`, ... so neither overwrites the other.
    pub fn claim_source(&mut self, document: &mut Document) {
        if self.claimed.insert(dir_name(&document.source)) {
            return;
        }
        let renamed = (2..)
            .map(|n| format!("{}_{}", document.source, n))
            .find(|candidate| !self.claimed.contains(&dir_name(candidate)))
            .unwrap_or_default();
        tracing::warn!(
            "Output for source '{}' already written in this run, using '{}'",
            document.source, renamed
        );
        self.claimed.insert(dir_name(&renamed));
        document.source = renamed;
    }

    /// Directory holding every output for one document: /base_dir/<source>/
    pub fn document_dir(&self, document: &Document) -> PathBuf {
        self.base_dir.join(dir_name(&document.source))
    }

    fn ensure_dir(&self, dir: &Path) -> Result<(), StorageError> {
        if !dir.exists() {
            fs::create_dir_all(dir).map_err(StorageError::IoError)?;
        }
        Ok(())
    }

    /// Saves the whole document as JSON
    pub fn save_document(&self, document: &Document, compact: bool) -> Result<PathBuf, StorageError> {
        let target_dir = self.document_dir(document);
        self.ensure_dir(&target_dir)?;

        let file_path = target_dir.join(format!("{}.json", dir_name(&document.source)));
        fs::write(&file_path, to_json(document, compact)?).map_err(StorageError::IoError)?;

        tracing::info!("Saved document to {}", file_path.display());
        Ok(file_path)
    }

    /// Saves each section body verbatim as sections/<NN>_<label>.md.
    /// Files left from an earlier run are removed first.
    pub fn save_sections(&self, document: &Document) -> Result<Vec<PathBuf>, StorageError> {
        let target_dir = self.document_dir(document).join("sections");
        if target_dir.exists() {
            fs::remove_dir_all(&target_dir).map_err(StorageError::IoError)?;
        }
        self.ensure_dir(&target_dir)?;

        let mut paths = Vec::with_capacity(document.sections.len());
        for section in &document.sections {
            let file_path = target_dir.join(format!("{:02}_{}.md", section.index, section.label));
            fs::write(&file_path, section.text.as_bytes()).map_err(StorageError::IoError)?;
            tracing::debug!("Saved section {} to {}", section.label, file_path.display());
            paths.push(file_path);
        }

        tracing::info!("Saved {} sections under {}", paths.len(), target_dir.display());
        Ok(paths)
    }

    /// Saves metadata about the document in JSON format
    pub fn save_document_metadata(
        &self,
        document: &Document,
        policy: TablePolicy,
    ) -> Result<PathBuf, StorageError> {
        let target_dir = self.document_dir(document);
        self.ensure_dir(&target_dir)?;

        let file_path = target_dir.join(format!("{}_meta.json", dir_name(&document.source)));

        let metadata = serde_json::json!({
            "source": document.source,
            "accession_number": document.accession_number.as_ref().map(|a| a.to_string()),
            "accession_no_dashes": document.accession_number.as_ref().map(|a| a.no_dashes()),
            "filer_id": document.accession_number.as_ref().map(|a| a.filer_id()),
            "section_count": document.sections.len(),
            "section_labels": document.labels(),
            "table_count": document.tables().count(),
            "warning_count": document.count_diagnostics(Severity::Warning),
            "error_count": document.count_diagnostics(Severity::Error),
            "table_policy": policy.as_str(),
            "content_length": document.raw_text.len(),
            "extraction_timestamp": chrono::Utc::now().to_rfc3339(),
        });

        let metadata_str = serde_json::to_string_pretty(&metadata)
            .map_err(|e| StorageError::SerializationError(e.to_string()))?;

        fs::write(&file_path, metadata_str)
            .map_err(StorageError::IoError)?;

        tracing::info!("Saved metadata to {}", file_path.display());

        Ok(file_path)
    }
}

// Sources come from file stems; keep them to a single, real path component.
fn dir_name(source: &str) -> String {
    let name = source.replace(['/', '\\'], "_");
    if name.is_empty() {
        "document".to_string()
    } else if name.chars().all(|c| c == '.') {
        name.replace('.', "_")
    } else {
        name
    }
}
