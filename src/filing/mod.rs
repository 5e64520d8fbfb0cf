// src/filing/mod.rs
pub mod models;

#[allow(unused_imports)]
pub use models::{
    AccessionNumber, Alignment, Block, Diagnostic, DiagnosticKind, Document, Section, Severity,
    Table,
};
