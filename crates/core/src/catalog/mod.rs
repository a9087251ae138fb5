//! Catalog value and assembly passes.

/// Cross-record repair passes.
pub mod assembler;
/// Placeholder and alias tables.
pub mod rules;

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::PackageRecord;

pub use assembler::{AssemblyReport, CatalogAssembler};
pub use rules::{CatalogRules, TitleAlias};

/// A package that could not be added to the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanDiagnostic {
    /// File or directory the problem relates to.
    pub path: PathBuf,
    /// What went wrong.
    pub message: String,
}

/// The assembled set of records from one scan.
///
/// Rebuilt wholesale on every scan; callers own it and pass it around.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalog {
    /// Directory the scan started from.
    pub root: Option<PathBuf>,
    /// When the scan finished.
    pub generated_at: Option<DateTime<Utc>>,
    /// Records in scan order.
    pub records: Vec<PackageRecord>,
    /// Files (or the root) that were skipped, with reasons.
    #[serde(default)]
    pub diagnostics: Vec<ScanDiagnostic>,
}

impl Catalog {
    /// Catalog over already-assembled records.
    pub fn new(root: impl Into<PathBuf>, records: Vec<PackageRecord>) -> Self {
        Self {
            root: Some(root.into()),
            generated_at: Some(Utc::now()),
            records,
            diagnostics: Vec::new(),
        }
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True when the catalog has no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Record for a package file.
    pub fn by_path(&self, path: impl AsRef<Path>) -> Option<&PackageRecord> {
        let path = path.as_ref();
        self.records.iter().find(|record| record.file_path == path)
    }

    /// All records sharing a title id, in scan order.
    pub fn by_title_id<'a>(&'a self, title_id: &'a str) -> impl Iterator<Item = &'a PackageRecord> {
        self.records
            .iter()
            .filter(move |record| record.title_id.as_deref() == Some(title_id))
    }

    /// Records whose title, title id or content id contains `query`
    /// (case-insensitive).
    pub fn matching(&self, query: &str) -> Vec<&PackageRecord> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return self.records.iter().collect();
        }
        self.records
            .iter()
            .filter(|record| {
                record.title.to_lowercase().contains(&needle)
                    || record
                        .title_id
                        .as_ref()
                        .map(|value| value.to_lowercase().contains(&needle))
                        .unwrap_or(false)
                    || record
                        .content_id
                        .as_ref()
                        .map(|value| value.to_lowercase().contains(&needle))
                        .unwrap_or(false)
            })
            .collect()
    }
}
