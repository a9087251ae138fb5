use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};

use crate::models::PackageRecord;

/// Writes icon images into a directory and hands out references to them.
///
/// Files are named after the content id, so a re-scan overwrites rather than
/// duplicates.
#[derive(Debug, Clone)]
pub struct IconStore {
    dir: PathBuf,
    url_prefix: String,
}

impl IconStore {
    /// Store rooted at `dir`; references are `<url_prefix>/<file>`.
    pub fn new(dir: impl Into<PathBuf>, url_prefix: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            url_prefix: url_prefix.into().trim_end_matches('/').to_string(),
        }
    }

    /// Directory icons are written to.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write the record's in-memory icon and set its reference.
    ///
    /// The reference is only set after the write succeeded; the bytes are then
    /// released. Records without icon bytes are left alone.
    pub fn persist(&self, record: &mut PackageRecord) -> Result<()> {
        let Some(bytes) = record.icon_bytes.as_deref() else {
            return Ok(());
        };

        let file_name = format!("{}.png", icon_stem(record));
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("failed to create icon directory {}", self.dir.display()))?;
        let path = self.dir.join(&file_name);
        fs::write(&path, bytes)
            .with_context(|| format!("failed to write icon {}", path.display()))?;

        record.icon_reference = Some(format!("{}/{}", self.url_prefix, file_name));
        record.icon_bytes = None;
        Ok(())
    }
}

fn icon_stem(record: &PackageRecord) -> String {
    let raw = record
        .content_id
        .as_deref()
        .or_else(|| record.file_path.file_stem().and_then(|stem| stem.to_str()))
        .unwrap_or("icon");
    raw.chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' => c,
            _ => '_',
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn persists_under_content_id() -> Result<()> {
        let temp = tempdir()?;
        let store = IconStore::new(temp.path().join("icons"), "/static/icons/");
        let mut record = PackageRecord {
            content_id: Some("EP0001-CUSA00001_00-SAMPLE".into()),
            icon_bytes: Some(b"\x89PNG".to_vec()),
            ..PackageRecord::default()
        };

        store.persist(&mut record)?;

        assert_eq!(
            record.icon_reference.as_deref(),
            Some("/static/icons/EP0001-CUSA00001_00-SAMPLE.png")
        );
        assert!(record.icon_bytes.is_none());
        let written = fs::read(store.dir().join("EP0001-CUSA00001_00-SAMPLE.png"))?;
        assert_eq!(written, b"\x89PNG");
        Ok(())
    }

    #[test]
    fn falls_back_to_sanitised_file_stem() {
        let record = PackageRecord {
            file_path: PathBuf::from("/pkgs/My Theme (v2).pkg"),
            ..PackageRecord::default()
        };
        assert_eq!(icon_stem(&record), "My_Theme__v2_");
    }

    #[test]
    fn failed_write_leaves_reference_unset() -> Result<()> {
        let temp = tempdir()?;
        let blocker = temp.path().join("file");
        fs::write(&blocker, b"not a directory")?;
        let store = IconStore::new(blocker.join("icons"), "/icons");
        let mut record = PackageRecord {
            icon_bytes: Some(vec![1, 2, 3]),
            ..PackageRecord::default()
        };

        assert!(store.persist(&mut record).is_err());
        assert!(record.icon_reference.is_none());
        assert!(record.icon_bytes.is_some());
        Ok(())
    }
}
