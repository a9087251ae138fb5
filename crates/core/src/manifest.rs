//! Catalog snapshot stored as JSON next to the icon directory.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};

use crate::catalog::Catalog;

/// File name used by [`snapshot_path`].
pub const SNAPSHOT_FILE: &str = "catalog.json";

impl Catalog {
    /// Load a snapshot from the given path, returning `None` if it does not exist.
    pub fn load(path: impl AsRef<Path>) -> Result<Option<Self>> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(None);
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read catalog {}", path.display()))?;
        let catalog = serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse catalog {}", path.display()))?;
        Ok(Some(catalog))
    }

    /// Persist the catalog to the given file, creating parent directories if needed.
    ///
    /// In-memory icon bytes are not written; only icon references survive.
    pub fn persist(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("failed to create catalog directory {}", parent.display())
            })?;
        }

        let serialized = serde_json::to_string_pretty(self).context("failed to serialize catalog")?;
        fs::write(path, serialized)
            .with_context(|| format!("failed to write catalog {}", path.display()))
    }
}

/// Default snapshot location inside a data directory.
pub fn snapshot_path(data_dir: impl AsRef<Path>) -> PathBuf {
    data_dir.as_ref().join(SNAPSHOT_FILE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        catalog::ScanDiagnostic,
        models::{AppType, PackageRecord, PropertyValue},
    };
    use tempfile::tempdir;

    fn sample() -> Catalog {
        let mut record = PackageRecord {
            title_id: Some("CUSA00001".into()),
            content_id: Some("EP0001-CUSA00001_00-SAMPLE0000000000".into()),
            title: "Sample Game".into(),
            app_type: AppType::HbGame,
            icon_bytes: Some(vec![1, 2, 3]),
            icon_reference: Some("/static/icons/sample.png".into()),
            file_path: PathBuf::from("/library/games/sample.pkg"),
            ..PackageRecord::default()
        };
        record
            .properties
            .insert("SYSTEM_VER".into(), PropertyValue::Integer(0x0505_0000));
        record
            .properties
            .insert("TITLE".into(), PropertyValue::Text("Sample Game".into()));

        let mut catalog = Catalog::new("/library", vec![record]);
        catalog.diagnostics.push(ScanDiagnostic {
            path: PathBuf::from("/library/broken.pkg"),
            message: "container is missing its metadata resource".into(),
        });
        catalog
    }

    #[test]
    fn snapshot_round_trips_without_icon_bytes() -> Result<()> {
        let temp = tempdir()?;
        let path = snapshot_path(temp.path().join("data"));
        let catalog = sample();
        catalog.persist(&path)?;

        let loaded = Catalog::load(&path)?.expect("snapshot should exist");
        assert_eq!(loaded.root, catalog.root);
        assert_eq!(loaded.generated_at, catalog.generated_at);
        assert_eq!(loaded.diagnostics, catalog.diagnostics);

        let record = &loaded.records[0];
        assert_eq!(record.title, "Sample Game");
        assert_eq!(record.app_type, AppType::HbGame);
        assert!(record.icon_bytes.is_none());
        assert_eq!(record.icon_reference.as_deref(), Some("/static/icons/sample.png"));
        assert_eq!(record.property("TITLE"), Some("Sample Game"));
        assert_eq!(
            record.properties.get("SYSTEM_VER"),
            Some(&PropertyValue::Integer(0x0505_0000))
        );
        Ok(())
    }

    #[test]
    fn missing_snapshot_is_none_and_garbage_is_an_error() -> Result<()> {
        let temp = tempdir()?;
        assert!(Catalog::load(temp.path().join("absent.json"))?.is_none());

        let garbage = temp.path().join("garbage.json");
        fs::write(&garbage, "{ not json")?;
        let err = Catalog::load(&garbage).unwrap_err();
        assert!(format!("{err:#}").contains("failed to parse catalog"));
        Ok(())
    }
}
