use std::path::Path;

use chrono::Utc;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use super::icons::IconStore;
use crate::{
    catalog::{Catalog, CatalogAssembler, CatalogRules, ScanDiagnostic},
    config::AppConfig,
    error::FormatResult,
    extract::extract_file,
    lookup::{HttpLookup, LookupService},
    models::PackageRecord,
    normalize::classify,
};

const PACKAGE_EXTENSION: &str = "pkg";

/// Builds a [`Catalog`] from a directory tree of package files.
///
/// Files are visited in sorted order within each directory. Per-file failures
/// are logged and recorded as diagnostics; a scan never aborts on one bad
/// package.
pub struct Scanner {
    rules: CatalogRules,
    icons: Option<IconStore>,
    lookup: Option<Box<dyn LookupService>>,
}

impl Scanner {
    /// Scanner with the given rules, no icon persistence and no lookup.
    pub fn new(rules: CatalogRules) -> Self {
        Self {
            rules,
            icons: None,
            lookup: None,
        }
    }

    /// Scanner wired up from configuration.
    ///
    /// An enabled lookup without a usable base URL is logged and skipped.
    pub fn from_config(config: &AppConfig) -> Self {
        let mut scanner = Self::new(config.rules.clone());
        if let Some(dir) = &config.icon_dir {
            scanner = scanner.with_icons(IconStore::new(dir, config.icon_url_prefix.clone()));
        }
        if config.lookup.enabled {
            match HttpLookup::new(&config.lookup) {
                Ok(lookup) => scanner = scanner.with_lookup(Box::new(lookup)),
                Err(err) => warn!("lookup disabled: {err:#}"),
            }
        }
        scanner
    }

    /// Persist icons through `icons`.
    pub fn with_icons(mut self, icons: IconStore) -> Self {
        self.icons = Some(icons);
        self
    }

    /// Enrich App and HB Game records through `lookup`.
    pub fn with_lookup(mut self, lookup: Box<dyn LookupService>) -> Self {
        self.lookup = Some(lookup);
        self
    }

    /// Scan `root` and assemble the catalog.
    ///
    /// An unreadable root yields an empty catalog with one diagnostic.
    pub fn scan(&self, root: impl AsRef<Path>) -> Catalog {
        let root = root.as_ref();
        info!(root = %root.display(), "starting package scan");
        let mut catalog = Catalog::new(root, Vec::new());

        if !root.is_dir() {
            warn!(root = %root.display(), "library root is not a readable directory");
            catalog.diagnostics.push(ScanDiagnostic {
                path: root.to_path_buf(),
                message: "library root is not a readable directory".to_string(),
            });
            return catalog;
        }

        for entry in WalkDir::new(root).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    let path = err.path().unwrap_or(root).to_path_buf();
                    warn!(path = %path.display(), "skipping unreadable entry: {err}");
                    catalog.diagnostics.push(ScanDiagnostic {
                        path,
                        message: err.to_string(),
                    });
                    continue;
                }
            };
            if !entry.file_type().is_file() || !is_package(entry.path()) {
                continue;
            }

            let order = catalog.records.len();
            match self.process_file(root, entry.path(), order) {
                Ok(record) => catalog.records.push(record),
                Err(err) => {
                    warn!(path = %entry.path().display(), "skipping package: {err}");
                    catalog.diagnostics.push(ScanDiagnostic {
                        path: entry.path().to_path_buf(),
                        message: err.to_string(),
                    });
                }
            }
        }
        info!(
            packages = catalog.records.len(),
            skipped = catalog.diagnostics.len(),
            "initial scan complete"
        );

        let mut assembler = CatalogAssembler::new(&self.rules);
        if let Some(lookup) = &self.lookup {
            assembler = assembler.with_lookup(lookup.as_ref());
        }
        assembler.assemble(&mut catalog.records);

        catalog.generated_at = Some(Utc::now());
        catalog
    }

    fn process_file(&self, root: &Path, path: &Path, order: usize) -> FormatResult<PackageRecord> {
        debug!(path = %path.display(), "processing package");
        let mut record = extract_file(path)?;

        let directory = path.strip_prefix(root).unwrap_or(path).parent();
        record.app_type = classify(directory, record.category.as_deref());
        record.source_order = order;

        if let Some(icons) = &self.icons {
            if let Err(err) = icons.persist(&mut record) {
                warn!(path = %path.display(), "icon not saved: {err:#}");
            }
        }
        Ok(record)
    }
}

/// Scan `root` with default rules, without icon persistence or lookup.
pub fn scan(root: impl AsRef<Path>) -> Vec<PackageRecord> {
    Scanner::new(CatalogRules::default()).scan(root).records
}

pub(crate) fn is_package(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(PACKAGE_EXTENSION))
}

#[cfg(test)]
mod tests {
    use std::{fs, path::PathBuf};

    use anyhow::Result;
    use tempfile::tempdir;

    use super::*;
    use crate::{
        format::fixtures::{game_properties, ContainerFixture},
        models::AppType,
    };

    fn write_package(path: PathBuf, fixture: ContainerFixture) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, fixture.build())?;
        Ok(())
    }

    fn package(title_id: &str, content: &str, title: &str, category: &str) -> ContainerFixture {
        ContainerFixture::new().properties(game_properties(title_id, content, title, category))
    }

    #[test]
    fn scans_library_and_repairs_records() -> Result<()> {
        let temp = tempdir()?;
        let root = temp.path().join("library");
        let game_content = "EP0001-CUSA00001_00-REALGAME00000000";

        write_package(
            root.join("games/real.pkg"),
            package("CUSA00001", game_content, "Real Game", "gd").icon(b"\x89PNGgame".to_vec()),
        )?;
        write_package(
            root.join("dlc/real-dlc.pkg"),
            package("CUSA00001", "EP0001-CUSA00001_00-REALGAMEDLC00000", "dlc", "ac"),
        )?;
        write_package(
            root.join("themes/winter_1.pkg"),
            package("CUSA05551", "EP0001-CUSA05551_00-WINTERPARTNER000", "", "ac"),
        )?;
        write_package(
            root.join("themes/winter_2.pkg"),
            package("CUSA05552", "EP0001-CUSA05552_00-WINTER0000000000", "Winter", "ac")
                .icon(b"\x89PNGwinter".to_vec()),
        )?;
        fs::write(root.join("broken.pkg"), b"\x7FCNTtruncated")?;
        fs::write(root.join("notes.txt"), b"ignored")?;

        let icon_dir = temp.path().join("icons");
        let scanner =
            Scanner::new(CatalogRules::default()).with_icons(IconStore::new(&icon_dir, "/icons"));
        let catalog = scanner.scan(&root);

        assert_eq!(catalog.len(), 4);
        assert_eq!(catalog.diagnostics.len(), 1);
        assert_eq!(catalog.diagnostics[0].path, root.join("broken.pkg"));

        let names: Vec<_> = catalog.records.iter().filter_map(|r| r.file_name()).collect();
        assert_eq!(names, ["real-dlc.pkg", "real.pkg", "winter_1.pkg", "winter_2.pkg"]);
        let orders: Vec<_> = catalog.records.iter().map(|r| r.source_order).collect();
        assert_eq!(orders, [0, 1, 2, 3]);

        let game = catalog.by_path(root.join("games/real.pkg")).unwrap();
        assert_eq!(game.app_type, AppType::HbGame);
        let game_icon = format!("/icons/{game_content}.png");
        assert_eq!(game.icon_reference.as_deref(), Some(game_icon.as_str()));
        assert!(icon_dir.join(format!("{game_content}.png")).is_file());

        let dlc = catalog.by_path(root.join("dlc/real-dlc.pkg")).unwrap();
        assert_eq!(dlc.app_type, AppType::Dlc);
        assert_eq!(dlc.title, "Real Game");
        assert_eq!(dlc.icon_reference, game.icon_reference);
        assert_eq!(catalog.by_title_id("CUSA00001").count(), 2);

        let partner = catalog.by_path(root.join("themes/winter_1.pkg")).unwrap();
        let master = catalog.by_path(root.join("themes/winter_2.pkg")).unwrap();
        assert_eq!(partner.title, "Winter 1");
        assert_eq!(master.title, "Winter 2");
        assert_eq!(partner.content_id, master.content_id);
        assert_eq!(partner.icon_reference, master.icon_reference);
        Ok(())
    }

    #[test]
    fn root_keywords_do_not_classify_everything() -> Result<()> {
        let temp = tempdir()?;
        let root = temp.path().join("games");
        write_package(
            root.join("misc/update.pkg"),
            package("CUSA00002", "UP0001-CUSA00002_00-UPDATE0000000000", "Game", "gp"),
        )?;
        write_package(
            root.join("tool.PKG"),
            package("CUSA00003", "UP0001-CUSA00003_00-TOOL000000000000", "Tool", "gd"),
        )?;

        let records = scan(&root);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].app_type, AppType::Patch);
        assert_eq!(records[1].app_type, AppType::Unknown);
        assert!(records[1].icon_reference.is_none());
        Ok(())
    }

    #[test]
    fn add_ons_inherit_in_memory_icons_without_icon_store() -> Result<()> {
        let temp = tempdir()?;
        let root = temp.path();
        write_package(
            root.join("games/a.pkg"),
            package("CUSA00001", "EP0001-CUSA00001_00-REALGAME00000000", "Real", "gd")
                .icon(b"\x89PNGgame".to_vec()),
        )?;
        write_package(
            root.join("dlc/b.pkg"),
            package("CUSA00001", "EP0001-CUSA00001_00-REALGAMEDLC00000", "dlc", "ac"),
        )?;

        let records = scan(root);
        let dlc = records
            .iter()
            .find(|record| record.file_name() == Some("b.pkg"))
            .expect("dlc record");
        assert_eq!(dlc.title, "Real");
        assert!(dlc.has_icon());
        assert_eq!(dlc.icon_bytes.as_deref(), Some(&b"\x89PNGgame"[..]));
        Ok(())
    }

    #[test]
    fn missing_root_is_an_empty_catalog_with_diagnostic() {
        let catalog = Scanner::new(CatalogRules::default()).scan("/nonexistent/library/root");
        assert!(catalog.is_empty());
        assert_eq!(catalog.diagnostics.len(), 1);
        assert!(catalog.generated_at.is_some());
    }
}
