use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use tokio::{sync::mpsc, task};
use tracing::{error, info};

use pkgshelf_core::{
    catalog::Catalog, config::AppConfig, extract_file, store, CatalogWatcher, ScanEvent, Scanner,
};

pub async fn scan(
    mut config: AppConfig,
    root: Option<PathBuf>,
    output: Option<PathBuf>,
    no_lookup: bool,
) -> Result<()> {
    if no_lookup {
        config.lookup.enabled = false;
    }
    let root = root.unwrap_or_else(|| config.library_root.clone());
    let output = output.unwrap_or_else(|| config.catalog_path.clone());

    // The lookup client blocks, so the whole scan runs off the async workers.
    let catalog = task::spawn_blocking(move || Scanner::from_config(&config).scan(root))
        .await
        .context("scan worker failed")?;

    for record in &catalog.records {
        println!(
            "{:<8} {:<10} {}",
            record.app_type.label(),
            record.title_id.as_deref().unwrap_or("-"),
            record.display_name()
        );
    }
    for diagnostic in &catalog.diagnostics {
        println!("skipped  {}: {}", diagnostic.path.display(), diagnostic.message);
    }

    catalog.persist(&output)?;
    info!(
        packages = catalog.len(),
        skipped = catalog.diagnostics.len(),
        path = %output.display(),
        "catalog saved"
    );
    Ok(())
}

pub async fn inspect(file: PathBuf) -> Result<()> {
    let record = task::spawn_blocking(move || {
        extract_file(&file).with_context(|| format!("failed to read package {}", file.display()))
    })
    .await
    .context("extract worker failed")??;

    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}

pub fn export(config: AppConfig, catalog: Option<PathBuf>, base_uri: String) -> Result<()> {
    let catalog = load_catalog(&config, catalog)?;
    let items = store::listing(&catalog, &base_uri);
    println!("{}", serde_json::to_string_pretty(&items)?);
    Ok(())
}

pub fn list(config: AppConfig, catalog: Option<PathBuf>, query: Option<String>) -> Result<()> {
    let catalog = load_catalog(&config, catalog)?;
    for record in catalog.matching(query.as_deref().unwrap_or_default()) {
        println!(
            "{:<8} {:<10} {:<36} {}",
            record.app_type.label(),
            record.title_id.as_deref().unwrap_or("-"),
            record.content_id.as_deref().unwrap_or("-"),
            record.display_name()
        );
    }
    Ok(())
}

pub async fn watch(config: AppConfig, root: Option<PathBuf>, output: Option<PathBuf>) -> Result<()> {
    let root = root.unwrap_or_else(|| config.library_root.clone());
    let output = output.unwrap_or_else(|| config.catalog_path.clone());

    let scanner = task::spawn_blocking(move || Scanner::from_config(&config))
        .await
        .context("failed to prepare scanner")?;
    let watcher = CatalogWatcher::new(Arc::new(scanner), root);

    let (sender, mut events) = mpsc::channel(8);
    let watching = tokio::spawn(watcher.run(sender));

    while let Some(event) = events.recv().await {
        match event {
            ScanEvent::Completed(catalog) => match catalog.persist(&output) {
                Ok(()) => info!(
                    packages = catalog.len(),
                    skipped = catalog.diagnostics.len(),
                    path = %output.display(),
                    "catalog refreshed"
                ),
                Err(err) => error!("failed to save catalog: {err:#}"),
            },
            ScanEvent::Error(err) => error!("scan failed: {err:#}"),
        }
    }

    watching.await.context("watcher task failed")?
}

fn load_catalog(config: &AppConfig, path: Option<PathBuf>) -> Result<Catalog> {
    let path = path.unwrap_or_else(|| config.catalog_path.clone());
    Catalog::load(&path)?
        .with_context(|| format!("no catalog at {}; run `pkgshelf scan` first", path.display()))
}
