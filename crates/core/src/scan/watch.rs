use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use anyhow::{anyhow, Context, Result};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::{sync::mpsc, task, time};
use tracing::{debug, info, warn};

use super::scanner::{is_package, Scanner};
use crate::catalog::Catalog;

/// Quiet period a burst of filesystem changes must settle for before a scan.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(750);

/// Events emitted by the catalog watcher.
#[derive(Debug)]
pub enum ScanEvent {
    /// A scan finished and no newer change arrived while it ran.
    Completed(Catalog),
    /// The scan worker failed.
    Error(anyhow::Error),
}

/// Re-scans a library root whenever packages under it change.
pub struct CatalogWatcher {
    scanner: Arc<Scanner>,
    root: PathBuf,
    debounce: Duration,
}

impl CatalogWatcher {
    /// Watch `root`, scanning with `scanner`.
    pub fn new(scanner: Arc<Scanner>, root: impl Into<PathBuf>) -> Self {
        Self {
            scanner,
            root: root.into(),
            debounce: DEFAULT_DEBOUNCE,
        }
    }

    /// Override the debounce window.
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    /// Library root being watched.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Scan once, then keep scanning after every settled burst of changes,
    /// sending results to `sender`.
    ///
    /// A scan that sees further changes while running is discarded and
    /// immediately followed by a fresh one. Returns when the receiver is
    /// dropped.
    pub async fn run(self, sender: mpsc::Sender<ScanEvent>) -> Result<()> {
        let (change_tx, mut changes) = mpsc::channel(64);
        let _watcher = self.watch(change_tx)?;
        info!(root = %self.root.display(), "watching library for changes");

        let mut dirty = true;
        loop {
            if !dirty && changes.recv().await.is_none() {
                return Ok(());
            }
            self.settle(&mut changes).await;

            let scanner = Arc::clone(&self.scanner);
            let root = self.root.clone();
            let mut scan = task::spawn_blocking(move || scanner.scan(root));

            dirty = false;
            let joined = loop {
                tokio::select! {
                    joined = &mut scan => break joined,
                    change = changes.recv() => match change {
                        Some(()) => dirty = true,
                        None => break (&mut scan).await,
                    },
                }
            };

            let event = match joined {
                Ok(_) if dirty => {
                    debug!("library changed during scan; discarding result");
                    continue;
                }
                Ok(catalog) => ScanEvent::Completed(catalog),
                Err(err) => ScanEvent::Error(anyhow!(err).context("scan worker failed")),
            };
            if sender.send(event).await.is_err() {
                debug!("scan receiver dropped; stopping watcher");
                return Ok(());
            }
        }
    }

    fn watch(&self, changes: mpsc::Sender<()>) -> Result<RecommendedWatcher> {
        let mut watcher =
            notify::recommended_watcher(move |result: notify::Result<Event>| match result {
                Ok(event) if is_relevant(&event) => {
                    // A full queue already guarantees a rescan.
                    let _ = changes.try_send(());
                }
                Ok(_) => {}
                Err(err) => warn!("filesystem watch error: {err}"),
            })
            .context("failed to create filesystem watcher")?;
        watcher
            .watch(&self.root, RecursiveMode::Recursive)
            .with_context(|| format!("failed to watch {}", self.root.display()))?;
        Ok(watcher)
    }

    async fn settle(&self, changes: &mut mpsc::Receiver<()>) {
        while let Ok(Some(())) = time::timeout(self.debounce, changes.recv()).await {}
    }
}

/// Changes to package files, or to paths without an extension (directories),
/// trigger a rescan. Reads and other files such as icons do not.
fn is_relevant(event: &Event) -> bool {
    if matches!(event.kind, EventKind::Access(_)) {
        return false;
    }
    event
        .paths
        .iter()
        .any(|path| path.extension().is_none() || is_package(path))
}
