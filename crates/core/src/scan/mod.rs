//! Library scanning and change watching.

/// Icon persistence.
pub mod icons;
/// Directory walker that builds a catalog.
pub mod scanner;
/// Filesystem watcher that re-scans on change.
pub mod watch;

pub use icons::IconStore;
pub use scanner::{scan, Scanner};
pub use watch::{CatalogWatcher, ScanEvent};
