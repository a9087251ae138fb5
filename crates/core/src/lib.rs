#![warn(clippy::all, missing_docs)]

//! Core library for cataloguing console package files.
//!
//! This crate reads package containers and their embedded property sets,
//! normalises them into catalog records, repairs records across the whole
//! library and persists the result for the command-line front end.

pub mod catalog;
pub mod config;
pub mod error;
pub mod extract;
pub mod format;
pub mod lookup;
pub mod manifest;
pub mod models;
pub mod normalize;
pub mod scan;
pub mod store;

pub use catalog::{Catalog, CatalogAssembler, CatalogRules, ScanDiagnostic};
pub use config::AppConfig;
pub use error::{FormatError, FormatResult};
pub use extract::{extract, extract_file};
pub use lookup::{HttpLookup, LookupService};
pub use models::{AppType, PackageRecord, PropertyMap, PropertyValue, Region};
pub use scan::{scan, CatalogWatcher, IconStore, ScanEvent, Scanner};
pub use store::StoreItem;
