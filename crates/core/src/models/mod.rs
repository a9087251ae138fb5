//! Shared domain models.

use std::{fmt, path::PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A decoded property-set value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    /// UTF-8 string (type tag 2).
    Text(String),
    /// Little-endian `u32` (type tag 4).
    Integer(u32),
}

impl PropertyValue {
    /// Borrow the string form, if this is a text value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            PropertyValue::Text(text) => Some(text),
            PropertyValue::Integer(_) => None,
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Text(text) => f.write_str(text),
            PropertyValue::Integer(value) => write!(f, "{value}"),
        }
    }
}

/// Property labels to values, in section-table order.
pub type PropertyMap = IndexMap<String, PropertyValue>;

/// Classification of a package within the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum AppType {
    /// Application.
    App,
    /// Homebrew or full game.
    #[serde(rename = "HB Game")]
    HbGame,
    /// Downloadable content for a base title.
    #[serde(rename = "DLC")]
    Dlc,
    /// Update for a base title.
    Patch,
    /// System theme.
    Theme,
    /// Anything filed under an `other` directory.
    Other,
    /// No classification could be derived.
    #[default]
    Unknown,
}

impl AppType {
    /// Display label used in listings.
    pub fn label(&self) -> &'static str {
        match self {
            AppType::App => "App",
            AppType::HbGame => "HB Game",
            AppType::Dlc => "DLC",
            AppType::Patch => "Patch",
            AppType::Theme => "Theme",
            AppType::Other => "Other",
            AppType::Unknown => "Unknown",
        }
    }

    /// DLC and patches borrow metadata from their base title.
    pub fn is_add_on(&self) -> bool {
        matches!(self, AppType::Dlc | AppType::Patch)
    }
}

impl fmt::Display for AppType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Publishing region encoded in the content identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Region {
    /// Europe (`P`).
    #[serde(rename = "EU")]
    Eu,
    /// United States (`S`).
    #[serde(rename = "US")]
    Us,
    /// Asia (`A`).
    Asia,
    /// Japan (`I`).
    #[serde(rename = "JP")]
    Jp,
    /// Unrecognised region letter.
    #[serde(rename = "UNKNOWN")]
    Unknown,
}

impl Region {
    /// Map the second character of a content identifier to a region.
    pub fn from_code(code: char) -> Self {
        match code {
            'P' => Region::Eu,
            'S' => Region::Us,
            'A' => Region::Asia,
            'I' => Region::Jp,
            _ => Region::Unknown,
        }
    }
}

/// One catalog entry, built from a single package file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PackageRecord {
    /// Stable product identifier (e.g. `CUSA00001`).
    pub title_id: Option<String>,
    /// Region, product and variant identifier.
    pub content_id: Option<String>,
    /// Default-language display name.
    pub title: String,
    /// Per-language display names keyed by language code, in table order.
    pub titles: IndexMap<String, String>,
    /// Raw two-letter category code.
    pub category: Option<String>,
    /// Derived classification.
    pub app_type: AppType,
    /// Region derived from the content identifier.
    pub region: Option<Region>,
    /// Display version; updates carry an `(Update)` marker.
    pub version: String,
    /// Raw application version.
    pub app_version: Option<String>,
    /// Package file size.
    pub size_bytes: u64,
    /// Human-readable size (e.g. `1.5 KB`).
    pub size: String,
    /// Required system software version (e.g. `5.05`).
    pub system_version: Option<String>,
    /// SDK version the package was built with.
    pub sdk_version: Option<String>,
    /// Language codes with an explicit title, in table order.
    pub languages: Vec<String>,
    /// Raw icon image, until persisted.
    #[serde(skip)]
    pub icon_bytes: Option<Vec<u8>>,
    /// Path or URL of the persisted icon.
    pub icon_reference: Option<String>,
    /// Location of the package file.
    pub file_path: PathBuf,
    /// Position in the sorted scan order.
    pub source_order: usize,
    /// Long-form description.
    pub description: Option<String>,
    /// Average user rating.
    pub rating: Option<String>,
    /// Publisher credit.
    pub publisher: Option<String>,
    /// Release date, `YYYY-MM-DD` when it could be parsed.
    pub release_date: Option<String>,
    /// Every decoded property, untouched.
    pub properties: PropertyMap,
}

impl PackageRecord {
    /// Look up a raw string property.
    pub fn property(&self, label: &str) -> Option<&str> {
        self.properties.get(label).and_then(PropertyValue::as_text)
    }

    /// True once the record has an icon, persisted or still in memory.
    pub fn has_icon(&self) -> bool {
        self.icon_reference.is_some() || self.icon_bytes.is_some()
    }

    /// File name of the package, if the path has one.
    pub fn file_name(&self) -> Option<&str> {
        self.file_path.file_name().and_then(|name| name.to_str())
    }

    /// Returns a user-facing label combining title and version.
    pub fn display_name(&self) -> String {
        match self.version.as_str() {
            "" => self.title.clone(),
            version => format!("{} · {}", self.title, version),
        }
    }
}
