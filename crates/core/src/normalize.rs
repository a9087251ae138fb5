//! Derivation of catalog fields from a raw property map.

use std::path::{Component, Path};

use indexmap::IndexMap;

use crate::models::{AppType, PackageRecord, PropertyMap, PropertyValue, Region};

/// Title property suffixes and their language codes, in table order.
pub const TITLE_LANGUAGES: [(&str, &str); 30] = [
    ("00", "JA"),
    ("01", "EN"),
    ("02", "FR"),
    ("03", "ES"),
    ("04", "DE"),
    ("05", "IT"),
    ("06", "NL"),
    ("07", "PT"),
    ("08", "RU"),
    ("09", "KO"),
    ("10", "CH"),
    ("11", "ZH"),
    ("12", "FI"),
    ("13", "SV"),
    ("14", "DA"),
    ("15", "NO"),
    ("16", "PL"),
    ("17", "BR"),
    ("18", "GB"),
    ("19", "TR"),
    ("20", "LA"),
    ("21", "AR"),
    ("22", "CA"),
    ("23", "CS"),
    ("24", "HU"),
    ("25", "EL"),
    ("26", "RO"),
    ("27", "TH"),
    ("28", "VI"),
    ("29", "IN"),
];

/// Directory keywords and the app type they imply, in precedence order.
const PATH_KEYWORDS: [(&str, AppType); 6] = [
    ("themes", AppType::Theme),
    ("dlc", AppType::Dlc),
    ("patches", AppType::Patch),
    ("apps", AppType::App),
    ("games", AppType::HbGame),
    ("other", AppType::Other),
];

const PATCH_CATEGORIES: [&str; 2] = ["gp", "gpc"];
const SIZE_UNITS: [&str; 5] = ["Bytes", "KB", "MB", "GB", "TB"];

/// Build a record from decoded properties and the package size.
///
/// Never fails: missing properties become empty or `None` fields. The file
/// path is not known here; [`classify`] refines `app_type` once it is.
pub fn normalize(properties: PropertyMap, file_size: u64) -> PackageRecord {
    let text = |label: &str| {
        properties
            .get(label)
            .and_then(PropertyValue::as_text)
            .map(str::to_string)
    };

    let title_id = text("TITLE_ID").filter(|s| !s.is_empty());
    let content_id = text("CONTENT_ID").filter(|s| !s.is_empty());
    let title = text("TITLE").unwrap_or_default();
    let category = text("CATEGORY").filter(|s| !s.is_empty());
    let app_version = text("APP_VER");

    let region = content_id.as_deref().and_then(region_of);
    let system_version = properties.get("SYSTEM_VER").and_then(system_version);
    let sdk_version = text("PUBTOOLINFO").as_deref().and_then(sdk_version);
    let (titles, languages) = language_titles(&properties, &title);

    let is_patch = category.as_deref().is_some_and(is_patch_category);
    let version = if is_patch {
        format!("{} (Update)", app_version.as_deref().unwrap_or_default())
    } else {
        text("VERSION").unwrap_or_default()
    };

    PackageRecord {
        title_id,
        content_id,
        title,
        titles,
        app_type: classify(None, category.as_deref()),
        category,
        region,
        version,
        app_version,
        size_bytes: file_size,
        size: format_size(file_size),
        system_version,
        sdk_version,
        languages,
        properties,
        ..PackageRecord::default()
    }
}

/// Format a byte count with two-decimal precision (`1536` → `1.5 KB`).
pub fn format_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < SIZE_UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    let rounded = format!("{value:.2}");
    let trimmed = rounded.trim_end_matches('0').trim_end_matches('.');
    format!("{trimmed} {}", SIZE_UNITS[unit])
}

/// Region from the second character of a content identifier.
pub fn region_of(content_id: &str) -> Option<Region> {
    content_id.chars().nth(1).map(Region::from_code)
}

/// Derive the app type from the package's directory and category.
///
/// The first directory component matching a keyword wins; when nothing
/// matches, a patch category still yields [`AppType::Patch`].
pub fn classify(directory: Option<&Path>, category: Option<&str>) -> AppType {
    let from_path = directory.and_then(|dir| {
        dir.components().find_map(|component| match component {
            Component::Normal(name) => {
                let name = name.to_string_lossy().to_lowercase();
                PATH_KEYWORDS
                    .iter()
                    .find(|(keyword, _)| *keyword == name)
                    .map(|(_, app_type)| *app_type)
            }
            _ => None,
        })
    });

    match from_path {
        Some(app_type) => app_type,
        None if category.is_some_and(is_patch_category) => AppType::Patch,
        None => AppType::Unknown,
    }
}

/// `gp`/`gpc` mark updates.
pub fn is_patch_category(category: &str) -> bool {
    PATCH_CATEGORIES
        .iter()
        .any(|code| code.eq_ignore_ascii_case(category))
}

/// `5.05`-style version from `SYSTEM_VER`.
///
/// Integer values are binary-coded, so `0x05050000` reads as `5050000`.
fn system_version(value: &PropertyValue) -> Option<String> {
    let digits = match value {
        PropertyValue::Integer(raw) => format!("{raw:X}"),
        PropertyValue::Text(text) => text.clone(),
    };
    if digits.len() < 3 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(format!("{}.{}", &digits[..1], &digits[1..3]))
}

/// `sdk_ver=05050001` inside a comma-separated tool-info string → `5.05`.
fn sdk_version(tool_info: &str) -> Option<String> {
    tool_info
        .split(',')
        .filter(|pair| pair.starts_with("sdk_ver"))
        .filter_map(|pair| pair.split_once('=').map(|(_, value)| value))
        .filter_map(|value| Some(format!("{}.{}", value.get(1..2)?, value.get(2..4)?)))
        .last()
}

fn language_titles(
    properties: &PropertyMap,
    default: &str,
) -> (IndexMap<String, String>, Vec<String>) {
    let mut titles = IndexMap::with_capacity(TITLE_LANGUAGES.len());
    let mut languages = Vec::new();
    for (suffix, code) in TITLE_LANGUAGES {
        let explicit = properties
            .get(&format!("TITLE_{suffix}"))
            .and_then(PropertyValue::as_text)
            .filter(|title| !title.is_empty());
        if explicit.is_some() {
            languages.push(code.to_string());
        }
        titles.insert(code.to_string(), explicit.unwrap_or(default).to_string());
    }
    (titles, languages)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::format::{decode_property_set, PropertySetWriter};

    fn props(writer: PropertySetWriter) -> PropertyMap {
        decode_property_set(&writer.build()).unwrap()
    }

    #[test]
    fn size_formatting() {
        assert_eq!(format_size(0), "0 Bytes");
        assert_eq!(format_size(512), "512 Bytes");
        assert_eq!(format_size(1024), "1 KB");
        assert_eq!(format_size(1536), "1.5 KB");
        assert_eq!(format_size(1_073_741_824), "1 GB");
        assert_eq!(format_size(1_288_490_189), "1.2 GB");
        assert_eq!(format_size(u64::MAX), "16777216 TB");
    }

    #[test]
    fn region_from_second_character() {
        assert_eq!(region_of("EP0001-CUSA00001_00"), Some(Region::Eu));
        assert_eq!(region_of("US0001"), Some(Region::Us));
        assert_eq!(region_of("HA0001"), Some(Region::Asia));
        assert_eq!(region_of("JI0001"), Some(Region::Jp));
        assert_eq!(region_of("XZ0001"), Some(Region::Unknown));
        assert_eq!(region_of("E"), None);
    }

    #[test]
    fn derives_versions_and_languages() {
        let record = normalize(
            props(
                PropertySetWriter::new()
                    .text("CONTENT_ID", "US0001-CUSA00001_00-SAMPLEGAME000000")
                    .text("PUBTOOLINFO", "c_date=20200101,sdk_ver=04508001,st_type=digital50")
                    .integer("SYSTEM_VER", 0x0455_0000)
                    .text("TITLE", "Sample")
                    .text("TITLE_02", "Exemple")
                    .text("TITLE_01", "Sample EN")
                    .text("TITLE_05", "")
                    .text("VERSION", "01.00"),
            ),
            2048,
        );
        assert_eq!(record.region, Some(Region::Us));
        assert_eq!(record.system_version.as_deref(), Some("4.55"));
        assert_eq!(record.sdk_version.as_deref(), Some("4.50"));
        assert_eq!(record.languages, ["EN", "FR"]);
        assert_eq!(record.titles["FR"], "Exemple");
        assert_eq!(record.titles["IT"], "Sample");
        assert_eq!(record.titles["JA"], "Sample");
        assert_eq!(record.titles.len(), 30);
        assert_eq!(record.version, "01.00");
        assert_eq!(record.size, "2 KB");
        assert_eq!(record.app_type, AppType::Unknown);
    }

    #[test]
    fn text_system_version_and_patch_version() {
        let record = normalize(
            props(
                PropertySetWriter::new()
                    .text("APP_VER", "01.09")
                    .text("CATEGORY", "gp")
                    .text("SYSTEM_VER", "672")
                    .text("VERSION", "01.00"),
            ),
            0,
        );
        assert_eq!(record.system_version.as_deref(), Some("6.72"));
        assert_eq!(record.version, "01.09 (Update)");
        assert_eq!(record.app_type, AppType::Patch);
        assert_eq!(record.size, "0 Bytes");
        assert!(record.region.is_none());
    }

    #[test]
    fn missing_properties_default() {
        let record = normalize(PropertyMap::new(), 10);
        assert!(record.title_id.is_none());
        assert_eq!(record.title, "");
        assert!(record.languages.is_empty());
        assert!(record.system_version.is_none());
        assert!(record.sdk_version.is_none());
        assert_eq!(record.app_type, AppType::Unknown);
    }

    #[test]
    fn malformed_tool_info_is_ignored() {
        assert_eq!(sdk_version("sdk_ver=0"), None);
        assert_eq!(sdk_version("sdk_ver"), None);
        assert_eq!(sdk_version("c_date=1,sdk_ver=07000001"), Some("7.00".into()));
    }

    #[test]
    fn path_keywords_take_precedence_in_path_order() {
        let dir = PathBuf::from("library/DLC/themes");
        assert_eq!(classify(Some(&dir), None), AppType::Dlc);
        assert_eq!(
            classify(Some(Path::new("Themes/winter")), None),
            AppType::Theme
        );
        assert_eq!(classify(Some(Path::new("games")), None), AppType::HbGame);
        assert_eq!(classify(Some(Path::new("mygames")), None), AppType::Unknown);
        assert_eq!(
            classify(Some(Path::new("misc")), Some("GPC")),
            AppType::Patch
        );
        assert_eq!(classify(Some(Path::new("apps")), Some("gp")), AppType::App);
    }
}
