//! Homebrew-store listing rows built from catalog records.

use serde::{Deserialize, Serialize};

use crate::{
    catalog::Catalog,
    models::{AppType, PackageRecord},
};

/// Maximum characters per description line.
pub const DESCRIPTION_LINE: usize = 150;
/// Minimum firmware advertised for every item.
pub const MIN_FIRMWARE: &str = "5.05+";
/// Author shown when the record has no publisher.
pub const DEFAULT_AUTHOR: &str = "HB-Store CDN";
/// Release date shown when the record has none.
pub const DEFAULT_RELEASE_DATE: &str = "2024-01-01";

const STORE_DATA_DIR: &str = "/user/app/NPXS39041/storedata";

/// One row of the console-side store listing.
///
/// Field names follow the store database columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreItem {
    /// Row number, also the download slot.
    pub pid: u32,
    /// Title id.
    pub id: String,
    /// Display title.
    pub name: String,
    /// First description line.
    pub desc: String,
    /// Absolute icon URL, empty without an icon.
    pub image: String,
    /// Download URL.
    pub package: String,
    /// Advertised version.
    pub version: String,
    /// Console-side icon cache path.
    pub picpath: String,
    /// Second description line.
    pub desc_1: String,
    /// Third description line.
    pub desc_2: String,
    /// Rating, `N/A` when unknown.
    #[serde(rename = "ReviewStars")]
    pub review_stars: String,
    /// Human-readable package size.
    #[serde(rename = "Size")]
    pub size: String,
    /// Publisher credit.
    #[serde(rename = "Author")]
    pub author: String,
    /// App type label.
    pub apptype: String,
    /// Minimum firmware.
    pub pv: String,
    /// Same as `image`.
    pub main_icon_path: String,
    /// Same as `picpath`.
    pub main_menu_pic: String,
    /// Release date, `YYYY-MM-DD`.
    pub releaseddate: String,
}

impl StoreItem {
    /// Build the listing row for `record`, served from `base_uri` under `pid`.
    pub fn from_record(record: &PackageRecord, base_uri: &str, pid: u32) -> Self {
        let base_uri = base_uri.trim_end_matches('/');
        let title_id = record.title_id.clone().unwrap_or_else(|| "N/A".to_string());
        let content_id = record.content_id.clone().unwrap_or_else(|| title_id.clone());

        let version = match record.app_type {
            AppType::Patch => record.app_version.clone().unwrap_or_else(|| record.version.clone()),
            _ => record.version.clone(),
        };
        let icon_url = record
            .icon_reference
            .as_deref()
            .map(|reference| format!("{base_uri}{reference}"))
            .unwrap_or_default();
        let picture = format!("{STORE_DATA_DIR}/{content_id}.png");

        let mut lines = chunk_description(record.description.as_deref().unwrap_or_default())
            .into_iter();
        let mut next_line = || lines.next().unwrap_or_default();
        let (desc, desc_1, desc_2) = (next_line(), next_line(), next_line());

        Self {
            pid,
            id: title_id,
            name: non_empty(&record.title).unwrap_or("No Title").to_string(),
            desc,
            image: icon_url.clone(),
            package: format!("{base_uri}/api/download/{pid}"),
            version,
            picpath: picture.clone(),
            desc_1,
            desc_2,
            review_stars: or_default(record.rating.as_deref(), "N/A"),
            size: or_default(Some(record.size.as_str()), "N/A"),
            author: or_default(record.publisher.as_deref(), DEFAULT_AUTHOR),
            apptype: record.app_type.label().to_string(),
            pv: MIN_FIRMWARE.to_string(),
            main_icon_path: icon_url,
            main_menu_pic: picture,
            releaseddate: or_default(record.release_date.as_deref(), DEFAULT_RELEASE_DATE),
        }
    }
}

/// Listing rows for every record, numbered from 1 in catalog order.
pub fn listing(catalog: &Catalog, base_uri: &str) -> Vec<StoreItem> {
    catalog
        .records
        .iter()
        .zip(1..)
        .map(|(record, pid)| StoreItem::from_record(record, base_uri, pid))
        .collect()
}

/// Word-wrap `text` into lines of at most [`DESCRIPTION_LINE`] characters.
///
/// Newlines are folded into spaces. A single word longer than a line gets a
/// line of its own. Empty input yields one empty line.
pub fn chunk_description(text: &str) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        let needed = current.chars().count() + word.chars().count() + 1;
        if !current.is_empty() && needed > DESCRIPTION_LINE {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }
    lines
}

fn non_empty(value: &str) -> Option<&str> {
    Some(value).filter(|v| !v.trim().is_empty())
}

fn or_default(value: Option<&str>, fallback: &str) -> String {
    value.and_then(non_empty).unwrap_or(fallback).to_string()
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    fn record() -> PackageRecord {
        PackageRecord {
            title_id: Some("CUSA00001".into()),
            content_id: Some("EP0001-CUSA00001_00-SAMPLE0000000000".into()),
            title: "Sample Game".into(),
            app_type: AppType::HbGame,
            version: "01.00".into(),
            app_version: Some("01.05".into()),
            size: "1.5 GB".into(),
            icon_reference: Some("/static/icons/sample.png".into()),
            file_path: PathBuf::from("/library/games/sample.pkg"),
            ..PackageRecord::default()
        }
    }

    #[test]
    fn builds_row_with_defaults() {
        let item = StoreItem::from_record(&record(), "http://10.0.0.2:8080/", 7);
        assert_eq!(item.pid, 7);
        assert_eq!(item.id, "CUSA00001");
        assert_eq!(item.name, "Sample Game");
        assert_eq!(item.package, "http://10.0.0.2:8080/api/download/7");
        assert_eq!(item.image, "http://10.0.0.2:8080/static/icons/sample.png");
        assert_eq!(item.main_icon_path, item.image);
        assert_eq!(
            item.picpath,
            "/user/app/NPXS39041/storedata/EP0001-CUSA00001_00-SAMPLE0000000000.png"
        );
        assert_eq!(item.main_menu_pic, item.picpath);
        assert_eq!(item.version, "01.00");
        assert_eq!(item.review_stars, "N/A");
        assert_eq!(item.size, "1.5 GB");
        assert_eq!(item.author, DEFAULT_AUTHOR);
        assert_eq!(item.apptype, "HB Game");
        assert_eq!(item.pv, "5.05+");
        assert_eq!(item.releaseddate, DEFAULT_RELEASE_DATE);
        assert_eq!((item.desc.as_str(), item.desc_1.as_str()), ("", ""));
    }

    #[test]
    fn patches_advertise_app_version_and_fields_use_store_names() -> anyhow::Result<()> {
        let mut patch = record();
        patch.app_type = AppType::Patch;
        patch.publisher = Some("Studio".into());
        patch.rating = Some("4.5".into());
        patch.release_date = Some("2021-03-04".into());
        patch.icon_reference = None;

        let item = StoreItem::from_record(&patch, "http://host", 1);
        assert_eq!(item.version, "01.05");
        assert_eq!(item.author, "Studio");
        assert_eq!(item.image, "");

        let json = serde_json::to_value(&item)?;
        assert_eq!(json["ReviewStars"], "4.5");
        assert_eq!(json["Author"], "Studio");
        assert_eq!(json["releaseddate"], "2021-03-04");
        assert_eq!(json["apptype"], "Patch");
        Ok(())
    }

    #[test]
    fn descriptions_wrap_on_word_boundaries() {
        let word = "abcdefghi";
        let text = vec![word; 40].join(" ");
        let lines = chunk_description(&format!("{text}\n{text}"));
        assert!(lines.iter().all(|line| line.chars().count() <= DESCRIPTION_LINE));
        assert_eq!(lines[0].split(' ').count(), 15);
        assert_eq!(lines.join(" ").split(' ').count(), 80);

        assert_eq!(chunk_description(""), vec![String::new()]);
        let long = "x".repeat(200);
        assert_eq!(chunk_description(&format!("{long} tail")), vec![long, "tail".to_string()]);
    }

    #[test]
    fn listing_numbers_records_from_one() {
        let catalog = Catalog::new("/library", vec![record(), record()]);
        let pids: Vec<_> = listing(&catalog, "http://host")
            .iter()
            .map(|item| item.pid)
            .collect();
        assert_eq!(pids, [1, 2]);
    }
}
