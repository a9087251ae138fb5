use std::{
    collections::{hash_map::Entry, HashMap},
    path::{Path, PathBuf},
};

use anyhow::Result;
use tracing::{debug, info, warn};

use super::rules::CatalogRules;
use crate::{
    lookup::{normalize_release_date, search_term, select_candidate, Details, LookupService},
    models::{AppType, PackageRecord},
};

const THEME_MASTER_SUFFIX: &str = "_2.pkg";
const UNTITLED_THEME: &str = "Untitled Theme";

/// Counts of records touched by each pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AssemblyReport {
    /// DLC/patch records that borrowed fields from their master.
    pub inherited: usize,
    /// Theme pairs linked.
    pub themes_paired: usize,
    /// Records enriched from the lookup service.
    pub enriched: usize,
}

/// Runs the repair passes over a complete record set.
pub struct CatalogAssembler<'a> {
    rules: &'a CatalogRules,
    lookup: Option<&'a dyn LookupService>,
}

/// Fields a master record lends to its DLC and patches.
struct MasterEntry {
    title: String,
    icon_reference: Option<String>,
    icon_bytes: Option<Vec<u8>>,
    publisher: Option<String>,
    release_date: Option<String>,
    rating: Option<String>,
    file_path: PathBuf,
}

impl MasterEntry {
    fn has_icon(&self) -> bool {
        self.icon_reference.is_some() || self.icon_bytes.is_some()
    }
}

impl<'a> CatalogAssembler<'a> {
    /// Assembler without external enrichment.
    pub fn new(rules: &'a CatalogRules) -> Self {
        Self {
            rules,
            lookup: None,
        }
    }

    /// Enable enrichment through `lookup`.
    pub fn with_lookup(mut self, lookup: &'a dyn LookupService) -> Self {
        self.lookup = Some(lookup);
        self
    }

    /// Run inheritance, theme pairing and enrichment, in that order.
    pub fn assemble(&self, records: &mut [PackageRecord]) -> AssemblyReport {
        let report = AssemblyReport {
            inherited: self.inherit_from_masters(records),
            themes_paired: self.pair_themes(records),
            enriched: self.enrich(records),
        };
        info!(
            records = records.len(),
            inherited = report.inherited,
            themes_paired = report.themes_paired,
            enriched = report.enriched,
            "catalog assembled"
        );
        report
    }

    /// Fill missing icon, title, publisher, release date and rating on DLC and
    /// patch records from the first real record sharing their title id.
    ///
    /// Returns the number of records changed. Present values are never
    /// overwritten, and master records are left untouched.
    pub fn inherit_from_masters(&self, records: &mut [PackageRecord]) -> usize {
        let masters = self.master_index(records);

        let mut repaired = 0;
        for record in records.iter_mut().filter(|r| r.app_type.is_add_on()) {
            let Some(master) = record.title_id.as_deref().and_then(|id| masters.get(id)) else {
                continue;
            };

            let mut changed = false;
            if !record.has_icon() && master.has_icon() {
                record.icon_reference = master.icon_reference.clone();
                record.icon_bytes = master.icon_bytes.clone();
                changed = true;
            }
            if self.needs_title(&record.title) {
                record.title = master.title.clone();
                changed = true;
            }
            changed |= inherit(&mut record.publisher, &master.publisher);
            changed |= inherit(&mut record.release_date, &master.release_date);
            changed |= inherit(&mut record.rating, &master.rating);

            if changed {
                debug!(
                    path = %record.file_path.display(),
                    master = %master.file_path.display(),
                    "inherited metadata from master record"
                );
                repaired += 1;
            }
        }
        repaired
    }

    fn master_index(&self, records: &[PackageRecord]) -> HashMap<String, MasterEntry> {
        let mut masters: HashMap<String, MasterEntry> = HashMap::new();
        for record in records {
            if record.app_type.is_add_on() || self.needs_title(&record.title) {
                continue;
            }
            let Some(title_id) = record.title_id.clone() else {
                continue;
            };
            match masters.entry(title_id) {
                Entry::Occupied(existing) => {
                    warn!(
                        title_id = %existing.key(),
                        kept = %existing.get().file_path.display(),
                        ignored = %record.file_path.display(),
                        "several master records share a title id; keeping the first"
                    );
                }
                Entry::Vacant(slot) => {
                    slot.insert(MasterEntry {
                        title: record.title.clone(),
                        icon_reference: record.icon_reference.clone(),
                        icon_bytes: record.icon_bytes.clone(),
                        publisher: record.publisher.clone(),
                        release_date: record.release_date.clone(),
                        rating: record.rating.clone(),
                        file_path: record.file_path.clone(),
                    });
                }
            }
        }
        masters
    }

    fn needs_title(&self, title: &str) -> bool {
        title.trim().is_empty() || self.rules.is_placeholder(title)
    }

    /// Link `<base>_1.pkg` theme partners to their `<base>_2.pkg` master.
    ///
    /// The partner takes the master's title, icon and identifiers; the two
    /// titles then get ` 1` and ` 2` suffixes. Returns the number of pairs.
    pub fn pair_themes(&self, records: &mut [PackageRecord]) -> usize {
        let by_path: HashMap<PathBuf, usize> = records
            .iter()
            .enumerate()
            .map(|(index, record)| (record.file_path.clone(), index))
            .collect();

        let mut paired = 0;
        for master_index in 0..records.len() {
            let master = &records[master_index];
            if master.app_type != AppType::Theme {
                continue;
            }
            let Some(partner_index) = partner_path(&master.file_path)
                .and_then(|path| by_path.get(&path).copied())
                .filter(|index| *index != master_index)
            else {
                continue;
            };

            let base_title = match master.title.trim() {
                "" => UNTITLED_THEME.to_string(),
                _ => master.title.clone(),
            };
            let icon_reference = master.icon_reference.clone();
            let icon_bytes = master.icon_bytes.clone();
            let title_id = master.title_id.clone();
            let content_id = master.content_id.clone();

            let partner = &mut records[partner_index];
            debug!(
                partner = %partner.file_path.display(),
                title = %base_title,
                "pairing theme files"
            );
            partner.title = format!("{base_title} 1");
            if icon_reference.is_some() || icon_bytes.is_some() {
                partner.icon_reference = icon_reference;
                partner.icon_bytes = icon_bytes;
            }
            partner.title_id = title_id;
            partner.content_id = content_id;

            records[master_index].title = format!("{base_title} 2");
            paired += 1;
        }
        paired
    }

    /// Merge lookup details into App and HB Game records.
    ///
    /// Lookup failures are logged and leave the record as it was. Returns the
    /// number of records that received details.
    pub fn enrich(&self, records: &mut [PackageRecord]) -> usize {
        let Some(lookup) = self.lookup else {
            return 0;
        };

        let mut enriched = 0;
        for record in records
            .iter_mut()
            .filter(|record| matches!(record.app_type, AppType::App | AppType::HbGame))
        {
            let Some(title_id) = record.title_id.clone() else {
                continue;
            };
            if record.title.trim().is_empty() {
                continue;
            }
            let term = search_term(&record.title, self.rules);
            match lookup_details(lookup, &title_id, &term) {
                Ok(Some(details)) => {
                    merge_details(record, details);
                    enriched += 1;
                }
                Ok(None) => debug!(%title_id, %term, "no lookup match"),
                Err(err) => warn!(
                    %title_id,
                    %term,
                    path = %record.file_path.display(),
                    "lookup failed: {err:#}"
                ),
            }
        }
        enriched
    }
}

/// Copy `source` into `target` when the target is empty.
fn inherit(target: &mut Option<String>, source: &Option<String>) -> bool {
    let empty = target.as_deref().map_or(true, |value| value.trim().is_empty());
    match source {
        Some(value) if empty => {
            *target = Some(value.clone());
            true
        }
        _ => false,
    }
}

fn partner_path(master: &Path) -> Option<PathBuf> {
    let name = master.file_name()?.to_str()?;
    let split = name.len().checked_sub(THEME_MASTER_SUFFIX.len())?;
    if !name.is_char_boundary(split)
        || !name[split..].eq_ignore_ascii_case(THEME_MASTER_SUFFIX)
    {
        return None;
    }
    let (base, suffix) = name.split_at(split);
    // Keep the extension's case: `foo_2.PKG` pairs with `foo_1.PKG`.
    Some(master.with_file_name(format!("{base}_1{}", &suffix[2..])))
}

fn lookup_details(
    lookup: &dyn LookupService,
    title_id: &str,
    term: &str,
) -> Result<Option<Details>> {
    let candidates = lookup.search(term)?;
    let Some(candidate) = select_candidate(title_id, term, &candidates) else {
        return Ok(None);
    };
    debug!(title_id, candidate = %candidate.name, "matched lookup candidate");
    lookup.get_details(&candidate.detail_link).map(Some)
}

fn merge_details(record: &mut PackageRecord, details: Details) {
    let supplied = |value: Option<String>| value.filter(|v| !v.trim().is_empty());
    if let Some(description) = supplied(details.description) {
        record.description = Some(description);
    }
    if let Some(rating) = supplied(details.rating) {
        record.rating = Some(rating);
    }
    if let Some(publisher) = supplied(details.publisher) {
        record.publisher = Some(publisher);
    }
    if let Some(release_date) = supplied(details.release_date) {
        record.release_date = Some(normalize_release_date(&release_date));
    }
}
