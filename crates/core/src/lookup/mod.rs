//! External title lookup: search terms, candidate matching and detail merge.

/// HTTP-backed lookup service.
pub mod http;

use anyhow::Result;
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

pub use http::HttpLookup;

use crate::catalog::CatalogRules;

/// Minimum similarity a fuzzy candidate must exceed.
pub const FUZZY_THRESHOLD: f64 = 0.85;

/// Remote catalogue of human-authored title information.
///
/// Implementations may fail or return nothing; callers treat both as "no
/// enrichment".
pub trait LookupService: Send + Sync {
    /// Search for candidates matching `term`.
    fn search(&self, term: &str) -> Result<Vec<Candidate>>;

    /// Fetch details behind a candidate's link.
    fn get_details(&self, detail_link: &str) -> Result<Details>;
}

/// One search hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    /// Display name.
    pub name: String,
    /// Store product identifier, which embeds a title id.
    pub product_id: String,
    /// Link passed back to [`LookupService::get_details`].
    pub detail_link: String,
}

impl Candidate {
    /// The `CUSA12345`-style title id inside the product identifier.
    pub fn embedded_title_id(&self) -> Option<&str> {
        static TITLE_ID_RE: Lazy<Regex> =
            Lazy::new(|| Regex::new(r"[A-Z]{4}\d{5}").expect("invalid title id regex"));
        TITLE_ID_RE.find(&self.product_id).map(|m| m.as_str())
    }
}

/// Detail fields; absent fields are left untouched on the record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Details {
    /// Long-form description.
    #[serde(default)]
    pub description: Option<String>,
    /// Average user rating.
    #[serde(default)]
    pub rating: Option<String>,
    /// Publisher credit.
    #[serde(default)]
    pub publisher: Option<String>,
    /// Release date in any of the accepted formats.
    #[serde(default)]
    pub release_date: Option<String>,
}

/// Term to search for: the alias when the raw title has one, otherwise the
/// normalised title.
pub fn search_term(raw_title: &str, rules: &CatalogRules) -> String {
    match rules.alias_for(raw_title) {
        Some(alias) => alias.to_string(),
        None => normalize_title(raw_title),
    }
}

/// Strip trademark glyphs, turn `:&._` into spaces and collapse whitespace.
pub fn normalize_title(raw: &str) -> String {
    raw.chars()
        .filter(|c| !matches!(c, '™' | '®' | '©' | '℠'))
        .map(|c| match c {
            ':' | '&' | '.' | '_' => ' ',
            other => other,
        })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Case-insensitive similarity of two titles in `0.0..=1.0`.
pub fn similarity(a: &str, b: &str) -> f64 {
    strsim::normalized_levenshtein(
        &normalize_title(a).to_lowercase(),
        &normalize_title(b).to_lowercase(),
    )
}

/// Pick the candidate for a record.
///
/// A candidate whose embedded title id equals `title_id` wins outright.
/// Otherwise the most similar name wins if it scores above
/// [`FUZZY_THRESHOLD`]; ties keep the earlier candidate.
pub fn select_candidate<'a>(
    title_id: &str,
    term: &str,
    candidates: &'a [Candidate],
) -> Option<&'a Candidate> {
    if let Some(exact) = candidates
        .iter()
        .find(|candidate| candidate.embedded_title_id() == Some(title_id))
    {
        return Some(exact);
    }

    let mut best: Option<(&Candidate, f64)> = None;
    for candidate in candidates {
        let score = similarity(term, &candidate.name);
        if best.map_or(true, |(_, top)| score > top) {
            best = Some((candidate, score));
        }
    }
    best.filter(|(_, score)| *score > FUZZY_THRESHOLD)
        .map(|(candidate, _)| candidate)
}

/// Normalise `M/D/YYYY` and `D.M.YYYY` dates to `YYYY-MM-DD`.
///
/// Two-digit years are read as `20YY`; anything unparseable is returned as is.
pub fn normalize_release_date(raw: &str) -> String {
    let raw = raw.trim();
    let parts = if raw.contains('/') {
        raw.split('/').collect::<Vec<_>>()
    } else if raw.contains('.') {
        raw.split('.').collect::<Vec<_>>()
    } else {
        return raw.to_string();
    };
    let [first, second, year] = parts.as_slice() else {
        return raw.to_string();
    };
    let (month, day) = if raw.contains('/') {
        (first, second)
    } else {
        (second, first)
    };
    let year = if year.len() == 2 {
        format!("20{year}")
    } else {
        year.to_string()
    };

    match parse_date(&year, month, day) {
        Some(date) => date.format("%Y-%m-%d").to_string(),
        None => raw.to_string(),
    }
}

fn parse_date(year: &str, month: &str, day: &str) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(
        year.trim().parse().ok()?,
        month.trim().parse().ok()?,
        day.trim().parse().ok()?,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(name: &str, product_id: &str) -> Candidate {
        Candidate {
            name: name.to_string(),
            product_id: product_id.to_string(),
            detail_link: format!("https://store.example/product/{product_id}"),
        }
    }

    #[test]
    fn normalizes_titles_for_search() {
        assert_eq!(
            normalize_title("Marvel's Spider-Man™: Game of the Year"),
            "Marvel's Spider-Man Game of the Year"
        );
        assert_eq!(normalize_title("R&C  _Rift.Apart_ "), "R C Rift Apart");
    }

    #[test]
    fn alias_replaces_search_term() {
        let rules =
            CatalogRules::default().with_alias("HITMAN 3", "Hitman World of Assassination");
        assert_eq!(
            search_term("HITMAN 3", &rules),
            "Hitman World of Assassination"
        );
        assert_eq!(search_term("HITMAN® 2", &rules), "HITMAN 2");
    }

    #[test]
    fn embedded_title_id_wins_outright() {
        let candidates = [
            candidate("Sample Game", "UP0001-CUSA00002_00-SAMPLE0000000000"),
            candidate("Something Else", "UP0001-CUSA00001_00-OTHER00000000000"),
        ];
        let chosen = select_candidate("CUSA00001", "Sample Game", &candidates).unwrap();
        assert_eq!(chosen.name, "Something Else");
    }

    #[test]
    fn aliased_term_outranks_near_miss() {
        let rules =
            CatalogRules::default().with_alias("HITMAN 3", "Hitman World of Assassination");
        let term = search_term("HITMAN 3", &rules);
        let decoy = "Hitman World of Assassin Pack";
        let score = similarity(&term, decoy);
        assert!(score > 0.75 && score < FUZZY_THRESHOLD, "decoy scored {score}");

        let candidates = [
            candidate(decoy, "EP0001-CUSA99998_00-DECOY00000000000"),
            candidate(
                "Hitman World of Assassination",
                "EP0001-CUSA99999_00-HITMAN0000000000",
            ),
        ];
        let chosen = select_candidate("CUSA00003", &term, &candidates).unwrap();
        assert_eq!(chosen.name, "Hitman World of Assassination");

        // Without the alias the raw title matches nothing.
        assert!(select_candidate("CUSA00003", "HITMAN 3", &candidates).is_none());
    }

    #[test]
    fn fuzzy_ties_keep_first_and_threshold_applies() {
        let candidates = [
            candidate("Sample Game", "A"),
            candidate("Sample Game", "B"),
        ];
        let chosen = select_candidate("CUSA00001", "sample game", &candidates).unwrap();
        assert_eq!(chosen.product_id, "A");
        assert!(select_candidate("CUSA00001", "Unrelated", &candidates).is_none());
        assert!(select_candidate("CUSA00001", "Sample", &[]).is_none());
    }

    #[test]
    fn release_dates() {
        assert_eq!(normalize_release_date("2/4/2014"), "2014-02-04");
        assert_eq!(normalize_release_date("05.12.2023"), "2023-12-05");
        assert_eq!(normalize_release_date("5.12.23"), "2023-12-05");
        assert_eq!(normalize_release_date("2023-12-05"), "2023-12-05");
        assert_eq!(normalize_release_date("31/31/2020"), "31/31/2020");
        assert_eq!(normalize_release_date("soon"), "soon");
    }
}
