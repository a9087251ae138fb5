use serde::{Deserialize, Serialize};

const DEFAULT_PLACEHOLDERS: [&str; 5] = ["sample", "test", "dlc", "patch", "update"];

/// Table data consulted while assembling a catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogRules {
    /// Titles that mark a record as lacking a real name (case-insensitive).
    pub placeholder_titles: Vec<String>,
    /// Search terms to use instead of a title that searches poorly.
    pub title_aliases: Vec<TitleAlias>,
}

/// Maps an exact raw title to the term submitted to the lookup service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TitleAlias {
    /// Raw title as found in the package.
    pub title: String,
    /// Search term to submit instead.
    pub search: String,
}

impl Default for CatalogRules {
    fn default() -> Self {
        Self {
            placeholder_titles: DEFAULT_PLACEHOLDERS.iter().map(|s| s.to_string()).collect(),
            title_aliases: vec![TitleAlias {
                title: "HITMAN 3".to_string(),
                search: "Hitman World of Assassination".to_string(),
            }],
        }
    }
}

impl CatalogRules {
    /// Add or replace an alias.
    pub fn with_alias(mut self, title: &str, search: &str) -> Self {
        self.title_aliases.retain(|alias| alias.title != title);
        self.title_aliases.push(TitleAlias {
            title: title.to_string(),
            search: search.to_string(),
        });
        self
    }

    /// Whether `title` is a known placeholder.
    pub fn is_placeholder(&self, title: &str) -> bool {
        let title = title.trim();
        self.placeholder_titles
            .iter()
            .any(|placeholder| placeholder.eq_ignore_ascii_case(title))
    }

    /// Search alias for an exact raw title.
    pub fn alias_for(&self, title: &str) -> Option<&str> {
        self.title_aliases
            .iter()
            .find(|alias| alias.title == title)
            .map(|alias| alias.search.as_str())
    }
}
