use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use parking_lot::Mutex;
use reqwest::blocking::Client;
use tracing::debug;

use super::{Candidate, Details, LookupService};
use crate::config::LookupConfig;

/// JSON lookup service reached over HTTP.
///
/// `GET {base_url}/{locale}/search?q=<term>` must answer with a list of
/// [`Candidate`]s, and a candidate's `detail_link` (absolute, or relative to
/// `base_url`) with a [`Details`] object. Requests are spaced by at least
/// `min_interval_ms` and bounded by `timeout_secs`.
pub struct HttpLookup {
    client: Client,
    base_url: String,
    locale: String,
    min_interval: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl HttpLookup {
    /// Build a client from configuration. Fails when no base URL is set.
    pub fn new(config: &LookupConfig) -> Result<Self> {
        let base_url = config
            .base_url
            .as_deref()
            .map(|url| url.trim().trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty())
            .ok_or_else(|| anyhow!("lookup base_url is not configured"))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .context("failed to build lookup http client")?;

        Ok(Self {
            client,
            base_url,
            locale: config.locale.clone(),
            min_interval: Duration::from_millis(config.min_interval_ms),
            last_request: Mutex::new(None),
        })
    }

    fn throttle(&self) {
        let mut last = self.last_request.lock();
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.min_interval {
                std::thread::sleep(self.min_interval - elapsed);
            }
        }
        *last = Some(Instant::now());
    }

    fn resolve(&self, link: &str) -> String {
        if link.starts_with("http://") || link.starts_with("https://") {
            link.to_string()
        } else {
            format!("{}/{}", self.base_url, link.trim_start_matches('/'))
        }
    }
}

impl LookupService for HttpLookup {
    fn search(&self, term: &str) -> Result<Vec<Candidate>> {
        self.throttle();
        let url = format!("{}/{}/search", self.base_url, self.locale);
        debug!(%url, term, "searching lookup service");
        let response = self
            .client
            .get(&url)
            .query(&[("q", term)])
            .send()
            .with_context(|| format!("search request to {url} failed"))?
            .error_for_status()
            .with_context(|| format!("search request to {url} was rejected"))?;
        response
            .json()
            .with_context(|| format!("failed to parse search results from {url}"))
    }

    fn get_details(&self, detail_link: &str) -> Result<Details> {
        self.throttle();
        let url = self.resolve(detail_link);
        debug!(%url, "fetching title details");
        let response = self
            .client
            .get(&url)
            .send()
            .with_context(|| format!("detail request to {url} failed"))?
            .error_for_status()
            .with_context(|| format!("detail request to {url} was rejected"))?;
        response
            .json()
            .with_context(|| format!("failed to parse details from {url}"))
    }
}
