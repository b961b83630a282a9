//! Job search provider seam plus the Google Jobs (SerpAPI) client.

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::discovery::parse::{parse_posted_date, parse_salary_range};
use crate::models::job::CandidatePosting;

const SERPAPI_URL: &str = "https://serpapi.com/search.json";
const SEARCH_TIMEOUT_SECS: u64 = 30;
pub const SOURCE_GOOGLE_JOBS: &str = "google_jobs";

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("search API error (status {status}): {message}")]
    Api { status: u16, message: String },
}

/// One result as the provider reports it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawPosting {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub company_name: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub share_link: Option<String>,
    #[serde(default)]
    pub apply_options: Vec<ApplyOption>,
    #[serde(default)]
    pub detected_extensions: DetectedExtensions,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApplyOption {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DetectedExtensions {
    #[serde(default)]
    pub posted_at: Option<String>,
    #[serde(default)]
    pub salary: Option<String>,
}

impl RawPosting {
    /// Direct apply link first, then the listing link.
    pub fn best_url(&self) -> Option<&str> {
        self.apply_options
            .iter()
            .filter_map(|o| o.link.as_deref())
            .chain(self.link.as_deref())
            .chain(self.share_link.as_deref())
            .map(str::trim)
            .find(|l| !l.is_empty())
    }

    /// `None` when the result has no usable URL.
    pub fn into_candidate(self, today: NaiveDate) -> Option<CandidatePosting> {
        let url = self.best_url()?.to_string();
        let (salary_min, salary_max) = self
            .detected_extensions
            .salary
            .as_deref()
            .map(parse_salary_range)
            .unwrap_or((None, None));
        let posted_date = self
            .detected_extensions
            .posted_at
            .as_deref()
            .and_then(|p| parse_posted_date(p, today));

        Some(CandidatePosting {
            url,
            title: self.title.unwrap_or_else(|| "Unknown".to_string()),
            company: self.company_name.unwrap_or_else(|| "Unknown".to_string()),
            location: self.location.filter(|l| !l.trim().is_empty()),
            salary_min,
            salary_max,
            description: self.description.unwrap_or_default(),
            source: SOURCE_GOOGLE_JOBS.to_string(),
            posted_date,
        })
    }
}

#[async_trait]
pub trait JobSearch: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<RawPosting>, SearchError>;
}

#[derive(Debug, Deserialize)]
struct SerpApiResponse {
    #[serde(default)]
    jobs_results: Vec<RawPosting>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Clone)]
pub struct SerpApiClient {
    client: Client,
    api_key: String,
    results_per_query: u32,
}

impl SerpApiClient {
    pub fn new(api_key: String, results_per_query: u32) -> Result<Self, SearchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(SEARCH_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            client,
            api_key,
            results_per_query,
        })
    }
}

#[async_trait]
impl JobSearch for SerpApiClient {
    async fn search(&self, query: &str) -> Result<Vec<RawPosting>, SearchError> {
        let num = self.results_per_query.to_string();
        let response = self
            .client
            .get(SERPAPI_URL)
            .query(&[
                ("engine", "google_jobs"),
                ("q", query),
                ("location", "United States"),
                ("num", num.as_str()),
                ("hl", "en"),
                ("gl", "us"),
                ("api_key", self.api_key.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(SearchError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let parsed: SerpApiResponse = serde_json::from_str(&body).map_err(|e| SearchError::Api {
            status: status.as_u16(),
            message: format!("unreadable response: {e}"),
        })?;

        // SerpAPI reports "no results" as an error string with a 200.
        if parsed.jobs_results.is_empty() {
            if let Some(error) = parsed.error {
                debug!("Search '{query}' returned no results: {error}");
            }
        }

        debug!(
            "Search '{query}' returned {} results",
            parsed.jobs_results.len()
        );
        Ok(parsed.jobs_results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 10).unwrap()
    }

    #[test]
    fn test_apply_option_link_preferred() {
        let raw: RawPosting = serde_json::from_value(json!({
            "title": "Senior Product Manager",
            "company_name": "Northwind",
            "link": "https://www.google.com/search?jobs=1",
            "apply_options": [{"title": "Greenhouse", "link": "https://boards.greenhouse.io/northwind/1"}]
        }))
        .unwrap();

        assert_eq!(raw.best_url(), Some("https://boards.greenhouse.io/northwind/1"));
    }

    #[test]
    fn test_candidate_fields_are_extracted() {
        let raw: RawPosting = serde_json::from_value(json!({
            "title": "Senior Product Manager",
            "company_name": "Northwind",
            "location": "Anywhere",
            "description": "Own the roadmap.",
            "link": "https://jobs.example.com/1",
            "detected_extensions": {"posted_at": "3 days ago", "salary": "$190K–$230K a year"}
        }))
        .unwrap();

        let candidate = raw.into_candidate(today()).unwrap();
        assert_eq!(candidate.company, "Northwind");
        assert_eq!(candidate.salary_min, Some(190_000));
        assert_eq!(candidate.salary_max, Some(230_000));
        assert_eq!(candidate.posted_date, NaiveDate::from_ymd_opt(2026, 3, 7));
        assert_eq!(candidate.source, SOURCE_GOOGLE_JOBS);
    }

    #[test]
    fn test_result_without_url_is_dropped() {
        let raw: RawPosting = serde_json::from_value(json!({"title": "PM"})).unwrap();
        assert!(raw.into_candidate(today()).is_none());
    }
}
