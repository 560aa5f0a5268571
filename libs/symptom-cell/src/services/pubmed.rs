//! PubMed E-utilities lookup for supporting references.

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use shared_database::AppState;

use crate::models::{AnalysisError, Reference};

pub const DEFAULT_MAX_RESULTS: usize = 3;
const TIMEOUT: Duration = Duration::from_secs(10);
const TOOL: &str = "hk-doctor-match";
const MAX_TERM_WORDS: usize = 8;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    esearchresult: SearchResult,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    #[serde(default)]
    idlist: Vec<String>,
}

pub struct PubMedClient {
    http: Client,
    base_url: String,
    email: String,
}

impl PubMedClient {
    pub fn new(http: Client, base_url: &str, email: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            email: email.to_string(),
        }
    }

    pub fn from_state(state: &AppState) -> Self {
        Self::new(state.http.clone(), &state.config.pubmed_base_url, &state.config.pubmed_email)
    }

    /// References for `term`. Failures are logged and yield no references.
    pub async fn references(&self, term: &str, max_results: usize) -> Vec<Reference> {
        if term.trim().is_empty() {
            return Vec::new();
        }

        match self.search(term, max_results).await {
            Ok(references) => references,
            Err(e) => {
                warn!("PubMed lookup for '{}' failed: {}", term, e);
                Vec::new()
            }
        }
    }

    pub async fn search(&self, term: &str, max_results: usize) -> Result<Vec<Reference>, AnalysisError> {
        debug!("Searching PubMed for '{}'", term);

        let retmax = max_results.to_string();
        let mut params = vec![
            ("db", "pubmed"),
            ("retmode", "json"),
            ("retmax", retmax.as_str()),
            ("sort", "relevance"),
            ("term", term),
            ("tool", TOOL),
        ];
        if !self.email.is_empty() {
            params.push(("email", self.email.as_str()));
        }

        let response = self
            .http
            .get(format!("{}/esearch.fcgi", self.base_url))
            .timeout(TIMEOUT)
            .query(&params)
            .send()
            .await?
            .error_for_status()?;

        let ids = response.json::<SearchResponse>().await?.esearchresult.idlist;
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let id_list = ids.join(",");
        let summary: Value = self
            .http
            .get(format!("{}/esummary.fcgi", self.base_url))
            .timeout(TIMEOUT)
            .query(&[("db", "pubmed"), ("retmode", "json"), ("id", id_list.as_str()), ("tool", TOOL)])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(ids.iter().filter_map(|id| parse_summary(id, &summary["result"][id])).collect())
    }
}

fn parse_summary(pmid: &str, doc: &Value) -> Option<Reference> {
    let title = doc["title"].as_str()?.trim().to_string();
    if title.is_empty() {
        return None;
    }

    let journal = doc["fulljournalname"]
        .as_str()
        .or_else(|| doc["source"].as_str())
        .unwrap_or_default()
        .to_string();

    Some(Reference {
        pmid: pmid.to_string(),
        title,
        journal,
        pub_date: doc["pubdate"].as_str().unwrap_or_default().to_string(),
        url: format!("https://pubmed.ncbi.nlm.nih.gov/{}/", pmid),
    })
}

/// Search term from the top specialty and the English words of the symptom
/// text. Chinese text is left out since PubMed indexes English.
pub fn search_term(specialty_en: &str, symptoms: &str) -> String {
    let words: Vec<&str> = symptoms
        .split(|c: char| !c.is_ascii_alphanumeric() && c != '-')
        .filter(|w| w.len() > 2)
        .take(MAX_TERM_WORDS)
        .collect();

    if words.is_empty() {
        specialty_en.to_string()
    } else {
        format!("{} {}", words.join(" "), specialty_en).trim().to_string()
    }
}
