use std::collections::HashMap;
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use reqwest::blocking::Client;
use serde::Deserialize;

use crate::domain::TaxonId;
use crate::error::ValidatorError;
use crate::http::{build_client, send_with_retries};
use crate::sink::LogSink;

pub const DEFAULT_EUTILS_URL: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils/esearch.fcgi";

static MIXED_ORGANISMS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r" and | \+ ").unwrap());

/// Search backend returning the raw `idlist` for a taxonomy term.
pub trait TaxonomySearch: Send + Sync {
    fn search(&self, term: &str) -> Result<Vec<String>, ValidatorError>;
}

#[derive(Debug, Deserialize)]
pub struct EsearchResponse {
    pub esearchresult: EsearchResult,
}

#[derive(Debug, Deserialize)]
pub struct EsearchResult {
    #[serde(default)]
    pub idlist: Vec<String>,
}

#[derive(Clone)]
pub struct EutilsHttpClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl EutilsHttpClient {
    pub fn new() -> Result<Self, ValidatorError> {
        Self::with_base_url(DEFAULT_EUTILS_URL)
    }

    pub fn with_base_url(base_url: &str) -> Result<Self, ValidatorError> {
        let client = build_client(Duration::from_secs(30), ValidatorError::TaxonomyHttp)?;
        Ok(Self {
            client,
            base_url: base_url.to_string(),
            api_key: normalize_api_key(std::env::var("NCBI_API_KEY").ok()),
        })
    }

    /// Overrides the key taken from `NCBI_API_KEY`; blank keys are dropped.
    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = normalize_api_key(api_key);
        self
    }
}

impl TaxonomySearch for EutilsHttpClient {
    fn search(&self, term: &str) -> Result<Vec<String>, ValidatorError> {
        let response = send_with_retries(
            || {
                let mut request = self.client.get(&self.base_url).query(&[
                    ("db", "taxonomy"),
                    ("term", term),
                    ("retmode", "json"),
                ]);
                if let Some(key) = &self.api_key {
                    request = request.query(&[("api_key", key.as_str())]);
                }
                request
            },
            ValidatorError::TaxonomyHttp,
        )?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .unwrap_or_else(|_| "NCBI taxonomy request failed".to_string());
            return Err(ValidatorError::TaxonomyStatus { status, message });
        }
        let body = response
            .text()
            .map_err(|err| ValidatorError::TaxonomyHttp(err.to_string()))?;
        parse_idlist(&body)
    }
}

fn normalize_api_key(key: Option<String>) -> Option<String> {
    key.map(|key| key.trim().to_string())
        .filter(|key| !key.is_empty())
}

pub fn parse_idlist(body: &str) -> Result<Vec<String>, ValidatorError> {
    let parsed: EsearchResponse =
        serde_json::from_str(body).map_err(|err| ValidatorError::TaxonomyParse(err.to_string()))?;
    Ok(parsed.esearchresult.idlist)
}

/// True when the organism field names more than one species.
pub fn is_mixed_sample(organism: &str) -> bool {
    MIXED_ORGANISMS.is_match(organism)
}

/// Replaces parentheses with spaces; esearch treats them as grouping syntax.
pub fn search_term(organism: &str) -> String {
    organism.replace(['(', ')'], " ")
}

pub struct TaxonomyResolver<S: TaxonomySearch> {
    search: S,
    lookup: HashMap<String, TaxonId>,
}

impl<S: TaxonomySearch> TaxonomyResolver<S> {
    pub fn new(search: S) -> Self {
        Self {
            search,
            lookup: HashMap::new(),
        }
    }

    /// Resolves an organism name to its NCBI taxonomy id.
    ///
    /// Only successful lookups are cached, so a name that failed is searched
    /// again on the next call. Mixed samples map to [`TaxonId::MIXED_SAMPLE`]
    /// without touching the network or the cache. Failures are logged and
    /// reported as `None`.
    pub fn resolve(&mut self, organism: Option<&str>, sink: &dyn LogSink) -> Option<TaxonId> {
        let organism = organism.filter(|name| !name.is_empty())?;
        if let Some(id) = self.lookup.get(organism) {
            return Some(*id);
        }
        if is_mixed_sample(organism) {
            return Some(TaxonId::MIXED_SAMPLE);
        }

        sink.info("Looking up species in NCBI taxonomy. Please wait...");
        match self.lookup_remote(organism) {
            Ok(id) => {
                self.lookup.insert(organism.to_string(), id);
                Some(id)
            }
            Err(err) => {
                sink.error(&format!(
                    "Failed to retrieve organism data from NCBI taxonomy service for {organism} due to {err}"
                ));
                None
            }
        }
    }

    pub fn cached(&self, organism: &str) -> Option<TaxonId> {
        self.lookup.get(organism).copied()
    }

    pub fn cache_len(&self) -> usize {
        self.lookup.len()
    }

    fn lookup_remote(&self, organism: &str) -> Result<TaxonId, ValidatorError> {
        let term = search_term(organism);
        let ids = self.search.search(&term)?;
        let first = ids
            .first()
            .ok_or_else(|| ValidatorError::TaxonNotFound(term.trim().to_string()))?;
        first.parse()
    }
}
