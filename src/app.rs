use serde::Serialize;
use serde_json::Value;

use crate::config::ResolvedSettings;
use crate::domain::{TaxonId, VocabularySource};
use crate::error::ValidatorError;
use crate::sink::LogSink;
use crate::taxonomy::{EutilsHttpClient, TaxonomyResolver, TaxonomySearch, is_mixed_sample};
use crate::url_check::{HttpUrlOpener, Sleeper, ThreadSleeper, UrlChecker, UrlOpener};
use crate::vocabulary::{VocabularyFetch, VocabularyHttpClient, VocabularyLoader};

#[derive(Debug, Clone, Serialize)]
pub struct TaxonResult {
    pub organism: String,
    pub taxon_id: Option<TaxonId>,
    pub mixed_sample: bool,
    pub checked_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct UrlCheckResult {
    pub url: String,
    pub reachable: bool,
    pub retries: u32,
    pub checked_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct VocabularyResult {
    pub category: String,
    pub resource: String,
    pub source: Option<VocabularySource>,
    pub values: Option<Value>,
    pub checked_at: String,
}

pub type HttpApp = App<EutilsHttpClient, HttpUrlOpener, ThreadSleeper, VocabularyHttpClient>;

/// Owns the lookup caches for one validation run.
pub struct App<T: TaxonomySearch, O: UrlOpener, Z: Sleeper, V: VocabularyFetch> {
    taxonomy: TaxonomyResolver<T>,
    urls: UrlChecker<O, Z>,
    vocabulary: VocabularyLoader<V>,
    url_retries: u32,
}

impl HttpApp {
    pub fn from_settings(settings: &ResolvedSettings) -> Result<Self, ValidatorError> {
        let taxonomy = EutilsHttpClient::with_base_url(&settings.eutils_url)?;
        let opener = HttpUrlOpener::with_timeout(settings.url_timeout)?;
        let vocabulary = VocabularyLoader::with_location(
            VocabularyHttpClient::new()?,
            &settings.vocabulary_url,
            settings.vocabulary_fallback.clone(),
        );
        Ok(App::new(
            TaxonomyResolver::new(taxonomy),
            UrlChecker::new(opener),
            vocabulary,
            settings.url_retries,
        ))
    }
}

impl<T: TaxonomySearch, O: UrlOpener, Z: Sleeper, V: VocabularyFetch> App<T, O, Z, V> {
    pub fn new(
        taxonomy: TaxonomyResolver<T>,
        urls: UrlChecker<O, Z>,
        vocabulary: VocabularyLoader<V>,
        url_retries: u32,
    ) -> Self {
        Self {
            taxonomy,
            urls,
            vocabulary,
            url_retries,
        }
    }

    pub fn resolve_taxon(&mut self, organism: &str, sink: &dyn LogSink) -> TaxonResult {
        let taxon_id = self.taxonomy.resolve(Some(organism), sink);
        TaxonResult {
            organism: organism.to_string(),
            taxon_id,
            mixed_sample: is_mixed_sample(organism),
            checked_at: now(),
        }
    }

    pub fn check_url(
        &self,
        url: &str,
        retries: Option<u32>,
        sink: &dyn LogSink,
    ) -> Result<UrlCheckResult, ValidatorError> {
        let retries = retries.unwrap_or(self.url_retries);
        let reachable = self.urls.check(url, sink, retries)?;
        Ok(UrlCheckResult {
            url: url.to_string(),
            reachable,
            retries,
            checked_at: now(),
        })
    }

    pub fn vocabulary(
        &mut self,
        category: &str,
        resource: &str,
        sink: &dyn LogSink,
    ) -> Result<VocabularyResult, ValidatorError> {
        let values = self.vocabulary.get(category, resource, sink)?.cloned();
        Ok(VocabularyResult {
            category: category.to_string(),
            resource: resource.to_string(),
            source: self.vocabulary.source(),
            values,
            checked_at: now(),
        })
    }

    pub fn taxonomy(&self) -> &TaxonomyResolver<T> {
        &self.taxonomy
    }

    pub fn vocabulary_loader(&self) -> &VocabularyLoader<V> {
        &self.vocabulary
    }
}

fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}
