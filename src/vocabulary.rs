use std::fs;
use std::time::Duration;

use camino::Utf8PathBuf;
use reqwest::blocking::Client;
use serde_json::{Map, Value};

use crate::domain::{ATLAS_RESOURCE, VocabularySource};
use crate::error::ValidatorError;
use crate::http::build_client;
use crate::sink::LogSink;

pub const DEFAULT_VOCABULARY_URL: &str = "https://raw.githubusercontent.com/ebi-gene-expression-group/metadata-validation-config/master/atlas_validation_config.json";

const BUNDLED_VOCABULARY: &str = include_str!("../resources/atlas_validation_config.json");

pub type VocabularyDocument = Map<String, Value>;

/// Fetches the raw text of the online vocabulary document.
pub trait VocabularyFetch: Send + Sync {
    fn fetch_text(&self, url: &str) -> Result<String, ValidatorError>;
}

#[derive(Clone)]
pub struct VocabularyHttpClient {
    client: Client,
}

impl VocabularyHttpClient {
    pub fn new() -> Result<Self, ValidatorError> {
        let client = build_client(Duration::from_secs(30), ValidatorError::VocabularyHttp)?;
        Ok(Self { client })
    }
}

impl VocabularyFetch for VocabularyHttpClient {
    fn fetch_text(&self, url: &str) -> Result<String, ValidatorError> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|err| ValidatorError::VocabularyHttp(err.to_string()))?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .unwrap_or_else(|_| "vocabulary request failed".to_string());
            return Err(ValidatorError::VocabularyStatus { status, message });
        }
        response
            .text()
            .map_err(|err| ValidatorError::VocabularyHttp(err.to_string()))
    }
}

/// Where the offline copy of the document comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fallback {
    Bundled,
    File(Utf8PathBuf),
}

struct Loaded {
    document: VocabularyDocument,
    source: VocabularySource,
}

pub struct VocabularyLoader<F: VocabularyFetch> {
    fetch: F,
    url: String,
    fallback: Fallback,
    loaded: Option<Loaded>,
}

impl<F: VocabularyFetch> VocabularyLoader<F> {
    pub fn new(fetch: F) -> Self {
        Self::with_location(fetch, DEFAULT_VOCABULARY_URL, Fallback::Bundled)
    }

    pub fn with_location(fetch: F, url: &str, fallback: Fallback) -> Self {
        Self {
            fetch,
            url: url.to_string(),
            fallback,
            loaded: None,
        }
    }

    /// Returns the vocabulary for `category`.
    ///
    /// The document is loaded on the first call for the `atlas` resource and
    /// reused afterwards. Other resources have no document and yield `None`.
    pub fn get(
        &mut self,
        category: &str,
        resource: &str,
        sink: &dyn LogSink,
    ) -> Result<Option<&Value>, ValidatorError> {
        if resource != ATLAS_RESOURCE {
            sink.debug(&format!("No controlled vocabulary for resource {resource}"));
            return Ok(None);
        }
        let document = self.document(sink)?;
        document
            .get(category)
            .map(Some)
            .ok_or_else(|| ValidatorError::UnknownCategory(category.to_string()))
    }

    /// Category names of the loaded document, loading it if needed.
    pub fn categories(&mut self, sink: &dyn LogSink) -> Result<Vec<String>, ValidatorError> {
        Ok(self.document(sink)?.keys().cloned().collect())
    }

    /// `None` until the document has been loaded.
    pub fn source(&self) -> Option<VocabularySource> {
        self.loaded.as_ref().map(|loaded| loaded.source)
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.is_some()
    }

    fn document(&mut self, sink: &dyn LogSink) -> Result<&VocabularyDocument, ValidatorError> {
        let loaded = match self.loaded.take() {
            Some(loaded) => loaded,
            None => self.load(sink)?,
        };
        Ok(&self.loaded.insert(loaded).document)
    }

    fn load(&self, sink: &dyn LogSink) -> Result<Loaded, ValidatorError> {
        sink.debug(&format!("Getting online configuration from {}", self.url));
        match self.fetch.fetch_text(&self.url).and_then(|text| parse_document(&text)) {
            Ok(document) => Ok(Loaded {
                document,
                source: VocabularySource::Remote,
            }),
            Err(err) => {
                sink.warn(&format!(
                    "Beware! Using local configuration file that might be out of date ({err})."
                ));
                let document = self.load_fallback()?;
                Ok(Loaded {
                    document,
                    source: VocabularySource::Bundled,
                })
            }
        }
    }

    fn load_fallback(&self) -> Result<VocabularyDocument, ValidatorError> {
        let text = match &self.fallback {
            Fallback::Bundled => BUNDLED_VOCABULARY.to_string(),
            Fallback::File(path) => fs::read_to_string(path)
                .map_err(|err| ValidatorError::BundledVocabulary(format!("{path}: {err}")))?,
        };
        parse_document(&text).map_err(|err| ValidatorError::BundledVocabulary(err.to_string()))
    }
}

pub fn parse_document(text: &str) -> Result<VocabularyDocument, ValidatorError> {
    let value: Value =
        serde_json::from_str(text).map_err(|err| ValidatorError::VocabularyParse(err.to_string()))?;
    match value {
        Value::Object(map) => Ok(map),
        other => Err(ValidatorError::VocabularyParse(format!(
            "expected a JSON object, found {}",
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
