use camino::Utf8PathBuf;
use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum ValidatorError {
    #[error("invalid taxonomy id: {0}")]
    InvalidTaxonId(String),

    #[error("no taxonomy entry found for term: {0}")]
    TaxonNotFound(String),

    #[error("NCBI taxonomy request failed: {0}")]
    TaxonomyHttp(String),

    #[error("NCBI taxonomy returned status {status}: {message}")]
    TaxonomyStatus { status: u16, message: String },

    #[error("NCBI taxonomy response could not be parsed: {0}")]
    TaxonomyParse(String),

    #[error("failed to build HTTP client: {0}")]
    HttpClient(String),

    #[error("invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("cannot open {url}: {reason}")]
    Unreachable { url: String, reason: String },

    #[error("vocabulary request failed: {0}")]
    VocabularyHttp(String),

    #[error("vocabulary server returned status {status}: {message}")]
    VocabularyStatus { status: u16, message: String },

    #[error("vocabulary document could not be parsed: {0}")]
    VocabularyParse(String),

    #[error("bundled vocabulary document is unusable: {0}")]
    BundledVocabulary(String),

    #[error("unknown vocabulary category: {0}")]
    UnknownCategory(String),

    #[error("failed to read settings file at {0}")]
    SettingsRead(Utf8PathBuf),

    #[error("failed to parse JSON settings: {0}")]
    SettingsParse(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),
}

impl ValidatorError {
    /// True for failures the reachability checker retries: the resource could
    /// not be opened, as opposed to the request being malformed.
    pub fn is_url_error(&self) -> bool {
        matches!(self, ValidatorError::Unreachable { .. })
    }
}
