use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidatorError;

/// The only resource selector with a vocabulary document behind it.
pub const ATLAS_RESOURCE: &str = "atlas";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaxonId(u32);

impl TaxonId {
    /// NCBI "mixed sample" taxon, assigned when a sample names more than one organism.
    pub const MIXED_SAMPLE: TaxonId = TaxonId(1_427_524);

    pub fn new(value: u32) -> Self {
        Self(value)
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for TaxonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TaxonId {
    type Err = ValidatorError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        value
            .trim()
            .parse::<u32>()
            .map(Self)
            .map_err(|_| ValidatorError::InvalidTaxonId(value.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VocabularySource {
    Remote,
    Bundled,
}

impl fmt::Display for VocabularySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VocabularySource::Remote => write!(f, "remote"),
            VocabularySource::Bundled => write!(f, "bundled"),
        }
    }
}
