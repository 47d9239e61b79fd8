//! Snapshot serializable del estado del cache (introspección / reportes).
use serde::{Deserialize, Serialize};

use crate::model::{ArtifactTag, ScopeKey};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedEntry {
    pub tag: ArtifactTag,
    pub detector: Option<u32>,
    pub hash: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaskSummary {
    pub detector: u32,
    pub slit_count: usize,
    pub excluded: Vec<usize>,
    pub resets: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketSummary {
    pub configuration: String,
    pub artifacts: Vec<CachedEntry>,
    pub masks: Vec<MaskSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalibSummary {
    pub active: Option<ScopeKey>,
    pub configurations: Vec<BucketSummary>,
}

impl CalibSummary {
    pub fn bucket(&self, configuration: &str) -> Option<&BucketSummary> {
        self.configurations.iter().find(|b| b.configuration == configuration)
    }

    /// Total de artifacts cacheados en todas las configuraciones.
    pub fn artifact_count(&self) -> usize {
        self.configurations.iter().map(|b| b.artifacts.len()).sum()
    }
}
