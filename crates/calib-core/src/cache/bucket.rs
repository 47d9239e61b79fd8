use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::errors::CalibError;
use crate::mask::{MaskAccumulator, MaskVector};
use crate::model::{Artifact, ArtifactTag, ScopeKey};

/// Clave dentro de un bucket: tag + detector (sólo para tags por detector).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CacheKey {
    pub tag: ArtifactTag,
    pub detector: Option<u32>,
}

impl CacheKey {
    pub fn for_scope(tag: ArtifactTag, scope: &ScopeKey) -> Self {
        Self::new(tag, scope.detector)
    }

    pub fn new(tag: ArtifactTag, detector: u32) -> Self {
        let detector = if tag.is_detector_scoped() { Some(detector) } else { None };
        Self { tag, detector }
    }

    /// Clave sin detector (Bias / Arc).
    pub fn shared(tag: ArtifactTag) -> Self {
        Self { tag, detector: None }
    }
}

/// Artifacts y máscaras de una configuración.
#[derive(Debug, Default)]
pub struct Bucket {
    artifacts: HashMap<CacheKey, Arc<Artifact>>,
    masks: HashMap<u32, MaskAccumulator>,
}

impl Bucket {
    pub fn get(&self, key: &CacheKey) -> Option<Arc<Artifact>> {
        self.artifacts.get(key).cloned()
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.artifacts.contains_key(key)
    }

    /// Inserta si no existe. Una entrada ya presente nunca se reemplaza.
    pub fn insert(&mut self, key: CacheKey, artifact: Artifact) -> Arc<Artifact> {
        self.artifacts.entry(key).or_insert_with(|| Arc::new(artifact)).clone()
    }

    pub fn keys(&self) -> Vec<CacheKey> {
        let mut keys: Vec<CacheKey> = self.artifacts.keys().copied().collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }

    pub fn mask(&self, detector: u32) -> Option<&MaskVector> {
        self.masks.get(&detector).and_then(|m| m.current())
    }

    pub fn mask_resets(&self, detector: u32) -> u32 {
        self.masks.get(&detector).map(|m| m.resets()).unwrap_or(0)
    }

    pub fn reset_mask(&mut self, detector: u32, slit_count: usize) -> MaskVector {
        self.masks.entry(detector).or_default().reset(slit_count).clone()
    }

    pub fn merge_mask(&mut self, detector: u32, incoming: &MaskVector) -> Result<MaskVector, CalibError> {
        self.masks.entry(detector).or_default().merge(incoming).cloned()
    }

    /// Detectores con máscara sembrada.
    pub fn mask_detectors(&self) -> Vec<u32> {
        let mut dets: Vec<u32> =
            self.masks.iter().filter(|(_, m)| m.current().is_some()).map(|(d, _)| *d).collect();
        dets.sort_unstable();
        dets
    }
}
