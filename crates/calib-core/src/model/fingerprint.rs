use serde::Serialize;
use serde_json::{json, Value};

use crate::constants::ENGINE_VERSION;
use crate::hashing::hash_value;
use crate::model::ArtifactTag;

/// Insumos para calcular el fingerprint de un artifact persistido.
/// NO es el fingerprint final (string hash) sino el modelo previo a canonicalizar.
#[derive(Serialize)]
pub struct ArtifactFingerprintInput<'a> {
    pub engine_version: &'a str,
    pub tag: ArtifactTag,
    pub configuration: &'a str,
    pub detector: Option<u32>,        // sólo para tags con sub-clave de detector
    pub exposure_group: u32,
    pub raw_files: Vec<String>,       // ordenados lexicográficamente
    pub settings: &'a Value,          // subset relevante para el builder
    pub prerequisite_hashes: Vec<(ArtifactTag, String)>, // ordenados por tag
}

impl<'a> ArtifactFingerprintInput<'a> {
    pub fn new(tag: ArtifactTag,
               configuration: &'a str,
               detector: Option<u32>,
               exposure_group: u32,
               settings: &'a Value)
               -> Self {
        Self { engine_version: ENGINE_VERSION,
               tag,
               configuration,
               detector,
               exposure_group,
               raw_files: Vec::new(),
               settings,
               prerequisite_hashes: Vec::new() }
    }

    pub fn with_raw_files<I: IntoIterator<Item = String>>(mut self, files: I) -> Self {
        let mut files: Vec<String> = files.into_iter().collect();
        files.sort();
        files.dedup();
        self.raw_files = files;
        self
    }

    pub fn with_prerequisites<I: IntoIterator<Item = (ArtifactTag, String)>>(mut self, hashes: I) -> Self {
        let mut hashes: Vec<(ArtifactTag, String)> = hashes.into_iter().collect();
        hashes.sort();
        self.prerequisite_hashes = hashes;
        self
    }

    /// Fingerprint final (hex blake3 del JSON canónico).
    pub fn fingerprint(&self) -> String {
        let prereqs: Vec<Value> = self.prerequisite_hashes
                                      .iter()
                                      .map(|(t, h)| json!({ "tag": t.name(), "hash": h }))
                                      .collect();
        hash_value(&json!({
            "engine_version": self.engine_version,
            "tag": self.tag.name(),
            "configuration": self.configuration,
            "detector": self.detector,
            "exposure_group": self.exposure_group,
            "raw_files": self.raw_files,
            "settings": self.settings,
            "prerequisites": prereqs,
        }))
    }
}
