//! Store de masters en disco.
//!
//! Layout: `<root>/<tag>/<fingerprint>.json`. Cada archivo se escribe una
//! sola vez (tempfile + fsync + rename). Reescribir un fingerprint con el
//! mismo contenido es un no-op; con contenido distinto es `Conflict`. Un
//! archivo corrupto se reemplaza.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use calib_core::{Artifact, ArtifactTag, MaskVector, ScopeKey};
use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::config::StoreConfig;
use crate::error::StoreError;

/// Registro persistido de un artifact (más compañeros y máscara).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredMaster {
    pub fingerprint: String,
    pub scope: ScopeKey,
    pub artifact: Artifact,
    #[serde(default)]
    pub companions: Vec<Artifact>,
    #[serde(default)]
    pub mask: Option<MaskVector>,
    #[serde(default)]
    pub slit_count: Option<usize>,
    pub created_at: DateTime<Utc>, // metadato (no participa en la comparación)
}

impl StoredMaster {
    /// Mismo contenido (hashes de payload, máscara y slits), ignorando fecha.
    pub fn same_content(&self, other: &StoredMaster) -> bool {
        let hashes = |m: &StoredMaster| -> Vec<String> {
            std::iter::once(&m.artifact).chain(m.companions.iter()).map(|a| a.hash.clone()).collect()
        };
        self.fingerprint == other.fingerprint
        && hashes(self) == hashes(other)
        && self.mask == other.mask
        && self.slit_count == other.slit_count
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutOutcome {
    Written,
    Unchanged,
}

#[derive(Debug, Clone)]
pub struct FsArtifactStore {
    root: PathBuf,
}

impl FsArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn from_config(cfg: &StoreConfig) -> Self {
        Self::new(cfg.root.clone())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, tag: ArtifactTag, fingerprint: &str) -> PathBuf {
        self.root.join(tag.name()).join(format!("{fingerprint}.json"))
    }

    pub fn contains(&self, tag: ArtifactTag, fingerprint: &str) -> bool {
        self.path_for(tag, fingerprint).is_file()
    }

    pub fn get(&self, tag: ArtifactTag, fingerprint: &str) -> Result<Option<StoredMaster>, StoreError> {
        let path = self.path_for(tag, fingerprint);
        let raw = match with_retry(|| fs::read_to_string(&path).map_err(|e| StoreError::io(&path, e))) {
            Ok(s) => s,
            Err(StoreError::Io { source, .. }) if source.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e),
        };
        let master: StoredMaster =
            serde_json::from_str(&raw).map_err(|e| StoreError::Corrupt { path: path.clone(),
                                                                         reason: e.to_string() })?;
        if master.fingerprint != fingerprint || master.artifact.tag != tag {
            return Err(StoreError::Corrupt { path,
                                             reason: format!("record is {} / {}",
                                                             master.artifact.tag, master.fingerprint) });
        }
        debug!("store hit {tag} {fingerprint}");
        Ok(Some(master))
    }

    pub fn put(&self, master: &StoredMaster) -> Result<PutOutcome, StoreError> {
        let tag = master.artifact.tag;
        match self.get(tag, &master.fingerprint) {
            Ok(Some(existing)) if existing.same_content(master) => {
                debug!("store put {tag} {} unchanged", master.fingerprint);
                return Ok(PutOutcome::Unchanged);
            }
            Ok(Some(_)) => {
                warn!("store conflict for {tag} {}", master.fingerprint);
                return Err(StoreError::Conflict { fingerprint: master.fingerprint.clone() });
            }
            Ok(None) => {}
            // Un registro ilegible no cuenta como master: se reemplaza.
            Err(StoreError::Corrupt { path, reason }) => {
                warn!("replacing corrupt master {}: {reason}", path.display());
            }
            Err(e) => return Err(e),
        }
        let path = self.path_for(tag, &master.fingerprint);
        let body = serde_json::to_string_pretty(master)?;
        with_retry(|| write_atomic(&path, body.as_bytes()))?;
        debug!("store wrote {}", path.display());
        Ok(PutOutcome::Written)
    }

    /// Fingerprints persistidos para un tag (ordenados).
    pub fn list(&self, tag: ArtifactTag) -> Result<Vec<String>, StoreError> {
        let dir = self.root.join(tag.name());
        let entries = match fs::read_dir(&dir) {
            Ok(e) => e,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::io(&dir, e)),
        };
        let mut out = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| StoreError::io(&dir, e))?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some("json") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    out.push(stem.to_string());
                }
            }
        }
        out.sort();
        Ok(out)
    }
}

/// tempfile en el mismo directorio → fsync → rename.
fn write_atomic(path: &Path, content: &[u8]) -> Result<(), StoreError> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir).map_err(|e| StoreError::io(dir, e))?;
    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| StoreError::io(dir, e))?;
    tmp.write_all(content).map_err(|e| StoreError::io(tmp.path(), e))?;
    tmp.as_file().sync_all().map_err(|e| StoreError::io(tmp.path(), e))?;
    tmp.persist(path).map_err(|e| StoreError::io(path, e.error))?;
    Ok(())
}

/// Retry simple con backoff lineal muy pequeño (hasta 3 reintentos).
fn with_retry<F, T>(mut f: F) -> Result<T, StoreError>
    where F: FnMut() -> Result<T, StoreError>
{
    let mut attempts = 0;
    loop {
        match f() {
            Err(e) if e.is_retryable() && attempts < 3 => {
                let delay_ms = 15 * ((attempts + 1) as u64);
                warn!("retryable store error (attempt {}): {e} -> sleeping {delay_ms}ms", attempts + 1);
                std::thread::sleep(std::time::Duration::from_millis(delay_ms));
                attempts += 1;
            }
            r => return r,
        }
    }
}
