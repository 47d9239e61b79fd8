//! Tipos de evento del orquestador y estructura `CalibEvent`.
//!
//! Cada decisión load/cache/build queda registrada en un `EventStore`
//! append-only. El log permite a callers y tests observar estructuralmente lo
//! que el logger textual sólo describe.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::engine::SkipReason;
use crate::model::{ArtifactTag, ScopeKey};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CalibEventKind {
    /// Se fijó el scope activo.
    Configured { scope: ScopeKey },
    /// El artifact ya estaba en el cache en memoria; no se invocó builder.
    CacheHit { tag: ArtifactTag, detector: Option<u32> },
    /// El builder encontró un master persistido con el mismo fingerprint.
    LoadedFromStore {
        tag: ArtifactTag,
        detector: Option<u32>,
        fingerprint: String,
    },
    /// El builder calculó el artifact desde los frames crudos.
    Built {
        tag: ArtifactTag,
        detector: Option<u32>,
        fingerprint: String,
        artifact_hash: String,
    },
    /// El artifact recién construido se escribió en el store externo.
    Persisted { tag: ArtifactTag, fingerprint: String },
    /// Falló la escritura; el artifact sigue válido en memoria.
    PersistFailed {
        tag: ArtifactTag,
        fingerprint: String,
        error: String,
    },
    /// El cómputo falló; no se guardó nada.
    BuildFailed { tag: ArtifactTag, error: String },
    /// Falta un prerequisito y el accessor devolvió "no disponible".
    PrerequisiteMissing {
        requested: ArtifactTag,
        missing: ArtifactTag,
        accessor: String,
    },
    /// Etapa omitida por política de settings.
    Skipped { tag: ArtifactTag, reason: SkipReason },
    /// Máscara reiniciada al fijar la geometría de slits.
    MaskReset { detector: u32, slit_count: usize },
    /// Máscara ampliada por una etapa.
    MaskMerged {
        tag: ArtifactTag,
        detector: u32,
        excluded: usize,
    },
    /// Bucket de configuración descartado explícitamente.
    ScopeReset { configuration: String },
}

impl CalibEventKind {
    /// Nombre compacto de la variante (útil en logs y asserts).
    pub fn name(&self) -> &'static str {
        match self {
            CalibEventKind::Configured { .. } => "configured",
            CalibEventKind::CacheHit { .. } => "cache_hit",
            CalibEventKind::LoadedFromStore { .. } => "loaded",
            CalibEventKind::Built { .. } => "built",
            CalibEventKind::Persisted { .. } => "persisted",
            CalibEventKind::PersistFailed { .. } => "persist_failed",
            CalibEventKind::BuildFailed { .. } => "build_failed",
            CalibEventKind::PrerequisiteMissing { .. } => "prerequisite_missing",
            CalibEventKind::Skipped { .. } => "skipped",
            CalibEventKind::MaskReset { .. } => "mask_reset",
            CalibEventKind::MaskMerged { .. } => "mask_merged",
            CalibEventKind::ScopeReset { .. } => "scope_reset",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibEvent {
    pub seq: u64, // orden global de append
    pub configuration: String,
    pub kind: CalibEventKind,
    pub ts: DateTime<Utc>, // metadato (no entra en fingerprint)
}
