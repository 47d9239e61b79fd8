//! Resultado estructurado de un accessor.
//!
//! `Resolved` distingue "listo", "no disponible" (prerequisito ausente) y
//! "omitido" (política de settings). Ninguno de los dos últimos es un error.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::mask::MaskVector;
use crate::model::{Artifact, ArtifactTag};

/// De dónde salió un artifact `Ready`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Origin {
    Cache,
    Store,
    Built,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkipReason {
    FlatFieldingDisabled,
    WavelengthCalibrationDisabled,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ready {
    pub artifact: Arc<Artifact>,
    /// SlitProfile junto al flat normalizado (o viceversa).
    pub companion: Option<Arc<Artifact>>,
    /// Máscara actual del detector, sólo en etapas que la modifican.
    pub mask: Option<MaskVector>,
    pub origin: Origin,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unavailable {
    pub requested: ArtifactTag,
    pub missing: ArtifactTag,
    /// Accessor que produce el artifact faltante.
    pub accessor: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Resolved {
    Ready(Ready),
    Unavailable(Unavailable),
    Skipped(SkipReason),
}

impl Resolved {
    pub fn is_ready(&self) -> bool {
        matches!(self, Resolved::Ready(_))
    }

    pub fn artifact(&self) -> Option<&Arc<Artifact>> {
        match self {
            Resolved::Ready(r) => Some(&r.artifact),
            _ => None,
        }
    }

    pub fn ready(&self) -> Option<&Ready> {
        match self {
            Resolved::Ready(r) => Some(r),
            _ => None,
        }
    }

    pub fn into_ready(self) -> Option<Ready> {
        match self {
            Resolved::Ready(r) => Some(r),
            _ => None,
        }
    }

    pub fn unavailable(&self) -> Option<&Unavailable> {
        match self {
            Resolved::Unavailable(u) => Some(u),
            _ => None,
        }
    }

    pub fn skipped(&self) -> Option<SkipReason> {
        match self {
            Resolved::Skipped(r) => Some(*r),
            _ => None,
        }
    }

    pub fn mask(&self) -> Option<&MaskVector> {
        self.ready().and_then(|r| r.mask.as_ref())
    }

    pub fn origin(&self) -> Option<Origin> {
        self.ready().map(|r| r.origin)
    }
}

/// Artifacts entregados explícitamente por el caller. Se usan para el build
/// en lugar del cache pero nunca se guardan.
#[derive(Debug, Clone, Default)]
pub struct Supplied {
    artifacts: BTreeMap<ArtifactTag, Arc<Artifact>>,
}

impl Supplied {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with(mut self, artifact: Artifact) -> Self {
        self.artifacts.insert(artifact.tag, Arc::new(artifact));
        self
    }

    pub fn with_arc(mut self, artifact: Arc<Artifact>) -> Self {
        self.artifacts.insert(artifact.tag, artifact);
        self
    }

    pub fn get(&self, tag: ArtifactTag) -> Option<Arc<Artifact>> {
        self.artifacts.get(&tag).cloned()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }
}

/// Resultado de un driver de pipeline: una entrada por etapa alcanzada.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineReport {
    pub stages: Vec<(ArtifactTag, Resolved)>,
}

impl PipelineReport {
    pub fn get(&self, tag: ArtifactTag) -> Option<&Resolved> {
        self.stages.iter().find(|(t, _)| *t == tag).map(|(_, r)| r)
    }

    /// Todas las etapas pedidas terminaron `Ready`.
    pub fn is_complete(&self, expected: &[ArtifactTag]) -> bool {
        expected.iter().all(|t| self.get(*t).map(Resolved::is_ready).unwrap_or(false))
    }

    /// Primera etapa que no quedó lista (y por la que se detuvo el driver).
    pub fn stopped_at(&self) -> Option<(ArtifactTag, &Resolved)> {
        self.stages.iter().find(|(_, r)| !r.is_ready()).map(|(t, r)| (*t, r))
    }
}
