//! Errores del core de calibraciones.
//!
//! Los fallos "suaves" (prerequisito ausente, etapa desactivada por settings)
//! NO son errores: se modelan en `engine::Resolved`. Aquí sólo viven los
//! fallos que el caller debe propagar.

use thiserror::Error;

use crate::exposure::FrameType;
use crate::model::ArtifactTag;
use crate::settings::SettingsError;

/// Fallo del paso de cómputo de un builder.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error("no raw {frame} frames available for this scope")]
    NoRawInputs { frame: FrameType },
    #[error("no representative {frame} exposure found in the exposure table")]
    MissingExposure { frame: FrameType },
    #[error("slit geometry builder did not report a slit count")]
    MissingSlitCount,
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("build failed: {0}")]
    Failed(String),
}

/// Fallo al escribir/leer el store externo de artifacts.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PersistError {
    #[error("io: {0}")]
    Io(String),
    #[error("serialize: {0}")]
    Serialize(String),
    #[error("fingerprint {fingerprint} already persisted with different content")]
    Conflict { fingerprint: String },
}

/// Error devuelto por los accessors del orquestador.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CalibError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("building {tag} failed: {source}")]
    Build { tag: ArtifactTag, source: BuildError },
    #[error("persisting {tag} failed (artifact kept in memory): {source}")]
    Persistence { tag: ArtifactTag, source: PersistError },
    #[error("mask shape mismatch: expected {expected} slits, found {found}")]
    ShapeMismatch { expected: usize, found: usize },
    #[error("no builder registered for {0}")]
    UnknownBuilder(ArtifactTag),
    #[error(transparent)]
    Settings(#[from] SettingsError),
}

impl CalibError {
    /// Tag afectado cuando el error proviene de un builder.
    pub fn tag(&self) -> Option<ArtifactTag> {
        match self {
            CalibError::Build { tag, .. } | CalibError::Persistence { tag, .. } => Some(*tag),
            CalibError::UnknownBuilder(tag) => Some(*tag),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_error_message_names_the_tag() {
        let err = CalibError::Build { tag: ArtifactTag::Arc,
                                      source: BuildError::NoRawInputs { frame: FrameType::Arc } };
        assert_eq!(err.to_string(), "building Arc failed: no raw arc frames available for this scope");
        assert_eq!(err.tag(), Some(ArtifactTag::Arc));
    }

    #[test]
    fn shape_mismatch_format() {
        let err = CalibError::ShapeMismatch { expected: 4, found: 3 };
        assert_eq!(err.to_string(), "mask shape mismatch: expected 4 slits, found 3");
        assert_eq!(err.tag(), None);
    }
}
