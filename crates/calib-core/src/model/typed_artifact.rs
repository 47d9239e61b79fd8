//! Infraestructura opcional de tipado fuerte para `Artifact` manteniendo el
//! núcleo agnóstico. Los builders describen sus payloads con un tipo concreto
//! (T) y el orquestador sigue viendo sólo JSON opaco.

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use thiserror::Error;

use super::{Artifact, ArtifactTag};
use crate::constants::SCHEMA_VERSION_FIELD;

/// Errores posibles al codificar/decodificar un artifact tipado.
#[derive(Debug, Error, PartialEq)]
pub enum ArtifactCodecError {
    #[error("artifact tag mismatch: expected {expected}, found {found}")]
    TagMismatch { expected: ArtifactTag, found: ArtifactTag },
    #[error("schema version mismatch: expected {expected}, found {found:?}")]
    VersionMismatch { expected: u32, found: Option<u32> },
    #[error("serialize: {0}")]
    Serialize(String),
    #[error("deserialize: {0}")]
    Deserialize(String),
    #[error("validation: {0}")]
    Validation(String),
}

/// Especificación de un payload tipado asociado a un `ArtifactTag`.
pub trait ArtifactSpec: Sized + Serialize + DeserializeOwned + Clone {
    /// Tag asociado (permite distinguir en runtime).
    const TAG: ArtifactTag;
    /// Versión de esquema (incrementar en cambios incompatibles).
    const SCHEMA_VERSION: u32 = 1;

    /// Validación semántica ligera (sin efectos secundarios).
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }

    /// Serializa a `Artifact` sin hash (lo añadirá el engine).
    fn into_artifact(self) -> Result<Artifact, ArtifactCodecError> {
        self.validate().map_err(ArtifactCodecError::Validation)?;
        let mut value = serde_json::to_value(&self).map_err(|e| ArtifactCodecError::Serialize(e.to_string()))?;
        if let Value::Object(map) = &mut value {
            map.entry(SCHEMA_VERSION_FIELD.to_string())
               .or_insert(Value::from(Self::SCHEMA_VERSION));
        }
        Ok(Artifact::new(Self::TAG, value))
    }

    /// Decodifica desde artifact neutro verificando tag, versión y validación.
    fn from_artifact(a: &Artifact) -> Result<Self, ArtifactCodecError> {
        if a.tag != Self::TAG {
            return Err(ArtifactCodecError::TagMismatch { expected: Self::TAG,
                                                         found: a.tag });
        }
        let found = a.payload
                     .get(SCHEMA_VERSION_FIELD)
                     .and_then(|v| v.as_u64())
                     .map(|v| v as u32);
        if found != Some(Self::SCHEMA_VERSION) {
            return Err(ArtifactCodecError::VersionMismatch { expected: Self::SCHEMA_VERSION,
                                                             found });
        }
        let decoded: Self =
            serde_json::from_value(a.payload.clone()).map_err(|e| ArtifactCodecError::Deserialize(e.to_string()))?;
        decoded.validate().map_err(ArtifactCodecError::Validation)?;
        Ok(decoded)
    }
}

/// Declara un payload tipado con derives y `ArtifactSpec`.
///
/// ```ignore
/// typed_artifact!(BiasFrame { files: Vec<String>, method: String } tag: ArtifactTag::Bias);
/// ```
#[macro_export]
macro_rules! typed_artifact {
    ($name:ident { $($fname:ident : $fty:ty),+ $(,)? } tag: $tag:expr) => {
        #[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
        pub struct $name { $(pub $fname: $fty,)+ }
        impl $crate::model::ArtifactSpec for $name {
            const TAG: $crate::model::ArtifactTag = $tag;
        }
    };
}
