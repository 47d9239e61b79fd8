//! Artifact de calibración.
//!
//! Un `Artifact` es la unidad de datos que produce un builder. El core es
//! neutral respecto a su contenido:
//! - `payload` es JSON genérico (matriz serializada, tabla, descriptor...); el
//!   orquestador nunca lo interpreta, sólo verifica existencia e identidad.
//! - `hash` lo asigna el engine sobre el JSON canonicalizado del payload y
//!   sirve como identidad para fingerprints aguas abajo.
//! - `metadata` permite anotar información auxiliar que no entra al hash.
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::hashing::hash_value;

/// Tipos de producto de calibración que maneja el orquestador.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ArtifactTag {
    Bias,
    Arc,
    BadPixelMask,
    PixelLocationMap,
    SlitGeometry,
    WavelengthCalibration,
    TiltMap,
    NormalizedFlat,
    SlitProfile,
}

impl ArtifactTag {
    /// Todos los tags en orden de dependencia.
    pub const ALL: [ArtifactTag; 9] = [ArtifactTag::Bias,
                                       ArtifactTag::Arc,
                                       ArtifactTag::BadPixelMask,
                                       ArtifactTag::PixelLocationMap,
                                       ArtifactTag::SlitGeometry,
                                       ArtifactTag::WavelengthCalibration,
                                       ArtifactTag::TiltMap,
                                       ArtifactTag::NormalizedFlat,
                                       ArtifactTag::SlitProfile];

    /// Nombre corto y estable (usado en fingerprints y nombres de masters).
    pub fn name(&self) -> &'static str {
        match self {
            ArtifactTag::Bias => "bias",
            ArtifactTag::Arc => "arc",
            ArtifactTag::BadPixelMask => "bpm",
            ArtifactTag::PixelLocationMap => "pixlocn",
            ArtifactTag::SlitGeometry => "slits",
            ArtifactTag::WavelengthCalibration => "wavecalib",
            ArtifactTag::TiltMap => "tilts",
            ArtifactTag::NormalizedFlat => "normpixelflat",
            ArtifactTag::SlitProfile => "slitprof",
        }
    }

    /// Accessor del orquestador que produce este artifact.
    pub fn accessor(&self) -> &'static str {
        match self {
            ArtifactTag::Bias => "get_bias",
            ArtifactTag::Arc => "get_arc",
            ArtifactTag::BadPixelMask => "get_bad_pixel_mask",
            ArtifactTag::PixelLocationMap => "get_pixel_location_map",
            ArtifactTag::SlitGeometry => "get_slit_geometry",
            ArtifactTag::WavelengthCalibration => "get_wavelength_calibration",
            ArtifactTag::TiltMap => "get_tilt_map",
            ArtifactTag::NormalizedFlat | ArtifactTag::SlitProfile => "get_normalized_flat",
        }
    }

    /// Bias y Arc se comparten entre detectores de un mismo setup; el resto
    /// depende de la geometría de cada detector y se guarda con sub-clave.
    pub fn is_detector_scoped(&self) -> bool {
        !matches!(self, ArtifactTag::Bias | ArtifactTag::Arc)
    }
}

impl fmt::Display for ArtifactTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ArtifactTag::Bias => "Bias",
            ArtifactTag::Arc => "Arc",
            ArtifactTag::BadPixelMask => "BadPixelMask",
            ArtifactTag::PixelLocationMap => "PixelLocationMap",
            ArtifactTag::SlitGeometry => "SlitGeometry",
            ArtifactTag::WavelengthCalibration => "WavelengthCalibration",
            ArtifactTag::TiltMap => "TiltMap",
            ArtifactTag::NormalizedFlat => "NormalizedFlat",
            ArtifactTag::SlitProfile => "SlitProfile",
        };
        f.write_str(s)
    }
}

/// Producto de calibración producido/cargado por un builder.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Artifact {
    pub tag: ArtifactTag,
    pub hash: String,            // hash canonical del payload (asignado por engine)
    pub payload: Value,          // contenido opaco para el core
    pub metadata: Option<Value>, // información auxiliar (no entra al hash)
}

impl Artifact {
    /// Crea un artifact sin hash; el engine lo sella al guardarlo en cache.
    pub fn new(tag: ArtifactTag, payload: Value) -> Self {
        Self { tag,
               hash: String::new(),
               payload,
               metadata: None }
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Recalcula el hash a partir del payload canonicalizado.
    pub fn seal(&mut self) {
        self.hash = hash_value(&self.payload);
    }

    pub fn is_sealed(&self) -> bool {
        !self.hash.is_empty()
    }
}
