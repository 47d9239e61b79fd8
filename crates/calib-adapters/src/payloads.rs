//! Payloads tipados de cada artifact.
//!
//! El core los ve como JSON opaco; `schema_version` lo inserta
//! `ArtifactSpec::into_artifact`.

use calib_core::model::ArtifactTag;
use calib_core::typed_artifact;
use serde::{Deserialize, Serialize};

// Bias combinado (o marcador de sustracción por overscan).
typed_artifact!(BiasFrame {
    method: String,
    files: Vec<String>,
    digest: String,
} tag: ArtifactTag::Bias);

// Arco combinado. `shape` = (naxis0, naxis1) del detector.
typed_artifact!(ArcFrame {
    method: String,
    files: Vec<String>,
    digest: String,
    shape: (usize, usize),
    bias: Option<String>,
} tag: ArtifactTag::Arc);

typed_artifact!(BadPixelMap {
    shape: (usize, usize),
    binning: String,
    bad_columns: Vec<usize>,
} tag: ArtifactTag::BadPixelMask);

typed_artifact!(PixelLocations {
    shape: (usize, usize),
    xgap: f64,
    ygap: f64,
    ysize: f64,
    source: String,
} tag: ArtifactTag::PixelLocationMap);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlitEdges {
    pub left: f64,
    pub right: f64,
}

typed_artifact!(SlitTrace {
    function: String,
    files: Vec<String>,
    edges: Vec<SlitEdges>,
} tag: ArtifactTag::SlitGeometry);

/// Calidad del ajuste de una slit (rms normalizado).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlitFit {
    pub slit: usize,
    pub rms: f64,
    pub ok: bool,
}

typed_artifact!(WaveSolution {
    medium: String,
    lamps: Vec<String>,
    fits: Vec<SlitFit>,
} tag: ArtifactTag::WavelengthCalibration);

typed_artifact!(TiltSolution {
    method: String,
    order: i64,
    fits: Vec<SlitFit>,
} tag: ArtifactTag::TiltMap);

typed_artifact!(FlatField {
    method: String,
    files: Vec<String>,
    digest: String,
    slits: usize,
} tag: ArtifactTag::NormalizedFlat);

typed_artifact!(SlitProfileData {
    profile: Vec<f64>,
} tag: ArtifactTag::SlitProfile);
