//! Geometría del detector: máscara de píxeles malos, mapa de ubicación de
//! píxeles y trazado de slits.

use calib_core::{ArtifactTag, BuildContext, BuildError, BuildOutput, Builder, Settings};
use serde_json::Value;

use super::{decode, encode};
use crate::digest::{frame_digest, unit_score};
use crate::payloads::{ArcFrame, BadPixelMap, PixelLocations, SlitEdges, SlitTrace};

/// Fracción de columnas que se marcan como malas.
const BAD_COLUMN_RATE: f64 = 0.002;

#[derive(Debug, Clone, Copy, Default)]
pub struct BadPixelMaskBuilder;

impl Builder for BadPixelMaskBuilder {
    fn tag(&self) -> ArtifactTag {
        ArtifactTag::BadPixelMask
    }

    fn settings_subset(&self, settings: &Settings) -> Value {
        settings.subset(&["reduce badpix"])
    }

    fn build(&self, ctx: &BuildContext<'_>) -> Result<BuildOutput, BuildError> {
        let arc: ArcFrame = decode(ctx.prerequisites.require(ArtifactTag::Arc)?)?;
        let binning = ctx.raw.require_representative()?.binning;
        let shape = (arc.shape.0 / (binning.spectral as usize).max(1), arc.shape.1 / (binning.spatial as usize).max(1));
        let bad_columns = if ctx.settings.bool_or("reduce.badpix", true) {
            let seed = format!("{}:{binning}", arc.digest);
            (0..shape.1).filter(|c| unit_score(&seed, *c) < BAD_COLUMN_RATE).collect()
        } else {
            Vec::new()
        };
        Ok(BuildOutput::new(encode(BadPixelMap { shape,
                                                 binning: binning.to_string(),
                                                 bad_columns })?))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PixelLocationBuilder;

impl Builder for PixelLocationBuilder {
    fn tag(&self) -> ArtifactTag {
        ArtifactTag::PixelLocationMap
    }

    fn settings_subset(&self, settings: &Settings) -> Value {
        settings.subset(&["detector xgap", "detector ygap", "detector ysize", "reduce pixellocations"])
    }

    fn build(&self, ctx: &BuildContext<'_>) -> Result<BuildOutput, BuildError> {
        let arc: ArcFrame = decode(ctx.prerequisites.require(ArtifactTag::Arc)?)?;
        let source = ctx.settings.str("reduce.pixellocations").unwrap_or("computed").to_string();
        let map = PixelLocations { shape: arc.shape,
                                   xgap: ctx.settings.f64_or("detector.xgap", 0.0),
                                   ygap: ctx.settings.f64_or("detector.ygap", 0.0),
                                   ysize: ctx.settings.f64_or("detector.ysize", 1.0),
                                   source };
        Ok(BuildOutput::new(encode(map)?))
    }
}

/// Trazado de bordes de slit sobre los frames de traza.
///
/// `trace slits number` fija la cantidad; sin ese valor (o con -1) se deriva
/// de los frames, entre 2 y 7 slits.
#[derive(Debug, Clone, Copy, Default)]
pub struct SlitTraceBuilder;

impl Builder for SlitTraceBuilder {
    fn tag(&self) -> ArtifactTag {
        ArtifactTag::SlitGeometry
    }

    fn settings_subset(&self, settings: &Settings) -> Value {
        settings.subset(&["trace slits number", "trace slits function", "trace comb method"])
    }

    fn build(&self, ctx: &BuildContext<'_>) -> Result<BuildOutput, BuildError> {
        let bpm: BadPixelMap = decode(ctx.prerequisites.require(ArtifactTag::BadPixelMask)?)?;
        let pix: PixelLocations = decode(ctx.prerequisites.require(ArtifactTag::PixelLocationMap)?)?;
        let files = ctx.raw.require_files()?.to_vec();
        let digest = frame_digest(&files, "trace");

        let n = match ctx.settings.i64("trace.slits.number") {
            Some(n) if n > 0 => n as usize,
            _ => 2 + (unit_score(&digest, 0) * 6.0) as usize,
        };
        let ncols = bpm.shape.1.max(pix.shape.1 / 2).max(n);
        let width = ncols as f64 / n as f64;
        let edges = (0..n).map(|i| SlitEdges { left: i as f64 * width + 1.0,
                                               right: (i + 1) as f64 * width - 1.0 })
                          .collect();
        let function = ctx.settings.str("trace.slits.function").unwrap_or("legendre").to_string();
        let trace = encode(SlitTrace { function, files, edges })?;
        Ok(BuildOutput::new(trace).with_slit_count(n))
    }
}
