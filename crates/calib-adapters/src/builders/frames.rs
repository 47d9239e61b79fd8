//! Frames combinados: bias, arco y flat normalizado.

use calib_core::{ArtifactTag, BuildContext, BuildError, BuildOutput, Builder, Settings};
use log::debug;
use serde_json::Value;

use super::{decode, encode};
use crate::digest::{frame_digest, unit_score};
use crate::payloads::{ArcFrame, BiasFrame, FlatField, SlitProfileData, SlitTrace};

const DEFAULT_SHAPE: (usize, usize) = (2048, 1024);

#[derive(Debug, Clone, Copy, Default)]
pub struct BiasBuilder;

impl Builder for BiasBuilder {
    fn tag(&self) -> ArtifactTag {
        ArtifactTag::Bias
    }

    fn settings_subset(&self, settings: &Settings) -> Value {
        settings.subset(&["bias comb method", "bias comb reject replace", "reduce usebias"])
    }

    fn build(&self, ctx: &BuildContext<'_>) -> Result<BuildOutput, BuildError> {
        // `reduce usebias overscan`: no hay frames de bias que combinar
        if ctx.settings.str("reduce.usebias") == Some("overscan") {
            let empty: [&str; 0] = [];
            let frame = BiasFrame { method: "overscan".into(),
                                    files: Vec::new(),
                                    digest: frame_digest(&empty, "overscan") };
            return Ok(BuildOutput::new(encode(frame)?));
        }
        let files = ctx.raw.require_files()?.to_vec();
        let method = ctx.settings.str("bias.comb.method").unwrap_or("mean").to_string();
        let digest = frame_digest(&files, &format!("bias:{method}"));
        debug!("combined {} bias frames with {method}", files.len());
        Ok(BuildOutput::new(encode(BiasFrame { method, files, digest })?))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ArcBuilder;

impl Builder for ArcBuilder {
    fn tag(&self) -> ArtifactTag {
        ArtifactTag::Arc
    }

    fn settings_subset(&self, settings: &Settings) -> Value {
        settings.subset(&["arc comb method", "detector naxis0", "detector naxis1"])
    }

    fn build(&self, ctx: &BuildContext<'_>) -> Result<BuildOutput, BuildError> {
        let files = ctx.raw.require_files()?.to_vec();
        let bias = ctx.prerequisites.require(ArtifactTag::Bias)?;
        let method = ctx.settings.str("arc.comb.method").unwrap_or("weightmean").to_string();
        let shape = detector_shape(ctx.settings);
        let digest = frame_digest(&files, &format!("arc:{method}:{}", bias.hash));
        Ok(BuildOutput::new(encode(ArcFrame { method,
                                              files,
                                              digest,
                                              shape,
                                              bias: Some(bias.hash.clone()) })?))
    }
}

pub(crate) fn detector_shape(settings: &Settings) -> (usize, usize) {
    let axis = |path: &str, default: usize| -> usize {
        settings.i64(path).filter(|v| *v > 0).map(|v| v as usize).unwrap_or(default)
    };
    (axis("detector.naxis0", DEFAULT_SHAPE.0), axis("detector.naxis1", DEFAULT_SHAPE.1))
}

/// Flat normalizado más el perfil de iluminación por slit (compañero).
#[derive(Debug, Clone, Copy, Default)]
pub struct FlatBuilder;

impl Builder for FlatBuilder {
    fn tag(&self) -> ArtifactTag {
        ArtifactTag::NormalizedFlat
    }

    fn settings_subset(&self, settings: &Settings) -> Value {
        settings.subset(&["pixelflat comb method",
                          "reduce flatfield method",
                          "reduce flatfield params",
                          "reduce flatfield useframe",
                          "reduce slitprofile perform"])
    }

    fn build(&self, ctx: &BuildContext<'_>) -> Result<BuildOutput, BuildError> {
        let slits: SlitTrace = decode(ctx.prerequisites.require(ArtifactTag::SlitGeometry)?)?;
        ctx.prerequisites.require(ArtifactTag::TiltMap)?;

        // Un flat provisto por el usuario reemplaza a los pixelflats crudos.
        let (method, files) = match ctx.settings.str("reduce.flatfield.useframe") {
            Some(u) if !matches!(u, "pixelflat" | "trace") => ("user".to_string(), vec![u.to_string()]),
            _ => (ctx.settings.str("pixelflat.comb.method").unwrap_or("weightmean").to_string(),
                  ctx.raw.require_files()?.to_vec()),
        };
        let digest = frame_digest(&files, &format!("flat:{method}"));
        let n = slits.edges.len();
        let flat = encode(FlatField { method,
                                      files,
                                      digest: digest.clone(),
                                      slits: n })?;
        let mut out = BuildOutput::new(flat);
        if ctx.settings.bool_or("reduce.slitprofile.perform", true) {
            let profile = (0..n).map(|i| 0.9 + 0.1 * unit_score(&digest, i)).collect();
            out = out.with_companion(encode(SlitProfileData { profile })?);
        }
        Ok(out)
    }
}
