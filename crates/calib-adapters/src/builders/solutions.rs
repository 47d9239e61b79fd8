//! Soluciones por slit: longitud de onda y tilts. Ambas reportan una máscara
//! con las slits cuyo ajuste no alcanzó la calidad pedida.

use calib_core::{ArtifactTag, BuildContext, BuildError, BuildOutput, Builder, MaskVector, Settings,
                 WavelengthMode};
use log::{info, warn};
use serde_json::Value;

use super::{decode, encode};
use crate::digest::unit_score;
use crate::payloads::{SlitFit, SlitTrace, TiltSolution, WaveSolution};

fn mask_of(fits: &[SlitFit]) -> MaskVector {
    MaskVector::from_flags(fits.iter().map(|f| !f.ok).collect())
}

#[derive(Debug, Clone, Copy, Default)]
pub struct WaveCalibBuilder;

impl Builder for WaveCalibBuilder {
    fn tag(&self) -> ArtifactTag {
        ArtifactTag::WavelengthCalibration
    }

    fn settings_subset(&self, settings: &Settings) -> Value {
        settings.subset(&["reduce calibrate wavelength",
                          "arc calibrate lamps",
                          "arc calibrate nfitpix",
                          "arc calibrate maxrms"])
    }

    fn build(&self, ctx: &BuildContext<'_>) -> Result<BuildOutput, BuildError> {
        let arc = ctx.prerequisites.require(ArtifactTag::Arc)?;
        let slits: SlitTrace = decode(ctx.prerequisites.require(ArtifactTag::SlitGeometry)?)?;
        let medium = match ctx.settings.wavelength_mode() {
            WavelengthMode::Solution(m) => m,
            WavelengthMode::Pixel => {
                return Err(BuildError::InvalidInput("wavelength calibration disabled (pixel mode)".into()))
            }
        };
        let lamps = ctx.settings
                       .get("arc.calibrate.lamps")
                       .and_then(Value::as_array)
                       .map(|a| a.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
                       .unwrap_or_default();
        let maxrms = ctx.settings.f64_or("arc.calibrate.maxrms", 0.9);

        let fits: Vec<SlitFit> = (0..slits.edges.len()).map(|slit| {
                                                           let rms = unit_score(&arc.hash, slit);
                                                           let masked = ctx.mask.map(|m| m.is_excluded(slit))
                                                                                .unwrap_or(false);
                                                           SlitFit { slit,
                                                                     rms,
                                                                     ok: !masked && rms <= maxrms }
                                                       })
                                                       .collect();
        let mask = mask_of(&fits);
        if mask.excluded_count() > 0 {
            warn!("wavelength solution rejected slits {:?}", mask.excluded());
        }
        info!("wavelength solution ({medium}) for {} slits", fits.len());
        Ok(BuildOutput::new(encode(WaveSolution { medium, lamps, fits })?).with_mask(mask))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TiltBuilder;

impl Builder for TiltBuilder {
    fn tag(&self) -> ArtifactTag {
        ArtifactTag::TiltMap
    }

    fn settings_subset(&self, settings: &Settings) -> Value {
        settings.subset(&["trace slits tilts method", "trace slits tilts order", "trace slits tilts maxrms"])
    }

    fn build(&self, ctx: &BuildContext<'_>) -> Result<BuildOutput, BuildError> {
        let arc = ctx.prerequisites.require(ArtifactTag::Arc)?;
        let wave: WaveSolution = decode(ctx.prerequisites.require(ArtifactTag::WavelengthCalibration)?)?;
        let method = ctx.settings.str("trace.slits.tilts.method").unwrap_or("spca").to_string();
        let order = ctx.settings.i64("trace.slits.tilts.order").unwrap_or(1);
        let maxrms = ctx.settings.f64_or("trace.slits.tilts.maxrms", 0.95);
        let seed = format!("{}:tilts:{method}", arc.hash);

        let fits: Vec<SlitFit> = wave.fits
                                     .iter()
                                     .map(|w| {
                                         let rms = unit_score(&seed, w.slit);
                                         let masked = ctx.mask.map(|m| m.is_excluded(w.slit)).unwrap_or(false);
                                         SlitFit { slit: w.slit,
                                                   rms,
                                                   ok: w.ok && !masked && rms <= maxrms }
                                     })
                                     .collect();
        let mask = mask_of(&fits);
        Ok(BuildOutput::new(encode(TiltSolution { method, order, fits })?).with_mask(mask))
    }
}
