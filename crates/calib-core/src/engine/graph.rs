//! Tabla estática de etapas: prerequisitos y entradas crudas por tag.
//!
//! El orden de `requires` es el orden en que se verifican; el primero que
//! falte es el que se reporta.

use crate::exposure::FrameType;
use crate::model::ArtifactTag;

/// De dónde saca una etapa sus entradas crudas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawRole {
    None,
    /// Todos los frames del tipo dentro del scope.
    Files(FrameType),
    /// Sólo la primera exposición del tipo (metadatos, p.ej. binning).
    Representative(FrameType),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stage {
    pub tag: ArtifactTag,
    pub requires: &'static [ArtifactTag],
    pub optional: &'static [ArtifactTag],
    pub raw: RawRole,
    /// La etapa reinicia o amplía la máscara y la devuelve al caller.
    pub affects_mask: bool,
}

use ArtifactTag::*;

pub const STAGES: [Stage; 8] = [
    Stage { tag: Bias, requires: &[], optional: &[], raw: RawRole::Files(FrameType::Bias), affects_mask: false },
    Stage { tag: Arc, requires: &[Bias], optional: &[], raw: RawRole::Files(FrameType::Arc), affects_mask: false },
    Stage { tag: BadPixelMask,
            requires: &[Arc],
            optional: &[Bias],
            raw: RawRole::Representative(FrameType::Science),
            affects_mask: false },
    Stage { tag: PixelLocationMap, requires: &[Arc], optional: &[], raw: RawRole::None, affects_mask: false },
    Stage { tag: SlitGeometry,
            requires: &[BadPixelMask, PixelLocationMap],
            optional: &[Bias],
            raw: RawRole::Files(FrameType::Trace),
            affects_mask: true },
    Stage { tag: WavelengthCalibration,
            requires: &[Arc, SlitGeometry, PixelLocationMap],
            optional: &[],
            raw: RawRole::None,
            affects_mask: true },
    Stage { tag: TiltMap,
            requires: &[Arc, SlitGeometry, PixelLocationMap, WavelengthCalibration],
            optional: &[],
            raw: RawRole::None,
            affects_mask: true },
    Stage { tag: NormalizedFlat,
            requires: &[SlitGeometry, TiltMap],
            optional: &[Bias],
            raw: RawRole::Files(FrameType::PixelFlat),
            affects_mask: false },
];

/// Cadena interna bias → arc → bpm → pixlocn.
pub const FULL_CHAIN: [ArtifactTag; 4] = [Bias, Arc, BadPixelMask, PixelLocationMap];

/// Cadena dependiente de frames de traza.
pub const TRACE_CHAIN: [ArtifactTag; 4] = [SlitGeometry, WavelengthCalibration, TiltMap, NormalizedFlat];

/// Etapa que produce `tag`. SlitProfile sale como compañero de NormalizedFlat.
pub fn stage(tag: ArtifactTag) -> &'static Stage {
    let producer = if tag == SlitProfile { NormalizedFlat } else { tag };
    STAGES.iter().find(|s| s.tag == producer).unwrap_or(&STAGES[0])
}
