//! Tabla de exposiciones crudas (colaborador externo, sólo lectura).
//!
//! El core la consulta por scope para resolver los archivos de entrada de cada
//! builder y atributos puntuales de una exposición representativa (binning
//! para la máscara de píxeles malos).
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::model::ScopeKey;

/// Tipo de frame crudo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameType {
    Bias,
    Arc,
    Trace,
    PixelFlat,
    Science,
    Standard,
}

impl fmt::Display for FrameType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FrameType::Bias => "bias",
            FrameType::Arc => "arc",
            FrameType::Trace => "trace",
            FrameType::PixelFlat => "pixelflat",
            FrameType::Science => "science",
            FrameType::Standard => "standard",
        };
        f.write_str(s)
    }
}

/// Binning del detector (espectral, espacial).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Binning {
    pub spectral: u32,
    pub spatial: u32,
}

impl Default for Binning {
    fn default() -> Self {
        Self { spectral: 1, spatial: 1 }
    }
}

impl fmt::Display for Binning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.spectral, self.spatial)
    }
}

impl FromStr for Binning {
    type Err = String;

    /// Acepta "1,1", "2x2" o "2 1".
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(|c: char| c == ',' || c == 'x' || c.is_whitespace())
                                .filter(|p| !p.is_empty())
                                .collect();
        match parts.as_slice() {
            [a, b] => {
                let spectral = a.parse::<u32>().map_err(|e| format!("invalid binning '{s}': {e}"))?;
                let spatial = b.parse::<u32>().map_err(|e| format!("invalid binning '{s}': {e}"))?;
                if spectral == 0 || spatial == 0 {
                    return Err(format!("invalid binning '{s}': factors must be positive"));
                }
                Ok(Self { spectral, spatial })
            }
            _ => Err(format!("invalid binning '{s}'")),
        }
    }
}

/// Una fila por exposición cruda.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExposureRow {
    pub filename: String,
    pub configuration: String,
    pub frame_types: Vec<FrameType>,
    /// Grupos de exposición (sci_ID) a los que aplica este frame.
    pub groups: Vec<u32>,
    #[serde(default)]
    pub binning: Binning,
}

impl ExposureRow {
    pub fn new(filename: impl Into<String>, configuration: impl Into<String>, frame: FrameType, groups: &[u32]) -> Self {
        Self { filename: filename.into(),
               configuration: configuration.into(),
               frame_types: vec![frame],
               groups: groups.to_vec(),
               binning: Binning::default() }
    }

    pub fn with_binning(mut self, binning: Binning) -> Self {
        self.binning = binning;
        self
    }

    pub fn also(mut self, frame: FrameType) -> Self {
        if !self.frame_types.contains(&frame) {
            self.frame_types.push(frame);
        }
        self
    }

    pub fn is(&self, frame: FrameType) -> bool {
        self.frame_types.contains(&frame)
    }

    pub fn matches(&self, scope: &ScopeKey) -> bool {
        self.configuration == scope.configuration && self.groups.contains(&scope.exposure_group)
    }
}

/// Contrato de la tabla de exposiciones.
pub trait ExposureTable: Send + Sync {
    /// Filas del `frame` pedido que aplican al scope, en orden de tabla.
    fn frames(&self, scope: &ScopeKey, frame: FrameType) -> Vec<ExposureRow>;

    /// Exposición representativa (la primera) de un tipo de frame.
    fn representative(&self, scope: &ScopeKey, frame: FrameType) -> Option<ExposureRow> {
        self.frames(scope, frame).into_iter().next()
    }

    /// Nombres de archivo del `frame` pedido.
    fn files(&self, scope: &ScopeKey, frame: FrameType) -> Vec<String> {
        self.frames(scope, frame).into_iter().map(|r| r.filename).collect()
    }
}

/// Implementación en memoria (tests y drivers simples).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InMemoryExposureTable {
    pub rows: Vec<ExposureRow>,
}

impl InMemoryExposureTable {
    pub fn new(rows: Vec<ExposureRow>) -> Self {
        Self { rows }
    }

    pub fn push(&mut self, row: ExposureRow) {
        self.rows.push(row);
    }

    pub fn configurations(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for r in &self.rows {
            if !out.contains(&r.configuration) {
                out.push(r.configuration.clone());
            }
        }
        out
    }
}

impl ExposureTable for InMemoryExposureTable {
    fn frames(&self, scope: &ScopeKey, frame: FrameType) -> Vec<ExposureRow> {
        self.rows
            .iter()
            .filter(|r| r.is(frame) && r.matches(scope))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> InMemoryExposureTable {
        InMemoryExposureTable::new(vec![ExposureRow::new("b1.fits", "A", FrameType::Bias, &[1, 2]),
                                        ExposureRow::new("b2.fits", "B", FrameType::Bias, &[1]),
                                        ExposureRow::new("s1.fits", "A", FrameType::Science, &[2])
                                            .with_binning(Binning { spectral: 2, spatial: 1 }),
                                        ExposureRow::new("t1.fits", "A", FrameType::Trace, &[1]).also(FrameType::PixelFlat)])
    }

    #[test]
    fn frames_filter_by_configuration_and_group() {
        let t = table();
        assert_eq!(t.files(&ScopeKey::new("A", 1, 1), FrameType::Bias), vec!["b1.fits"]);
        assert_eq!(t.files(&ScopeKey::new("A", 1, 1), FrameType::PixelFlat), vec!["t1.fits"]);
        assert!(t.files(&ScopeKey::new("A", 1, 3), FrameType::Bias).is_empty());
        let sci = t.representative(&ScopeKey::new("A", 1, 2), FrameType::Science).expect("science");
        assert_eq!(sci.binning.to_string(), "2,1");
        assert_eq!(t.configurations(), vec!["A".to_string(), "B".to_string()]);
    }

    #[test]
    fn binning_parses_common_forms() {
        assert_eq!("2x1".parse::<Binning>(), Ok(Binning { spectral: 2, spatial: 1 }));
        assert_eq!("1, 1".parse::<Binning>(), Ok(Binning::default()));
        assert!("0,1".parse::<Binning>().is_err());
        assert!("abc".parse::<Binning>().is_err());
    }
}
