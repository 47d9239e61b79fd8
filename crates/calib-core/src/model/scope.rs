//! Scope de calibración: (configuración, detector, grupo de exposiciones) más
//! el bundle de settings activo.
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::CalibError;
use crate::settings::Settings;

/// Identifica un contexto de calibración.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScopeKey {
    pub configuration: String,
    pub detector: u32,
    pub exposure_group: u32,
}

impl ScopeKey {
    pub fn new(configuration: impl Into<String>, detector: u32, exposure_group: u32) -> Self {
        Self { configuration: configuration.into(),
               detector,
               exposure_group }
    }

    /// Un scope sin configuración o con detector 0 equivale a "no fijado"
    /// (los detectores se numeran desde 1).
    pub fn validate(&self) -> Result<(), CalibError> {
        if self.configuration.trim().is_empty() {
            return Err(CalibError::Configuration("configuration id is not set".into()));
        }
        if self.detector == 0 {
            return Err(CalibError::Configuration(format!("detector is not set for configuration '{}'",
                                                         self.configuration)));
        }
        Ok(())
    }
}

impl fmt::Display for ScopeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/det{:02}/group{}", self.configuration, self.detector, self.exposure_group)
    }
}

/// Scope activo: clave + settings inmutables para la unidad de trabajo.
#[derive(Debug, Clone)]
pub struct Scope {
    pub key: ScopeKey,
    pub settings: Settings,
}

impl Scope {
    pub fn new(key: ScopeKey, settings: Settings) -> Self {
        Self { key, settings }
    }
}
