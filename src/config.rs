//! Configuración de proceso.
//!
//! Variables reconocidas (el archivo `.env` se carga una sola vez):
//! - `CALIB_MASTER_DIR` / `CALIB_MASTER_REUSE`: ver `calib_persistence::StoreConfig`.
//! - `CALIBFLOW_SETTINGS`: archivo con líneas de settings (opcional).
//! - `CALIBFLOW_NCPUS`: workers (`all`, entero, negativo = todos menos N).
//!
//! `AppConfig` se construye una vez en el arranque y se pasa por valor.
use std::env;
use std::path::PathBuf;

use calib_core::settings::ValueKind;
use calib_persistence::StoreConfig;
use once_cell::sync::Lazy;

use crate::errors::AppError;

static DOTENV_LOADED: Lazy<()> = Lazy::new(|| {
    let _ = dotenvy::dotenv();
});

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub store: StoreConfig,
    pub settings_file: Option<PathBuf>,
    /// `None`: decide `run ncpus` o el número de CPUs disponibles.
    pub ncpus: Option<usize>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        Lazy::force(&DOTENV_LOADED);
        Self::from_lookup(|k| env::var(k).ok())
    }

    /// Construye desde una función de búsqueda arbitraria (tests).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
        where F: Fn(&str) -> Option<String>
    {
        let mut store = StoreConfig::default();
        if let Some(dir) = lookup("CALIB_MASTER_DIR") {
            store.root = PathBuf::from(dir);
        }
        if let Some(raw) = lookup("CALIB_MASTER_REUSE") {
            let reuse = calib_core::settings::parse::parse_bool(&raw);
            store.reuse = reuse.ok_or_else(|| AppError::Config(format!("CALIB_MASTER_REUSE: invalid boolean '{raw}'")))?;
        }
        let ncpus = match lookup("CALIBFLOW_NCPUS") {
            Some(raw) => {
                let v = ValueKind::Cpus.convert(&raw)
                                       .and_then(|v| v.as_i64())
                                       .ok_or_else(|| AppError::Config(format!("CALIBFLOW_NCPUS: invalid value '{raw}'")))?;
                Some(v.max(1) as usize)
            }
            None => None,
        };
        Ok(Self { store,
                  settings_file: lookup("CALIBFLOW_SETTINGS").map(PathBuf::from),
                  ncpus })
    }
}
