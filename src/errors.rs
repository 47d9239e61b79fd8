use std::path::PathBuf;

use calib_core::{CalibError, SettingsError};
use calib_persistence::StoreError;
use thiserror::Error;

/// Errores del driver de aplicación.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("calibration error: {0}")]
    Calib(#[from] CalibError),
    #[error("master store error: {0}")]
    Store(#[from] StoreError),
    #[error("settings error: {0}")]
    Settings(#[from] SettingsError),
    #[error("io error at {path}: {source}")]
    Io { path: PathBuf, source: std::io::Error },
    #[error("configuration error: {0}")]
    Config(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_variant_format() {
        let err = AppError::Config("bad ncpus".into());
        assert_eq!(err.to_string(), "configuration error: bad ncpus");
    }

    #[test]
    fn wraps_settings_error() {
        let err: AppError = SettingsError::UnknownKey("foo bar".into()).into();
        assert_eq!(err.to_string(), "settings error: unknown settings key: foo bar");
    }

    #[test]
    fn io_variant_names_path() {
        let err = AppError::Io { path: PathBuf::from("run.settings"),
                                 source: std::io::Error::other("denied") };
        assert_eq!(err.to_string(), "io error at run.settings: denied");
    }
}
