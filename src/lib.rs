//! calibflow
//!
//! Fachada del workspace de calibraciones:
//! - `config`: configuración de proceso (directorio de masters, archivo de
//!   settings, workers) cargada desde .env / entorno.
//! - `errors`: `AppError`, que agrupa los errores de core, store y settings.
//! - `pipeline`: driver que procesa varios setups en paralelo sobre un
//!   orquestador compartido.
//!
//! Los tipos del orquestador se re-exportan desde `calib_core`.

pub mod config;
pub mod errors;
pub mod pipeline;

pub use calib_core::{Calibrations, Resolved, Settings};
pub use config::AppConfig;
pub use errors::AppError;
pub use pipeline::{load_settings, read_settings, run_setups, store_backed_orchestrator, SetupOutcome, SetupRun};
