//! Driver de pipeline: varios setups en paralelo sobre un orquestador
//! compartido.
//!
//! Cada worker trabaja sobre un `fork()` del orquestador (mismo cache, mismo
//! log de eventos, scope propio). Las configuraciones distintas avanzan en
//! paralelo; dentro de una misma configuración el lock del bucket serializa
//! las construcciones.
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use calib_adapters::store_backed_registry;
use calib_core::engine::FULL_CHAIN;
use calib_core::{Calibrations, EventStore, ExposureTable, PipelineReport, Settings, SettingsDoc, SettingsRegistry};
use calib_persistence::FsArtifactStore;
use chrono::{DateTime, Utc};
use log::{info, warn};
use rayon::prelude::*;
use serde::Serialize;

use crate::config::AppConfig;
use crate::errors::AppError;

/// Un setup a procesar: configuración + detector + grupo de exposiciones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SetupRun {
    pub configuration: String,
    pub detector: u32,
    pub exposure_group: u32,
}

impl SetupRun {
    pub fn new(configuration: impl Into<String>, detector: u32, exposure_group: u32) -> Self {
        Self { configuration: configuration.into(),
               detector,
               exposure_group }
    }
}

/// Resultado por setup. `trace` sólo se intenta si la cadena completa quedó
/// lista.
#[derive(Debug, Clone)]
pub struct SetupOutcome {
    pub setup: SetupRun,
    pub full: PipelineReport,
    pub trace: Option<PipelineReport>,
    pub excluded_slits: Option<Vec<usize>>,
    pub finished_at: DateTime<Utc>,
    pub elapsed_ms: u128,
}

impl SetupOutcome {
    /// Ambas cadenas terminaron con todas sus etapas listas.
    pub fn is_complete(&self) -> bool {
        self.full.stopped_at().is_none() && self.trace.as_ref().map(|t| t.stopped_at().is_none()).unwrap_or(false)
    }
}

/// Parsea líneas de settings con el registro estándar.
pub fn load_settings(text: &str) -> Result<Settings, AppError> {
    let registry = SettingsRegistry::standard();
    let mut doc = SettingsDoc::new();
    let applied = registry.apply_lines(&mut doc, text)?;
    info!("loaded {applied} settings lines");
    Ok(doc.freeze())
}

pub fn read_settings(path: &Path) -> Result<Settings, AppError> {
    let text = std::fs::read_to_string(path).map_err(|source| AppError::Io { path: path.to_path_buf(),
                                                                            source })?;
    load_settings(&text)
}

/// Orquestador con los builders de referencia envueltos en el store de
/// masters configurado.
pub fn store_backed_orchestrator<T: ExposureTable + 'static>(exposures: T, config: &AppConfig) -> Calibrations {
    let store = Arc::new(FsArtifactStore::from_config(&config.store));
    info!("master directory: {}", store.root().display());
    Calibrations::builder(exposures).registry(store_backed_registry(store, config.store.reuse))
                                    .build()
}

/// Workers: `AppConfig::ncpus` > `run ncpus` > CPUs disponibles.
pub fn worker_count(config: &AppConfig, settings: &Settings) -> usize {
    config.ncpus
          .or_else(|| settings.i64("run.ncpus").map(|n| n.max(1) as usize))
          .unwrap_or_else(|| std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1))
}

/// Procesa todos los setups en un pool rayon local de `workers` hilos. El
/// primer error duro aborta el resultado; las etapas no disponibles quedan
/// reflejadas en cada `SetupOutcome`.
pub fn run_setups<E: EventStore>(cal: &Calibrations<E>,
                                 setups: &[SetupRun],
                                 settings: &Settings,
                                 workers: usize)
                                 -> Result<Vec<SetupOutcome>, AppError> {
    let pool = rayon::ThreadPoolBuilder::new().num_threads(workers.max(1))
                                              .build()
                                              .map_err(|e| AppError::Config(format!("failed to build worker pool: {e}")))?;
    info!("processing {} setups with {} workers", setups.len(), pool.current_num_threads());
    pool.install(|| setups.par_iter().map(|s| run_setup(cal.fork(), s, settings)).collect())
}

fn run_setup<E: EventStore>(mut cal: Calibrations<E>, setup: &SetupRun, settings: &Settings) -> Result<SetupOutcome, AppError> {
    let start = Instant::now();
    cal.configure(setup.configuration.as_str(), setup.detector, setup.exposure_group, settings.clone())?;
    let full = cal.run_full_calibration()?;
    let trace = if full.is_complete(&FULL_CHAIN) {
        Some(cal.run_trace_calibration()?)
    } else {
        if let Some((tag, _)) = full.stopped_at() {
            warn!("{}: calibration stopped at {}; trace chain not attempted", setup.configuration, tag.name());
        }
        None
    };
    Ok(SetupOutcome { setup: setup.clone(),
                      full,
                      trace,
                      excluded_slits: cal.mask().map(|m| m.excluded()),
                      finished_at: Utc::now(),
                      elapsed_ms: start.elapsed().as_millis() })
}
