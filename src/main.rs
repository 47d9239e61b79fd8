//! Demo del orquestador: dos setups sintéticos procesados en paralelo con
//! los builders de referencia y el store de masters configurado en el
//! entorno. Un segundo arranque reutiliza los masters escritos.
use calib_core::{Binning, ExposureRow, FrameType, InMemoryExposureTable, Settings};
use calibflow::pipeline::worker_count;
use calibflow::{load_settings, read_settings, run_setups, store_backed_orchestrator, AppConfig, AppError, SetupRun};
use log::{error, info};

const DEFAULT_SETTINGS: &str = "\
# settings de la demo
run ncpus all
trace slits number 6
arc calibrate maxrms 0.8
reduce slitprofile perform true
";

fn demo_table() -> InMemoryExposureTable {
    let mut table = InMemoryExposureTable::default();
    for setup in ["A", "B"] {
        let cfg = format!("setup{setup}");
        for (name, frame) in [("bias1", FrameType::Bias),
                              ("bias2", FrameType::Bias),
                              ("arc1", FrameType::Arc),
                              ("trace1", FrameType::Trace),
                              ("flat1", FrameType::PixelFlat)]
        {
            table.push(ExposureRow::new(format!("{cfg}_{name}.fits"), cfg.as_str(), frame, &[1]));
        }
        table.push(ExposureRow::new(format!("{cfg}_sci1.fits"), cfg.as_str(), FrameType::Science, &[1])
                   .with_binning(Binning { spectral: 1, spatial: 2 }));
    }
    table
}

fn run() -> Result<(), AppError> {
    let config = AppConfig::from_env()?;
    let settings: Settings = match &config.settings_file {
        Some(path) => read_settings(path)?,
        None => load_settings(DEFAULT_SETTINGS)?,
    };
    let cal = store_backed_orchestrator(demo_table(), &config);
    let setups = [SetupRun::new("setupA", 1, 1), SetupRun::new("setupB", 1, 1)];
    let outcomes = run_setups(&cal, &setups, &settings, worker_count(&config, &settings))?;

    for o in &outcomes {
        info!("{}: complete={} excluded slits={:?} ({} ms)",
              o.setup.configuration,
              o.is_complete(),
              o.excluded_slits.as_deref().unwrap_or(&[]),
              o.elapsed_ms);
    }
    let summary = serde_json::to_string_pretty(&cal.summary()).map_err(|e| AppError::Config(e.to_string()))?;
    println!("{summary}");
    info!("{} calibration events recorded", cal.events().len());
    Ok(())
}

fn main() {
    env_logger::init();
    if let Err(e) = run() {
        error!("{e}");
        std::process::exit(1);
    }
}
