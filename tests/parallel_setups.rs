//! Driver paralelo sobre un store de masters temporal.

use calib_core::{CalibEventKind, ExposureRow, FrameType, InMemoryExposureTable, Origin};
use calib_persistence::StoreConfig;
use calibflow::{load_settings, run_setups, store_backed_orchestrator, AppConfig, SetupRun};

fn table() -> InMemoryExposureTable {
    let mut rows = Vec::new();
    for cfg in ["setupA", "setupB", "setupC"] {
        rows.push(ExposureRow::new(format!("{cfg}_bias.fits"), cfg, FrameType::Bias, &[1]));
        rows.push(ExposureRow::new(format!("{cfg}_arc.fits"), cfg, FrameType::Arc, &[1]));
        rows.push(ExposureRow::new(format!("{cfg}_flat.fits"), cfg, FrameType::Trace, &[1]).also(FrameType::PixelFlat));
        rows.push(ExposureRow::new(format!("{cfg}_sci.fits"), cfg, FrameType::Science, &[1]));
    }
    // setupD sin arcos: la cadena se detiene en Arc
    rows.push(ExposureRow::new("setupD_bias.fits", "setupD", FrameType::Bias, &[1]));
    InMemoryExposureTable::new(rows)
}

fn config(dir: &std::path::Path) -> AppConfig {
    AppConfig { store: StoreConfig::with_root(dir),
                settings_file: None,
                ncpus: Some(3) }
}

fn setups() -> Vec<SetupRun> {
    ["setupA", "setupB", "setupC"].iter().map(|c| SetupRun::new(*c, 1, 1)).collect()
}

#[test]
fn setups_run_in_parallel_and_share_the_cache() {
    let _ = env_logger::builder().is_test(true).try_init();
    let dir = tempfile::tempdir().unwrap();
    let cfg = config(dir.path());
    let settings = load_settings("trace slits number 4\narc calibrate maxrms 1.0\ntrace slits tilts maxrms 1.0").unwrap();
    let cal = store_backed_orchestrator(table(), &cfg);

    let outcomes = run_setups(&cal, &setups(), &settings, 3).unwrap();
    assert_eq!(outcomes.len(), 3);
    assert!(outcomes.iter().all(|o| o.is_complete()));
    assert!(outcomes.iter().all(|o| o.excluded_slits == Some(Vec::new())));

    let summary = cal.summary();
    assert_eq!(summary.configurations.len(), 3);
    // 9 artifacts por configuración (flat + slit profile incluidos)
    assert_eq!(summary.artifact_count(), 27);
    let built = cal.events().iter().filter(|e| matches!(e.kind, CalibEventKind::Built { .. })).count();
    assert_eq!(built, 24);
}

#[test]
fn second_process_loads_masters_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config(dir.path());
    let settings = load_settings("trace slits number 3").unwrap();

    let first = store_backed_orchestrator(table(), &cfg);
    run_setups(&first, &setups(), &settings, 2).unwrap();

    let second = store_backed_orchestrator(table(), &cfg);
    let outcomes = run_setups(&second, &setups(), &settings, 2).unwrap();
    for o in &outcomes {
        assert!(o.full.stages.iter().all(|(_, r)| r.origin() == Some(Origin::Store)));
    }
    assert!(second.events().iter().all(|e| !matches!(e.kind, CalibEventKind::Built { .. })));
}

#[test]
fn setup_without_arcs_is_a_hard_error() {
    let dir = tempfile::tempdir().unwrap();
    let cal = store_backed_orchestrator(table(), &config(dir.path()));
    let settings = load_settings("").unwrap();

    let outcomes = run_setups(&cal, &[SetupRun::new("setupD", 1, 1)], &settings, 1);
    // sin arcos el builder de Arc falla con NoRawInputs: error duro
    assert!(outcomes.is_err());
}
