//! Pipeline completo con los builders de referencia.

use std::sync::Arc;

use calib_adapters::payloads::{BadPixelMap, BiasFrame, FlatField, SlitProfileData, SlitTrace, WaveSolution};
use calib_adapters::{standard_registry, store_backed_registry};
use calib_core::engine::{FULL_CHAIN, TRACE_CHAIN};
use calib_core::model::ArtifactSpec;
use calib_core::{ArtifactTag, Binning, CalibEventKind, Calibrations, ExposureRow, FrameType, InMemoryExposureTable,
                 Origin, Resolved, Settings, SettingsDoc, SettingsRegistry, SkipReason};
use calib_persistence::FsArtifactStore;

fn table() -> InMemoryExposureTable {
    let binned = Binning { spectral: 2, spatial: 1 };
    InMemoryExposureTable::new(vec![ExposureRow::new("bias1.fits", "setupA", FrameType::Bias, &[1]),
                                    ExposureRow::new("bias2.fits", "setupA", FrameType::Bias, &[1]),
                                    ExposureRow::new("arc1.fits", "setupA", FrameType::Arc, &[1]),
                                    ExposureRow::new("flat1.fits", "setupA", FrameType::Trace, &[1]).also(FrameType::PixelFlat),
                                    ExposureRow::new("sci1.fits", "setupA", FrameType::Science, &[1]).with_binning(binned),
                                    ExposureRow::new("arc9.fits", "setupB", FrameType::Arc, &[1])])
}

fn settings(lines: &str) -> Settings {
    let reg = SettingsRegistry::standard();
    let mut doc = SettingsDoc::new();
    reg.apply_lines(&mut doc, lines).expect("settings");
    doc.freeze()
}

#[test]
fn reference_builders_run_the_whole_chain() {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut cal = Calibrations::builder(table()).registry(standard_registry()).build();
    cal.configure("setupA",
                  1,
                  1,
                  settings("trace slits number 5\narc calibrate maxrms 1.0\ntrace slits tilts maxrms 1.0\n"))
       .expect("configure");

    let full = cal.run_full_calibration().expect("full");
    assert!(full.is_complete(&FULL_CHAIN));
    let trace = cal.run_trace_calibration().expect("trace");
    assert!(trace.is_complete(&TRACE_CHAIN));

    let bias = BiasFrame::from_artifact(full.get(ArtifactTag::Bias).and_then(Resolved::artifact).expect("bias"))
        .expect("decode bias");
    assert_eq!(bias.files, vec!["bias1.fits", "bias2.fits"]);
    assert_eq!(bias.method, "mean");

    let bpm = BadPixelMap::from_artifact(full.get(ArtifactTag::BadPixelMask).and_then(Resolved::artifact).expect("bpm"))
        .expect("decode bpm");
    assert_eq!(bpm.binning, "2,1");
    assert_eq!(bpm.shape, (1024, 1024));

    let slits = SlitTrace::from_artifact(trace.get(ArtifactTag::SlitGeometry).and_then(Resolved::artifact).expect("slits"))
        .expect("decode slits");
    assert_eq!(slits.edges.len(), 5);
    assert_eq!(cal.mask().map(|m| m.excluded_count()), Some(0));

    let flat = trace.get(ArtifactTag::NormalizedFlat).and_then(Resolved::ready).expect("flat");
    let flat_payload = FlatField::from_artifact(&flat.artifact).expect("decode flat");
    assert_eq!(flat_payload.slits, 5);
    let profile = SlitProfileData::from_artifact(flat.companion.as_ref().expect("profile")).expect("decode profile");
    assert_eq!(profile.profile.len(), 5);
}

#[test]
fn strict_rms_threshold_excludes_every_slit() {
    let mut cal = Calibrations::builder(table()).registry(standard_registry()).build();
    cal.configure("setupA", 1, 1, settings("trace slits number 3\narc calibrate maxrms 0.0"))
       .expect("configure");
    cal.run_full_calibration().expect("full");
    let trace = cal.run_trace_calibration().expect("trace");

    let wave = trace.get(ArtifactTag::WavelengthCalibration).expect("wave");
    assert_eq!(wave.mask().map(|m| m.excluded()), Some(vec![0, 1, 2]));
    let solution = WaveSolution::from_artifact(wave.artifact().expect("ready")).expect("decode");
    assert!(solution.fits.iter().all(|f| !f.ok));
    assert_eq!(solution.medium, "air");
    let tilts = trace.get(ArtifactTag::TiltMap).and_then(Resolved::mask).expect("tilt mask");
    assert_eq!(tilts.excluded_count(), 3);
}

#[test]
fn pixel_mode_and_missing_frames() {
    let mut cal = Calibrations::builder(table()).registry(standard_registry()).build();
    cal.configure("setupA", 1, 1, settings("reduce calibrate wavelength pixel")).expect("configure");
    cal.run_full_calibration().expect("full");
    let trace = cal.run_trace_calibration().expect("trace");
    assert_eq!(trace.stopped_at().and_then(|(_, r)| r.skipped()),
               Some(SkipReason::WavelengthCalibrationDisabled));

    // setupB no tiene bias; con overscan el bias se construye sin frames
    cal.configure("setupB", 1, 1, Settings::empty()).expect("configure B");
    assert!(cal.get_bias().is_err());
    cal.configure("setupB", 1, 1, settings("reduce usebias overscan")).expect("configure B overscan");
    let bias = cal.get_bias().expect("overscan bias");
    let payload = BiasFrame::from_artifact(bias.artifact().expect("ready")).expect("decode");
    assert_eq!(payload.method, "overscan");
    assert!(cal.get_arc().expect("arc").is_ready());
}

#[test]
fn store_backed_registry_reloads_masters() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = Arc::new(FsArtifactStore::new(dir.path()));
    let lines = "trace slits number 4\narc calibrate maxrms 1.0\ntrace slits tilts maxrms 0.0";

    let mut first = Calibrations::builder(table()).registry(store_backed_registry(Arc::clone(&store), true))
                                                  .build();
    first.configure("setupA", 1, 1, settings(lines)).expect("configure");
    first.run_full_calibration().expect("full");
    first.run_trace_calibration().expect("trace");
    assert_eq!(first.mask().map(|m| m.excluded_count()), Some(4));
    assert_eq!(store.list(ArtifactTag::TiltMap).expect("list").len(), 1);

    let mut second = Calibrations::builder(table()).registry(store_backed_registry(Arc::clone(&store), true))
                                                   .build();
    second.configure("setupA", 1, 1, settings(lines)).expect("configure");
    let full = second.run_full_calibration().expect("full");
    let trace = second.run_trace_calibration().expect("trace");
    assert!(full.stages.iter().chain(trace.stages.iter()).all(|(_, r)| r.origin() == Some(Origin::Store)));
    assert!(second.events().iter().all(|e| !matches!(e.kind, CalibEventKind::Built { .. })));
    // el tilt map cargado no aporta máscara; la de wavecalib está vacía
    assert_eq!(second.mask().map(|m| m.excluded_count()), Some(0));
    assert!(second.is_cached(ArtifactTag::SlitProfile));
}
