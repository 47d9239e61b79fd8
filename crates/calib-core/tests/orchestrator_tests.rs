mod common;

use std::sync::Arc;

use calib_core::{ArtifactTag, CalibError, CalibEventKind, Origin, Resolved, Settings, SettingsDoc};
use common::{event_names, init_logging, orchestrator, prerequisite_warnings};
use serde_json::json;

#[test]
fn scenario_bias_reuse_arc_and_missing_arc_in_fresh_setup() {
    init_logging();
    let (mut cal, counters) = orchestrator();
    cal.configure("setupX", 2, 7, Settings::empty()).expect("configure");

    let first = cal.get_bias().expect("bias");
    let b1 = Arc::clone(first.artifact().expect("bias ready"));
    assert_eq!(first.origin(), Some(Origin::Built));
    assert_eq!(counters.of(ArtifactTag::Bias).loads(), 1);
    assert_eq!(counters.of(ArtifactTag::Bias).builds(), 1);
    assert_eq!(cal.cached_tags("setupX").len(), 1);

    let second = cal.get_bias().expect("bias again");
    assert!(Arc::ptr_eq(second.artifact().expect("ready"), &b1));
    assert_eq!(second.origin(), Some(Origin::Cache));
    assert_eq!(counters.of(ArtifactTag::Bias).loads(), 1);
    assert_eq!(counters.of(ArtifactTag::Bias).builds(), 1);

    let arc = cal.get_arc().expect("arc");
    let arc = arc.artifact().expect("arc ready");
    assert_eq!(arc.payload["inputs"], json!([["Bias", b1.hash.clone()]]));
    assert!(cal.is_cached(ArtifactTag::Arc));

    cal.configure("setupY", 2, 7, Settings::empty()).expect("configure Y");
    let bpm = cal.get_bad_pixel_mask().expect("no error");
    let missing = bpm.unavailable().expect("unavailable");
    assert_eq!(missing.missing, ArtifactTag::Arc);
    assert_eq!(missing.accessor, "get_arc");
    assert_eq!(prerequisite_warnings(&cal), vec![(ArtifactTag::BadPixelMask, ArtifactTag::Arc)]);
    assert!(cal.cached_tags("setupY").is_empty());
    assert_eq!(counters.of(ArtifactTag::BadPixelMask).builds(), 0);
}

#[test]
fn accessors_before_configure_fail_and_store_nothing() {
    let (cal, counters) = orchestrator();
    for outcome in [cal.get_bias(),
                    cal.get_arc(),
                    cal.get_bad_pixel_mask(),
                    cal.get_pixel_location_map(),
                    cal.get_slit_geometry(),
                    cal.get_wavelength_calibration(),
                    cal.get_tilt_map(),
                    cal.get_normalized_flat()]
    {
        assert!(matches!(outcome, Err(CalibError::Configuration(_))));
    }
    assert!(cal.summary().configurations.is_empty());
    assert_eq!(counters.of(ArtifactTag::Bias).loads(), 0);
    assert!(cal.events().is_empty());
    assert!(cal.run_full_calibration().is_err());
}

#[test]
fn configure_rejects_unset_fields() {
    let (mut cal, _) = orchestrator();
    assert!(matches!(cal.configure("", 1, 7, Settings::empty()), Err(CalibError::Configuration(_))));
    assert!(matches!(cal.configure("setupX", 0, 7, Settings::empty()), Err(CalibError::Configuration(_))));
    assert!(cal.scope().is_none());
}

#[test]
fn slits_before_bad_pixel_mask_warns_exactly_once() {
    let (mut cal, counters) = orchestrator();
    cal.configure("setupX", 1, 7, Settings::empty()).expect("configure");
    cal.get_bias().expect("bias");
    cal.get_arc().expect("arc");

    let slits = cal.get_slit_geometry().expect("no error");
    assert_eq!(slits.unavailable().map(|u| u.missing), Some(ArtifactTag::BadPixelMask));
    assert_eq!(prerequisite_warnings(&cal), vec![(ArtifactTag::SlitGeometry, ArtifactTag::BadPixelMask)]);
    assert!(!cal.is_cached(ArtifactTag::SlitGeometry));
    assert_eq!(counters.of(ArtifactTag::SlitGeometry).loads(), 0);
    assert!(cal.mask().is_none());
}

#[test]
fn scope_isolation_between_configurations() {
    let (mut cal, counters) = orchestrator();
    cal.configure("setupX", 1, 7, Settings::empty()).expect("configure");
    cal.get_bias().expect("bias X");

    cal.configure("setupY", 1, 7, Settings::empty()).expect("configure");
    let arc = cal.get_arc().expect("no error");
    assert_eq!(arc.unavailable().map(|u| u.missing), Some(ArtifactTag::Bias));
    assert!(!cal.is_cached(ArtifactTag::Bias));

    cal.get_bias().expect("bias Y");
    assert_eq!(counters.of(ArtifactTag::Bias).builds(), 2);

    // volver a setupX reutiliza el bucket anterior
    cal.configure("setupX", 3, 7, Settings::empty()).expect("configure");
    assert_eq!(cal.get_bias().expect("bias X again").origin(), Some(Origin::Cache));
    assert_eq!(counters.of(ArtifactTag::Bias).builds(), 2);

    let summary = cal.summary();
    assert_eq!(summary.configurations.len(), 2);
    let x = summary.bucket("setupX").expect("X");
    let y = summary.bucket("setupY").expect("Y");
    assert_ne!(x.artifacts[0].hash, y.artifacts[0].hash);
}

#[test]
fn full_calibration_runs_hard_chain_in_order() {
    let (mut cal, counters) = orchestrator();
    cal.configure("setupX", 1, 7, Settings::empty()).expect("configure");
    let report = cal.run_full_calibration().expect("full");
    assert!(report.is_complete(&calib_core::engine::FULL_CHAIN));
    assert!(report.stopped_at().is_none());

    let bpm = report.get(ArtifactTag::BadPixelMask).and_then(Resolved::artifact).expect("bpm");
    assert_eq!(bpm.payload["binning"], json!("2,1"));
    assert_eq!(bpm.payload["files"], json!(["setupx_sci1.fits"]));
    assert_eq!(counters.of(ArtifactTag::SlitGeometry).loads(), 0);

    let names = event_names(&cal);
    assert_eq!(names, vec!["configured", "built", "built", "built", "built"]);

    let again = cal.run_full_calibration().expect("full again");
    assert!(again.stages.iter().all(|(_, r)| r.origin() == Some(Origin::Cache)));
}

#[test]
fn bias_without_raw_frames_is_a_build_error() {
    let (mut cal, _) = orchestrator();
    cal.configure("setupZ", 1, 7, Settings::empty()).expect("configure");
    let err = cal.get_bias().expect_err("no frames");
    assert_eq!(err.to_string(), "building Bias failed: no raw bias frames available for this scope");
    assert!(cal.events().iter().any(|e| matches!(e.kind, CalibEventKind::BuildFailed { .. })));
    assert!(!cal.is_cached(ArtifactTag::Bias));
}

#[test]
fn detector_scoped_artifacts_do_not_collide() {
    let (mut cal, counters) = orchestrator();
    cal.configure("setupX", 1, 7, Settings::empty()).expect("configure det1");
    cal.run_full_calibration().expect("det1");

    cal.configure("setupX", 2, 7, Settings::empty()).expect("configure det2");
    let report = cal.run_full_calibration().expect("det2");
    assert_eq!(report.get(ArtifactTag::Bias).and_then(Resolved::origin), Some(Origin::Cache));
    assert_eq!(report.get(ArtifactTag::Arc).and_then(Resolved::origin), Some(Origin::Cache));
    assert_eq!(report.get(ArtifactTag::BadPixelMask).and_then(Resolved::origin), Some(Origin::Built));
    assert_eq!(counters.of(ArtifactTag::BadPixelMask).builds(), 2);
    assert_eq!(counters.of(ArtifactTag::PixelLocationMap).builds(), 2);

    let keys = cal.cached_tags("setupX");
    assert!(keys.iter().any(|k| k.tag == ArtifactTag::BadPixelMask && k.detector == Some(1)));
    assert!(keys.iter().any(|k| k.tag == ArtifactTag::BadPixelMask && k.detector == Some(2)));
    assert_eq!(keys.len(), 6);
}

#[test]
fn settings_subset_changes_fingerprint_not_cache_identity() {
    let (mut cal, _) = orchestrator();
    let mut doc = SettingsDoc::new();
    doc.set("trace slits number", json!(6));
    cal.configure("setupX", 1, 7, doc.freeze()).expect("configure");
    cal.run_full_calibration().expect("full");
    let slits = cal.get_slit_geometry().expect("slits");
    assert_eq!(slits.mask().map(|m| m.len()), Some(6));

    let fingerprints: Vec<String> = cal.events()
                                       .iter()
                                       .filter_map(|e| match &e.kind {
                                           CalibEventKind::Built { fingerprint, .. } => Some(fingerprint.clone()),
                                           _ => None,
                                       })
                                       .collect();
    assert_eq!(fingerprints.len(), 5);
    let mut unique = fingerprints.clone();
    unique.sort();
    unique.dedup();
    assert_eq!(unique.len(), 5);
}
