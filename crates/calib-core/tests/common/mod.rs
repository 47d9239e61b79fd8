#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use calib_core::{Artifact, ArtifactTag, BuildContext, BuildError, BuildOutput, Builder, Binning, CalibEventKind,
                 Calibrations, ExposureRow, FrameType, InMemoryExposureTable, MaskVector};
use serde_json::{json, Value};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Contadores de invocaciones por builder.
#[derive(Debug, Default)]
pub struct Counter {
    pub loads: AtomicUsize,
    pub builds: AtomicUsize,
}

impl Counter {
    pub fn builds(&self) -> usize {
        self.builds.load(Ordering::SeqCst)
    }

    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

/// Builder determinista que cuenta llamadas. El payload refleja scope,
/// archivos crudos y hashes de prerequisitos.
pub struct Counting {
    pub tag: ArtifactTag,
    pub counter: Arc<Counter>,
    pub excluded: Vec<usize>,
    pub delay: Option<Duration>,
}

impl Counting {
    pub fn new(tag: ArtifactTag) -> (Self, Arc<Counter>) {
        let counter = Arc::new(Counter::default());
        (Self { tag,
                counter: Arc::clone(&counter),
                excluded: Vec::new(),
                delay: None },
         counter)
    }

    pub fn excluding(mut self, slits: &[usize]) -> Self {
        self.excluded = slits.to_vec();
        self
    }

    pub fn slow(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

impl Builder for Counting {
    fn tag(&self) -> ArtifactTag {
        self.tag
    }

    fn settings_subset(&self, settings: &calib_core::Settings) -> Value {
        json!({ "slits": settings.get("trace slits number").cloned().unwrap_or(Value::Null) })
    }

    fn load(&self, _ctx: &BuildContext<'_>) -> Result<Option<BuildOutput>, BuildError> {
        self.counter.loads.fetch_add(1, Ordering::SeqCst);
        Ok(None)
    }

    fn build(&self, ctx: &BuildContext<'_>) -> Result<BuildOutput, BuildError> {
        self.counter.builds.fetch_add(1, Ordering::SeqCst);
        if let Some(d) = self.delay {
            std::thread::sleep(d);
        }
        let binning = match self.tag {
            ArtifactTag::BadPixelMask => Some(ctx.raw.require_representative()?.binning.to_string()),
            _ => None,
        };
        let files = ctx.raw.require_files()?.to_vec();
        let payload = json!({
            "tag": self.tag.name(),
            "configuration": ctx.scope.configuration,
            "detector": ctx.scope.detector,
            "files": files,
            "binning": binning,
            "inputs": ctx.prerequisites.hashes(),
        });
        let mut out = BuildOutput::new(Artifact::new(self.tag, payload));
        if self.tag == ArtifactTag::SlitGeometry {
            let n = ctx.settings.i64("trace slits number").unwrap_or(4) as usize;
            out = out.with_slit_count(n);
        }
        if !self.excluded.is_empty() {
            let n = ctx.mask.map(MaskVector::len).unwrap_or(4);
            out = out.with_mask(MaskVector::with_excluded(n, &self.excluded));
        }
        if self.tag == ArtifactTag::NormalizedFlat {
            out = out.with_companion(Artifact::new(ArtifactTag::SlitProfile, json!({"profile": files})));
        }
        Ok(out)
    }
}

/// Tabla con dos setups (X e Y) y todos los tipos de frame.
pub fn exposure_table() -> InMemoryExposureTable {
    let mut rows = Vec::new();
    for cfg in ["setupX", "setupY"] {
        let p = cfg.to_lowercase();
        rows.push(ExposureRow::new(format!("{p}_bias1.fits"), cfg, FrameType::Bias, &[7]));
        rows.push(ExposureRow::new(format!("{p}_bias2.fits"), cfg, FrameType::Bias, &[7]));
        rows.push(ExposureRow::new(format!("{p}_arc1.fits"), cfg, FrameType::Arc, &[7]));
        rows.push(ExposureRow::new(format!("{p}_flat1.fits"), cfg, FrameType::Trace, &[7]).also(FrameType::PixelFlat));
        rows.push(ExposureRow::new(format!("{p}_sci1.fits"), cfg, FrameType::Science, &[7]).with_binning(Binning { spectral: 2,
                                                                                                                  spatial: 1 }));
    }
    InMemoryExposureTable::new(rows)
}

/// Un contador por tag, en el orden de `ArtifactTag::ALL` (sin SlitProfile).
pub struct Counters(pub Vec<(ArtifactTag, Arc<Counter>)>);

impl Counters {
    pub fn of(&self, tag: ArtifactTag) -> &Counter {
        self.0
            .iter()
            .find(|(t, _)| *t == tag)
            .map(|(_, c)| c.as_ref())
            .expect("counter registered")
    }
}

/// Orquestador con un `Counting` por etapa. Wavecalib excluye la slit 1 y
/// tilts la slit 3.
pub fn orchestrator() -> (Calibrations, Counters) {
    let mut builder = Calibrations::builder(exposure_table());
    let mut counters = Vec::new();
    for tag in ArtifactTag::ALL {
        if tag == ArtifactTag::SlitProfile {
            continue;
        }
        let (b, c) = Counting::new(tag);
        let b = match tag {
            ArtifactTag::WavelengthCalibration => b.excluding(&[1]),
            ArtifactTag::TiltMap => b.excluding(&[3]),
            _ => b,
        };
        builder = builder.register(b);
        counters.push((tag, c));
    }
    (builder.build(), Counters(counters))
}

pub fn event_names(cal: &Calibrations) -> Vec<&'static str> {
    cal.events().iter().map(|e| e.kind.name()).collect()
}

pub fn prerequisite_warnings(cal: &Calibrations) -> Vec<(ArtifactTag, ArtifactTag)> {
    cal.events()
       .iter()
       .filter_map(|e| match &e.kind {
           CalibEventKind::PrerequisiteMissing { requested, missing, .. } => Some((*requested, *missing)),
           _ => None,
       })
       .collect()
}
