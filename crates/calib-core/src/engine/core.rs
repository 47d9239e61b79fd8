//! Orquestador de calibraciones.
//!
//! Decide para cada artifact si reutilizar el cache, cargar del store externo
//! (vía builder) o construir. Las operaciones dentro de una configuración se
//! serializan con el lock de su bucket; configuraciones distintas avanzan en
//! paralelo sin coordinación.

use std::sync::Arc;

use log::{debug, error, info, warn};

use crate::builder::{BuildContext, BuildOutput, BuilderRegistry, Prerequisites, RawInputs};
use crate::cache::{ArtifactCache, Bucket, CacheKey};
use crate::engine::graph::{self, RawRole, Stage, FULL_CHAIN, TRACE_CHAIN};
use crate::engine::outcome::{Origin, PipelineReport, Ready, Resolved, SkipReason, Supplied, Unavailable};
use crate::engine::summary::{BucketSummary, CachedEntry, CalibSummary, MaskSummary};
use crate::engine::CalibrationsBuilder;
use crate::errors::{BuildError, CalibError};
use crate::event::{CalibEvent, CalibEventKind, EventStore, InMemoryEventStore};
use crate::exposure::ExposureTable;
use crate::mask::MaskVector;
use crate::model::{Artifact, ArtifactFingerprintInput, ArtifactTag, Scope, ScopeKey};
use crate::settings::Settings;

/// Orquestador público: un accessor por tipo de artifact.
pub struct Calibrations<E: EventStore = InMemoryEventStore> {
    pub(crate) cache: Arc<ArtifactCache>,
    pub(crate) builders: Arc<BuilderRegistry>,
    pub(crate) exposures: Arc<dyn ExposureTable>,
    pub(crate) events: Arc<E>,
    pub(crate) scope: Option<Scope>,
}

impl Calibrations<InMemoryEventStore> {
    /// Builder con event store en memoria.
    pub fn builder<T: ExposureTable + 'static>(exposures: T) -> CalibrationsBuilder<InMemoryEventStore> {
        CalibrationsBuilder::new(Arc::new(exposures))
    }
}

impl<E: EventStore> Calibrations<E> {
    /// Fija el scope activo. No limpia buckets de configuraciones previas.
    pub fn configure(&mut self,
                     configuration: impl Into<String>,
                     detector: u32,
                     exposure_group: u32,
                     settings: Settings)
                     -> Result<(), CalibError> {
        let key = ScopeKey::new(configuration, detector, exposure_group);
        if let Err(e) = key.validate() {
            error!("configure rejected: {e}");
            return Err(e);
        }
        info!("configured scope {key}");
        self.events.append_kind(&key.configuration, CalibEventKind::Configured { scope: key.clone() });
        self.scope = Some(Scope::new(key, settings));
        Ok(())
    }

    pub fn scope(&self) -> Option<&Scope> {
        self.scope.as_ref()
    }

    /// Otro handle sobre el mismo cache, builders, tabla y log, con su propio
    /// scope activo (copiado del actual). Pensado para workers paralelos.
    pub fn fork(&self) -> Self {
        Self { cache: Arc::clone(&self.cache),
               builders: Arc::clone(&self.builders),
               exposures: Arc::clone(&self.exposures),
               events: Arc::clone(&self.events),
               scope: self.scope.clone() }
    }

    pub fn get_bias(&self) -> Result<Resolved, CalibError> {
        self.resolve(ArtifactTag::Bias, &Supplied::none())
    }

    pub fn get_arc(&self) -> Result<Resolved, CalibError> {
        self.resolve(ArtifactTag::Arc, &Supplied::none())
    }

    pub fn get_bad_pixel_mask(&self) -> Result<Resolved, CalibError> {
        self.resolve(ArtifactTag::BadPixelMask, &Supplied::none())
    }

    pub fn get_pixel_location_map(&self) -> Result<Resolved, CalibError> {
        self.resolve(ArtifactTag::PixelLocationMap, &Supplied::none())
    }

    pub fn get_slit_geometry(&self) -> Result<Resolved, CalibError> {
        self.resolve(ArtifactTag::SlitGeometry, &Supplied::none())
    }

    pub fn get_wavelength_calibration(&self) -> Result<Resolved, CalibError> {
        self.resolve(ArtifactTag::WavelengthCalibration, &Supplied::none())
    }

    pub fn get_tilt_map(&self) -> Result<Resolved, CalibError> {
        self.resolve(ArtifactTag::TiltMap, &Supplied::none())
    }

    /// Flat normalizado; `companion` lleva el SlitProfile.
    pub fn get_normalized_flat(&self) -> Result<Resolved, CalibError> {
        self.resolve(ArtifactTag::NormalizedFlat, &Supplied::none())
    }

    /// Accessor genérico con overrides explícitos de prerequisitos.
    pub fn resolve(&self, tag: ArtifactTag, supplied: &Supplied) -> Result<Resolved, CalibError> {
        if tag == ArtifactTag::SlitProfile {
            let flat = self.resolve(ArtifactTag::NormalizedFlat, supplied)?;
            return Ok(match flat {
                Resolved::Ready(r) => match r.companion {
                    Some(profile) => Resolved::Ready(Ready { artifact: profile,
                                                             companion: Some(r.artifact),
                                                             mask: r.mask,
                                                             origin: r.origin }),
                    None => Resolved::Unavailable(Unavailable { requested: ArtifactTag::SlitProfile,
                                                                missing: ArtifactTag::SlitProfile,
                                                                accessor: tag.accessor().to_string() }),
                },
                other => other,
            });
        }

        let scope = self.active()?;
        let key = &scope.key;
        let cfg = key.configuration.as_str();

        if let Some(reason) = Self::policy_skip(tag, &scope.settings) {
            info!("{}: skipped for {key} ({reason:?})", tag.accessor());
            self.events.append_kind(cfg, CalibEventKind::Skipped { tag, reason });
            return Ok(Resolved::Skipped(reason));
        }

        let stage = graph::stage(tag);
        let bucket = self.cache.bucket(cfg);
        let mut guard = bucket.lock();

        let prerequisites = match self.collect_prerequisites(stage, key, &guard, supplied) {
            Ok(p) => p,
            Err(missing) => return Ok(Resolved::Unavailable(missing)),
        };

        let cache_key = CacheKey::for_scope(tag, key);
        if let Some(hit) = guard.get(&cache_key) {
            debug!("{}: cache hit for {key}", tag.accessor());
            self.events.append_kind(cfg, CalibEventKind::CacheHit { tag, detector: cache_key.detector });
            let companion = companion_of(tag).and_then(|c| guard.get(&CacheKey::for_scope(c, key)));
            let mask = if stage.affects_mask { guard.mask(key.detector).cloned() } else { None };
            return Ok(Resolved::Ready(Ready { artifact: hit,
                                              companion,
                                              mask,
                                              origin: Origin::Cache }));
        }

        let builder = self.builders.get(tag).ok_or(CalibError::UnknownBuilder(tag))?;
        let raw = self.raw_inputs(key, stage.raw);
        let subset = builder.settings_subset(&scope.settings);
        let fingerprint = ArtifactFingerprintInput::new(tag,
                                                        cfg,
                                                        cache_key.detector,
                                                        key.exposure_group,
                                                        &subset).with_raw_files(raw.files.iter().cloned())
                                                                .with_prerequisites(prerequisites.hashes())
                                                                .fingerprint();
        debug!("{}: fingerprint {fingerprint} for {key}", tag.accessor());
        let current_mask = guard.mask(key.detector).cloned();
        let ctx = BuildContext { scope: key,
                                 settings: &scope.settings,
                                 prerequisites: &prerequisites,
                                 raw: &raw,
                                 mask: current_mask.as_ref(),
                                 fingerprint: &fingerprint };

        let (mut output, origin) = match self.load_or_build(builder.as_ref(), &ctx, tag) {
            Ok(v) => v,
            Err(source) => {
                error!("{}: building {tag} for {key} failed: {source}", tag.accessor());
                self.events.append_kind(cfg, CalibEventKind::BuildFailed { tag, error: source.to_string() });
                return Err(CalibError::Build { tag, source });
            }
        };

        // Validar forma de la máscara antes de guardar nada.
        let slit_count = match tag {
            ArtifactTag::SlitGeometry => output.slit_count,
            _ => current_mask.as_ref().map(MaskVector::len),
        };
        if let (Some(expected), Some(incoming)) = (slit_count, output.mask.as_ref()) {
            if incoming.len() != expected {
                error!("{}: mask of {} slits does not match geometry of {expected}", tag.accessor(), incoming.len());
                return Err(CalibError::ShapeMismatch { expected, found: incoming.len() });
            }
        }

        seal_all(&mut output);
        let persisted = match origin {
            Origin::Built => Some(builder.persist(&ctx, &output)),
            _ => None,
        };

        match origin {
            Origin::Store => {
                info!("{}: loaded {tag} for {key} from store", tag.accessor());
                self.events.append_kind(cfg,
                                        CalibEventKind::LoadedFromStore { tag,
                                                                          detector: cache_key.detector,
                                                                          fingerprint: fingerprint.clone() });
            }
            _ => {
                info!("{}: built {tag} for {key}", tag.accessor());
                self.events.append_kind(cfg,
                                        CalibEventKind::Built { tag,
                                                                detector: cache_key.detector,
                                                                fingerprint: fingerprint.clone(),
                                                                artifact_hash: output.artifact.hash.clone() });
            }
        }

        let BuildOutput { artifact,
                          mask: incoming_mask,
                          companions,
                          .. } = output;
        let stored = guard.insert(cache_key, artifact);
        let mut companion = None;
        for c in companions {
            let ckey = CacheKey::for_scope(c.tag, key);
            let stored_c = guard.insert(ckey, c);
            companion.get_or_insert(stored_c);
        }

        let mask = self.update_mask(&mut guard, tag, key, slit_count, incoming_mask)?;
        drop(guard);

        match persisted {
            Some(Err(source)) => {
                error!("{}: persisting {tag} for {key} failed: {source}", tag.accessor());
                self.events.append_kind(cfg,
                                        CalibEventKind::PersistFailed { tag,
                                                                        fingerprint,
                                                                        error: source.to_string() });
                return Err(CalibError::Persistence { tag, source });
            }
            Some(Ok(true)) => {
                self.events.append_kind(cfg, CalibEventKind::Persisted { tag, fingerprint });
            }
            _ => {}
        }

        Ok(Resolved::Ready(Ready { artifact: stored,
                                   companion,
                                   mask: if stage.affects_mask { mask } else { None },
                                   origin }))
    }

    /// Cadena bias → arc → bpm → pixlocn. Se detiene en la primera etapa que
    /// no quede lista.
    pub fn run_full_calibration(&self) -> Result<PipelineReport, CalibError> {
        self.run_chain(&FULL_CHAIN)
    }

    /// Cadena slits → wavecalib → tilts → flat, una vez que hay frames de
    /// traza disponibles.
    pub fn run_trace_calibration(&self) -> Result<PipelineReport, CalibError> {
        self.run_chain(&TRACE_CHAIN)
    }

    fn run_chain(&self, chain: &[ArtifactTag]) -> Result<PipelineReport, CalibError> {
        let mut report = PipelineReport::default();
        for tag in chain {
            let outcome = self.resolve(*tag, &Supplied::none())?;
            let stop = !outcome.is_ready();
            report.stages.push((*tag, outcome));
            if stop {
                break;
            }
        }
        Ok(report)
    }

    /// Descarta artifacts y máscaras de una configuración.
    pub fn reset_configuration(&self, configuration: &str) -> bool {
        let removed = self.cache.remove(configuration);
        if removed {
            info!("reset configuration {configuration}");
            self.events.append_kind(configuration,
                                    CalibEventKind::ScopeReset { configuration: configuration.to_string() });
        }
        removed
    }

    /// ¿Hay un artifact `tag` en cache para el scope activo?
    pub fn is_cached(&self, tag: ArtifactTag) -> bool {
        let Some(scope) = self.scope.as_ref() else { return false };
        self.cache
            .peek(&scope.key.configuration)
            .map(|b| b.lock().contains(&CacheKey::for_scope(tag, &scope.key)))
            .unwrap_or(false)
    }

    pub fn cached_tags(&self, configuration: &str) -> Vec<CacheKey> {
        self.cache.peek(configuration).map(|b| b.lock().keys()).unwrap_or_default()
    }

    /// Máscara actual del detector activo.
    pub fn mask(&self) -> Option<MaskVector> {
        let scope = self.scope.as_ref()?;
        let bucket = self.cache.peek(&scope.key.configuration)?;
        let guard = bucket.lock();
        guard.mask(scope.key.detector).cloned()
    }

    pub fn summary(&self) -> CalibSummary {
        let mut configurations = Vec::new();
        for cfg in self.cache.configurations() {
            let Some(bucket) = self.cache.peek(&cfg) else { continue };
            let guard = bucket.lock();
            let artifacts = guard.keys()
                                 .into_iter()
                                 .filter_map(|k| {
                                     guard.get(&k).map(|a| CachedEntry { tag: k.tag,
                                                                         detector: k.detector,
                                                                         hash: a.hash.clone() })
                                 })
                                 .collect();
            let masks = guard.mask_detectors()
                             .into_iter()
                             .filter_map(|d| {
                                 guard.mask(d).map(|m| MaskSummary { detector: d,
                                                                     slit_count: m.len(),
                                                                     excluded: m.excluded(),
                                                                     resets: guard.mask_resets(d) })
                             })
                             .collect();
            configurations.push(BucketSummary { configuration: cfg, artifacts, masks });
        }
        CalibSummary { active: self.scope.as_ref().map(|s| s.key.clone()),
                       configurations }
    }

    pub fn events(&self) -> Vec<CalibEvent> {
        self.events.list()
    }

    pub fn event_store(&self) -> &E {
        &self.events
    }

    pub fn builders(&self) -> &BuilderRegistry {
        &self.builders
    }

    fn active(&self) -> Result<&Scope, CalibError> {
        self.scope.as_ref().ok_or_else(|| {
                               error!("artifact requested before configure()");
                               CalibError::Configuration("no scope configured; call configure() first".into())
                           })
    }

    fn policy_skip(tag: ArtifactTag, settings: &Settings) -> Option<SkipReason> {
        match tag {
            ArtifactTag::NormalizedFlat if !settings.flat_fielding_enabled() => Some(SkipReason::FlatFieldingDisabled),
            ArtifactTag::WavelengthCalibration if settings.wavelength_mode().is_pixel() => {
                Some(SkipReason::WavelengthCalibrationDisabled)
            }
            _ => None,
        }
    }

    fn collect_prerequisites(&self,
                             stage: &Stage,
                             key: &ScopeKey,
                             bucket: &Bucket,
                             supplied: &Supplied)
                             -> Result<Prerequisites, Unavailable> {
        let mut out = Prerequisites::new();
        for req in stage.requires {
            let found = supplied.get(*req).or_else(|| bucket.get(&CacheKey::for_scope(*req, key)));
            match found {
                Some(a) => out.insert(a),
                None => {
                    warn!("{}: {req} is not available for {key}; run {} first",
                          stage.tag.accessor(),
                          req.accessor());
                    self.events.append_kind(&key.configuration,
                                            CalibEventKind::PrerequisiteMissing { requested: stage.tag,
                                                                                  missing: *req,
                                                                                  accessor: req.accessor()
                                                                                               .to_string() });
                    return Err(Unavailable { requested: stage.tag,
                                             missing: *req,
                                             accessor: req.accessor().to_string() });
                }
            }
        }
        for opt in stage.optional {
            if let Some(a) = supplied.get(*opt).or_else(|| bucket.get(&CacheKey::for_scope(*opt, key))) {
                out.insert(a);
            }
        }
        Ok(out)
    }

    fn raw_inputs(&self, key: &ScopeKey, role: RawRole) -> RawInputs {
        match role {
            RawRole::None => RawInputs::none(),
            RawRole::Files(frame) => {
                let rows = self.exposures.frames(key, frame);
                RawInputs { frame: Some(frame),
                            files: rows.iter().map(|r| r.filename.clone()).collect(),
                            representative: rows.into_iter().next() }
            }
            RawRole::Representative(frame) => {
                let rep = self.exposures.representative(key, frame);
                RawInputs { frame: Some(frame),
                            files: rep.iter().map(|r| r.filename.clone()).collect(),
                            representative: rep }
            }
        }
    }

    fn load_or_build(&self,
                     builder: &dyn crate::builder::Builder,
                     ctx: &BuildContext<'_>,
                     tag: ArtifactTag)
                     -> Result<(BuildOutput, Origin), BuildError> {
        let (output, origin) = match builder.load(ctx)? {
            Some(loaded) => (loaded, Origin::Store),
            None => (builder.build(ctx)?, Origin::Built),
        };
        if output.artifact.tag != tag {
            return Err(BuildError::InvalidInput(format!("builder for {tag} returned a {} artifact",
                                                        output.artifact.tag)));
        }
        if tag == ArtifactTag::SlitGeometry && output.slit_count.is_none() {
            return Err(BuildError::MissingSlitCount);
        }
        Ok((output, origin))
    }

    fn update_mask(&self,
                   bucket: &mut Bucket,
                   tag: ArtifactTag,
                   key: &ScopeKey,
                   slit_count: Option<usize>,
                   incoming: Option<MaskVector>)
                   -> Result<Option<MaskVector>, CalibError> {
        let cfg = key.configuration.as_str();
        if tag == ArtifactTag::SlitGeometry {
            if let Some(n) = slit_count {
                bucket.reset_mask(key.detector, n);
                debug!("mask reset to {n} slits for {key}");
                self.events.append_kind(cfg, CalibEventKind::MaskReset { detector: key.detector, slit_count: n });
            }
        }
        if let Some(m) = incoming {
            let merged = bucket.merge_mask(key.detector, &m)?;
            debug!("{}: mask now excludes {:?} for {key}", tag.accessor(), merged.excluded());
            self.events.append_kind(cfg,
                                    CalibEventKind::MaskMerged { tag,
                                                                 detector: key.detector,
                                                                 excluded: merged.excluded_count() });
        }
        Ok(bucket.mask(key.detector).cloned())
    }
}

impl<E: EventStore> std::fmt::Debug for Calibrations<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Calibrations")
         .field("scope", &self.scope.as_ref().map(|s| &s.key))
         .field("configurations", &self.cache.configurations())
         .field("builders", &self.builders)
         .finish()
    }
}

fn companion_of(tag: ArtifactTag) -> Option<ArtifactTag> {
    match tag {
        ArtifactTag::NormalizedFlat => Some(ArtifactTag::SlitProfile),
        _ => None,
    }
}

fn seal_all(output: &mut BuildOutput) {
    seal(&mut output.artifact);
    for c in output.companions.iter_mut() {
        seal(c);
    }
}

fn seal(artifact: &mut Artifact) {
    if !artifact.is_sealed() {
        artifact.seal();
    }
}
