//! Adaptador que agrega persistencia a un builder de cómputo puro.
//!
//! `load` consulta el store por fingerprint (si `masters.reuse` lo permite) y
//! `persist` escribe el master recién construido. Un master corrupto se
//! reporta con `warn!` y se trata como ausente: el core reconstruye.

use std::sync::Arc;

use calib_core::{ArtifactTag, BuildContext, BuildError, BuildOutput, Builder, PersistError, Settings};
use chrono::Utc;
use log::{info, warn};
use serde_json::Value;

use crate::fs::{FsArtifactStore, PutOutcome, StoredMaster};

pub struct StoreBacked<B: Builder> {
    inner: B,
    store: Arc<FsArtifactStore>,
    reuse: bool,
    keep_loaded_mask: bool,
}

impl<B: Builder> StoreBacked<B> {
    pub fn new(inner: B, store: Arc<FsArtifactStore>) -> Self {
        // Un tilt map cargado no aporta máscara; wavecalib sí la conserva.
        let keep_loaded_mask = inner.tag() != ArtifactTag::TiltMap;
        Self { inner,
               store,
               reuse: true,
               keep_loaded_mask }
    }

    /// Valor por defecto de `masters.reuse` cuando el settings no lo fija.
    pub fn with_reuse(mut self, reuse: bool) -> Self {
        self.reuse = reuse;
        self
    }

    pub fn inner(&self) -> &B {
        &self.inner
    }

    fn reuse_enabled(&self, settings: &Settings) -> bool {
        settings.bool_or("masters.reuse", self.reuse)
    }
}

impl<B: Builder> Builder for StoreBacked<B> {
    fn tag(&self) -> ArtifactTag {
        self.inner.tag()
    }

    fn settings_subset(&self, settings: &Settings) -> Value {
        self.inner.settings_subset(settings)
    }

    fn load(&self, ctx: &BuildContext<'_>) -> Result<Option<BuildOutput>, BuildError> {
        if self.reuse_enabled(ctx.settings) {
            match self.store.get(self.tag(), ctx.fingerprint) {
                Ok(Some(master)) => {
                    info!("loaded master {} for {} from {}",
                          self.tag(),
                          ctx.scope,
                          self.store.path_for(self.tag(), ctx.fingerprint).display());
                    let mut out = BuildOutput::new(master.artifact);
                    out.companions = master.companions;
                    out.slit_count = master.slit_count;
                    if self.keep_loaded_mask {
                        out.mask = master.mask;
                    }
                    return Ok(Some(out));
                }
                Ok(None) => {}
                Err(e) => warn!("ignoring unreadable master for {}: {e}", self.tag()),
            }
        }
        self.inner.load(ctx)
    }

    fn build(&self, ctx: &BuildContext<'_>) -> Result<BuildOutput, BuildError> {
        self.inner.build(ctx)
    }

    fn persist(&self, ctx: &BuildContext<'_>, output: &BuildOutput) -> Result<bool, PersistError> {
        let master = StoredMaster { fingerprint: ctx.fingerprint.to_string(),
                                    scope: ctx.scope.clone(),
                                    artifact: output.artifact.clone(),
                                    companions: output.companions.clone(),
                                    mask: output.mask.clone(),
                                    slit_count: output.slit_count,
                                    created_at: Utc::now() };
        match self.store.put(&master)? {
            PutOutcome::Written => Ok(true),
            PutOutcome::Unchanged => Ok(false),
        }
    }
}
