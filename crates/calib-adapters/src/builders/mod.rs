//! Builders de referencia, uno por etapa.

mod frames;
mod geometry;
mod solutions;

pub use frames::{ArcBuilder, BiasBuilder, FlatBuilder};
pub use geometry::{BadPixelMaskBuilder, PixelLocationBuilder, SlitTraceBuilder};
pub use solutions::{TiltBuilder, WaveCalibBuilder};

use std::sync::Arc;

use calib_core::model::ArtifactSpec;
use calib_core::{Artifact, BuildError, Builder, BuilderRegistry};
use calib_persistence::{FsArtifactStore, StoreBacked};

/// Registro con los ocho builders de cómputo (sin persistencia).
pub fn standard_registry() -> BuilderRegistry {
    let mut reg = BuilderRegistry::new();
    reg.register(BiasBuilder);
    reg.register(ArcBuilder);
    reg.register(BadPixelMaskBuilder);
    reg.register(PixelLocationBuilder);
    reg.register(SlitTraceBuilder);
    reg.register(WaveCalibBuilder);
    reg.register(TiltBuilder);
    reg.register(FlatBuilder);
    reg
}

/// Igual que `standard_registry` pero cada builder carga/persiste masters en
/// `store`. `reuse` es el valor por defecto de `masters.reuse`.
pub fn store_backed_registry(store: Arc<FsArtifactStore>, reuse: bool) -> BuilderRegistry {
    fn wrap<B: Builder + 'static>(reg: &mut BuilderRegistry, b: B, store: &Arc<FsArtifactStore>, reuse: bool) {
        reg.register(StoreBacked::new(b, Arc::clone(store)).with_reuse(reuse));
    }
    let mut reg = BuilderRegistry::new();
    wrap(&mut reg, BiasBuilder, &store, reuse);
    wrap(&mut reg, ArcBuilder, &store, reuse);
    wrap(&mut reg, BadPixelMaskBuilder, &store, reuse);
    wrap(&mut reg, PixelLocationBuilder, &store, reuse);
    wrap(&mut reg, SlitTraceBuilder, &store, reuse);
    wrap(&mut reg, WaveCalibBuilder, &store, reuse);
    wrap(&mut reg, TiltBuilder, &store, reuse);
    wrap(&mut reg, FlatBuilder, &store, reuse);
    reg
}

pub(crate) fn encode<T: ArtifactSpec>(payload: T) -> Result<Artifact, BuildError> {
    payload.into_artifact().map_err(|e| BuildError::Failed(e.to_string()))
}

pub(crate) fn decode<T: ArtifactSpec>(artifact: &Artifact) -> Result<T, BuildError> {
    T::from_artifact(artifact).map_err(|e| BuildError::InvalidInput(e.to_string()))
}
