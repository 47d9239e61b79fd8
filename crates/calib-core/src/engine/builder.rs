//! Builder para `Calibrations`.
//!
//! Reúne tabla de exposiciones, builders de artifacts, event store y
//! (opcionalmente) un cache compartido antes de crear el orquestador.
//!
//! ```ignore
//! let mut cal = Calibrations::builder(exposures)
//!     .register(BiasBuilder)
//!     .register(ArcBuilder)
//!     .build();
//! cal.configure("setupA", 1, 1, settings)?;
//! ```

use std::sync::Arc;

use crate::builder::{Builder, BuilderRegistry};
use crate::cache::ArtifactCache;
use crate::engine::Calibrations;
use crate::event::EventStore;
use crate::exposure::ExposureTable;

pub struct CalibrationsBuilder<E: EventStore> {
    exposures: Arc<dyn ExposureTable>,
    registry: BuilderRegistry,
    events: Arc<E>,
    cache: Option<Arc<ArtifactCache>>,
}

impl CalibrationsBuilder<crate::event::InMemoryEventStore> {
    pub fn new(exposures: Arc<dyn ExposureTable>) -> Self {
        Self { exposures,
               registry: BuilderRegistry::new(),
               events: Arc::new(crate::event::InMemoryEventStore::new()),
               cache: None }
    }
}

impl<E: EventStore> CalibrationsBuilder<E> {
    /// Registra el builder de un tag (reemplaza uno previo del mismo tag).
    #[inline]
    pub fn register<B: Builder + 'static>(mut self, builder: B) -> Self {
        self.registry.register(builder);
        self
    }

    pub fn register_arc(mut self, builder: Arc<dyn Builder>) -> Self {
        self.registry.register_arc(builder);
        self
    }

    /// Sustituye el registro completo.
    pub fn registry(mut self, registry: BuilderRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Cambia el event store (p.ej. uno compartido con otro componente).
    pub fn event_store<E2: EventStore>(self, events: Arc<E2>) -> CalibrationsBuilder<E2> {
        CalibrationsBuilder { exposures: self.exposures,
                              registry: self.registry,
                              events,
                              cache: self.cache }
    }

    /// Reutiliza un cache existente en vez de crear uno vacío.
    pub fn cache(mut self, cache: Arc<ArtifactCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn build(self) -> Calibrations<E> {
        Calibrations { cache: self.cache.unwrap_or_default(),
                       builders: Arc::new(self.registry),
                       exposures: self.exposures,
                       events: self.events,
                       scope: None }
    }
}
