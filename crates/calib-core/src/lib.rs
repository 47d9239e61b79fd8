//! calib-core: orquestación y cache de productos de calibración.
//!
//! Dado un scope (configuración, detector, grupo de exposición) el
//! orquestador produce cada artifact a lo sumo una vez, reutiliza el cache
//! en memoria o el store externo de los builders, verifica prerequisitos
//! antes de construir y acumula la máscara de slits excluidos.
pub mod builder;
pub mod cache;
pub mod constants;
pub mod engine;
pub mod errors;
pub mod event;
pub mod exposure;
pub mod hashing;
pub mod mask;
pub mod model;
pub mod settings;

pub use builder::{BuildContext, BuildOutput, Builder, BuilderRegistry, Prerequisites, RawInputs};
pub use cache::{ArtifactCache, CacheKey};
pub use engine::{CalibSummary, Calibrations, CalibrationsBuilder, Origin, PipelineReport, Ready, Resolved,
                 SkipReason, Supplied, Unavailable};
pub use errors::{BuildError, CalibError, PersistError};
pub use event::{CalibEvent, CalibEventKind, EventStore, InMemoryEventStore};
pub use exposure::{Binning, ExposureRow, ExposureTable, FrameType, InMemoryExposureTable};
pub use mask::{MaskAccumulator, MaskVector};
pub use model::{Artifact, ArtifactCodecError, ArtifactSpec, ArtifactTag, Scope, ScopeKey};
pub use settings::{Settings, SettingsDoc, SettingsError, SettingsRegistry, WavelengthMode};
