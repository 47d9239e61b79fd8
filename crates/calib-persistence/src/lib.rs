//! calib-persistence
//!
//! Store de "masters" en sistema de archivos: un JSON por fingerprint,
//! read-many/write-once. `StoreBacked` envuelve cualquier builder de cómputo
//! puro y le agrega `load`/`persist` contra el store.
//!
//! Módulos:
//! - `config`: carga de configuración desde .env / entorno.
//! - `error`: errores del store y su traducción a `PersistError`.
//! - `fs`: implementación `FsArtifactStore`.
//! - `backed`: adaptador `StoreBacked<B>`.

pub mod backed;
pub mod config;
pub mod error;
pub mod fs;

pub use backed::StoreBacked;
pub use config::{init_dotenv, StoreConfig};
pub use error::StoreError;
pub use fs::{FsArtifactStore, PutOutcome, StoredMaster};
