//! Configuración del store desde variables de entorno.
//! `CALIB_MASTER_DIR` (directorio raíz) y `CALIB_MASTER_REUSE` (cargar
//! masters existentes, por defecto `true`).

use std::env;
use std::path::PathBuf;

use dotenvy::dotenv;
use once_cell::sync::Lazy;

// Carga perezosa del archivo .env una sola vez.
static DOTENV_LOADED: Lazy<()> = Lazy::new(|| {
    let _ = dotenv(); // ignora error si no existe .env
});

pub const DEFAULT_MASTER_DIR: &str = "MasterFrames";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub root: PathBuf,
    pub reuse: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { root: PathBuf::from(DEFAULT_MASTER_DIR),
               reuse: true }
    }
}

impl StoreConfig {
    pub fn from_env() -> Self {
        Lazy::force(&DOTENV_LOADED);
        let root = env::var("CALIB_MASTER_DIR").map(PathBuf::from)
                                               .unwrap_or_else(|_| PathBuf::from(DEFAULT_MASTER_DIR));
        let reuse = env::var("CALIB_MASTER_REUSE").ok()
                                                  .and_then(|v| calib_core::settings::parse::parse_bool(&v))
                                                  .unwrap_or(true);
        Self { root, reuse }
    }

    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into(),
               ..Self::default() }
    }
}

/// Forzar carga temprana de .env desde aplicaciones externas si se desea.
pub fn init_dotenv() {
    Lazy::force(&DOTENV_LOADED);
}
