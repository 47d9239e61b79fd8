//! Errores del store de masters.
//! Mapea errores de IO / serde a variantes semánticas y luego al
//! `PersistError` que entiende el core.

use std::io;
use std::path::PathBuf;

use calib_core::PersistError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error at {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("corrupt master at {path}: {reason}")]
    Corrupt { path: PathBuf, reason: String },
    #[error("fingerprint {fingerprint} already persisted with different content")]
    Conflict { fingerprint: String },
}

impl StoreError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io { path: path.into(),
                   source }
    }

    /// Errores de IO transitorios (recomendado reintentar con backoff).
    pub fn is_retryable(&self) -> bool {
        match self {
            StoreError::Io { source, .. } => matches!(source.kind(),
                                                      io::ErrorKind::Interrupted
                                                      | io::ErrorKind::WouldBlock
                                                      | io::ErrorKind::TimedOut),
            _ => false,
        }
    }
}

impl From<StoreError> for PersistError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Io { path, source } => PersistError::Io(format!("{}: {source}", path.display())),
            StoreError::Serialize(e) => PersistError::Serialize(e.to_string()),
            StoreError::Corrupt { path, reason } => PersistError::Io(format!("{}: {reason}", path.display())),
            StoreError::Conflict { fingerprint } => PersistError::Conflict { fingerprint },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_maps_to_core_conflict() {
        let e: PersistError = StoreError::Conflict { fingerprint: "abc".into() }.into();
        assert_eq!(e, PersistError::Conflict { fingerprint: "abc".into() });
    }

    #[test]
    fn only_transient_io_is_retryable() {
        assert!(StoreError::io("x", io::Error::from(io::ErrorKind::Interrupted)).is_retryable());
        assert!(!StoreError::io("x", io::Error::from(io::ErrorKind::PermissionDenied)).is_retryable());
        assert!(!StoreError::Conflict { fingerprint: "f".into() }.is_retryable());
    }
}
