//! Constantes del motor de calibraciones.
//!
//! `ENGINE_VERSION` forma parte del input del fingerprint de cada artifact
//! persistido: un cambio de versión invalida los masters guardados aunque el
//! scope, los settings y los archivos crudos no cambien.

/// Versión lógica del orquestador. Mantener estable mientras no haya cambios
/// incompatibles en el cálculo de fingerprints o en el contrato de builders.
pub const ENGINE_VERSION: &str = "C1.0";

/// Nombre del campo con la versión de esquema dentro del payload tipado.
pub const SCHEMA_VERSION_FIELD: &str = "schema_version";
