//! Settings de ejecución.
//!
//! `Settings` es un documento JSON anidado e inmutable (compartido vía `Arc`)
//! que se construye una vez por unidad de trabajo y se pasa explícitamente al
//! orquestador y a los builders. El core lo trata como opaco salvo por los
//! flags que decide build-vs-skip (`reduce.flatfield.perform`,
//! `reduce.calibrate.wavelength`).

pub mod merge;
pub mod parse;
pub mod registry;

use std::sync::Arc;

use serde_json::{Map, Value};
use thiserror::Error;

pub use merge::merge_json;
pub use parse::load_list;
pub use registry::{normalize_path, SettingsRegistry, ValueKind};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SettingsError {
    #[error("unknown settings key: {0}")]
    UnknownKey(String),
    #[error("settings key {0} requires a value")]
    MissingValue(String),
    #[error("invalid value '{value}' for {key}: expected {expected}")]
    InvalidValue { key: String, value: String, expected: String },
    #[error("empty settings line")]
    EmptyLine,
}

/// Modo de calibración en longitud de onda.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WavelengthMode {
    /// Sin calibración: se trabaja en píxeles.
    Pixel,
    /// Solución ajustada en el marco indicado (air, vacuum...).
    Solution(String),
}

impl WavelengthMode {
    pub fn is_pixel(&self) -> bool {
        matches!(self, WavelengthMode::Pixel)
    }
}

/// Bundle inmutable de settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings(Arc<Value>);

impl Default for Settings {
    fn default() -> Self {
        Self::empty()
    }
}

impl Settings {
    pub fn new(value: Value) -> Self {
        Self(Arc::new(value))
    }

    pub fn empty() -> Self {
        Self::new(Value::Object(Map::new()))
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// Valor en una ruta punteada (`reduce.flatfield.perform`).
    pub fn get(&self, path: &str) -> Option<&Value> {
        let tokens = normalize_path(path);
        self.get_tokens(&tokens)
    }

    pub fn get_tokens<S: AsRef<str>>(&self, tokens: &[S]) -> Option<&Value> {
        let mut cur = self.0.as_ref();
        for t in tokens {
            cur = cur.get(t.as_ref())?;
        }
        Some(cur)
    }

    pub fn bool_or(&self, path: &str, default: bool) -> bool {
        self.get(path).and_then(Value::as_bool).unwrap_or(default)
    }

    pub fn f64_or(&self, path: &str, default: f64) -> f64 {
        self.get(path).and_then(Value::as_f64).unwrap_or(default)
    }

    pub fn i64(&self, path: &str) -> Option<i64> {
        self.get(path).and_then(Value::as_i64)
    }

    pub fn str(&self, path: &str) -> Option<&str> {
        self.get(path).and_then(Value::as_str)
    }

    /// `reduce.flatfield.perform` (por defecto habilitado).
    pub fn flat_fielding_enabled(&self) -> bool {
        self.bool_or("reduce.flatfield.perform", true)
    }

    /// `reduce.calibrate.wavelength`; ausente equivale a una solución en aire.
    pub fn wavelength_mode(&self) -> WavelengthMode {
        match self.str("reduce.calibrate.wavelength") {
            Some(m) if m.eq_ignore_ascii_case("pixel") => WavelengthMode::Pixel,
            Some(m) => WavelengthMode::Solution(m.to_ascii_lowercase()),
            None => WavelengthMode::Solution("air".into()),
        }
    }

    /// Subconjunto de rutas (clave = ruta punteada, null si falta). Es lo que
    /// entra en el fingerprint de cada builder.
    pub fn subset(&self, paths: &[&str]) -> Value {
        let mut out = Map::new();
        for p in paths {
            let key = normalize_path(p).join(".");
            out.insert(key, self.get(p).cloned().unwrap_or(Value::Null));
        }
        Value::Object(out)
    }

    /// Nuevo bundle con `overrides` fusionado en profundidad.
    pub fn overlay(&self, overrides: &Value) -> Settings {
        Settings::new(merge_json(&self.0, overrides))
    }
}

/// Documento mutable usado para construir `Settings`.
#[derive(Debug, Clone, Default)]
pub struct SettingsDoc {
    root: Map<String, Value>,
}

impl SettingsDoc {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(root) => Self { root },
            _ => Self::default(),
        }
    }

    /// Fija `value` en la ruta, creando objetos intermedios. Un valor escalar
    /// en medio de la ruta se reemplaza por un objeto.
    pub fn set_path<S: AsRef<str>>(&mut self, path: &[S], value: Value) {
        let Some((last, parents)) = path.split_last() else {
            return;
        };
        let mut cur = &mut self.root;
        for p in parents {
            let entry = cur.entry(p.as_ref().to_string())
                           .or_insert_with(|| Value::Object(Map::new()));
            if !entry.is_object() {
                *entry = Value::Object(Map::new());
            }
            let Value::Object(next) = entry else {
                return;
            };
            cur = next;
        }
        cur.insert(last.as_ref().to_string(), value);
    }

    pub fn set(&mut self, path: &str, value: Value) {
        self.set_path(&normalize_path(path), value);
    }

    pub fn merge(&mut self, other: &Value) {
        if let Value::Object(m) = merge_json(&Value::Object(self.root.clone()), other) {
            self.root = m;
        }
    }

    pub fn freeze(self) -> Settings {
        Settings::new(Value::Object(self.root))
    }
}
