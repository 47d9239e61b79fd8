//! Registro explícito de claves de settings.
//!
//! Cada entrada asocia una ruta normalizada (tokens en minúsculas) con un
//! `ValueKind` que valida y convierte el valor. Una línea
//! `bias comb method median` se resuelve buscando el prefijo registrado más
//! largo; los tokens restantes forman el valor. Todas las rutas aceptadas son
//! enumerables con `keys()`.
use std::collections::BTreeMap;

use log::{debug, warn};
use serde_json::Value;

use super::parse::{load_list, parse_bool};
use super::{SettingsDoc, SettingsError};

/// Tipo de valor aceptado por una clave.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Bool,
    Int,
    Float,
    /// Texto libre (se conserva tal cual).
    Str,
    /// Texto libre normalizado a minúsculas.
    LowerStr,
    /// Texto o `none` (-> null).
    OptionalStr,
    /// Una de las opciones (comparación en minúsculas).
    Choice(&'static [&'static str]),
    /// Una de las opciones o `none` (-> null).
    OptionalChoice(&'static [&'static str]),
    /// Lista `[a,b,...]`.
    List,
    /// `none` o ruta a un archivo `.fits` / `.fits.gz`.
    FitsPath,
    /// Número de CPUs: `all`, entero positivo o negativo (todas menos N).
    Cpus,
}

impl ValueKind {
    fn describe(&self) -> String {
        match self {
            ValueKind::Bool => "'True' or 'False'".into(),
            ValueKind::Int => "an integer".into(),
            ValueKind::Float => "a float".into(),
            ValueKind::Str | ValueKind::LowerStr => "a string".into(),
            ValueKind::OptionalStr => "a string or 'None'".into(),
            ValueKind::Choice(opts) => format!("one of {}", opts.join(", ")),
            ValueKind::OptionalChoice(opts) => format!("'None' or one of {}", opts.join(", ")),
            ValueKind::List => "a list".into(),
            ValueKind::FitsPath => "'None' or a fits file".into(),
            ValueKind::Cpus => "'all' or an integer".into(),
        }
    }

    /// Valida y convierte `raw` al JSON correspondiente.
    pub fn convert(&self, raw: &str) -> Option<Value> {
        let raw = raw.trim();
        let lower = raw.to_ascii_lowercase();
        match self {
            ValueKind::Bool => parse_bool(raw).map(Value::Bool),
            ValueKind::Int => raw.parse::<i64>().ok().map(Value::from),
            ValueKind::Float => raw.parse::<f64>()
                                   .ok()
                                   .and_then(serde_json::Number::from_f64)
                                   .map(Value::Number),
            ValueKind::Str => Some(Value::String(raw.to_string())),
            ValueKind::LowerStr => Some(Value::String(lower)),
            ValueKind::OptionalStr => Some(if lower == "none" { Value::Null } else { Value::String(raw.to_string()) }),
            ValueKind::Choice(opts) => opts.contains(&lower.as_str()).then(|| Value::String(lower.clone())),
            ValueKind::OptionalChoice(opts) => {
                if lower == "none" {
                    Some(Value::Null)
                } else {
                    opts.contains(&lower.as_str()).then(|| Value::String(lower.clone()))
                }
            }
            ValueKind::List => Some(Value::Array(load_list(raw))),
            ValueKind::FitsPath => {
                if lower == "none" {
                    Some(Value::Null)
                } else if lower.ends_with(".fits") || lower.ends_with(".fits.gz") {
                    Some(Value::String(raw.to_string()))
                } else {
                    None
                }
            }
            ValueKind::Cpus => resolve_cpus(&lower).map(Value::from),
        }
    }
}

fn available_cpus() -> i64 {
    std::thread::available_parallelism().map(|n| n.get() as i64).unwrap_or(1)
}

fn resolve_cpus(v: &str) -> Option<i64> {
    let count = available_cpus();
    if v == "all" {
        return Some(count);
    }
    let n = v.parse::<i64>().ok()?;
    if n > count {
        warn!("requested {n} CPUs but only {count} are available");
        return Some(count);
    }
    if n <= 0 {
        return Some((n + count).max(1));
    }
    Some(n)
}

/// Normaliza una ruta ("reduce.flatfield.perform" o "reduce flatfield
/// perform") a tokens en minúsculas.
pub fn normalize_path(path: &str) -> Vec<String> {
    path.split(|c: char| c == '.' || c.is_whitespace())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_ascii_lowercase())
        .collect()
}

#[derive(Debug, Clone, Default)]
pub struct SettingsRegistry {
    entries: BTreeMap<Vec<String>, ValueKind>,
}

impl SettingsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registra una ruta. Builder-style para encadenar.
    pub fn register(mut self, path: &str, kind: ValueKind) -> Self {
        self.insert(path, kind);
        self
    }

    pub fn insert(&mut self, path: &str, kind: ValueKind) {
        self.entries.insert(normalize_path(path), kind);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn kind_of(&self, path: &str) -> Option<ValueKind> {
        self.entries.get(&normalize_path(path)).copied()
    }

    /// Rutas aceptadas en formato punteado, en orden lexicográfico.
    pub fn keys(&self) -> Vec<String> {
        self.entries.keys().map(|k| k.join(".")).collect()
    }

    /// Resuelve el prefijo registrado más largo que deja al menos un token de
    /// valor. Devuelve (ruta, kind, tokens de valor).
    pub fn resolve<'t>(&self, tokens: &'t [String]) -> Option<(&[String], ValueKind, &'t [String])> {
        (1..tokens.len()).rev().find_map(|n| {
                                   self.entries
                                       .get_key_value(&tokens[..n])
                                       .map(|(k, kind)| (k.as_slice(), *kind, &tokens[n..]))
                               })
    }

    /// Parsea una línea `clave... valor` sin aplicarla.
    pub fn parse_line(&self, line: &str) -> Result<(Vec<String>, Value), SettingsError> {
        let raw_tokens: Vec<String> = line.split_whitespace().map(|t| t.to_string()).collect();
        if raw_tokens.is_empty() {
            return Err(SettingsError::EmptyLine);
        }
        // las claves se comparan en minúsculas; el valor conserva su forma
        let lowered: Vec<String> = raw_tokens.iter().map(|t| t.to_ascii_lowercase()).collect();
        let Some((path, kind, _)) = self.resolve(&lowered) else {
            let joined = lowered.join(".");
            if self.entries.contains_key(&lowered) {
                return Err(SettingsError::MissingValue(joined));
            }
            return Err(SettingsError::UnknownKey(joined));
        };
        let path = path.to_vec();
        let raw_value = raw_tokens[path.len()..].join(" ");
        let value = kind.convert(&raw_value)
                        .ok_or_else(|| SettingsError::InvalidValue { key: path.join("."),
                                                                     value: raw_value.clone(),
                                                                     expected: kind.describe() })?;
        Ok((path, value))
    }

    /// Aplica una línea sobre el documento.
    pub fn apply_line(&self, doc: &mut SettingsDoc, line: &str) -> Result<(), SettingsError> {
        let (path, value) = self.parse_line(line)?;
        debug!("settings: {} = {}", path.join("."), value);
        doc.set_path(&path, value);
        Ok(())
    }

    /// Aplica un bloque de texto; ignora líneas vacías y comentarios `#`.
    /// Devuelve el número de líneas aplicadas.
    pub fn apply_lines(&self, doc: &mut SettingsDoc, text: &str) -> Result<usize, SettingsError> {
        let mut applied = 0;
        for line in text.lines() {
            let t = line.trim();
            if t.is_empty() || t.starts_with('#') {
                continue;
            }
            self.apply_line(doc, t)?;
            applied += 1;
        }
        Ok(applied)
    }

    /// Registro estándar: claves de reducción, de ejecución y las que leen el
    /// orquestador y los builders de referencia.
    pub fn standard() -> Self {
        const COMBINE: &[&str] = &["mean", "median", "weightmean"];
        const REPLACE: &[&str] = &["min", "max", "mean", "median", "weightmean", "maxnonsat"];
        const SATPIX: &[&str] = &["reject", "force", "nothing"];
        const FIT_FUNCTIONS: &[&str] = &["polynomial", "legendre", "chebyshev"];
        const TILT_METHODS: &[&str] = &["pca", "spline", "spca", "interp", "perp", "zero"];

        let mut r = Self::new();
        for frame in ["bias", "arc", "trace", "pixelflat"] {
            r.insert(&format!("{frame} comb method"), ValueKind::Choice(COMBINE));
            r.insert(&format!("{frame} comb reject cosmics"), ValueKind::Float);
            r.insert(&format!("{frame} comb reject replace"), ValueKind::Choice(REPLACE));
            r.insert(&format!("{frame} comb reject lowhigh"), ValueKind::List);
            r.insert(&format!("{frame} comb reject level"), ValueKind::List);
            r.insert(&format!("{frame} comb satpix"), ValueKind::Choice(SATPIX));
            r.insert(&format!("{frame} useframe"), ValueKind::LowerStr);
        }
        r.insert("arc comb match", ValueKind::Float);
        r.insert("arc calibrate lamps", ValueKind::List);
        r.insert("arc calibrate nfitpix", ValueKind::Int);
        r.insert("arc calibrate maxrms", ValueKind::Float);

        r.insert("reduce badpix", ValueKind::Bool);
        r.insert("reduce calibrate wavelength", ValueKind::Choice(&["air", "vacuum", "pixel"]));
        r.insert("reduce flatfield method", ValueKind::Choice(&["polyscan"]));
        r.insert("reduce flatfield params", ValueKind::List);
        r.insert("reduce flatfield perform", ValueKind::Bool);
        r.insert("reduce flatfield useframe", ValueKind::LowerStr);
        r.insert("reduce slitprofile perform", ValueKind::Bool);
        r.insert("reduce nonlinear", ValueKind::Bool);
        r.insert("reduce overscan method", ValueKind::Choice(&["polynomial", "savgol"]));
        r.insert("reduce overscan params", ValueKind::List);
        r.insert("reduce pixellocations", ValueKind::FitsPath);
        r.insert("reduce pixelsize", ValueKind::Float);
        r.insert("reduce refframe", ValueKind::Choice(&["geocentric", "heliocentric", "barycentric"]));
        r.insert("reduce skysub perform", ValueKind::Bool);
        r.insert("reduce trim", ValueKind::Bool);
        r.insert("reduce usebias", ValueKind::OptionalStr);
        r.insert("reduce flexure maxshift", ValueKind::Int);
        r.insert("reduce flexure spec", ValueKind::OptionalChoice(&["boxcar", "slit_cen"]));
        r.insert("reduce fluxcal perform", ValueKind::Bool);

        r.insert("run calcheck", ValueKind::Bool);
        r.insert("run directory master", ValueKind::Str);
        r.insert("run directory plots", ValueKind::Str);
        r.insert("run directory science", ValueKind::Str);
        r.insert("run ncpus", ValueKind::Cpus);
        r.insert("run preponly", ValueKind::Bool);
        r.insert("run qcontrol", ValueKind::Bool);
        r.insert("run spectrograph", ValueKind::LowerStr);
        r.insert("run stopcheck", ValueKind::Bool);
        r.insert("run useidname", ValueKind::Bool);

        r.insert("detector xgap", ValueKind::Float);
        r.insert("detector ygap", ValueKind::Float);
        r.insert("detector ysize", ValueKind::Float);
        r.insert("detector saturation", ValueKind::Float);
        r.insert("detector nonlinear", ValueKind::Float);
        r.insert("detector naxis0", ValueKind::Int);
        r.insert("detector naxis1", ValueKind::Int);

        r.insert("trace slits number", ValueKind::Int);
        r.insert("trace slits function", ValueKind::Choice(FIT_FUNCTIONS));
        r.insert("trace slits tilts method", ValueKind::Choice(TILT_METHODS));
        r.insert("trace slits tilts order", ValueKind::Int);
        r.insert("trace slits tilts maxrms", ValueKind::Float);

        r.insert("masters directory", ValueKind::Str);
        r.insert("masters reuse", ValueKind::Bool);
        r
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn longest_prefix_wins() {
        let reg = SettingsRegistry::new().register("bias comb", ValueKind::Str)
                                         .register("bias comb method", ValueKind::Choice(&["mean", "median"]));
        let (path, value) = reg.parse_line("bias comb method Median").expect("parse");
        assert_eq!(path, vec!["bias", "comb", "method"]);
        assert_eq!(value, json!("median"));
        let (path, value) = reg.parse_line("bias comb whatever else").expect("parse");
        assert_eq!(path, vec!["bias", "comb"]);
        assert_eq!(value, json!("whatever else"));
    }

    #[test]
    fn unknown_and_invalid_lines_are_errors() {
        let reg = SettingsRegistry::standard();
        assert!(matches!(reg.parse_line("foo bar 1"), Err(SettingsError::UnknownKey(_))));
        assert!(matches!(reg.parse_line("reduce trim maybe"), Err(SettingsError::InvalidValue { .. })));
        assert!(matches!(reg.parse_line("reduce trim"), Err(SettingsError::MissingValue(_))));
        assert_eq!(reg.parse_line("   "), Err(SettingsError::EmptyLine));
    }

    #[test]
    fn apply_lines_builds_nested_document() {
        let reg = SettingsRegistry::standard();
        let mut doc = SettingsDoc::new();
        let text = "# comentario\n\nreduce flatfield perform False\nreduce pixellocations none\nbias comb reject lowhigh [0,1]\nreduce calibrate wavelength pixel\n";
        let applied = reg.apply_lines(&mut doc, text).expect("apply");
        assert_eq!(applied, 4);
        let s = doc.freeze();
        assert!(!s.flat_fielding_enabled());
        assert_eq!(s.get("reduce.pixellocations"), Some(&Value::Null));
        assert_eq!(s.get("bias.comb.reject.lowhigh"), Some(&json!([0, 1])));
        assert!(s.wavelength_mode().is_pixel());
    }

    #[test]
    fn cpus_resolution() {
        let all = available_cpus();
        assert_eq!(ValueKind::Cpus.convert("all"), Some(json!(all)));
        assert_eq!(ValueKind::Cpus.convert("1"), Some(json!(1)));
        assert_eq!(ValueKind::Cpus.convert(&format!("{}", all + 5)), Some(json!(all)));
        assert_eq!(ValueKind::Cpus.convert("-1"), Some(json!((all - 1).max(1))));
        assert_eq!(ValueKind::Cpus.convert("many"), None);
    }

    #[test]
    fn keys_are_enumerable() {
        let keys = SettingsRegistry::standard().keys();
        assert!(keys.contains(&"reduce.flatfield.perform".to_string()));
        assert!(keys.contains(&"run.ncpus".to_string()));
        assert!(keys.contains(&"trace.comb.method".to_string()));
    }
}
