//! Fusión determinista de documentos de settings.
//!
//! A diferencia del merge de parámetros original (shallow), los settings son
//! anidados (`reduce.flatfield.perform`): los objetos se fusionan en
//! profundidad y cualquier otro valor de `b` reemplaza al de `a`.

use serde_json::Value;

/// Deep merge: las claves de `b` prevalecen; objetos anidados se combinan.
pub fn merge_json(a: &Value, b: &Value) -> Value {
    match (a, b) {
        (Value::Object(ma), Value::Object(mb)) => {
            let mut out = ma.clone();
            for (k, vb) in mb.iter() {
                let merged = match out.get(k) {
                    Some(va) => merge_json(va, vb),
                    None => vb.clone(),
                };
                out.insert(k.clone(), merged);
            }
            Value::Object(out)
        }
        (_, other) => other.clone(),
    }
}
