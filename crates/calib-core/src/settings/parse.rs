//! Conversión de valores textuales de líneas de settings a JSON tipado.

use serde_json::{Number, Value};

/// Interpreta "true"/"false" sin distinguir mayúsculas.
pub fn parse_bool(v: &str) -> Option<bool> {
    match v.trim().to_ascii_lowercase().as_str() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

/// Convierte un escalar a su tipo más específico: none -> null, bool, entero,
/// float o string.
pub fn parse_scalar(item: &str) -> Value {
    let item = item.trim();
    let lower = item.to_ascii_lowercase();
    if lower == "none" {
        return Value::Null;
    }
    if let Some(b) = parse_bool(&lower) {
        return Value::Bool(b);
    }
    if item.contains('.') {
        if let Some(n) = item.parse::<f64>().ok().and_then(Number::from_f64) {
            return Value::Number(n);
        }
        return Value::String(item.to_string());
    }
    match item.parse::<i64>() {
        Ok(i) => Value::from(i),
        Err(_) => Value::String(item.to_string()),
    }
}

/// Parsea listas del estilo `[1,2.5,none,true,abc]` o `(a,b)`.
pub fn load_list(raw: &str) -> Vec<Value> {
    let inner = raw.trim()
                   .trim_start_matches(|c| c == '(' || c == '[')
                   .trim_end_matches(|c| c == ')' || c == ']');
    if inner.trim().is_empty() {
        return Vec::new();
    }
    inner.split(',').map(parse_scalar).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn list_elements_get_their_natural_type() {
        let v = load_list("[3,2.5,none,True,median]");
        assert_eq!(v, vec![json!(3), json!(2.5), Value::Null, json!(true), json!("median")]);
        assert_eq!(load_list("(1,2)"), vec![json!(1), json!(2)]);
        assert!(load_list("[]").is_empty());
    }

    #[test]
    fn dotted_non_numbers_stay_strings() {
        assert_eq!(parse_scalar("arc.fits"), json!("arc.fits"));
        assert_eq!(parse_bool("FALSE"), Some(false));
        assert_eq!(parse_bool("yes"), None);
    }
}
