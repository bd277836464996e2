//! Canonical JSON minimal: objetos con claves ordenadas y sin espacios.
//! Base de los fingerprints de grafos.

use serde_json::Value;
use std::collections::BTreeMap;

/// Texto estable de un grafo serializado: el mismo para dos grafos iguales
/// aunque sus mapas se hayan construido en otro orden.
pub fn to_canonical_json(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => quote(s),
        Value::Array(arr) => {
            let items: Vec<String> = arr.iter().map(to_canonical_json).collect();
            format!("[{}]", items.join(","))
        }
        Value::Object(map) => {
            let mut tree = BTreeMap::new();
            for (k, v) in map {
                tree.insert(k, to_canonical_json(v));
            }
            let items: Vec<String> = tree.into_iter()
                                         .map(|(k, v)| format!("{}:{}", quote(k), v))
                                         .collect();
            format!("{{{}}}", items.join(","))
        }
    }
}

// Escapa como string JSON.
fn quote(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| format!("\"{s}\""))
}
