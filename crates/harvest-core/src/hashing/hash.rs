//! Fingerprints de grafos congelados: blake3 sobre la forma canónica de
//! `GraphFingerprintInput`.

use blake3::Hasher;
use serde_json::Value;

use super::to_canonical_json;
use crate::model::GraphFingerprintInput;

fn hash_str(input: &str) -> String {
    let mut h = Hasher::new();
    h.update(input.as_bytes());
    h.finalize().to_hex().to_string()
}

/// Hashea la forma canónica de un `Value` (independiente del orden de claves).
pub fn hash_value(value: &Value) -> String {
    hash_str(&to_canonical_json(value))
}

/// Fingerprint hex de un grafo. Falla sólo si el modelo no serializa.
pub fn graph_fingerprint(input: &GraphFingerprintInput<'_>) -> Result<String, serde_json::Error> {
    serde_json::to_value(input).map(|v| hash_value(&v))
}
