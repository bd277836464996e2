use serde::Serialize;

use super::{Artifact, Task};

/// Insumos del fingerprint de un grafo congelado.
/// NO es el fingerprint final (string hash) sino el modelo previo a canonicalizar.
/// Diagnósticos, conflictos y timestamps no participan.
#[derive(Serialize)]
pub struct GraphFingerprintInput<'a> {
    pub compiler_version: &'a str,
    pub scope: &'a str,
    pub artifacts: &'a [Artifact],
    pub tasks: Vec<&'a Task>, // orden de registro
}
