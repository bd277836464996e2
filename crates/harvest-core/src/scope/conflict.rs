use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ConflictKind {
    Artifact,
    Task,
}

/// Registro de una re-registración con contenido distinto al existente.
/// La primera registración se conserva; esto sólo deja constancia.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IdentityConflict {
    pub kind: ConflictKind,
    pub identity: String,
    pub detail: String,
}
