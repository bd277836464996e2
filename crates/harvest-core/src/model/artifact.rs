//! Artifact del grafo.
//!
//! Un `Artifact` es un archivo con nombre rastreado por el compilador. Su
//! identidad dentro de un scope es `(category, role, name)`; el scope mismo
//! completa la identidad global. Es inmutable una vez registrado:
//! - `path` sólo existe para inputs (ubicación física resuelta).
//! - `transfer` indica si el scheduler debe conservar/transferir el archivo.
//! - `derived_prefix` conserva el namespace del registro que lo originó.
use serde::{Deserialize, Serialize};

/// Rol de un artifact dentro del grafo.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactRole {
    Input,
    Output,
}

/// Clave de identidad de un artifact dentro de un scope.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArtifactKey {
    pub category: String,
    pub role: ArtifactRole,
    pub name: String,
}

impl ArtifactKey {
    pub fn new(category: impl Into<String>, role: ArtifactRole, name: impl Into<String>) -> Self {
        Self { category: category.into(),
               role,
               name: name.into() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Artifact {
    pub category: String,
    pub role: ArtifactRole,
    pub name: String,
    pub path: Option<String>,
    pub transfer: bool,
    pub derived_prefix: Option<String>,
}

impl Artifact {
    pub fn key(&self) -> ArtifactKey {
        ArtifactKey::new(self.category.clone(), self.role, self.name.clone())
    }

    pub fn is_input(&self) -> bool {
        self.role == ArtifactRole::Input
    }
}

/// Uso de un archivo por parte de un task: slot local -> nombre global.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileBinding {
    pub file: String,
    pub transfer: bool,
}

impl FileBinding {
    pub fn new(file: impl Into<String>, transfer: bool) -> Self {
        Self { file: file.into(),
               transfer }
    }
}
