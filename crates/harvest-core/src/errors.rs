//! Errores específicos del core.
//!
//! Sólo las violaciones estructurales son errores: abortan el ensamblado del
//! grafo en curso. Los problemas de template (argumentos requeridos sin
//! resolver) se reportan como `Diagnostic` sobre el scope y no detienen la
//! compilación.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub enum GraphError {
    #[error("task '{task}' depends on unknown task '{dependency}' in scope '{scope}'")]
    UnknownDependency { scope: String, task: String, dependency: String },
    #[error("unknown executable '{0}'")]
    UnknownExecutable(String),
    #[error("dependency cycle detected at task '{0}'")]
    Cycle(String),
    #[error("internal: {0}")]
    Internal(String),
}

/// Severidad de un diagnóstico emitido durante el registro de tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Warning,
    Error,
}

/// Problema no fatal detectado al registrar un task (p. ej. argumento
/// requerido sin resolución). Se acumula en el scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub task: String,
    pub message: String,
}

impl Diagnostic {
    pub fn error(task: impl Into<String>, message: impl Into<String>) -> Self {
        Self { severity: Severity::Error,
               task: task.into(),
               message: message.into() }
    }

    pub fn warning(task: impl Into<String>, message: impl Into<String>) -> Self {
        Self { severity: Severity::Warning,
               task: task.into(),
               message: message.into() }
    }
}
