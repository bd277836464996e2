use harvest_compiler::CompileError;
use harvest_domain::DomainError;
use thiserror::Error;

/// Error de nivel aplicación: lectura de entradas y compilación.
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Error interno: {0}")]
    Internal(String),
    #[error("Error en IO: {0}")]
    Io(#[from] std::io::Error),
    #[error("Error de configuración: {0}")]
    Config(String),
    #[error("JSON inválido en {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error(transparent)]
    Compile(#[from] CompileError),
}

impl From<DomainError> for HarvestError {
    fn from(e: DomainError) -> Self {
        HarvestError::Compile(CompileError::Domain(e))
    }
}
