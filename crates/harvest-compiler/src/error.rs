use harvest_core::GraphError;
use harvest_domain::DomainError;
use thiserror::Error;

/// Errores fatales de compilación. Los problemas de argumentos no llegan
/// aquí: se acumulan como diagnósticos en cada scope.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error(transparent)]
    Graph(#[from] GraphError),
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("Template inválido: {0}")]
    Template(String),
    #[error("Configuración inválida: {0}")]
    Config(String),
    #[error("step '{task}' de categoría '{category}' depende del step desconocido '{step}'")]
    UnknownStep { category: String, task: String, step: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn graph_errors_are_transparent() {
        let err: CompileError = GraphError::UnknownExecutable("ih-x".into()).into();
        assert_eq!(err.to_string(), "unknown executable 'ih-x'");
    }

    #[test]
    fn unknown_step_names_category_and_step() {
        let err = CompileError::UnknownStep { category: "rgbsv".into(),
                                              task: "crop".into(),
                                              step: "gray".into() };
        assert_eq!(err.to_string(), "step 'crop' de categoría 'rgbsv' depende del step desconocido 'gray'");
    }
}
