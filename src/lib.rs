//! HarvestFlow Library
//!
//! Fachada sobre los crates del workspace:
//! - `errors`: error de aplicación que agrupa los de cada crate.
//! - `config`: rutas de entrada y configuración del compilador.
//! - `compile_sources` / `compile_paths`: del JSON de entrada a los grafos.
//!
//! Puede usarse desde `main.rs` o por otros crates/clientes.

pub mod config;
pub mod errors;

pub use harvest_compiler;
pub use harvest_core;
pub use harvest_domain;

use harvest_compiler::{CompiledRun, CompilerConfig, GraphCompiler, PipelineTemplate, StatisticsCompiler,
                       StatisticsTemplate};
use harvest_core::{GraphDescriptor, SignatureTable};
use harvest_domain::InMemoryCatalog;
use log::debug;
use serde::Serialize;

use crate::config::{read_to_string, RunPaths};
use crate::errors::HarvestError;

/// Grafos producidos por una invocación.
#[derive(Debug, Clone, Serialize)]
pub struct RunOutput {
    pub run: CompiledRun,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub statistics: Option<GraphDescriptor>,
}

/// Compila desde el contenido JSON de cada entrada.
pub fn compile_sources(template: &str,
                       catalog: &str,
                       stats_template: Option<&str>,
                       table: SignatureTable,
                       config: CompilerConfig)
                       -> Result<RunOutput, HarvestError> {
    let template = PipelineTemplate::from_json_str(template)?;
    let catalog = InMemoryCatalog::from_json_str(catalog)?;
    debug!("compile_sources:catalog records={}", catalog.len());

    let statistics = match stats_template {
        Some(s) => {
            let stats = StatisticsTemplate::from_json_str(s)?;
            Some(StatisticsCompiler::new(stats, table.clone(), config.clone()).compile()?)
        }
        None => None,
    };
    let run = GraphCompiler::new(template, table, config).compile(&catalog)?;
    Ok(RunOutput { run, statistics })
}

/// Lee las entradas indicadas por `paths` y compila.
pub fn compile_paths(paths: &RunPaths) -> Result<RunOutput, HarvestError> {
    let template = read_to_string(&paths.template)?;
    let catalog = read_to_string(&paths.catalog)?;
    let stats = paths.stats_template.as_deref().map(read_to_string).transpose()?;
    compile_sources(&template,
                    &catalog,
                    stats.as_deref(),
                    paths.signature_table()?,
                    paths.compiler_config()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_catalog_is_reported_as_domain_error() {
        let err = compile_sources(r#"{"workflows": {}}"#,
                                  "not json",
                                  None,
                                  SignatureTable::builtin(),
                                  CompilerConfig::default()).unwrap_err();
        assert!(matches!(err,
                         HarvestError::Compile(harvest_compiler::CompileError::Domain(
            harvest_domain::DomainError::ExternalError(_)
        ))));
    }

    #[test]
    fn empty_template_compiles_to_empty_graphs() {
        let out = compile_sources(r#"{"workflows": {}}"#,
                                  "[]",
                                  None,
                                  SignatureTable::builtin(),
                                  CompilerConfig::default()).unwrap();
        assert!(out.run.full.tasks.is_empty());
        assert!(out.statistics.is_none());
    }
}
