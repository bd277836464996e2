//! Ensamblado de los dos grafos de imágenes de una corrida.
//!
//! El scope `workflow` recibe las cadenas por registro más la agregación; el
//! scope `extract` sólo la agregación, leyendo los inputs de batch desde el
//! directorio de salida.
use chrono::{DateTime, Utc};
use harvest_core::{Diagnostic, GraphDescriptor, Scope, Severity, SignatureTable};
use harvest_domain::Catalog;
use log::{debug, info, warn};
use serde::Serialize;
use uuid::Uuid;

use crate::aggregation::{aggregate, register_base_artifacts, AggregationContext, ScopeKind};
use crate::config::CompilerConfig;
use crate::expander::{expand_category, register_raw_files, CategoryExpansion, ExpansionContext};
use crate::template::PipelineTemplate;
use crate::CompileError;

pub const FULL_SCOPE: &str = "workflow";
pub const EXTRACT_SCOPE: &str = "extract";

/// Resultado de una compilación. `run_id` y `compiled_at` son metadatos de
/// la corrida y no participan en los fingerprints.
#[derive(Debug, Clone, Serialize)]
pub struct CompiledRun {
    pub run_id: Uuid,
    pub compiled_at: DateTime<Utc>,
    pub full: GraphDescriptor,
    pub extract_only: GraphDescriptor,
    pub diagnostics: Vec<Diagnostic>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub catalog_digest: Option<String>,
}

impl CompiledRun {
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(|d| d.severity == Severity::Error)
    }
}

pub struct GraphCompiler {
    template: PipelineTemplate,
    table: SignatureTable,
    config: CompilerConfig,
}

impl GraphCompiler {
    pub fn new(template: PipelineTemplate, table: SignatureTable, config: CompilerConfig) -> Self {
        Self { template,
               table,
               config }
    }

    pub fn template(&self) -> &PipelineTemplate {
        &self.template
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    fn expand(&self, scope: &mut Scope, catalog: &dyn Catalog) -> Result<Vec<CategoryExpansion>, CompileError> {
        let known = catalog.categories();
        for c in known.iter().filter(|c| !self.template.workflows.contains_key(*c)) {
            debug!("compile:ignored_category category={c}");
        }

        let save_steps = self.template.options.save_steps();
        let mut expansions = Vec::new();
        for category in self.template.categories() {
            let records = catalog.select_by_category(category)?;
            if records.is_empty() {
                warn!("compile:empty_category category={category}");
                continue;
            }
            let raw_files = self.template.raw_files(category);
            register_raw_files(scope, category, raw_files);
            let ctx = ExpansionContext { category,
                                         steps: self.template.steps(category),
                                         extract: self.template.extract_for(category),
                                         raw_files,
                                         table: &self.table,
                                         config: &self.config,
                                         save_steps };
            expansions.push(expand_category(&ctx, scope, &records)?);
        }
        Ok(expansions)
    }

    fn aggregation_context(&self, kind: ScopeKind) -> AggregationContext<'_> {
        AggregationContext { template: &self.template,
                             table: &self.table,
                             config: &self.config,
                             kind }
    }

    /// Compila el catálogo en los grafos `workflow` y `extract`.
    ///
    /// # Errores
    /// Estructurales (`GraphError`), de catálogo (`DomainError`) o pasos
    /// desconocidos en `depends`. Los problemas de argumentos quedan como
    /// diagnósticos en el resultado.
    pub fn compile(&self, catalog: &dyn Catalog) -> Result<CompiledRun, CompileError> {
        let mut full = Scope::new(FULL_SCOPE);
        let mut extract = Scope::new(EXTRACT_SCOPE);
        register_base_artifacts(&mut full, ScopeKind::Full, &self.config);
        register_base_artifacts(&mut extract, ScopeKind::ExtractOnly, &self.config);

        let expansions = self.expand(&mut full, catalog)?;
        aggregate(&self.aggregation_context(ScopeKind::Full), &mut full, &expansions)?;
        aggregate(&self.aggregation_context(ScopeKind::ExtractOnly), &mut extract, &expansions)?;

        let full = full.finish();
        let extract_only = extract.finish();
        let diagnostics: Vec<Diagnostic> = full.diagnostics
                                               .iter()
                                               .chain(extract_only.diagnostics.iter())
                                               .cloned()
                                               .collect();
        let run = CompiledRun { run_id: Uuid::new_v4(),
                                compiled_at: Utc::now(),
                                full,
                                extract_only,
                                diagnostics,
                                catalog_digest: catalog.snapshot_digest() };
        info!("compile:done run_id={} tasks={} extract_tasks={} diagnostics={}",
              run.run_id,
              run.full.tasks.len(),
              run.extract_only.tasks.len(),
              run.diagnostics.len());
        Ok(run)
    }
}
