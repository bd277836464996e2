//! Expansión de la cadena por registro.
//!
//! Para cada registro de una categoría se instancia un task por paso del
//! template, con nombres derivados del namespace del registro. El estado que
//! cruza registros (índice, clusters, batches, marcador serial) es un
//! acumulador explícito que `expand_record` recibe y devuelve.
use harvest_core::constants::IMAGE_EXTENSION;
use harvest_core::{FileBinding, Scope, SignatureTable, SlotType, TaskSpec};
use harvest_domain::{DerivedNamespace, DomainError, Record};
use log::debug;

use crate::batching::{BatchPlan, Clusterer, ExtractionBatch};
use crate::config::CompilerConfig;
use crate::template::{basename, ExtractSpec, StepTemplate};
use crate::CompileError;

/// Datos fijos de la expansión de una categoría.
pub struct ExpansionContext<'a> {
    pub category: &'a str,
    pub steps: &'a [StepTemplate],
    pub extract: Option<&'a ExtractSpec>,
    pub raw_files: &'a [String],
    pub table: &'a SignatureTable,
    pub config: &'a CompilerConfig,
    pub save_steps: bool,
}

impl ExpansionContext<'_> {
    fn is_raw_file(&self, slot: &str) -> bool {
        self.raw_files.iter().any(|f| f == slot)
    }

    fn extracts_after(&self, step: &str) -> bool {
        self.extract.is_some_and(|e| e.depends.iter().any(|d| d == step))
    }

    /// Pesos distintos de los ejecutables usados por la categoría.
    fn weights(&self) -> Vec<f64> {
        let mut out: Vec<f64> = Vec::new();
        for step in self.steps {
            if let Some(w) = self.table.weight(&step.executable) {
                if !out.contains(&w) {
                    out.push(w);
                }
            }
        }
        out
    }

    /// Verifica que cada `depends` nombre un paso anterior y que la
    /// extracción dependa de pasos existentes.
    fn check_step_references(&self) -> Result<(), CompileError> {
        for (i, step) in self.steps.iter().enumerate() {
            for dep in step.depends.iter().flatten() {
                if !self.steps[..i].iter().any(|s| &s.name == dep) {
                    return Err(CompileError::UnknownStep { category: self.category.to_string(),
                                                           task: step.name.clone(),
                                                           step: dep.clone() });
                }
            }
        }
        if let Some(extract) = self.extract {
            for dep in &extract.depends {
                if !self.steps.iter().any(|s| &s.name == dep) {
                    return Err(CompileError::UnknownStep { category: self.category.to_string(),
                                                           task: "extract".to_string(),
                                                           step: dep.clone() });
                }
            }
        }
        Ok(())
    }
}

/// Acumulador que cruza los registros de una categoría.
#[derive(Debug, Clone)]
pub struct ExpansionState {
    pub index: usize,
    pub clusterer: Option<Clusterer>,
    pub batches: BatchPlan,
    pub serial: Option<String>,
}

impl ExpansionState {
    pub fn new(ctx: &ExpansionContext<'_>) -> Self {
        Self { index: 0,
               clusterer: ctx.config.cluster_size().map(|c| Clusterer::new(c, &ctx.weights())),
               batches: BatchPlan::new(ctx.config.batch_size()),
               serial: None }
    }
}

/// Resultado de expandir una categoría completa.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryExpansion {
    pub category: String,
    pub records: usize,
    pub batches: Vec<ExtractionBatch>,
}

/// Registra los raw files de la categoría (nombre = basename).
pub fn register_raw_files(scope: &mut Scope, category: &str, raw_files: &[String]) {
    for f in raw_files {
        scope.register_input(category, basename(f), f, None);
    }
}

pub fn expand_category(ctx: &ExpansionContext<'_>,
                       scope: &mut Scope,
                       records: &[Record])
                       -> Result<CategoryExpansion, CompileError> {
    ctx.check_step_references()?;
    let state = records.iter()
                       .try_fold(ExpansionState::new(ctx), |state, r| expand_record(ctx, scope, r, state))?;
    let batches = state.batches.into_batches();
    debug!("expand_category:done category={} records={} batches={}",
           ctx.category,
           records.len(),
           batches.len());
    Ok(CategoryExpansion { category: ctx.category.to_string(),
                           records: records.len(),
                           batches })
}

/// Archivos que la extracción necesita de un registro.
fn extraction_files(ctx: &ExpansionContext<'_>, ns: &DerivedNamespace, extract: &ExtractSpec) -> Vec<String> {
    let mut files: Vec<String> = extract.inputs.iter().map(|i| ns.artifact(i, IMAGE_EXTENSION)).collect();
    if let Some(roi) = extract.dim_from_roi() {
        if ctx.is_raw_file(roi) {
            files.push(basename(roi).to_string());
        } else {
            files.push(ns.artifact(roi, ".json"));
        }
    }
    files
}

fn seed_batch(batch: Option<&mut ExtractionBatch>, task: &str, files: &[String], transfer: bool) {
    if let Some(b) = batch {
        b.add_dependency(task);
        for f in files {
            b.add_input(f.clone(), transfer);
        }
    }
}

/// Expande un registro y devuelve el acumulador actualizado.
pub fn expand_record(ctx: &ExpansionContext<'_>,
                     scope: &mut Scope,
                     record: &Record,
                     mut state: ExpansionState)
                     -> Result<ExpansionState, CompileError> {
    let ns = DerivedNamespace::from_record(record);
    let source_ext = record.source_extension().ok_or_else(|| {
                                                   DomainError::ValidationError(format!("Registro {} con path sin extensión",
                                                                                        record.pegasusid()))
                                               })?;
    let position = state.clusterer.as_mut().map(|c| c.position(state.index));
    if ctx.extract.is_some() {
        state.batches.observe(state.index);
    }
    let extract_files = ctx.extract.map(|e| extraction_files(ctx, &ns, e)).unwrap_or_default();

    if let Some(first) = ctx.steps.first() {
        let sig = ctx.table.require(&first.executable)?;
        for (i, slot) in first.inputs.iter().enumerate() {
            if !ctx.is_raw_file(slot) && sig.input_type(i) == Some(SlotType::Image) {
                scope.register_input(ctx.category,
                                     &ns.artifact(slot, &source_ext),
                                     record.path(),
                                     Some(ns.as_str()));
            }
        }
    }

    let mut previous: Option<String> = None;
    for (step_index, step) in ctx.steps.iter().enumerate() {
        let sig = ctx.table.require(&step.executable)?;
        let task_name = ns.task(&step.name);
        let extracts = ctx.extracts_after(&step.name);

        let mut spec = TaskSpec::new(task_name.clone(), step.executable.clone());
        for (i, slot) in step.inputs.iter().enumerate() {
            let binding = if ctx.is_raw_file(slot) {
                FileBinding::new(basename(slot), ctx.save_steps)
            } else {
                let ext = if step_index == 0 {
                    source_ext.as_str()
                } else {
                    sig.input_type(i).and_then(|t| t.extension()).unwrap_or(IMAGE_EXTENSION)
                };
                FileBinding::new(ns.artifact(slot, ext), ctx.save_steps)
            };
            spec = spec.input(slot.clone(), binding);
        }
        for (i, slot) in step.outputs.iter().enumerate() {
            let slot_type = sig.output_type(i).unwrap_or(SlotType::Image);
            if slot == "none" || slot_type == SlotType::None {
                continue;
            }
            let transfer = extracts || ctx.save_steps;
            let name = ns.artifact(slot, slot_type.extension().unwrap_or(""));
            scope.register_output(ctx.category, &name, transfer);
            spec = spec.output(slot.clone(), FileBinding::new(name, transfer));
        }

        let dependencies: Vec<String> = match &step.depends {
            Some(deps) => deps.iter().map(|d| ns.task(d)).collect(),
            None => previous.iter().cloned().collect(),
        };
        let label = position.as_ref()
                            .map(|p| p.label(ctx.category, step_index, sig.weight));
        spec.arguments = step.arguments.clone();
        let spec = spec.depends_on(dependencies)
                       .label(label)
                       .walltime(ctx.config.images_walltime());
        scope.register_task(spec, ctx.table)?;

        if extracts {
            seed_batch(state.batches.current_mut(), &task_name, &extract_files, ctx.save_steps);
        }
        previous = Some(task_name);
    }

    state.serial = previous;
    let seeds_from_serial = ctx.extract.is_some_and(|e| e.depends.is_empty());
    if seeds_from_serial {
        if let Some(serial) = state.serial.clone() {
            seed_batch(state.batches.current_mut(), &serial, &extract_files, ctx.save_steps);
        }
    }
    state.index += 1;
    Ok(state)
}
