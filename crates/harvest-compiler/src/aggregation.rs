//! Pipeline de agregación en dos fases.
//!
//! Extract por batch, Aggregate-1 por categoría, y si el template declara
//! `histogram-bin`: Bin-Creation por grupo, Extract-With-Bins por batch y un
//! Aggregate-2 global. El Report (`error-log`) siempre es el sumidero.
use harvest_core::constants::{ALL_CATEGORY, RAW_CATEGORY};
use harvest_core::{FileBinding, Scope, SignatureTable, TaskSpec};
use indexmap::IndexMap;
use log::{debug, warn};
use serde_json::Value;

use crate::batching::ExtractionBatch;
use crate::config::CompilerConfig;
use crate::expander::CategoryExpansion;
use crate::template::PipelineTemplate;
use crate::CompileError;

pub const BASE_DB: &str = "img.db";
pub const EXTRACT_OPTIONS: &str = "extract.json";
pub const FINAL_DB: &str = "img3.db";
pub const REPORT_LOG: &str = "img.log";
pub const AGGREGATE2_TASK: &str = "sql_aggregate2";
pub const REPORT_TASK: &str = "error-log";

const EXTRACT_EXECUTABLE: &str = "ih-extract-multi";
const AGGREGATE_EXECUTABLE: &str = "ih-sql-aggregate";
const BIN_EXECUTABLE: &str = "ih-stats-histogram-bin";
const REPORT_EXECUTABLE: &str = "ih-error-log";

/// Variante de scope que recibe la agregación.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    /// Grafo completo: los Extract dependen de las cadenas por registro.
    Full,
    /// Sólo extracción: sin cadenas; los inputs de batch viven en el
    /// directorio de salida.
    ExtractOnly,
}

impl ScopeKind {
    fn base_category(self) -> &'static str {
        match self {
            ScopeKind::Full => RAW_CATEGORY,
            ScopeKind::ExtractOnly => ALL_CATEGORY,
        }
    }
}

pub struct AggregationContext<'a> {
    pub template: &'a PipelineTemplate,
    pub table: &'a SignatureTable,
    pub config: &'a CompilerConfig,
    pub kind: ScopeKind,
}

pub fn extract_task(category: &str, q: usize) -> String {
    format!("{category}_extract{q}")
}

pub fn extract_bins_task(category: &str, q: usize) -> String {
    format!("{category}_extractBins{q}")
}

pub fn aggregate1_task(category: &str) -> String {
    format!("{category}_aggregate1")
}

pub fn bin_creation_task(group: &str) -> String {
    format!("{group}_bin_creation")
}

fn batch_db(category: &str, q: usize) -> String {
    format!("{category}{q}.db")
}

fn batch_db2(category: &str, q: usize) -> String {
    format!("{category}{q}_2.db")
}

fn aggregate1_db(category: &str) -> String {
    format!("{category}_img2.db")
}

fn bins_file(group: &str) -> String {
    format!("{group}_hist_bins.json")
}

fn files_input(spec: TaskSpec, files: &[String], transfer: bool) -> TaskSpec {
    files.iter()
         .fold(spec, |s, f| s.input(f.clone(), FileBinding::new(f.clone(), transfer)))
}

/// `img.db` y `extract.json`, presentes en ambos scopes de imágenes.
pub fn register_base_artifacts(scope: &mut Scope, kind: ScopeKind, config: &CompilerConfig) {
    let category = kind.base_category();
    scope.register_input(category, BASE_DB, &config.output_path("output.db"), None);
    scope.register_input(category, EXTRACT_OPTIONS, &config.output_path(EXTRACT_OPTIONS), None);
}

/// En el scope de sólo extracción los inputs de batch son archivos ya
/// producidos por una corrida previa.
fn register_batch_inputs(scope: &mut Scope, batch: &ExtractionBatch, config: &CompilerConfig) {
    for file in batch.inputs.keys() {
        scope.register_input(ALL_CATEGORY, file, &config.output_path(file), None);
    }
}

/// Argumentos del Extract de un batch a partir de los de la categoría.
fn extract_arguments(ctx: &AggregationContext<'_>, category: &str, batch: &ExtractionBatch) -> IndexMap<String, Value> {
    let mut args = ctx.template
                      .extract_for(category)
                      .map(|e| e.arguments.clone())
                      .unwrap_or_default();
    args.shift_remove("--input");
    if args.shift_remove("--dimfromroi").is_some() {
        args.insert("--dimfromroi".into(), Value::from(batch.json_inputs().join(" ")));
    }
    if ctx.template.group_of(category).is_some() {
        args.insert("--colors".into(), Value::from(""));
    }
    args.insert("--db".into(), Value::from("db"));
    args.insert("--createdb".into(), Value::from(""));
    args.insert("--inputs".into(), Value::from(batch.image_inputs().join(" ")));
    args
}

fn register_extract(ctx: &AggregationContext<'_>,
                    scope: &mut Scope,
                    category: &str,
                    batch: &ExtractionBatch)
                    -> Result<String, CompileError> {
    if ctx.kind == ScopeKind::ExtractOnly {
        register_batch_inputs(scope, batch, ctx.config);
    }
    let name = extract_task(category, batch.index);
    let db = batch_db(category, batch.index);
    scope.register_output(category, &db, false);
    let mut spec = TaskSpec::new(name.clone(), EXTRACT_EXECUTABLE);
    spec.inputs = batch.inputs.clone();
    spec.arguments = extract_arguments(ctx, category, batch);
    let deps = match ctx.kind {
        ScopeKind::Full => batch.dependencies.clone(),
        ScopeKind::ExtractOnly => Vec::new(),
    };
    let spec = spec.output("db", FileBinding::new(db, false))
                   .depends_on(deps)
                   .walltime(Some(ctx.config.extract_walltime()));
    scope.register_task(spec, ctx.table)?;
    Ok(name)
}

fn register_aggregate1(ctx: &AggregationContext<'_>,
                       scope: &mut Scope,
                       exp: &CategoryExpansion,
                       extracts: Vec<String>)
                       -> Result<String, CompileError> {
    let category = exp.category.as_str();
    let dbs: Vec<String> = exp.batches.iter().map(|b| batch_db(category, b.index)).collect();
    let output = aggregate1_db(category);
    // sin segunda pasada el Report lee directamente esta base
    let transfer = ctx.template.group_of(category).is_none();
    scope.register_output(category, &output, transfer);
    let name = aggregate1_task(category);
    let spec = files_input(TaskSpec::new(name.clone(), AGGREGATE_EXECUTABLE), &dbs, false)
        .input("db", FileBinding::new(BASE_DB, false))
        .output("output", FileBinding::new(output, transfer))
        .arg("--db", "db")
        .arg("--output", "output")
        .arg("--inputs", dbs.join(" "))
        .depends_on(extracts)
        .walltime(Some(ctx.config.aggregate_walltime()));
    scope.register_task(spec, ctx.table)?;
    Ok(name)
}

fn register_bin_creation(ctx: &AggregationContext<'_>,
                         scope: &mut Scope,
                         group: &str,
                         categories: &[&str])
                         -> Result<String, CompileError> {
    let dbs: Vec<String> = categories.iter().map(|c| aggregate1_db(c)).collect();
    let bins = bins_file(group);
    scope.register_output(RAW_CATEGORY, &bins, true);
    let name = bin_creation_task(group);
    let spec = files_input(TaskSpec::new(name.clone(), BIN_EXECUTABLE), &dbs, true)
        .input(EXTRACT_OPTIONS, FileBinding::new(EXTRACT_OPTIONS, false))
        .output("bins", FileBinding::new(bins, true))
        .arg("--inputs", dbs.join(" "))
        .arg("--options", EXTRACT_OPTIONS)
        .arg("--intable", "images")
        .arg("--outtable", "histogramBins")
        .arg("--group", group)
        .arg("--output", "bins")
        .arg("--jsonwrite", "")
        .arg("--overwrite", "")
        .depends_on(categories.iter().map(|c| aggregate1_task(c)));
    scope.register_task(spec, ctx.table)?;
    Ok(name)
}

fn register_extract_bins(ctx: &AggregationContext<'_>,
                         scope: &mut Scope,
                         category: &str,
                         group: &str,
                         batch: &ExtractionBatch)
                         -> Result<(String, String), CompileError> {
    let name = extract_bins_task(category, batch.index);
    let copy = batch_db2(category, batch.index);
    scope.register_output(category, &copy, false);
    let joined = batch.inputs.keys().cloned().collect::<Vec<_>>().join(" ");
    let mut spec = TaskSpec::new(name.clone(), EXTRACT_EXECUTABLE);
    spec.inputs = batch.inputs.clone();
    let spec = spec.input("db", FileBinding::new(batch_db(category, batch.index), false))
                   .input("binfile", FileBinding::new(bins_file(group), false))
                   .output("copydb", FileBinding::new(copy.clone(), false))
                   .arg("--db", "db")
                   .arg("--copydb", "copydb")
                   .arg("--inputs", joined)
                   .arg("--bins", "binfile")
                   .depends_on([bin_creation_task(group)])
                   .walltime(Some(ctx.config.extract_bins_walltime()));
    scope.register_task(spec, ctx.table)?;
    Ok((name, copy))
}

fn register_aggregate2(ctx: &AggregationContext<'_>,
                       scope: &mut Scope,
                       second_pass: &[String],
                       aggregate1_outputs: &[String],
                       deps: Vec<String>)
                       -> Result<(), CompileError> {
    scope.register_output(RAW_CATEGORY, FINAL_DB, true);
    let spec = files_input(TaskSpec::new(AGGREGATE2_TASK, AGGREGATE_EXECUTABLE), second_pass, false);
    let spec = files_input(spec, aggregate1_outputs, false)
        .output("output", FileBinding::new(FINAL_DB, true))
        .arg("--inputs", second_pass.join(" "))
        .arg("--base", aggregate1_outputs.join(" "))
        .arg("--output", "output")
        .depends_on(deps)
        .walltime(Some(ctx.config.aggregate_walltime()));
    scope.register_task(spec, ctx.table)?;
    Ok(())
}

fn register_report(ctx: &AggregationContext<'_>,
                   scope: &mut Scope,
                   inputs: &[String],
                   deps: Vec<String>)
                   -> Result<(), CompileError> {
    scope.register_output(RAW_CATEGORY, REPORT_LOG, true);
    let spec = files_input(TaskSpec::new(REPORT_TASK, REPORT_EXECUTABLE), inputs, true)
        .output("output", FileBinding::new(REPORT_LOG, true))
        .arg("--inputs", inputs.join(" "))
        .arg("--output", "output")
        .depends_on(deps);
    scope.register_task(spec, ctx.table)?;
    Ok(())
}

/// Registra la agregación completa sobre las categorías expandidas.
pub fn aggregate(ctx: &AggregationContext<'_>,
                 scope: &mut Scope,
                 expansions: &[CategoryExpansion])
                 -> Result<(), CompileError> {
    let active: Vec<&CategoryExpansion> = expansions.iter().filter(|e| !e.batches.is_empty()).collect();
    if active.is_empty() {
        warn!("aggregate:skip scope={} reason=no_batches", scope.name());
        return Ok(());
    }

    let mut aggregate1: Vec<(String, String)> = Vec::new();
    for exp in &active {
        let mut extracts = Vec::with_capacity(exp.batches.len());
        for batch in &exp.batches {
            extracts.push(register_extract(ctx, scope, &exp.category, batch)?);
        }
        let task = register_aggregate1(ctx, scope, exp, extracts)?;
        aggregate1.push((exp.category.clone(), task));
    }
    let aggregate1_outputs: Vec<String> = active.iter().map(|e| aggregate1_db(&e.category)).collect();

    let mut second_pass: Vec<String> = Vec::new();
    let mut aggregate2_deps: Vec<String> = Vec::new();
    if let Some(binning) = ctx.template.binning() {
        // cada categoría pertenece a un solo grupo: el primero que la nombra
        for group in binning.group.keys() {
            let present: Vec<&str> = active.iter()
                                           .map(|e| e.category.as_str())
                                           .filter(|c| ctx.template.group_of(c) == Some(group.as_str()))
                                           .collect();
            if present.is_empty() {
                debug!("aggregate:bin_skip group={group}");
                continue;
            }
            register_bin_creation(ctx, scope, group, &present)?;
            for exp in active.iter().filter(|e| present.contains(&e.category.as_str())) {
                for batch in &exp.batches {
                    let (task, db) = register_extract_bins(ctx, scope, &exp.category, group, batch)?;
                    aggregate2_deps.push(task);
                    second_pass.push(db);
                }
            }
        }
        aggregate2_deps.extend(aggregate1.iter()
                                         .filter(|(c, _)| ctx.template.group_of(c).is_none())
                                         .map(|(_, t)| t.clone()));
    }

    if second_pass.is_empty() {
        register_report(ctx, scope, &aggregate1_outputs, aggregate1.into_iter().map(|(_, t)| t).collect())?;
    } else {
        register_aggregate2(ctx, scope, &second_pass, &aggregate1_outputs, aggregate2_deps)?;
        register_report(ctx, scope, &[FINAL_DB.to_string()], vec![AGGREGATE2_TASK.to_string()])?;
    }
    debug!("aggregate:done scope={} categories={} binned={}",
           scope.name(),
           active.len(),
           !second_pass.is_empty());
    Ok(())
}
