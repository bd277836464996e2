//! Grafo de estadísticas sobre la base de datos final de una corrida.
//!
//! Cada categoría aporta una cadena `<category>_<step>`; las tablas se
//! prefijan con la categoría (salvo `images`, la tabla común) y todos los
//! tasks leen el `output.db` compartido.
use harvest_core::constants::RAW_CATEGORY;
use harvest_core::{FileBinding, GraphDescriptor, Scope, SignatureTable, TaskSpec};
use log::{debug, info};
use serde_json::Value;

use crate::config::CompilerConfig;
use crate::expander::register_raw_files;
use crate::template::{basename, StatisticsTemplate, StepTemplate};
use crate::CompileError;

pub const STATISTICS_SCOPE: &str = "statistics";
pub const STATISTICS_DB: &str = "output.db";
const COMMON_TABLE: &str = "images";

pub struct StatisticsCompiler {
    template: StatisticsTemplate,
    table: SignatureTable,
    config: CompilerConfig,
}

fn input_table(category: &str, name: &str) -> String {
    if name == COMMON_TABLE {
        name.to_string()
    } else {
        format!("{category}_{name}")
    }
}

fn output_table(category: &str, name: &str) -> String {
    format!("{category}_{name}")
}

fn template_str<'a>(step: &'a StepTemplate, flag: &str) -> Option<&'a str> {
    step.arguments.get(flag).and_then(Value::as_str)
}

impl StatisticsCompiler {
    pub fn new(template: StatisticsTemplate, table: SignatureTable, config: CompilerConfig) -> Self {
        Self { template,
               table,
               config }
    }

    fn declares(&self, executable: &str, flag: &str) -> bool {
        self.table
            .get(executable)
            .and_then(|s| s.arguments.as_ref())
            .is_some_and(|a| a.contains_key(flag))
    }

    fn step_spec(&self, category: &str, step: &StepTemplate) -> TaskSpec {
        let raw_files = self.template.raw_files(category);
        let mut spec = TaskSpec::new(format!("{category}_{}", step.name), step.executable.clone())
            .input(STATISTICS_DB, FileBinding::new(STATISTICS_DB, true));
        for slot in step.inputs.iter().filter(|s| raw_files.contains(*s)) {
            spec = spec.input(slot.clone(), FileBinding::new(basename(slot), false));
        }
        spec.arguments = step.arguments.clone();

        let intable = template_str(step, "--intable").or(step.inputs.first().map(String::as_str));
        let outtable = template_str(step, "--outtable").or(step.outputs.first().map(String::as_str));
        for flag in ["--intable", "--table"] {
            if let (true, Some(t)) = (self.declares(&step.executable, flag), intable) {
                spec.arguments.insert(flag.into(), Value::from(input_table(category, t)));
            }
        }
        if let (true, Some(t)) = (self.declares(&step.executable, "--outtable"), outtable) {
            spec.arguments.insert("--outtable".into(), Value::from(output_table(category, t)));
        }
        spec.arguments.insert("--db".into(), Value::from(STATISTICS_DB));
        spec
    }

    /// Compila el template completo en el scope `statistics`.
    ///
    /// Sin `depends` explícito, el primer task de cada categoría depende del
    /// último de la categoría anterior; el marcador se consume en cuanto un
    /// task no final de la cadena lo usa.
    pub fn compile(&self) -> Result<GraphDescriptor, CompileError> {
        let mut scope = Scope::new(STATISTICS_SCOPE);
        scope.register_input(RAW_CATEGORY, STATISTICS_DB, &self.config.output_path(STATISTICS_DB), None);

        let mut serial: Vec<String> = Vec::new();
        for (category, steps) in &self.template.workflows {
            register_raw_files(&mut scope, category, self.template.raw_files(category));
            for (i, step) in steps.iter().enumerate() {
                let deps = match &step.depends {
                    Some(deps) => {
                        let mut mapped = Vec::with_capacity(deps.len());
                        for d in deps {
                            if !steps[..i].iter().any(|s| &s.name == d) {
                                return Err(CompileError::UnknownStep { category: category.clone(),
                                                                       task: step.name.clone(),
                                                                       step: d.clone() });
                            }
                            mapped.push(format!("{category}_{d}"));
                        }
                        mapped
                    }
                    None => serial.clone(),
                };
                let spec = self.step_spec(category, step)
                               .depends_on(deps)
                               .walltime(self.config.stats_walltime());
                let name = spec.name.clone();
                scope.register_task(spec, &self.table)?;
                serial = if i + 1 == steps.len() { vec![name] } else { Vec::new() };
            }
            debug!("statistics:category category={} steps={}", category, steps.len());
        }

        let graph = scope.finish();
        info!("statistics:done tasks={} fingerprint={}", graph.tasks.len(), graph.fingerprint);
        Ok(graph)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use harvest_core::ArgumentValue;

    const TEMPLATE: &str = r#"{
        "workflows": {
            "rgbsv": [
                {"name": "shoot", "executable": "ih-stats-shoot-area", "inputs": ["images"], "outputs": ["shootArea"],
                 "arguments": {"--grouping": ["treatment", "genotype"]}},
                {"name": "norm", "executable": "ih-stats-normalize", "inputs": ["shootArea"], "outputs": ["normalized"],
                 "arguments": {"--column": "pixels"}}
            ],
            "fluosv": [
                {"name": "thresh", "executable": "ih-stats-threshold", "inputs": ["images"], "outputs": ["cut"],
                 "arguments": {"--thresh": 0.5}}
            ]
        }
    }"#;

    fn compile(json: &str) -> Result<GraphDescriptor, CompileError> {
        let t = StatisticsTemplate::from_json_str(json).unwrap();
        let config = CompilerConfig { maxwalltime: crate::config::MaxWalltime { stats: Some(30),
                                                                                ..Default::default() },
                                      ..Default::default() };
        StatisticsCompiler::new(t, SignatureTable::builtin(), config).compile()
    }

    #[test]
    fn tables_are_prefixed_except_images() {
        let g = compile(TEMPLATE).unwrap();
        let shoot = g.task("rgbsv_shoot").unwrap();
        assert_eq!(shoot.argument("--intable").map(ArgumentValue::as_str), Some("images"));
        assert_eq!(shoot.argument("--outtable").map(ArgumentValue::as_str), Some("rgbsv_shootArea"));
        assert_eq!(shoot.argument("--db"), Some(&ArgumentValue::File("output.db".into())));
        let norm = g.task("rgbsv_norm").unwrap();
        assert_eq!(norm.argument("--intable").map(ArgumentValue::as_str), Some("rgbsv_shootArea"));
        assert_eq!(norm.walltime, Some(30));
        assert!(g.diagnostics.is_empty(), "{:?}", g.diagnostics);
    }

    #[test]
    fn every_statistics_task_binds_the_shared_db() {
        let json = r#"{"workflows": {"rgbsv": [
            {"name": "thresh", "executable": "ih-stats-threshold", "inputs": ["images"], "outputs": ["cut"],
             "arguments": {"--thresh": 0.5}},
            {"name": "export", "executable": "ih-stats-export", "inputs": ["cut"], "outputs": ["none"],
             "arguments": {"--fname": "cut.csv"}}
        ]}}"#;
        let g = compile(json).unwrap();
        assert!(g.diagnostics.is_empty(), "{:?}", g.diagnostics);
        for name in ["rgbsv_thresh", "rgbsv_export"] {
            assert_eq!(g.task(name).unwrap().argument("--db"), Some(&ArgumentValue::File("output.db".into())));
        }
        let export = g.task("rgbsv_export").unwrap();
        assert_eq!(export.argument("--table").map(ArgumentValue::as_str), Some("rgbsv_cut"));
    }

    #[test]
    fn serial_marker_links_categories() {
        let g = compile(TEMPLATE).unwrap();
        assert!(g.task("rgbsv_shoot").unwrap().dependencies.is_empty());
        // el marcador sólo existe tras el último paso de la categoría
        assert!(g.task("rgbsv_norm").unwrap().dependencies.is_empty());
        assert_eq!(g.task("fluosv_thresh").unwrap().dependencies, vec!["rgbsv_norm".to_string()]);
        assert!(g.topological_order().is_ok());
    }

    #[test]
    fn explicit_depends_must_name_an_earlier_step() {
        let bad = r#"{"workflows": {"rgbsv": [
            {"name": "a", "executable": "ih-stats-anova", "inputs": ["images"], "outputs": ["x"], "depends": ["b"]},
            {"name": "b", "executable": "ih-stats-anova", "inputs": ["images"], "outputs": ["y"]}
        ]}}"#;
        assert!(matches!(compile(bad), Err(CompileError::UnknownStep { .. })));
    }
}
