use harvest_compiler::CompilerConfig;
use harvest_core::{GraphDescriptor, Severity, SignatureTable};
use harvestflow::config::RunPaths;
use harvestflow::errors::HarvestError;
use harvestflow::{compile_paths, compile_sources, RunOutput};

const DEMO_TEMPLATE: &str = r#"{
    "workflows": {
        "rgbsv": [
            {"name": "gray", "executable": "ih-convert-color", "inputs": ["base"], "outputs": ["gray"],
             "arguments": {"--intype": "bgr", "--outtype": "gray"}},
            {"name": "thresh", "executable": "ih-threshold", "inputs": ["gray"], "outputs": ["final"],
             "arguments": {"--thresh": 120}}
        ]
    },
    "extract": {"workflows": {"rgbsv": {"inputs": ["final"], "depends": ["thresh"], "arguments": {"--pixels": ""}}}}
}"#;

const DEMO_CATALOG: &str = r#"[
    {"pegasusid": "1", "imtype": "rgbsv", "experiment": "demo", "id": "001", "date": "2015-07-01",
     "imgname": "side0", "path": "/data/demo/1.png"},
    {"pegasusid": "2", "imtype": "rgbsv", "experiment": "demo", "id": "002", "date": "2015-07-01",
     "imgname": "side0", "path": "/data/demo/2.png"}
]"#;

fn print_graph(g: &GraphDescriptor) {
    println!("[{}] tasks={} artifacts={} edges={} fingerprint={}",
             g.name,
             g.tasks.len(),
             g.artifacts.len(),
             g.edges.len(),
             g.fingerprint);
    if !g.conflicts.is_empty() {
        println!("[{}] conflictos de identidad: {}", g.name, g.conflicts.len());
    }
}

fn print_output(out: &RunOutput) {
    println!("run_id={} compiled_at={}", out.run.run_id, out.run.compiled_at.to_rfc3339());
    if let Some(d) = &out.run.catalog_digest {
        println!("catalog_digest={d}");
    }
    print_graph(&out.run.full);
    print_graph(&out.run.extract_only);
    if let Some(stats) = &out.statistics {
        print_graph(stats);
    }
    for d in &out.run.diagnostics {
        let tag = match d.severity {
            Severity::Error => "ERROR",
            Severity::Warning => "WARN",
        };
        eprintln!("[{tag}] {}: {}", d.task, d.message);
    }
}

fn emit_json(out: &RunOutput) -> Result<(), HarvestError> {
    if std::env::var("HARVEST_EMIT_JSON").ok().as_deref() == Some("1") {
        let text = serde_json::to_string_pretty(out).map_err(|e| HarvestError::Internal(e.to_string()))?;
        println!("{text}");
    }
    Ok(())
}

fn run() -> Result<(), HarvestError> {
    let out = match RunPaths::from_env() {
        Ok(paths) => compile_paths(&paths)?,
        Err(HarvestError::Config(msg)) => {
            eprintln!("[demo] {msg}; compilando template de ejemplo");
            compile_sources(DEMO_TEMPLATE,
                            DEMO_CATALOG,
                            None,
                            SignatureTable::builtin(),
                            CompilerConfig::from_env())?
        }
        Err(e) => return Err(e),
    };
    print_output(&out);
    emit_json(&out)?;
    if out.run.has_errors() {
        return Err(HarvestError::Config("el template produjo diagnósticos de error".into()));
    }
    Ok(())
}

fn main() {
    if let Err(e) = run() {
        eprintln!("[harvest-compile] Error: {e}");
        std::process::exit(1);
    }
}
