//! Compilación completa desde archivos JSON, como la ejecuta el binario.

use std::fs;
use std::path::Path;

use harvestflow::config::RunPaths;
use harvestflow::errors::HarvestError;
use harvestflow::{compile_paths, compile_sources};
use harvest_compiler::CompilerConfig;
use harvest_core::{ArtifactRole, ConflictKind, SignatureTable};
use serde_json::json;
use uuid::Uuid;

fn template() -> serde_json::Value {
    json!({
        "workflows": {
            "rgbsv": [
                {"name": "gray", "executable": "ih-convert-color", "inputs": ["base"], "outputs": ["gray"],
                 "arguments": {"--intype": "bgr", "--outtype": "gray"}},
                {"name": "crop", "executable": "ih-crop", "inputs": ["gray", "/templates/pot_roi.json"],
                 "outputs": ["final"], "arguments": {"--ystart": 10}}
            ],
            "fluosv": [
                {"name": "shift", "executable": "ih-meanshift", "inputs": ["base"], "outputs": ["final"],
                 "arguments": {"--spatial_radius": 2, "--range_radius": 2, "--min_density": 50}}
            ]
        },
        "extract": {
            "workflows": {
                "rgbsv": {"inputs": ["final"], "depends": ["crop"], "arguments": {"--dimfromroi": "/templates/pot_roi.json"}},
                "fluosv": {"inputs": ["final"], "depends": [], "arguments": {"--pixels": ""}}
            },
            "histogram-bin": {"--group": {"vis": ["rgbsv"]}, "--chunks": {"vis": 5}}
        },
        "raw-files": {"rgbsv": ["/templates/pot_roi.json"]}
    })
}

fn catalog(n: usize) -> serde_json::Value {
    let rows: Vec<serde_json::Value> = (0..n).flat_map(|i| {
                                                 ["rgbsv", "fluosv"].map(|c| {
                                                                        json!({"pegasusid": format!("{c}{i}"),
                                                                               "imtype": c,
                                                                               "experiment": "Exp 1",
                                                                               "id": format!("{i:03}"),
                                                                               "date": "2015-07-01",
                                                                               "imgname": "side0",
                                                                               "path": format!("/data/{c}/{i}.jpg")})
                                                                    })
                                             })
                                             .collect();
    json!(rows)
}

fn stats_template() -> serde_json::Value {
    json!({"workflows": {"rgbsv": [
        {"name": "shoot", "executable": "ih-stats-shoot-area", "inputs": ["images"], "outputs": ["shootArea"],
         "arguments": {"--grouping": ["treatment"]}}
    ]}})
}

fn write_tmp(dir: &Path, name: &str, value: &serde_json::Value) -> String {
    let path = dir.join(name);
    fs::write(&path, value.to_string()).expect("write fixture");
    path.to_string_lossy().into_owned()
}

#[test]
fn compiles_from_files_with_statistics() {
    let dir = std::env::temp_dir().join(format!("harvestflow-{}", Uuid::new_v4()));
    fs::create_dir_all(&dir).expect("tmp dir");
    let paths = RunPaths { template: write_tmp(&dir, "template.json", &template()),
                           catalog: write_tmp(&dir, "catalog.json", &catalog(12)),
                           config: Some(write_tmp(&dir, "config.json", &json!({"cluster": 5, "extract_batch_size": 5}))),
                           stats_template: Some(write_tmp(&dir, "stats.json", &stats_template())),
                           signatures: None };
    let out = compile_paths(&paths).expect("compile");
    let _ = fs::remove_dir_all(&dir);

    let g = &out.run.full;
    // 12 registros por categoría, batches de 5
    for q in 0..3 {
        assert!(g.task(&format!("rgbsv_extract{q}")).is_some());
        assert!(g.task(&format!("fluosv_extract{q}")).is_some());
    }
    assert!(g.task("rgbsv_extract3").is_none());
    assert_eq!(g.task("vis_bin_creation").unwrap().dependencies, vec!["rgbsv_aggregate1".to_string()]);
    let agg2 = &g.task("sql_aggregate2").unwrap().dependencies;
    assert!(agg2.contains(&"fluosv_aggregate1".to_string()));
    assert!(agg2.contains(&"rgbsv_extractBins2".to_string()));
    assert_eq!(g.sinks(), vec!["error-log"]);
    assert!(g.topological_order().is_ok());

    // el marcador serial alimenta la extracción de fluosv
    let extract0 = g.task("fluosv_extract0").unwrap();
    assert_eq!(extract0.dependencies.len(), 5);
    assert!(extract0.dependencies.iter().all(|d| d.ends_with("_shift")));

    // los espacios del experimento no llegan a los nombres
    assert!(g.task_names().all(|n| !n.contains(' ')));
    assert!(g.tasks.values().filter(|t| t.executable == "ih-meanshift").all(|t| t.label.is_some()));

    let stats = out.statistics.expect("statistics graph");
    assert!(stats.task("rgbsv_shoot").is_some());
    assert!(out.run.diagnostics.is_empty(), "{:?}", out.run.diagnostics);

    let json = serde_json::to_value(&out.run).expect("serializable");
    assert!(json["full"]["tasks"]["error-log"].is_object());
}

#[test]
fn duplicate_catalog_rows_keep_the_first_and_record_a_conflict() {
    let rows = json!([
        {"pegasusid": "1", "imtype": "rgbsv", "path": "/a.png"},
        {"pegasusid": "1", "imtype": "rgbsv", "path": "/b.png"}
    ]);
    let out = compile_sources(&template().to_string(),
                              &rows.to_string(),
                              None,
                              SignatureTable::builtin(),
                              CompilerConfig::default()).expect("duplicates do not abort");
    let g = &out.run.full;
    assert_eq!(g.tasks.values().filter(|t| t.executable == "ih-crop").count(), 1);
    let source = g.artifacts
                  .iter()
                  .find(|a| a.role == ArtifactRole::Input && a.name.ends_with("_base.png"))
                  .expect("source image");
    assert_eq!(source.path.as_deref(), Some("/a.png"));
    assert!(g.conflicts
             .iter()
             .any(|c| c.kind == ConflictKind::Artifact && c.identity.ends_with("_base.png")),
            "{:?}",
            g.conflicts);
    assert_eq!(g.sinks(), vec!["error-log"]);
}

#[test]
fn unknown_executable_aborts_compilation() {
    let t = json!({"workflows": {"rgbsv": [
        {"name": "blur", "executable": "ih-unknown", "inputs": ["base"], "outputs": ["final"]}
    ]}});
    let err = compile_sources(&t.to_string(),
                              &catalog(1).to_string(),
                              None,
                              SignatureTable::builtin(),
                              CompilerConfig::default()).unwrap_err();
    assert!(matches!(err, HarvestError::Compile(_)));
    assert_eq!(err.to_string(), "unknown executable 'ih-unknown'");
}

#[test]
fn malformed_config_file_is_a_config_error() {
    let dir = std::env::temp_dir().join(format!("harvestflow-{}", Uuid::new_v4()));
    fs::create_dir_all(&dir).expect("tmp dir");
    let paths = RunPaths { template: write_tmp(&dir, "template.json", &template()),
                           catalog: write_tmp(&dir, "catalog.json", &catalog(1)),
                           config: Some(write_tmp(&dir, "config.json", &json!({"cluster": "many"}))),
                           ..Default::default() };
    let err = compile_paths(&paths).unwrap_err();
    let _ = fs::remove_dir_all(&dir);
    assert!(matches!(err, HarvestError::Compile(harvest_compiler::CompileError::Config(_))));
}
