//! Modelo serde del template de pipeline y del template de estadísticas.
//!
//! Se asume pre-validado: aquí sólo se deserializa y se exponen consultas
//! (grupo de histograma de una categoría, raw files, save-steps).
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::CompileError;

/// Un paso de la cadena por registro.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StepTemplate {
    pub name: String,
    pub executable: String,
    #[serde(default)]
    pub inputs: Vec<String>,
    #[serde(default)]
    pub outputs: Vec<String>,
    #[serde(default)]
    pub arguments: IndexMap<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depends: Option<Vec<String>>,
}

/// Extracción de una categoría: qué archivos se extraen y después de qué
/// pasos de la cadena.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ExtractSpec {
    #[serde(default)]
    pub inputs: Vec<String>,
    #[serde(default)]
    pub depends: Vec<String>,
    #[serde(default)]
    pub arguments: IndexMap<String, Value>,
}

impl ExtractSpec {
    /// Valor de `--dimfromroi` si la extracción lo pide.
    pub fn dim_from_roi(&self) -> Option<&str> {
        self.arguments.get("--dimfromroi").and_then(Value::as_str)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct HistogramBin {
    #[serde(rename = "--group", default)]
    pub group: IndexMap<String, Vec<String>>,
    #[serde(rename = "--channels", default)]
    pub channels: IndexMap<String, Value>,
    #[serde(rename = "--chunks", default)]
    pub chunks: IndexMap<String, Value>,
}

impl HistogramBin {
    pub fn group_of(&self, category: &str) -> Option<&str> {
        self.group
            .iter()
            .find(|(_, cats)| cats.iter().any(|c| c == category))
            .map(|(g, _)| g.as_str())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ExtractSection {
    #[serde(default)]
    pub workflows: IndexMap<String, ExtractSpec>,
    #[serde(rename = "histogram-bin", default, skip_serializing_if = "Option::is_none")]
    pub histogram_bin: Option<HistogramBin>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TemplateOptions {
    /// Presente (y distinto de `false`) => se transfieren todos los
    /// intermedios por registro.
    #[serde(rename = "save-steps", default, skip_serializing_if = "Option::is_none")]
    pub save_steps: Option<Value>,
}

impl TemplateOptions {
    pub fn save_steps(&self) -> bool {
        !matches!(self.save_steps, None | Some(Value::Bool(false)))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PipelineTemplate {
    pub workflows: IndexMap<String, Vec<StepTemplate>>,
    #[serde(default)]
    pub extract: ExtractSection,
    #[serde(default)]
    pub options: TemplateOptions,
    #[serde(rename = "raw-files", default)]
    pub raw_files: IndexMap<String, Vec<String>>,
}

impl PipelineTemplate {
    pub fn from_json_str(s: &str) -> Result<Self, CompileError> {
        serde_json::from_str(s).map_err(|e| CompileError::Template(e.to_string()))
    }

    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.workflows.keys().map(String::as_str)
    }

    pub fn steps(&self, category: &str) -> &[StepTemplate] {
        self.workflows.get(category).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn extract_for(&self, category: &str) -> Option<&ExtractSpec> {
        self.extract.workflows.get(category)
    }

    pub fn raw_files(&self, category: &str) -> &[String] {
        self.raw_files.get(category).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn binning(&self) -> Option<&HistogramBin> {
        self.extract.histogram_bin.as_ref()
    }

    pub fn group_of(&self, category: &str) -> Option<&str> {
        self.binning().and_then(|h| h.group_of(category))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StatisticsTemplate {
    pub workflows: IndexMap<String, Vec<StepTemplate>>,
    #[serde(rename = "raw-files", default)]
    pub raw_files: IndexMap<String, Vec<String>>,
}

impl StatisticsTemplate {
    pub fn from_json_str(s: &str) -> Result<Self, CompileError> {
        serde_json::from_str(s).map_err(|e| CompileError::Template(e.to_string()))
    }

    pub fn raw_files(&self, category: &str) -> &[String] {
        self.raw_files.get(category).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Nombre base de una ruta (`/a/b/roi.json` -> `roi.json`).
pub fn basename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEMPLATE: &str = r#"{
        "workflows": {
            "rgbsv": [
                {"name": "gray", "executable": "ih-convert-color", "inputs": ["base"], "outputs": ["gray"],
                 "arguments": {"--intype": "bgr", "--outtype": "gray"}}
            ]
        },
        "extract": {
            "workflows": {"rgbsv": {"inputs": ["gray"], "depends": ["gray"], "arguments": {"--dimfromroi": "pot"}}},
            "histogram-bin": {"--group": {"vis": ["rgbsv", "rgbtv"]}, "--channels": {"vis": [[0], [1]]}, "--chunks": {"vis": 5}}
        },
        "options": {"save-steps": true},
        "raw-files": {"rgbsv": ["/templates/pot_roi.json"]}
    }"#;

    #[test]
    fn template_parses_renamed_keys() {
        let t = PipelineTemplate::from_json_str(TEMPLATE).unwrap();
        assert_eq!(t.categories().collect::<Vec<_>>(), vec!["rgbsv"]);
        assert!(t.options.save_steps());
        assert_eq!(t.group_of("rgbtv"), Some("vis"));
        assert_eq!(t.group_of("fluosv"), None);
        assert_eq!(t.extract_for("rgbsv").and_then(ExtractSpec::dim_from_roi), Some("pot"));
        assert_eq!(t.raw_files("rgbsv"), &["/templates/pot_roi.json".to_string()]);
        assert!(t.raw_files("nir").is_empty());
        assert!(t.steps("rgbsv")[0].depends.is_none());
    }

    #[test]
    fn save_steps_false_or_absent_is_off() {
        assert!(!TemplateOptions::default().save_steps());
        let o: TemplateOptions = serde_json::from_str(r#"{"save-steps": false}"#).unwrap();
        assert!(!o.save_steps());
    }

    #[test]
    fn malformed_template_is_a_template_error() {
        assert!(matches!(PipelineTemplate::from_json_str("{\"workflows\": 3}"), Err(CompileError::Template(_))));
    }

    #[test]
    fn basename_strips_directories() {
        assert_eq!(basename("/a/b/roi.json"), "roi.json");
        assert_eq!(basename("roi.json"), "roi.json");
    }
}
