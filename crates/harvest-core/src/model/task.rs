//! Task del grafo y su especificación de registro.
//!
//! `TaskSpec` es lo que entrega el expander/agregador al registry;
//! `Task` es la instancia resuelta (argumentos ya ligados a archivos) que
//! termina en el `GraphDescriptor`.
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::FileBinding;

/// Valor emitido para un argumento de línea de comandos.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum ArgumentValue {
    /// Nombre de un archivo ligado (input u output) del task.
    File(String),
    /// Valor literal (posiblemente vacío para flags).
    Literal(String),
}

impl ArgumentValue {
    pub fn as_str(&self) -> &str {
        match self {
            ArgumentValue::File(f) => f,
            ArgumentValue::Literal(v) => v,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResolvedArgument {
    pub flag: String,
    pub value: ArgumentValue,
}

/// Pedido de registro de un task. Los argumentos son el template crudo; el
/// registry los resuelve contra la firma del ejecutable y los bindings.
#[derive(Debug, Clone, Default)]
pub struct TaskSpec {
    pub name: String,
    pub executable: String,
    pub inputs: IndexMap<String, FileBinding>,
    pub outputs: IndexMap<String, FileBinding>,
    pub arguments: IndexMap<String, Value>,
    pub dependencies: Vec<String>,
    pub label: Option<String>,
    pub walltime: Option<u32>,
}

impl TaskSpec {
    pub fn new(name: impl Into<String>, executable: impl Into<String>) -> Self {
        Self { name: name.into(),
               executable: executable.into(),
               ..Default::default() }
    }

    pub fn input(mut self, slot: impl Into<String>, binding: FileBinding) -> Self {
        self.inputs.insert(slot.into(), binding);
        self
    }

    pub fn output(mut self, slot: impl Into<String>, binding: FileBinding) -> Self {
        self.outputs.insert(slot.into(), binding);
        self
    }

    pub fn arg(mut self, flag: impl Into<String>, value: impl Into<Value>) -> Self {
        self.arguments.insert(flag.into(), value.into());
        self
    }

    pub fn depends_on<I, S>(mut self, deps: I) -> Self
        where I: IntoIterator<Item = S>,
              S: Into<String>
    {
        self.dependencies.extend(deps.into_iter().map(Into::into));
        self
    }

    pub fn label(mut self, label: Option<String>) -> Self {
        self.label = label;
        self
    }

    pub fn walltime(mut self, walltime: Option<u32>) -> Self {
        self.walltime = walltime;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Task {
    pub name: String,
    pub executable: String,
    pub arguments: Vec<ResolvedArgument>,
    pub inputs: IndexMap<String, FileBinding>,
    pub outputs: IndexMap<String, FileBinding>,
    pub dependencies: Vec<String>,
    pub label: Option<String>,
    pub walltime: Option<u32>,
}

impl Task {
    /// Lista plana `flag value flag value ...` tal como la vería el ejecutable.
    pub fn argv(&self) -> Vec<String> {
        let mut out = Vec::with_capacity(self.arguments.len() * 2);
        for a in &self.arguments {
            out.push(a.flag.clone());
            out.push(a.value.as_str().to_string());
        }
        out
    }

    pub fn argument(&self, flag: &str) -> Option<&ArgumentValue> {
        self.arguments.iter().find(|a| a.flag == flag).map(|a| &a.value)
    }

    pub fn input_files(&self) -> impl Iterator<Item = &str> {
        self.inputs.values().map(|b| b.file.as_str())
    }

    pub fn output_files(&self) -> impl Iterator<Item = &str> {
        self.outputs.values().map(|b| b.file.as_str())
    }
}
