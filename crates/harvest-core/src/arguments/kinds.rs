use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Lado de los bindings del que un argumento `Derived` toma su slot.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SlotSide {
    Inputs,
    Outputs,
}

/// Tipo de argumento declarado en el esquema de un ejecutable.
///
/// La forma serializada sigue la tabla de firmas en JSON:
/// `{"type": "derived", "key": "inputs", "index": 0, "required": true}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ArgumentKind {
    /// Toma el slot `index` de inputs/outputs del task (o `value` fijo).
    Derived {
        key: SlotSide,
        index: usize,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<String>,
    },
    /// Siempre emite `value`, ignorando lo que traiga el template.
    Overwrite { value: String },
    Numeric,
    #[serde(rename = "string")]
    StringVal {
        #[serde(default)]
        complex: bool,
    },
    #[serde(rename = "list")]
    ListVal {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        join: Option<String>,
    },
    #[serde(rename = "dict")]
    DictVal,
    /// Flag sin valor (`--pixels`).
    #[serde(rename = "exist")]
    Exists,
}

impl ArgumentKind {
    /// Nombre corto usado en diagnósticos.
    pub fn label(&self) -> &'static str {
        match self {
            ArgumentKind::Derived { .. } => "derived",
            ArgumentKind::Overwrite { .. } => "overwrite",
            ArgumentKind::Numeric => "numeric",
            ArgumentKind::StringVal { .. } => "string",
            ArgumentKind::ListVal { .. } => "list",
            ArgumentKind::DictVal => "dict",
            ArgumentKind::Exists => "exist",
        }
    }

    /// Verifica que el valor del template tenga la forma esperada.
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            ArgumentKind::Derived { .. } | ArgumentKind::Exists => true,
            ArgumentKind::Overwrite { .. } => true,
            ArgumentKind::Numeric => value.is_number(),
            ArgumentKind::StringVal { .. } => value.is_string(),
            ArgumentKind::ListVal { .. } => value.is_array(),
            ArgumentKind::DictVal => value.is_object(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ArgumentSchema {
    #[serde(flatten)]
    pub kind: ArgumentKind,
    #[serde(default)]
    pub required: bool,
}

impl ArgumentSchema {
    pub fn new(kind: ArgumentKind) -> Self {
        Self { kind,
               required: false }
    }

    pub fn required(kind: ArgumentKind) -> Self {
        Self { kind,
               required: true }
    }
}
