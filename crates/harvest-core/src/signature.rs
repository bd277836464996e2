//! Tabla de firmas de ejecutables.
//!
//! Cada ejecutable declara sus slots tipados de entrada/salida, el esquema de
//! argumentos y (opcionalmente) un peso relativo que alimenta el clustering
//! ponderado. La tabla es configuración externa de sólo lectura; `builtin()`
//! refleja el set de herramientas `ih-*`.
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::arguments::{ArgumentKind, ArgumentSchema, SlotSide};
use crate::errors::GraphError;

/// Tipo de un slot de archivo.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SlotType {
    Image,
    Roi,
    Binfile,
    Csv,
    Table,
    None,
}

impl SlotType {
    /// Extensión de los archivos producidos para este tipo de slot.
    pub fn extension(&self) -> Option<&'static str> {
        match self {
            SlotType::Image => Some(".png"),
            SlotType::Roi | SlotType::Binfile => Some(".json"),
            SlotType::Csv => Some(".csv"),
            SlotType::Table | SlotType::None => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ExecutableClass {
    Imgproc,
    System,
    Statistics,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExecutableSignature {
    #[serde(rename = "type")]
    pub class: ExecutableClass,
    #[serde(default)]
    pub inputs: Vec<SlotType>,
    #[serde(default)]
    pub outputs: Vec<SlotType>,
    /// `None` para ejecutables "system" sin esquema.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<IndexMap<String, ArgumentSchema>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
}

impl ExecutableSignature {
    pub fn system() -> Self {
        Self { class: ExecutableClass::System,
               inputs: vec![],
               outputs: vec![],
               arguments: None,
               weight: None }
    }

    pub fn input_type(&self, index: usize) -> Option<SlotType> {
        self.inputs.get(index).copied()
    }

    pub fn output_type(&self, index: usize) -> Option<SlotType> {
        self.outputs.get(index).copied()
    }
}

/// Registro nombre -> firma. Se deserializa directamente desde un objeto JSON.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct SignatureTable {
    entries: IndexMap<String, ExecutableSignature>,
}

impl SignatureTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, sig: ExecutableSignature) {
        self.entries.insert(name.into(), sig);
    }

    pub fn get(&self, name: &str) -> Option<&ExecutableSignature> {
        self.entries.get(name)
    }

    pub fn require(&self, name: &str) -> Result<&ExecutableSignature, GraphError> {
        self.get(name).ok_or_else(|| GraphError::UnknownExecutable(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn weight(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(|s| s.weight)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Tabla incorporada con las herramientas de procesamiento, extracción,
    /// agregación y estadística conocidas.
    pub fn builtin() -> Self {
        let mut t = Self::new();
        let single = || (vec![SlotType::Image], vec![SlotType::Image]);

        let (i, o) = single();
        t.insert("ih-resize",
                 imgproc(i,
                         o,
                         vec![("--scale", ArgumentSchema::new(ArgumentKind::Numeric)),
                              ("--width", ArgumentSchema::new(ArgumentKind::Numeric)),
                              ("--height", ArgumentSchema::new(ArgumentKind::Numeric))]));
        t.insert("ih-color-filter",
                 imgproc(vec![SlotType::Image, SlotType::Roi],
                         vec![SlotType::Image],
                         vec![("--roi", derived(SlotSide::Inputs, 1, false)),
                              ("--logic", ArgumentSchema::required(ArgumentKind::StringVal { complex: true }))]));
        let (i, o) = single();
        t.insert("ih-convert-color",
                 imgproc(i,
                         o,
                         vec![("--intype", ArgumentSchema::required(ArgumentKind::StringVal { complex: false })),
                              ("--outtype", ArgumentSchema::required(ArgumentKind::StringVal { complex: false }))]));
        let (i, o) = single();
        t.insert("ih-threshold",
                 imgproc(i,
                         o,
                         vec![("--thresh", ArgumentSchema::required(ArgumentKind::Numeric)),
                              ("--max", ArgumentSchema::new(ArgumentKind::Numeric)),
                              ("--type", ArgumentSchema::new(ArgumentKind::StringVal { complex: false }))]));
        let (i, o) = single();
        t.insert("ih-adaptive-threshold",
                 imgproc(i,
                         o,
                         vec![("--value", ArgumentSchema::required(ArgumentKind::Numeric)),
                              ("--thresholdType", ArgumentSchema::required(ArgumentKind::StringVal { complex: false })),
                              ("--adaptiveType", ArgumentSchema::required(ArgumentKind::StringVal { complex: false })),
                              ("--blockSize", ArgumentSchema::required(ArgumentKind::Numeric)),
                              ("--C", ArgumentSchema::required(ArgumentKind::Numeric))]));
        let (i, o) = single();
        let mut meanshift = imgproc(i,
                                    o,
                                    vec![("--spatial_radius", ArgumentSchema::required(ArgumentKind::Numeric)),
                                         ("--range_radius", ArgumentSchema::required(ArgumentKind::Numeric)),
                                         ("--min_density", ArgumentSchema::required(ArgumentKind::Numeric))]);
        meanshift.weight = Some(0.3);
        t.insert("ih-meanshift", meanshift);
        let (i, o) = single();
        t.insert("ih-gaussian-blur",
                 imgproc(i,
                         o,
                         vec![("--kwidth", ArgumentSchema::required(ArgumentKind::Numeric)),
                              ("--kheight", ArgumentSchema::required(ArgumentKind::Numeric)),
                              ("--sigmax", ArgumentSchema::new(ArgumentKind::Numeric)),
                              ("--sigmay", ArgumentSchema::new(ArgumentKind::Numeric))]));
        let (i, o) = single();
        t.insert("ih-median-blur",
                 imgproc(i, o, vec![("--ksize", ArgumentSchema::required(ArgumentKind::Numeric))]));
        let (i, o) = single();
        t.insert("ih-equalize-hist", imgproc(i, o, vec![]));
        let (i, o) = single();
        t.insert("ih-bitwise-not", imgproc(i, o, vec![]));
        let (i, o) = single();
        t.insert("ih-edges",
                 imgproc(i,
                         o,
                         vec![("--threshold1", ArgumentSchema::required(ArgumentKind::Numeric)),
                              ("--threshold2", ArgumentSchema::required(ArgumentKind::Numeric)),
                              ("--apertureSize", ArgumentSchema::new(ArgumentKind::Numeric))]));
        for name in ["ih-bitwise-and", "ih-bitwise-or", "ih-bitwise-xor"] {
            t.insert(name,
                     imgproc(vec![SlotType::Image, SlotType::Image],
                             vec![SlotType::Image],
                             vec![("--input2", derived(SlotSide::Inputs, 1, true))]));
        }
        t.insert("ih-crop",
                 imgproc(vec![SlotType::Image, SlotType::Roi],
                         vec![SlotType::Image],
                         vec![("--roi", derived(SlotSide::Inputs, 1, false)),
                              ("--ystart", ArgumentSchema::new(ArgumentKind::Numeric)),
                              ("--yend", ArgumentSchema::new(ArgumentKind::Numeric)),
                              ("--xstart", ArgumentSchema::new(ArgumentKind::Numeric)),
                              ("--xend", ArgumentSchema::new(ArgumentKind::Numeric))]));
        t.insert("ih-mask",
                 imgproc(vec![SlotType::Image, SlotType::Roi],
                         vec![SlotType::Image],
                         vec![("--roi", derived(SlotSide::Inputs, 1, false))]));
        t.insert("ih-contour-cut",
                 imgproc(vec![SlotType::Image, SlotType::Image],
                         vec![SlotType::Image, SlotType::Roi],
                         vec![("--binary", derived(SlotSide::Inputs, 1, true)),
                              ("--roiwrite", derived(SlotSide::Outputs, 1, false)),
                              ("--basemin", ArgumentSchema::new(ArgumentKind::Numeric)),
                              ("--padminx", ArgumentSchema::new(ArgumentKind::Numeric)),
                              ("--padmaxx", ArgumentSchema::new(ArgumentKind::Numeric)),
                              ("--padminy", ArgumentSchema::new(ArgumentKind::Numeric)),
                              ("--padmaxy", ArgumentSchema::new(ArgumentKind::Numeric)),
                              ("--resize", ArgumentSchema::new(ArgumentKind::Exists))]));
        let (i, o) = single();
        t.insert("ih-morphology",
                 imgproc(i,
                         o,
                         vec![("--morphType", ArgumentSchema::required(ArgumentKind::StringVal { complex: false })),
                              ("--ktype", ArgumentSchema::required(ArgumentKind::StringVal { complex: false })),
                              ("--kwidth", ArgumentSchema::required(ArgumentKind::Numeric)),
                              ("--kheight", ArgumentSchema::required(ArgumentKind::Numeric)),
                              ("--iterations", ArgumentSchema::new(ArgumentKind::Numeric))]));

        t.insert("ih-extract",
                 ExecutableSignature { class: ExecutableClass::System,
                                       inputs: vec![SlotType::Image, SlotType::Binfile],
                                       outputs: vec![SlotType::None],
                                       arguments: Some(schema(vec![("--input", derived(SlotSide::Inputs, 0, true)),
                                                                   ("--dimensions", ArgumentSchema::new(ArgumentKind::Exists)),
                                                                   ("--dimfromroi",
                                                                    ArgumentSchema::new(ArgumentKind::StringVal { complex: false })),
                                                                   ("--pixels", ArgumentSchema::new(ArgumentKind::Exists)),
                                                                   ("--moments", ArgumentSchema::new(ArgumentKind::Exists)),
                                                                   ("--bins", ArgumentSchema::new(ArgumentKind::StringVal { complex: false })),
                                                                   ("--channels", ArgumentSchema::new(ArgumentKind::Exists)),
                                                                   ("--hull", ArgumentSchema::new(ArgumentKind::Exists)),
                                                                   ("--circle", ArgumentSchema::new(ArgumentKind::Exists))])),
                                       weight: None });
        for name in ["ih-extract-multi", "ih-extract-all", "ih-sql-aggregate", "ih-error-log", "ih-stats-histogram-bin"] {
            t.insert(name, ExecutableSignature::system());
        }

        t.insert("ih-stats-export",
                 ExecutableSignature { class: ExecutableClass::Statistics,
                                       inputs: vec![SlotType::Table],
                                       outputs: vec![SlotType::Csv],
                                       arguments: Some(schema(vec![("--db", stats_db()),
                                                                   ("--table", table_name()),
                                                                   ("--fname", table_name())])),
                                       weight: None });
        t.insert("ih-stats-ttest",
                 stats(vec![("--comp", ArgumentSchema::required(ArgumentKind::StringVal { complex: false })),
                            ("--overwrite",
                             ArgumentSchema::required(ArgumentKind::Overwrite { value: String::new() }))]));
        t.insert("ih-stats-treatment-comp",
                 stats(vec![("--type", ArgumentSchema::required(ArgumentKind::StringVal { complex: false })),
                            ("--direction", ArgumentSchema::required(ArgumentKind::StringVal { complex: false })),
                            ("--comp", ArgumentSchema::required(ArgumentKind::StringVal { complex: false })),
                            ("--overwrite",
                             ArgumentSchema::required(ArgumentKind::Overwrite { value: String::new() }))]));
        t.insert("ih-stats-anova",
                 stats(vec![("--overwrite",
                             ArgumentSchema::required(ArgumentKind::Overwrite { value: String::new() }))]));
        t.insert("ih-stats-shoot-area",
                 stats(vec![("--grouping", ArgumentSchema::required(ArgumentKind::ListVal { join: Some(",".into()) })),
                            ("--overwrite",
                             ArgumentSchema::required(ArgumentKind::Overwrite { value: String::new() }))]));
        t.insert("ih-stats-threshold",
                 stats(vec![("--thresh", ArgumentSchema::required(ArgumentKind::Numeric)),
                            ("--overwrite",
                             ArgumentSchema::required(ArgumentKind::Overwrite { value: String::new() }))]));
        t.insert("ih-stats-normalize",
                 stats(vec![("--column", ArgumentSchema::required(ArgumentKind::StringVal { complex: false })),
                            ("--overwrite",
                             ArgumentSchema::required(ArgumentKind::Overwrite { value: String::new() }))]));
        t
    }
}

fn schema(entries: Vec<(&str, ArgumentSchema)>) -> IndexMap<String, ArgumentSchema> {
    entries.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
}

fn derived(side: SlotSide, index: usize, required: bool) -> ArgumentSchema {
    ArgumentSchema { kind: ArgumentKind::Derived { key: side,
                                                   index,
                                                   value: None },
                     required }
}

/// Firma imgproc: `--input`/`--output` derivados, `--outputdir` y
/// `--writeblank` fijos, más los argumentos propios de la herramienta.
fn imgproc(inputs: Vec<SlotType>, outputs: Vec<SlotType>, extra: Vec<(&str, ArgumentSchema)>) -> ExecutableSignature {
    let mut args = schema(vec![("--input", derived(SlotSide::Inputs, 0, true)),
                               ("--output", derived(SlotSide::Outputs, 0, true)),
                               ("--outputdir", ArgumentSchema::new(ArgumentKind::Overwrite { value: ".".into() })),
                               ("--writeblank",
                                ArgumentSchema::required(ArgumentKind::Overwrite { value: String::new() }))]);
    args.extend(schema(extra));
    ExecutableSignature { class: ExecutableClass::Imgproc,
                          inputs,
                          outputs,
                          arguments: Some(args),
                          weight: None }
}

/// Nombre de tabla; el compilador de estadísticas lo prefija con la
/// categoría.
fn table_name() -> ArgumentSchema {
    ArgumentSchema::required(ArgumentKind::StringVal { complex: false })
}

/// Base de datos compartida; el valor `output.db` se liga al input del
/// mismo nombre.
fn stats_db() -> ArgumentSchema {
    ArgumentSchema::required(ArgumentKind::StringVal { complex: false })
}

/// Firma estadística: base de datos, tabla de entrada y de salida.
fn stats(extra: Vec<(&str, ArgumentSchema)>) -> ExecutableSignature {
    let mut args = schema(vec![("--db", stats_db()), ("--intable", table_name()), ("--outtable", table_name())]);
    args.extend(schema(extra));
    ExecutableSignature { class: ExecutableClass::Statistics,
                          inputs: vec![SlotType::Table],
                          outputs: vec![SlotType::Table],
                          arguments: Some(args),
                          weight: None }
}
