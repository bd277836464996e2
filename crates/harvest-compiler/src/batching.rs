//! Particiones del flujo secuencial de registros de una categoría.
//!
//! Dos particiones independientes sobre el índice `i` (0-based):
//! - clustering: `job = i mod C`, `cluster = i div C`, más un contador por
//!   cada peso distinto usado por la categoría;
//! - batches de extracción: un batch nuevo cuando `i mod B == 0`.
//!
//! Ambas se alimentan en orden de índice; los contadores ponderados dependen
//! de haber visto todos los índices previos.
use harvest_core::constants::IMAGE_EXTENSION;
use harvest_core::FileBinding;
use indexmap::IndexMap;

#[derive(Debug, Clone, PartialEq)]
struct WeightedCounter {
    weight: f64,
    modulus: usize,
    count: usize,
}

/// Estado de clustering de una categoría.
#[derive(Debug, Clone, PartialEq)]
pub struct Clusterer {
    size: usize,
    counters: Vec<WeightedCounter>,
}

/// Posición de un registro dentro del esquema de clusters.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterPosition {
    pub job: usize,
    pub cluster: usize,
    weighted: Vec<(f64, usize)>,
}

impl Clusterer {
    /// `size` debe ser > 0; los pesos repetidos comparten contador.
    pub fn new(size: usize, weights: &[f64]) -> Self {
        let size = size.max(1);
        let mut counters: Vec<WeightedCounter> = Vec::new();
        for &w in weights {
            if counters.iter().any(|c| c.weight == w) {
                continue;
            }
            let modulus = ((size as f64) * w).floor().max(1.0) as usize;
            counters.push(WeightedCounter { weight: w,
                                            modulus,
                                            count: 0 });
        }
        Self { size, counters }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Avanza los contadores ponderados con el índice `index` y devuelve su
    /// posición.
    pub fn position(&mut self, index: usize) -> ClusterPosition {
        let job = index % self.size;
        let cluster = index / self.size;
        let key = cluster * 100 + job;
        for c in &mut self.counters {
            if key % c.modulus == 0 {
                c.count += 1;
            }
        }
        ClusterPosition { job,
                          cluster,
                          weighted: self.counters.iter().map(|c| (c.weight, c.count)).collect() }
    }
}

impl ClusterPosition {
    /// Contador a usar en la etiqueta: el ponderado si el ejecutable tiene
    /// peso, si no el índice de cluster.
    pub fn counter_for(&self, weight: Option<f64>) -> usize {
        weight.and_then(|w| self.weighted.iter().find(|(cw, _)| *cw == w).map(|(_, n)| *n))
              .unwrap_or(self.cluster)
    }

    /// `<category>_step<stepIndex>_cluster<n>`
    pub fn label(&self, category: &str, step_index: usize, weight: Option<f64>) -> String {
        format!("{}_step{}_cluster{}", category, step_index, self.counter_for(weight))
    }
}

/// Grupo acotado de registros consumido por un único task de extracción.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractionBatch {
    pub index: usize,
    pub dependencies: Vec<String>,
    pub inputs: IndexMap<String, FileBinding>,
}

impl ExtractionBatch {
    pub fn new(index: usize) -> Self {
        Self { index,
               ..Default::default() }
    }

    pub fn add_dependency(&mut self, task: impl Into<String>) {
        let task = task.into();
        if !self.dependencies.contains(&task) {
            self.dependencies.push(task);
        }
    }

    pub fn add_input(&mut self, file: impl Into<String>, transfer: bool) {
        let file = file.into();
        self.inputs.entry(file.clone()).or_insert_with(|| FileBinding::new(file, transfer));
    }

    pub fn image_inputs(&self) -> Vec<&str> {
        self.inputs
            .keys()
            .filter(|k| k.ends_with(IMAGE_EXTENSION))
            .map(String::as_str)
            .collect()
    }

    pub fn json_inputs(&self) -> Vec<&str> {
        self.inputs.keys().filter(|k| k.ends_with(".json")).map(String::as_str).collect()
    }
}

/// Partición en batches de una categoría. Los batches se abren de forma
/// perezosa: `ceil(N/B)` batches para `N` registros.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchPlan {
    size: usize,
    batches: Vec<ExtractionBatch>,
}

impl BatchPlan {
    pub fn new(size: usize) -> Self {
        Self { size: size.max(1),
               batches: Vec::new() }
    }

    /// Abre un batch nuevo si `index` inicia uno; devuelve el batch actual.
    pub fn observe(&mut self, index: usize) -> Option<&mut ExtractionBatch> {
        if index % self.size == 0 {
            let next = self.batches.len();
            self.batches.push(ExtractionBatch::new(next));
        }
        self.batches.last_mut()
    }

    pub fn current_mut(&mut self) -> Option<&mut ExtractionBatch> {
        self.batches.last_mut()
    }

    pub fn len(&self) -> usize {
        self.batches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }

    pub fn into_batches(self) -> Vec<ExtractionBatch> {
        self.batches
    }
}

/// Número de batches para `records` registros con tope `size`.
pub fn batch_count(records: usize, size: usize) -> usize {
    records.div_ceil(size.max(1))
}
