//! Configuración del compilador.
//!
//! Dos fuentes: un archivo JSON con la forma de `config.json`
//! (`cluster`, `maxwalltime.*`, `extract_batch_size`, `output_dir`) o
//! variables de entorno `HARVEST_*` tras cargar `.env` una sola vez.
//! Valores inválidos caen al default; la configuración nunca es fatal.

use std::env;

use dotenvy::dotenv;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::CompileError;

// Carga perezosa del archivo .env una sola vez.
static DOTENV_LOADED: Lazy<()> = Lazy::new(|| {
    let _ = dotenv(); // ignora error si no existe .env
});

pub const DEFAULT_BATCH_SIZE: usize = 50;
pub const DEFAULT_EXTRACT_WALLTIME: u32 = 180;
pub const DEFAULT_EXTRACT_BINS_WALLTIME: u32 = 300;
pub const DEFAULT_AGGREGATE_WALLTIME: u32 = 180;
pub const DEFAULT_OUTPUT_DIR: &str = "output";

/// Techos de wall-time (minutos) por fase.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct MaxWalltime {
    #[serde(default)]
    pub images: Option<u32>,
    #[serde(default)]
    pub stats: Option<u32>,
    #[serde(default)]
    pub extract: Option<u32>,
    #[serde(default)]
    pub extract_bins: Option<u32>,
    #[serde(default)]
    pub aggregate: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CompilerConfig {
    #[serde(default)]
    pub cluster: Option<usize>,
    #[serde(default)]
    pub extract_batch_size: Option<usize>,
    #[serde(default)]
    pub maxwalltime: MaxWalltime,
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
}

fn default_output_dir() -> String {
    DEFAULT_OUTPUT_DIR.to_string()
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self { cluster: None,
               extract_batch_size: None,
               maxwalltime: MaxWalltime::default(),
               output_dir: default_output_dir() }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

impl CompilerConfig {
    pub fn from_json_str(s: &str) -> Result<Self, CompileError> {
        serde_json::from_str(s).map_err(|e| CompileError::Config(e.to_string()))
    }

    pub fn from_env() -> Self {
        // asegura que .env se haya cargado
        Lazy::force(&DOTENV_LOADED);
        let output_dir = env::var("HARVEST_OUTPUT_DIR").ok()
                                                       .filter(|v| !v.trim().is_empty())
                                                       .unwrap_or_else(default_output_dir);
        Self { cluster: env_parse("HARVEST_CLUSTER"),
               extract_batch_size: env_parse("HARVEST_EXTRACT_BATCH_SIZE"),
               maxwalltime: MaxWalltime { images: env_parse("HARVEST_MAXWALLTIME_IMAGES"),
                                          stats: env_parse("HARVEST_MAXWALLTIME_STATS"),
                                          extract: env_parse("HARVEST_MAXWALLTIME_EXTRACT"),
                                          extract_bins: env_parse("HARVEST_MAXWALLTIME_EXTRACT_BINS"),
                                          aggregate: env_parse("HARVEST_MAXWALLTIME_AGGREGATE") },
               output_dir }
    }

    /// Tamaño de cluster efectivo; 0 o ausente desactiva el clustering.
    pub fn cluster_size(&self) -> Option<usize> {
        self.cluster.filter(|c| *c > 0)
    }

    /// Tamaño máximo de batch de extracción; 0 o ausente => 50.
    pub fn batch_size(&self) -> usize {
        self.extract_batch_size.filter(|b| *b > 0).unwrap_or(DEFAULT_BATCH_SIZE)
    }

    pub fn images_walltime(&self) -> Option<u32> {
        self.maxwalltime.images
    }

    pub fn stats_walltime(&self) -> Option<u32> {
        self.maxwalltime.stats
    }

    pub fn extract_walltime(&self) -> u32 {
        self.maxwalltime.extract.unwrap_or(DEFAULT_EXTRACT_WALLTIME)
    }

    pub fn extract_bins_walltime(&self) -> u32 {
        self.maxwalltime.extract_bins.unwrap_or(DEFAULT_EXTRACT_BINS_WALLTIME)
    }

    pub fn aggregate_walltime(&self) -> u32 {
        self.maxwalltime.aggregate.unwrap_or(DEFAULT_AGGREGATE_WALLTIME)
    }

    /// Ruta física de un archivo dentro del directorio de salida.
    pub fn output_path(&self, name: &str) -> String {
        format!("{}/{}", self.output_dir.trim_end_matches('/'), name)
    }
}

/// Forzar carga temprana de .env desde aplicaciones externas si se desea.
pub fn init_dotenv() {
    Lazy::force(&DOTENV_LOADED);
}
