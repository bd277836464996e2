//! Configuración de entradas de la aplicación.
//! Lee las rutas de los archivos de una corrida desde variables de entorno
//! (tras cargar `.env`) y resuelve la configuración del compilador: archivo
//! JSON si se indica, variables `HARVEST_*` si no.
use std::env;
use std::fs;

use harvest_compiler::{init_dotenv, CompilerConfig};
use harvest_core::SignatureTable;
use serde::de::DeserializeOwned;

use crate::errors::HarvestError;

/// Rutas de los archivos de entrada de una corrida.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunPaths {
    /// Template de pipeline (obligatorio).
    pub template: String,
    /// Catálogo de imágenes exportado a JSON (obligatorio).
    pub catalog: String,
    pub config: Option<String>,
    pub stats_template: Option<String>,
    /// Tabla de firmas propia; si falta se usa la incluida.
    pub signatures: Option<String>,
}

fn optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn required(key: &str) -> Result<String, HarvestError> {
    optional(key).ok_or_else(|| HarvestError::Config(format!("{key} no definido")))
}

impl RunPaths {
    /// `HARVEST_TEMPLATE`, `HARVEST_CATALOG`, y opcionales `HARVEST_CONFIG`,
    /// `HARVEST_STATS_TEMPLATE`, `HARVEST_SIGNATURES`.
    pub fn from_env() -> Result<Self, HarvestError> {
        init_dotenv();
        Ok(Self { template: required("HARVEST_TEMPLATE")?,
                  catalog: required("HARVEST_CATALOG")?,
                  config: optional("HARVEST_CONFIG"),
                  stats_template: optional("HARVEST_STATS_TEMPLATE"),
                  signatures: optional("HARVEST_SIGNATURES") })
    }

    pub fn compiler_config(&self) -> Result<CompilerConfig, HarvestError> {
        match &self.config {
            Some(path) => Ok(CompilerConfig::from_json_str(&read_to_string(path)?)?),
            None => Ok(CompilerConfig::from_env()),
        }
    }

    pub fn signature_table(&self) -> Result<SignatureTable, HarvestError> {
        match &self.signatures {
            Some(path) => read_json(path),
            None => Ok(SignatureTable::builtin()),
        }
    }
}

pub fn read_to_string(path: &str) -> Result<String, HarvestError> {
    Ok(fs::read_to_string(path)?)
}

pub fn read_json<T: DeserializeOwned>(path: &str) -> Result<T, HarvestError> {
    let text = read_to_string(path)?;
    serde_json::from_str(&text).map_err(|source| HarvestError::Json { path: path.to_string(),
                                                                      source })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_config_path_falls_back_to_defaults() {
        let paths = RunPaths { template: "t.json".into(),
                               catalog: "c.json".into(),
                               ..Default::default() };
        assert_eq!(paths.signature_table().unwrap().len(), SignatureTable::builtin().len());
    }

    #[test]
    fn unreadable_file_is_io_error() {
        let err = read_to_string("/nonexistent/harvest/template.json").unwrap_err();
        assert!(matches!(err, HarvestError::Io(_)));
    }
}
