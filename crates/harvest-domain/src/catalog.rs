// catalog.rs
use crate::{DomainError, Record};
use log::warn;
use sha2::{Digest, Sha256};
use std::collections::HashSet;

/// Fuente de registros de entrada. El compilador sólo la lee, una vez por
/// categoría.
pub trait Catalog {
    /// Categorías presentes en el catálogo (orden de primera aparición).
    fn categories(&self) -> Vec<String>;

    /// Registros de una categoría, en orden de catálogo.
    fn select_by_category(&self, category: &str) -> Result<Vec<Record>, DomainError>;

    /// Digest del contenido para trazabilidad, si la fuente lo soporta.
    fn snapshot_digest(&self) -> Option<String> {
        None
    }
}

/// Catálogo en memoria, útil para tests y para catálogos exportados a JSON.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    records: Vec<Record>,
}

impl InMemoryCatalog {
    /// Las filas con `pegasusid` repetido se conservan: el scope que las
    /// registra se queda con la primera y anota el conflicto.
    ///
    /// # Errores
    /// `DomainError::ValidationError` si algún registro es inválido.
    pub fn new<I>(records: I) -> Result<Self, DomainError>
        where I: IntoIterator<Item = Record>
    {
        let records: Vec<Record> = records.into_iter().collect();
        let mut seen = HashSet::new();
        for r in &records {
            r.validate()?;
            if !seen.insert(r.pegasusid()) {
                warn!("catalog:duplicate pegasusid={} path={}", r.pegasusid(), r.path());
            }
        }
        Ok(Self { records })
    }

    /// Carga un arreglo JSON de filas (`[{"pegasusid": ..., "imtype": ...}]`).
    pub fn from_json_str(s: &str) -> Result<Self, DomainError> {
        let rows: Vec<Record> =
            serde_json::from_str(s).map_err(|e| DomainError::ExternalError(format!("Catálogo JSON inválido: {e}")))?;
        Self::new(rows)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Digest sha256 sobre los pares (row id, path) en orden de catálogo.
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        for r in &self.records {
            hasher.update(r.pegasusid().as_bytes());
            hasher.update([0u8]);
            hasher.update(r.path().as_bytes());
            hasher.update([0u8]);
        }
        format!("{:x}", hasher.finalize())
    }
}

impl Catalog for InMemoryCatalog {
    fn categories(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for r in &self.records {
            if !out.iter().any(|c| c == r.imtype()) {
                out.push(r.imtype().to_string());
            }
        }
        out
    }

    fn select_by_category(&self, category: &str) -> Result<Vec<Record>, DomainError> {
        Ok(self.records.iter().filter(|r| r.imtype() == category).cloned().collect())
    }

    fn snapshot_digest(&self) -> Option<String> {
        Some(self.digest())
    }
}
