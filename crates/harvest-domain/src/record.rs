// record.rs
use crate::DomainError;
use serde::{Deserialize, Serialize};

/// Fila del catálogo de imágenes de entrada. Inmutable y de sólo lectura:
/// el compilador nunca escribe sobre el catálogo.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Record {
    pegasusid: String,
    imtype: String,
    #[serde(default)]
    experiment: String,
    #[serde(rename = "id", default)]
    subject: String,
    #[serde(default)]
    date: String,
    #[serde(default)]
    imgname: String,
    path: String,
}

impl Record {
    /// Crea un registro validado.
    ///
    /// # Errores
    /// `DomainError::ValidationError` si falta el row id, la categoría o la
    /// ruta, o si la ruta no tiene extensión.
    pub fn new(pegasusid: impl Into<String>,
               imtype: impl Into<String>,
               experiment: impl Into<String>,
               subject: impl Into<String>,
               date: impl Into<String>,
               imgname: impl Into<String>,
               path: impl Into<String>)
               -> Result<Self, DomainError> {
        let record = Record { pegasusid: pegasusid.into(),
                              imtype: imtype.into(),
                              experiment: experiment.into(),
                              subject: subject.into(),
                              date: date.into(),
                              imgname: imgname.into(),
                              path: path.into() };
        record.validate()?;
        Ok(record)
    }

    /// Verifica los campos obligatorios (usado también tras deserializar).
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.pegasusid.trim().is_empty() {
            return Err(DomainError::ValidationError("Registro sin pegasusid".to_string()));
        }
        if self.imtype.trim().is_empty() {
            return Err(DomainError::ValidationError(format!("Registro {} sin imtype", self.pegasusid)));
        }
        if self.path.trim().is_empty() {
            return Err(DomainError::ValidationError(format!("Registro {} sin path", self.pegasusid)));
        }
        if self.source_extension().is_none() {
            return Err(DomainError::ValidationError(format!("Registro {} con path sin extensión: {}",
                                                            self.pegasusid, self.path)));
        }
        Ok(())
    }

    pub fn pegasusid(&self) -> &str {
        &self.pegasusid
    }

    pub fn imtype(&self) -> &str {
        &self.imtype
    }

    pub fn experiment(&self) -> &str {
        &self.experiment
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn date(&self) -> &str {
        &self.date
    }

    pub fn imgname(&self) -> &str {
        &self.imgname
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Extensión del archivo de origen incluyendo el punto (`.jpg`).
    pub fn source_extension(&self) -> Option<String> {
        let file = self.path.rsplit('/').next().unwrap_or(&self.path);
        match file.rfind('.') {
            Some(i) if i + 1 < file.len() => Some(file[i..].to_string()),
            _ => None,
        }
    }
}
