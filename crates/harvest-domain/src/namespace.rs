use crate::Record;
use std::fmt;

/// Prefijo por registro `experimento/sujeto/fecha/categoría/imagen/rowid`
/// (sin espacios) usado para generar nombres de tasks y artifacts sin
/// colisiones entre registros.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DerivedNamespace {
    prefix: String,
}

fn strip_ws(s: &str) -> String {
    s.chars().filter(|c| !c.is_whitespace()).collect()
}

impl DerivedNamespace {
    pub fn from_record(record: &Record) -> Self {
        let parts = [record.experiment(),
                     record.subject(),
                     record.date(),
                     record.imtype(),
                     record.imgname(),
                     record.pegasusid()];
        let prefix = parts.iter().map(|p| strip_ws(p)).collect::<Vec<_>>().join("/");
        Self { prefix }
    }

    pub fn as_str(&self) -> &str {
        &self.prefix
    }

    /// `<ns>_<step>`
    pub fn task(&self, step: &str) -> String {
        format!("{}_{}", self.prefix, step)
    }

    /// `<ns>_<slot><ext>`; `ext` incluye el punto.
    pub fn artifact(&self, slot: &str, ext: &str) -> String {
        format!("{}_{}{}", self.prefix, slot, ext)
    }
}

impl fmt::Display for DerivedNamespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whitespace_is_removed_from_every_identifier() {
        let r = Record::new("17 a", "rgb sv", "Exp 1", "00 12", "2015-07-01 ", "side\t0", "/x/a.png").unwrap();
        let ns = DerivedNamespace::from_record(&r);
        assert_eq!(ns.as_str(), "Exp1/0012/2015-07-01/rgbsv/side0/17a");
        assert_eq!(ns.task("crop"), "Exp1/0012/2015-07-01/rgbsv/side0/17a_crop");
        assert_eq!(ns.artifact("final", ".png"), "Exp1/0012/2015-07-01/rgbsv/side0/17a_final.png");
    }
}
