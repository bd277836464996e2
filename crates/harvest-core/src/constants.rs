//! Constantes del compilador de grafos.
//!
//! Este módulo agrupa valores estáticos que participan en el cálculo de
//! fingerprints de grafos y en los nombres de artifacts compartidos por las
//! fases de agregación. Cambios en estas constantes alteran la identidad de
//! los grafos emitidos (`COMPILER_VERSION` forma parte del fingerprint).

/// Versión lógica del compilador. Se incluye en el fingerprint de cada
/// `GraphDescriptor` para que un cambio de reglas de compilación invalide
/// determinísticamente los fingerprints aunque template y catálogo no cambien.
pub const COMPILER_VERSION: &str = "H1.0";

/// Categoría reservada para artifacts que no pertenecen a ninguna categoría
/// de imagen (base de metadatos, bins de histogramas, logs).
pub const RAW_CATEGORY: &str = "raw";

/// Categoría usada por el grafo de sólo extracción para los inputs por
/// registro que ya existen en disco.
pub const ALL_CATEGORY: &str = "all";

/// Extensión preferida para imágenes intermedias.
pub const IMAGE_EXTENSION: &str = ".png";

/// Extensiones aceptadas como imagen de origen.
pub const IMAGE_EXTENSIONS: &[&str] = &[".png", ".jpg", ".jpeg", ".gif"];
