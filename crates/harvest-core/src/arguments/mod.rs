//! Resolución de argumentos de línea de comandos.
//!
//! Cada argumento del esquema de un ejecutable tiene un `ArgumentKind`; el
//! resolver correspondiente produce un valor crudo a partir del template y
//! la regla de slots (`bind_slot`) decide si ese valor es un archivo ligado
//! o un literal.

pub mod kinds;
pub mod resolve;

pub use kinds::{ArgumentKind, ArgumentSchema, SlotSide};
pub use resolve::{bind_slot, render_value, resolve_arguments, ArgumentContext, Resolution};
