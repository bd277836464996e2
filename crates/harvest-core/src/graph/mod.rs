//! Grafo congelado y utilidades de recorrido.

mod descriptor;

pub use descriptor::{Edge, GraphDescriptor};
