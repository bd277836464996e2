//! Scopes de registro (artifacts + tasks) por variante de grafo.

mod conflict;
mod registry;

pub use conflict::{ConflictKind, IdentityConflict};
pub use registry::Scope;
