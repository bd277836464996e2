//! Modelos neutrales del grafo (Artifact, Task, bindings, fingerprint).

pub mod artifact;
pub mod fingerprint;
pub mod task;

pub use artifact::{Artifact, ArtifactKey, ArtifactRole, FileBinding};
pub use fingerprint::GraphFingerprintInput;
pub use task::{ArgumentValue, ResolvedArgument, Task, TaskSpec};
