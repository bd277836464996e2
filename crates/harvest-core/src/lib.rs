//! harvest-core: registros de artifacts/tasks, resolución de argumentos y
//! grafos congelados.
pub mod arguments;
pub mod constants;
pub mod errors;
pub mod graph;
pub mod hashing;
pub mod model;
pub mod scope;
pub mod signature;

pub use arguments::{ArgumentKind, ArgumentSchema, SlotSide};
pub use errors::{Diagnostic, GraphError, Severity};
pub use graph::{Edge, GraphDescriptor};
pub use model::{ArgumentValue, Artifact, ArtifactKey, ArtifactRole, FileBinding, ResolvedArgument, Task, TaskSpec};
pub use scope::{ConflictKind, IdentityConflict, Scope};
pub use signature::{ExecutableClass, ExecutableSignature, SignatureTable, SlotType};
