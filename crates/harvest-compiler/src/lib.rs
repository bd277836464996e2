//! harvest-compiler: del template de pipeline y el catálogo a los grafos de
//! una corrida.
//!
//! - `template`: modelo serde de los templates de pipeline y estadísticas.
//! - `expander`: cadenas por registro con estado explícito entre registros.
//! - `batching`: clusters ponderados y batches de extracción.
//! - `aggregation`: extract, aggregate, bin-creation y report.
//! - `assembler`: `GraphCompiler`, que produce un `CompiledRun`.
//! - `statistics`: grafo de estadísticas sobre la base de datos final.

pub mod aggregation;
pub mod assembler;
pub mod batching;
pub mod config;
pub mod error;
pub mod expander;
pub mod statistics;
pub mod template;

pub use assembler::{CompiledRun, GraphCompiler};
pub use config::{init_dotenv, CompilerConfig};
pub use error::CompileError;
pub use statistics::StatisticsCompiler;
pub use template::{PipelineTemplate, StatisticsTemplate};
