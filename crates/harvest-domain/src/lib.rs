// harvest-domain library entry point
pub mod catalog;
pub mod error;
pub mod namespace;
pub mod record;
pub use catalog::{Catalog, InMemoryCatalog};
pub use error::DomainError;
pub use namespace::DerivedNamespace;
pub use record::Record;
