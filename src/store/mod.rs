//! Persistence layer: libSQL-backed storage for learned domain mappings.

pub mod libsql_backend;
pub mod migrations;
pub mod traits;

pub use libsql_backend::LibSqlBackend;
pub use traits::{DomainMapping, DomainStore, NewDomainMapping};
