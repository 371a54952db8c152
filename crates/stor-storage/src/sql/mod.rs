//! Relational backend: a two-column key/value table

mod backend;
mod dialect;

pub use backend::SqlBackend;
pub use dialect::SqlDialect;
