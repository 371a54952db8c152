//! Filesystem backend: one file per key

mod backend;
mod config;

pub use backend::FileBackend;
pub use config::FileConfig;
