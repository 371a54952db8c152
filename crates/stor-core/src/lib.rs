//! stor-core: Core traits and types for the stor key/value cache
//!
//! This crate provides the backend contract, the codec strategy, key
//! derivation and the error taxonomy shared by every stor crate.

mod error;
mod traits;
mod types;

pub use error::{Result, StorError};
pub use traits::*;
pub use types::*;
