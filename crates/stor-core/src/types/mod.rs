//! Core types for cache operations

mod clock;
mod options;
mod refresh;

pub use clock::{Clock, ManualClock, SystemClock};
pub use options::{GetOptions, WriteOptions};
pub use refresh::RefreshResult;
