//! Progress reporting module
//!
//! Provides a byte progress bar for the copy with throughput and ETA.

mod reporter;

pub use reporter::*;
