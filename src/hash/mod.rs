//! Hash computation and integrity verification module
//!
//! Streaming hashers used to check that a destination matches what the
//! reader thread saw.

mod integrity;

pub use integrity::*;
