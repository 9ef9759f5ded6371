//! Core copy engine module
//!
//! Provides the chunk type and the reader/writer pipeline that moves
//! chunks through a blocking queue.

pub mod chunk;
mod pipeline;

pub use chunk::Chunk;
pub use pipeline::*;
