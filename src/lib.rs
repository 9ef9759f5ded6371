//! # CopyTool - producer/consumer file copy
//!
//! CopyTool copies a file with two threads: a reader that splits the source
//! into fixed-size chunks and a writer that appends them to the destination.
//! The threads meet at a [`BlockingDeque`](queue::BlockingDeque), a
//! mutex-and-condvar deque that parks the writer while it is empty, parks
//! the reader while it is full, and carries the end-of-input and abort
//! signals under the same lock.
//!
//! ## Quick Start
//!
//! ```no_run
//! use copytool::core::CopyPipeline;
//! use std::path::Path;
//!
//! let result = CopyPipeline::new(64, Some(8))
//!     .unwrap()
//!     .copy_file(Path::new("/source.bin"), Path::new("/destination.bin"))
//!     .unwrap();
//!
//! println!("Copied {} bytes in {} chunks", result.bytes_copied, result.chunks);
//! ```
//!
//! ## Using the queue directly
//!
//! ```
//! use copytool::queue::BlockingDeque;
//!
//! let queue = BlockingDeque::new();
//! queue.push_back("first").unwrap();
//! queue.push_front("zeroth").unwrap();
//! queue.close();
//!
//! assert_eq!(queue.pop_front(), Some("zeroth"));
//! assert_eq!(queue.pop_front(), Some("first"));
//! assert_eq!(queue.pop_front(), None);
//! assert!(queue.is_drained_and_closed());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod hash;
pub mod progress;
pub mod queue;

// Re-export commonly used types
pub use config::{HashAlgorithm, PipelineConfig};
pub use self::core::{Canceller, Chunk, CopyPipeline, CopyResult};
pub use error::{CopyToolError, Result};
pub use queue::BlockingDeque;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
