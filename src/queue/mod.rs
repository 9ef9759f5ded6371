//! Hand-off queue between the copy roles
//!
//! Provides a blocking double-ended queue with optional backpressure and
//! a close/abort lifecycle used to signal end of input and teardown.

mod deque;

pub use deque::*;
