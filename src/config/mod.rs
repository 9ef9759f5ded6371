//! Configuration module for CopyTool
//!
//! Provides the CLI arguments and the runtime pipeline settings.

mod settings;

pub use settings::*;
