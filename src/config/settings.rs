//! Configuration settings for CopyTool
//!
//! Defines the CLI arguments, the runtime pipeline configuration and
//! their defaults.

use crate::error::{CopyToolError, Result};
use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default number of bytes read into one chunk
pub const DEFAULT_CHUNK_SIZE: usize = 64;

/// Largest chunk a pipeline will allocate
pub const MAX_CHUNK_SIZE: usize = 1024 * 1024 * 1024;

/// Default number of chunks the queue holds before the reader waits
pub const DEFAULT_QUEUE_CAPACITY: usize = 8;

/// CopyTool - copy a file through a reader thread and a writer thread
#[derive(Parser, Debug, Clone)]
#[command(name = "copytool")]
#[command(author = "CopyTool Team")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Copy a file through a bounded producer/consumer queue")]
#[command(long_about = r#"
CopyTool copies one file to another. A reader thread reads the source in
fixed-size chunks and hands them to a writer thread through a blocking queue.

Examples:
  copytool source.bin dest.bin                  # Basic copy
  copytool src dst --chunk-size 64K -y          # Bigger chunks, no prompt
  copytool src dst --verify xxhash3             # Re-read and compare
"#)]
pub struct CliArgs {
    /// Source file path
    #[arg(value_name = "SOURCE")]
    pub source: Option<String>,

    /// Destination file path
    #[arg(value_name = "DESTINATION")]
    pub destination: Option<String>,

    /// Bytes per chunk (e.g., 64, 4K, 1M)
    #[arg(short = 'c', long, default_value = "64", value_name = "SIZE")]
    pub chunk_size: String,

    /// Chunks buffered between reader and writer (0 = unbounded)
    #[arg(long, default_value_t = DEFAULT_QUEUE_CAPACITY, value_name = "NUM")]
    pub queue_capacity: usize,

    /// Overwrite an existing destination without asking
    #[arg(short = 'y', long)]
    pub yes: bool,

    /// Verify the destination with the given hash algorithm
    #[arg(long, value_enum, value_name = "ALGO")]
    pub verify: Option<HashAlgorithm>,

    /// Show a progress bar
    #[arg(short = 'p', long)]
    pub progress: bool,

    /// Verbose output (can be repeated: -v, -vv, -vvv)
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short = 'q', long)]
    pub quiet: bool,

    /// Output format for the copy summary
    #[arg(long, value_enum, default_value = "text")]
    pub output_format: OutputFormat,
}

impl CliArgs {
    /// Default log level implied by `-v` and `-q`
    pub fn log_level(&self) -> &'static str {
        if self.quiet {
            return "error";
        }
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}

/// Hash algorithm for integrity verification
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    /// XXHash3 - Ultra fast, non-cryptographic (128-bit)
    #[default]
    #[value(name = "xxhash3")]
    XXHash3,
    /// XXHash64 - Fast, non-cryptographic (64-bit)
    #[value(name = "xxhash64")]
    XXHash64,
    /// BLAKE3 - Fast and cryptographically secure
    #[value(name = "blake3")]
    Blake3,
    /// SHA-256 - Standard cryptographic hash
    #[value(name = "sha256")]
    Sha256,
}

impl HashAlgorithm {
    /// Get the output size in bytes
    pub fn output_size(&self) -> usize {
        match self {
            Self::XXHash3 => 16,
            Self::XXHash64 => 8,
            Self::Blake3 => 32,
            Self::Sha256 => 32,
        }
    }

    /// Get human-readable name
    pub fn name(&self) -> &'static str {
        match self {
            Self::XXHash3 => "XXHash3",
            Self::XXHash64 => "XXHash64",
            Self::Blake3 => "BLAKE3",
            Self::Sha256 => "SHA-256",
        }
    }
}

/// Output format for reports
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable text
    #[default]
    Text,
    /// JSON format
    Json,
}

/// Runtime configuration derived from CLI args
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Source path
    pub source: PathBuf,
    /// Destination path
    pub destination: PathBuf,
    /// Bytes read into each chunk
    pub chunk_size: usize,
    /// Queue bound in chunks, `None` for unbounded
    pub queue_capacity: Option<usize>,
    /// Hash algorithm for verification
    pub verify: Option<HashAlgorithm>,
    /// Overwrite an existing destination without asking
    pub overwrite: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            source: PathBuf::new(),
            destination: PathBuf::new(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            queue_capacity: Some(DEFAULT_QUEUE_CAPACITY),
            verify: None,
            overwrite: false,
        }
    }
}

impl PipelineConfig {
    /// Create a config for copying `source` to `destination` with defaults
    pub fn new(source: impl Into<PathBuf>, destination: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
            ..Default::default()
        }
    }

    /// Create config from CLI arguments
    ///
    /// Fails with [`CopyToolError::Usage`] when either path is missing.
    pub fn from_cli(args: &CliArgs) -> Result<Self> {
        let (source, destination) = match (&args.source, &args.destination) {
            (Some(source), Some(destination)) => (source, destination),
            _ => return Err(CopyToolError::Usage(usage())),
        };

        let chunk_size = parse_size(&args.chunk_size)
            .map_err(|e| CopyToolError::config(format!("Invalid chunk size: {}", e)))?;
        let chunk_size = usize::try_from(chunk_size)
            .map_err(|_| CopyToolError::config(format!("Chunk size too large: {}", chunk_size)))?;

        let config = Self {
            source: PathBuf::from(source),
            destination: PathBuf::from(destination),
            chunk_size,
            queue_capacity: (args.queue_capacity > 0).then_some(args.queue_capacity),
            verify: args.verify,
            overwrite: args.yes,
        };
        config.validate()?;

        Ok(config)
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(CopyToolError::config("Chunk size must be at least 1 byte"));
        }
        if self.chunk_size > MAX_CHUNK_SIZE {
            return Err(CopyToolError::config(format!(
                "Chunk size {} exceeds the maximum of {} bytes",
                self.chunk_size, MAX_CHUNK_SIZE
            )));
        }
        if self.queue_capacity == Some(0) {
            return Err(CopyToolError::config("Queue capacity must be at least 1 chunk"));
        }
        Ok(())
    }
}

/// Usage text printed when paths are missing
pub fn usage() -> String {
    "Usage:\n\tcopytool <SOURCE> <DESTINATION> [OPTIONS]\n\tcopytool --help for more information"
        .to_string()
}

/// Parse human-readable size string to bytes
pub fn parse_size(size: &str) -> std::result::Result<u64, String> {
    let size = size.trim().to_uppercase();

    if size.is_empty() {
        return Err("Empty size string".to_string());
    }

    let (num_str, multiplier) = if size.ends_with("GB") || size.ends_with('G') {
        (size.trim_end_matches(|c| c == 'G' || c == 'B'), 1024u64 * 1024 * 1024)
    } else if size.ends_with("MB") || size.ends_with('M') {
        (size.trim_end_matches(|c| c == 'M' || c == 'B'), 1024u64 * 1024)
    } else if size.ends_with("KB") || size.ends_with('K') {
        (size.trim_end_matches(|c| c == 'K' || c == 'B'), 1024u64)
    } else if size.ends_with('B') {
        (size.trim_end_matches('B'), 1u64)
    } else {
        // Assume bytes if no suffix
        (size.as_str(), 1u64)
    };

    let num: f64 = num_str
        .trim()
        .parse()
        .map_err(|_| format!("Invalid number: {}", num_str))?;

    if !num.is_finite() || num < 0.0 {
        return Err(format!("Invalid number: {}", num_str));
    }

    let bytes = num * multiplier as f64;
    if bytes >= u64::MAX as f64 {
        return Err(format!("Size too large: {}", num_str));
    }

    Ok(bytes as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(argv: &[&str]) -> CliArgs {
        CliArgs::try_parse_from(argv.iter().copied()).unwrap()
    }

    #[test]
    fn test_parse_size() {
        assert_eq!(parse_size("64").unwrap(), 64);
        assert_eq!(parse_size("1K").unwrap(), 1024);
        assert_eq!(parse_size("1KB").unwrap(), 1024);
        assert_eq!(parse_size("4m").unwrap(), 4 * 1024 * 1024);
        assert_eq!(parse_size("1G").unwrap(), 1024 * 1024 * 1024);
        assert_eq!(parse_size("1.5K").unwrap(), 1536);
        assert!(parse_size("").is_err());
        assert!(parse_size("lots").is_err());
        assert!(parse_size("-4").is_err());
        assert!(parse_size("1e30").is_err());
        assert!(parse_size("inf").is_err());
    }

    #[test]
    fn test_from_cli_defaults() {
        let config = PipelineConfig::from_cli(&args(&["copytool", "a.bin", "b.bin"])).unwrap();
        assert_eq!(config.source, PathBuf::from("a.bin"));
        assert_eq!(config.destination, PathBuf::from("b.bin"));
        assert_eq!(config.chunk_size, DEFAULT_CHUNK_SIZE);
        assert_eq!(config.queue_capacity, Some(DEFAULT_QUEUE_CAPACITY));
        assert!(!config.overwrite);
        assert!(config.verify.is_none());
    }

    #[test]
    fn test_from_cli_options() {
        let cli = args(&[
            "copytool", "a", "b", "-c", "4K", "--queue-capacity", "0", "-y", "--verify", "blake3",
        ]);
        let config = PipelineConfig::from_cli(&cli).unwrap();
        assert_eq!(config.chunk_size, 4096);
        assert_eq!(config.queue_capacity, None);
        assert!(config.overwrite);
        assert_eq!(config.verify, Some(HashAlgorithm::Blake3));
    }

    #[test]
    fn test_from_cli_missing_destination() {
        let err = PipelineConfig::from_cli(&args(&["copytool", "only-one"])).unwrap_err();
        assert!(matches!(err, CopyToolError::Usage(_)));
        assert_eq!(err.exit_code(), -1);
    }

    #[test]
    fn test_zero_chunk_size_rejected() {
        let err = PipelineConfig::from_cli(&args(&["copytool", "a", "b", "-c", "0"])).unwrap_err();
        assert!(matches!(err, CopyToolError::ConfigError(_)));
    }

    #[test]
    fn test_oversized_chunk_size_rejected() {
        let err = PipelineConfig::from_cli(&args(&["copytool", "a", "b", "-c", "1e30"])).unwrap_err();
        assert!(matches!(err, CopyToolError::ConfigError(_)));
        assert_eq!(err.exit_code(), -1);

        let err = PipelineConfig::from_cli(&args(&["copytool", "a", "b", "-c", "2G"])).unwrap_err();
        assert!(matches!(err, CopyToolError::ConfigError(_)));

        let config = PipelineConfig::from_cli(&args(&["copytool", "a", "b", "-c", "1G"])).unwrap();
        assert_eq!(config.chunk_size, MAX_CHUNK_SIZE);
    }

    #[test]
    fn test_log_level() {
        assert_eq!(args(&["copytool"]).log_level(), "warn");
        assert_eq!(args(&["copytool", "-vv"]).log_level(), "debug");
        assert_eq!(args(&["copytool", "-v", "-q"]).log_level(), "error");
    }

    #[test]
    fn test_hash_algorithm() {
        assert_eq!(HashAlgorithm::XXHash3.output_size(), 16);
        assert_eq!(HashAlgorithm::Sha256.output_size(), 32);
        assert_eq!(HashAlgorithm::Blake3.name(), "BLAKE3");
    }
}
