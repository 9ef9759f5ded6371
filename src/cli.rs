//! Command line front end
//!
//! Checks the paths, asks before overwriting, and hands the copy to a
//! [`CopyPipeline`]. Input and output streams are parameters so the prompt
//! can be driven from tests.

use crate::config::{CliArgs, PipelineConfig};
use crate::core::{CopyPipeline, CopyResult};
use crate::error::{CopyToolError, IoResultExt, Result};
use crate::progress::ProgressReporter;
use std::io::{BufRead, Write};
use std::path::Path;
use std::sync::Arc;

/// Run one copy as described by `args`
///
/// `input` answers the overwrite prompt, which is written to `output`.
pub fn run<R: BufRead, W: Write>(args: &CliArgs, input: &mut R, output: &mut W) -> Result<CopyResult> {
    let config = PipelineConfig::from_cli(args)?;
    preflight(&config, input, output)?;

    let progress = if args.progress && !args.quiet {
        ProgressReporter::new()
    } else {
        ProgressReporter::disabled()
    };

    CopyPipeline::from_config(&config)?
        .with_progress(Arc::new(progress))
        .copy_file(&config.source, &config.destination)
}

/// Checks done before any thread starts
///
/// The source must be an existing file that differs from the destination; an existing
/// destination needs confirmation unless `overwrite` is set.
pub fn preflight<R: BufRead, W: Write>(
    config: &PipelineConfig,
    input: &mut R,
    output: &mut W,
) -> Result<()> {
    if !config.source.exists() {
        return Err(CopyToolError::NotFound(config.source.clone()));
    }
    if config.source.is_dir() {
        return Err(CopyToolError::open_failed(
            &config.source,
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "source is a directory"),
        ));
    }

    if config.destination.exists() {
        if same_file(&config.source, &config.destination) {
            return Err(CopyToolError::SameSourceAndDestination(config.destination.clone()));
        }

        if !config.overwrite && !confirm_overwrite(&config.destination, input, output)? {
            return Err(CopyToolError::OverwriteDeclined(config.destination.clone()));
        }
        tracing::debug!("Overwriting {:?}", config.destination);
    }

    Ok(())
}

/// Ask whether `destination` may be overwritten
///
/// Only an answer starting with `y` or `Y` counts as yes; end of input is no.
pub fn confirm_overwrite<R: BufRead, W: Write>(
    destination: &Path,
    input: &mut R,
    output: &mut W,
) -> Result<bool> {
    writeln!(
        output,
        "Destination file \"{}\" already exists! Do you want to overwrite it?\n Y/N",
        destination.display()
    )
    .with_path("<stdout>")?;
    output.flush().with_path("<stdout>")?;

    let mut answer = String::new();
    input.read_line(&mut answer).with_path("<stdin>")?;

    Ok(matches!(answer.trim_start().chars().next(), Some('y' | 'Y')))
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
