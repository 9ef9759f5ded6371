//! CopyTool CLI - copy a file through a reader and a writer thread

use clap::error::ErrorKind;
use clap::Parser;
use copytool::cli;
use copytool::config::{CliArgs, OutputFormat};
use copytool::core::CopyResult;
use copytool::error::{exit_code, CopyToolError, Result};
use tracing_subscriber::EnvFilter;

fn main() {
    let args = match CliArgs::try_parse() {
        Ok(args) => args,
        Err(e) => {
            if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) {
                e.exit();
            }
            let _ = e.print();
            std::process::exit(exit_code::WRONG_USAGE);
        }
    };

    // Initialize logging; RUST_LOG wins over -v/-q
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(args.log_level())),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let stdin = std::io::stdin();
    let mut input = stdin.lock();
    let mut output = std::io::stdout();

    let outcome = cli::run(&args, &mut input, &mut output).and_then(|result| report(&args, &result));

    match outcome {
        Ok(()) => std::process::exit(exit_code::SUCCESS),
        Err(CopyToolError::Usage(usage)) => {
            println!("{}", usage);
            std::process::exit(exit_code::WRONG_USAGE);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(e.exit_code());
        }
    }
}

fn report(args: &CliArgs, result: &CopyResult) -> Result<()> {
    match args.output_format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(result)?),
        OutputFormat::Text if !args.quiet => result.print_summary(),
        OutputFormat::Text => {}
    }
    Ok(())
}
