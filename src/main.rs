//! rotcheck - Bit Rot Detection for Directory Trees
//!
//! Entry point for the CLI application.

use anyhow::{Context, Result};
use clap::Parser;
use rotcheck::config::{CliArgs, RunConfig};
use rotcheck::engine::{ChecksumEngine, RunResult};
use rotcheck::progress::{print_file_list, print_summary};
use std::io::{self, BufRead, Write};
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<ExitCode> {
    let args = CliArgs::parse();

    let config = RunConfig::from_args(args).context("Invalid configuration")?;

    setup_logging(config.verbose, config.debug)?;

    info!(
        path = %config.engine.root.display(),
        mode = %config.mode,
        workers = config.engine.worker_count,
        quiet = config.engine.quiet,
        progress = config.engine.progress,
        yes = config.assume_yes,
        "Managing checksums"
    );

    if config.mode.is_mutating()
        && !config.assume_yes
        && !confirm("Are you sure you wish to update checksums and add new files")?
    {
        return Ok(ExitCode::FAILURE);
    }

    let mut engine = ChecksumEngine::new(config.engine.clone())
        .context("Could not initialize checksum engine")?;

    let result = engine
        .run(config.mode)
        .with_context(|| format!("{} failed", config.mode))?;

    if !config.engine.quiet {
        report(&config, &result);
    }

    if result.is_clean() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}

/// Print deferred findings (progress mode) and the summary
fn report(config: &RunConfig, result: &RunResult) {
    let has_findings = result.failed > 0 || result.updated > 0 || result.new > 0;

    if config.engine.progress {
        if has_findings {
            println!();
            print_file_list("failed", &result.failed_files);
            print_file_list("updated", &result.updated_files);
            print_file_list("new", &result.new_files);
        }
        println!();
    } else if has_findings {
        println!();
    }

    print_summary(result);
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{} [y/N]: ", prompt);
    io::stdout().flush().context("Could not write prompt")?;

    let mut answer = String::new();
    io::stdin()
        .lock()
        .read_line(&mut answer)
        .context("Could not read answer")?;

    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}

fn setup_logging(verbose: bool, debug: bool) -> Result<()> {
    let default = if debug {
        "rotcheck=debug,warn"
    } else if verbose {
        "rotcheck=info,warn"
    } else {
        "rotcheck=error"
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Could not set up logging: {}", e))?;

    Ok(())
}
