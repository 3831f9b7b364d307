//! IaCDrift CLI entry point.
//!
//! This binary provides the command-line interface for IaCDrift.

use clap::Parser;
use iacdrift::cli::{ChunkArgs, Cli, Commands, DEFAULT_CONFIG_FILE};
use iacdrift::reporter::{JsonlWriter, Reporter};
use iacdrift::{Chunker, Config, IacDriftError, OutputFormat};
use indicatif::{ProgressBar, ProgressStyle};
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> ExitCode {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Initialize logging
    init_logging(cli.verbose, cli.quiet);

    // Run the appropriate command
    match run(cli).await {
        Ok(exit_code) => exit_code,
        Err(e) => {
            tracing::error!(error = %e, "Fatal error");

            eprintln!("Error: {e}");

            // Print error chain (cause chain)
            let mut source = e.source();
            if source.is_some() {
                eprintln!("\nCaused by:");
                let mut i = 0;
                while let Some(cause) = source {
                    eprintln!("  {i}: {cause}");
                    source = cause.source();
                    i += 1;
                }
            }

            let code = e
                .downcast_ref::<IacDriftError>()
                .map_or(1, IacDriftError::exit_code);
            ExitCode::from(u8::try_from(code).unwrap_or(1))
        }
    }
}

fn init_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        // First try to use RUST_LOG from environment, otherwise use verbose flag
        EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            let base_level = match verbose {
                0 => "warn",
                1 => "info",
                2 => "debug",
                _ => "trace",
            };
            // iacdrift at the requested level, everything else at warn
            EnvFilter::new(format!("warn,iacdrift={base_level}"))
        })
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    tracing::debug!("Loading configuration");
    let mut config = load_config(&cli)?;
    config.load_ignore_from_env();

    match cli.command {
        Commands::Chunk(args) => {
            config.merge_cli_args(&args);
            config.validate()?;
            chunk(config, &args, cli.quiet).await
        }

        Commands::Init => {
            let config_path = std::path::Path::new(DEFAULT_CONFIG_FILE);
            if config_path.exists() {
                anyhow::bail!("Configuration file already exists: {}", config_path.display());
            }

            std::fs::write(config_path, Config::example_yaml())?;
            println!("Created example configuration: {DEFAULT_CONFIG_FILE}");
            Ok(ExitCode::from(0))
        }

        Commands::Validate(args) => {
            let config_content = std::fs::read_to_string(&args.config)?;
            match Config::from_yaml(&config_content) {
                Ok(_) => {
                    println!("Configuration is valid: {}", args.config.display());
                    Ok(ExitCode::from(0))
                }
                Err(e) => {
                    eprintln!("Configuration error: {e}");
                    Ok(ExitCode::from(1))
                }
            }
        }
    }
}

async fn chunk(config: Config, args: &ChunkArgs, quiet: bool) -> anyhow::Result<ExitCode> {
    let targets = args.targets();
    let chunker = Chunker::new(config.clone());

    let progress = if quiet {
        ProgressBar::hidden()
    } else {
        ProgressBar::new_spinner()
    };
    progress.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    progress.enable_steady_tick(Duration::from_millis(120));
    progress.set_message(format!("Chunking {} repositories", targets.len()));

    let result = chunker.chunk_repositories(&targets).await;
    progress.finish_and_clear();

    let reporter = Reporter::new(&config);
    match args.format {
        OutputFormat::Jsonl => {
            let written = JsonlWriter::new(&config).write_all(&result)?;
            tracing::info!(files = written.len(), dir = %config.output.dir.display(), "Chunks written");
            if !quiet {
                println!("{}", reporter.generate(&result, OutputFormat::Text)?);
            }
        }
        format => {
            let report = reporter.generate(&result, format)?;
            if let Some(ref output_path) = args.output {
                std::fs::write(output_path, &report)?;
                tracing::info!(path = %output_path.display(), "Report written");
            } else {
                println!("{report}");
            }
        }
    }

    // Every requested repository failed
    if result.repositories.is_empty() && !result.failures.is_empty() {
        return Ok(ExitCode::from(2));
    }
    Ok(ExitCode::from(0))
}

fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    // Check for explicit config file
    if let Some(ref config_path) = cli.config {
        tracing::debug!(path = %config_path.display(), "Loading configuration from explicit path");
        let content = std::fs::read_to_string(config_path)?;
        return Ok(Config::from_yaml(&content)?);
    }

    // Look for default config files
    let default_paths = [DEFAULT_CONFIG_FILE, "iacdrift.yml", ".iacdrift.yaml"];
    for path in &default_paths {
        if std::path::Path::new(path).exists() {
            tracing::debug!(path = %path, "Found configuration file");
            let content = std::fs::read_to_string(path)?;
            return Ok(Config::from_yaml(&content)?);
        }
    }

    tracing::debug!("No configuration file found, using default configuration");
    Ok(Config::default())
}
