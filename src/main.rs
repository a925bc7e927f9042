//! treeskip - CI job skipper
//!
//! CLI entry point that dispatches to subcommands. The exit status carries
//! the decision: 0 skip, 1 run, 2 failure, 6 configuration error.

use clap::Parser;
use console::style;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;
use treeskip::cli::args::{ConfigAction, ConfigArgs};
use treeskip::cli::{Cli, Commands, LogFormat};
use treeskip::config::{Config, ConfigManager};
use treeskip::error::{TreeskipError, TreeskipResult, EXIT_CONFIG_ERROR};

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::from(EXIT_CONFIG_ERROR)
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    match run(cli) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::from(e.kind().exit_code())
        }
    }
}

fn run(cli: Cli) -> TreeskipResult<u8> {
    let cwd = std::env::current_dir().map_err(|e| TreeskipError::io("getting current directory", e))?;
    let manager = match &cli.config {
        Some(path) => ConfigManager::with_path(path.clone()),
        None => ConfigManager::find_local_config(&cwd)
            .map(ConfigManager::with_path)
            .unwrap_or_else(|| ConfigManager::in_dir(&cwd)),
    };

    // Init command doesn't need config loading
    if let Commands::Config(ConfigArgs {
        action: Some(ConfigAction::Init { force }),
    }) = cli.command
    {
        init_logging(&cli, &Config::default());
        treeskip::cli::commands::config::init_config(&manager, force)?;
        return Ok(0);
    }

    let config = manager.load()?;
    init_logging(&cli, &config);
    debug!("Configuration file: {}", manager.path().display());

    match cli.command {
        Commands::Check(args) => Ok(treeskip::cli::commands::check(args, &config)?.exit_code()),
        Commands::Fingerprint(args) => {
            treeskip::cli::commands::fingerprint(args)?;
            Ok(0)
        }
        Commands::Config(args) => {
            treeskip::cli::commands::config(args, &manager, &config)?;
            Ok(0)
        }
    }
}

/// Logging: 0 = warn, 1 = info, 2+ = debug; always on stderr so stdout
/// only carries decisions and trace keys
fn init_logging(cli: &Cli, config: &Config) {
    let filter = match cli.verbosity() {
        0 => EnvFilter::new("treeskip=warn"),
        1 => EnvFilter::new("treeskip=info"),
        _ => EnvFilter::new("treeskip=debug"),
    };
    let json = match cli.log_format {
        Some(format) => format == LogFormat::Json,
        None => config.general.log_format == "json",
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}
