//! memoforge CLI entry point.
//!
//! Commands:
//! - `run`       Run the pipeline over a request file and export the memo
//! - `classify`  Show how a text file splits into fragments
//! - `pack`      Pack a text file into a token budget
//! - `config`    Initialise, show or validate configuration

use clap::{Parser, Subcommand};
use memoforge_core::ExportFormat;
use std::path::PathBuf;

mod commands;
mod request;

#[derive(Parser)]
#[command(
    name = "memoforge",
    about = "memoforge: turn deal material into an investment memorandum",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    /// Config file (defaults to ~/.memoforge/config.toml)
    #[arg(short, long, global = true, env = "MEMOFORGE_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline for a request file
    Run {
        /// Request file (TOML) listing documents, URLs, profiles and deal terms
        request: PathBuf,

        /// Export format: html, markdown or text
        #[arg(short, long, default_value = "html")]
        format: ExportFormat,

        /// Directory the memo is written to
        #[arg(short, long, default_value = ".")]
        output_dir: PathBuf,

        /// Print the run report as JSON on stdout
        #[arg(long)]
        report: bool,
    },

    /// Split a text file into classified fragments
    Classify {
        file: PathBuf,

        /// Print fragments as JSON
        #[arg(long)]
        json: bool,
    },

    /// Pack a text file into a token budget
    Pack {
        file: PathBuf,

        /// Override packer.max_tokens
        #[arg(long)]
        max_tokens: Option<usize>,

        /// Override packer.reserve
        #[arg(long)]
        reserve: Option<usize>,

        /// Print the pack report as JSON instead of the packed text
        #[arg(long)]
        json: bool,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Write a default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Print the effective configuration (keys redacted)
    Show,
    /// Validate the configuration
    Validate,
    /// Print the config file path
    Path,
}

fn init_tracing(verbose: bool, json: bool) {
    let filter = if verbose { "debug" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));

    // Logs go to stderr so stdout stays clean for memo/report output.
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_json);
    let config = cli.config.as_deref();

    match cli.command {
        Commands::Run {
            request,
            format,
            output_dir,
            report,
        } => commands::run::run(config, &request, format, &output_dir, report).await?,
        Commands::Classify { file, json } => commands::classify::run(config, &file, json).await?,
        Commands::Pack {
            file,
            max_tokens,
            reserve,
            json,
        } => commands::pack::run(config, &file, max_tokens, reserve, json).await?,
        Commands::Config { action } => match action {
            ConfigAction::Init { force } => commands::config_cmd::init(config, force).await?,
            ConfigAction::Show => commands::config_cmd::show(config).await?,
            ConfigAction::Validate => commands::config_cmd::validate(config).await?,
            ConfigAction::Path => commands::config_cmd::path(config).await?,
        },
    }

    Ok(())
}
