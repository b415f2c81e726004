//! SafeDrop CLI
//!
//! Build a policy index from documents and answer customer questions from it.

mod commands;

use clap::{Parser, Subcommand};
use commands::{AskCommand, ChatCommand, IngestCommand, StatsCommand};
use safedrop_core::logging::{self, LogFormat};
use safedrop_core::{AppConfig, AppError, AppResult};
use std::path::PathBuf;
use std::process::ExitCode;

/// SafeDrop - policy-aware answers for parcel delivery support
#[derive(Parser, Debug)]
#[command(name = "safedrop")]
#[command(about = "Policy-aware question answering over SafeDrop delivery policies", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true, env = "SAFEDROP_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to config file (default: <workspace>/.safedrop/config.yaml)
    #[arg(short, long, global = true, env = "SAFEDROP_CONFIG")]
    config: Option<PathBuf>,

    /// Log level or filter (error, warn, info, debug, trace)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    json_logs: bool,

    /// Answer generation backend (ollama, openai)
    #[arg(short, long, global = true)]
    provider: Option<String>,

    /// Answer generation model
    #[arg(short, long, global = true)]
    model: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build the policy index from a directory of documents
    Ingest(IngestCommand),

    /// Answer one question
    Ask(AskCommand),

    /// Answer questions read line by line from stdin
    Chat(ChatCommand),

    /// Show what the index contains
    Stats(StatsCommand),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("Command failed: {}", e);
            report_error(&e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> AppResult<()> {
    let config = AppConfig::load(cli.workspace, cli.config)?.with_overrides(
        cli.provider,
        cli.model,
        cli.log_level,
        cli.verbose,
        cli.no_color,
    );

    let format = if cli.json_logs || config.json_logs {
        LogFormat::Json
    } else {
        LogFormat::Pretty
    };
    logging::init_logging(config.log_level.as_deref(), config.no_color, format)?;

    config.validate()?;

    tracing::debug!("Workspace: {:?}", config.workspace);
    tracing::debug!("Backend: {} ({})", config.llm.provider, config.llm.model);

    let command_name = match &cli.command {
        Commands::Ingest(_) => "ingest",
        Commands::Ask(_) => "ask",
        Commands::Chat(_) => "chat",
        Commands::Stats(_) => "stats",
    };
    let _span = tracing::info_span!("command", name = command_name).entered();

    let result = match cli.command {
        Commands::Ingest(cmd) => cmd.execute(&config).await,
        Commands::Ask(cmd) => cmd.execute(&config).await,
        Commands::Chat(cmd) => cmd.execute(&config).await,
        Commands::Stats(cmd) => cmd.execute(&config),
    };

    if result.is_ok() {
        tracing::info!("Command completed successfully");
    }

    result
}

/// One line for the error, one for the fix when there is a known one.
fn report_error(error: &AppError) {
    eprintln!("error: {}", error);
    if let Some(fix) = error.remediation() {
        eprintln!("hint: {}", fix);
    }
}
