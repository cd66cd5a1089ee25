//! qgate - quality gate hooks for AI coding agent tool calls.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use qgate::cli;
use qgate::config::Config;
use qgate::event::Phase;

#[derive(Parser)]
#[command(name = "qgate")]
#[command(about = "qgate - quality gate for AI coding agent tool calls")]
#[command(version)]
struct Cli {
    /// Project root (default: the event's cwd, else the current directory)
    #[arg(long, global = true)]
    project_root: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Gate a tool call before it runs (event JSON on stdin)
    Pre,

    /// Check a tool call after it ran (event JSON on stdin)
    Post,

    /// Print the session-start agent summary
    Session,

    /// Register qgate hooks in .claude/settings.json
    Install,

    /// Show the effective configuration
    Config,
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("qgate={}", level)));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let root = cli
        .project_root
        .clone()
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."));
    let config = Config::load(&root);
    init_logging(&config.log.level);

    let code = match cli.command {
        Commands::Pre => cli::hook::run(Phase::Pre, cli.project_root).await,
        Commands::Post => cli::hook::run(Phase::Post, cli.project_root).await,
        Commands::Session => {
            cli::session::run(&root, &config);
            0
        }
        Commands::Install => match cli::install::run(&root) {
            Ok(()) => 0,
            Err(e) => {
                eprintln!("qgate install failed: {}", e);
                1
            }
        },
        Commands::Config => match cli::config::show(&root, &config) {
            Ok(()) => 0,
            Err(e) => {
                eprintln!("qgate config failed: {}", e);
                1
            }
        },
    };

    std::process::exit(code);
}
