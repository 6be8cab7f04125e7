use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use stackforge::config::ModelTier;

/// Parse model tier from string
fn parse_model_tier(s: &str) -> Result<ModelTier, String> {
    s.parse()
}

#[derive(Parser)]
#[command(name = "stackforge")]
#[command(
    version,
    about = "AI-driven project generator: describe it, get a working codebase"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long)]
    verbose: bool,

    #[arg(long, short)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a project from a free-text description
    Generate {
        #[arg(help = "What to build, in plain language")]
        description: String,
        #[arg(long, short, help = "Project name (derived from intent when omitted)")]
        name: Option<String>,
        #[arg(long, value_parser = parse_model_tier, help = "Model tier: fast, balanced, quality (default: balanced)")]
        tier: Option<ModelTier>,
        #[arg(long, help = "Stream incremental model output")]
        stream: bool,
        #[arg(long, short, help = "Output directory for the generated project")]
        output: Option<PathBuf>,
        #[arg(long = "log-usage", help = "Print the per-stage token usage table")]
        log_usage: bool,
    },

    /// Check config, API key, and gateway reachability
    Doctor,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration (merged from all sources)
    Show {
        #[arg(
            short = 'f',
            long,
            default_value = "text",
            help = "Output format: text, json"
        )]
        format: String,
    },
    /// Show configuration file paths
    Path,
    /// Initialize global configuration
    Init {
        #[arg(long, help = "Overwrite existing config")]
        force: bool,
    },
}

/// Set up panic handler for graceful error reporting
fn setup_panic_handler() {
    let default_hook = std::panic::take_hook();

    std::panic::set_hook(Box::new(move |panic_info| {
        let message = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };

        eprintln!("\n\x1b[1;31m━━━ PANIC ━━━\x1b[0m");
        eprintln!("\x1b[31mStackforge encountered an unexpected error:\x1b[0m");
        eprintln!("  {}", message);

        if let Some(location) = panic_info.location() {
            eprintln!(
                "\x1b[90mLocation: {}:{}:{}\x1b[0m",
                location.file(),
                location.line(),
                location.column()
            );
        }

        // Call default hook for backtrace (if RUST_BACKTRACE=1)
        default_hook(panic_info);
    }));
}

fn main() -> ExitCode {
    setup_panic_handler();

    match run_cli() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("\x1b[31mError:\x1b[0m {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run_cli() -> stackforge::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match cli.command {
        Commands::Generate {
            description,
            name,
            tier,
            stream,
            output,
            log_usage,
        } => {
            stackforge::cli::commands::generate::run(
                stackforge::cli::commands::generate::GenerateRunOptions {
                    description,
                    name,
                    tier,
                    stream,
                    output,
                    log_usage,
                },
            )?;
        }
        Commands::Doctor => {
            stackforge::cli::commands::doctor::run()?;
        }
        Commands::Config { action } => match action {
            ConfigAction::Show { format } => {
                stackforge::cli::commands::config::show(&format)?;
            }
            ConfigAction::Path => {
                stackforge::cli::commands::config::path()?;
            }
            ConfigAction::Init { force } => {
                stackforge::cli::commands::config::init_global(force)?;
            }
        },
    }

    Ok(())
}
