use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bizhealth::cli::commands::run::RunOptions;
use bizhealth::cli::{DEFAULT_ARTIFACTS_DIR, resolve_config};
use bizhealth::config::Environment;
use bizhealth::types::Phase;

#[derive(Parser)]
#[command(name = "bizhealth")]
#[command(
    version,
    about = "Phase orchestration and contract validation for business health diagnostics"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, short, global = true, help = "TOML config file layered over defaults")]
    config: Option<PathBuf>,

    #[arg(
        long = "env",
        global = true,
        env = "BIZHEALTH_ENV",
        default_value = "production",
        help = "Environment profile: test, development, production"
    )]
    environment: Environment,

    #[arg(long, global = true)]
    verbose: bool,

    #[arg(long, short, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every phase for one submission
    Run {
        #[arg(long, help = "Submission JSON (id, overview, intake scores)")]
        submission: PathBuf,
        #[arg(long, help = "Directory of recorded phase responses")]
        responses: PathBuf,
        #[arg(long, default_value = DEFAULT_ARTIFACTS_DIR, help = "Artifact root")]
        artifacts: PathBuf,
        #[arg(
            short = 'f',
            long,
            default_value = "text",
            help = "Output format: text, json"
        )]
        format: String,
    },

    /// Check a phase output file against its contract
    Validate {
        #[arg(long, help = "Phase that produced the file (e.g. phase1_5)")]
        phase: Phase,
        #[arg(help = "Phase output JSON")]
        file: PathBuf,
        #[arg(
            short = 'f',
            long,
            default_value = "text",
            help = "Output format: text, json"
        )]
        format: String,
    },

    /// Assemble the IDM from persisted artifacts and run the report gate
    Assemble {
        #[arg(long, help = "Submission id")]
        submission_id: String,
        #[arg(long, default_value = DEFAULT_ARTIFACTS_DIR, help = "Artifact root")]
        artifacts: PathBuf,
        #[arg(
            short = 'f',
            long,
            default_value = "text",
            help = "Output format: text, json"
        )]
        format: String,
    },

    /// Inspect configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show effective configuration (merged from all sources)
    Show {
        #[arg(
            short = 'f',
            long,
            default_value = "toml",
            help = "Output format: toml, json"
        )]
        format: String,
    },
    /// Check configuration bounds
    Validate,
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
        eprintln!("\x1b[31mbizhealth encountered an unexpected error:\x1b[0m");
        eprintln!("  {}", message);

        if let Some(location) = panic_info.location() {
            eprintln!(
                "\x1b[90mLocation: {}:{}:{}\x1b[0m",
                location.file(),
                location.line(),
                location.column()
            );
        }
        eprintln!();

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

fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = resolve_config(cli.environment, cli.config.as_deref());

    let filter = if cli.verbose {
        "debug".to_string()
    } else if cli.quiet {
        "error".to_string()
    } else {
        config
            .as_ref()
            .map(|c| c.log_level.clone())
            .unwrap_or_else(|_| "info".to_string())
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = config?;

    match cli.command {
        Commands::Run {
            submission,
            responses,
            artifacts,
            format,
        } => {
            bizhealth::cli::commands::run::run(
                config,
                RunOptions {
                    submission,
                    responses,
                    artifacts,
                    format,
                },
            )?;
        }
        Commands::Validate {
            phase,
            file,
            format,
        } => {
            bizhealth::cli::commands::validate::run(&config, phase, &file, &format)?;
        }
        Commands::Assemble {
            submission_id,
            artifacts,
            format,
        } => {
            bizhealth::cli::commands::assemble::run(config, &artifacts, &submission_id, &format)?;
        }
        Commands::Config { action } => match action {
            ConfigAction::Show { format } => {
                bizhealth::cli::commands::config::show(&config, &format)?;
            }
            ConfigAction::Validate => {
                bizhealth::cli::commands::config::validate(&config)?;
            }
        },
    }

    Ok(())
}
