use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod terminal;

#[derive(Parser)]
#[command(name = "athlete-timer", version, about = "Rest, meditation and PT exercise timers")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a timed session in the terminal
    Run(commands::run::RunArgs),
    /// List built-in session templates
    Templates {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show logged session results
    History {
        /// Only this kind (rest, meditation, pt_exercise)
        #[arg(long)]
        kind: Option<String>,
        /// Maximum rows
        #[arg(long, default_value = "20")]
        limit: usize,
    },
    /// Per-kind adherence summary
    Stats,
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// API token management
    Auth {
        #[command(subcommand)]
        action: commands::auth::AuthAction,
    },
    /// Show the daily reminder schedule
    Reminders {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Upload locally logged results the API hasn't accepted yet
    Sync,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = athlete_timer_core::Config::peek().log_level;
        EnvFilter::try_new(&level).unwrap_or_else(|_| EnvFilter::new("info"))
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing();

    let result = match cli.command {
        Commands::Run(args) => commands::run::run(args),
        Commands::Templates { json } => commands::templates::run(json),
        Commands::History { kind, limit } => commands::history::history(kind.as_deref(), limit),
        Commands::Stats => commands::history::stats(),
        Commands::Config { action } => commands::config::run(action),
        Commands::Auth { action } => commands::auth::run(action),
        Commands::Reminders { json } => commands::reminders::run(json),
        Commands::Sync => commands::sync::run(),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
