use clap::{CommandFactory, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "focuslist-cli", version, about = "Focuslist CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run an interactive interval session over one or more tasks
    Session(commands::session::SessionArgs),
    /// Show how many focus cycles a task duration maps to
    Cycles {
        /// Declared task duration in minutes
        minutes: String,
    },
    /// Format a millisecond duration as MM:SS
    Clock {
        /// Duration in milliseconds
        #[arg(allow_negative_numbers = true)]
        ms: i64,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Print shell completions
    Completions {
        shell: clap_complete::Shell,
    },
}

/// Warnings, plus notifier alerts at info.
const DEFAULT_LOG_FILTER: &str = "warn,focuslist::notify=info";

/// Logs go to stderr so stdout stays a clean JSON stream.
fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    init_tracing();
    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Session(args) => commands::session::run(args),
        Commands::Cycles { minutes } => {
            println!("{}", commands::cycles_line(&minutes));
            Ok(())
        }
        Commands::Clock { ms } => {
            println!("{}", focuslist_core::ms_to_clock_string(ms));
            Ok(())
        }
        Commands::Config { action } => commands::config::run(action),
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "focuslist-cli", &mut std::io::stdout());
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
