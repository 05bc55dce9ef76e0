use clap::{CommandFactory, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "focusloop", version, about = "Restart-safe focus session timer")]
struct Cli {
    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Timer control
    Timer {
        #[command(subcommand)]
        action: commands::timer::TimerAction,
    },
    /// Aggregate session statistics
    Stats,
    /// Closed session history
    History {
        #[command(subcommand)]
        action: commands::history::HistoryAction,
    },
    /// Focus period goals
    Period {
        #[command(subcommand)]
        action: commands::period::PeriodAction,
    },
    /// Energy and mood used for adaptive durations
    Signals {
        #[command(subcommand)]
        action: commands::signals::SignalsAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Print a shell completion script
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("focusloop=debug,focusloop_core=debug")
    } else {
        EnvFilter::try_from_env("FOCUSLOOP_LOG")
            .unwrap_or_else(|_| EnvFilter::new("focusloop=warn,focusloop_core=warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Timer { action } => commands::timer::run(action).await,
        Commands::Stats => commands::stats::run().await,
        Commands::History { action } => commands::history::run(action).await,
        Commands::Period { action } => commands::period::run(action).await,
        Commands::Signals { action } => commands::signals::run(action).await,
        Commands::Config { action } => commands::config::run(action),
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "focusloop", &mut std::io::stdout());
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
