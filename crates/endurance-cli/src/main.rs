//! CLI for the Endurance bridge console.

mod commands;
mod tui;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "endurance")]
#[command(about = "endurance — bridge console for the Endurance: telemetry, controls, mission log")]
#[command(version = endurance_core::VERSION)]
struct Cli {
    /// Path to a JSON config file (data_dir, log_key, seed, default_author, pump_interval_ms)
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the built-in panels with their channels and controls
    Panels,

    /// Build a panel, drift it N times, print the readings
    Snapshot {
        /// Panel name (ship_status, life_support, navigation, communications)
        #[arg(long, default_value = "ship_status")]
        panel: String,

        /// Immediate drift passes before printing
        #[arg(long, default_value = "0")]
        ticks: usize,

        /// Drift seed (overrides the config file)
        #[arg(long)]
        seed: Option<u64>,

        /// Print the full snapshot as JSON
        #[arg(long)]
        json: bool,
    },

    /// Stream panel readings to stdout until Ctrl+C
    Watch {
        /// Panel name
        #[arg(long, default_value = "life_support")]
        panel: String,

        /// Print interval (e.g. "500ms", "1s", "1m")
        #[arg(long, default_value = "1s")]
        interval: String,

        /// Drift seed (overrides the config file)
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Live interactive bridge dashboard (TUI)
    Monitor {
        /// Panel to open first
        #[arg(long, default_value = "ship_status")]
        panel: String,

        /// Refresh rate in seconds
        #[arg(long, default_value = "0.25")]
        refresh: f64,
    },

    /// Read or write the mission log
    Log {
        #[command(subcommand)]
        action: LogAction,
    },

    /// Start the HTTP panel server
    Server {
        /// Port to listen on
        #[arg(long, default_value = "8042")]
        port: u16,

        /// Bind address
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
    },
}

#[derive(Subcommand)]
enum LogAction {
    /// Print entries, most recent first
    List {
        /// Show at most N entries
        #[arg(long)]
        limit: Option<usize>,

        /// Print entries as JSON
        #[arg(long)]
        json: bool,
    },

    /// Append a new entry
    Append {
        /// Crew member signing the entry (defaults to the config's default_author)
        #[arg(long)]
        author: Option<String>,

        /// Entry text
        #[arg(long)]
        content: String,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let config = commands::load_config(cli.config.as_deref());

    match cli.command {
        Commands::Panels => commands::panels::run(),
        Commands::Snapshot {
            panel,
            ticks,
            seed,
            json,
        } => commands::snapshot::run(&config, &panel, ticks, seed, json),
        Commands::Watch {
            panel,
            interval,
            seed,
        } => commands::watch::run(&config, &panel, &interval, seed),
        Commands::Monitor { panel, refresh } => commands::monitor::run(&config, &panel, refresh),
        Commands::Log { action } => match action {
            LogAction::List { limit, json } => commands::mission_log::list(&config, limit, json),
            LogAction::Append { author, content } => {
                commands::mission_log::append(&config, author.as_deref(), &content)
            }
        },
        Commands::Server { port, host } => commands::server::run(&config, &host, port),
    }
}
