//! Kessler CLI — conjunction screening from the command line.

use clap::{Parser, Subcommand};

mod commands;
mod scenario;

#[derive(Parser)]
#[command(name = "kessler")]
#[command(version, about = "Kessler — orbital collision and conjunction screening engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a screening scenario from a config file.
    Screen {
        /// Path to the scenario file (TOML).
        #[arg(short, long, default_value = "scenario.toml")]
        config: String,

        /// Override the scenario's superstep count.
        #[arg(short, long)]
        steps: Option<u32>,
    },

    /// Validate a scenario file without running it.
    Validate {
        /// Path to the scenario file.
        path: String,
    },

    /// Run the built-in two-particle head-on demonstration.
    Demo,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Screen { config, steps } => commands::screen(&config, steps),
        Commands::Validate { path } => commands::validate(&path),
        Commands::Demo => commands::demo(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
