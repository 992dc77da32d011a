mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "cellgraph")]
#[command(about = "Evaluate sheets of dependent cells, iterating circular references to convergence")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate a sheet and print the final values
    Eval {
        /// Path to the sheet file (.toml)
        sheet: PathBuf,

        /// Maximum recomputations per cell (overrides the sheet's settings)
        #[arg(long)]
        limit: Option<usize>,

        /// Convergence threshold (overrides the sheet's settings)
        #[arg(long)]
        threshold: Option<f64>,

        /// Evaluate only these cells; everything else is an external input
        #[arg(long, value_delimiter = ',')]
        only: Vec<String>,
    },

    /// List the cyclic groups of a sheet
    Cycles {
        /// Path to the sheet file (.toml)
        sheet: PathBuf,
    },

    /// Show the evaluation plan of a sheet
    Order {
        /// Path to the sheet file (.toml)
        sheet: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_target(false)
        .init();

    match cli.command {
        Commands::Eval {
            sheet,
            limit,
            threshold,
            only,
        } => commands::eval::run(&sheet, limit, threshold, &only, cli.json),
        Commands::Cycles { sheet } => commands::cycles::run(&sheet, cli.json),
        Commands::Order { sheet } => commands::order::run(&sheet, cli.json),
    }
}
