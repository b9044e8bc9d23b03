use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod utils;

/// Content-centric forwarding node
#[derive(Parser)]
#[clap(author, version, about)]
struct Cli {
    /// Sets the level of verbosity
    #[clap(short, long, global = true)]
    verbose: bool,

    /// Configuration file (TOML, YAML or JSON)
    #[clap(short, long, global = true)]
    config: Option<PathBuf>,

    /// Subcommand to execute
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the forwarder until interrupted
    Run,

    /// Express an Interest against the configured static content
    Interest {
        /// Name to request (URI format)
        name: String,

        /// Interest lifetime in milliseconds
        #[clap(short, long, default_value = "4000")]
        timeout: u64,

        /// Minimum number of components after the name
        #[clap(long)]
        min_suffix: Option<usize>,

        /// Maximum number of components after the name
        #[clap(long)]
        max_suffix: Option<usize>,

        /// Prefer the rightmost (highest) match
        #[clap(long)]
        rightmost: bool,

        /// Exclude a next component (repeatable)
        #[clap(short, long)]
        exclude: Vec<String>,

        /// Print the answer as JSON
        #[clap(long)]
        json: bool,
    },

    /// Decode a file of wire-encoded messages and print them
    Inspect {
        /// File holding one or more encoded messages
        file: PathBuf,
    },

    /// Encode an Interest and write it to a file
    Encode {
        /// Name to request (URI format)
        name: String,

        /// Output file
        #[clap(short, long)]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse();

    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(
        if cli.verbose { "debug" } else { "info" }
    )).init();

    let config = cli.config.as_deref();
    match cli.command {
        Commands::Run => {
            commands::run::run_forwarder(config).await?;
        },
        Commands::Interest { name, timeout, min_suffix, max_suffix, rightmost, exclude, json } => {
            let request = commands::interest::Request {
                name,
                timeout_ms: timeout,
                min_suffix,
                max_suffix,
                rightmost,
                exclude,
                json,
            };
            commands::interest::express_interest(config, request).await?;
        },
        Commands::Inspect { file } => {
            commands::wire::inspect(&file)?;
        },
        Commands::Encode { name, output } => {
            commands::wire::encode_interest(&name, &output)?;
        },
    }

    Ok(())
}
