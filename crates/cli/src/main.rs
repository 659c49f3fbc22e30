use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;
mod config;
mod util;

use commands::*;

#[derive(Parser)]
#[command(version, about = "Generate, inspect and verify CV certificate requests for eID terminals")]
struct Cli {
    /// Trace level output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Dump a certificate or certificate request
    Inspect {
        /// DER or hex encoded file
        #[arg(required = true)]
        file: PathBuf,
    },

    /// Print the holder reference following the given one
    NextChr {
        /// Current holder reference, e.g. DETESTeID00001
        #[arg(required = true)]
        chr: String,

        /// Use this sequence number instead of counting up
        #[arg(short, long)]
        sequence: Option<u32>,
    },

    /// Generate a signed certificate request
    Request(RequestArgs),

    /// Check the signatures of a certificate request
    Verify(VerifyArgs),
}

fn main() -> eyre::Result<()> {
    // Parse command line arguments
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose);

    match &cli.command {
        Commands::Inspect { file } => inspect_command(file)?,
        Commands::NextChr { chr, sequence } => next_chr_command(chr, *sequence)?,
        Commands::Request(args) => {
            let config = config::load_config()?;
            request_command(args, &config)?
        }
        Commands::Verify(args) => verify_command(args)?,
    }

    Ok(())
}

fn setup_logging(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_ansi(true)
        .init();
}
