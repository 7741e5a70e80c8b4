//! opusctl - drive Opus encoder and decoder sessions from the command line.

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

use commands::{ConfigCommand, CtlCommand, ProbeCommand, SimulateCommand};

/// opusctl - drive Opus encoder and decoder sessions from the command line.
///
/// This tool lets you:
///   - Run ctl sequences (set/get bitrate, complexity, DTX, ...) on a fresh session
///   - Simulate DTX over stretches of speech and silence
///   - Inspect Opus packets and the durations a decoder reports for them
///
/// Session settings come from profiles stored in ~/.opusctl/config.yaml,
/// managed like kubectl contexts.
#[derive(Parser)]
#[command(name = "opusctl")]
#[command(about = "Opus session control tool")]
#[command(version)]
pub struct Cli {
    /// Config file (default is ~/.opusctl/config.yaml)
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Profile name to use
    #[arg(short = 'p', long, global = true)]
    pub profile: Option<String>,

    /// Output file (default: stdout)
    #[arg(short = 'o', long, global = true)]
    pub output: Option<String>,

    /// Input request file (YAML or JSON, `-` for stdin)
    #[arg(short = 'f', long = "file", global = true)]
    pub input: Option<String>,

    /// Output as JSON (for piping)
    #[arg(long, global = true)]
    pub json: bool,

    /// Verbose output
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage CLI configuration
    Config(ConfigCommand),
    /// Run ctl requests against a fresh session
    Ctl(CtlCommand),
    /// Simulate DTX decisions over speech and silence
    Simulate(SimulateCommand),
    /// Inspect Opus packets given as hex
    Probe(ProbeCommand),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match &cli.command {
        Commands::Config(cmd) => cmd.run(&cli),
        Commands::Ctl(cmd) => cmd.run(&cli),
        Commands::Simulate(cmd) => cmd.run(&cli),
        Commands::Probe(cmd) => cmd.run(&cli),
    }
}
