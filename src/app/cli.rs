use crate::app::config::OutputFormat;
use clap::Parser;

#[derive(Debug, Clone, Parser)]
#[command(name = "filterpy")]
#[command(about = "Run a recursive filter over a column of measurements")]
#[command(version)]
pub struct CliConfig {
    /// Path to the TOML run file
    #[arg(short, long, default_value = "filterpy.toml")]
    pub config: String,

    /// Override the measurement CSV from the run file
    #[arg(short, long)]
    pub input: Option<String>,

    /// Override the output path from the run file
    #[arg(short, long)]
    pub output: Option<String>,

    /// Override the output format from the run file
    #[arg(long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub json_logs: bool,
}
