use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "compactor")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "Plan transparent compression of a directory tree", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Config file (default: ~/.config/compactor/config.toml)
    #[arg(long, global = true, env = "COMPACTOR_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Build a compression plan for a directory
    Plan(PlanArgs),

    /// Estimate savings per directory without planning
    Analyse(AnalyseArgs),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Parser)]
pub struct PlanArgs {
    /// Directory to plan
    pub path: PathBuf,

    /// Run slower, more accurate per-file checks
    #[arg(long)]
    pub thorough: bool,

    /// Skip directories whose estimated savings fall below this percentage
    #[arg(short, long)]
    pub min_savings: Option<f64>,

    /// Use one worker for every parallel stage
    #[arg(long)]
    pub single_worker: bool,

    /// Keep every eligible file, ignoring entropy estimates
    #[arg(long)]
    pub debug_scan_all: bool,

    /// List every planned file
    #[arg(short, long)]
    pub files: bool,

    /// Print the plan and statistics as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser)]
pub struct AnalyseArgs {
    /// Directory to analyse
    pub path: PathBuf,

    /// Savings percentage a directory must reach to count as compressible
    #[arg(short, long)]
    pub min_savings: Option<f64>,

    /// Use one worker for sampling
    #[arg(long)]
    pub single_worker: bool,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}
