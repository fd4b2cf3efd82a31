use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "soulfuse",
    about = "SoulFuse: preview every soul a fusion can produce",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// List every possible fused soul with its probability
    Fuse(FuseArgs),
    /// Show per-slot probabilities of the fused soul
    Marginals(MarginalsArgs),
    /// Generate random souls
    Random(RandomArgs),
    /// Validate a rule table
    Check(CheckArgs),
    /// List slots and their values
    Slots(SlotsArgs),
}

#[derive(Args)]
pub struct RulesArgs {
    /// Rule table (TOML)
    #[arg(short, long, default_value = "config/souls.toml")]
    pub rules: PathBuf,
}

#[derive(Args)]
pub struct FuseArgs {
    #[command(flatten)]
    pub rules: RulesArgs,
    /// Left parent, as slot=value,slot=value,...
    #[arg(long)]
    pub left: Option<String>,
    /// Right parent, as slot=value,slot=value,...
    #[arg(long)]
    pub right: Option<String>,
    /// Positions to include in the combined probability
    #[arg(short, long)]
    pub select: Vec<usize>,
    /// Show at most this many results
    #[arg(short = 'n', long)]
    pub limit: Option<usize>,
    /// Drop branches less likely than this while expanding
    #[arg(long, default_value = "0")]
    pub epsilon: f64,
}

#[derive(Args)]
pub struct MarginalsArgs {
    #[command(flatten)]
    pub rules: RulesArgs,
    #[arg(long)]
    pub left: String,
    #[arg(long)]
    pub right: String,
}

#[derive(Args)]
pub struct RandomArgs {
    #[command(flatten)]
    pub rules: RulesArgs,
    #[arg(long)]
    pub seed: Option<u64>,
    #[arg(short = 'n', long, default_value = "1")]
    pub count: usize,
}

#[derive(Args)]
pub struct CheckArgs {
    #[command(flatten)]
    pub rules: RulesArgs,
}

#[derive(Args)]
pub struct SlotsArgs {
    #[command(flatten)]
    pub rules: RulesArgs,
}
