use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Stop-signal task runner and experiment utilities
#[derive(Debug, Parser)]
#[command(name = "expkit", version)]
pub struct Cli {
    /// Config file; `./expkit.toml` is used when present and none is given
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run a JSON timeline and print the collected trial data
    Run {
        timeline: PathBuf,

        /// Wait out trial timings on the wall clock
        #[arg(long)]
        realtime: bool,

        /// Seed for the simulated participant
        #[arg(long)]
        seed: Option<u64>,

        /// Run without a participant; trials end only through their own deadlines
        #[arg(long)]
        no_participant: bool,
    },
    /// Convert survey rows (JSON array) into a paginated survey trial
    Survey { rows: PathBuf },
    /// Load the ITIs and named design files of one design
    Designs {
        /// Base url or directory; overrides the config
        #[arg(long)]
        base: Option<String>,

        #[arg(long)]
        design: u32,

        /// Design file names without the `.txt` extension
        names: Vec<String>,
    },
    /// Print a built-in timeline node as JSON
    Builtin { name: String },
}
