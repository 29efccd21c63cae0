use std::path::PathBuf;

/// Command line interface for `zvertex` executable
#[derive(clap::Parser, Debug, Clone)]
#[clap(
    name = "zvertex",
    about = "Simulate a cylindrical tracker and reconstruct z-vertices",
)]
pub (super) struct Cli {
    #[clap(subcommand)]
    pub (super) command: Command,
}

#[derive(clap::Subcommand, Debug, Clone)]
pub (super) enum Command {

    /// Simulate events and write their hits
    Sim {
        /// TOML configuration; built-in defaults if absent
        #[clap(short, long)]
        config: Option<PathBuf>,

        /// Hit store to be written
        #[clap(short, long)]
        out: PathBuf,

        /// Keep complete events in memory and summarize them
        #[clap(long)]
        persist: bool,

        /// Simulate events in parallel, each with its own random stream
        #[clap(long)]
        parallel: bool,

        /// Maximum number of rayon threads
        #[clap(short = 'j', long, default_value = "4")]
        threads: usize,
    },

    /// Reconstruct one z-vertex per event from a hit store
    Rec {
        #[clap(short, long)]
        config: Option<PathBuf>,

        /// Hit store written by `sim`
        #[clap(short, long)]
        input: PathBuf,

        /// Store for the reconstructed vertices
        #[clap(short, long)]
        out: PathBuf,

        /// Maximum number of rayon threads
        #[clap(short = 'j', long, default_value = "4")]
        threads: usize,
    },

    /// Efficiency and resolution of a reconstruction
    Ana {
        #[clap(short, long)]
        config: Option<PathBuf>,

        /// Hit store written by `sim`
        #[clap(short, long)]
        input: PathBuf,

        /// Vertices written by `rec`
        #[clap(short, long)]
        reco: PathBuf,

        /// Write the report to this file as well
        #[clap(short, long)]
        out: Option<PathBuf>,
    },
}
