use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Parser, Clone)]
#[command(
    version = "0.1.0",
    author = "racebot contributors",
    name = "racebot",
    about = "Runs scripted races through the race lifecycle of a race room bot"
)]
pub struct RaceOpts {
    // FLAGS ---------------------------------------------------------------------------------------
    /// Activate debug printing (room leaderboards and debug log messages)
    #[arg(short, long)]
    pub debug: bool,

    // OPTIONS -------------------------------------------------------------------------------------
    /// Set number of independent races (run in parallel if greater than one)
    #[arg(short, long, default_value = "1")]
    pub no_races: u32,

    /// Set path to the race parameter file
    #[arg(short, long)]
    pub parfile_path: PathBuf,
}
