use clap::Parser;
use std::path::PathBuf;

pub const DEFAULT_TIMESTEP_SIZE: f64 = 1.0 / 60.0;
pub const MAX_TIMESTEP_SIZE: f64 = 0.1;

#[derive(Debug, Parser, Clone)]
#[clap(
    version = "0.1.0",
    name = "arcadesim",
    about = "A real-time arcade race simulator written in Rust"
)]
pub struct SimOpts {
    // FLAGS ---------------------------------------------------------------------------------------
    /// Activate debug logging (RUST_LOG takes precedence)
    #[clap(short, long)]
    pub debug: bool,

    /// Simulate in real time and print the HUD while racing (only the first run)
    #[clap(short, long)]
    pub realtime: bool,

    // OPTIONS -------------------------------------------------------------------------------------
    /// Set number of simulation runs, runs are executed in parallel
    #[clap(short, long, default_value = "1")]
    pub no_sim_runs: u32,

    /// Set path to the simulation parameter file (OPTIONAL: if not set, the built-in oval race
    /// against three AI drivers is used)
    #[clap(short, long)]
    pub parfile_path: Option<PathBuf>,

    /// Set path to a simulation constants file, replaces the model tuning of the parameter file
    #[clap(short, long)]
    pub constants_path: Option<PathBuf>,

    /// Set seed of the random number generator, overrides the seed of the parameter file
    #[clap(short, long)]
    pub seed: Option<u64>,

    /// Set real-time factor (only relevant in real-time mode)
    #[clap(long, default_value = "1.0")]
    pub realtime_factor: f64,

    /// Set simulation timestep size in seconds, clamped to (0, 0.1]
    #[clap(short, long, default_value = "0.016666666666666666")]
    pub timestep_size: f64,

    /// Abort a race after this simulated time in seconds
    #[clap(short, long, default_value = "1800.0")]
    pub max_race_time: f64,

    /// Write lap and race times of the first run to this file
    #[clap(short, long)]
    pub output_path: Option<PathBuf>,

    /// Read the career totals from and write the profile record of the first run to this file
    #[clap(long)]
    pub profile_path: Option<PathBuf>,
}

impl SimOpts {
    /// clamped_timestep_size returns the time step clamped to (0, 0.1], invalid values fall back to
    /// 1/60 s.
    pub fn clamped_timestep_size(&self) -> f64 {
        if self.timestep_size > 0.0 && self.timestep_size.is_finite() {
            self.timestep_size.min(MAX_TIMESTEP_SIZE)
        } else {
            DEFAULT_TIMESTEP_SIZE
        }
    }
}
