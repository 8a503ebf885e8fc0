//! Arguments shared by every sweep command.

use clap::ValueEnum;
use isobench_core::toolchain::{DEFAULT_APPROX, DEFAULT_EXACT, DEFAULT_GENERATOR};
use isobench_core::CacheKeyMode;
use std::path::PathBuf;

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq)]
pub enum CacheKeyArg {
    /// generated_<n1>_<n2>.txt; reuses files even if densities or seed changed
    Size,
    /// generated_<n1>_<n2>_<digest>.txt; one file per parameter set
    #[default]
    Params,
}

impl From<CacheKeyArg> for CacheKeyMode {
    fn from(arg: CacheKeyArg) -> Self {
        match arg {
            CacheKeyArg::Size => CacheKeyMode::Size,
            CacheKeyArg::Params => CacheKeyMode::Params,
        }
    }
}

#[derive(clap::Args, Clone, Debug)]
pub struct SweepCommonArgs {
    /// Number of distinct isomorphic mappings required
    #[arg(long)]
    pub k: u32,

    /// Edge probability for G
    #[arg(long, default_value_t = 0.35)]
    pub density_g: f64,

    /// Edge probability for H
    #[arg(long, default_value_t = 0.20)]
    pub density_h: f64,

    /// RNG seed passed to the generator
    #[arg(long, default_value_t = 12345)]
    pub seed: u64,

    /// Let the generator pick its own seed
    #[arg(long, conflicts_with = "seed")]
    pub no_seed: bool,

    /// Approximation solver trials multiplier
    #[arg(long, default_value_t = 10)]
    pub trials_multiplier: u32,

    /// Per-run timeout for solvers, in seconds (fractions allowed)
    #[arg(long, default_value_t = 60.0)]
    pub timeout_seconds: f64,

    /// Path to save the figure (default: in the project root)
    #[arg(long, short)]
    pub output: Option<PathBuf>,

    /// Disable log scale on the y-axis
    #[arg(long)]
    pub no_log_scale: bool,

    /// Write a JSON report to this path ("-" for stdout)
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// How cached instance files are named
    #[arg(long, value_enum, default_value_t = CacheKeyArg::Params)]
    pub cache_key: CacheKeyArg,

    /// Fail instead of running `cargo build --release` when binaries are missing
    #[arg(long)]
    pub no_build: bool,

    #[command(flatten)]
    pub paths: ToolchainArgs,
}

#[derive(clap::Args, Clone, Debug)]
pub struct ToolchainArgs {
    /// Root of the solver project (working directory for all spawned programs)
    #[arg(long, default_value = ".", env = "ISOBENCH_PROJECT_ROOT")]
    pub project_root: PathBuf,

    /// Directory holding the binaries (default: <project-root>/target/release)
    #[arg(long, env = "ISOBENCH_BIN_DIR")]
    pub bin_dir: Option<PathBuf>,

    /// Directory for generated instances (default: <project-root>/examples/generated_benchmarks)
    #[arg(long, env = "ISOBENCH_CACHE_DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Instance generator binary name
    #[arg(long, default_value = DEFAULT_GENERATOR)]
    pub generator_bin: String,

    /// Exact solver binary name
    #[arg(long, default_value = DEFAULT_EXACT)]
    pub exact_bin: String,

    /// Approximation solver binary name
    #[arg(long, default_value = DEFAULT_APPROX)]
    pub approx_bin: String,
}
