use clap::{Parser, Subcommand};

pub mod common;
pub mod sweep;
pub use common::*;
pub use sweep::*;

#[derive(Parser)]
#[command(
    name = "isobench",
    version,
    about = "Benchmark exact and approximate subgraph-isomorphism solvers over a size sweep"
)]
pub struct Cli {
    /// Debug-level logging (RUST_LOG takes precedence)
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Exact vs approximation runtime over |VG| (n1) for a fixed |VH| (n2)
    N1Sweep(N1SweepArgs),
    /// Approximation runtime over |VH| (n2) for a fixed |VG| (n1) and k
    N2Sweep(N2SweepArgs),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_n1_sweep_defaults() {
        let cli = Cli::try_parse_from(["isobench", "n1-sweep", "--n2", "25", "--k", "2"]).unwrap();
        let Command::N1Sweep(args) = cli.cmd else {
            panic!("expected n1-sweep");
        };
        assert_eq!((args.n1_start, args.n1_end, args.n1_step), (2, 9, 1));
        assert_eq!(args.common.seed, 12345);
        assert_eq!(args.common.trials_multiplier, 10);
        assert_eq!(args.common.timeout_seconds, 60.0);
        assert_eq!(args.common.cache_key, CacheKeyArg::Params);
        assert!(!args.common.no_log_scale);
    }

    #[test]
    fn test_n2_sweep_requires_bounds() {
        assert!(Cli::try_parse_from(["isobench", "n2-sweep", "--n1", "8", "--k", "3"]).is_err());
        let cli = Cli::try_parse_from([
            "isobench", "n2-sweep", "--n1", "8", "--k", "3", "--n2-start", "10", "--n2-end", "50",
            "--n2-step", "5", "--no-log-scale", "--cache-key", "size",
        ])
        .unwrap();
        let Command::N2Sweep(args) = cli.cmd else {
            panic!("expected n2-sweep");
        };
        assert_eq!((args.n2_start, args.n2_end, args.n2_step), (10, 50, 5));
        assert!(args.common.no_log_scale);
        assert_eq!(args.common.cache_key, CacheKeyArg::Size);
    }

    #[test]
    fn test_k_is_required() {
        assert!(Cli::try_parse_from(["isobench", "n1-sweep", "--n2", "25"]).is_err());
    }

    #[test]
    fn test_no_seed_conflicts_with_seed() {
        assert!(Cli::try_parse_from([
            "isobench", "n1-sweep", "--n2", "5", "--k", "1", "--seed", "1", "--no-seed"
        ])
        .is_err());
    }
}
