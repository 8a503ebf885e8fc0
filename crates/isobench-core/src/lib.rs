//! Sweep engine for benchmarking external graph-isomorphism solvers.
//!
//! The solvers and the instance generator are opaque executables. This crate
//! runs them under time budgets over a sweep of problem sizes, stops a
//! variant whose cost has blown up, and turns the timings into a report and
//! a runtime-vs-size figure.
//!
//! ```no_run
//! use isobench_core::{
//!     CacheKeyMode, Figure, GenerationParams, InstanceCache, SizeSweep, SolverArgs, StopPolicy,
//!     SweepAxis, SweepController, SweepPlan, SystemRunner, Toolchain, Variant,
//! };
//! use std::time::Duration;
//!
//! # fn main() -> anyhow::Result<()> {
//! let tc = Toolchain::new("/path/to/solver-project");
//! let plan = SweepPlan {
//!     axis: SweepAxis::N2 { n1: 8 },
//!     sweep: SizeSweep::new(10, 50, 5)?,
//!     params: GenerationParams::default(),
//!     variants: vec![Variant {
//!         name: "approx".into(),
//!         label: "Approximation".into(),
//!         program: tc.bin(&tc.approx),
//!         args: SolverArgs::approx(3, 10),
//!         policy: StopPolicy::AlwaysRun,
//!     }],
//!     timeout: Duration::from_secs(60),
//!     generator: tc.bin(&tc.generator),
//!     workdir: tc.project_root.clone(),
//!     cache: InstanceCache::new("generated_benchmarks", CacheKeyMode::Params),
//! };
//! let table = SweepController::new(&SystemRunner, &plan).run()?;
//! Figure::for_sweep(plan.axis, 3, &plan.variants, &table, true).render("out.png".as_ref())?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod instance;
pub mod invoker;
pub mod process;
pub mod render;
pub mod report;
pub mod sweep;
pub mod toolchain;

pub use error::{RenderError, SweepError, SweepResult, ToolchainError};
pub use instance::{ensure_instance, CacheKeyMode, GenerationParams, InstanceCache, InstanceKey};
pub use invoker::{time_run, FailureReason, RunOutcome, SolverArgs};
pub use process::{CommandRunner, ExitKind, Invocation, ProcessOutput, SystemRunner};
pub use render::{Figure, PlotSeries, SeriesStyle};
pub use report::SweepReport;
pub use sweep::{
    ResultTable, SizeSweep, StopPolicy, SweepAxis, SweepController, SweepPlan, SweepRow,
    SweepState, Variant, VariantState, FAILURE_MARKER, RUN_FAILURE_MARKER,
};
pub use toolchain::Toolchain;
