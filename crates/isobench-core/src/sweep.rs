//! Size sweeps and the controller that drives them.
//!
//! A sweep walks an increasing list of sizes. At each size the controller
//! provisions the instance, then times every variant that is still active.
//! A variant with [`StopPolicy::StopOnFirstFailure`] is stopped by its first
//! failure and from then on records [`FailureReason::Skipped`] without
//! spawning anything.

use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;
use tracing::info;

use crate::error::{SweepError, SweepResult};
use crate::instance::{ensure_instance, GenerationParams, InstanceCache, InstanceKey};
use crate::invoker::{time_run, FailureReason, RunOutcome, SolverArgs};
use crate::process::CommandRunner;

/// Summary marker for a missing point of a variant that stops on failure.
pub const FAILURE_MARKER: &str = "infeasible/timeout/fail";

/// Summary marker for a failed run of an always-run variant.
pub const RUN_FAILURE_MARKER: &str = "fail";

/// Sizes `start, start + step, ...` up to and including `end` when reachable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SizeSweep {
    pub start: usize,
    pub end: usize,
    pub step: usize,
}

impl SizeSweep {
    pub fn new(start: usize, end: usize, step: usize) -> SweepResult<Self> {
        if step == 0 {
            return Err(SweepError::InvalidSweep {
                message: "step must be > 0".into(),
            });
        }
        if start == 0 {
            return Err(SweepError::InvalidSweep {
                message: "sizes must be positive".into(),
            });
        }
        if start > end {
            return Err(SweepError::InvalidSweep {
                message: format!("start {start} is greater than end {end}"),
            });
        }
        Ok(Self { start, end, step })
    }

    pub fn sizes(&self) -> Vec<usize> {
        (self.start..=self.end).step_by(self.step).collect()
    }

    pub fn len(&self) -> usize {
        (self.end - self.start) / self.step + 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Which graph size varies; the other one is fixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "vary", rename_all = "snake_case")]
pub enum SweepAxis {
    /// Vary |VG| with |VH| fixed.
    N1 { n2: usize },
    /// Vary |VH| with |VG| fixed.
    N2 { n1: usize },
}

impl SweepAxis {
    pub fn key(&self, size: usize) -> InstanceKey {
        match *self {
            Self::N1 { n2 } => InstanceKey { n1: size, n2 },
            Self::N2 { n1 } => InstanceKey { n1, n2: size },
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::N1 { .. } => "n1",
            Self::N2 { .. } => "n2",
        }
    }
}

/// What happens to a variant after a failed run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopPolicy {
    /// Cost grows monotonically with size: one failure ends the variant.
    StopOnFirstFailure,
    /// Attempted at every size.
    AlwaysRun,
}

impl StopPolicy {
    pub fn failure_marker(self) -> &'static str {
        match self {
            Self::StopOnFirstFailure => FAILURE_MARKER,
            Self::AlwaysRun => RUN_FAILURE_MARKER,
        }
    }
}

/// One solver being benchmarked.
#[derive(Debug, Clone)]
pub struct Variant {
    /// Short name used in logs and reports (`exact`, `approx`).
    pub name: String,
    /// Legend label.
    pub label: String,
    pub program: PathBuf,
    pub args: SolverArgs,
    pub policy: StopPolicy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariantState {
    Active,
    Stopped,
}

/// Per-variant early-stop state, index-aligned with the plan's variants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepState {
    variants: Vec<VariantState>,
}

impl SweepState {
    pub fn new(n: usize) -> Self {
        Self {
            variants: vec![VariantState::Active; n],
        }
    }

    pub fn get(&self, idx: usize) -> VariantState {
        self.variants[idx]
    }
}

/// Outcomes at one sweep point, one per variant.
#[derive(Debug, Clone, PartialEq)]
pub struct SweepRow {
    pub size: usize,
    pub outcomes: Vec<RunOutcome>,
}

/// Append-only table of sweep rows.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultTable {
    variants: Vec<String>,
    rows: Vec<SweepRow>,
}

impl ResultTable {
    pub fn new(variants: Vec<String>) -> Self {
        Self {
            variants,
            rows: Vec::new(),
        }
    }

    pub fn push(&mut self, row: SweepRow) {
        debug_assert_eq!(row.outcomes.len(), self.variants.len());
        self.rows.push(row);
    }

    pub fn variants(&self) -> &[String] {
        &self.variants
    }

    pub fn rows(&self) -> &[SweepRow] {
        &self.rows
    }

    pub fn sizes(&self) -> Vec<usize> {
        self.rows.iter().map(|r| r.size).collect()
    }

    /// Outcomes of one variant in sweep order.
    pub fn column(&self, idx: usize) -> Vec<RunOutcome> {
        self.rows.iter().map(|r| r.outcomes[idx].clone()).collect()
    }

    /// `n1=2, exact=0.010000, approx=0.002000` per row. `policies` is
    /// index-aligned with the variants and picks each failure marker.
    pub fn summary_lines(&self, axis: &str, policies: &[StopPolicy]) -> Vec<String> {
        self.rows
            .iter()
            .map(|row| {
                let mut line = format!("{axis}={}", row.size);
                for ((name, outcome), policy) in
                    self.variants.iter().zip(&row.outcomes).zip(policies)
                {
                    match outcome.seconds() {
                        Some(s) => line.push_str(&format!(", {name}={s:.6}")),
                        None => line.push_str(&format!(", {name}={}", policy.failure_marker())),
                    }
                }
                line
            })
            .collect()
    }
}

/// Everything needed to run one sweep.
#[derive(Debug, Clone)]
pub struct SweepPlan {
    pub axis: SweepAxis,
    pub sweep: SizeSweep,
    pub params: GenerationParams,
    pub variants: Vec<Variant>,
    pub timeout: Duration,
    pub generator: PathBuf,
    /// Working directory for every spawned program.
    pub workdir: PathBuf,
    pub cache: InstanceCache,
}

/// Drives a [`SweepPlan`] through a [`CommandRunner`].
pub struct SweepController<'a, R: ?Sized> {
    runner: &'a R,
    plan: &'a SweepPlan,
}

impl<'a, R: CommandRunner + ?Sized> SweepController<'a, R> {
    pub fn new(runner: &'a R, plan: &'a SweepPlan) -> Self {
        Self { runner, plan }
    }

    /// Processes one size: provision, then run or skip every variant.
    pub fn step(&self, size: usize, state: SweepState) -> SweepResult<(SweepRow, SweepState)> {
        let plan = self.plan;
        let key = plan.axis.key(size);
        let instance = plan.cache.path_for(key, &plan.params);
        ensure_instance(
            self.runner,
            &plan.generator,
            &plan.workdir,
            key,
            &plan.params,
            &instance,
        )?;

        let mut next = state;
        let mut outcomes = Vec::with_capacity(plan.variants.len());
        for (idx, variant) in plan.variants.iter().enumerate() {
            if next.variants[idx] == VariantState::Stopped {
                info!(
                    variant = %variant.name,
                    size,
                    axis = plan.axis.name(),
                    "skipping after previous failure/timeout"
                );
                outcomes.push(RunOutcome::Failure(FailureReason::Skipped));
                continue;
            }

            let inv = variant.args.invocation(&variant.program, &plan.workdir, &instance);
            let outcome = time_run(self.runner, &variant.name, &inv, plan.timeout);
            if outcome.is_failure() && variant.policy == StopPolicy::StopOnFirstFailure {
                info!(variant = %variant.name, size, "variant stopped");
                next.variants[idx] = VariantState::Stopped;
            }
            outcomes.push(outcome);
        }

        Ok((SweepRow { size, outcomes }, next))
    }

    /// Runs the whole sweep. A generation failure aborts it.
    pub fn run(&self) -> SweepResult<ResultTable> {
        let plan = self.plan;
        let names = plan.variants.iter().map(|v| v.name.clone()).collect();
        let mut table = ResultTable::new(names);
        let mut state = SweepState::new(plan.variants.len());

        info!(
            axis = plan.axis.name(),
            sizes = ?plan.sweep.sizes(),
            variants = plan.variants.len(),
            "starting sweep"
        );
        for size in plan.sweep.sizes() {
            let (row, next) = self.step(size, state)?;
            table.push(row);
            state = next;
        }
        Ok(table)
    }
}
