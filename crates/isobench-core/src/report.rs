//! Machine-readable sweep report.
//!
//! Schema: sweep-report-v1. Additive changes only within v1.

use serde::Serialize;

use crate::instance::GenerationParams;
use crate::invoker::{FailureReason, RunOutcome};
use crate::sweep::{ResultTable, SizeSweep, StopPolicy, SweepAxis, SweepPlan};

pub const SCHEMA_VERSION: &str = "sweep-report-v1";

#[derive(Debug, Serialize, Clone)]
pub struct SweepReport {
    pub schema_version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<String>,
    pub isobench_version: String,
    pub axis: SweepAxis,
    pub sweep: SizeSweep,
    pub timeout_secs: f64,
    pub params: GenerationParams,
    pub variants: Vec<VariantSummary>,
    pub rows: Vec<RowReport>,
}

#[derive(Debug, Serialize, Clone)]
pub struct VariantSummary {
    pub name: String,
    pub label: String,
    pub policy: StopPolicy,
    pub k: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trials_multiplier: Option<u32>,
    pub successes: usize,
    pub failures: usize,
    /// Size of the first failed run, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_failure_at: Option<usize>,
}

#[derive(Debug, Serialize, Clone)]
pub struct RowReport {
    pub size: usize,
    pub results: Vec<OutcomeReport>,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct OutcomeReport {
    pub variant: String,
    pub status: OutcomeStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elapsed_secs: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    Success,
    Timeout,
    Exit,
    SpawnFailed,
    Skipped,
    ClockAnomaly,
}

impl OutcomeReport {
    fn new(variant: &str, outcome: &RunOutcome) -> Self {
        let (status, elapsed_secs, exit_code) = match outcome {
            RunOutcome::Success(d) => (OutcomeStatus::Success, Some(d.as_secs_f64()), Some(0)),
            RunOutcome::Failure(reason) => match reason {
                FailureReason::Timeout => (OutcomeStatus::Timeout, None, None),
                FailureReason::Exit { code } => (OutcomeStatus::Exit, None, *code),
                FailureReason::SpawnFailed => (OutcomeStatus::SpawnFailed, None, None),
                FailureReason::Skipped => (OutcomeStatus::Skipped, None, None),
                FailureReason::ClockAnomaly => (OutcomeStatus::ClockAnomaly, None, Some(0)),
            },
        };
        Self {
            variant: variant.to_string(),
            status,
            elapsed_secs,
            exit_code,
        }
    }
}

impl SweepReport {
    pub fn new(plan: &SweepPlan, table: &ResultTable) -> Self {
        let variants = plan
            .variants
            .iter()
            .enumerate()
            .map(|(idx, v)| {
                let column = table.column(idx);
                let successes = column.iter().filter(|o| o.seconds().is_some()).count();
                let first_failure_at = table
                    .rows()
                    .iter()
                    .find(|r| r.outcomes[idx].is_failure())
                    .map(|r| r.size);
                VariantSummary {
                    name: v.name.clone(),
                    label: v.label.clone(),
                    policy: v.policy,
                    k: v.args.k,
                    trials_multiplier: v.args.trials_multiplier,
                    successes,
                    failures: column.len() - successes,
                    first_failure_at,
                }
            })
            .collect();

        let rows = table
            .rows()
            .iter()
            .map(|row| RowReport {
                size: row.size,
                results: table
                    .variants()
                    .iter()
                    .zip(&row.outcomes)
                    .map(|(name, outcome)| OutcomeReport::new(name, outcome))
                    .collect(),
            })
            .collect();

        Self {
            schema_version: SCHEMA_VERSION.into(),
            generated_at: Some(chrono::Utc::now().to_rfc3339()),
            isobench_version: env!("CARGO_PKG_VERSION").to_string(),
            axis: plan.axis,
            sweep: plan.sweep.clone(),
            timeout_secs: plan.timeout.as_secs_f64(),
            params: plan.params.clone(),
            variants,
            rows,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
