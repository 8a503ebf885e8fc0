//! Timing of single solver runs.

use std::path::Path;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{info, warn};

use crate::process::{CommandRunner, ExitKind, Invocation};

/// Why a run produced no data point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailureReason {
    /// Exceeded the wall-clock budget.
    Timeout,
    /// Exited non-zero or was killed by a signal.
    Exit { code: Option<i32> },
    /// The executable could not be started.
    SpawnFailed,
    /// Not invoked because an earlier size already failed.
    Skipped,
    /// Reported success but the measured duration was not positive.
    ClockAnomaly,
}

/// Result of one timed invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    Success(Duration),
    Failure(FailureReason),
}

impl RunOutcome {
    /// Elapsed seconds, only for strictly positive successful runs.
    pub fn seconds(&self) -> Option<f64> {
        match self {
            Self::Success(d) if !d.is_zero() => Some(d.as_secs_f64()),
            _ => None,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failure(_))
    }
}

/// Argument schema shared by the exact and approximate solvers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolverArgs {
    pub k: u32,
    /// Only the approximate solver takes a trials multiplier.
    pub trials_multiplier: Option<u32>,
}

impl SolverArgs {
    pub fn exact(k: u32) -> Self {
        Self {
            k,
            trials_multiplier: None,
        }
    }

    pub fn approx(k: u32, trials_multiplier: u32) -> Self {
        Self {
            k,
            trials_multiplier: Some(trials_multiplier),
        }
    }

    pub fn invocation(&self, program: &Path, cwd: &Path, instance: &Path) -> Invocation {
        let mut inv = Invocation::new(program, cwd)
            .arg("--input")
            .arg(instance)
            .args(["--k".to_string(), self.k.to_string()]);
        if let Some(m) = self.trials_multiplier {
            inv = inv.args(["--trials-multiplier".to_string(), m.to_string()]);
        }
        inv
    }
}

/// Runs `inv` once under `timeout` and classifies the result.
///
/// Captured output of a failed run is logged and dropped.
pub fn time_run<R: CommandRunner + ?Sized>(
    runner: &R,
    label: &str,
    inv: &Invocation,
    timeout: Duration,
) -> RunOutcome {
    let start = Instant::now();
    let out = runner.run(inv, Some(timeout));
    let elapsed = start.elapsed();

    info!(
        variant = label,
        exit = %out.status,
        secs = format_args!("{:.6}", elapsed.as_secs_f64()),
        "solver finished"
    );

    classify(&out.status, elapsed, &out.output, label)
}

fn classify(status: &ExitKind, elapsed: Duration, output: &str, label: &str) -> RunOutcome {
    let reason = match status {
        ExitKind::Exited(0) => {
            if elapsed.is_zero() {
                warn!(variant = label, "non-positive elapsed time on success");
                return RunOutcome::Failure(FailureReason::ClockAnomaly);
            }
            return RunOutcome::Success(elapsed);
        }
        ExitKind::Exited(code) => FailureReason::Exit { code: Some(*code) },
        ExitKind::Signaled => FailureReason::Exit { code: None },
        ExitKind::TimedOut => FailureReason::Timeout,
        ExitKind::SpawnFailed => FailureReason::SpawnFailed,
    };
    warn!(variant = label, ?reason, output = %output.trim_end(), "solver run failed");
    RunOutcome::Failure(reason)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::ProcessOutput;

    struct Fixed(ExitKind);

    impl CommandRunner for Fixed {
        fn run(&self, _inv: &Invocation, _timeout: Option<Duration>) -> ProcessOutput {
            std::thread::sleep(Duration::from_millis(2));
            ProcessOutput {
                status: self.0.clone(),
                output: "diag".into(),
            }
        }
    }

    fn inv() -> Invocation {
        Invocation::new("solver", ".")
    }

    #[test]
    fn test_success_measures_elapsed() {
        let out = time_run(&Fixed(ExitKind::Exited(0)), "exact", &inv(), Duration::from_secs(1));
        let secs = out.seconds().expect("success");
        assert!(secs >= 0.002);
    }

    #[test]
    fn test_failures_are_classified() {
        let t = Duration::from_secs(1);
        assert_eq!(
            time_run(&Fixed(ExitKind::TimedOut), "exact", &inv(), t),
            RunOutcome::Failure(FailureReason::Timeout)
        );
        assert_eq!(
            time_run(&Fixed(ExitKind::Exited(1)), "exact", &inv(), t),
            RunOutcome::Failure(FailureReason::Exit { code: Some(1) })
        );
        assert_eq!(
            time_run(&Fixed(ExitKind::SpawnFailed), "exact", &inv(), t),
            RunOutcome::Failure(FailureReason::SpawnFailed)
        );
    }

    #[test]
    fn test_zero_elapsed_is_a_clock_anomaly() {
        let out = classify(&ExitKind::Exited(0), Duration::ZERO, "", "approx");
        assert_eq!(out, RunOutcome::Failure(FailureReason::ClockAnomaly));
        assert_eq!(out.seconds(), None);
    }

    #[cfg(unix)]
    #[test]
    fn test_lingering_background_process_is_a_timeout() {
        use crate::process::SystemRunner;

        let inv = Invocation::new("sh", std::env::temp_dir()).args(["-c", "sleep 3 & exit 0"]);
        let out = time_run(&SystemRunner, "exact", &inv, Duration::from_millis(300));
        assert_eq!(out, RunOutcome::Failure(FailureReason::Timeout));
    }

    #[test]
    fn test_solver_flags() {
        let exact = SolverArgs::exact(2).invocation(Path::new("exact"), Path::new("."), Path::new("i.txt"));
        assert_eq!(exact.display(), "exact --input i.txt --k 2");

        let approx =
            SolverArgs::approx(3, 10).invocation(Path::new("approx"), Path::new("."), Path::new("i.txt"));
        assert_eq!(approx.display(), "approx --input i.txt --k 3 --trials-multiplier 10");
    }
}
