//! Error types for the sweep engine.
//!
//! Only run-wide failures live here. A solver that crashes or times out is
//! not an error: it is recorded as [`crate::RunOutcome::Failure`].

use std::path::PathBuf;

/// Errors that abort a sweep.
#[derive(Debug, thiserror::Error)]
pub enum SweepError {
    /// Sweep bounds are unusable.
    #[error("invalid sweep: {message}")]
    InvalidSweep { message: String },

    /// The instance generator exited non-zero (or could not be started).
    #[error("failed to generate instance {}", path.display())]
    GenerationFailed { path: PathBuf, output: String },

    /// The cache directory for an instance could not be created.
    #[error("failed to prepare instance directory {}: {source}", path.display())]
    CacheDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl SweepError {
    /// Captured diagnostic output of the failing external program, if any.
    pub fn diagnostics(&self) -> Option<&str> {
        match self {
            Self::GenerationFailed { output, .. } => Some(output),
            _ => None,
        }
    }
}

/// Errors while locating or building the external binaries.
#[derive(Debug, thiserror::Error)]
pub enum ToolchainError {
    /// `cargo build --release` exited non-zero.
    #[error("failed to build project in {}", root.display())]
    BuildFailed { root: PathBuf, output: String },

    /// Required binaries are absent and building was not attempted or did not produce them.
    #[error("missing binaries in {}: {}", bin_dir.display(), missing.join(", "))]
    Missing {
        bin_dir: PathBuf,
        missing: Vec<String>,
    },
}

/// Errors while drawing the figure.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("failed to create output directory {}: {source}", path.display())]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("plotting failed: {message}")]
    Draw { message: String },
}

/// Result type for sweep operations.
pub type SweepResult<T> = Result<T, SweepError>;
