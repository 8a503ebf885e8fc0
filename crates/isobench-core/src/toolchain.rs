//! Locating (and if needed building) the external programs.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::error::ToolchainError;
use crate::process::{CommandRunner, Invocation};

pub const DEFAULT_GENERATOR: &str = "input-generator";
pub const DEFAULT_EXACT: &str = "exact-solver";
pub const DEFAULT_APPROX: &str = "approx-solver";

/// Where the solver project lives and what its binaries are called.
#[derive(Debug, Clone)]
pub struct Toolchain {
    pub project_root: PathBuf,
    pub bin_dir: PathBuf,
    pub generator: String,
    pub exact: String,
    pub approx: String,
}

impl Toolchain {
    /// Binaries under `<project_root>/target/release` with the default names.
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        let project_root = project_root.into();
        Self {
            bin_dir: project_root.join("target").join("release"),
            project_root,
            generator: DEFAULT_GENERATOR.into(),
            exact: DEFAULT_EXACT.into(),
            approx: DEFAULT_APPROX.into(),
        }
    }

    pub fn with_bin_dir(mut self, bin_dir: impl Into<PathBuf>) -> Self {
        self.bin_dir = bin_dir.into();
        self
    }

    pub fn bin(&self, name: &str) -> PathBuf {
        self.bin_dir.join(name)
    }

    fn missing(&self, required: &[&str]) -> Vec<String> {
        required
            .iter()
            .filter(|name| !self.bin(name).exists())
            .map(|name| name.to_string())
            .collect()
    }

    /// Makes sure every binary in `required` exists, running
    /// `cargo build --release` in the project root once if some are absent.
    pub fn ensure_built<R: CommandRunner + ?Sized>(
        &self,
        runner: &R,
        required: &[&str],
        allow_build: bool,
    ) -> Result<(), ToolchainError> {
        let missing = self.missing(required);
        if missing.is_empty() {
            return Ok(());
        }
        if !allow_build {
            return Err(ToolchainError::Missing {
                bin_dir: self.bin_dir.clone(),
                missing,
            });
        }

        info!(root = %self.project_root.display(), ?missing, "building release binaries with cargo build --release");
        let out = runner.run(&build_invocation(&self.project_root), None);
        if !out.success() {
            warn!(exit = %out.status, "build failed");
            return Err(ToolchainError::BuildFailed {
                root: self.project_root.clone(),
                output: out.output,
            });
        }
        info!(output = %out.output.trim_end(), "build finished");

        let missing = self.missing(required);
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ToolchainError::Missing {
                bin_dir: self.bin_dir.clone(),
                missing,
            })
        }
    }
}

fn build_invocation(root: &Path) -> Invocation {
    Invocation::new("cargo", root).args(["build", "--release"])
}
