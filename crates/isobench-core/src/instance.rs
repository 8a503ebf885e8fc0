//! Instance provisioning: one generated input file per instance key.
//!
//! Files are cached by path. Whether the path also encodes the generation
//! parameters is decided by [`CacheKeyMode`].

use std::path::{Path, PathBuf};

use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::error::{SweepError, SweepResult};
use crate::process::{CommandRunner, Invocation};

/// Number of generator output lines echoed to the log.
const ECHO_LINES: usize = 10;

/// Length of the parameter digest embedded in file names.
const DIGEST_CHARS: usize = 12;

/// Knobs forwarded to the generator. The harness never validates them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationParams {
    pub density_g: f64,
    pub density_h: f64,
    pub seed: Option<u64>,
    pub noise: bool,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            density_g: 0.35,
            density_h: 0.20,
            seed: Some(12345),
            noise: true,
        }
    }
}

/// Size pair identifying one instance: |VG| = n1, |VH| = n2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct InstanceKey {
    pub n1: usize,
    pub n2: usize,
}

/// How cached instance files are named.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheKeyMode {
    /// `generated_{n1}_{n2}.txt`; a hit ignores the generation parameters.
    Size,
    /// `generated_{n1}_{n2}_{digest}.txt`; any parameter change is a miss.
    #[default]
    Params,
}

/// Directory of generated instances.
#[derive(Debug, Clone)]
pub struct InstanceCache {
    dir: PathBuf,
    mode: CacheKeyMode,
}

impl InstanceCache {
    pub fn new(dir: impl Into<PathBuf>, mode: CacheKeyMode) -> Self {
        Self {
            dir: dir.into(),
            mode,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, key: InstanceKey, params: &GenerationParams) -> PathBuf {
        let name = match self.mode {
            CacheKeyMode::Size => format!("generated_{}_{}.txt", key.n1, key.n2),
            CacheKeyMode::Params => format!(
                "generated_{}_{}_{}.txt",
                key.n1,
                key.n2,
                params_digest(key, params)
            ),
        };
        self.dir.join(name)
    }
}

fn params_digest(key: InstanceKey, params: &GenerationParams) -> String {
    let mut h = Sha256::new();
    h.update(key.n1.to_le_bytes());
    h.update(key.n2.to_le_bytes());
    h.update(params.density_g.to_bits().to_le_bytes());
    h.update(params.density_h.to_bits().to_le_bytes());
    match params.seed {
        Some(seed) => {
            h.update([1u8]);
            h.update(seed.to_le_bytes());
        }
        None => h.update([0u8]),
    }
    h.update([u8::from(params.noise)]);
    let mut digest = hex::encode(h.finalize());
    digest.truncate(DIGEST_CHARS);
    digest
}

/// Argument schema of the instance generator.
#[derive(Debug, Clone)]
pub struct GeneratorArgs<'a> {
    pub key: InstanceKey,
    pub params: &'a GenerationParams,
    pub output: &'a Path,
}

impl GeneratorArgs<'_> {
    pub fn into_invocation(self, program: &Path, cwd: &Path) -> Invocation {
        let mut inv = Invocation::new(program, cwd)
            .args(["--n1".to_string(), self.key.n1.to_string()])
            .args(["--n2".to_string(), self.key.n2.to_string()])
            .args(["--density-g".to_string(), self.params.density_g.to_string()])
            .args(["--density-h".to_string(), self.params.density_h.to_string()]);
        if self.params.noise {
            inv = inv.arg("--noise");
        }
        inv = inv.arg("--output").arg(self.output);
        if let Some(seed) = self.params.seed {
            inv = inv.args(["--seed".to_string(), seed.to_string()]);
        }
        inv
    }
}

/// Makes sure `target` exists, running the generator only when it does not.
///
/// Returns `true` when the generator ran, `false` on a cache hit.
pub fn ensure_instance<R: CommandRunner + ?Sized>(
    runner: &R,
    generator: &Path,
    cwd: &Path,
    key: InstanceKey,
    params: &GenerationParams,
    target: &Path,
) -> SweepResult<bool> {
    if target.exists() {
        info!(path = %target.display(), "using existing instance");
        return Ok(false);
    }

    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent).map_err(|source| SweepError::CacheDir {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    info!(n1 = key.n1, n2 = key.n2, "generating instance");
    let inv = GeneratorArgs {
        key,
        params,
        output: target,
    }
    .into_invocation(generator, cwd);
    let out = runner.run(&inv, None);
    info!(n1 = key.n1, n2 = key.n2, exit = %out.status, "generator finished");

    if !out.success() {
        // A partial file would be taken for a cached instance next time.
        if let Err(e) = std::fs::remove_file(target) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %target.display(), error = %e, "failed to remove partial instance");
            }
        }
        return Err(SweepError::GenerationFailed {
            path: target.to_path_buf(),
            output: out.output,
        });
    }

    for line in out.output.trim().lines().take(ECHO_LINES) {
        debug!(target: "isobench::generator", "{line}");
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::{ExitKind, ProcessOutput};
    use std::cell::RefCell;

    /// Records invocations; always writes the `--output` file, partially on failure.
    struct FakeGenerator {
        calls: RefCell<Vec<Invocation>>,
        exit: i32,
    }

    impl FakeGenerator {
        fn new(exit: i32) -> Self {
            Self {
                calls: RefCell::new(Vec::new()),
                exit,
            }
        }
    }

    impl CommandRunner for FakeGenerator {
        fn run(&self, inv: &Invocation, _timeout: Option<std::time::Duration>) -> ProcessOutput {
            self.calls.borrow_mut().push(inv.clone());
            let pos = inv.args.iter().position(|a| a == "--output").unwrap();
            let body = if self.exit == 0 { "instance" } else { "partial" };
            std::fs::write(&inv.args[pos + 1], body).unwrap();
            ProcessOutput {
                status: ExitKind::Exited(self.exit),
                output: "stats line\n".into(),
            }
        }
    }

    const KEY: InstanceKey = InstanceKey { n1: 4, n2: 25 };

    #[test]
    fn test_second_call_is_a_cache_hit() {
        let dir = tempfile::tempdir().unwrap();
        let cache = InstanceCache::new(dir.path().join("gen"), CacheKeyMode::Size);
        let params = GenerationParams::default();
        let target = cache.path_for(KEY, &params);
        let gen = FakeGenerator::new(0);

        let first = ensure_instance(&gen, Path::new("gen"), dir.path(), KEY, &params, &target).unwrap();
        let second = ensure_instance(&gen, Path::new("gen"), dir.path(), KEY, &params, &target).unwrap();

        assert!(first);
        assert!(!second);
        assert_eq!(gen.calls.borrow().len(), 1);
        assert!(target.exists());
    }

    #[test]
    fn test_generator_flags() {
        let params = GenerationParams {
            density_g: 0.5,
            density_h: 0.25,
            seed: Some(7),
            noise: true,
        };
        let inv = GeneratorArgs {
            key: KEY,
            params: &params,
            output: Path::new("/tmp/out.txt"),
        }
        .into_invocation(Path::new("/bin/gen"), Path::new("/"));
        let args: Vec<String> = inv
            .args
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            args,
            [
                "--n1", "4", "--n2", "25", "--density-g", "0.5", "--density-h", "0.25",
                "--noise", "--output", "/tmp/out.txt", "--seed", "7"
            ]
        );
    }

    #[test]
    fn test_seed_omitted_when_absent() {
        let params = GenerationParams {
            seed: None,
            ..GenerationParams::default()
        };
        let inv = GeneratorArgs {
            key: KEY,
            params: &params,
            output: Path::new("out.txt"),
        }
        .into_invocation(Path::new("gen"), Path::new("."));
        assert!(!inv.args.iter().any(|a| a == "--seed"));
    }

    #[test]
    fn test_generation_failure_carries_output() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("generated_4_25.txt");
        let gen = FakeGenerator::new(2);

        let err = ensure_instance(
            &gen,
            Path::new("gen"),
            dir.path(),
            KEY,
            &GenerationParams::default(),
            &target,
        )
        .unwrap_err();

        assert!(matches!(err, SweepError::GenerationFailed { .. }));
        assert_eq!(err.diagnostics(), Some("stats line\n"));
        assert!(!target.exists());
    }

    #[test]
    fn test_partial_output_is_not_reused_after_failure() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("generated_4_25.txt");
        let params = GenerationParams::default();

        let failing = FakeGenerator::new(1);
        assert!(ensure_instance(&failing, Path::new("gen"), dir.path(), KEY, &params, &target).is_err());
        assert!(!target.exists());

        let working = FakeGenerator::new(0);
        let generated =
            ensure_instance(&working, Path::new("gen"), dir.path(), KEY, &params, &target).unwrap();
        assert!(generated);
        assert_eq!(working.calls.borrow().len(), 1);
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "instance");
    }

    #[test]
    fn test_size_mode_ignores_parameter_drift() {
        let cache = InstanceCache::new("/cache", CacheKeyMode::Size);
        let a = GenerationParams::default();
        let b = GenerationParams {
            density_g: 0.9,
            ..GenerationParams::default()
        };
        assert_eq!(cache.path_for(KEY, &a), cache.path_for(KEY, &b));
        assert_eq!(
            cache.path_for(KEY, &a),
            PathBuf::from("/cache/generated_4_25.txt")
        );
    }

    #[test]
    fn test_params_mode_separates_parameter_sets() {
        let cache = InstanceCache::new("/cache", CacheKeyMode::Params);
        let a = GenerationParams::default();
        let b = GenerationParams {
            seed: None,
            ..GenerationParams::default()
        };
        let pa = cache.path_for(KEY, &a);
        assert_ne!(pa, cache.path_for(KEY, &b));
        assert_eq!(pa, cache.path_for(KEY, &a.clone()));
        let name = pa.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("generated_4_25_"));
        assert_eq!(name.len(), "generated_4_25_".len() + DIGEST_CHARS + ".txt".len());
    }
}
