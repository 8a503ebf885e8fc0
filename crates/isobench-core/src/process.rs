//! Bounded execution of external programs.
//!
//! Every benchmarked program runs as a child process. The runner never fails
//! on the child's behalf: a non-zero exit, a timeout or a spawn error are all
//! reported through [`ExitKind`], so callers decide which of them matter.
//!
//! On unix the child is placed in its own process group and the whole group
//! is killed on timeout, so wrapper scripts cannot leave their workers behind.

use std::ffi::OsString;
use std::io::Read;
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

/// Exit code reported for a timed-out process (matches coreutils `timeout`).
pub const TIMEOUT_EXIT_CODE: i32 = 124;

/// Per-stream cap on captured output.
const MAX_CAPTURE_BYTES: usize = 64 * 1024;

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// A fully described external command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: PathBuf,
    pub args: Vec<OsString>,
    pub cwd: PathBuf,
}

impl Invocation {
    pub fn new(program: impl Into<PathBuf>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: cwd.into(),
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Shell-like rendering for log lines.
    pub fn display(&self) -> String {
        let mut out = self.program.display().to_string();
        for a in &self.args {
            out.push(' ');
            out.push_str(&a.to_string_lossy());
        }
        out
    }
}

/// How a process ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitKind {
    /// Exited on its own with a code.
    Exited(i32),
    /// Terminated by a signal (unix) without an exit code.
    Signaled,
    /// Exceeded its wall-clock budget and was killed.
    TimedOut,
    /// Could not be started at all.
    SpawnFailed,
}

impl ExitKind {
    pub fn success(&self) -> bool {
        matches!(self, Self::Exited(0))
    }

    /// Numeric code for logs; timeouts report [`TIMEOUT_EXIT_CODE`].
    pub fn code(&self) -> Option<i32> {
        match self {
            Self::Exited(c) => Some(*c),
            Self::TimedOut => Some(TIMEOUT_EXIT_CODE),
            Self::Signaled | Self::SpawnFailed => None,
        }
    }
}

impl std::fmt::Display for ExitKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Exited(c) => write!(f, "{c}"),
            Self::Signaled => f.write_str("signal"),
            Self::TimedOut => write!(f, "{TIMEOUT_EXIT_CODE} (timeout)"),
            Self::SpawnFailed => f.write_str("spawn failed"),
        }
    }
}

/// Status and combined stdout/stderr of one run.
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    pub status: ExitKind,
    pub output: String,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.status.success()
    }
}

/// Executes invocations. Implemented by [`SystemRunner`] and by test fakes.
pub trait CommandRunner {
    fn run(&self, invocation: &Invocation, timeout: Option<Duration>) -> ProcessOutput;
}

/// Runs commands as real child processes.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, invocation: &Invocation, timeout: Option<Duration>) -> ProcessOutput {
        debug!(command = %invocation.display(), cwd = %invocation.cwd.display(), ?timeout, "spawning");

        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args)
            .current_dir(&invocation.cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                warn!(program = %invocation.program.display(), error = %e, "spawn failed");
                return ProcessOutput {
                    status: ExitKind::SpawnFailed,
                    output: format!("failed to spawn {}: {e}", invocation.program.display()),
                };
            }
        };

        let deadline = timeout.map(|limit| Instant::now() + limit);
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let status = match timeout {
            Some(limit) => wait_timeout(&mut child, limit),
            None => child.wait().map(Some),
        };

        let status = match status {
            Ok(Some(status)) => status,
            Ok(None) => {
                terminate(&mut child);
                return timed_out(invocation, timeout);
            }
            Err(e) => {
                terminate(&mut child);
                return ProcessOutput {
                    status: ExitKind::SpawnFailed,
                    output: format!("failed waiting for {}: {e}", invocation.program.display()),
                };
            }
        };

        // A background process still holding a pipe keeps the run alive until the deadline.
        let out = collect(stdout.as_ref(), deadline);
        let err = collect(stderr.as_ref(), deadline);
        match (out, err) {
            (Some(mut output), Some(err)) => {
                output.push_str(&err);
                ProcessOutput {
                    status: exit_kind(status),
                    output,
                }
            }
            _ => {
                debug!(pid = child.id(), "pipes still open at deadline, killing process group");
                terminate(&mut child);
                timed_out(invocation, timeout)
            }
        }
    }
}

fn timed_out(invocation: &Invocation, timeout: Option<Duration>) -> ProcessOutput {
    let limit = timeout.unwrap_or_default();
    ProcessOutput {
        status: ExitKind::TimedOut,
        output: format!(
            "timed out after {:.3}s: {}",
            limit.as_secs_f64(),
            invocation.display()
        ),
    }
}

fn drain<R: Read + Send + 'static>(stream: Option<R>) -> Option<Receiver<String>> {
    stream.map(|mut r| {
        let (tx, rx) = mpsc::sync_channel(1);
        std::thread::spawn(move || {
            let mut buf = Vec::new();
            let mut chunk = [0u8; 8192];
            loop {
                match r.read(&mut chunk) {
                    Ok(0) | Err(_) => break,
                    Ok(n) => {
                        // Keep reading past the cap so the child never blocks on a full pipe.
                        let room = MAX_CAPTURE_BYTES.saturating_sub(buf.len());
                        buf.extend_from_slice(&chunk[..n.min(room)]);
                    }
                }
            }
            let _ = tx.send(String::from_utf8_lossy(&buf).into_owned());
        });
        rx
    })
}

/// Waits for a reader until `deadline`. `None` means the pipe was still open.
fn collect(rx: Option<&Receiver<String>>, deadline: Option<Instant>) -> Option<String> {
    let Some(rx) = rx else {
        return Some(String::new());
    };
    let Some(deadline) = deadline else {
        return Some(rx.recv().unwrap_or_default());
    };
    match rx.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
        Ok(text) => Some(text),
        Err(RecvTimeoutError::Disconnected) => Some(String::new()),
        Err(RecvTimeoutError::Timeout) => None,
    }
}

fn wait_timeout(child: &mut Child, timeout: Duration) -> std::io::Result<Option<ExitStatus>> {
    let start = Instant::now();
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        let elapsed = start.elapsed();
        if elapsed >= timeout {
            return Ok(None);
        }
        std::thread::sleep(POLL_INTERVAL.min(timeout - elapsed));
    }
}

fn exit_kind(status: ExitStatus) -> ExitKind {
    match status.code() {
        Some(code) => ExitKind::Exited(code),
        None => ExitKind::Signaled,
    }
}

#[cfg(unix)]
fn terminate(child: &mut Child) {
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    if let Err(e) = killpg(Pid::from_raw(child.id() as i32), Signal::SIGKILL) {
        debug!(pid = child.id(), error = %e, "killpg failed, killing child only");
        let _ = child.kill();
    }
    let _ = child.wait();
}

#[cfg(not(unix))]
fn terminate(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}
