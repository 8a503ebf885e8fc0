//! Exit codes of the `isobench` binary.
//! Solver failures are data, not exit codes: a sweep whose solvers all time out still exits 0.

pub const SUCCESS: i32 = 0;
pub const BUILD_UNAVAILABLE: i32 = 1; // Binaries missing and could not be built
pub const CONFIG_ERROR: i32 = 2; // Invalid sweep bounds or timeout
pub const GENERATION_FAILED: i32 = 3; // Instance generator failed; no figure written
pub const RENDER_FAILED: i32 = 4; // Sweep finished but the figure could not be saved
pub const INTERNAL_ERROR: i32 = 5; // Anything else (I/O on report, etc.)
