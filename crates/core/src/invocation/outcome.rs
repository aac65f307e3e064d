//! The frozen result of one child process, plus the live output chunk type.

use serde::Serialize;
use tokio::sync::mpsc;

/// How an invocation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The process exited with code 0.
    None,
    /// The process could not be started at all.
    SpawnFailure,
    /// The process ran and reported failure through its exit status.
    NonZeroExit,
    /// The process outlived the configured deadline and was killed.
    TimedOut,
}

/// Which standard stream a chunk came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamKind {
    Stdout,
    Stderr,
}

/// A piece of output forwarded while the process is still running.
///
/// A chunk is whatever one read from the pipe returned, so it may end
/// mid-line. Multi-byte characters are never split across chunks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputChunk {
    pub stream: StreamKind,
    pub text: String,
}

/// Receiver side for live output. Dropping the receiver has no effect on
/// the invocation.
pub type OutputSink = mpsc::UnboundedSender<OutputChunk>;

/// Everything observed about one child process, produced once at exit.
#[derive(Debug, Clone, Serialize)]
pub struct InvocationOutcome {
    /// Program that was (or could not be) started.
    pub program: String,
    /// Accumulated standard output in arrival order.
    pub stdout: String,
    /// Accumulated standard error in arrival order. For spawn failures this
    /// holds the OS error message.
    pub stderr: String,
    /// Exit status. `None` when the process never started or was killed at
    /// the deadline; `-1` when it was terminated by a signal.
    pub exit_code: Option<i32>,
    /// Terminating signal, if any (Unix only).
    pub signal: Option<i32>,
    pub failure: FailureKind,
    /// Wall-clock duration in milliseconds.
    pub duration_ms: u64,
    /// Whether either stream exceeded the capture limit.
    pub truncated: bool,
}

impl InvocationOutcome {
    /// Outcome for a process that could not be started.
    pub fn spawn_failure(program: &str, err: &std::io::Error, duration_ms: u64) -> Self {
        Self {
            program: program.to_string(),
            stdout: String::new(),
            stderr: err.to_string(),
            exit_code: None,
            signal: None,
            failure: FailureKind::SpawnFailure,
            duration_ms,
            truncated: false,
        }
    }

    pub fn is_success(&self) -> bool {
        self.failure == FailureKind::None
    }

    /// The text a caller should show: stdout on success, stderr otherwise.
    pub fn primary_text(&self) -> &str {
        if self.is_success() {
            &self.stdout
        } else {
            &self.stderr
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
