//! Child process execution.
//!
//! [`ProcessInvoker::run`] spawns a program with an exact argument vector
//! (no shell), drains stdout and stderr on two independent tasks so that
//! neither pipe can fill up and stall the child, and returns an
//! [`InvocationOutcome`] once the process has exited and both streams are
//! fully read. Only the exit status decides success.

use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::task::JoinHandle;

use super::outcome::{FailureKind, InvocationOutcome, OutputChunk, OutputSink, StreamKind};

/// Default cap on captured bytes per stream (10 MiB).
pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 10 * 1024 * 1024;

/// How long stream readers may keep draining after a timed-out child has
/// been killed. Grandchildren can hold the pipes open indefinitely.
const KILL_DRAIN_GRACE: Duration = Duration::from_millis(250);

/// Size of a single read from a child's pipe.
const READ_BUFFER_BYTES: usize = 8 * 1024;

/// Invoker settings shared by every invocation.
#[derive(Debug, Clone)]
pub struct InvokerConfig {
    /// Bytes captured per stream. Output beyond this is read and discarded.
    pub max_output_bytes: usize,
    /// Kill the child after this long. `None` lets it run to completion.
    pub timeout: Option<Duration>,
}

impl Default for InvokerConfig {
    fn default() -> Self {
        Self {
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
            timeout: None,
        }
    }
}

/// A fully resolved command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessSpec {
    pub program: String,
    pub args: Vec<String>,
    /// Inherits the parent's current directory when `None`.
    pub working_directory: Option<PathBuf>,
    pub env_vars: Vec<(String, String)>,
}

impl ProcessSpec {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            working_directory: None,
            env_vars: Vec::new(),
        }
    }
}

/// Runs child processes to completion.
#[derive(Debug, Clone, Default)]
pub struct ProcessInvoker {
    config: InvokerConfig,
}

/// Bytes read from one stream.
#[derive(Debug, Default)]
struct StreamCapture {
    bytes: Vec<u8>,
    truncated: bool,
}

enum Termination {
    Exited(ExitStatus),
    WaitFailed(std::io::Error),
    TimedOut,
}

impl ProcessInvoker {
    pub fn new(config: InvokerConfig) -> Self {
        Self { config }
    }

    /// Run `spec` and return its outcome.
    ///
    /// Spawn errors are reported through the outcome
    /// ([`FailureKind::SpawnFailure`]) rather than as `Err`, so the caller
    /// always receives exactly one frozen result. When `sink` is given,
    /// output chunks are forwarded as they arrive.
    pub async fn run(&self, spec: &ProcessSpec, sink: Option<OutputSink>) -> InvocationOutcome {
        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(false);

        if let Some(dir) = &spec.working_directory {
            cmd.current_dir(dir);
        }
        for (key, value) in &spec.env_vars {
            cmd.env(key, value);
        }

        let start = Instant::now();
        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(err) => {
                tracing::warn!(program = %spec.program, error = %err, "Failed to spawn process");
                return InvocationOutcome::spawn_failure(&spec.program, &err, elapsed_ms(start));
            }
        };
        tracing::debug!(program = %spec.program, pid = ?child.id(), "Process spawned");

        let max = self.config.max_output_bytes;
        let stdout_task = spawn_reader(child.stdout.take(), StreamKind::Stdout, max, sink.clone());
        let stderr_task = spawn_reader(child.stderr.take(), StreamKind::Stderr, max, sink);

        let termination = match self.config.timeout {
            None => wait(child.wait().await),
            Some(limit) => match tokio::time::timeout(limit, child.wait()).await {
                Ok(result) => wait(result),
                Err(_elapsed) => {
                    if let Err(err) = child.kill().await {
                        tracing::warn!(program = %spec.program, error = %err, "Failed to kill timed-out process");
                    }
                    Termination::TimedOut
                }
            },
        };

        let drain_limit = match termination {
            Termination::TimedOut => Some(KILL_DRAIN_GRACE),
            _ => None,
        };
        let stdout = collect(stdout_task, drain_limit).await;
        let stderr = collect(stderr_task, drain_limit).await;
        let duration_ms = elapsed_ms(start);

        let truncated = stdout.truncated || stderr.truncated;
        let stdout = String::from_utf8_lossy(&stdout.bytes).into_owned();
        let mut stderr = String::from_utf8_lossy(&stderr.bytes).into_owned();

        let (exit_code, signal, failure) = match termination {
            Termination::Exited(status) => {
                let signal = exit_signal(&status);
                let code = status.code().unwrap_or(-1);
                let failure = if status.success() {
                    FailureKind::None
                } else {
                    FailureKind::NonZeroExit
                };
                (Some(code), signal, failure)
            }
            Termination::WaitFailed(err) => {
                if !stderr.is_empty() && !stderr.ends_with('\n') {
                    stderr.push('\n');
                }
                stderr.push_str(&format!("failed to wait for '{}': {err}", spec.program));
                (Some(-1), None, FailureKind::NonZeroExit)
            }
            Termination::TimedOut => (None, None, FailureKind::TimedOut),
        };

        tracing::debug!(
            program = %spec.program,
            exit_code = ?exit_code,
            failure = ?failure,
            duration_ms,
            truncated,
            "Process finished"
        );

        InvocationOutcome {
            program: spec.program.clone(),
            stdout,
            stderr,
            exit_code,
            signal,
            failure,
            duration_ms,
            truncated,
        }
    }
}

fn wait(result: std::io::Result<ExitStatus>) -> Termination {
    match result {
        Ok(status) => Termination::Exited(status),
        Err(err) => Termination::WaitFailed(err),
    }
}

fn spawn_reader<R>(
    handle: Option<R>,
    kind: StreamKind,
    max_bytes: usize,
    sink: Option<OutputSink>,
) -> JoinHandle<StreamCapture>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        match handle {
            Some(reader) => read_stream(reader, kind, max_bytes, sink).await,
            None => StreamCapture::default(),
        }
    })
}

/// Read a stream to EOF in fixed-size reads, appending each read to the
/// capture (up to `max_bytes`) and forwarding the captured part to `sink`.
///
/// Memory stays bounded by `max_bytes` plus one read buffer no matter how
/// the child formats its output. Partial lines are forwarded as soon as
/// they arrive.
async fn read_stream<R>(
    mut reader: R,
    kind: StreamKind,
    max_bytes: usize,
    sink: Option<OutputSink>,
) -> StreamCapture
where
    R: AsyncRead + Unpin,
{
    let mut capture = StreamCapture::default();
    let mut buf = vec![0u8; READ_BUFFER_BYTES];
    // Trailing bytes of a UTF-8 sequence split across two reads.
    let mut pending = Vec::new();

    loop {
        let n = match reader.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => n,
            Err(err) if err.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(err) => {
                tracing::warn!(stream = ?kind, error = %err, "Failed to read process output");
                break;
            }
        };

        let room = max_bytes.saturating_sub(capture.bytes.len());
        let kept = n.min(room);
        if n > room {
            capture.truncated = true;
        }
        if kept == 0 {
            continue;
        }
        capture.bytes.extend_from_slice(&buf[..kept]);

        if let Some(sink) = &sink {
            pending.extend_from_slice(&buf[..kept]);
            let text = take_utf8_prefix(&mut pending);
            if !text.is_empty() {
                // A closed receiver only means nobody is watching.
                let _ = sink.send(OutputChunk { stream: kind, text });
            }
        }
    }

    if let Some(sink) = &sink {
        if !pending.is_empty() {
            let text = String::from_utf8_lossy(&pending).into_owned();
            let _ = sink.send(OutputChunk { stream: kind, text });
        }
    }

    capture
}

/// Decode the longest prefix of `pending` that is not a cut-off UTF-8
/// sequence, leaving an incomplete trailing sequence in place.
fn take_utf8_prefix(pending: &mut Vec<u8>) -> String {
    let split = match std::str::from_utf8(pending) {
        Ok(_) => pending.len(),
        // Invalid bytes in the middle are replaced; only an incomplete
        // sequence at the very end is held back.
        Err(err) if err.error_len().is_none() => err.valid_up_to(),
        Err(_) => pending.len(),
    };
    let rest = pending.split_off(split);
    let text = String::from_utf8_lossy(pending).into_owned();
    *pending = rest;
    text
}

async fn collect(task: JoinHandle<StreamCapture>, limit: Option<Duration>) -> StreamCapture {
    let result = match limit {
        None => task.await,
        Some(limit) => {
            let abort = task.abort_handle();
            match tokio::time::timeout(limit, task).await {
                Ok(result) => result,
                Err(_elapsed) => {
                    abort.abort();
                    return StreamCapture::default();
                }
            }
        }
    };
    result.unwrap_or_else(|err| {
        tracing::warn!(error = %err, "Output reader task failed");
        StreamCapture::default()
    })
}

#[cfg(unix)]
fn exit_signal(status: &ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

#[cfg(not(unix))]
fn exit_signal(_status: &ExitStatus) -> Option<i32> {
    None
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
