//! Classified invocation failures.

use std::path::PathBuf;

use super::outcome::FailureKind;
use super::template::TemplateError;

/// Errors returned by the dispatcher.
///
/// Every variant carries the underlying diagnostic unmodified; see
/// [`InvocationError::diagnostic`].
#[derive(Debug, thiserror::Error)]
pub enum InvocationError {
    /// The child process could not be started.
    #[error("failed to start '{program}': {message}")]
    Spawn { program: String, message: String },

    /// The process ran and exited unsuccessfully.
    #[error("process exited with code {exit_code}: {stderr}")]
    NonZeroExit {
        exit_code: i32,
        signal: Option<i32>,
        stderr: String,
        stdout: String,
    },

    /// A generated script could not be written, so nothing ran.
    #[error("failed to write script artifact {}: {source}", path.display())]
    ArtifactWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The process exceeded the configured deadline and was killed.
    #[error("process timed out after {elapsed_ms}ms")]
    TimedOut { elapsed_ms: u64, stderr: String },

    /// The script template could not be rendered, so nothing ran.
    #[error("script template error: {0}")]
    Template(#[from] TemplateError),

    /// The task driving the invocation panicked.
    #[error("invocation task aborted: {0}")]
    Aborted(String),
}

impl InvocationError {
    /// The human-readable diagnostic for a failure response.
    ///
    /// For a non-zero exit this is exactly what the process wrote to stderr.
    pub fn diagnostic(&self) -> String {
        match self {
            Self::Spawn { message, .. } => message.clone(),
            Self::NonZeroExit { stderr, .. } => stderr.clone(),
            Self::TimedOut { stderr, .. } if !stderr.is_empty() => {
                format!("{self}\n{stderr}")
            }
            other => other.to_string(),
        }
    }

    /// Map onto the outcome taxonomy. Failures that prevented the process
    /// from running count as spawn failures.
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            Self::NonZeroExit { .. } => FailureKind::NonZeroExit,
            Self::TimedOut { .. } => FailureKind::TimedOut,
            Self::Spawn { .. }
            | Self::ArtifactWrite { .. }
            | Self::Template(_)
            | Self::Aborted(_) => FailureKind::SpawnFailure,
        }
    }

    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::NonZeroExit { exit_code, .. } => Some(*exit_code),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
