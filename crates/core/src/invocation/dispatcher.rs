//! Invocation dispatcher: the entry point used by request handlers.
//!
//! For each request the dispatcher:
//! 1. Waits for an admission permit (only when a limit is configured).
//! 2. Renders and materializes an inline script as a temporary artifact.
//! 3. Runs the process through the [`ProcessInvoker`].
//! 4. Releases the artifact, whatever happened in step 3.
//! 5. Classifies the outcome into [`InvocationSuccess`] or [`InvocationError`].
//!
//! Steps 1-4 run on a dedicated tokio task. A caller that stops waiting
//! (dropped future, request timeout) therefore neither kills the child nor
//! skips the cleanup.

use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Semaphore;
use tracing::Instrument;
use uuid::Uuid;

use super::artifact::{self, Artifact, ArtifactManager};
use super::error::InvocationError;
use super::invoker::{InvokerConfig, ProcessInvoker, ProcessSpec};
use super::outcome::{FailureKind, InvocationOutcome, OutputSink};
use super::output::Parsed;
use super::request::{InvocationRequest, InvocationTarget};
use super::template::render_script;

/// Interpreter used for script requests that do not name one.
pub const DEFAULT_INTERPRETER: &str = "sh";

/// Dispatcher settings.
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    pub default_interpreter: String,
    /// Working directory for requests that do not set one.
    pub base_directory: PathBuf,
    /// Where temporary script artifacts are written.
    pub artifact_dir: PathBuf,
    pub artifact_prefix: String,
    /// Maximum simultaneous child processes. `None` is unbounded.
    pub max_concurrent: Option<usize>,
    pub invoker: InvokerConfig,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            default_interpreter: DEFAULT_INTERPRETER.to_string(),
            base_directory: PathBuf::from("."),
            artifact_dir: std::env::temp_dir(),
            artifact_prefix: artifact::DEFAULT_PREFIX.to_string(),
            max_concurrent: None,
            invoker: InvokerConfig::default(),
        }
    }
}

/// A successful invocation (exit code 0).
#[derive(Debug, Clone, Serialize)]
pub struct InvocationSuccess {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    pub duration_ms: u64,
    pub truncated: bool,
}

impl InvocationSuccess {
    /// Apply a best-effort transform to stdout, falling back to raw text.
    pub fn parse_with<T>(&self, transform: impl FnOnce(&str) -> Option<T>) -> Parsed<T> {
        Parsed::from_text(&self.stdout, transform)
    }
}

/// Cheaply cloneable handle; every clone shares the same configuration
/// and admission limit.
#[derive(Clone)]
pub struct InvocationDispatcher {
    inner: Arc<Inner>,
}

struct Inner {
    config: DispatcherConfig,
    invoker: ProcessInvoker,
    artifacts: ArtifactManager,
    limiter: Option<Semaphore>,
}

impl InvocationDispatcher {
    pub fn new(config: DispatcherConfig) -> Self {
        let invoker = ProcessInvoker::new(config.invoker.clone());
        let artifacts = ArtifactManager::new(&config.artifact_dir)
            .with_prefix(config.artifact_prefix.clone());
        let limiter = config.max_concurrent.map(|n| Semaphore::new(n.max(1)));

        Self {
            inner: Arc::new(Inner {
                config,
                invoker,
                artifacts,
                limiter,
            }),
        }
    }

    /// Run `request` to completion and classify the result.
    pub async fn execute(
        &self,
        request: InvocationRequest,
    ) -> Result<InvocationSuccess, InvocationError> {
        self.execute_streaming(request, None).await
    }

    /// Like [`execute`](Self::execute), forwarding live output to `sink`.
    pub async fn execute_streaming(
        &self,
        request: InvocationRequest,
        sink: Option<OutputSink>,
    ) -> Result<InvocationSuccess, InvocationError> {
        let outcome = self.run(request, sink).await?;
        classify(outcome)
    }

    /// Run `request` and return the raw outcome without classification.
    ///
    /// Errors are limited to failures that happen before a process could be
    /// started (template rendering, artifact write) or a panicked task.
    pub async fn run(
        &self,
        request: InvocationRequest,
        sink: Option<OutputSink>,
    ) -> Result<InvocationOutcome, InvocationError> {
        let invocation_id = Uuid::new_v4();
        let span = tracing::info_span!(
            "invocation",
            %invocation_id,
            request = %request.label(),
        );

        let inner = Arc::clone(&self.inner);
        let task = tokio::spawn(
            async move { inner.run_to_completion(request, sink).await }.instrument(span),
        );

        task.await.map_err(|err| {
            tracing::error!(%invocation_id, error = %err, "Invocation task failed");
            InvocationError::Aborted(err.to_string())
        })?
    }
}

impl Inner {
    async fn run_to_completion(
        &self,
        request: InvocationRequest,
        sink: Option<OutputSink>,
    ) -> Result<InvocationOutcome, InvocationError> {
        let _permit = match &self.limiter {
            Some(limiter) => Some(
                limiter
                    .acquire()
                    .await
                    .map_err(|err| InvocationError::Aborted(err.to_string()))?,
            ),
            None => None,
        };

        let (spec, artifact) = self.prepare(request).await?;
        tracing::info!(program = %spec.program, args = spec.args.len(), "Invocation started");

        let outcome = self.invoker.run(&spec, sink).await;

        if let Some(artifact) = artifact {
            artifact.release().await;
        }

        match outcome.failure {
            FailureKind::None => tracing::info!(
                duration_ms = outcome.duration_ms,
                "Invocation succeeded"
            ),
            failure => tracing::warn!(
                ?failure,
                exit_code = ?outcome.exit_code,
                duration_ms = outcome.duration_ms,
                "Invocation failed"
            ),
        }
        Ok(outcome)
    }

    /// Resolve a request into a process spec, writing the script artifact
    /// when the request carries an inline body.
    async fn prepare(
        &self,
        request: InvocationRequest,
    ) -> Result<(ProcessSpec, Option<Artifact>), InvocationError> {
        let InvocationRequest {
            target,
            arguments,
            working_directory,
            env_vars,
        } = request;

        let working_directory =
            Some(working_directory.unwrap_or_else(|| self.config.base_directory.clone()));

        match target {
            InvocationTarget::Executable(program) => Ok((
                ProcessSpec {
                    program,
                    args: arguments,
                    working_directory,
                    env_vars,
                },
                None,
            )),
            InvocationTarget::Script(source) => {
                let body = render_script(&source.body, &source.params)?;
                let artifact = self.artifacts.create(&body).await?;

                let mut args = Vec::with_capacity(arguments.len() + 1);
                args.push(artifact.path().to_string_lossy().into_owned());
                args.extend(arguments);

                let program = source
                    .interpreter
                    .unwrap_or_else(|| self.config.default_interpreter.clone());

                Ok((
                    ProcessSpec {
                        program,
                        args,
                        working_directory,
                        env_vars,
                    },
                    Some(artifact),
                ))
            }
        }
    }
}

/// Map a frozen outcome onto the error taxonomy.
fn classify(outcome: InvocationOutcome) -> Result<InvocationSuccess, InvocationError> {
    let InvocationOutcome {
        program,
        stdout,
        stderr,
        exit_code,
        signal,
        failure,
        duration_ms,
        truncated,
    } = outcome;

    match failure {
        FailureKind::None => Ok(InvocationSuccess {
            stdout,
            stderr,
            exit_code: exit_code.unwrap_or(0),
            duration_ms,
            truncated,
        }),
        FailureKind::SpawnFailure => Err(InvocationError::Spawn {
            program,
            message: stderr,
        }),
        FailureKind::NonZeroExit => Err(InvocationError::NonZeroExit {
            exit_code: exit_code.unwrap_or(-1),
            signal,
            stderr,
            stdout,
        }),
        FailureKind::TimedOut => Err(InvocationError::TimedOut {
            elapsed_ms: duration_ms,
            stderr,
        }),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
