//! External process orchestration.
//!
//! Three layers, built bottom-up:
//!
//! - [`artifact`]: unique on-disk script files with guaranteed deletion.
//! - [`invoker`]: spawns one child process, drains stdout and stderr
//!   concurrently, and freezes an [`InvocationOutcome`] at exit.
//! - [`dispatcher`]: the facade request handlers call. Materializes inline
//!   scripts, runs them through the invoker, releases the artifact on every
//!   path, and classifies the outcome into [`InvocationError`].

pub mod artifact;
pub mod dispatcher;
pub mod error;
pub mod invoker;
pub mod outcome;
pub mod output;
pub mod request;
pub mod template;

pub use artifact::{Artifact, ArtifactManager};
pub use dispatcher::{DispatcherConfig, InvocationDispatcher, InvocationSuccess};
pub use error::InvocationError;
pub use invoker::{InvokerConfig, ProcessInvoker, ProcessSpec};
pub use outcome::{FailureKind, InvocationOutcome, OutputChunk, OutputSink, StreamKind};
pub use output::Parsed;
pub use request::{InvocationRequest, InvocationTarget, ScriptSource};
