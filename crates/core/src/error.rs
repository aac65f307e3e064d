use crate::invocation::template::TemplateError;

/// Domain errors raised before any process is started.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Invalid agent CLI command line: {0}")]
    InvalidCli(String),

    /// Startup configuration that cannot be used (unreadable template file etc).
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Template(#[from] TemplateError),
}
