use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use agentdash_core::agents::{AgentCli, AgentCommands, DEFAULT_AGENT_CLI};
use agentdash_core::error::CoreError;
use agentdash_core::invocation::invoker::DEFAULT_MAX_OUTPUT_BYTES;
use agentdash_core::invocation::{DispatcherConfig, InvokerConfig};

/// Server configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Agent CLI command line, split with shell quoting rules.
    pub agent_cli: String,
    /// Working directory for every agent invocation.
    pub agents_dir: PathBuf,
    /// Interpreter for generated scripts.
    pub script_interpreter: String,
    /// Directory for temporary script artifacts.
    pub artifact_dir: PathBuf,
    /// Per-invocation deadline. `None` waits indefinitely.
    pub invocation_timeout_secs: Option<u64>,
    /// Maximum simultaneous agent processes. `None` is unbounded.
    pub max_concurrent_invocations: Option<usize>,
    /// Capture limit per output stream.
    pub max_output_bytes: usize,
    /// File holding a custom create-agent script template.
    pub create_agent_template: Option<PathBuf>,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                      | Default                 |
    /// |------------------------------|-------------------------|
    /// | `HOST`                       | `0.0.0.0`               |
    /// | `PORT`                       | `3000`                  |
    /// | `CORS_ORIGINS`               | `http://localhost:5173` |
    /// | `REQUEST_TIMEOUT_SECS`       | `30`                    |
    /// | `AGENT_CLI`                  | `mofa`                  |
    /// | `AGENTS_DIR`                 | `.`                     |
    /// | `SCRIPT_INTERPRETER`         | `sh`                    |
    /// | `ARTIFACT_DIR`               | system temp dir         |
    /// | `INVOCATION_TIMEOUT_SECS`    | unset (no deadline)     |
    /// | `MAX_CONCURRENT_INVOCATIONS` | unset (unbounded)       |
    /// | `MAX_OUTPUT_BYTES`           | `10485760`              |
    /// | `CREATE_AGENT_TEMPLATE`      | unset (built-in script) |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let agent_cli = std::env::var("AGENT_CLI").unwrap_or_else(|_| DEFAULT_AGENT_CLI.into());

        let agents_dir = std::env::var("AGENTS_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("."));

        let script_interpreter =
            std::env::var("SCRIPT_INTERPRETER").unwrap_or_else(|_| "sh".into());

        let artifact_dir = std::env::var("ARTIFACT_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| std::env::temp_dir());

        let invocation_timeout_secs = optional_var("INVOCATION_TIMEOUT_SECS");
        let max_concurrent_invocations = optional_var("MAX_CONCURRENT_INVOCATIONS");
        let max_output_bytes =
            optional_var("MAX_OUTPUT_BYTES").unwrap_or(DEFAULT_MAX_OUTPUT_BYTES);

        let create_agent_template = std::env::var("CREATE_AGENT_TEMPLATE")
            .ok()
            .filter(|s| !s.is_empty())
            .map(PathBuf::from);

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            agent_cli,
            agents_dir,
            script_interpreter,
            artifact_dir,
            invocation_timeout_secs,
            max_concurrent_invocations,
            max_output_bytes,
            create_agent_template,
        }
    }

    /// Settings for the invocation dispatcher.
    pub fn dispatcher_config(&self) -> DispatcherConfig {
        DispatcherConfig {
            default_interpreter: self.script_interpreter.clone(),
            base_directory: self.agents_dir.clone(),
            artifact_dir: self.artifact_dir.clone(),
            max_concurrent: self.max_concurrent_invocations,
            invoker: InvokerConfig {
                max_output_bytes: self.max_output_bytes,
                timeout: self.invocation_timeout_secs.map(Duration::from_secs),
            },
            ..DispatcherConfig::default()
        }
    }

    /// Agent operation catalogue for the configured CLI and create template.
    pub fn agent_commands(&self) -> Result<AgentCommands, CoreError> {
        let commands = AgentCommands::new(AgentCli::parse(&self.agent_cli)?);

        match &self.create_agent_template {
            Some(path) => {
                let template = std::fs::read_to_string(path).map_err(|e| {
                    CoreError::Config(format!(
                        "cannot read CREATE_AGENT_TEMPLATE {}: {e}",
                        path.display()
                    ))
                })?;
                commands.with_create_template(template)
            }
            None => Ok(commands),
        }
    }
}

/// Parse an optional env var; unset or empty means `None`.
fn optional_var<T>(key: &str) -> Option<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = std::env::var(key).ok().filter(|s| !s.trim().is_empty())?;
    Some(
        raw.trim()
            .parse()
            .unwrap_or_else(|e| panic!("{key} must be a valid number: {e}")),
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn config() -> ServerConfig {
        ServerConfig {
            host: "127.0.0.1".into(),
            port: 0,
            cors_origins: vec![],
            request_timeout_secs: 30,
            agent_cli: "python -m mofa".into(),
            agents_dir: PathBuf::from("/srv/agents"),
            script_interpreter: "bash".into(),
            artifact_dir: PathBuf::from("/tmp/agentdash"),
            invocation_timeout_secs: Some(5),
            max_concurrent_invocations: Some(2),
            max_output_bytes: 1024,
            create_agent_template: None,
        }
    }

    #[test]
    fn dispatcher_config_maps_fields() {
        let dispatcher = config().dispatcher_config();
        assert_eq!(dispatcher.default_interpreter, "bash");
        assert_eq!(dispatcher.base_directory, PathBuf::from("/srv/agents"));
        assert_eq!(dispatcher.artifact_dir, PathBuf::from("/tmp/agentdash"));
        assert_eq!(dispatcher.max_concurrent, Some(2));
        assert_eq!(dispatcher.invoker.max_output_bytes, 1024);
        assert_eq!(dispatcher.invoker.timeout, Some(Duration::from_secs(5)));
    }

    #[test]
    fn agent_commands_uses_cli() {
        let commands = config().agent_commands().unwrap();
        assert_eq!(commands.cli().program, "python");
        assert_eq!(commands.cli().leading_args, vec!["-m", "mofa"]);
    }

    #[test]
    fn agent_commands_reads_template_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("create.sh");
        std::fs::write(&path, "{{cli}} init {{agent_name}}").expect("write");

        let mut cfg = config();
        cfg.create_agent_template = Some(path);
        assert!(cfg.agent_commands().is_ok());
    }

    #[test]
    fn agent_commands_missing_template_file() {
        let mut cfg = config();
        cfg.create_agent_template = Some(PathBuf::from("/nonexistent/agentdash/create.sh"));
        assert_matches!(cfg.agent_commands(), Err(CoreError::Config(_)));
    }

    #[test]
    fn agent_commands_rejects_empty_cli() {
        let mut cfg = config();
        cfg.agent_cli = "  ".into();
        assert_matches!(cfg.agent_commands(), Err(CoreError::InvalidCli(_)));
    }
}
