//! Invocation requests.

use std::collections::HashMap;
use std::path::PathBuf;

/// What code an invocation runs.
///
/// Either a fixed executable (whose script path, if any, travels in the
/// request arguments) or an inline script materialized as a temporary
/// artifact. Never both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvocationTarget {
    Executable(String),
    Script(ScriptSource),
}

/// An inline script template plus the parameters substituted into it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptSource {
    /// Interpreter used to run the artifact. Falls back to the dispatcher
    /// default when `None`.
    pub interpreter: Option<String>,
    pub body: String,
    pub params: HashMap<String, String>,
}

/// Immutable description of one unit of work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationRequest {
    pub target: InvocationTarget,
    /// Passed verbatim, in order. For scripts they follow the artifact path.
    pub arguments: Vec<String>,
    /// Falls back to the dispatcher base directory when `None`.
    pub working_directory: Option<PathBuf>,
    /// Extra environment variables for the child process only.
    pub env_vars: Vec<(String, String)>,
}

impl InvocationRequest {
    /// Run `executable` with `arguments`.
    pub fn command<I, S>(executable: impl Into<String>, arguments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            target: InvocationTarget::Executable(executable.into()),
            arguments: arguments.into_iter().map(Into::into).collect(),
            working_directory: None,
            env_vars: Vec::new(),
        }
    }

    /// Run an inline script body through the default interpreter.
    pub fn script(body: impl Into<String>) -> Self {
        Self {
            target: InvocationTarget::Script(ScriptSource {
                interpreter: None,
                body: body.into(),
                params: HashMap::new(),
            }),
            arguments: Vec::new(),
            working_directory: None,
            env_vars: Vec::new(),
        }
    }

    /// Set the interpreter of a script request. No effect on executables.
    pub fn with_interpreter(mut self, interpreter: impl Into<String>) -> Self {
        if let InvocationTarget::Script(source) = &mut self.target {
            source.interpreter = Some(interpreter.into());
        }
        self
    }

    /// Add a template parameter to a script request. No effect on executables.
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        if let InvocationTarget::Script(source) = &mut self.target {
            source.params.insert(name.into(), value.into());
        }
        self
    }

    /// Append arguments after the ones already present.
    pub fn with_arguments<I, S>(mut self, arguments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.arguments.extend(arguments.into_iter().map(Into::into));
        self
    }

    pub fn in_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_directory = Some(dir.into());
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env_vars.push((key.into(), value.into()));
        self
    }

    /// Short label for logs: the executable, or `<script>`.
    pub fn label(&self) -> &str {
        match &self.target {
            InvocationTarget::Executable(program) => program,
            InvocationTarget::Script(_) => "<script>",
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_keeps_argument_order() {
        let req = InvocationRequest::command("echo", ["b", "a c", "  d  "]);
        assert_eq!(req.target, InvocationTarget::Executable("echo".into()));
        assert_eq!(req.arguments, vec!["b", "a c", "  d  "]);
        assert_eq!(req.label(), "echo");
    }

    #[test]
    fn script_builders_fill_source() {
        let req = InvocationRequest::script("echo {{x}}")
            .with_interpreter("bash")
            .with_param("x", "1")
            .with_arguments(["--flag"])
            .in_dir("/tmp")
            .with_env("K", "V");

        let InvocationTarget::Script(source) = &req.target else {
            panic!("expected script target");
        };
        assert_eq!(source.interpreter.as_deref(), Some("bash"));
        assert_eq!(source.params.get("x").map(String::as_str), Some("1"));
        assert_eq!(req.arguments, vec!["--flag"]);
        assert_eq!(req.working_directory, Some(PathBuf::from("/tmp")));
        assert_eq!(req.env_vars, vec![("K".to_string(), "V".to_string())]);
        assert_eq!(req.label(), "<script>");
    }

    #[test]
    fn script_only_builders_ignore_executables() {
        let req = InvocationRequest::command("ls", Vec::<String>::new())
            .with_interpreter("bash")
            .with_param("x", "1");
        assert_eq!(req.target, InvocationTarget::Executable("ls".into()));
    }
}
