//! Logical agent operations and the invocation requests they map to.
//!
//! The dashboard never runs agents itself. Each operation here turns user
//! input into exactly one [`InvocationRequest`] against the external agent
//! CLI, plus the validation needed before user text reaches a command line
//! or a generated script.

use std::collections::HashMap;

use crate::error::CoreError;
use crate::invocation::output::parse_list;
use crate::invocation::template::render_script;
use crate::invocation::InvocationRequest;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Default agent CLI command line.
pub const DEFAULT_AGENT_CLI: &str = "mofa";

/// CLI subcommand printing the known agents.
pub const LIST_SUBCOMMAND: &str = "agent-list";

/// CLI subcommand running an agent.
pub const RUN_SUBCOMMAND: &str = "run";

/// Flag naming the agent for [`RUN_SUBCOMMAND`].
pub const AGENT_NAME_FLAG: &str = "--agent-name";

/// Script run to create an agent. Parameters: `cli`, `agent_name`,
/// `description`. Runs in the agents directory.
pub const DEFAULT_CREATE_TEMPLATE: &str = r#"set -eu
{{cli}} new-agent "{{agent_name}}"
if [ -n "{{description}}" ] && [ -d "{{agent_name}}" ]; then
  printf '%s\n' "{{description}}" > "{{agent_name}}/DESCRIPTION"
fi
"#;

/// Maximum length of an agent name.
const MAX_NAME_LEN: usize = 64;

/// Maximum length of an agent description.
const MAX_DESCRIPTION_LEN: usize = 512;

/// Characters never allowed in text substituted into a generated script.
const FORBIDDEN_DESCRIPTION_CHARS: &[char] = &['"', '\'', '\\', '$', '`', '\n', '\r'];

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate an agent name.
///
/// Rules:
/// - Must not be empty or exceed `MAX_NAME_LEN` characters.
/// - Only ASCII alphanumerics, `-` and `_`.
/// - Must not start with `-` (it would read as a CLI flag).
pub fn validate_agent_name(name: &str) -> Result<(), CoreError> {
    if name.is_empty() {
        return Err(CoreError::Validation("Agent name must not be empty".into()));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(CoreError::Validation(format!(
            "Agent name must not exceed {MAX_NAME_LEN} characters"
        )));
    }
    if name.starts_with('-') {
        return Err(CoreError::Validation(
            "Agent name must not start with '-'".into(),
        ));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(CoreError::Validation(format!(
            "Agent name '{name}' may only contain letters, digits, '-' and '_'"
        )));
    }
    Ok(())
}

/// Validate a free-text agent description.
pub fn validate_description(description: &str) -> Result<(), CoreError> {
    if description.chars().count() > MAX_DESCRIPTION_LEN {
        return Err(CoreError::Validation(format!(
            "Description must not exceed {MAX_DESCRIPTION_LEN} characters"
        )));
    }
    if let Some(c) = description
        .chars()
        .find(|c| FORBIDDEN_DESCRIPTION_CHARS.contains(c))
    {
        return Err(CoreError::Validation(format!(
            "Description must not contain {c:?}"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI command line
// ---------------------------------------------------------------------------

/// The agent CLI as a program plus leading arguments, e.g. `python -m mofa`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentCli {
    pub program: String,
    pub leading_args: Vec<String>,
}

impl AgentCli {
    /// Split a command line with shell quoting rules.
    pub fn parse(command_line: &str) -> Result<Self, CoreError> {
        let mut words = shell_words::split(command_line)
            .map_err(|e| CoreError::InvalidCli(format!("'{command_line}': {e}")))?
            .into_iter();
        let program = words
            .next()
            .ok_or_else(|| CoreError::InvalidCli("command line is empty".into()))?;
        Ok(Self {
            program,
            leading_args: words.collect(),
        })
    }

    /// Request running this CLI with `args` after the leading arguments.
    fn request<I, S>(&self, args: I) -> InvocationRequest
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        InvocationRequest::command(self.program.clone(), self.leading_args.clone())
            .with_arguments(args)
    }

    /// Shell-quoted form for substitution into generated scripts.
    pub fn to_shell(&self) -> String {
        shell_words::join(std::iter::once(&self.program).chain(&self.leading_args))
    }
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

/// Input for the create operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewAgent {
    pub name: String,
    pub description: Option<String>,
}

/// Builds the invocation request for each logical agent operation.
#[derive(Debug, Clone)]
pub struct AgentCommands {
    cli: AgentCli,
    create_template: String,
}

impl AgentCommands {
    pub fn new(cli: AgentCli) -> Self {
        Self {
            cli,
            create_template: DEFAULT_CREATE_TEMPLATE.to_string(),
        }
    }

    /// Replace the create script. The template is checked against the
    /// known parameters so a typo fails here rather than on first use.
    pub fn with_create_template(mut self, template: impl Into<String>) -> Result<Self, CoreError> {
        let template = template.into();
        render_script(&template, &create_params(&self.cli, "example", ""))?;
        self.create_template = template;
        Ok(self)
    }

    pub fn cli(&self) -> &AgentCli {
        &self.cli
    }

    /// `<cli> agent-list`
    pub fn list(&self) -> InvocationRequest {
        self.cli.request([LIST_SUBCOMMAND])
    }

    /// `<cli> run --agent-name <name> [inputs...]`
    pub fn run(&self, name: &str, inputs: &[String]) -> Result<InvocationRequest, CoreError> {
        validate_agent_name(name)?;
        Ok(self
            .cli
            .request([RUN_SUBCOMMAND, AGENT_NAME_FLAG, name])
            .with_arguments(inputs.iter().cloned()))
    }

    /// Generated script creating a new agent.
    pub fn create(&self, agent: &NewAgent) -> Result<InvocationRequest, CoreError> {
        validate_agent_name(&agent.name)?;
        let description = agent.description.as_deref().unwrap_or_default();
        validate_description(description)?;

        let mut request = InvocationRequest::script(self.create_template.clone());
        for (key, value) in create_params(&self.cli, &agent.name, description) {
            request = request.with_param(key, value);
        }
        Ok(request)
    }
}

fn create_params(cli: &AgentCli, name: &str, description: &str) -> HashMap<String, String> {
    HashMap::from([
        ("cli".to_string(), cli.to_shell()),
        ("agent_name".to_string(), name.to_string()),
        ("description".to_string(), description.to_string()),
    ])
}

/// Best-effort reading of `agent-list` output.
pub fn parse_agent_list(stdout: &str) -> Option<Vec<String>> {
    parse_list(stdout)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::invocation::template::TemplateError;
    use crate::invocation::InvocationTarget;

    fn commands() -> AgentCommands {
        AgentCommands::new(AgentCli::parse("python -m mofa").unwrap())
    }

    // -- validate_agent_name --

    #[test]
    fn valid_agent_names() {
        assert!(validate_agent_name("reasoner").is_ok());
        assert!(validate_agent_name("rag_query-2").is_ok());
    }

    #[test]
    fn empty_name_rejected() {
        assert_matches!(validate_agent_name(""), Err(CoreError::Validation(_)));
    }

    #[test]
    fn long_name_rejected() {
        let name = "a".repeat(MAX_NAME_LEN + 1);
        assert_matches!(validate_agent_name(&name), Err(CoreError::Validation(_)));
    }

    #[test]
    fn flag_like_name_rejected() {
        assert_matches!(validate_agent_name("-rf"), Err(CoreError::Validation(_)));
    }

    #[test]
    fn special_characters_rejected() {
        for name in ["a b", "a/b", "a;b", "../x", "$(x)"] {
            assert_matches!(
                validate_agent_name(name),
                Err(CoreError::Validation(_)),
                "{name}"
            );
        }
    }

    // -- validate_description --

    #[test]
    fn description_rules() {
        assert!(validate_description("").is_ok());
        assert!(validate_description("Answers questions over a graph index.").is_ok());
        assert!(validate_description("say \"hi\"").is_err());
        assert!(validate_description("costs $5").is_err());
        assert!(validate_description("two\nlines").is_err());
        assert!(validate_description(&"x".repeat(MAX_DESCRIPTION_LEN + 1)).is_err());
    }

    // -- AgentCli --

    #[test]
    fn cli_parse_splits_words() {
        let cli = AgentCli::parse("python -m 'mofa cli'").unwrap();
        assert_eq!(cli.program, "python");
        assert_eq!(cli.leading_args, vec!["-m", "mofa cli"]);
        assert_eq!(cli.to_shell(), "python -m 'mofa cli'");
    }

    #[test]
    fn cli_parse_rejects_empty_and_unbalanced() {
        assert_matches!(AgentCli::parse("   "), Err(CoreError::InvalidCli(_)));
        assert_matches!(AgentCli::parse("mofa 'oops"), Err(CoreError::InvalidCli(_)));
    }

    // -- requests --

    #[test]
    fn list_request() {
        let req = commands().list();
        assert_eq!(req.target, InvocationTarget::Executable("python".into()));
        assert_eq!(req.arguments, vec!["-m", "mofa", "agent-list"]);
    }

    #[test]
    fn run_request_appends_inputs_verbatim() {
        let req = commands()
            .run("reasoner", &["what is rust?".to_string(), "--verbose".to_string()])
            .unwrap();
        assert_eq!(
            req.arguments,
            vec!["-m", "mofa", "run", "--agent-name", "reasoner", "what is rust?", "--verbose"]
        );
    }

    #[test]
    fn run_request_validates_name() {
        assert_matches!(commands().run("bad name", &[]), Err(CoreError::Validation(_)));
    }

    #[test]
    fn create_request_is_a_script_with_params() {
        let req = commands()
            .create(&NewAgent {
                name: "summarizer".into(),
                description: Some("Summarizes text".into()),
            })
            .unwrap();

        let InvocationTarget::Script(source) = &req.target else {
            panic!("expected script target");
        };
        assert_eq!(source.body, DEFAULT_CREATE_TEMPLATE);
        assert_eq!(source.params["agent_name"], "summarizer");
        assert_eq!(source.params["description"], "Summarizes text");
        assert_eq!(source.params["cli"], "python -m mofa");

        let rendered = render_script(&source.body, &source.params).unwrap();
        assert!(rendered.contains("python -m mofa new-agent \"summarizer\""));
    }

    #[test]
    fn create_request_validates_input() {
        let bad = NewAgent {
            name: "ok".into(),
            description: Some("`reboot`".into()),
        };
        assert_matches!(commands().create(&bad), Err(CoreError::Validation(_)));
    }

    #[test]
    fn custom_template_is_checked() {
        let ok = commands().with_create_template("echo {{agent_name}} {{description}}");
        assert!(ok.is_ok());

        let typo = commands().with_create_template("echo {{agent}}");
        assert_matches!(
            typo,
            Err(CoreError::Template(TemplateError::UndefinedParameter { .. }))
        );
    }

    #[test]
    fn parse_agent_list_reads_python_list() {
        assert_eq!(
            parse_agent_list("['a', 'b']\n"),
            Some(vec!["a".to_string(), "b".to_string()])
        );
        assert_eq!(parse_agent_list("no agents found"), None);
    }
}
