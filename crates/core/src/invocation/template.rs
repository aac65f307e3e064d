//! Parameter substitution for generated scripts.
//!
//! Script bodies are rendered before they are written to a temporary
//! artifact. Placeholders use `{{name}}`; single braces are left alone so
//! shell (`${VAR}`, `{ ...; }`) and Python bodies need no escaping.
//!
//! Rendering is strict: an unknown parameter is an error, never an empty
//! substitution. Values are inserted verbatim.

use std::collections::HashMap;

const OPEN: &str = "{{";
const CLOSE: &str = "}}";

/// Error type for template rendering failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TemplateError {
    /// A placeholder names a parameter that was not supplied.
    #[error("undefined parameter '{name}' at position {position} in script template")]
    UndefinedParameter { name: String, position: usize },

    /// A `{{` was found without a closing `}}`.
    #[error("unterminated placeholder at position {position} in script template")]
    UnterminatedPlaceholder { position: usize },

    /// A placeholder with nothing between the braces (`{{}}`).
    #[error("empty parameter name at position {position} in script template")]
    EmptyParameterName { position: usize },
}

/// Render `template`, replacing every `{{name}}` with `params[name]`.
///
/// Whitespace inside the braces is ignored, so `{{ name }}` and `{{name}}`
/// are equivalent. Positions in errors are byte offsets into `template`.
pub fn render_script(
    template: &str,
    params: &HashMap<String, String>,
) -> Result<String, TemplateError> {
    let mut rendered = String::with_capacity(template.len());
    let mut rest = template;
    let mut offset = 0;

    while let Some(start) = rest.find(OPEN) {
        rendered.push_str(&rest[..start]);

        let position = offset + start;
        let inner = &rest[start + OPEN.len()..];
        let end = inner
            .find(CLOSE)
            .ok_or(TemplateError::UnterminatedPlaceholder { position })?;

        let name = inner[..end].trim();
        if name.is_empty() {
            return Err(TemplateError::EmptyParameterName { position });
        }

        let value = params
            .get(name)
            .ok_or_else(|| TemplateError::UndefinedParameter {
                name: name.to_string(),
                position,
            })?;
        rendered.push_str(value);

        let consumed = start + OPEN.len() + end + CLOSE.len();
        rest = &rest[consumed..];
        offset += consumed;
    }

    rendered.push_str(rest);
    Ok(rendered)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn substitutes_parameters() {
        let vars = params(&[("name", "alpha"), ("count", "3")]);
        let out = render_script("echo {{name}} x{{ count }}", &vars).unwrap();
        assert_eq!(out, "echo alpha x3");
    }

    #[test]
    fn template_without_placeholders_is_unchanged() {
        let body = "exit 1\n";
        assert_eq!(render_script(body, &HashMap::new()).unwrap(), body);
    }

    #[test]
    fn single_braces_pass_through() {
        let vars = params(&[("dir", "/srv/agents")]);
        let out = render_script("cd {{dir}} && echo ${HOME} && f() { :; }", &vars).unwrap();
        assert_eq!(out, "cd /srv/agents && echo ${HOME} && f() { :; }");
    }

    #[test]
    fn repeated_placeholder_is_substituted_each_time() {
        let vars = params(&[("n", "7")]);
        assert_eq!(render_script("{{n}}-{{n}}", &vars).unwrap(), "7-7");
    }

    #[test]
    fn undefined_parameter_is_an_error() {
        let err = render_script("echo {{missing}}", &HashMap::new()).unwrap_err();
        assert_eq!(
            err,
            TemplateError::UndefinedParameter {
                name: "missing".to_string(),
                position: 5,
            }
        );
    }

    #[test]
    fn unterminated_placeholder_is_an_error() {
        let vars = params(&[("a", "1")]);
        let err = render_script("{{a}} then {{b", &vars).unwrap_err();
        assert_eq!(err, TemplateError::UnterminatedPlaceholder { position: 11 });
    }

    #[test]
    fn empty_parameter_name_is_an_error() {
        let err = render_script("x {{  }} y", &HashMap::new()).unwrap_err();
        assert_eq!(err, TemplateError::EmptyParameterName { position: 2 });
    }

    #[test]
    fn values_are_inserted_verbatim() {
        let vars = params(&[("v", "{{not_a_placeholder}}")]);
        assert_eq!(
            render_script("[{{v}}]", &vars).unwrap(),
            "[{{not_a_placeholder}}]"
        );
    }
}
