//! Prompt templates
//!
//! Templates use `{name}` placeholders. `{{` and `}}` render as literal braces.
//! Some variables are bound once up front with [`PromptTemplate::partial`]
//! (the tool list, the format instructions); the rest are supplied on every
//! [`PromptTemplate::render`] call.

use regex::{Captures, Regex};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use sdk::errors::EngineError;

const PLACEHOLDER_PATTERN: &str = r"\{\{|\}\}|\{([A-Za-z_][A-Za-z0-9_]*)\}";

/// Default step prompt
pub const DEFAULT_TASK_PROMPT: &str = "\
You are a careful assistant that completes tasks by calling tools, one step at a time.

Task:
{task_description}

Available tools:
{tools}

When the task is complete, or no tool can help any further, choose the action FINISH with empty args.
Never invent tool results; rely only on the observations recorded below.

Conversation so far:
{memory}

{format_instructions}
";

/// Default prompt for the final synthesized reply
pub const DEFAULT_FINAL_PROMPT: &str = "\
You have finished working on the task below.

Task:
{task_description}

Here is everything you did and observed:
{memory}

Write the final answer for the user. Base it only on the observations above and say plainly if something could not be found.
";

/// Text template with named placeholders
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    template: String,
    variables: Vec<String>,
    partials: HashMap<String, String>,
    pattern: Regex,
}

impl PromptTemplate {
    /// Parse a template, collecting its placeholder names in order of appearance
    pub fn new(template: impl Into<String>) -> Result<Self, EngineError> {
        let template = template.into();
        let pattern = Regex::new(PLACEHOLDER_PATTERN)
            .map_err(|e| EngineError::Template(format!("Invalid placeholder pattern: {}", e)))?;

        let mut variables: Vec<String> = Vec::new();
        for caps in pattern.captures_iter(&template) {
            if let Some(name) = caps.get(1) {
                if !variables.iter().any(|v| v == name.as_str()) {
                    variables.push(name.as_str().to_string());
                }
            }
        }

        Ok(Self {
            template,
            variables,
            partials: HashMap::new(),
            pattern,
        })
    }

    /// Load a template from a file
    pub fn from_file(path: &Path) -> Result<Self, EngineError> {
        let contents = fs::read_to_string(path).map_err(|e| {
            EngineError::Template(format!(
                "Failed to read prompt template {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::new(contents)
    }

    /// Load from `path` when one is configured, otherwise use `default`
    pub fn load_or(path: Option<&Path>, default: &str) -> Result<Self, EngineError> {
        match path {
            Some(path) => {
                tracing::debug!("Loading prompt template from {}", path.display());
                Self::from_file(path)
            }
            None => Self::new(default),
        }
    }

    /// Placeholder names, in order of first appearance
    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    /// Bind a variable once, for every later render
    pub fn partial(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.partials.insert(name.into(), value.into());
        self
    }

    /// Fail if a placeholder is neither bound as a partial nor in `supplied`
    ///
    /// Catches unknown variables in user-provided templates before the
    /// first render.
    pub fn check_variables(&self, supplied: &[&str]) -> Result<(), EngineError> {
        match self
            .variables
            .iter()
            .find(|v| !supplied.contains(&v.as_str()) && !self.partials.contains_key(v.as_str()))
        {
            Some(unknown) => Err(EngineError::Template(format!(
                "Unknown template variable '{}' (expected one of: {})",
                unknown,
                supplied.join(", ")
            ))),
            None => Ok(()),
        }
    }

    /// Substitute every placeholder
    ///
    /// Values passed here take precedence over partials. Fails with
    /// [`EngineError::Template`] naming the first unbound variable.
    pub fn render(&self, values: &[(&str, &str)]) -> Result<String, EngineError> {
        if let Some(missing) = self
            .variables
            .iter()
            .find(|v| self.lookup(values, v.as_str()).is_none())
        {
            return Err(EngineError::Template(format!(
                "Missing value for template variable '{}'",
                missing
            )));
        }

        let rendered = self
            .pattern
            .replace_all(&self.template, |caps: &Captures| match caps.get(1) {
                Some(name) => self
                    .lookup(values, name.as_str())
                    .unwrap_or_default()
                    .to_string(),
                None if &caps[0] == "{{" => "{".to_string(),
                None => "}".to_string(),
            });

        Ok(rendered.into_owned())
    }

    fn lookup<'a>(&'a self, values: &'a [(&'a str, &'a str)], name: &str) -> Option<&'a str> {
        values
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| *value)
            .or_else(|| self.partials.get(name).map(String::as_str))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variables_detected_in_order() {
        let template = PromptTemplate::new("{b} then {a} then {b} again").unwrap();
        assert_eq!(template.variables(), &["b".to_string(), "a".to_string()]);
    }

    #[test]
    fn test_check_variables() {
        let template = PromptTemplate::new("{task_description} {tools} {weather}")
            .unwrap()
            .partial("tools", "echo");

        assert!(template
            .check_variables(&["task_description", "weather"])
            .is_ok());
        assert!(matches!(
            template.check_variables(&["task_description"]),
            Err(EngineError::Template(msg)) if msg.contains("weather")
        ));
    }

    #[test]
    fn test_render_with_values_and_partials() {
        let template = PromptTemplate::new("Task: {task}\nTools: {tools}")
            .unwrap()
            .partial("tools", "echo");
        let rendered = template.render(&[("task", "say hi")]).unwrap();
        assert_eq!(rendered, "Task: say hi\nTools: echo");
    }

    #[test]
    fn test_render_values_override_partials() {
        let template = PromptTemplate::new("{x}").unwrap().partial("x", "partial");
        assert_eq!(template.render(&[("x", "direct")]).unwrap(), "direct");
    }

    #[test]
    fn test_missing_variable_is_template_error() {
        let template = PromptTemplate::new("Hello {name}").unwrap();
        let err = template.render(&[]).unwrap_err();
        assert!(matches!(err, EngineError::Template(ref msg) if msg.contains("name")));
    }

    #[test]
    fn test_substituted_values_are_not_rescanned() {
        let template = PromptTemplate::new("{a}|{b}").unwrap();
        let rendered = template
            .render(&[("a", "{b}"), ("b", r#"{"name": "echo"}"#)])
            .unwrap();
        assert_eq!(rendered, r#"{b}|{"name": "echo"}"#);
    }

    #[test]
    fn test_escaped_braces() {
        let template = PromptTemplate::new(r#"{{"name": "{tool}"}}"#).unwrap();
        assert_eq!(template.variables(), &["tool".to_string()]);
        assert_eq!(
            template.render(&[("tool", "echo")]).unwrap(),
            r#"{"name": "echo"}"#
        );
    }

    #[test]
    fn test_json_literal_is_not_a_placeholder() {
        let template = PromptTemplate::new(r#"Answer like {"name": "x"} for {task}"#).unwrap();
        assert_eq!(template.variables(), &["task".to_string()]);
    }

    #[test]
    fn test_default_templates_declare_expected_variables() {
        let task = PromptTemplate::new(DEFAULT_TASK_PROMPT).unwrap();
        for name in ["task_description", "tools", "memory", "format_instructions"] {
            assert!(task.variables().iter().any(|v| v == name), "{}", name);
        }

        let final_prompt = PromptTemplate::new(DEFAULT_FINAL_PROMPT).unwrap();
        assert_eq!(
            final_prompt.variables(),
            &["task_description".to_string(), "memory".to_string()]
        );
    }

    #[test]
    fn test_load_or_uses_file_when_present() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("step.txt");
        std::fs::write(&path, "Custom {task_description}").unwrap();

        let template = PromptTemplate::load_or(Some(&path), DEFAULT_TASK_PROMPT).unwrap();
        assert_eq!(
            template.render(&[("task_description", "go")]).unwrap(),
            "Custom go"
        );

        let missing = dir.path().join("missing.txt");
        assert!(PromptTemplate::load_or(Some(&missing), DEFAULT_TASK_PROMPT).is_err());
        assert!(PromptTemplate::load_or(None, DEFAULT_TASK_PROMPT).is_ok());
    }
}
