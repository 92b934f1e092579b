//! Structured actions proposed by the model
//!
//! Each reasoning step must end in exactly one action: a JSON object
//! `{"name": "...", "args": {...}}`. Models rarely answer with bare JSON,
//! so the parser accepts, in order:
//! 1. The whole response as a JSON object
//! 2. The body of the first markdown code fence (with or without trailing prose)
//! 3. Any balanced `{...}` object embedded in prose, scanned left to right
//!
//! The first candidate that is valid JSON and matches the schema wins.
//! Objects nested inside another candidate are never candidates themselves,
//! so a reply whose outer object fails the schema cannot be rescued by an
//! inner one.

use serde::Serialize;
use serde_json::{json, Map, Value};

use sdk::errors::EngineError;
use sdk::types::ToolInput;

/// Reserved action name that ends the loop and requests the final reply
pub const FINISH_ACTION: &str = "FINISH";

/// A single proposed action: tool name plus named arguments
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Action {
    name: String,
    args: Map<String, Value>,
}

impl Action {
    pub fn new(name: impl Into<String>, args: Map<String, Value>) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn args(&self) -> &Map<String, Value> {
        &self.args
    }

    /// Whether this is the terminal `FINISH` action
    pub fn is_finish(&self) -> bool {
        self.name == FINISH_ACTION
    }

    /// Tool input carrying a copy of the arguments
    pub fn to_input(&self) -> ToolInput {
        ToolInput::from_params(self.args.clone())
    }

    /// Validate a decoded JSON value against the action schema
    fn from_value(value: Value) -> Result<Self, String> {
        let Value::Object(mut object) = value else {
            return Err("expected a JSON object".to_string());
        };

        let name = match object.remove("name") {
            Some(Value::String(name)) => name.trim().to_string(),
            Some(other) => return Err(format!("`name` must be a string, got {}", other)),
            None => return Err("missing field `name`".to_string()),
        };
        if name.is_empty() {
            return Err("`name` must not be empty".to_string());
        }

        let args = match object.remove("args") {
            Some(Value::Object(args)) => args,
            Some(Value::Null) => Map::new(),
            Some(other) => return Err(format!("`args` must be an object, got {}", other)),
            None => return Err("missing field `args`".to_string()),
        };

        Ok(Self { name, args })
    }
}

/// Parse raw model output into an [`Action`]
///
/// Fails with [`EngineError::MalformedAction`] when no candidate matches.
pub fn parse_action(raw: &str) -> Result<Action, EngineError> {
    let trimmed = raw.trim();
    let mut first_reason: Option<String> = None;

    let mut candidates: Vec<&str> = vec![trimmed];
    if let Some(inner) = extract_fenced_json(trimmed) {
        candidates.push(inner.trim());
    }
    candidates.extend(top_level_objects(trimmed));

    for candidate in candidates {
        let value: Value = match serde_json::from_str(candidate) {
            Ok(value) => value,
            Err(_) => continue,
        };
        match Action::from_value(value) {
            Ok(action) => return Ok(action),
            Err(reason) => {
                first_reason.get_or_insert(reason);
            }
        }
    }

    Err(EngineError::MalformedAction {
        reason: first_reason.unwrap_or_else(|| "no JSON object found in response".to_string()),
        raw: raw.to_string(),
    })
}

/// Instructions appended to the step prompt describing the expected output
pub fn format_instructions() -> String {
    let schema = json!({
        "type": "object",
        "properties": {
            "name": {
                "type": "string",
                "description": format!("tool name, or {} when the task is complete", FINISH_ACTION)
            },
            "args": {
                "type": "object",
                "description": "named tool arguments"
            }
        },
        "required": ["name", "args"]
    });

    format!(
        "Respond with exactly one JSON object that conforms to the schema below. \
         Do not wrap it in prose.\n{}\nExample: {{\"name\": \"echo\", \"args\": {{\"text\": \"hello\"}}}}",
        schema
    )
}

/// Extract the body of the first markdown code fence in the text.
///
/// Works even when there is trailing prose after the closing ```.
/// Returns `None` if no fenced block is found.
fn extract_fenced_json(content: &str) -> Option<&str> {
    let fence_start = content.find("```")?;
    let after_opening = &content[fence_start + 3..];

    // Skip the language tag line (e.g. "json\n")
    let body_start_rel = after_opening.find('\n')? + 1;
    let body_start = fence_start + 3 + body_start_rel;

    let closing = content[body_start..].find("```")?;
    let body_end = body_start + closing;

    if body_start >= body_end {
        return None;
    }

    Some(&content[body_start..body_end])
}

/// Balanced `{...}` spans of `content` that are not nested in one another.
///
/// The scan resumes after each extracted object's closing brace. An unclosed
/// brace ends the scan, since everything after it sits inside that object.
fn top_level_objects(content: &str) -> Vec<&str> {
    let mut objects = Vec::new();
    let mut rest = content;
    while let Some(start) = rest.find('{') {
        let Some(object) = extract_balanced_json(&rest[start..]) else {
            break;
        };
        objects.push(object);
        rest = &rest[start + object.len()..];
    }
    objects
}

/// Extract a balanced JSON object starting at position 0 of `s`.
///
/// Counts `{` / `}` depth, respecting string literals, to find the
/// matching close brace.
fn extract_balanced_json(s: &str) -> Option<&str> {
    if !s.starts_with('{') {
        return None;
    }
    let mut depth = 0i32;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, ch) in s.char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }
        match ch {
            '\\' if in_string => escape_next = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&s[..=i]);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reason_of(err: EngineError) -> String {
        match err {
            EngineError::MalformedAction { reason, .. } => reason,
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_parse_raw_json() {
        let action = parse_action(r#"{"name": "echo", "args": {"text": "hi"}}"#).unwrap();
        assert_eq!(action.name(), "echo");
        assert_eq!(action.args()["text"], "hi");
        assert!(!action.is_finish());
    }

    #[test]
    fn test_parse_fenced_json_with_trailing_prose() {
        let raw = "I will look that up.\n```json\n{\"name\": \"query_train_tickets\", \"args\": {\"origin\": \"Beijing\"}}\n```\nThen I'll report back.";
        let action = parse_action(raw).unwrap();
        assert_eq!(action.name(), "query_train_tickets");
        assert_eq!(action.args()["origin"], "Beijing");
    }

    #[test]
    fn test_parse_json_embedded_in_prose() {
        let raw = r#"Thought: the task is done. Action: {"name": "FINISH", "args": {}} -- end"#;
        let action = parse_action(raw).unwrap();
        assert!(action.is_finish());
        assert!(action.args().is_empty());
    }

    #[test]
    fn test_later_object_wins_when_earlier_is_not_an_action() {
        let raw = r#"Context {"note": "ignore me"} then {"name": "echo", "args": {"text": "}{"}}"#;
        let action = parse_action(raw).unwrap();
        assert_eq!(action.name(), "echo");
        assert_eq!(action.args()["text"], "}{");
    }

    #[test]
    fn test_nested_action_under_bad_name_rejected() {
        let raw = r#"{"name": 42, "args": {"name": "echo", "args": {"text": "smuggled"}}}"#;
        let err = parse_action(raw).unwrap_err();
        assert_eq!(reason_of(err), "`name` must be a string, got 42");
    }

    #[test]
    fn test_nested_finish_under_missing_args_rejected() {
        let raw = r#"{"name": "query_train_tickets", "params": {"name": "FINISH", "args": {}}}"#;
        let err = parse_action(raw).unwrap_err();
        assert_eq!(reason_of(err), "missing field `args`");
    }

    #[test]
    fn test_nested_action_in_prose_rejected() {
        let raw = r#"Plan: {"step": 1, "next": {"name": "echo", "args": {}}} done"#;
        assert!(parse_action(raw).is_err());
    }

    #[test]
    fn test_unclosed_braces_fail_quickly() {
        let raw = "{".repeat(40_000);
        let started = std::time::Instant::now();
        let err = parse_action(&raw).unwrap_err();
        assert_eq!(reason_of(err), "no JSON object found in response");
        assert!(started.elapsed() < std::time::Duration::from_secs(1));
    }

    #[test]
    fn test_top_level_objects_skip_nested() {
        let content = r#"a {"x": {"y": 1}} b {"z": "}"} c {"open": 1"#;
        assert_eq!(
            top_level_objects(content),
            vec![r#"{"x": {"y": 1}}"#, r#"{"z": "}"}"#]
        );
    }

    #[test]
    fn test_null_args_normalized_to_empty() {
        let action = parse_action(r#"{"name": "FINISH", "args": null}"#).unwrap();
        assert!(action.args().is_empty());
    }

    #[test]
    fn test_extra_fields_ignored_and_name_trimmed() {
        let action =
            parse_action(r#"{"name": " echo ", "args": {}, "thought": "why not"}"#).unwrap();
        assert_eq!(action.name(), "echo");
    }

    #[test]
    fn test_missing_args_rejected() {
        let err = parse_action(r#"{"name": "echo"}"#).unwrap_err();
        assert_eq!(reason_of(err), "missing field `args`");
    }

    #[test]
    fn test_wrong_types_rejected() {
        assert!(parse_action(r#"{"name": 42, "args": {}}"#).is_err());
        assert!(parse_action(r#"{"name": "echo", "args": "text=hi"}"#).is_err());
        assert!(parse_action(r#"{"name": "   ", "args": {}}"#).is_err());
        assert!(parse_action(r#"["echo", {}]"#).is_err());
    }

    #[test]
    fn test_unparsable_text_keeps_raw() {
        let raw = "I think I should search for trains first.";
        match parse_action(raw).unwrap_err() {
            EngineError::MalformedAction { reason, raw: kept } => {
                assert_eq!(reason, "no JSON object found in response");
                assert_eq!(kept, raw);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_to_input_copies_args() {
        let action = parse_action(r#"{"name": "echo", "args": {"text": "hi"}}"#).unwrap();
        let input = action.to_input();
        assert_eq!(input.param_str("text").unwrap(), "hi");
    }

    #[test]
    fn test_format_instructions_mentions_schema() {
        let text = format_instructions();
        assert!(text.contains("\"name\""));
        assert!(text.contains("\"args\""));
        assert!(text.contains(FINISH_ACTION));
    }

    #[test]
    fn test_extract_fenced_json() {
        let content = "```json\n{\"a\":1}\n```\nsome trailing text";
        assert_eq!(extract_fenced_json(content), Some("{\"a\":1}\n"));
        assert_eq!(extract_fenced_json("no fences here"), None);
    }

    #[test]
    fn test_extract_balanced_json() {
        assert_eq!(
            extract_balanced_json(r#"{"a":{"b":"}"}} trailing"#),
            Some(r#"{"a":{"b":"}"}}"#)
        );
        assert_eq!(extract_balanced_json(r#"{"unclosed": 1"#), None);
        assert_eq!(extract_balanced_json("x{}"), None);
    }
}
