//! Built-in tools and the tool registry
//!
//! - `FINISH`: reserved end-of-task action, always registered
//! - `echo`: returns its argument, handy for smoke tests
//! - `query_train_tickets`: train listings from an HTTP endpoint

pub mod echo;
pub mod finish;
pub mod ticket_query;

pub use echo::EchoTool;
pub use finish::FinishTool;
pub use ticket_query::{
    HttpTicketSource, TicketListing, TicketQuery, TicketQueryTool, TicketSource,
};

use std::collections::HashMap;
use std::sync::Arc;

use sdk::errors::EngineError;
use sdk::tool::Tool;
use tracing::debug;

use crate::config::ToolsConfig;

/// Registry of the tools the agent can dispatch to.
///
/// Built once from a list of tools; there is no way to add or remove a
/// tool afterward.
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    /// Build a registry, rejecting duplicate names
    pub fn new(tools: Vec<Arc<dyn Tool>>) -> Result<Self, EngineError> {
        let mut map: HashMap<String, Arc<dyn Tool>> = HashMap::with_capacity(tools.len());
        for tool in tools {
            let name = tool.name().to_string();
            if map.contains_key(&name) {
                return Err(EngineError::DuplicateTool(name));
            }
            debug!("Registered tool '{}'", name);
            map.insert(name, tool);
        }
        Ok(Self { tools: map })
    }

    /// Build the registry described by the `[tools]` config section.
    ///
    /// `FINISH` is always registered so it shows up in the tool list.
    pub fn from_config(config: &ToolsConfig) -> Result<Self, EngineError> {
        let mut tools: Vec<Arc<dyn Tool>> = vec![Arc::new(FinishTool)];

        if config.echo {
            tools.push(Arc::new(EchoTool));
        }

        if config.ticket_query.enabled {
            let source = HttpTicketSource::new(config.ticket_query.endpoint.clone());
            tools.push(Arc::new(TicketQueryTool::new(
                Arc::new(source),
                config.ticket_query.max_results,
            )));
        }

        Self::new(tools)
    }

    /// Look up a tool by exact name
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).map(Arc::clone)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Tool names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Describe every tool for the prompt, one line each, in name order:
    /// `name: description, args: {...}`
    pub fn render_descriptions(&self) -> String {
        self.names()
            .into_iter()
            .filter_map(|name| self.tools.get(name))
            .map(|tool| {
                let parameters = tool.parameters();
                let properties = parameters
                    .get("properties")
                    .cloned()
                    .unwrap_or_else(|| serde_json::json!({}));
                format!("{}: {}, args: {}", tool.name(), tool.description(), properties)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}
