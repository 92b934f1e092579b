//! Configuration management
//!
//! This module handles loading, validation, and management of the Wayfarer configuration.
//! Configuration is stored in TOML format at ~/.wayfarer/config.toml.
//!
//! # Configuration Sections
//!
//! - **core**: Log level
//! - **llm**: Provider selection, sampling temperature and per-provider endpoints
//! - **agent**: Step budget, memory ceiling, deadlines and prompt template paths
//! - **tools**: Tool enablement flags and the ticket query endpoint
//!
//! # Path Expansion
//!
//! Template paths may start with `~`, which is expanded to the user's home
//! directory during validation.
//!
//! # Examples
//!
//! ```no_run
//! use wayfarer_engine::config::Config;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Load configuration from default location
//! let config = Config::load_or_create()?;
//!
//! // Access configuration values
//! println!("Provider: {}", config.llm.provider);
//! println!("Step budget: {}", config.agent.max_steps);
//! # Ok(())
//! # }
//! ```

use sdk::errors::EngineError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::agent::working_memory::MIN_TOKEN_LIMIT;

/// Main configuration structure
///
/// Every section falls back to its defaults when omitted, so an empty file
/// is a valid configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Core settings
    #[serde(default)]
    pub core: CoreConfig,

    /// LLM provider configuration
    #[serde(default)]
    pub llm: LLMConfig,

    /// Agent loop settings
    #[serde(default)]
    pub agent: AgentConfig,

    /// Tool enablement
    #[serde(default)]
    pub tools: ToolsConfig,
}

/// Core configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// LLM provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMConfig {
    /// Active provider (ollama, openai)
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Sampling temperature (0.0-2.0)
    #[serde(default)]
    pub temperature: f64,

    /// Ollama provider settings
    #[serde(default)]
    pub ollama: OllamaConfig,

    /// OpenAI provider settings
    #[serde(default)]
    pub openai: OpenAIConfig,
}

/// Ollama provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    /// Base URL for Ollama API
    #[serde(default = "default_ollama_base_url")]
    pub base_url: String,

    /// Model name
    #[serde(default = "default_ollama_model")]
    pub model: String,
}

/// OpenAI provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAIConfig {
    /// Base URL for OpenAI API (any compatible endpoint works)
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,

    /// Model name
    #[serde(default = "default_openai_model")]
    pub model: String,

    /// Name of the environment variable holding the API key
    #[serde(default = "default_openai_api_key_env")]
    pub api_key_env: String,
}

/// Agent loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Maximum think/act/observe iterations per task
    #[serde(default = "default_max_steps")]
    pub max_steps: usize,

    /// Token ceiling for the conversational memory
    #[serde(default = "default_memory_token_limit")]
    pub memory_token_limit: usize,

    /// Deadline for a single model call
    #[serde(default = "default_llm_timeout_secs")]
    pub llm_timeout_secs: u64,

    /// Deadline for a single tool invocation
    #[serde(default = "default_tool_timeout_secs")]
    pub tool_timeout_secs: u64,

    /// Echo model tokens to stdout while they stream in
    #[serde(default = "default_true")]
    pub stream_tokens: bool,

    /// Custom step prompt template (supports ~ expansion)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_prompt: Option<PathBuf>,

    /// Custom final-reply prompt template (supports ~ expansion)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_prompt: Option<PathBuf>,
}

/// Tool enablement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Register the `echo` tool
    #[serde(default = "default_true")]
    pub echo: bool,

    /// Train ticket query tool
    #[serde(default)]
    pub ticket_query: TicketQueryConfig,
}

/// Train ticket query tool configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketQueryConfig {
    /// Register the `query_train_tickets` tool
    #[serde(default)]
    pub enabled: bool,

    /// Listing endpoint queried with origin, destination and date
    #[serde(default = "default_ticket_endpoint")]
    pub endpoint: String,

    /// Maximum number of listings returned to the model
    #[serde(default = "default_ticket_max_results")]
    pub max_results: usize,
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_provider() -> String {
    "ollama".to_string()
}

fn default_ollama_base_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_ollama_model() -> String {
    "llama3.1:8b".to_string()
}

fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_openai_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_openai_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_max_steps() -> usize {
    3
}

fn default_memory_token_limit() -> usize {
    4000
}

fn default_llm_timeout_secs() -> u64 {
    300
}

fn default_tool_timeout_secs() -> u64 {
    120
}

fn default_ticket_endpoint() -> String {
    "http://localhost:8080/api/tickets".to_string()
}

fn default_ticket_max_results() -> usize {
    10
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            temperature: 0.0,
            ollama: OllamaConfig::default(),
            openai: OpenAIConfig::default(),
        }
    }
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: default_ollama_base_url(),
            model: default_ollama_model(),
        }
    }
}

impl Default for OpenAIConfig {
    fn default() -> Self {
        Self {
            base_url: default_openai_base_url(),
            model: default_openai_model(),
            api_key_env: default_openai_api_key_env(),
        }
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_steps: default_max_steps(),
            memory_token_limit: default_memory_token_limit(),
            llm_timeout_secs: default_llm_timeout_secs(),
            tool_timeout_secs: default_tool_timeout_secs(),
            stream_tokens: true,
            task_prompt: None,
            final_prompt: None,
        }
    }
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            echo: true,
            ticket_query: TicketQueryConfig::default(),
        }
    }
}

impl Default for TicketQueryConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: default_ticket_endpoint(),
            max_results: default_ticket_max_results(),
        }
    }
}

impl Config {
    /// Load configuration from the default location (~/.wayfarer/config.toml)
    ///
    /// If the configuration file doesn't exist, creates a default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Configuration file cannot be read or written
    /// - TOML parsing fails
    /// - Validation fails
    pub fn load_or_create() -> Result<Self, EngineError> {
        let config_path = Self::default_config_path()?;
        Self::load_or_create_at(&config_path)
    }

    /// Load configuration from `path`, writing the defaults there first if
    /// the file doesn't exist yet
    pub fn load_or_create_at(path: &Path) -> Result<Self, EngineError> {
        if path.exists() {
            Self::load_from_path(path)
        } else {
            Self::create_default(path)
        }
    }

    /// Load configuration from a specific path
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    pub fn load_from_path(path: &Path) -> Result<Self, EngineError> {
        let contents = fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("Failed to read config file: {}", e)))?;

        let mut config: Config = toml::from_str(&contents)
            .map_err(|e| EngineError::Config(format!("Failed to parse config: {}", e)))?;

        config.validate_and_process()?;

        Ok(config)
    }

    /// Create default configuration and save to path
    fn create_default(path: &Path) -> Result<Self, EngineError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                EngineError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let mut config = Self::default();
        config.validate_and_process()?;

        fs::write(path, config.to_toml()?)
            .map_err(|e| EngineError::Config(format!("Failed to write config file: {}", e)))?;

        tracing::info!("Created default configuration at {}", path.display());

        Ok(config)
    }

    /// Get the default configuration file path (~/.wayfarer/config.toml)
    pub fn default_config_path() -> Result<PathBuf, EngineError> {
        let home = dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))?;

        Ok(home.join(".wayfarer").join("config.toml"))
    }

    /// Serialize the configuration as pretty TOML
    pub fn to_toml(&self) -> Result<String, EngineError> {
        toml::to_string_pretty(self)
            .map_err(|e| EngineError::Config(format!("Failed to serialize config: {}", e)))
    }

    /// Validate and process configuration
    ///
    /// Checks enumerated values and numeric bounds, and expands `~` in the
    /// template paths.
    pub fn validate_and_process(&mut self) -> Result<(), EngineError> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.core.log_level.as_str()) {
            return Err(EngineError::Config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.core.log_level,
                valid_log_levels.join(", ")
            )));
        }

        let valid_providers = ["ollama", "openai"];
        if !valid_providers.contains(&self.llm.provider.as_str()) {
            return Err(EngineError::Config(format!(
                "Invalid provider '{}'. Must be one of: {}",
                self.llm.provider,
                valid_providers.join(", ")
            )));
        }

        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(EngineError::Config(
                "temperature must be between 0.0 and 2.0".to_string(),
            ));
        }

        if self.agent.max_steps == 0 {
            return Err(EngineError::Config(
                "max_steps must be at least 1".to_string(),
            ));
        }

        if self.agent.memory_token_limit < MIN_TOKEN_LIMIT {
            return Err(EngineError::Config(format!(
                "memory_token_limit must be at least {}",
                MIN_TOKEN_LIMIT
            )));
        }

        if self.agent.llm_timeout_secs == 0 || self.agent.tool_timeout_secs == 0 {
            return Err(EngineError::Config(
                "llm_timeout_secs and tool_timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.tools.ticket_query.enabled {
            let endpoint = &self.tools.ticket_query.endpoint;
            if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
                return Err(EngineError::Config(format!(
                    "ticket_query.endpoint must be an http(s) URL, got '{}'",
                    endpoint
                )));
            }
            if self.tools.ticket_query.max_results == 0 {
                return Err(EngineError::Config(
                    "ticket_query.max_results must be at least 1".to_string(),
                ));
            }
        }

        if let Some(path) = &self.agent.task_prompt {
            self.agent.task_prompt = Some(expand_path(path)?);
        }
        if let Some(path) = &self.agent.final_prompt {
            self.agent.final_prompt = Some(expand_path(path)?);
        }

        Ok(())
    }
}

/// Expand ~ in path to user's home directory
///
/// # Examples
///
/// ```ignore
/// let path = PathBuf::from("~/prompts/step.txt");
/// let expanded = expand_path(&path)?;
/// // expanded is now /home/user/prompts/step.txt (on Unix)
/// ```
fn expand_path(path: &Path) -> Result<PathBuf, EngineError> {
    let path_str = path
        .to_str()
        .ok_or_else(|| EngineError::Config("Invalid UTF-8 in path".to_string()))?;

    if let Some(rest) = path_str.strip_prefix("~/") {
        let home = dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))?;

        Ok(home.join(rest))
    } else if path_str == "~" {
        dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))
    } else {
        Ok(path.to_path_buf())
    }
}
