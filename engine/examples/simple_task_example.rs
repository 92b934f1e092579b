//! Example demonstrating simple task execution with the agent loop
//!
//! This example shows how to:
//! - Create an agent with an LLM provider and a tool registry
//! - Stream the model's reasoning to stdout
//! - Inspect the step trace afterwards
//!
//! Prerequisites:
//! - Ollama must be installed and running
//! - A model must be available (e.g., llama3.1:8b)

use std::sync::Arc;

use sdk::Tool;
use wayfarer_engine::{
    agent::{AgentCore, StdoutSink},
    config::AgentConfig,
    llm::{LLMProvider, OllamaProvider},
    tools::{EchoTool, FinishTool, ToolRegistry},
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Simple Task Execution Example ===\n");

    let ollama = OllamaProvider::new("http://localhost:11434", "llama3.1:8b");
    println!(
        "✓ LLM Provider: {} (local: {})",
        ollama.name(),
        ollama.is_local()
    );

    if !ollama.check_health().await {
        println!("✗ Ollama is not reachable at http://localhost:11434");
        return Ok(());
    }

    let tools: Vec<Arc<dyn Tool>> = vec![Arc::new(FinishTool), Arc::new(EchoTool)];
    let registry = ToolRegistry::new(tools)?;
    println!("✓ Tools: {}", registry.names().join(", "));

    let config = AgentConfig {
        max_steps: 3,
        ..AgentConfig::default()
    };
    let mut agent =
        AgentCore::new(Arc::new(ollama), Arc::new(registry), &config)?.with_sink(Arc::new(StdoutSink));

    let task = "Use the echo tool to repeat 'hello wayfarer', then finish.";
    println!("\nTask: {}\n", task);

    let report = agent.execute(task).await?;

    println!("\n\n=== Trace ===");
    for step in &report.trace {
        println!("{}. {}", step.index, step.action.name());
        if let Some(observation) = &step.observation {
            println!("   -> {}", observation);
        }
    }

    println!("\n=== Reply ({:?}, {} steps) ===", report.outcome, report.steps);
    println!("{}", report.reply);

    Ok(())
}
