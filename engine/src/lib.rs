//! Wayfarer Engine
//!
//! Bounded-step reasoning agent: a language model picks one tool action per
//! step until it finishes or the step budget runs out. The `wayfarer` binary
//! and the integration tests both build on this library.

pub mod agent;
pub mod cli;
pub mod config;
pub mod handlers;
pub mod llm;
pub mod telemetry;

/// Built-in tools and the tool registry
pub mod tools;
