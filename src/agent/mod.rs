//! Agents and turn execution
//!
//! This module provides:
//! - `AgentConfig` - The configuration an agent is created with
//! - `ChatAgent` - Executes and resumes turns as event streams
//! - `AgentApis` - The collaborators a turn calls out to

pub mod apis;
pub mod chat_agent;
pub mod config;
pub mod executor;
pub mod request;

pub use apis::AgentApis;
pub use chat_agent::{ChatAgent, TurnEventStream};
pub use config::AgentConfig;
pub use executor::ToolExecutor;
pub use request::{AgentTurnCreateRequest, AgentTurnResumeRequest};
