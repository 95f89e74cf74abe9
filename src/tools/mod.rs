//! Tool collaborators for turn execution
//!
//! This module provides:
//! - `ToolRuntime` trait - Executes server-side tools
//! - `ToolGroups` trait - Resolves tool groups to tool definitions
//! - `ToolRegistry` - Per-turn view of server and client tools

mod provider;
mod registry;
mod tool;

pub use provider::{AgentToolGroup, ToolGroups};
pub use registry::{RegisteredTool, ToolRegistry, ToolSource};
pub use tool::{ToolInvocationResult, ToolRuntime};
