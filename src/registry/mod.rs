//! Agent registry
//!
//! This module provides `AgentRegistry` for creating, reading, enumerating and
//! deleting agents, and the helpers that maintain the `agent_ids` index.

pub mod index;
pub mod registry;

pub use registry::{Agent, AgentListing, AgentRegistry};
