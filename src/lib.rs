//! Persistent agents with resumable, streamed turns
//!
//! - `kvstore` - Pluggable key-value storage
//! - `registry` - Durable agent configurations and their enumeration index
//! - `session` - Sessions, turns and steps over a store
//! - `agent` - Turn execution as event streams, suspended on client tools
//! - `runtime` - The agents API wiring these together

pub mod core;
pub mod keys;
pub mod kvstore;
pub mod registry;
pub mod session;

// Collaborator interfaces
pub mod llm;
pub mod safety;
pub mod tools;
pub mod vector_io;

// Turn execution
pub mod agent;
pub mod runtime;

// Ambient
pub mod cli;
pub mod config;
pub mod logging;
