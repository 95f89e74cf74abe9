//! Agents runtime
//!
//! `AgentsRuntime` wires the registry, session storage and turn execution
//! together behind one API:
//! - Agents live in the durable store
//! - Sessions go to the durable store or the shared in-memory store, per agent
//! - Turns are executed and resumed as event streams

pub mod runtime;

pub use runtime::AgentsRuntime;
