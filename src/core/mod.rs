//! Core types shared across the crate
//!
//! This module provides:
//! - `TurnStatus` - Persisted state of a turn
//! - `TurnEvent` - Events streamed from a turn
//! - `AgentsError` - Error types

pub mod error;
pub mod output;
pub mod state;

pub use error::{AgentsError, AgentsResult};
pub use output::TurnEvent;
pub use state::TurnStatus;
