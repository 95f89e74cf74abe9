//! Sessions and turns
//!
//! This module provides `SessionStorage` for reading and writing an agent's
//! sessions and turns through a key-value store, along with the records it
//! stores.
//!
//! Session metadata and each turn are separate records. Deleting a session
//! removes only its metadata.

pub mod metadata;
pub mod session;
pub mod storage;
pub mod turn;

pub use metadata::SessionInfo;
pub use session::Session;
pub use storage::{SessionListing, SessionStorage};
pub use turn::{Step, StepDetails, StepType, Turn};
