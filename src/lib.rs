//! Loki Chat client core
//!
//! Conversation state for a chat client: optimistic sends reconciled against
//! the chat service, rolled back on failure, with loading/typing/error
//! tracking and settings.

pub mod config;
pub mod error;
pub mod runtime;
pub mod state_machine;
pub mod timestamp;
pub mod transport;
