//! Transport implementations that run in-process
//!
//! `memory` behaves like the remote chat service; `settings_file` keeps user
//! settings in a JSON file.

pub mod memory;
pub mod settings_file;

pub use memory::{EchoResponder, InMemoryTransport, Responder};
pub use settings_file::FileSettingsTransport;
