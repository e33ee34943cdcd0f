//! Client-side conversation state machine
//!
//! Implements the Elm Architecture pattern: a single owned `ChatState`,
//! mutated only by the pure `transition` function, which returns the effects
//! for the runtime to perform.

mod effect;
pub mod event;
pub mod selectors;
pub mod state;
pub mod store;
pub(crate) mod transition;


pub use effect::{Effect, Notice};
pub use event::Event;
pub use state::{ChatState, Conversation, ConversationId};
pub use store::ConversationStore;
pub use transition::transition;
