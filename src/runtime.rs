//! Runtime for executing chat state transitions
//!
//! A single task owns the [`ChatState`] and applies events one at a time.
//! Transport calls run in background tasks and report back as events, so the
//! loop never blocks on I/O. Everyone else talks to it through a
//! [`ChatHandle`].

mod executor;
pub mod traits;

#[cfg(test)]
pub mod testing;

pub use executor::ChatRuntime;
pub use traits::*;

use crate::error::ClientError;
use crate::state_machine::{ChatState, Event, Notice};
use tokio::sync::{broadcast, mpsc, watch};

/// Capacity of the notice channel; slow subscribers lag rather than block
pub const NOTICE_CAPACITY: usize = 64;

/// Start a runtime on the current tokio runtime and return its handle
pub fn spawn<T, S>(state: ChatState, chat: T, settings: S, buffer: usize) -> ChatHandle
where
    T: ChatTransport + 'static,
    S: SettingsTransport + 'static,
{
    let (runtime, handle) = ChatRuntime::new(state, chat, settings, buffer);
    tokio::spawn(runtime.run());
    handle
}

/// Handle to interact with a running chat runtime
#[derive(Clone)]
pub struct ChatHandle {
    event_tx: mpsc::Sender<Event>,
    state_rx: watch::Receiver<ChatState>,
    notice_tx: broadcast::Sender<Notice>,
}

impl ChatHandle {
    /// Queue an event for the runtime
    pub async fn dispatch(&self, event: Event) -> Result<(), ClientError> {
        self.event_tx
            .send(event)
            .await
            .map_err(|_| ClientError::RuntimeStopped)
    }

    /// Submit `text` as a user message in the active conversation
    pub async fn send_message(&self, text: impl Into<String>) -> Result<(), ClientError> {
        self.dispatch(Event::submit(text)).await
    }

    /// The most recently published state
    pub fn snapshot(&self) -> ChatState {
        self.state_rx.borrow().clone()
    }

    /// Receiver that sees every state the runtime publishes
    pub fn watch(&self) -> watch::Receiver<ChatState> {
        self.state_rx.clone()
    }

    /// One-shot notices emitted from now on
    pub fn subscribe(&self) -> broadcast::Receiver<Notice> {
        self.notice_tx.subscribe()
    }

    /// Dispatch `event`, then wait for the first later state that satisfies
    /// `settled`. States published before the dispatch are not considered.
    pub async fn dispatch_until(
        &self,
        event: Event,
        mut settled: impl FnMut(&ChatState) -> bool,
    ) -> Result<ChatState, ClientError> {
        let mut state_rx = self.state_rx.clone();
        state_rx.mark_unchanged();
        self.dispatch(event).await?;
        loop {
            state_rx
                .changed()
                .await
                .map_err(|_| ClientError::RuntimeStopped)?;
            let state = state_rx.borrow_and_update().clone();
            if settled(&state) {
                return Ok(state);
            }
        }
    }

    /// Wait until the published state satisfies `predicate`
    pub async fn wait_for(
        &self,
        predicate: impl FnMut(&ChatState) -> bool,
    ) -> Result<ChatState, ClientError> {
        let mut state_rx = self.state_rx.clone();
        let state = state_rx
            .wait_for(predicate)
            .await
            .map_err(|_| ClientError::RuntimeStopped)?;
        Ok(state.clone())
    }
}
