//! Chat runtime executor

use super::traits::{ChatTransport, SettingsTransport};
use super::{ChatHandle, NOTICE_CAPACITY};

use crate::state_machine::{transition, ChatState, Effect, Event, Notice};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, watch};

/// Generic chat runtime that can work with any transport implementations
pub struct ChatRuntime<T, S>
where
    T: ChatTransport + 'static,
    S: SettingsTransport + 'static,
{
    state: ChatState,
    chat: Arc<T>,
    settings: Arc<S>,
    event_rx: mpsc::Receiver<Event>,
    /// Weak so the loop ends once every handle and pending request is gone
    event_tx: mpsc::WeakSender<Event>,
    state_tx: watch::Sender<ChatState>,
    notice_tx: broadcast::Sender<Notice>,
}

impl<T, S> ChatRuntime<T, S>
where
    T: ChatTransport + 'static,
    S: SettingsTransport + 'static,
{
    pub fn new(state: ChatState, chat: T, settings: S, buffer: usize) -> (Self, ChatHandle) {
        let (event_tx, event_rx) = mpsc::channel(buffer.max(1));
        let (state_tx, state_rx) = watch::channel(state.clone());
        let (notice_tx, _) = broadcast::channel(NOTICE_CAPACITY);

        let runtime = Self {
            state,
            chat: Arc::new(chat),
            settings: Arc::new(settings),
            event_rx,
            event_tx: event_tx.downgrade(),
            state_tx,
            notice_tx: notice_tx.clone(),
        };
        let handle = ChatHandle {
            event_tx,
            state_rx,
            notice_tx,
        };
        (runtime, handle)
    }

    pub async fn run(mut self) {
        tracing::info!("Starting chat runtime");

        // Process events in order; one transition at a time
        while let Some(event) = self.event_rx.recv().await {
            self.handle_event(event);
        }

        tracing::info!("Chat runtime stopped");
    }

    fn handle_event(&mut self, event: Event) {
        let name = event.name();
        let effects = transition(&mut self.state, event);
        tracing::debug!(event = name, effects = effects.len(), "Applied event");

        self.state_tx.send_replace(self.state.clone());

        for effect in effects {
            self.execute_effect(effect);
        }
    }

    fn execute_effect(&self, effect: Effect) {
        match effect {
            Effect::ListConversations => {
                let chat = Arc::clone(&self.chat);
                self.spawn_request(async move {
                    match chat.list_conversations().await {
                        Ok(conversations) => Event::ConversationsLoaded { conversations },
                        Err(error) => Event::ConversationsFailed { error },
                    }
                });
            }

            Effect::FetchMessages { conversation_id } => {
                let chat = Arc::clone(&self.chat);
                self.spawn_request(async move {
                    match chat.fetch_messages(&conversation_id).await {
                        Ok(messages) => Event::MessagesLoaded {
                            conversation_id,
                            messages,
                        },
                        Err(error) => Event::MessagesFailed {
                            conversation_id,
                            error,
                        },
                    }
                });
            }

            Effect::SendMessage { request } => {
                let chat = Arc::clone(&self.chat);
                self.spawn_request(async move {
                    tracing::info!(
                        request_id = request.request_id,
                        conv_id = %request.origin,
                        "Sending message (background)"
                    );
                    let outcome = chat
                        .send_message(&request.text, request.server_conversation_id())
                        .await;
                    match outcome {
                        Ok(reply) => Event::MessageSent {
                            request,
                            reply,
                            assistant_message_id: uuid::Uuid::new_v4().to_string(),
                        },
                        Err(error) => Event::MessageFailed { request, error },
                    }
                });
            }

            Effect::DeleteConversation { conversation_id } => {
                let chat = Arc::clone(&self.chat);
                self.spawn_request(async move {
                    match chat.delete_conversation(&conversation_id).await {
                        Ok(()) => Event::ConversationDeleted { conversation_id },
                        Err(error) => Event::DeleteFailed {
                            conversation_id,
                            error,
                        },
                    }
                });
            }

            Effect::FetchSettings => {
                let settings = Arc::clone(&self.settings);
                self.spawn_request(async move {
                    match settings.get_settings().await {
                        Ok(settings) => Event::SettingsLoaded { settings },
                        Err(error) => Event::SettingsFailed { error },
                    }
                });
            }

            Effect::UpdateSettings { patch } => {
                let settings = Arc::clone(&self.settings);
                self.spawn_request(async move {
                    match settings.update_settings(&patch).await {
                        Ok(settings) => Event::SettingsUpdated { settings },
                        Err(error) => Event::SettingsUpdateFailed { error },
                    }
                });
            }

            Effect::Notify(notice) => self.notify(notice),
        }
    }

    /// Run a transport call in the background and feed its outcome back
    fn spawn_request<F>(&self, request: F)
    where
        F: Future<Output = Event> + Send + 'static,
    {
        let Some(event_tx) = self.event_tx.upgrade() else {
            tracing::warn!("Runtime shutting down, request dropped");
            return;
        };
        tokio::spawn(async move {
            let event = request.await;
            if event_tx.send(event).await.is_err() {
                tracing::debug!("Runtime gone before request settled");
            }
        });
    }

    fn notify(&self, notice: Notice) {
        match &notice {
            Notice::RequestFailed { kind, message } => {
                tracing::warn!(kind = ?kind, error = %message, "Request failed");
            }
            Notice::RestoreInput { .. } => {
                tracing::debug!("Returning failed message to input");
            }
            Notice::ConversationRecreated { id } => {
                tracing::warn!(conv_id = %id, "Reply arrived for a removed conversation, recreated it");
            }
        }
        // No subscribers is fine
        let _ = self.notice_tx.send(notice);
    }
}
