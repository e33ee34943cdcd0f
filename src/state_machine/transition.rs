//! Pure state transition function
//!
//! Given the current state and one event, mutate the state and return the
//! effects the runtime must carry out. No I/O happens here: ids and clocks
//! arrive inside events, so the same inputs always give the same outputs.

use super::effect::Notice;
use super::state::{
    ChatMessage, ChatState, ConversationId, InFlightSend, RequestKind, RequestState, SettingsPatch,
};
use super::store::Reconciled;
use super::{Effect, Event};
use crate::error::TransportError;

/// Apply one event to the state
#[allow(clippy::too_many_lines)]
pub fn transition(state: &mut ChatState, event: Event) -> Vec<Effect> {
    match event {
        // ============================================================
        // Sending (optimistic insert, reconcile, rollback)
        // ============================================================
        Event::SubmitMessage {
            text,
            message_id,
            at,
        } => {
            if text.trim().is_empty() {
                return vec![];
            }

            let target = state.store.active_id().cloned();
            let inserted = state.store.insert_provisional_user_message(
                target.as_ref(),
                ChatMessage::user(message_id, text.clone(), at),
            );
            // A confirmed but unloaded active id still gets the send; the
            // reply will create the conversation locally.
            let Some(origin) = inserted.or(target) else {
                return vec![];
            };

            state.requests.begin(RequestKind::SendMessage);
            let request_id = state.next_request_id();
            vec![Effect::SendMessage {
                request: InFlightSend {
                    request_id,
                    origin,
                    text,
                },
            }]
        }

        Event::MessageSent {
            request,
            reply,
            assistant_message_id,
        } => {
            state.requests.finish(RequestKind::SendMessage);
            let (id, outcome) =
                state
                    .store
                    .reconcile_sent_message(&reply, Some(&request.origin), assistant_message_id);
            if outcome == Reconciled::Created {
                vec![Effect::Notify(Notice::ConversationRecreated { id })]
            } else {
                vec![]
            }
        }

        Event::MessageFailed { request, error } => {
            let failed = reject(&mut state.requests, RequestKind::SendMessage, &error);
            state
                .store
                .remove_last_matching_user_message(&request.origin, &request.text);
            vec![Effect::restore_input(request.text), failed]
        }

        // ============================================================
        // Local navigation
        // ============================================================
        Event::SelectConversation { id } => {
            state.store.set_active(id);
            vec![]
        }

        Event::NewChat => {
            state.store.set_active(None);
            state.requests.clear_error();
            vec![]
        }

        Event::ClearError => {
            state.requests.clear_error();
            state.settings_requests.clear_error();
            vec![]
        }

        Event::RenameConversation { id, title } => {
            state.store.rename(&id, title);
            vec![]
        }

        // ============================================================
        // Conversation list
        // ============================================================
        Event::RefreshConversations => {
            state.requests.begin(RequestKind::ListConversations);
            vec![Effect::ListConversations]
        }

        Event::ConversationsLoaded { conversations } => {
            state.requests.finish(RequestKind::ListConversations);
            state.store.upsert_conversations(conversations);
            vec![]
        }

        Event::ConversationsFailed { error } => {
            vec![reject(&mut state.requests, RequestKind::ListConversations, &error)]
        }

        // ============================================================
        // Message history
        // ============================================================
        Event::LoadMessages { id } => match id {
            // Drafts exist only locally; there is nothing to fetch
            ConversationId::Temporary(_) => vec![],
            ConversationId::Confirmed(conversation_id) => {
                state.requests.begin(RequestKind::FetchMessages);
                vec![Effect::FetchMessages { conversation_id }]
            }
        },

        Event::MessagesLoaded {
            conversation_id,
            messages,
        } => {
            state.requests.finish(RequestKind::FetchMessages);
            state
                .store
                .replace_messages(&ConversationId::Confirmed(conversation_id), messages);
            vec![]
        }

        Event::MessagesFailed { error, .. } => {
            vec![reject(&mut state.requests, RequestKind::FetchMessages, &error)]
        }

        // ============================================================
        // Deletion
        // ============================================================
        Event::DeleteConversation { id } => match id {
            ConversationId::Temporary(_) => {
                state.store.remove_conversation(&id);
                vec![]
            }
            ConversationId::Confirmed(conversation_id) => {
                state.requests.begin(RequestKind::DeleteConversation);
                vec![Effect::DeleteConversation { conversation_id }]
            }
        },

        Event::ConversationDeleted { conversation_id } => {
            state.requests.finish(RequestKind::DeleteConversation);
            state
                .store
                .remove_conversation(&ConversationId::Confirmed(conversation_id));
            vec![]
        }

        Event::DeleteFailed { error, .. } => {
            vec![reject(&mut state.requests, RequestKind::DeleteConversation, &error)]
        }

        // ============================================================
        // Settings
        // ============================================================
        Event::LoadSettings => {
            state.settings_requests.begin(RequestKind::FetchSettings);
            vec![Effect::FetchSettings]
        }

        Event::SettingsLoaded { settings } => {
            state.settings_requests.finish(RequestKind::FetchSettings);
            state.settings = settings;
            vec![]
        }

        Event::SettingsFailed { error } => {
            vec![reject(&mut state.settings_requests, RequestKind::FetchSettings, &error)]
        }

        Event::ChangeModel { model } => {
            state.settings.model.clone_from(&model);
            state.settings_requests.begin(RequestKind::UpdateSettings);
            vec![Effect::UpdateSettings {
                patch: SettingsPatch::model(model),
            }]
        }

        Event::UpdateSettings { patch } => {
            state.settings_requests.begin(RequestKind::UpdateSettings);
            vec![Effect::UpdateSettings { patch }]
        }

        Event::SettingsUpdated { settings } => {
            state.settings_requests.finish(RequestKind::UpdateSettings);
            state.settings = settings;
            vec![]
        }

        Event::SettingsUpdateFailed { error } => {
            vec![reject(&mut state.settings_requests, RequestKind::UpdateSettings, &error)]
        }
    }
}

/// Settle a rejected request and describe it for the UI
fn reject(requests: &mut RequestState, kind: RequestKind, error: &TransportError) -> Effect {
    requests.fail(kind, &error.message);
    let message = requests
        .last_error()
        .map_or_else(|| kind.default_failure().to_string(), |e| e.message.clone());
    Effect::request_failed(kind, message)
}
