//! Loki Chat - terminal client
//!
//! Line-oriented chat over the in-process backend. Lines starting with `/`
//! are commands; anything else is sent as a message.

use chrono::Utc;
use loki_chat::config::ClientConfig;
use loki_chat::error::ClientError;
use loki_chat::runtime::{self, ChatHandle};
use loki_chat::state_machine::state::{ConversationId, MessageRole, SettingsPatch, Theme};
use loki_chat::state_machine::{selectors, ChatState, ConversationStore, Event, Notice};
use loki_chat::timestamp;
use loki_chat::transport::{EchoResponder, FileSettingsTransport, InMemoryTransport};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const HELP: &str = "\
Commands:
  /list            list conversations
  /new             start a new conversation
  /open <id>       switch to a conversation
  /delete <id>     delete a conversation
  /model <name>    change the model
  /theme <name>    light, dark or system
  /quit            exit
Anything else is sent as a message.";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging; stdout belongs to the conversation
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "loki_chat=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false)
                .with_writer(std::io::stderr),
        )
        .init();

    // Configuration
    let config = ClientConfig::from_env()?;
    tracing::info!(path = %config.settings_path.display(), "Using settings file");

    let handle = runtime::spawn(
        ChatState::new(ConversationStore::default(), config.default_settings.clone()),
        InMemoryTransport::new(EchoResponder),
        FileSettingsTransport::new(&config.settings_path, config.default_settings.clone()),
        config.event_buffer,
    );

    spawn_notice_printer(&handle);

    let state = handle
        .dispatch_until(Event::LoadSettings, |s| !selectors::settings_loading(s))
        .await?;
    println!(
        "Loki Chat (model {}, theme {:?}). Type /help for commands.",
        selectors::current_model(&state),
        selectors::current_theme(&state)
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if !run_line(&handle, line).await? {
            break;
        }
    }

    tracing::info!("Exiting");
    Ok(())
}

/// Handle one input line; `false` means quit
async fn run_line(handle: &ChatHandle, line: &str) -> Result<bool, ClientError> {
    let (command, arg) = match line.split_once(char::is_whitespace) {
        Some((command, arg)) => (command, arg.trim()),
        None => (line, ""),
    };

    match command {
        "/quit" | "/exit" => return Ok(false),
        "/help" => println!("{HELP}"),
        "/list" => {
            let state = handle
                .dispatch_until(Event::RefreshConversations, |s| !selectors::is_loading(s))
                .await?;
            print_conversations(&state);
        }
        "/new" => {
            handle.dispatch(Event::NewChat).await?;
            println!("Started a new conversation.");
        }
        "/open" if !arg.is_empty() => {
            let id = ConversationId::parse(arg);
            let selected = handle
                .dispatch_until(Event::select(id.clone()), |_| true)
                .await?;
            let state = if id.is_temporary() {
                selected
            } else {
                handle
                    .dispatch_until(Event::LoadMessages { id }, |s| !selectors::is_loading(s))
                    .await?
            };
            print_history(&state);
        }
        "/delete" if !arg.is_empty() => {
            let id = ConversationId::parse(arg);
            let settled = if id.is_temporary() {
                // Drafts are removed locally in one step
                handle
                    .dispatch_until(Event::DeleteConversation { id }, |_| true)
                    .await?
            } else {
                handle
                    .dispatch_until(Event::DeleteConversation { id }, |s| !selectors::is_deleting(s))
                    .await?
            };
            if selectors::last_error(&settled).is_none() {
                println!("Deleted.");
            }
        }
        "/model" if !arg.is_empty() => {
            handle
                .dispatch(Event::ChangeModel {
                    model: arg.to_string(),
                })
                .await?;
            println!("Model set to {arg}.");
        }
        "/theme" => match Theme::parse(arg) {
            Some(theme) => {
                handle
                    .dispatch(Event::UpdateSettings {
                        patch: SettingsPatch::theme(theme),
                    })
                    .await?;
                println!("Theme set to {theme:?}.");
            }
            None => println!("Usage: /theme light|dark|system"),
        },
        _ if command.starts_with('/') => println!("Unknown command. {HELP}"),
        _ => {
            // Failures are reported by the notice printer
            let state = handle
                .dispatch_until(Event::submit(line), |s| !selectors::is_typing(s))
                .await?;
            if let Some(reply) = selectors::active_conversation(&state)
                .and_then(|c| c.last_message())
                .filter(|m| m.role == MessageRole::Assistant)
            {
                println!("assistant> {}", reply.content);
            }
        }
    }
    Ok(true)
}

fn print_conversations(state: &ChatState) {
    let conversations = selectors::conversations(state);
    if conversations.is_empty() {
        println!("No conversations yet.");
        return;
    }
    let today = Utc::now().date_naive();
    let active = selectors::active_conversation_id(state);
    for conversation in conversations {
        let marker = if Some(&conversation.id) == active { '*' } else { ' ' };
        println!(
            "{marker} {}  {}  ({})",
            conversation.id,
            conversation.title,
            timestamp::day_label(&conversation.updated_at, today)
        );
    }
}

fn print_history(state: &ChatState) {
    match selectors::active_conversation(state) {
        Some(conversation) => {
            println!("== {} ==", conversation.title);
            for message in &conversation.messages {
                let who = match message.role {
                    MessageRole::User => "you",
                    MessageRole::Assistant => "assistant",
                };
                println!("{who}> {}", message.content);
            }
        }
        None => println!("No such conversation."),
    }
}

fn spawn_notice_printer(handle: &ChatHandle) {
    let mut notices = handle.subscribe();
    tokio::spawn(async move {
        loop {
            match notices.recv().await {
                Ok(Notice::RequestFailed { message, .. }) => println!("! {message}"),
                Ok(Notice::RestoreInput { text }) => println!("(not sent: {text})"),
                Ok(Notice::ConversationRecreated { id }) => {
                    println!("(conversation {id} was restored by a late reply)");
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Notice printer fell behind");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });
}
