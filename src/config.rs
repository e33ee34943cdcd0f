//! Environment-driven client configuration

use crate::error::ClientError;
use crate::state_machine::state::{Settings, Theme, DEFAULT_MODEL};
use std::path::PathBuf;

pub const DEFAULT_EVENT_BUFFER: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// JSON file holding user settings
    pub settings_path: PathBuf,
    /// Settings used until the file says otherwise
    pub default_settings: Settings,
    /// Capacity of the runtime's event channel
    pub event_buffer: usize,
}

impl ClientConfig {
    pub fn from_env() -> Result<Self, ClientError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset and empty values take defaults
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ClientError> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let settings_path = var("LOKI_SETTINGS_PATH").map_or_else(
            || {
                let home = var("HOME").unwrap_or_else(|| "/tmp".to_string());
                PathBuf::from(format!("{home}/.loki-chat/settings.json"))
            },
            PathBuf::from,
        );

        let theme = match var("LOKI_DEFAULT_THEME") {
            Some(raw) => Theme::parse(&raw).ok_or(ClientError::Config {
                key: "LOKI_DEFAULT_THEME",
                reason: format!("expected light, dark or system, got {raw:?}"),
            })?,
            None => Theme::default(),
        };

        let event_buffer = match var("LOKI_EVENT_BUFFER") {
            Some(raw) => match raw.trim().parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(ClientError::Config {
                        key: "LOKI_EVENT_BUFFER",
                        reason: format!("expected a positive number, got {raw:?}"),
                    })
                }
            },
            None => DEFAULT_EVENT_BUFFER,
        };

        Ok(Self {
            settings_path,
            default_settings: Settings {
                model: var("LOKI_DEFAULT_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
                theme,
            },
            event_buffer,
        })
    }
}
