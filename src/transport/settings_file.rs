//! Settings persisted as a JSON file

use crate::error::TransportError;
use crate::runtime::SettingsTransport;
use crate::state_machine::state::{Settings, SettingsPatch};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;

pub struct FileSettingsTransport {
    path: PathBuf,
    /// Used while the file is missing or unreadable
    defaults: Settings,
    /// Serializes read-modify-write cycles
    io_lock: Mutex<()>,
}

impl FileSettingsTransport {
    pub fn new(path: impl Into<PathBuf>, defaults: Settings) -> Self {
        Self {
            path: path.into(),
            defaults,
            io_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<Settings, TransportError> {
        let contents = match fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(self.defaults.clone()),
            Err(e) => {
                return Err(TransportError::server(format!(
                    "Failed to read settings: {e}"
                )))
            }
        };

        match serde_json::from_str(&contents) {
            Ok(settings) => Ok(settings),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Ignoring unreadable settings file");
                Ok(self.defaults.clone())
            }
        }
    }

    async fn store(&self, settings: &Settings) -> Result<(), TransportError> {
        let serialized = serde_json::to_string_pretty(settings)
            .map_err(|e| TransportError::unknown(format!("Failed to encode settings: {e}")))?;
        let write_failed = |e: std::io::Error| TransportError::server(format!("Failed to write settings: {e}"));

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await.map_err(write_failed)?;
        }

        // Write then rename so a crash never leaves half a file behind
        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, serialized).await.map_err(write_failed)?;
        fs::rename(&tmp_path, &self.path).await.map_err(write_failed)?;
        Ok(())
    }
}

#[async_trait]
impl SettingsTransport for FileSettingsTransport {
    async fn get_settings(&self) -> Result<Settings, TransportError> {
        let _guard = self.io_lock.lock().await;
        self.load().await
    }

    async fn update_settings(&self, patch: &SettingsPatch) -> Result<Settings, TransportError> {
        let _guard = self.io_lock.lock().await;
        let mut settings = self.load().await?;
        settings.merge(patch);
        self.store(&settings).await?;
        tracing::info!(model = %settings.model, theme = ?settings.theme, "Settings saved");
        Ok(settings)
    }
}
