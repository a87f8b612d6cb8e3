//! Last selected channel, remembered across sessions

use crate::error::Result;
use crate::types::Channel;
use crate::utils::paths::ensure_dir;
use std::path::PathBuf;
use tokio::fs;
use tracing::debug;

/// Single-value store for the channel a returning viewer lands on
pub struct LastChannel {
    path: PathBuf,
}

impl LastChannel {
    pub fn new(path: &str) -> Self {
        Self {
            path: PathBuf::from(path),
        }
    }

    /// Remembered channel, or `fallback` when none or unreadable
    pub async fn load(&self, fallback: Channel) -> Channel {
        let Ok(content) = fs::read_to_string(&self.path).await else {
            return fallback;
        };
        content.trim().parse().unwrap_or(fallback)
    }

    /// Remember `channel`. Hidden and ephemeral channels are skipped.
    pub async fn save(&self, channel: Channel) -> Result<bool> {
        if !channel.is_persistable() {
            debug!(%channel, "not remembering hidden channel");
            return Ok(false);
        }
        if let Some(parent) = self.path.parent() {
            ensure_dir(&parent.to_string_lossy()).await?;
        }
        fs::write(&self.path, channel.as_str()).await?;
        Ok(true)
    }
}
