//! User playlists per channel (read side)
//!
//! Stored as `{ "<channel>": [{ "id": ..., "name": ... }] }`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use tokio::fs;
use tracing::warn;

use crate::error::Result;
use crate::types::{Channel, PlaylistInfo};

/// Most playlists a viewer may attach to one channel
pub const MAX_PLAYLISTS_PER_CHANNEL: usize = 5;

static PLAYLIST_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]{13,}$").expect("Invalid regex"));

/// Whether `id` looks like a hosted playlist id
pub fn is_valid_playlist_id(id: &str) -> bool {
    PLAYLIST_ID.is_match(id)
}

/// What the engine needs to know about user playlists
pub trait UserPlaylists: Send + Sync {
    /// Ids configured for `channel`, in the order the viewer added them
    fn playlist_ids(&self, channel: Channel) -> Vec<String>;

    /// Display name for a playlist id on any channel
    fn playlist_name(&self, playlist_id: &str) -> Option<String>;
}

#[derive(Debug, Clone, Default)]
pub struct PlaylistStore {
    playlists: HashMap<Channel, Vec<PlaylistInfo>>,
}

impl PlaylistStore {
    /// Load from file. A missing or unreadable file means no playlists.
    pub async fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).await?;
        match serde_json::from_str::<HashMap<String, Vec<PlaylistInfo>>>(&content) {
            Ok(raw) => Ok(Self::from_raw(raw)),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "ignoring malformed playlist file");
                Ok(Self::default())
            }
        }
    }

    /// Build from the on-disk shape, dropping unknown channels, bad ids and overflow
    pub fn from_raw(raw: HashMap<String, Vec<PlaylistInfo>>) -> Self {
        let mut playlists = HashMap::new();
        for (key, entries) in raw {
            let Ok(channel) = key.parse::<Channel>() else {
                warn!(channel = %key, "playlist entry for unknown channel");
                continue;
            };
            let valid: Vec<PlaylistInfo> = entries
                .into_iter()
                .filter(|p| is_valid_playlist_id(&p.id))
                .take(MAX_PLAYLISTS_PER_CHANNEL)
                .collect();
            if !valid.is_empty() {
                playlists.insert(channel, valid);
            }
        }
        Self { playlists }
    }

    /// Attach a playlist in memory. Duplicates and overflow are refused.
    pub fn insert(&mut self, channel: Channel, playlist: PlaylistInfo) -> bool {
        let entries = self.playlists.entry(channel).or_default();
        if entries.len() >= MAX_PLAYLISTS_PER_CHANNEL || entries.iter().any(|p| p.id == playlist.id) {
            return false;
        }
        entries.push(playlist);
        true
    }

    pub fn for_channel(&self, channel: Channel) -> &[PlaylistInfo] {
        self.playlists
            .get(&channel)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

impl UserPlaylists for PlaylistStore {
    fn playlist_ids(&self, channel: Channel) -> Vec<String> {
        self.for_channel(channel).iter().map(|p| p.id.clone()).collect()
    }

    fn playlist_name(&self, playlist_id: &str) -> Option<String> {
        self.playlists
            .values()
            .flatten()
            .find(|p| p.id == playlist_id)
            .map(|p| p.name.clone())
    }
}

/// Default playlist file location
pub fn playlists_path(config_dir: &str) -> PathBuf {
    PathBuf::from(config_dir).join("custom_playlists.json")
}
