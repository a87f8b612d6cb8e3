//! Type definitions for nmtv
//!
//! Source of truth for all data structures shared between the engine,
//! the catalog client and the CLI.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::dedup::DedupTracker;
use crate::error::NmtvError;

/// Fallback duration (seconds) for items the catalog did not measure
pub const DEFAULT_DURATION: f64 = 240.0;

// ============================================
// Catalog Types
// ============================================

/// A single playable item, as served by the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct VideoItem {
    pub id: String,
    /// Present when the catalog could split "Artist - Song"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artist: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub song: Option<String>,
    /// Present when no separator was found
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Release year, filled in lazily after playback starts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<u16>,
    /// Length in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    /// Station ident / interstitial
    #[serde(default)]
    pub is_bumper: bool,
    /// Source playlist, tagged when the item's block is merged into a queue
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub playlist_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub playlist_label: Option<String>,
    /// Display name of a user playlist, when the item came from one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub playlist_name: Option<String>,
}

impl VideoItem {
    /// Duration to use for timing math. Unknown or zero falls back to the default.
    pub fn effective_duration(&self) -> f64 {
        match self.duration {
            Some(d) if d > 0.0 => d,
            _ => DEFAULT_DURATION,
        }
    }

    /// Human label: "Artist - Song", else title, else the raw id
    pub fn display_title(&self) -> String {
        match (&self.artist, &self.song, &self.title) {
            (Some(artist), Some(song), _) => format!("{} - {}", artist, song),
            (_, _, Some(title)) => title.clone(),
            _ => self.id.clone(),
        }
    }

    /// Query string for the release-year lookup
    pub fn year_search_title(&self) -> Option<String> {
        match (&self.artist, &self.song) {
            (Some(artist), Some(song)) => Some(format!("{} {}", artist, song)),
            _ => self.title.clone().filter(|t| !t.is_empty()),
        }
    }
}

/// One catalog fetch: a labeled group of items from a single playlist
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct VideoBlock {
    pub playlist_id: String,
    pub playlist_label: String,
    pub items: Vec<VideoItem>,
}

impl VideoBlock {
    /// Flatten into queue items, tagging each with the block's playlist
    /// unless the catalog already tagged it.
    pub fn into_tagged_items(self) -> Vec<VideoItem> {
        let VideoBlock {
            playlist_id,
            playlist_label,
            items,
        } = self;

        items
            .into_iter()
            .map(|mut item| {
                if item.playlist_id.is_none() {
                    item.playlist_id = Some(playlist_id.clone());
                }
                if item.playlist_label.is_none() {
                    item.playlist_label = Some(playlist_label.clone());
                }
                item
            })
            .collect()
    }
}

/// Where a block came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockSource {
    /// Operator-curated playlists
    Curated,
    /// Playlists the viewer configured for the channel
    User,
}

/// Body of a "next block" catalog request
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchRequest {
    #[serde(skip)]
    pub channel: Channel,
    pub exclude_ids: Vec<String>,
    pub exclude_playlist_ids: Vec<String>,
    pub custom_playlist_ids: Vec<String>,
    pub prefer_custom: bool,
}

/// A user playlist entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistInfo {
    pub id: String,
    pub name: String,
}

// ============================================
// Channel Types
// ============================================

/// Logical channels. Exactly one is active at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Channel {
    #[serde(rename = "rock")]
    Rock,
    #[serde(rename = "hiphop")]
    HipHop,
    #[serde(rename = "2000s")]
    Decade2000s,
    #[default]
    #[serde(rename = "1990s")]
    Decade1990s,
    #[serde(rename = "1980s")]
    Decade1980s,
    #[serde(rename = "live")]
    Live,
    #[serde(rename = "shows")]
    Shows,
    /// Easter egg channel, unlocked per session
    #[serde(rename = "noa")]
    Noa,
    /// Ephemeral special-event channel
    #[serde(rename = "special")]
    Special,
}

impl Channel {
    /// Channels reachable by surfing up/down, in dial order
    pub const DIAL: [Channel; 7] = [
        Channel::Rock,
        Channel::HipHop,
        Channel::Decade2000s,
        Channel::Decade1990s,
        Channel::Decade1980s,
        Channel::Live,
        Channel::Shows,
    ];

    pub const ALL: [Channel; 9] = [
        Channel::Rock,
        Channel::HipHop,
        Channel::Decade2000s,
        Channel::Decade1990s,
        Channel::Decade1980s,
        Channel::Live,
        Channel::Shows,
        Channel::Noa,
        Channel::Special,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Rock => "rock",
            Channel::HipHop => "hiphop",
            Channel::Decade2000s => "2000s",
            Channel::Decade1990s => "1990s",
            Channel::Decade1980s => "1980s",
            Channel::Live => "live",
            Channel::Shows => "shows",
            Channel::Noa => "noa",
            Channel::Special => "special",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Channel::Rock => "Rock",
            Channel::HipHop => "Base",
            Channel::Decade2000s => "2000s",
            Channel::Decade1990s => "1990s",
            Channel::Decade1980s => "1980s",
            Channel::Live => "Live",
            Channel::Shows => "Shows",
            Channel::Noa => "NOA",
            Channel::Special => "Special",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            Channel::Rock => "🤘🏼",
            Channel::HipHop => "🎤",
            Channel::Decade2000s => "💿",
            Channel::Decade1990s => "📼",
            Channel::Decade1980s => "📻",
            Channel::Live => "🎬",
            Channel::Shows => "📺",
            Channel::Noa => "🐼",
            Channel::Special => "✨",
        }
    }

    /// Hidden and ephemeral channels are never remembered across sessions
    pub fn is_persistable(&self) -> bool {
        !matches!(self, Channel::Noa | Channel::Special)
    }

    /// Next channel on the dial. Off-dial channels surf back onto the dial start.
    pub fn surf(&self, up: bool) -> Channel {
        let len = Self::DIAL.len();
        match Self::DIAL.iter().position(|c| c == self) {
            Some(i) if up => Self::DIAL[(i + len - 1) % len],
            Some(i) => Self::DIAL[(i + 1) % len],
            None => Self::DIAL[0],
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Channel {
    type Err = NmtvError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == needle || c.display_name().to_lowercase() == needle)
            .ok_or_else(|| NmtvError::UnknownChannel(s.to_string()))
    }
}

// ============================================
// Channel State Types
// ============================================

/// Saved queue + pointer + dedup bookkeeping for one channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ChannelSnapshot {
    pub queue: Vec<VideoItem>,
    pub current_index: usize,
    pub dedup: DedupTracker,
    pub used_playlist_ids: HashSet<String>,
}

/// Raw timing facts recorded when leaving a channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackState {
    pub video_id: String,
    /// Seconds into the item
    pub position: f64,
    /// Unix epoch milliseconds
    pub saved_at: i64,
    pub video_index: usize,
    /// Seconds
    pub video_duration: f64,
    /// Furthest position ever reached in this item
    pub high_water_mark: f64,
}

/// Where to resume after applying elapsed time
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RestoredState {
    pub position: f64,
    pub video_index: usize,
    /// Items crossed by elapsed time
    pub video_skips: usize,
}

/// Result of a restoration attempt
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RestoreOutcome {
    Restored(RestoredState),
    /// Saved item does not match the requested one; start it fresh
    NotFound,
    /// Elapsed time consumed the whole saved queue
    Expired { video_skips: usize },
}

/// What the player knows at channel-out
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PlayerReport {
    /// Seconds into the current item
    pub position: Option<f64>,
    /// Player-measured duration of the current item
    pub duration: Option<f64>,
}

// ============================================
// Config Types
// ============================================

/// User configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Catalog backend base URL
    pub backend_url: String,
    /// Channel used when nothing was remembered
    pub default_channel: Channel,
    /// Where the first item of a freshly tuned channel starts (seconds)
    pub cold_start_offset: f64,
    /// Look up release years for music items
    pub year_lookup: bool,
    /// Consecutive load failures before an item is skipped
    pub max_load_attempts: u32,
    /// Editor command (default: "nvim")
    pub editor: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend_url: "http://localhost:3000/api".into(),
            default_channel: Channel::default(),
            cold_start_offset: 135.0,
            year_lookup: true,
            max_load_attempts: 2,
            editor: "nvim".into(),
        }
    }
}

// ============================================
// UI Types
// ============================================

/// Menu item for selector
#[derive(Debug, Clone)]
pub struct MenuItem<T> {
    /// Display text
    pub label: String,
    /// Underlying value
    pub value: T,
}

// ============================================
// State Machine Types
// ============================================

/// Surfing loop state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    /// Action menu
    Menu,
    /// Show what is on and what is next
    NowPlaying,
    /// Skip to the next item
    Next,
    /// Move along the dial
    Surf { up: bool },
    /// Pick a channel by name
    TuneTo,
    /// Drop the current item as unplayable
    ReportUnavailable,
    Exit,
}

// ============================================
// Cache Types
// ============================================

/// Cached data with TTL
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    pub data: T,
    pub timestamp: i64,
    /// Time-to-live in seconds
    pub ttl: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_roundtrip_names() {
        for channel in Channel::ALL {
            assert_eq!(channel.as_str().parse::<Channel>().unwrap(), channel);
        }
        assert_eq!("Base".parse::<Channel>().unwrap(), Channel::HipHop);
        assert!("polka".parse::<Channel>().is_err());
    }

    #[test]
    fn test_channel_serde_uses_wire_names() {
        let json = serde_json::to_string(&Channel::Decade1990s).unwrap();
        assert_eq!(json, "\"1990s\"");
        let parsed: Channel = serde_json::from_str("\"hiphop\"").unwrap();
        assert_eq!(parsed, Channel::HipHop);
    }

    #[test]
    fn test_surf_wraps_around_dial() {
        assert_eq!(Channel::Rock.surf(true), Channel::Shows);
        assert_eq!(Channel::Shows.surf(false), Channel::Rock);
        assert_eq!(Channel::Decade1990s.surf(false), Channel::Decade1980s);
        assert_eq!(Channel::Noa.surf(false), Channel::Rock);
    }

    #[test]
    fn test_hidden_channels_not_persistable() {
        assert!(!Channel::Noa.is_persistable());
        assert!(!Channel::Special.is_persistable());
        assert!(Channel::Live.is_persistable());
    }

    #[test]
    fn test_effective_duration_falls_back() {
        let mut item = VideoItem {
            id: "a".into(),
            ..Default::default()
        };
        assert_eq!(item.effective_duration(), DEFAULT_DURATION);
        item.duration = Some(0.0);
        assert_eq!(item.effective_duration(), DEFAULT_DURATION);
        item.duration = Some(181.5);
        assert_eq!(item.effective_duration(), 181.5);
    }

    #[test]
    fn test_year_search_title_prefers_artist_song() {
        let item = VideoItem {
            id: "x".into(),
            artist: Some("Nirvana".into()),
            song: Some("Lithium".into()),
            title: Some("Nirvana - Lithium (Official Video)".into()),
            ..Default::default()
        };
        assert_eq!(item.year_search_title().as_deref(), Some("Nirvana Lithium"));

        let bare = VideoItem {
            id: "y".into(),
            ..Default::default()
        };
        assert_eq!(bare.year_search_title(), None);
        assert_eq!(bare.display_title(), "y");
    }

    #[test]
    fn test_block_tags_untagged_items_only() {
        let block = VideoBlock {
            playlist_id: "PL1".into(),
            playlist_label: "Top Rock".into(),
            items: vec![
                VideoItem {
                    id: "a".into(),
                    ..Default::default()
                },
                VideoItem {
                    id: "b".into(),
                    playlist_id: Some("PL2".into()),
                    ..Default::default()
                },
            ],
        };
        let items = block.into_tagged_items();
        assert_eq!(items[0].playlist_id.as_deref(), Some("PL1"));
        assert_eq!(items[0].playlist_label.as_deref(), Some("Top Rock"));
        assert_eq!(items[1].playlist_id.as_deref(), Some("PL2"));
    }

    #[test]
    fn test_item_deserializes_camel_case() {
        let item: VideoItem =
            serde_json::from_str(r#"{"id":"b1","title":"Ident","isBumper":true,"duration":8}"#)
                .unwrap();
        assert!(item.is_bumper);
        assert_eq!(item.duration, Some(8.0));
    }
}
