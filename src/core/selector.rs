//! Block selection: which playlist pool to prefer for the next fetch
//!
//! Channels with user playlists alternate strictly between the user pool
//! and the curated pool, starting with the user pool. The alternation is
//! driven by where blocks actually came from, not by what was asked for.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::core::dedup::DedupTracker;
use crate::types::{BlockSource, Channel, FetchRequest};

/// Used-playlist memory is dropped once it grows past this
pub const MAX_USED_PLAYLISTS: usize = 10;

/// Per-channel "last block source" memory. Lives for the whole session.
#[derive(Debug, Clone, Default)]
pub struct BlockSelector {
    last_source: HashMap<Channel, BlockSource>,
}

impl BlockSelector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the next block for `channel` should come from the user pool
    pub fn prefer_custom(&self, channel: Channel, user_playlist_ids: &[String]) -> bool {
        if user_playlist_ids.is_empty() {
            return false;
        }
        match self.last_source.get(&channel) {
            None | Some(BlockSource::Curated) => true,
            Some(BlockSource::User) => false,
        }
    }

    pub fn last_source(&self, channel: Channel) -> Option<BlockSource> {
        self.last_source.get(&channel).copied()
    }

    /// Assemble the catalog request for the next block
    pub fn build_request(
        &self,
        channel: Channel,
        dedup: &DedupTracker,
        used_playlist_ids: &HashSet<String>,
        user_playlist_ids: Vec<String>,
    ) -> FetchRequest {
        let prefer_custom = self.prefer_custom(channel, &user_playlist_ids);
        let mut exclude_playlist_ids: Vec<String> = used_playlist_ids.iter().cloned().collect();
        exclude_playlist_ids.sort();

        debug!(
            %channel,
            prefer_custom,
            exclude_items = dedup.len(),
            exclude_playlists = exclude_playlist_ids.len(),
            "building block request"
        );

        FetchRequest {
            channel,
            exclude_ids: dedup.as_exclude_list(),
            exclude_playlist_ids,
            custom_playlist_ids: user_playlist_ids,
            prefer_custom,
        }
    }

    /// Record a returned block. Updates the used-playlist set and the
    /// channel's last source from the block's real origin.
    pub fn record_block(
        &mut self,
        channel: Channel,
        playlist_id: &str,
        user_playlist_ids: &[String],
        used_playlist_ids: &mut HashSet<String>,
    ) -> BlockSource {
        used_playlist_ids.insert(playlist_id.to_string());
        if used_playlist_ids.len() > MAX_USED_PLAYLISTS {
            debug!(%channel, "used playlist memory full, allowing repeats");
            used_playlist_ids.clear();
        }

        let source = if user_playlist_ids.iter().any(|id| id == playlist_id) {
            BlockSource::User
        } else {
            BlockSource::Curated
        };
        self.last_source.insert(channel, source);
        source
    }
}
