//! Playback queue for the active channel
//!
//! An ever-growing list of items plus a pointer to the one on screen.
//! Blocks are pulled from the catalog as the pointer nears the end, and
//! stale items behind the pointer are dropped to bound memory.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::core::catalog::CatalogGateway;
use crate::core::dedup::DedupTracker;
use crate::core::selector::BlockSelector;
use crate::error::{NmtvError, Result};
use crate::storage::playlists::UserPlaylists;
use crate::types::{Channel, ChannelSnapshot, FetchRequest, VideoBlock, VideoItem};

/// Refill once this many items or fewer remain ahead of the pointer
pub const REFILL_THRESHOLD: usize = 6;

/// Items kept behind the pointer when pruning
pub const KEEP_BEHIND: usize = 5;

pub struct PlaybackQueue {
    gateway: Arc<dyn CatalogGateway>,
    playlists: Arc<dyn UserPlaylists>,
    selector: BlockSelector,
    channel: Channel,
    items: Vec<VideoItem>,
    current_index: usize,
    dedup: DedupTracker,
    used_playlist_ids: HashSet<String>,
}

impl PlaybackQueue {
    pub fn new(
        gateway: Arc<dyn CatalogGateway>,
        playlists: Arc<dyn UserPlaylists>,
        channel: Channel,
    ) -> Self {
        Self {
            gateway,
            playlists,
            selector: BlockSelector::new(),
            channel,
            items: Vec::new(),
            current_index: 0,
            dedup: DedupTracker::new(),
            used_playlist_ids: HashSet::new(),
        }
    }

    pub fn gateway(&self) -> Arc<dyn CatalogGateway> {
        Arc::clone(&self.gateway)
    }

    pub fn channel(&self) -> Channel {
        self.channel
    }

    pub fn current(&self) -> Option<&VideoItem> {
        self.items.get(self.current_index)
    }

    pub fn upcoming(&self) -> Option<&VideoItem> {
        self.items.get(self.current_index + 1)
    }

    pub fn items(&self) -> &[VideoItem] {
        &self.items
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    /// Items from the pointer to the end, the current one included
    pub fn remaining(&self) -> usize {
        self.items.len().saturating_sub(self.current_index)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn dedup(&self) -> &DedupTracker {
        &self.dedup
    }

    pub fn used_playlist_ids(&self) -> &HashSet<String> {
        &self.used_playlist_ids
    }

    pub fn selector(&self) -> &BlockSelector {
        &self.selector
    }

    /// Point at `channel` with empty transient state.
    /// Block-source memory is session-long and survives.
    pub fn reset(&mut self, channel: Channel) {
        self.reseed(channel, DedupTracker::new(), HashSet::new());
    }

    /// Like [`reset`](Self::reset) but carrying over dedup bookkeeping
    pub fn reseed(
        &mut self,
        channel: Channel,
        dedup: DedupTracker,
        used_playlist_ids: HashSet<String>,
    ) {
        self.channel = channel;
        self.items.clear();
        self.current_index = 0;
        self.dedup = dedup;
        self.used_playlist_ids = used_playlist_ids;
    }

    /// Make a saved snapshot the live queue, pointing at `index`
    pub fn reinstate(&mut self, channel: Channel, snapshot: ChannelSnapshot, index: usize) {
        self.channel = channel;
        self.items = snapshot.queue;
        self.current_index = index.min(self.items.len());
        self.dedup = snapshot.dedup;
        self.used_playlist_ids = snapshot.used_playlist_ids;
    }

    /// Copy of the live state, for saving on channel-out
    pub fn snapshot(&self) -> ChannelSnapshot {
        ChannelSnapshot {
            queue: self.items.clone(),
            current_index: self.current_index,
            dedup: self.dedup.clone(),
            used_playlist_ids: self.used_playlist_ids.clone(),
        }
    }

    /// Request for the next block of the active channel
    pub fn prepare_fetch(&self) -> FetchRequest {
        let user_ids = self.playlists.playlist_ids(self.channel);
        self.selector
            .build_request(self.channel, &self.dedup, &self.used_playlist_ids, user_ids)
    }

    /// Append a fetched block. Returns false, touching nothing, when the
    /// request was issued for a channel that is no longer active.
    pub fn apply_block(&mut self, request: &FetchRequest, block: VideoBlock) -> bool {
        if request.channel != self.channel {
            warn!(
                requested = %request.channel,
                active = %self.channel,
                "discarding block for inactive channel"
            );
            return false;
        }

        let source = self.selector.record_block(
            self.channel,
            &block.playlist_id,
            &request.custom_playlist_ids,
            &mut self.used_playlist_ids,
        );
        let label = block.playlist_label.clone();

        let mut added = 0;
        for mut item in block.into_tagged_items() {
            if let Some(name) = item
                .playlist_id
                .as_deref()
                .and_then(|id| self.playlists.playlist_name(id))
            {
                item.playlist_name = Some(name);
            }
            self.dedup.record(&item.id);
            self.items.push(item);
            added += 1;
        }

        info!(channel = %self.channel, ?source, playlist = %label, added, "appended block");
        true
    }

    /// Fetch one block and append it. `Ok(false)` means it was discarded.
    pub async fn fetch_block(&mut self) -> Result<bool> {
        let request = self.prepare_fetch();
        let block = self.gateway.fetch_block(&request).await?;
        Ok(self.apply_block(&request, block))
    }

    /// Fetch into an empty queue; an empty result is an error
    pub async fn fill(&mut self) -> Result<()> {
        self.fetch_block().await?;
        if self.items.is_empty() {
            return Err(NmtvError::EmptyBlock(self.channel));
        }
        Ok(())
    }

    /// Start `channel` from scratch with one block
    pub async fn initialize(&mut self, channel: Channel) -> Result<()> {
        info!(%channel, "initializing queue");
        self.reset(channel);
        self.fill().await
    }

    /// Move to the next item, refilling when close to the end.
    ///
    /// A failed refill is logged and retried on the next advance.
    pub async fn advance(&mut self) -> Option<&VideoItem> {
        if self.current_index < self.items.len() {
            self.current_index += 1;
        }
        self.prune();

        if self.remaining() <= REFILL_THRESHOLD {
            debug!(remaining = self.remaining(), "queue running low");
            if let Err(e) = self.fetch_block().await {
                warn!(channel = %self.channel, error = %e, "refill failed");
            }
        }
        self.current()
    }

    /// Drop items more than `KEEP_BEHIND` behind the pointer
    fn prune(&mut self) {
        if self.current_index > KEEP_BEHIND {
            let stale = self.current_index - KEEP_BEHIND;
            self.items.drain(..stale);
            self.current_index -= stale;
        }
    }

    /// Remove every copy of `id`. The pointer keeps following the item that
    /// was current, or its successor if the current item itself went away.
    pub fn remove_unavailable(&mut self, id: &str) -> bool {
        let before = self.items.len();
        let shifted = self.items[..self.current_index.min(before)]
            .iter()
            .filter(|item| item.id == id)
            .count();

        self.items.retain(|item| item.id != id);
        self.current_index -= shifted;
        self.dedup.record(id);

        let removed = before != self.items.len();
        if removed {
            info!(video = %id, index = self.current_index, len = self.items.len(), "removed unavailable item");
        }
        removed
    }

    /// Fill in a release year. No-op when the item is gone.
    pub fn set_year(&mut self, id: &str, year: u16) -> bool {
        match self.items.iter_mut().find(|item| item.id == id) {
            Some(item) => {
                item.year = Some(year);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::catalog::MemoryCatalog;
    use crate::storage::playlists::PlaylistStore;
    use crate::types::PlaylistInfo;

    fn block(playlist: &str, prefix: &str, n: usize) -> VideoBlock {
        VideoBlock {
            playlist_id: playlist.into(),
            playlist_label: format!("{} label", playlist),
            items: (0..n)
                .map(|i| VideoItem {
                    id: format!("{}{}", prefix, i),
                    duration: Some(200.0),
                    ..Default::default()
                })
                .collect(),
        }
    }

    fn queue_with(catalog: MemoryCatalog, playlists: PlaylistStore) -> (PlaybackQueue, Arc<MemoryCatalog>) {
        let catalog = Arc::new(catalog);
        let queue = PlaybackQueue::new(catalog.clone(), Arc::new(playlists), Channel::Rock);
        (queue, catalog)
    }

    fn rock_catalog() -> MemoryCatalog {
        MemoryCatalog::new()
            .with_curated(Channel::Rock, block("r1", "a", 10))
            .with_curated(Channel::Rock, block("r2", "b", 10))
            .with_curated(Channel::Live, block("l1", "l", 10))
    }

    #[tokio::test]
    async fn test_initialize_fetches_one_block() {
        let (mut queue, catalog) = queue_with(rock_catalog(), PlaylistStore::default());
        queue.initialize(Channel::Rock).await.unwrap();

        assert_eq!(queue.items().len(), 10);
        assert_eq!(queue.current().unwrap().id, "a0");
        assert_eq!(queue.upcoming().unwrap().id, "a1");
        assert_eq!(queue.dedup().len(), 10);
        assert!(queue.used_playlist_ids().contains("r1"));
        assert_eq!(catalog.requests().len(), 1);
        assert_eq!(queue.items()[0].playlist_label.as_deref(), Some("r1 label"));
    }

    #[tokio::test]
    async fn test_initialize_failure_leaves_queue_empty() {
        let (mut queue, catalog) = queue_with(rock_catalog(), PlaylistStore::default());
        catalog.set_failing(true);

        assert!(queue.initialize(Channel::Rock).await.is_err());
        assert!(queue.is_empty());
        assert!(queue.current().is_none());
    }

    #[tokio::test]
    async fn test_advance_refills_at_threshold() {
        let (mut queue, catalog) = queue_with(rock_catalog(), PlaylistStore::default());
        queue.initialize(Channel::Rock).await.unwrap();

        // 10 items: remaining goes 9, 8, 7 - no fetch yet
        for _ in 0..3 {
            queue.advance().await;
        }
        assert_eq!(catalog.requests().len(), 1);

        // remaining 6 triggers the refill
        let current = queue.advance().await.unwrap().id.clone();
        assert_eq!(current, "a4");
        assert_eq!(catalog.requests().len(), 2);
        assert_eq!(queue.items().len(), 20);

        let second = &catalog.requests()[1];
        assert!(second.exclude_ids.contains(&"a0".to_string()));
        assert_eq!(second.exclude_playlist_ids, vec!["r1"]);
    }

    #[tokio::test]
    async fn test_prune_keeps_current_item() {
        let (mut queue, _catalog) = queue_with(rock_catalog(), PlaylistStore::default());
        queue.initialize(Channel::Rock).await.unwrap();

        for _ in 0..8 {
            queue.advance().await;
        }
        assert_eq!(queue.current().unwrap().id, "a8");
        assert_eq!(queue.current_index(), KEEP_BEHIND);
        assert_eq!(queue.items()[0].id, "a3");
    }

    #[tokio::test]
    async fn test_refill_failure_keeps_playing() {
        let (mut queue, catalog) = queue_with(rock_catalog(), PlaylistStore::default());
        queue.initialize(Channel::Rock).await.unwrap();
        catalog.set_failing(true);

        for _ in 0..5 {
            assert!(queue.advance().await.is_some());
        }
        assert_eq!(queue.items().len(), 10);

        catalog.set_failing(false);
        queue.advance().await;
        // one item pruned from the head, one block of 10 appended
        assert_eq!(queue.items().len(), 19);
    }

    #[tokio::test]
    async fn test_stale_block_discarded_after_switch() {
        let (mut queue, catalog) = queue_with(rock_catalog(), PlaylistStore::default());
        queue.initialize(Channel::Rock).await.unwrap();

        let request = queue.prepare_fetch();
        let in_flight = catalog.fetch_block(&request).await.unwrap();

        queue.initialize(Channel::Live).await.unwrap();
        let before = queue.items().to_vec();
        let dedup_before = queue.dedup().clone();

        assert!(!queue.apply_block(&request, in_flight));
        assert_eq!(queue.items(), before.as_slice());
        assert_eq!(queue.dedup(), &dedup_before);
        assert_eq!(queue.channel(), Channel::Live);
    }

    #[tokio::test]
    async fn test_remove_before_pointer_shifts_index() {
        let (mut queue, _catalog) = queue_with(rock_catalog(), PlaylistStore::default());
        queue.initialize(Channel::Rock).await.unwrap();
        queue.advance().await;
        queue.advance().await;
        assert_eq!(queue.current().unwrap().id, "a2");

        assert!(queue.remove_unavailable("a0"));
        assert_eq!(queue.current().unwrap().id, "a2");
        assert_eq!(queue.current_index(), 1);
    }

    #[tokio::test]
    async fn test_remove_current_moves_to_successor() {
        let (mut queue, _catalog) = queue_with(rock_catalog(), PlaylistStore::default());
        queue.initialize(Channel::Rock).await.unwrap();
        queue.advance().await;

        assert!(queue.remove_unavailable("a1"));
        assert_eq!(queue.current().unwrap().id, "a2");
        assert!(!queue.remove_unavailable("nope"));
        assert!(queue.dedup().contains("nope"));
    }

    #[tokio::test]
    async fn test_user_playlist_names_tagged() {
        let mut store = PlaylistStore::default();
        store.insert(
            Channel::Rock,
            PlaylistInfo {
                id: "PLmine1234567890".into(),
                name: "My Rock".into(),
            },
        );
        let catalog = rock_catalog().with_user_playlist(block("PLmine1234567890", "u", 8));
        let (mut queue, catalog) = queue_with(catalog, store);

        queue.initialize(Channel::Rock).await.unwrap();
        assert!(catalog.requests()[0].prefer_custom);
        assert_eq!(queue.items()[0].playlist_name.as_deref(), Some("My Rock"));

        queue.fetch_block().await.unwrap();
        assert!(!catalog.requests()[1].prefer_custom);
        assert_eq!(queue.items()[8].playlist_name, None);
    }

    #[tokio::test]
    async fn test_source_memory_survives_initialize() {
        let mut store = PlaylistStore::default();
        store.insert(
            Channel::Rock,
            PlaylistInfo {
                id: "PLmine1234567890".into(),
                name: "My Rock".into(),
            },
        );
        let catalog = rock_catalog().with_user_playlist(block("PLmine1234567890", "u", 8));
        let (mut queue, catalog) = queue_with(catalog, store);

        queue.initialize(Channel::Rock).await.unwrap();
        queue.initialize(Channel::Rock).await.unwrap();
        let requests = catalog.requests();
        assert!(requests[0].prefer_custom);
        assert!(!requests[1].prefer_custom);
        // fresh start clears the dedup bookkeeping
        assert!(requests[1].exclude_ids.is_empty());
    }

    #[tokio::test]
    async fn test_set_year_by_id() {
        let (mut queue, _catalog) = queue_with(rock_catalog(), PlaylistStore::default());
        queue.initialize(Channel::Rock).await.unwrap();

        assert!(queue.set_year("a3", 1991));
        assert_eq!(queue.items()[3].year, Some(1991));
        assert!(!queue.set_year("gone", 1991));
    }

    #[tokio::test]
    async fn test_snapshot_and_reinstate() {
        let (mut queue, _catalog) = queue_with(rock_catalog(), PlaylistStore::default());
        queue.initialize(Channel::Rock).await.unwrap();
        queue.advance().await;
        let snap = queue.snapshot();
        assert_eq!(snap.current_index, 1);

        queue.initialize(Channel::Live).await.unwrap();
        queue.reinstate(Channel::Rock, snap, 4);
        assert_eq!(queue.channel(), Channel::Rock);
        assert_eq!(queue.current().unwrap().id, "a4");
        assert!(queue.dedup().contains("a0"));
    }
}
