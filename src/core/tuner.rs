//! Channel switching
//!
//! The tuner owns the live queue and the per-channel saved state. Leaving a
//! channel saves where it was; coming back computes where it would be now
//! and reinstates the saved queue there, or starts the channel fresh when
//! nothing usable was saved.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::core::catalog::CatalogGateway;
use crate::core::channel_state::{ChannelStateStore, NEAR_END_MARGIN, SaveOutcome};
use crate::core::clock::Clock;
use crate::core::queue::{PlaybackQueue, REFILL_THRESHOLD};
use crate::core::restore::restore;
use crate::error::Result;
use crate::storage::cache::YearCache;
use crate::storage::last_channel::LastChannel;
use crate::storage::playlists::UserPlaylists;
use crate::types::{
    Channel, ChannelSnapshot, Config, PlaybackState, PlayerReport, RestoreOutcome, VideoItem,
};

/// Player error codes that mean the item will never play
pub const UNAVAILABLE_ERROR_CODES: [u16; 3] = [100, 101, 150];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TunerOptions {
    /// Start position (seconds) of the first item after a fresh tune-in
    pub cold_start_offset: f64,
    /// Consecutive load failures before an item is dropped
    pub max_load_attempts: u32,
    pub year_lookup: bool,
}

impl Default for TunerOptions {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for TunerOptions {
    fn from(config: &Config) -> Self {
        Self {
            cold_start_offset: config.cold_start_offset,
            max_load_attempts: config.max_load_attempts.max(1),
            year_lookup: config.year_lookup,
        }
    }
}

/// How a channel came up after tuning in
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TuneResult {
    /// Saved queue reinstated where elapsed time puts it
    Resumed {
        index: usize,
        position: f64,
        skips: usize,
    },
    /// Saved queue reinstated at its pointer with no usable timing; the item starts over
    Restarted { index: usize },
    /// New queue from the catalog. `seeded` when old dedup state was carried over.
    Fresh { start_at: f64, seeded: bool },
}

impl TuneResult {
    /// Where the player should seek for the current item
    pub fn start_position(&self) -> f64 {
        match *self {
            TuneResult::Resumed { position, .. } => position,
            TuneResult::Restarted { .. } => 0.0,
            TuneResult::Fresh { start_at, .. } => start_at,
        }
    }
}

/// What to do after the player failed to load the current item
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorAction {
    /// Try loading the same item again
    Retry { attempt: u32 },
    /// Item dropped from the queue; play whatever is current now
    Skipped { video_id: String },
    /// Nothing was playing
    NoItem,
}

pub struct Tuner {
    queue: PlaybackQueue,
    store: ChannelStateStore,
    clock: Arc<dyn Clock>,
    options: TunerOptions,
    year_cache: Option<YearCache>,
    last_channel: Option<LastChannel>,
    load_attempts: u32,
}

impl Tuner {
    pub fn new(
        gateway: Arc<dyn CatalogGateway>,
        playlists: Arc<dyn UserPlaylists>,
        clock: Arc<dyn Clock>,
        options: TunerOptions,
    ) -> Self {
        Self {
            queue: PlaybackQueue::new(gateway, playlists, Channel::default()),
            store: ChannelStateStore::new(),
            clock,
            options,
            year_cache: None,
            last_channel: None,
            load_attempts: 0,
        }
    }

    pub fn with_year_cache(mut self, cache: YearCache) -> Self {
        self.year_cache = Some(cache);
        self
    }

    /// Remember every successful switch in `store`
    pub fn with_last_channel(mut self, store: LastChannel) -> Self {
        self.last_channel = Some(store);
        self
    }

    pub fn channel(&self) -> Channel {
        self.queue.channel()
    }

    pub fn current(&self) -> Option<&VideoItem> {
        self.queue.current()
    }

    pub fn upcoming(&self) -> Option<&VideoItem> {
        self.queue.upcoming()
    }

    pub fn queue(&self) -> &PlaybackQueue {
        &self.queue
    }

    pub fn store(&self) -> &ChannelStateStore {
        &self.store
    }

    /// Fresh start: saved state for `channel` is dropped and one block fetched
    pub async fn initialize(&mut self, channel: Channel) -> Result<TuneResult> {
        self.store.clear(channel);
        self.load_attempts = 0;
        self.queue.initialize(channel).await?;
        Ok(TuneResult::Fresh {
            start_at: self.cold_start_position(),
            seeded: false,
        })
    }

    /// Save the active channel's state before leaving it
    pub fn channel_out(&mut self, report: PlayerReport) -> SaveOutcome {
        let channel = self.queue.channel();
        let outcome = self.store.record_channel_out(
            channel,
            self.queue.snapshot(),
            report,
            self.clock.now_ms(),
        );
        debug!(%channel, ?outcome, "channel out");
        outcome
    }

    /// Bring `channel` up from its saved state, or fresh when there is none
    pub async fn channel_in(&mut self, channel: Channel) -> Result<TuneResult> {
        self.load_attempts = 0;

        let snapshot = self.store.snapshot(channel).cloned();
        let state = self.store.playback(channel).cloned();

        let (snapshot, mut state) = match (snapshot, state) {
            (Some(snapshot), Some(state)) if !snapshot.queue.is_empty() => (snapshot, state),
            (Some(snapshot), None) if !snapshot.queue.is_empty() => {
                return self.restart_at_snapshot(channel, snapshot).await;
            }
            _ => {
                debug!(%channel, "no usable saved state");
                return self.initialize(channel).await;
            }
        };

        // The saved index may predate a prune; follow the item, not the slot
        state.video_index = locate_saved(&snapshot, &state).unwrap_or(snapshot.current_index);
        let target = snapshot
            .queue
            .get(state.video_index)
            .map(|item| item.id.clone());

        match restore(&snapshot, &state, self.clock.now_ms(), target.as_deref()) {
            RestoreOutcome::Restored(restored) => {
                info!(
                    %channel,
                    index = restored.video_index,
                    position = restored.position,
                    skips = restored.video_skips,
                    "resuming channel"
                );
                self.queue.reinstate(channel, snapshot, restored.video_index);
                self.top_up().await;
                Ok(TuneResult::Resumed {
                    index: self.queue.current_index(),
                    position: restored.position,
                    skips: restored.video_skips,
                })
            }
            RestoreOutcome::NotFound => {
                info!(%channel, video = %state.video_id, "saved item gone, restarting");
                self.restart_at_snapshot(channel, snapshot).await
            }
            RestoreOutcome::Expired { video_skips } => {
                info!(%channel, video_skips, "saved queue fully played out");
                self.store.clear(channel);
                self.seeded_start(channel, snapshot).await
            }
        }
    }

    /// Leave the active channel and tune to `to`
    pub async fn switch_channel(&mut self, to: Channel, report: PlayerReport) -> Result<TuneResult> {
        if !self.queue.is_empty() {
            self.channel_out(report);
        }
        let result = self.channel_in(to).await?;

        if let Some(store) = &self.last_channel {
            if let Err(e) = store.save(to).await {
                warn!(channel = %to, error = %e, "could not remember channel");
            }
        }
        Ok(result)
    }

    /// Ongoing position report from the player for the current item.
    /// The queue is saved alongside so the timing always indexes into it.
    pub fn report_position(&mut self, position: f64, duration: Option<f64>) -> bool {
        let channel = self.queue.channel();
        let index = self.queue.current_index();
        let Some(current) = self.queue.current() else {
            return false;
        };
        let id = current.id.clone();
        let duration = duration.unwrap_or_else(|| current.effective_duration());
        let saved = self
            .store
            .save_playback(channel, &id, position, index, duration, self.clock.now_ms());
        if saved {
            self.store.save_snapshot(channel, self.queue.snapshot());
        }
        saved
    }

    pub async fn advance(&mut self) -> Option<&VideoItem> {
        self.load_attempts = 0;
        self.queue.advance().await
    }

    /// The player started playing the current item
    pub fn on_playing(&mut self) {
        self.load_attempts = 0;
    }

    /// Drop `video_id` locally and tell the backend in the background.
    /// The report never affects playback.
    pub fn mark_unavailable(&mut self, video_id: &str, error_code: Option<u16>) -> bool {
        let removed = self.queue.remove_unavailable(video_id);

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let gateway = self.queue.gateway();
                let video_id = video_id.to_string();
                handle.spawn(async move {
                    if let Err(e) = gateway.report_unavailable(&video_id, error_code).await {
                        warn!(video = %video_id, error = %e, "unavailable report failed");
                    }
                });
            }
            Err(_) => debug!(video = %video_id, "no runtime, unavailable report skipped"),
        }
        removed
    }

    /// Decide what to do with a player load error on the current item
    pub fn on_player_error(&mut self, code: u16) -> ErrorAction {
        let Some(current) = self.queue.current() else {
            return ErrorAction::NoItem;
        };
        let video_id = current.id.clone();

        if !UNAVAILABLE_ERROR_CODES.contains(&code) {
            self.load_attempts += 1;
            if self.load_attempts < self.options.max_load_attempts {
                debug!(video = %video_id, code, attempt = self.load_attempts, "retrying item");
                return ErrorAction::Retry {
                    attempt: self.load_attempts,
                };
            }
            warn!(video = %video_id, code, "item failed too often, skipping");
        }

        self.load_attempts = 0;
        self.mark_unavailable(&video_id, Some(code));
        ErrorAction::Skipped { video_id }
    }

    /// Look up and fill in the current item's release year.
    ///
    /// Skipped for bumpers, the live channel, and when disabled.
    pub async fn enrich_current_year(&mut self) -> Option<u16> {
        if !self.options.year_lookup || self.queue.channel() == Channel::Live {
            return None;
        }
        let item = self.queue.current()?;
        if item.is_bumper {
            return None;
        }
        if item.year.is_some() {
            return item.year;
        }
        let id = item.id.clone();
        let title = item.year_search_title()?;

        let cached = match &self.year_cache {
            Some(cache) => cache.get(&title).await,
            None => None,
        };
        let year = match cached {
            Some(year) => year,
            None => match self.queue.gateway().lookup_year(&title).await {
                Ok(year) => {
                    if let Some(cache) = &self.year_cache {
                        if let Err(e) = cache.set(&title, year).await {
                            debug!(error = %e, "year cache write failed");
                        }
                    }
                    year
                }
                Err(e) => {
                    warn!(%title, error = %e, "year lookup failed");
                    return None;
                }
            },
        }?;

        self.queue.set_year(&id, year);
        Some(year)
    }

    /// Start the snapshot's current item from the top; a played-out
    /// snapshot gets a fresh block with the same history
    async fn restart_at_snapshot(
        &mut self,
        channel: Channel,
        snapshot: ChannelSnapshot,
    ) -> Result<TuneResult> {
        if snapshot.current_index >= snapshot.queue.len() {
            self.store.clear(channel);
            return self.seeded_start(channel, snapshot).await;
        }
        let index = snapshot.current_index;
        self.queue.reinstate(channel, snapshot, index);
        self.top_up().await;
        Ok(TuneResult::Restarted {
            index: self.queue.current_index(),
        })
    }

    async fn seeded_start(
        &mut self,
        channel: Channel,
        snapshot: ChannelSnapshot,
    ) -> Result<TuneResult> {
        self.queue
            .reseed(channel, snapshot.dedup, snapshot.used_playlist_ids);
        self.queue.fill().await?;
        Ok(TuneResult::Fresh {
            start_at: self.cold_start_position(),
            seeded: true,
        })
    }

    /// Refill a reinstated queue that is already close to its end
    async fn top_up(&mut self) {
        if self.queue.remaining() <= REFILL_THRESHOLD {
            if let Err(e) = self.queue.fetch_block().await {
                warn!(channel = %self.queue.channel(), error = %e, "top-up failed");
            }
        }
    }

    fn cold_start_position(&self) -> f64 {
        match self.queue.current() {
            Some(item) if !item.is_bumper => {
                let offset = self.options.cold_start_offset;
                if offset < item.effective_duration() - NEAR_END_MARGIN {
                    offset
                } else {
                    0.0
                }
            }
            _ => 0.0,
        }
    }
}

/// Index of the saved item in `snapshot`: the saved slot if it still holds
/// it, else the first copy from the snapshot pointer on, else anywhere
fn locate_saved(snapshot: &ChannelSnapshot, state: &PlaybackState) -> Option<usize> {
    let holds = |index: usize| {
        snapshot
            .queue
            .get(index)
            .is_some_and(|item| item.id == state.video_id)
    };
    if holds(state.video_index) {
        return Some(state.video_index);
    }
    (snapshot.current_index..snapshot.queue.len())
        .chain(0..snapshot.current_index.min(snapshot.queue.len()))
        .find(|&index| holds(index))
}
