//! Per-channel saved state
//!
//! Holds, for each channel the viewer has left, a snapshot of its queue and
//! the raw timing facts needed to compute where it "is now" on return.

use std::collections::HashMap;

use tracing::{debug, info};

use crate::types::{Channel, ChannelSnapshot, PlaybackState, PlayerReport};

/// Within this many seconds of the end an item counts as finished
pub const NEAR_END_MARGIN: f64 = 5.0;

/// Positions below this are not saved; durations are unreliable right after load
pub const MIN_SAVE_POSITION: f64 = 2.0;

/// What a channel-out recorded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// No current item; existing records untouched
    Skipped,
    /// Snapshot saved, but too little played to trust the timing; any old timing dropped
    Untimed,
    /// Item was essentially over: snapshot points at the next item, no timing saved
    NextItem,
    /// Timing and snapshot saved for the current item
    Resumable,
    /// A bumper was playing: timing saved against the item after it
    BumperRetargeted,
    /// Records dropped: the item was over with nothing after it, or it never played
    Cleared,
}

#[derive(Debug, Default)]
pub struct ChannelStateStore {
    snapshots: HashMap<Channel, ChannelSnapshot>,
    states: HashMap<Channel, PlaybackState>,
}

impl ChannelStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Save timing for `channel`. Returns false when the input is rejected.
    ///
    /// The high-water mark only carries over when the saved item is unchanged.
    pub fn save_playback(
        &mut self,
        channel: Channel,
        video_id: &str,
        position: f64,
        video_index: usize,
        video_duration: f64,
        now_ms: i64,
    ) -> bool {
        if video_id.is_empty() || position < 0.0 || video_duration <= 0.0 {
            return false;
        }
        if position < MIN_SAVE_POSITION {
            return false;
        }

        let high_water_mark = match self.states.get(&channel) {
            Some(existing) if existing.video_id == video_id => {
                existing.high_water_mark.max(position)
            }
            _ => position,
        };

        self.states.insert(
            channel,
            PlaybackState {
                video_id: video_id.to_string(),
                position,
                saved_at: now_ms,
                video_index,
                video_duration,
                high_water_mark,
            },
        );
        true
    }

    pub fn save_snapshot(&mut self, channel: Channel, snapshot: ChannelSnapshot) {
        self.snapshots.insert(channel, snapshot);
    }

    pub fn snapshot(&self, channel: Channel) -> Option<&ChannelSnapshot> {
        self.snapshots.get(&channel)
    }

    pub fn playback(&self, channel: Channel) -> Option<&PlaybackState> {
        self.states.get(&channel)
    }

    pub fn clear(&mut self, channel: Channel) {
        self.snapshots.remove(&channel);
        self.states.remove(&channel);
    }

    /// Record leaving `channel`. `snapshot.current_index` is the item on screen.
    ///
    /// Whenever there is a current item the old records are replaced, so a
    /// later visit never resumes from an older one. A missing player duration
    /// falls back to the item's catalog duration.
    pub fn record_channel_out(
        &mut self,
        channel: Channel,
        mut snapshot: ChannelSnapshot,
        report: PlayerReport,
        now_ms: i64,
    ) -> SaveOutcome {
        let index = snapshot.current_index;
        let Some(current) = snapshot.queue.get(index) else {
            return SaveOutcome::Skipped;
        };
        let position = report.position.unwrap_or(0.0);
        if position <= 0.0 {
            self.clear(channel);
            debug!(%channel, "current item never played, records dropped");
            return SaveOutcome::Cleared;
        }
        let duration = report
            .duration
            .filter(|d| *d > 0.0)
            .unwrap_or_else(|| current.effective_duration());
        let next = snapshot.queue.get(index + 1);

        // Time spent in a bumper is carried over to the item after it
        if current.is_bumper {
            if let Some(next) = next {
                let (id, next_duration) = (next.id.clone(), next.effective_duration());
                snapshot.current_index = index + 1;
                let timed =
                    self.save_playback(channel, &id, position, index + 1, next_duration, now_ms);
                return self.finish_save(channel, snapshot, timed, SaveOutcome::BumperRetargeted);
            }
        }

        if position >= duration - NEAR_END_MARGIN {
            if next.is_none() {
                self.clear(channel);
                return SaveOutcome::Cleared;
            }
            snapshot.current_index = index + 1;
            self.states.remove(&channel);
            self.snapshots.insert(channel, snapshot);
            debug!(%channel, "item finished, next visit starts on the next item");
            return SaveOutcome::NextItem;
        }

        let id = current.id.clone();
        let timed = self.save_playback(channel, &id, position, index, duration, now_ms);
        if timed {
            info!(%channel, video = %id, position, "saved channel position");
        }
        self.finish_save(channel, snapshot, timed, SaveOutcome::Resumable)
    }

    /// Store the snapshot; without fresh timing the old timing must go too
    fn finish_save(
        &mut self,
        channel: Channel,
        snapshot: ChannelSnapshot,
        timed: bool,
        outcome: SaveOutcome,
    ) -> SaveOutcome {
        self.snapshots.insert(channel, snapshot);
        if timed {
            return outcome;
        }
        self.states.remove(&channel);
        debug!(%channel, "position too early to keep, saved queue only");
        SaveOutcome::Untimed
    }
}
