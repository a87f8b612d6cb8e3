//! Player module - virtual playhead
//!
//! nmtv does not stream anything itself. The CLI keeps a playhead per
//! loaded item that advances with the clock, and reports it on channel-out
//! the way a real embedded player would.

use std::sync::Arc;

use crate::core::clock::{Clock, elapsed_secs};
use crate::types::{PlayerReport, VideoItem};

/// Build YouTube URL from video ID
pub fn build_video_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={}", video_id)
}

/// Build a URL that starts playback at `position` seconds
pub fn build_video_url_at(video_id: &str, position: f64) -> String {
    let secs = position.max(0.0).floor() as u64;
    if secs == 0 {
        return build_video_url(video_id);
    }
    format!("{}&t={}s", build_video_url(video_id), secs)
}

pub struct Playhead {
    clock: Arc<dyn Clock>,
    video_id: Option<String>,
    started_at: i64,
    offset: f64,
    duration: Option<f64>,
}

impl Playhead {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            video_id: None,
            started_at: 0,
            offset: 0.0,
            duration: None,
        }
    }

    /// Start `item` at `start_at` seconds
    pub fn load(&mut self, item: &VideoItem, start_at: f64) {
        self.video_id = Some(item.id.clone());
        self.started_at = self.clock.now_ms();
        self.offset = start_at.max(0.0);
        self.duration = item.duration.filter(|d| *d > 0.0);
    }

    pub fn stop(&mut self) {
        self.video_id = None;
        self.duration = None;
    }

    pub fn video_id(&self) -> Option<&str> {
        self.video_id.as_deref()
    }

    /// Seconds into the loaded item, capped at its duration when known
    pub fn position(&self) -> Option<f64> {
        self.video_id.as_ref()?;
        let position = self.offset + elapsed_secs(self.started_at, self.clock.now_ms());
        Some(match self.duration {
            Some(duration) => position.min(duration),
            None => position,
        })
    }

    /// Seconds played past the end of the loaded item
    pub fn overrun(&self) -> f64 {
        match (self.video_id.as_ref(), self.duration) {
            (Some(_), Some(duration)) => {
                let raw = self.offset + elapsed_secs(self.started_at, self.clock.now_ms());
                (raw - duration).max(0.0)
            }
            _ => 0.0,
        }
    }

    /// Whether the loaded item has played to its end
    pub fn finished(&self) -> bool {
        match (self.position(), self.duration) {
            (Some(position), Some(duration)) => position >= duration,
            _ => false,
        }
    }

    /// What gets handed to channel-out
    pub fn report(&self) -> PlayerReport {
        PlayerReport {
            position: self.position(),
            duration: self.duration,
        }
    }
}
