//! Time-elapsed restoration
//!
//! Given what was saved when a viewer left a channel and the current time,
//! work out where the channel "is now": add the elapsed time to the saved
//! position and walk forward across item boundaries until the remaining
//! time fits inside an item.
//!
//! Everything here is a pure function of its inputs.

use tracing::debug;

use crate::core::clock::elapsed_secs;
use crate::types::{ChannelSnapshot, PlaybackState, RestoreOutcome, RestoredState};

/// Compute the resume point for a saved channel.
///
/// * `target_video_id` - when given and different from the saved item,
///   the outcome is [`RestoreOutcome::NotFound`].
///
/// An item is crossed once the position runs strictly past its duration;
/// bumpers get no special treatment in the walk. Position protection
/// against rewinding only applies when the walk lands on the very item
/// that was saved.
pub fn restore(
    snapshot: &ChannelSnapshot,
    state: &PlaybackState,
    now_ms: i64,
    target_video_id: Option<&str>,
) -> RestoreOutcome {
    if let Some(target) = target_video_id {
        if target != state.video_id {
            debug!(saved = %state.video_id, %target, "saved item does not match target");
            return RestoreOutcome::NotFound;
        }
    }

    let elapsed = elapsed_secs(state.saved_at, now_ms);
    let mut position = state.position + elapsed;
    let mut index = state.video_index;
    let mut skips = 0;

    loop {
        let Some(item) = snapshot.queue.get(index) else {
            debug!(skips, "elapsed time ran past the saved queue");
            return RestoreOutcome::Expired { video_skips: skips };
        };

        let duration = if index == state.video_index && state.video_duration > 0.0 {
            state.video_duration
        } else {
            item.effective_duration()
        };

        if position <= duration {
            break;
        }

        position -= duration;
        index += 1;
        skips += 1;
    }

    if index == state.video_index && position < state.high_water_mark {
        position = state.high_water_mark;
    }
    let position = position.max(0.0);

    debug!(
        saved = state.position,
        elapsed,
        position,
        index,
        skips,
        "restored channel position"
    );

    RestoreOutcome::Restored(RestoredState {
        position,
        video_index: index,
        video_skips: skips,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::VideoItem;

    const T: i64 = 1_700_000_000_000;

    fn item(id: &str, duration: Option<f64>, is_bumper: bool) -> VideoItem {
        VideoItem {
            id: id.into(),
            duration,
            is_bumper,
            ..Default::default()
        }
    }

    fn snapshot(items: Vec<VideoItem>) -> ChannelSnapshot {
        ChannelSnapshot {
            queue: items,
            ..Default::default()
        }
    }

    fn state(id: &str, index: usize, position: f64, duration: f64, hwm: f64) -> PlaybackState {
        PlaybackState {
            video_id: id.into(),
            position,
            saved_at: T,
            video_index: index,
            video_duration: duration,
            high_water_mark: hwm,
        }
    }

    fn secs(s: f64) -> i64 {
        T + (s * 1000.0) as i64
    }

    fn restored(outcome: RestoreOutcome) -> RestoredState {
        match outcome {
            RestoreOutcome::Restored(r) => r,
            other => panic!("expected restored, got {:?}", other),
        }
    }

    #[test]
    fn test_small_elapsed_stays_on_item() {
        let snap = snapshot(vec![item("a", Some(200.0), false), item("b", Some(180.0), false)]);
        let st = state("a", 0, 190.0, 200.0, 190.0);

        let r = restored(restore(&snap, &st, secs(5.0), None));
        assert_eq!(r.video_index, 0);
        assert_eq!(r.position, 195.0);
        assert_eq!(r.video_skips, 0);
    }

    #[test]
    fn test_walks_one_boundary() {
        let snap = snapshot(vec![item("a", None, false), item("b", Some(180.0), false)]);
        let st = state("a", 0, 190.0, 200.0, 190.0);

        let r = restored(restore(&snap, &st, secs(20.0), None));
        assert_eq!(r.video_index, 1);
        assert_eq!(r.position, 10.0);
        assert_eq!(r.video_skips, 1);
    }

    #[test]
    fn test_walks_several_boundaries_with_default_duration() {
        let snap = snapshot(vec![
            item("a", Some(100.0), false),
            item("b", None, false),
            item("c", Some(60.0), false),
            item("d", Some(300.0), false),
        ]);
        let st = state("a", 0, 50.0, 100.0, 50.0);

        // 50 + 400 = 450 -> past a (100), b (240 default), c (60) -> 50 into d
        let r = restored(restore(&snap, &st, secs(400.0), None));
        assert_eq!(r.video_index, 3);
        assert_eq!(r.position, 50.0);
        assert_eq!(r.video_skips, 3);
    }

    #[test]
    fn test_bumper_skipped_once_elapsed() {
        let snap = snapshot(vec![
            item("song0", Some(200.0), false),
            item("bump", Some(10.0), true),
            item("song1", Some(200.0), false),
        ]);
        let st = state("bump", 1, 5.0, 10.0, 5.0);

        let r = restored(restore(&snap, &st, secs(20.0), None));
        assert_eq!(r.video_index, 2);
        assert_eq!(r.position, 15.0);
    }

    #[test]
    fn test_several_bumpers_in_a_row() {
        let snap = snapshot(vec![
            item("bump1", Some(10.0), true),
            item("bump2", Some(8.0), true),
            item("song", Some(200.0), false),
        ]);
        let st = state("bump1", 0, 4.0, 10.0, 4.0);

        let r = restored(restore(&snap, &st, secs(20.0), None));
        assert_eq!((r.video_index, r.position, r.video_skips), (2, 6.0, 2));
    }

    #[test]
    fn test_song_exactly_finished_stays() {
        let snap = snapshot(vec![item("a", Some(100.0), false), item("b", Some(100.0), false)]);
        let st = state("a", 0, 90.0, 100.0, 90.0);

        let r = restored(restore(&snap, &st, secs(10.0), None));
        assert_eq!(r.video_index, 0);
        assert_eq!(r.position, 100.0);
    }

    #[test]
    fn test_high_water_mark_clamps_same_item() {
        let snap = snapshot(vec![item("a", Some(300.0), false)]);
        // Clock went backwards: raw position lands at 40
        let st = state("a", 0, 50.0, 300.0, 60.0);

        let r = restored(restore(&snap, &st, secs(-10.0), None));
        assert_eq!(r.video_index, 0);
        assert_eq!(r.position, 60.0);
    }

    #[test]
    fn test_high_water_mark_ignored_on_other_item() {
        let snap = snapshot(vec![item("a", Some(100.0), false), item("b", Some(300.0), false)]);
        let st = state("a", 0, 95.0, 100.0, 250.0);

        let r = restored(restore(&snap, &st, secs(10.0), None));
        assert_eq!(r.video_index, 1);
        assert_eq!(r.position, 5.0);
    }

    #[test]
    fn test_exhausted_queue_expires() {
        let snap = snapshot(vec![item("a", Some(100.0), false), item("b", Some(100.0), false)]);
        let st = state("a", 0, 10.0, 100.0, 10.0);

        let outcome = restore(&snap, &st, secs(500.0), None);
        assert_eq!(outcome, RestoreOutcome::Expired { video_skips: 2 });
    }

    #[test]
    fn test_index_out_of_range_expires() {
        let snap = snapshot(vec![item("a", Some(100.0), false)]);
        let st = state("z", 4, 10.0, 100.0, 10.0);
        assert_eq!(
            restore(&snap, &st, secs(1.0), None),
            RestoreOutcome::Expired { video_skips: 0 }
        );
    }

    #[test]
    fn test_mismatched_target_is_not_found() {
        let snap = snapshot(vec![item("a", Some(100.0), false)]);
        let st = state("a", 0, 10.0, 100.0, 10.0);

        assert_eq!(
            restore(&snap, &st, secs(1.0), Some("other")),
            RestoreOutcome::NotFound
        );
        assert!(matches!(
            restore(&snap, &st, secs(1.0), Some("a")),
            RestoreOutcome::Restored(_)
        ));
    }

    #[test]
    fn test_saved_duration_wins_over_catalog_duration() {
        // Catalog said 240, player measured 200
        let snap = snapshot(vec![item("a", Some(240.0), false), item("b", Some(180.0), false)]);
        let st = state("a", 0, 190.0, 200.0, 190.0);

        let r = restored(restore(&snap, &st, secs(20.0), None));
        assert_eq!((r.video_index, r.position), (1, 10.0));
    }
}
