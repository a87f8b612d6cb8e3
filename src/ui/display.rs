//! Terminal formatting for the surfing loop

use colored::Colorize;

use crate::core::tuner::TuneResult;
use crate::types::{Channel, VideoItem};

/// Seconds as m:ss, or h:mm:ss past the hour
pub fn format_duration(secs: f64) -> String {
    let total = secs.max(0.0).floor() as u64;
    let (h, m, s) = (total / 3600, (total % 3600) / 60, total % 60);
    if h > 0 {
        format!("{}:{:02}:{:02}", h, m, s)
    } else {
        format!("{}:{:02}", m, s)
    }
}

pub fn format_channel_label(channel: Channel) -> String {
    format!("{} {}", channel.icon(), channel.display_name())
}

/// One-line label for an item: title, year, length
pub fn format_item_label(item: &VideoItem) -> String {
    if item.is_bumper {
        return format!("📡 {}", item.display_title().dimmed());
    }

    let mut label = item.display_title().bold().to_string();
    if let Some(year) = item.year {
        label.push_str(&format!(" {}", format!("({})", year).yellow()));
    }
    if let Some(duration) = item.duration {
        label.push_str(&format!(" {}", format!("[{}]", format_duration(duration)).dimmed()));
    }
    label
}

/// Where an item came from: the user's playlist name, else the block label
pub fn format_source(item: &VideoItem) -> Option<String> {
    item.playlist_name
        .as_ref()
        .map(|name| format!("from your playlist {}", name.cyan()))
        .or_else(|| item.playlist_label.as_ref().map(|label| label.dimmed().to_string()))
}

/// What happened on tune-in, for the status line
pub fn format_tune_result(result: &TuneResult) -> String {
    match *result {
        TuneResult::Resumed { position, skips: 0, .. } => {
            format!("Picking up at {}", format_duration(position))
        }
        TuneResult::Resumed { position, skips, .. } => format!(
            "{} while you were away, picking up at {}",
            if skips == 1 {
                "1 item played".to_string()
            } else {
                format!("{} items played", skips)
            },
            format_duration(position)
        ),
        TuneResult::Restarted { .. } => "Starting this one over".to_string(),
        TuneResult::Fresh { start_at, .. } if start_at > 0.0 => {
            format!("Tuned in at {}", format_duration(start_at))
        }
        TuneResult::Fresh { .. } => "Tuned in".to_string(),
    }
}
