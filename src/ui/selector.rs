//! dialoguer menus

use dialoguer::{Select, theme::ColorfulTheme};

use crate::types::{AppState, Channel, MenuItem};
use crate::ui::display::format_channel_label;

pub struct Selector;

impl Selector {
    pub fn new() -> Self {
        Self
    }

    /// Select an item from the menu. `None` on escape or a closed terminal.
    pub fn select<T: Clone>(&self, items: &[MenuItem<T>], prompt: &str) -> Option<T> {
        if items.is_empty() {
            return None;
        }

        let labels: Vec<&str> = items.iter().map(|i| i.label.as_str()).collect();

        let selection = Select::with_theme(&ColorfulTheme::default())
            .with_prompt(prompt)
            .items(&labels)
            .default(0)
            .interact_opt()
            .ok()
            .flatten()?;

        items.get(selection).map(|item| item.value.clone())
    }

    /// Main menu while watching `channel`
    pub fn select_action(&self, channel: Channel) -> AppState {
        let prompt = format!("{} - what now?", format_channel_label(channel));
        self.select(&action_menu(), &prompt).unwrap_or(AppState::Exit)
    }

    pub fn select_channel(&self) -> Option<Channel> {
        self.select(&channel_menu(), "Tune to")
    }
}

impl Default for Selector {
    fn default() -> Self {
        Self::new()
    }
}

pub fn action_menu() -> Vec<MenuItem<AppState>> {
    vec![
        MenuItem { label: "📺 Now playing".into(), value: AppState::NowPlaying },
        MenuItem { label: "⏭️  Next".into(), value: AppState::Next },
        MenuItem { label: "🔼 Channel up".into(), value: AppState::Surf { up: true } },
        MenuItem { label: "🔽 Channel down".into(), value: AppState::Surf { up: false } },
        MenuItem { label: "🎛️  Tune to...".into(), value: AppState::TuneTo },
        MenuItem { label: "🚫 Report unavailable".into(), value: AppState::ReportUnavailable },
        MenuItem { label: "👋 Quit".into(), value: AppState::Exit },
    ]
}

/// Every channel, hidden ones included
pub fn channel_menu() -> Vec<MenuItem<Channel>> {
    Channel::ALL
        .iter()
        .map(|&channel| MenuItem {
            label: format_channel_label(channel),
            value: channel,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_menu_ends_with_quit() {
        let menu = action_menu();
        assert_eq!(menu.last().map(|i| i.value), Some(AppState::Exit));
        assert!(menu.iter().any(|i| i.value == AppState::Surf { up: true }));
    }

    #[test]
    fn test_channel_menu_lists_all_channels() {
        let menu = channel_menu();
        assert_eq!(menu.len(), Channel::ALL.len());
        assert_eq!(menu[1].label, "🎤 Base");
    }

    #[test]
    fn test_empty_menu_selects_nothing() {
        let items: Vec<MenuItem<u8>> = Vec::new();
        assert_eq!(Selector::new().select(&items, "x"), None);
    }
}
