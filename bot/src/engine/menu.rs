use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::settings_store::{Settings, SettingsStore};
use crate::error::BotError;

/// Mute durations offered in the settings submenu, in seconds.
pub const DURATION_OPTIONS: [i64; 5] = [30, 60, 120, 300, 600];

const MARK_ON: &str = "✔️";
const MARK_OFF: &str = "❌";

/// Which screen of the inline menu is showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuView {
    Main,
    DurationPicker,
}

/// A decoded button press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
    ToggleEnabled,
    OpenSettings,
    SelectDuration(i64),
    /// Back from the duration picker to the main view.
    ShowMain,
    /// Payload we could not make sense of. Acknowledged and otherwise ignored.
    Unrecognized,
}

/// Callback data as it travels through Telegram, e.g. `{"callback":"set_time","seconds":60}`.
/// Menus posted by older deployments use the same shape, so these names are fixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "callback", rename_all = "snake_case")]
enum CallbackPayload {
    UpdateEnabled,
    BotSettings,
    SetTime {
        seconds: i64,
    },
    MainMenu,
    #[serde(other)]
    Unrecognized,
}

impl From<CallbackPayload> for MenuAction {
    fn from(payload: CallbackPayload) -> Self {
        match payload {
            CallbackPayload::UpdateEnabled => MenuAction::ToggleEnabled,
            CallbackPayload::BotSettings => MenuAction::OpenSettings,
            CallbackPayload::SetTime { seconds } => MenuAction::SelectDuration(seconds),
            CallbackPayload::MainMenu => MenuAction::ShowMain,
            CallbackPayload::Unrecognized => MenuAction::Unrecognized,
        }
    }
}

impl From<MenuAction> for CallbackPayload {
    fn from(action: MenuAction) -> Self {
        match action {
            MenuAction::ToggleEnabled => CallbackPayload::UpdateEnabled,
            MenuAction::OpenSettings => CallbackPayload::BotSettings,
            MenuAction::SelectDuration(seconds) => CallbackPayload::SetTime { seconds },
            MenuAction::ShowMain => CallbackPayload::MainMenu,
            MenuAction::Unrecognized => CallbackPayload::Unrecognized,
        }
    }
}

impl MenuAction {
    /// Decode raw callback data. Never fails: anything malformed is `Unrecognized`.
    pub fn decode(data: &str) -> Self {
        serde_json::from_str::<CallbackPayload>(data)
            .map(MenuAction::from)
            .unwrap_or(MenuAction::Unrecognized)
    }

    /// Encode as callback data for a button.
    pub fn encode(self) -> String {
        // A fieldless or single-integer enum always serializes.
        serde_json::to_string(&CallbackPayload::from(self)).unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuButton {
    pub label: String,
    pub action: MenuAction,
    /// Rendered with the check mark.
    pub selected: bool,
}

/// Transport-agnostic inline keyboard: rows of buttons.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MenuLayout {
    pub rows: Vec<Vec<MenuButton>>,
}

impl MenuLayout {
    pub fn buttons(&self) -> impl Iterator<Item = &MenuButton> {
        self.rows.iter().flatten()
    }

    /// Duration buttons currently marked as the active choice.
    pub fn selected_durations(&self) -> Vec<i64> {
        self.buttons()
            .filter(|b| b.selected)
            .filter_map(|b| match b.action {
                MenuAction::SelectDuration(seconds) => Some(seconds),
                _ => None,
            })
            .collect()
    }
}

/// Human label for a duration option: "30 seconds", "one minute", "5 minutes".
pub fn duration_label(seconds: i64) -> String {
    match seconds {
        60 => "one minute".to_string(),
        s if s < 60 => format!("{s} seconds"),
        // Round half up to whole minutes
        s => format!("{} minutes", (s + 30) / 60),
    }
}

fn mark(on: bool) -> &'static str {
    if on { MARK_ON } else { MARK_OFF }
}

/// Render a view. Output depends only on `view` and `settings`.
pub fn render(view: MenuView, settings: &Settings) -> MenuLayout {
    match view {
        MenuView::Main => MenuLayout {
            rows: vec![vec![
                MenuButton {
                    label: format!("Bot enabled {}", mark(settings.enabled)),
                    action: MenuAction::ToggleEnabled,
                    selected: settings.enabled,
                },
                MenuButton {
                    label: "Bot settings ⚙️".to_string(),
                    action: MenuAction::OpenSettings,
                    selected: false,
                },
            ]],
        },
        MenuView::DurationPicker => {
            let mut rows: Vec<Vec<MenuButton>> = DURATION_OPTIONS
                .iter()
                .map(|&seconds| {
                    let selected = seconds == settings.mute_duration_seconds;
                    vec![MenuButton {
                        label: format!(
                            "Mute user for {} {}",
                            duration_label(seconds),
                            mark(selected)
                        ),
                        action: MenuAction::SelectDuration(seconds),
                        selected,
                    }]
                })
                .collect();
            rows.push(vec![MenuButton {
                label: "« Back".to_string(),
                action: MenuAction::ShowMain,
                selected: false,
            }]);
            MenuLayout { rows }
        }
    }
}

/// What the menu should show after handling an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuUpdate {
    pub view: MenuView,
    /// Settings the layout was rendered from.
    pub settings: Settings,
    pub layout: MenuLayout,
    /// Whether the action wrote to the settings store.
    pub changed: bool,
}

/// Applies button presses to the settings store and renders the result.
///
/// The menu keeps no state of its own: the view comes from the action and
/// every rendered field comes from the settings the store just returned.
pub struct MenuStateMachine {
    store: Arc<SettingsStore>,
}

impl MenuStateMachine {
    pub fn new(store: Arc<SettingsStore>) -> Self {
        Self { store }
    }

    /// A fresh menu, always starting on the main view.
    pub async fn open(&self) -> Result<MenuUpdate, BotError> {
        let settings = self.store.current().await?;
        Ok(Self::update(MenuView::Main, settings, false))
    }

    /// Apply a button press. Returns `None` for unrecognized payloads, which
    /// leave the menu as it is. Any view accepts any action; the action alone
    /// picks the view that comes back.
    pub async fn apply(&self, action: MenuAction) -> Result<Option<MenuUpdate>, BotError> {
        let update = match action {
            MenuAction::ToggleEnabled => {
                let settings = self.store.toggle_enabled().await?;
                Self::update(MenuView::Main, settings, true)
            }
            MenuAction::OpenSettings => {
                let settings = self.store.current().await?;
                Self::update(MenuView::DurationPicker, settings, false)
            }
            MenuAction::SelectDuration(seconds) => {
                let (settings, changed) = self.store.change_mute_duration(seconds).await?;
                Self::update(MenuView::DurationPicker, settings, changed)
            }
            MenuAction::ShowMain => {
                let settings = self.store.current().await?;
                Self::update(MenuView::Main, settings, false)
            }
            MenuAction::Unrecognized => {
                debug!("ignoring unrecognized menu action");
                return Ok(None);
            }
        };
        Ok(Some(update))
    }

    fn update(view: MenuView, settings: Settings, changed: bool) -> MenuUpdate {
        MenuUpdate {
            view,
            settings,
            layout: render(view, &settings),
            changed,
        }
    }
}
