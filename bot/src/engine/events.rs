use super::membership::MemberPresence;
use super::restriction::Subject;

/// Where an inline menu lives, so it can be edited in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MenuTarget {
    pub chat_id: i64,
    pub message_id: i64,
}

/// Platform-agnostic inbound event. The Telegram adapter produces these;
/// the engine consumes them one at a time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BotEvent {
    /// A member's status in a group changed.
    MembershipChanged {
        subject: Subject,
        previous: MemberPresence,
        next: MemberPresence,
    },

    /// Someone pressed an inline menu button.
    ButtonPressed {
        callback_id: String,
        from_user_id: i64,
        /// Absent when the menu message is too old for Telegram to report.
        target: Option<MenuTarget>,
        /// Raw callback data, decoded by the menu.
        data: String,
    },

    /// `/start` was sent in a chat.
    StartCommand { chat_id: i64, from_user_id: Option<i64> },
}
