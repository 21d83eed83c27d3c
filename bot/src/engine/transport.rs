use async_trait::async_trait;

use super::events::MenuTarget;
use super::menu::MenuLayout;
use super::restriction::RestrictionCommand;
use crate::error::BotError;

/// Outbound commands the engine issues to the chat platform.
/// Delivery is best effort; every call may fail with [`BotError::TransportRejected`].
#[async_trait]
pub trait Transport: Send + Sync {
    /// Take away every send permission until the command's expiry.
    async fn restrict_member(&self, command: &RestrictionCommand) -> Result<(), BotError>;

    /// Post a new message carrying a menu.
    async fn send_menu(&self, chat_id: i64, text: &str, layout: &MenuLayout)
    -> Result<(), BotError>;

    /// Replace the buttons of an existing menu message.
    async fn edit_menu(&self, target: MenuTarget, layout: &MenuLayout) -> Result<(), BotError>;

    /// Acknowledge a button press, optionally with a short notice for the presser.
    async fn answer_callback(&self, callback_id: &str, text: Option<&str>)
    -> Result<(), BotError>;
}
