use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

use super::events::{BotEvent, MenuTarget};
use super::membership::{MemberPresence, Transition, classify};
use super::menu::{MenuAction, MenuStateMachine, MenuView};
use super::restriction::{RestrictionCommand, Subject, on_joined};
use super::settings_store::SettingsStore;
use super::transport::Transport;
use crate::error::BotError;

/// Reply to `/start`. Markdown.
pub const WELCOME_TEXT: &str = "Hi, *thank you* for adding me to this group! Don't forget to make me administrator.\nYou can enable the bot by clicking \"*Bot enabled*\" and you can change the settings by clicking \"*Bot settings*\".";

/// Notice shown to non-admins who press a menu button.
pub const NOT_ALLOWED_TEXT: &str = "Only administrators can change these settings.";

/// What handling one event amounted to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventOutcome {
    Ignored,
    /// A restriction was handed to the transport. Its result arrives later.
    RestrictionIssued(RestrictionCommand),
    MemberLeft,
    MenuSent,
    MenuUpdated(MenuView),
    /// The presser is not on the admin allowlist.
    Denied,
}

/// Routes inbound events through the classifier, the restriction controller
/// and the menu, and sends the resulting commands to the transport.
///
/// Handlers never return errors: failures are logged and the next event is
/// processed normally.
pub struct BotEngine {
    store: Arc<SettingsStore>,
    menu: MenuStateMachine,
    transport: Arc<dyn Transport>,
    /// Users allowed to operate the menu. Empty means everyone.
    admin_user_ids: HashSet<i64>,
    /// In-flight restriction commands.
    tasks: TaskTracker,
}

impl BotEngine {
    pub fn new(
        store: Arc<SettingsStore>,
        transport: Arc<dyn Transport>,
        admin_user_ids: impl IntoIterator<Item = i64>,
    ) -> Self {
        Self {
            menu: MenuStateMachine::new(store.clone()),
            store,
            transport,
            admin_user_ids: admin_user_ids.into_iter().collect(),
            tasks: TaskTracker::new(),
        }
    }

    pub async fn handle_event(&self, event: BotEvent) -> EventOutcome {
        match event {
            BotEvent::MembershipChanged {
                subject,
                previous,
                next,
            } => self.on_membership_changed(subject, previous, next).await,
            BotEvent::ButtonPressed {
                callback_id,
                from_user_id,
                target,
                data,
            } => {
                self.on_button_pressed(&callback_id, from_user_id, target, &data)
                    .await
            }
            BotEvent::StartCommand {
                chat_id,
                from_user_id,
            } => self.on_start(chat_id, from_user_id).await,
        }
    }

    /// Wait for in-flight restriction commands to finish.
    pub async fn shutdown(&self) {
        self.tasks.close();
        self.tasks.wait().await;
    }

    // ── Membership ──────────────────────────────────────────────────

    async fn on_membership_changed(
        &self,
        subject: Subject,
        previous: MemberPresence,
        next: MemberPresence,
    ) -> EventOutcome {
        match classify(previous, next) {
            Transition::NoOp => EventOutcome::Ignored,
            Transition::Left => {
                debug!(chat_id = subject.chat_id, user_id = subject.user_id, "member left");
                EventOutcome::MemberLeft
            }
            Transition::Joined => {
                // Read fresh: an admin may have just toggled the bot
                let settings = match self.store.current().await {
                    Ok(settings) => settings,
                    Err(e) => {
                        error!(error = %e, "failed to read settings for new member");
                        return EventOutcome::Ignored;
                    }
                };

                let Some(command) = on_joined(&settings, &subject, Utc::now()) else {
                    debug!(
                        chat_id = subject.chat_id,
                        user_id = subject.user_id,
                        enabled = settings.enabled,
                        is_bot = subject.is_bot,
                        "member joined, no restriction"
                    );
                    return EventOutcome::Ignored;
                };

                self.spawn_restriction(command);
                EventOutcome::RestrictionIssued(command)
            }
        }
    }

    /// Fire the restriction without holding up the event loop.
    fn spawn_restriction(&self, command: RestrictionCommand) {
        let transport = self.transport.clone();
        self.tasks.spawn(async move {
            match transport.restrict_member(&command).await {
                Ok(()) => info!(
                    chat_id = command.chat_id,
                    user_id = command.user_id,
                    until = %command.until,
                    "muted new member"
                ),
                Err(e) => warn!(
                    chat_id = command.chat_id,
                    user_id = command.user_id,
                    error = %e,
                    "failed to mute new member"
                ),
            }
        });
    }

    // ── Menu ────────────────────────────────────────────────────────

    async fn on_start(&self, chat_id: i64, from_user_id: Option<i64>) -> EventOutcome {
        let update = match self.menu.open().await {
            Ok(update) => update,
            Err(e) => {
                error!(%chat_id, error = %e, "failed to read settings for menu");
                return EventOutcome::Ignored;
            }
        };

        match self
            .transport
            .send_menu(chat_id, WELCOME_TEXT, &update.layout)
            .await
        {
            Ok(()) => {
                info!(%chat_id, ?from_user_id, "menu posted");
                EventOutcome::MenuSent
            }
            Err(e) => {
                warn!(%chat_id, error = %e, "failed to post menu");
                EventOutcome::Ignored
            }
        }
    }

    async fn on_button_pressed(
        &self,
        callback_id: &str,
        from_user_id: i64,
        target: Option<MenuTarget>,
        data: &str,
    ) -> EventOutcome {
        if !self.is_admin(from_user_id) {
            info!(%from_user_id, "menu press from non-admin rejected");
            self.ack(callback_id, Some(NOT_ALLOWED_TEXT)).await;
            return EventOutcome::Denied;
        }

        let action = MenuAction::decode(data);
        let update = match self.menu.apply(action).await {
            Ok(Some(update)) => update,
            Ok(None) => {
                debug!(%from_user_id, %data, "unrecognized button payload");
                self.ack(callback_id, None).await;
                return EventOutcome::Ignored;
            }
            Err(BotError::InvalidDuration(seconds)) => {
                warn!(%from_user_id, seconds, "rejected invalid mute duration");
                self.ack(callback_id, None).await;
                return EventOutcome::Ignored;
            }
            Err(e) => {
                error!(%from_user_id, ?action, error = %e, "failed to apply menu action");
                self.ack(callback_id, None).await;
                return EventOutcome::Ignored;
            }
        };

        if update.changed {
            info!(
                %from_user_id,
                ?action,
                settings = ?update.settings,
                "settings changed from menu"
            );
        }

        self.ack(callback_id, None).await;

        let Some(target) = target else {
            debug!("menu message unavailable, nothing to re-render");
            return EventOutcome::MenuUpdated(update.view);
        };
        match self.transport.edit_menu(target, &update.layout).await {
            Ok(()) => {}
            Err(e) if e.is_not_modified() => debug!("menu already up to date"),
            Err(e) => warn!(chat_id = target.chat_id, error = %e, "failed to update menu"),
        }
        EventOutcome::MenuUpdated(update.view)
    }

    async fn ack(&self, callback_id: &str, text: Option<&str>) {
        if let Err(e) = self.transport.answer_callback(callback_id, text).await {
            warn!(%callback_id, error = %e, "failed to answer button press");
        }
    }

    fn is_admin(&self, user_id: i64) -> bool {
        self.admin_user_ids.is_empty() || self.admin_user_ids.contains(&user_id)
    }
}
