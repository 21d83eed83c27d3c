//! Mapping between frankenstein's Bot API types and engine events and menus.

use frankenstein::types::{
    ChatMember, ChatPermissions, InlineKeyboardButton, InlineKeyboardMarkup,
    MaybeInaccessibleMessage, Message, User,
};
use frankenstein::updates::{Update, UpdateContent};

use crate::engine::events::{BotEvent, MenuTarget};
use crate::engine::membership::{MemberPresence, MemberStatus};
use crate::engine::menu::MenuLayout;
use crate::engine::restriction::Subject;

/// Permissions applied to a muted member: nothing may be sent.
pub const MUTED_PERMISSIONS: ChatPermissions = ChatPermissions {
    can_send_messages: Some(false),
    can_send_audios: Some(false),
    can_send_documents: Some(false),
    can_send_photos: Some(false),
    can_send_videos: Some(false),
    can_send_video_notes: Some(false),
    can_send_voice_notes: Some(false),
    can_send_polls: Some(false),
    can_send_other_messages: Some(false),
    can_add_web_page_previews: Some(false),
    can_change_info: None,
    can_invite_users: None,
    can_pin_messages: None,
    can_manage_topics: None,
};

/// Translate an update into an engine event. Updates the bot does not handle,
/// and commands addressed to another bot, yield `None`.
pub fn into_event(update: Update, bot_username: Option<&str>) -> Option<BotEvent> {
    match update.content {
        UpdateContent::ChatMember(changed) => {
            let user = member_user(&changed.new_chat_member);
            Some(BotEvent::MembershipChanged {
                subject: Subject {
                    chat_id: changed.chat.id,
                    user_id: user.id as i64,
                    is_bot: user.is_bot,
                },
                previous: presence(&changed.old_chat_member),
                next: presence(&changed.new_chat_member),
            })
        }
        UpdateContent::CallbackQuery(query) => Some(BotEvent::ButtonPressed {
            callback_id: query.id.clone(),
            from_user_id: query.from.id as i64,
            target: query.message.as_ref().map(menu_target),
            data: query.data.clone().unwrap_or_default(),
        }),
        UpdateContent::Message(message) => start_command(&message, bot_username),
        _ => None,
    }
}

/// Status plus the "still in the chat" flag, which only restricted members carry.
pub fn presence(member: &ChatMember) -> MemberPresence {
    match member {
        ChatMember::Creator(_) => MemberPresence::new(MemberStatus::Owner, false),
        ChatMember::Administrator(_) => MemberPresence::new(MemberStatus::Administrator, false),
        ChatMember::Member(_) => MemberPresence::new(MemberStatus::Member, false),
        ChatMember::Restricted(restricted) => {
            MemberPresence::new(MemberStatus::Restricted, restricted.is_member)
        }
        ChatMember::Left(_) => MemberPresence::new(MemberStatus::Left, false),
        ChatMember::Kicked(_) => MemberPresence::new(MemberStatus::Kicked, false),
    }
}

fn member_user(member: &ChatMember) -> &User {
    match member {
        ChatMember::Creator(m) => &m.user,
        ChatMember::Administrator(m) => &m.user,
        ChatMember::Member(m) => &m.user,
        ChatMember::Restricted(m) => &m.user,
        ChatMember::Left(m) => &m.user,
        ChatMember::Kicked(m) => &m.user,
    }
}

/// Old menu messages come back as inaccessible stubs; both still name the
/// chat and the message id.
fn menu_target(message: &MaybeInaccessibleMessage) -> MenuTarget {
    match message {
        MaybeInaccessibleMessage::Message(m) => MenuTarget {
            chat_id: m.chat.id,
            message_id: m.message_id as i64,
        },
        MaybeInaccessibleMessage::InaccessibleMessage(m) => MenuTarget {
            chat_id: m.chat.id,
            message_id: m.message_id as i64,
        },
    }
}

fn start_command(message: &Message, bot_username: Option<&str>) -> Option<BotEvent> {
    let text = message.text.as_deref()?;
    if !is_start_command(text, bot_username) {
        return None;
    }
    Some(BotEvent::StartCommand {
        chat_id: message.chat.id,
        from_user_id: message.from.as_ref().map(|u| u.id as i64),
    })
}

/// Matches `/start`, `/start payload` and `/start@ThisBot`.
fn is_start_command(text: &str, bot_username: Option<&str>) -> bool {
    let Some(word) = text.split_whitespace().next() else {
        return false;
    };
    let (command, mention) = match word.split_once('@') {
        Some((command, mention)) => (command, Some(mention)),
        None => (word, None),
    };
    if command != "/start" {
        return false;
    }
    match (mention, bot_username) {
        (Some(mention), Some(me)) => mention.eq_ignore_ascii_case(me),
        _ => true,
    }
}

/// Inline keyboard for a rendered menu.
pub fn keyboard(layout: &MenuLayout) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup {
        inline_keyboard: layout
            .rows
            .iter()
            .map(|row| {
                row.iter()
                    .map(|button| {
                        InlineKeyboardButton::builder()
                            .text(button.label.clone())
                            .callback_data(button.action.encode())
                            .build()
                    })
                    .collect()
            })
            .collect(),
    }
}
