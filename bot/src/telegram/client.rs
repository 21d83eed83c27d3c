use std::time::Duration;

use async_trait::async_trait;
use frankenstein::client_reqwest::Bot;
use frankenstein::methods::{
    AnswerCallbackQueryParams, EditMessageReplyMarkupParams, RestrictChatMemberParams,
    SendMessageParams,
};
use frankenstein::types::{ReplyMarkup, User};
use frankenstein::{AsyncTelegramApi, ParseMode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::types::{MUTED_PERMISSIONS, keyboard};
use crate::engine::events::MenuTarget;
use crate::engine::menu::MenuLayout;
use crate::engine::restriction::RestrictionCommand;
use crate::engine::transport::Transport;
use crate::error::BotError;

/// Update kinds requested from `getUpdates`. `chat_member` is only delivered
/// when asked for explicitly.
pub const ALLOWED_UPDATES: &[&str] = &["message", "callback_query", "chat_member"];

/// `getUpdates` is sent through the raw request path so the batch comes back
/// undecoded: one update frankenstein cannot parse must not hide the rest.
#[derive(Debug, Serialize)]
struct GetUpdatesParams<'a> {
    offset: i64,
    timeout: u64,
    allowed_updates: &'a [&'a str],
}

#[derive(Deserialize)]
struct RawUpdates {
    result: Vec<serde_json::Value>,
}

/// Telegram Bot API client: frankenstein's reqwest bot plus error mapping.
pub struct TelegramClient {
    bot: Bot,
}

impl TelegramClient {
    /// `poll_timeout` is the long-poll wait; the HTTP timeout leaves headroom on top of it.
    pub fn new(api_url: &str, token: &str, poll_timeout: Duration) -> Result<Self, BotError> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(poll_timeout + Duration::from_secs(10))
            .build()?;
        let bot = Bot::builder()
            .api_url(bot_api_url(api_url, token))
            .client(http)
            .build();
        Ok(Self { bot })
    }

    /// The bot's own account. Fails if the token is wrong.
    pub async fn get_me(&self) -> Result<User, BotError> {
        let response = self
            .bot
            .get_me()
            .await
            .map_err(|e| rejected("getMe", e))?;
        Ok(response.result)
    }

    /// Long-poll for updates after `offset`.
    pub async fn get_updates(
        &self,
        offset: i64,
        timeout: Duration,
    ) -> Result<Vec<serde_json::Value>, BotError> {
        let params = GetUpdatesParams {
            offset,
            timeout: timeout.as_secs(),
            allowed_updates: ALLOWED_UPDATES,
        };
        let updates: RawUpdates = self
            .bot
            .request("getUpdates", Some(&params))
            .await
            .map_err(|e| rejected("getUpdates", e))?;
        Ok(updates.result)
    }
}

/// `{api_url}/bot{token}`, the base every method name is appended to.
fn bot_api_url(api_url: &str, token: &str) -> String {
    format!("{}/bot{}", api_url.trim_end_matches('/'), token)
}

/// Keep Telegram's own refusal apart from failures to reach it.
fn rejected(method: &str, error: frankenstein::Error) -> BotError {
    match error {
        frankenstein::Error::Api(response) => BotError::TransportRejected {
            method: method.to_string(),
            description: response.description,
        },
        other => BotError::Request(other),
    }
}

fn restrict_params(command: &RestrictionCommand) -> RestrictChatMemberParams {
    RestrictChatMemberParams::builder()
        .chat_id(command.chat_id)
        .user_id(command.user_id as u64)
        .permissions(MUTED_PERMISSIONS)
        .use_independent_chat_permissions(true)
        .until_date(command.until.timestamp().max(0) as u64)
        .build()
}

#[async_trait]
impl Transport for TelegramClient {
    async fn restrict_member(&self, command: &RestrictionCommand) -> Result<(), BotError> {
        debug!(chat_id = command.chat_id, user_id = command.user_id, "restrictChatMember");
        self.bot
            .restrict_chat_member(&restrict_params(command))
            .await
            .map_err(|e| rejected("restrictChatMember", e))?;
        Ok(())
    }

    async fn send_menu(
        &self,
        chat_id: i64,
        text: &str,
        layout: &MenuLayout,
    ) -> Result<(), BotError> {
        let params = SendMessageParams::builder()
            .chat_id(chat_id)
            .text(text.to_string())
            .parse_mode(ParseMode::Markdown)
            .reply_markup(ReplyMarkup::InlineKeyboardMarkup(keyboard(layout)))
            .build();
        self.bot
            .send_message(&params)
            .await
            .map_err(|e| rejected("sendMessage", e))?;
        Ok(())
    }

    async fn edit_menu(&self, target: MenuTarget, layout: &MenuLayout) -> Result<(), BotError> {
        let params = EditMessageReplyMarkupParams::builder()
            .chat_id(target.chat_id)
            .message_id(target.message_id as i32)
            .reply_markup(keyboard(layout))
            .build();
        self.bot
            .edit_message_reply_markup(&params)
            .await
            .map_err(|e| rejected("editMessageReplyMarkup", e))?;
        Ok(())
    }

    async fn answer_callback(
        &self,
        callback_id: &str,
        text: Option<&str>,
    ) -> Result<(), BotError> {
        let params = match text {
            Some(text) => AnswerCallbackQueryParams::builder()
                .callback_query_id(callback_id.to_string())
                .text(text.to_string())
                .build(),
            None => AnswerCallbackQueryParams::builder()
                .callback_query_id(callback_id.to_string())
                .build(),
        };
        self.bot
            .answer_callback_query(&params)
            .await
            .map_err(|e| rejected("answerCallbackQuery", e))?;
        Ok(())
    }
}
