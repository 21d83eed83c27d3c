use std::sync::Arc;
use std::time::Duration;

use frankenstein::updates::Update;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::client::TelegramClient;
use super::types::into_event;
use crate::engine::bot_engine::BotEngine;
use crate::engine::events::BotEvent;

/// Pause before retrying after `getUpdates` fails.
const RETRY_DELAY: Duration = Duration::from_secs(5);

/// Long-poll Telegram and feed every update to the engine, one at a time,
/// until `cancel` fires.
pub async fn run_polling(
    client: Arc<TelegramClient>,
    engine: Arc<BotEngine>,
    bot_username: Option<String>,
    poll_timeout: Duration,
    cancel: CancellationToken,
) {
    let mut offset = 0;
    info!(timeout_secs = poll_timeout.as_secs(), "polling for updates");

    loop {
        let batch = tokio::select! {
            _ = cancel.cancelled() => break,
            result = client.get_updates(offset, poll_timeout) => result,
        };

        let updates = match batch {
            Ok(updates) => updates,
            Err(e) => {
                warn!(error = %e, "failed to fetch updates, retrying in {}s", RETRY_DELAY.as_secs());
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(RETRY_DELAY) => continue,
                }
            }
        };

        for raw in updates {
            offset = next_offset(offset, &raw);
            if let Some(event) = decode_update(raw, bot_username.as_deref()) {
                let outcome = engine.handle_event(event).await;
                debug!(?outcome, "update handled");
            }
        }
    }

    info!("polling stopped");
}

/// Offset that acknowledges `raw` on the next `getUpdates` call.
fn next_offset(current: i64, raw: &Value) -> i64 {
    raw.get("update_id")
        .and_then(Value::as_i64)
        .map(|id| current.max(id + 1))
        .unwrap_or(current)
}

/// Decode one raw update. Partial or unexpected updates are skipped quietly.
fn decode_update(raw: Value, bot_username: Option<&str>) -> Option<BotEvent> {
    match serde_json::from_value::<Update>(raw) {
        Ok(update) => into_event(update, bot_username),
        Err(e) => {
            debug!(error = %e, "skipping malformed update");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_offset_advances_past_update() {
        assert_eq!(next_offset(0, &json!({"update_id": 41})), 42);
        assert_eq!(next_offset(100, &json!({"update_id": 41})), 100);
        assert_eq!(next_offset(5, &json!({"no_id": true})), 5);
    }

    #[test]
    fn test_malformed_chat_member_is_skipped() {
        // new_chat_member missing entirely
        let raw = json!({
            "update_id": 1,
            "chat_member": {
                "chat": {"id": -1, "type": "group"},
                "from": {"id": 2, "is_bot": false, "first_name": "A"},
                "date": 0,
                "old_chat_member": {"status": "left", "user": {"id": 2, "is_bot": false, "first_name": "A"}}
            }
        });
        assert_eq!(next_offset(0, &raw), 2);
        assert!(decode_update(raw, None).is_none());
    }

    #[test]
    fn test_unknown_member_status_is_skipped() {
        let member = |status: &str| {
            json!({"status": status, "user": {"id": 2, "is_bot": false, "first_name": "A"}})
        };
        let raw = json!({
            "update_id": 4,
            "chat_member": {
                "chat": {"id": -1, "type": "group"},
                "from": {"id": 2, "is_bot": false, "first_name": "A"},
                "date": 0,
                "old_chat_member": member("brand_new_status"),
                "new_chat_member": member("member")
            }
        });
        assert_eq!(next_offset(0, &raw), 5);
        assert!(decode_update(raw, None).is_none());
    }

    #[test]
    fn test_well_formed_update_decodes() {
        let raw = json!({
            "update_id": 3,
            "callback_query": {
                "id": "q",
                "from": {"id": 8, "is_bot": false, "first_name": "B"},
                "chat_instance": "c",
                "data": "{\"callback\":\"update_enabled\"}"
            }
        });
        let Some(BotEvent::ButtonPressed { target, data, .. }) = decode_update(raw, None) else {
            panic!("expected a button press");
        };
        assert!(target.is_none());
        assert_eq!(data, r#"{"callback":"update_enabled"}"#);
    }
}
