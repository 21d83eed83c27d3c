use chrono::{DateTime, TimeDelta, Utc};

use super::settings_store::Settings;

/// Who just joined, and where.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subject {
    pub chat_id: i64,
    pub user_id: i64,
    pub is_bot: bool,
}

/// Mute `user_id` in `chat_id` until `until`: no messages, media or
/// anything else. The platform lifts it on its own at expiry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestrictionCommand {
    pub chat_id: i64,
    pub user_id: i64,
    pub until: DateTime<Utc>,
}

/// Decide whether a freshly joined member should be muted.
/// Only decides; executing the command is the transport's job.
///
/// An expiry past what `DateTime` can hold is capped at its maximum. Telegram
/// then decides what such a date means.
pub fn on_joined(
    settings: &Settings,
    subject: &Subject,
    now: DateTime<Utc>,
) -> Option<RestrictionCommand> {
    if !settings.enabled || subject.is_bot {
        return None;
    }
    Some(RestrictionCommand {
        chat_id: subject.chat_id,
        user_id: subject.user_id,
        until: expiry(now, settings.mute_duration_seconds),
    })
}

fn expiry(now: DateTime<Utc>, seconds: i64) -> DateTime<Utc> {
    TimeDelta::try_seconds(seconds)
        .and_then(|delta| now.checked_add_signed(delta))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::settings_store::MAX_MUTE_DURATION_SECS;

    fn human() -> Subject {
        Subject {
            chat_id: -1001,
            user_id: 42,
            is_bot: false,
        }
    }

    fn bot() -> Subject {
        Subject {
            is_bot: true,
            ..human()
        }
    }

    #[test]
    fn test_disabled_never_restricts() {
        let settings = Settings {
            enabled: false,
            mute_duration_seconds: 300,
        };
        let now = Utc::now();
        assert!(on_joined(&settings, &human(), now).is_none());
        assert!(on_joined(&settings, &bot(), now).is_none());
    }

    #[test]
    fn test_bots_are_not_restricted() {
        let settings = Settings {
            enabled: true,
            mute_duration_seconds: 300,
        };
        assert!(on_joined(&settings, &bot(), Utc::now()).is_none());
    }

    #[test]
    fn test_human_gets_restricted_for_configured_duration() {
        let settings = Settings {
            enabled: true,
            mute_duration_seconds: 300,
        };
        let now = Utc::now();
        let cmd = on_joined(&settings, &human(), now).unwrap();
        assert_eq!(cmd.chat_id, -1001);
        assert_eq!(cmd.user_id, 42);
        assert_eq!(cmd.until - now, TimeDelta::seconds(300));
    }

    #[test]
    fn test_overflowing_duration_is_capped() {
        let now = Utc::now();
        for seconds in [10_000_000_000_000, i64::MAX] {
            let settings = Settings {
                enabled: true,
                mute_duration_seconds: seconds,
            };
            let cmd = on_joined(&settings, &human(), now).unwrap();
            assert_eq!(cmd.until, DateTime::<Utc>::MAX_UTC);
        }
    }

    #[test]
    fn test_longest_accepted_duration_fits() {
        let now = Utc::now();
        let settings = Settings {
            enabled: true,
            mute_duration_seconds: MAX_MUTE_DURATION_SECS,
        };
        let cmd = on_joined(&settings, &human(), now).unwrap();
        assert_eq!(cmd.until - now, TimeDelta::seconds(MAX_MUTE_DURATION_SECS));
    }

    #[test]
    fn test_expiry_follows_duration() {
        let now = Utc::now();
        for seconds in [30, 60, 600, 86_400] {
            let settings = Settings {
                enabled: true,
                mute_duration_seconds: seconds,
            };
            let cmd = on_joined(&settings, &human(), now).unwrap();
            assert_eq!(cmd.until, now + TimeDelta::seconds(seconds));
        }
    }
}
