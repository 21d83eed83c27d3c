/// Errors produced by the settings store and the Telegram transport.
///
/// None of these ever reach chat users; callers log them and carry on.
#[derive(Debug, thiserror::Error)]
pub enum BotError {
    /// A mute duration outside the accepted range was requested. Settings are unchanged.
    #[error("invalid mute duration: {0}s (must be positive and at most 100 years)")]
    InvalidDuration(i64),

    /// The settings database could not be read or written.
    #[error("settings storage unavailable: {0}")]
    Storage(#[from] sqlx::Error),

    /// Telegram answered the call with `ok: false`.
    #[error("telegram rejected {method}: {description}")]
    TransportRejected { method: String, description: String },

    /// The request to Telegram failed before an API answer came back, or the
    /// answer could not be decoded.
    #[error("telegram request failed: {0}")]
    Request(#[source] frankenstein::Error),

    /// The HTTP client could not be built.
    #[error("http client setup failed: {0}")]
    Http(#[from] reqwest::Error),
}

impl BotError {
    /// Telegram refuses to edit a message into an identical state. The menu
    /// already shows what we wanted, so callers treat this as success.
    pub fn is_not_modified(&self) -> bool {
        matches!(
            self,
            BotError::TransportRejected { description, .. }
                if description.contains("message is not modified")
        )
    }
}
