//! Telegram notifications for the covered options bot.
//!
//! Messages go to a single chat through `teloxide`, wrapped in `<code>` so
//! reports render monospaced. Delivery is best effort: failures are logged
//! and never reach the caller.

use async_trait::async_trait;
use options_bot_core::{Notifier, TelegramEnv};
use secrecy::{ExposeSecret, SecretString};
use teloxide::payloads::SendMessageSetters;
use teloxide::prelude::Requester;
use teloxide::types::{ChatId, ParseMode, Recipient};
use teloxide::utils::html;
use teloxide::{Bot, RequestError};

/// Numeric chat IDs address a chat directly, anything else is a channel username.
fn recipient(chat_id: &str) -> Recipient {
    match chat_id.trim().parse::<i64>() {
        Ok(id) => Recipient::Id(ChatId(id)),
        Err(_) => Recipient::ChannelUsername(chat_id.trim().to_string()),
    }
}

/// Sends bot notifications to one Telegram chat.
pub struct TelegramNotifier {
    bot: Bot,
    chat: Recipient,
    bot_token: SecretString,
}

impl std::fmt::Debug for TelegramNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramNotifier")
            .field("chat", &self.chat)
            .finish_non_exhaustive()
    }
}

impl TelegramNotifier {
    /// Creates a notifier for the chat in `env`.
    pub fn new(env: TelegramEnv) -> Self {
        Self {
            bot: Bot::new(env.bot_token.expose_secret()),
            chat: recipient(&env.chat_id),
            bot_token: env.bot_token,
        }
    }

    /// Sets a custom Bot API URL (useful for testing).
    #[must_use]
    pub fn with_api_url(mut self, url: reqwest::Url) -> Self {
        self.bot = self.bot.set_api_url(url);
        self
    }

    async fn try_send(&self, msg: &str, silent: bool) -> Result<(), RequestError> {
        self.bot
            .send_message(self.chat.clone(), html::code_inline(msg))
            .parse_mode(ParseMode::Html)
            .disable_notification(silent)
            .await?;
        Ok(())
    }

    // Transport errors carry the request URL, which embeds the token.
    fn describe(&self, err: &RequestError) -> String {
        err.to_string()
            .replace(self.bot_token.expose_secret(), "<redacted>")
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send_message(&self, msg: &str, silent: bool) {
        match self.try_send(msg, silent).await {
            Ok(()) => tracing::debug!(silent, "[telegram] message sent"),
            Err(e) => tracing::error!("[telegram] error: {}", self.describe(&e)),
        }
    }
}
