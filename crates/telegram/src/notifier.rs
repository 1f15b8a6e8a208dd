use std::time::Duration;

use async_trait::async_trait;
use teloxide::{prelude::*, types::Recipient};
use tracing::{debug, warn};

use common::{Delivery, Error, Notifier, Result};

/// Pushes operator messages to one Telegram chat.
pub struct TelegramNotifier {
    bot: Bot,
    chat: Recipient,
    timeout: Duration,
}

impl TelegramNotifier {
    /// `chat` is a numeric chat id or an `@channel` username.
    pub fn new(token: impl Into<String>, chat: &str, timeout: Duration) -> Self {
        Self {
            bot: Bot::new(token),
            chat: parse_recipient(chat),
            timeout,
        }
    }
}

fn parse_recipient(chat: &str) -> Recipient {
    let chat = chat.trim();
    match chat.parse::<i64>() {
        Ok(id) => Recipient::Id(ChatId(id)),
        Err(_) => Recipient::ChannelUsername(chat.to_string()),
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, text: &str) -> Result<Delivery> {
        let request = self.bot.send_message(self.chat.clone(), text).send();
        match tokio::time::timeout(self.timeout, request).await {
            Ok(Ok(_)) => {
                debug!("Telegram message delivered");
                Ok(Delivery::Sent)
            }
            Ok(Err(e)) => {
                warn!(error = %e, "Failed to send Telegram message");
                Err(Error::Notify(e.to_string()))
            }
            Err(_) => {
                warn!(timeout = ?self.timeout, "Telegram send timed out");
                Err(Error::Notify(format!("timed out after {:?}", self.timeout)))
            }
        }
    }

    fn is_configured(&self) -> bool {
        true
    }
}

/// Used when Telegram credentials are not configured: every send is a no-op.
#[derive(Debug, Default)]
pub struct DisabledNotifier;

#[async_trait]
impl Notifier for DisabledNotifier {
    async fn send(&self, _text: &str) -> Result<Delivery> {
        debug!("Telegram not configured, skipping notification");
        Ok(Delivery::Skipped)
    }

    fn is_configured(&self) -> bool {
        false
    }
}
