//! Telegram delivery of performance announcements.

use async_trait::async_trait;
use reqwest::{Client, Request};
use serde::Serialize;

use prospero_core::{Config, Notifier, NotifyError};

const API_BASE: &str = "https://api.telegram.org";
const PARSE_MODE: &str = "Markdown";

#[derive(Serialize)]
struct SendMessage<'msg> {
    chat_id: &'msg str,
    text: &'msg str,
    parse_mode: &'static str,
}

/// Posts every message to all configured chats through the Bot API.
pub(crate) struct TelegramNotifier {
    client: Client,
    endpoint: String,
    chat_ids: Vec<String>,
}

impl TelegramNotifier {
    pub(crate) fn new(client: Client, config: &Config) -> Self {
        Self::with_endpoint(
            client,
            format!("{API_BASE}/bot{}/sendMessage", config.telegram_bot_token),
            config.telegram_chat_ids.clone(),
        )
    }

    fn with_endpoint(client: Client, endpoint: String, chat_ids: Vec<String>) -> Self {
        Self {
            client,
            endpoint,
            chat_ids,
        }
    }

    // The endpoint carries the bot token, so it is stripped from transport errors.
    fn request(&self, chat_id: &str, text: &str) -> Result<Request, NotifyError> {
        let payload = SendMessage {
            chat_id,
            text,
            parse_mode: PARSE_MODE,
        };

        self.client
            .post(&self.endpoint)
            .json(&payload)
            .build()
            .map_err(|err| NotifyError::Network(err.without_url()))
    }

    async fn send(&self, chat_id: &str, text: &str) -> Result<(), NotifyError> {
        let request = self.request(chat_id, text)?;
        let response = self
            .client
            .execute(request)
            .await
            .map_err(|err| NotifyError::Network(err.without_url()))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(NotifyError::Rejected {
                endpoint: chat_id.to_owned(),
                status,
            })
        }
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn notify(&self, body: &str) -> Result<(), NotifyError> {
        let mut first_failure = None;

        for chat_id in &self.chat_ids {
            match self.send(chat_id, body).await {
                Ok(()) => tracing::debug!(chat = %chat_id, "message delivered"),
                Err(err) => {
                    tracing::warn!(chat = %chat_id, error = %err, "telegram delivery failed");
                    if first_failure.is_none() {
                        first_failure = Some(err);
                    }
                }
            }
        }

        first_failure.map_or(Ok(()), Err)
    }
}
