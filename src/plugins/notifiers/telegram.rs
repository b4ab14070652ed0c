use crate::config::TelegramConfig;
use crate::plugins::traits::Notifier;
use crate::utils::error::AppError;
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;

/// Envelope every Bot API method answers with.
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub message_id: i64,
    pub chat: Chat,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BotUser {
    pub id: i64,
    pub username: Option<String>,
}

/// Telegram Bot API client: delivers messages and long-polls for updates.
pub struct TelegramNotifier {
    client: Client,
    method_url: String,
}

impl TelegramNotifier {
    pub fn new(config: &TelegramConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout))
            .build()?;

        Ok(Self {
            client,
            method_url: format!("{}/bot{}", config.api_url.trim_end_matches('/'), config.token),
        })
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        payload: &serde_json::Value,
    ) -> Result<T, AppError> {
        // The token is part of the URL, so errors are stripped of it before surfacing.
        let response = self
            .client
            .post(format!("{}/{}", self.method_url, method))
            .json(payload)
            .send()
            .await
            .map_err(|e| AppError::Http(e.without_url()))?;

        let body: ApiResponse<T> = response
            .json()
            .await
            .map_err(|e| AppError::Http(e.without_url()))?;

        match (body.ok, body.result) {
            (true, Some(result)) => Ok(result),
            _ => Err(AppError::Telegram {
                description: body
                    .description
                    .unwrap_or_else(|| format!("{} failed without description", method)),
            }),
        }
    }

    /// Identify the bot; used at startup to verify the token.
    pub async fn get_me(&self) -> Result<BotUser, AppError> {
        self.call("getMe", &json!({})).await
    }

    /// Long-poll for text messages newer than `offset`.
    pub async fn get_updates(&self, offset: Option<i64>, timeout: u64) -> Result<Vec<Update>, AppError> {
        let mut payload = json!({
            "timeout": timeout,
            "allowed_updates": ["message"],
        });
        if let Some(offset) = offset {
            payload["offset"] = json!(offset);
        }

        self.call("getUpdates", &payload).await
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send_message(&self, chat_id: &str, text: &str) -> Result<(), AppError> {
        let payload = json!({
            "chat_id": chat_id,
            "text": text,
        });

        let _sent: Message = self.call("sendMessage", &payload).await?;
        Ok(())
    }
}
