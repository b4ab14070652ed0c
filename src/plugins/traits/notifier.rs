use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::utils::error::AppError;

/// Everything a price-drop message needs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PriceDropAlert {
    pub chat_id: String,
    pub title: String,
    pub old_price: Decimal,
    pub new_price: Decimal,
    pub link: String,
}

/// Outbound chat delivery.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Send plain text to the chat identified by `chat_id`.
    async fn send_message(&self, chat_id: &str, text: &str) -> Result<(), AppError>;
}
