use url::Url;

use super::responses::{
    CHECKING_PRODUCT, GREETING, HELP, NOT_A_PRODUCT_LINK, PRODUCT_UNAVAILABLE, SAVE_FAILED,
};
use crate::plugins::traits::Notifier;
use crate::product_manager::{ProductManager, TrackError};
use crate::utils::error::AppError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    List,
    Unknown(String),
    Text(String),
}

/// Classify an incoming message. `/cmd@other_bot` is treated as plain text.
pub fn parse_command(text: &str, bot_username: Option<&str>) -> Command {
    let text = text.trim();
    let Some(rest) = text.strip_prefix('/') else {
        return Command::Text(text.to_string());
    };

    let word = rest.split_whitespace().next().unwrap_or_default();
    let (name, addressee) = match word.split_once('@') {
        Some((name, addressee)) => (name, Some(addressee)),
        None => (word, None),
    };

    if let (Some(addressee), Some(username)) = (addressee, bot_username) {
        if !addressee.eq_ignore_ascii_case(username) {
            return Command::Text(text.to_string());
        }
    }

    match name.to_ascii_lowercase().as_str() {
        "start" => Command::Start,
        "help" => Command::Help,
        "list" => Command::List,
        other => Command::Unknown(other.to_string()),
    }
}

/// The first http(s) link in the message, or the whole message when it has none.
pub fn extract_product_url(text: &str) -> String {
    text.split_whitespace()
        .find(|token| {
            Url::parse(token)
                .map(|url| matches!(url.scheme(), "http" | "https"))
                .unwrap_or(false)
        })
        .unwrap_or(text.trim())
        .to_string()
}

/// Answer one message from `chat_id`. Replies go out through `notifier`.
pub async fn handle_message(
    manager: &ProductManager,
    notifier: &dyn Notifier,
    chat_id: &str,
    text: &str,
    bot_username: Option<&str>,
) -> Result<(), AppError> {
    match parse_command(text, bot_username) {
        Command::Start => notifier.send_message(chat_id, GREETING).await,
        Command::Help => notifier.send_message(chat_id, HELP).await,
        Command::Unknown(name) => {
            tracing::debug!("Unknown command /{} from {}", name, chat_id);
            notifier.send_message(chat_id, HELP).await
        }
        Command::List => {
            let watchlist = manager.list_products(chat_id).await;
            for message in manager.formatter().watchlist(watchlist.as_ref()) {
                notifier.send_message(chat_id, &message).await?;
            }
            Ok(())
        }
        Command::Text(text) => track_from_text(manager, notifier, chat_id, &text).await,
    }
}

async fn track_from_text(
    manager: &ProductManager,
    notifier: &dyn Notifier,
    chat_id: &str,
    text: &str,
) -> Result<(), AppError> {
    let url = extract_product_url(text);
    if !manager.is_trackable(&url) {
        return notifier.send_message(chat_id, NOT_A_PRODUCT_LINK).await;
    }

    notifier.send_message(chat_id, CHECKING_PRODUCT).await?;

    let reply = match manager.track_product(chat_id, &url).await {
        Ok(confirmation) => manager.formatter().track_confirmation(&confirmation),
        Err(TrackError::InvalidUrl { .. }) => NOT_A_PRODUCT_LINK.to_string(),
        Err(TrackError::ProductUnavailable(e)) => {
            tracing::info!("Could not track {} for {}: {}", url, chat_id, e);
            PRODUCT_UNAVAILABLE.to_string()
        }
        Err(TrackError::Storage(e)) => {
            tracing::error!("Failed to save product for {}: {}", chat_id, e);
            SAVE_FAILED.to_string()
        }
    };

    notifier.send_message(chat_id, &reply).await
}
