use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::plugins::notifiers::telegram::{TelegramNotifier, Update};
use crate::product_manager::ProductManager;

pub mod handlers;
pub mod responses;

pub use handlers::{handle_message, parse_command, Command};
pub use responses::MessageFormatter;

const POLL_ERROR_PAUSE: Duration = Duration::from_secs(5);

/// Long-polls Telegram and answers each message on its own task.
pub struct TelegramBot {
    client: Arc<TelegramNotifier>,
    product_manager: Arc<ProductManager>,
    poll_timeout: u64,
    username: Option<String>,
}

impl TelegramBot {
    pub fn new(
        client: Arc<TelegramNotifier>,
        product_manager: Arc<ProductManager>,
        poll_timeout: u64,
        username: Option<String>,
    ) -> Self {
        Self {
            client,
            product_manager,
            poll_timeout,
            username,
        }
    }

    /// Serve updates until `shutdown` resolves.
    pub async fn run(&self, shutdown: impl Future<Output = ()>) {
        tokio::pin!(shutdown);
        let mut offset: Option<i64> = None;

        tracing::info!("Telegram bot polling for updates");

        loop {
            let result = tokio::select! {
                _ = &mut shutdown => break,
                result = self.client.get_updates(offset, self.poll_timeout) => result,
            };

            match result {
                Ok(updates) => {
                    for update in updates {
                        offset = Some(update.update_id + 1);
                        self.dispatch(update);
                    }
                }
                Err(e) => {
                    tracing::warn!("Failed to fetch updates: {}", e);
                    tokio::select! {
                        _ = &mut shutdown => break,
                        _ = tokio::time::sleep(POLL_ERROR_PAUSE) => {}
                    }
                }
            }
        }

        tracing::info!("Telegram bot stopped polling");
    }

    fn dispatch(&self, update: Update) {
        let Some(message) = update.message else {
            return;
        };
        let Some(text) = message.text else {
            return;
        };

        let client = Arc::clone(&self.client);
        let product_manager = Arc::clone(&self.product_manager);
        let username = self.username.clone();
        let chat_id = message.chat.id.to_string();

        tokio::spawn(async move {
            if let Err(e) = handle_message(
                &product_manager,
                client.as_ref(),
                &chat_id,
                &text,
                username.as_deref(),
            )
            .await
            {
                tracing::error!("Failed to handle message from {}: {}", chat_id, e);
            }
        });
    }
}
