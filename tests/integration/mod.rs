// Integration tests for dealwatch
// These tests verify that all components work together correctly

pub mod scheduler_tests;

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

use dealwatch::config::{AppConfig, TelegramConfig};
use dealwatch::plugins::traits::{FetchError, Notifier, ProductFetcher, ProductInfo};
use dealwatch::{AppError, ProductManager, ProductStore, SharedStore};

pub const KETTLE_URL: &str = "https://www.amazon.in/dp/B0KETTLE";
pub const MOUSE_URL: &str = "https://www.amazon.in/dp/B0MOUSE?th=1";
pub const DESK_URL: &str = "https://www.amazon.in/dp/B0DESK";

pub fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

/// Test configuration for integration tests
pub fn get_test_config() -> AppConfig {
    AppConfig {
        telegram: TelegramConfig {
            token: "123456:TEST".to_string(),
            ..TelegramConfig::default()
        },
        ..AppConfig::default()
    }
}

/// Fetcher whose answers are set per URL. Failing URLs are transport errors,
/// URLs without a price read as a layout change.
#[derive(Default)]
pub struct ScriptedFetcher {
    prices: Mutex<HashMap<String, Decimal>>,
    failing: Mutex<HashSet<String>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedFetcher {
    pub fn set_price(&self, url: &str, price: &str) {
        self.prices.lock().unwrap().insert(url.to_string(), dec(price));
        self.failing.lock().unwrap().remove(url);
    }

    pub fn fail(&self, url: &str) {
        self.failing.lock().unwrap().insert(url.to_string());
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProductFetcher for ScriptedFetcher {
    async fn fetch(&self, url: &str) -> Result<ProductInfo, FetchError> {
        self.calls.lock().unwrap().push(url.to_string());

        if self.failing.lock().unwrap().contains(url) {
            return Err(FetchError::Transport {
                url: url.to_string(),
                message: "connection reset".to_string(),
            });
        }

        let price = self.prices.lock().unwrap().get(url).copied();
        match price {
            Some(price) => Ok(ProductInfo {
                url: url.to_string(),
                title: title_for(url),
                price,
            }),
            None => Err(FetchError::Layout {
                url: url.to_string(),
                message: "price element not found".to_string(),
            }),
        }
    }
}

pub fn title_for(url: &str) -> String {
    match url {
        KETTLE_URL => "Electric Kettle".to_string(),
        MOUSE_URL => "Wireless Mouse".to_string(),
        DESK_URL => "Standing Desk".to_string(),
        other => format!("Product {}", other),
    }
}

/// Notifier that keeps every message instead of sending it.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(String, String)>>,
}

impl RecordingNotifier {
    pub fn messages(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn messages_to(&self, chat_id: &str) -> Vec<String> {
        self.messages()
            .into_iter()
            .filter(|(id, _)| id == chat_id)
            .map(|(_, text)| text)
            .collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send_message(&self, chat_id: &str, text: &str) -> Result<(), AppError> {
        self.sent
            .lock()
            .unwrap()
            .push((chat_id.to_string(), text.to_string()));
        Ok(())
    }
}

pub struct TestApp {
    pub dir: TempDir,
    pub store: SharedStore,
    pub fetcher: Arc<ScriptedFetcher>,
    pub notifier: Arc<RecordingNotifier>,
    pub product_manager: Arc<ProductManager>,
}

impl TestApp {
    pub fn data_file(&self) -> std::path::PathBuf {
        self.dir.path().join("data.json")
    }
}

/// Create a product manager over a fresh temporary store
pub fn create_test_app() -> TestApp {
    create_test_app_with(get_test_config())
}

pub fn create_test_app_with(config: AppConfig) -> TestApp {
    let dir = TempDir::new().unwrap();
    let store = ProductStore::load(dir.path().join("data.json")).into_shared();
    let fetcher = Arc::new(ScriptedFetcher::default());
    let notifier = Arc::new(RecordingNotifier::default());
    let product_manager = Arc::new(ProductManager::new(
        Arc::clone(&store),
        fetcher.clone(),
        notifier.clone(),
        &config,
    ));

    TestApp {
        dir,
        store,
        fetcher,
        notifier,
        product_manager,
    }
}
