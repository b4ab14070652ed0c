use config::{Config, ConfigError, Environment, File};
use scraper::Selector;
use serde::{Deserialize, Serialize};
use std::env;
use url::Url;

/// Referral tag used when neither the config nor `AFFILIATE_TAG` supply one.
pub const DEFAULT_AFFILIATE_TAG: &str = "amazingde0df9-21";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub telegram: TelegramConfig,
    pub scraper: ScraperConfig,
    pub scheduler: SchedulerConfig,
    pub storage: StorageConfig,
    pub affiliate: AffiliateConfig,
    pub bot: BotConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    pub token: String,
    pub api_url: String,
    /// Long-poll timeout handed to `getUpdates`, in seconds.
    pub poll_timeout: u64,
    pub request_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScraperConfig {
    pub request_timeout: u64,
    pub user_agent: String,
    pub accept: String,
    pub accept_language: String,
    /// Substring every trackable product URL must contain.
    pub site_marker: String,
    pub selectors: SelectorConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    pub title: String,
    pub price_whole: String,
    pub price_fraction: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub interval_secs: u64,
    pub initial_delay_secs: u64,
    /// When set, the stored price also follows increases (no alert is sent).
    pub track_price_increases: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub data_file: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AffiliateConfig {
    pub tag: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    pub currency_symbol: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// Directory for daily-rolling log files; stdout only when unset.
    pub directory: Option<String>,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            api_url: "https://api.telegram.org".to_string(),
            poll_timeout: 30,
            request_timeout: 45,
        }
    }
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            request_timeout: 30,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/108.0.0.0 Safari/537.36".to_string(),
            accept: "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8,application/signed-exchange;v=b3;q=0.9".to_string(),
            accept_language: "en-IN,en-GB;q=0.9,en-US;q=0.8,en;q=0.7".to_string(),
            site_marker: "amazon".to_string(),
            selectors: SelectorConfig::default(),
        }
    }
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            title: "#productTitle".to_string(),
            price_whole: "span.a-price-whole".to_string(),
            price_fraction: "span.a-price-fraction".to_string(),
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval_secs: 3600,
            initial_delay_secs: 10,
            track_price_increases: false,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_file: "data.json".to_string(),
        }
    }
}

impl Default for AffiliateConfig {
    fn default() -> Self {
        Self {
            tag: DEFAULT_AFFILIATE_TAG.to_string(),
        }
    }
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            currency_symbol: "₹".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            directory: None,
        }
    }
}

impl AppConfig {
    /// Layered load: plain `TELEGRAM_TOKEN`/`AFFILIATE_TAG` as defaults, then
    /// config files, then `DEALWATCH__SECTION__KEY` variables.
    pub fn from_env(config_file: Option<&str>) -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let mut builder = Config::builder()
            .set_default(
                "telegram.token",
                env::var("TELEGRAM_TOKEN").unwrap_or_default(),
            )?
            .set_default(
                "affiliate.tag",
                env::var("AFFILIATE_TAG").unwrap_or_else(|_| DEFAULT_AFFILIATE_TAG.to_string()),
            )?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Local config (ignored by git)
            .add_source(File::with_name("config/local").required(false));

        if let Some(path) = config_file {
            builder = builder.add_source(File::with_name(path));
        }

        let s = builder
            .add_source(Environment::with_prefix("DEALWATCH").separator("__"))
            .build()?;

        let config: AppConfig = s.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.telegram.token.trim().is_empty() {
            return Err(ConfigError::Message(
                "Telegram token is required (set TELEGRAM_TOKEN)".into(),
            ));
        }

        if Url::parse(&self.telegram.api_url).is_err() {
            return Err(ConfigError::Message("Invalid Telegram API URL format".into()));
        }

        if self.telegram.request_timeout <= self.telegram.poll_timeout {
            return Err(ConfigError::Message(
                "Telegram request_timeout must exceed poll_timeout".into(),
            ));
        }

        if self.scraper.request_timeout == 0 {
            return Err(ConfigError::Message("Scraper request_timeout must be greater than 0".into()));
        }

        if self.scraper.site_marker.trim().is_empty() {
            return Err(ConfigError::Message("Scraper site_marker must not be empty".into()));
        }

        let selectors = &self.scraper.selectors;
        for (name, selector) in [
            ("title", &selectors.title),
            ("price_whole", &selectors.price_whole),
            ("price_fraction", &selectors.price_fraction),
        ] {
            if Selector::parse(selector).is_err() {
                return Err(ConfigError::Message(format!(
                    "Invalid CSS selector for {}: {}",
                    name, selector
                )));
            }
        }

        if self.scheduler.interval_secs == 0 {
            return Err(ConfigError::Message("Scheduler interval_secs must be greater than 0".into()));
        }

        if self.storage.data_file.trim().is_empty() {
            return Err(ConfigError::Message("Storage data_file must not be empty".into()));
        }

        Ok(())
    }
}
