use async_trait::async_trait;
use regex::Regex;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, USER_AGENT};
use reqwest::Client;
use rust_decimal::Decimal;
use scraper::{Html, Selector};
use std::str::FromStr;
use std::time::{Duration, Instant};

use crate::config::{ScraperConfig, SelectorConfig};
use crate::plugins::traits::{FetchError, ProductFetcher, ProductInfo};
use crate::utils::error::AppError;

/// Extracts title and price from a product page.
///
/// All knowledge of the page markup lives here so that a layout change only
/// ever means new selectors.
pub struct PageParser {
    title: Selector,
    price_whole: Selector,
    price_fraction: Selector,
    non_numeric: Regex,
}

impl PageParser {
    pub fn new(selectors: &SelectorConfig) -> Result<Self, AppError> {
        Ok(Self {
            title: parse_selector(&selectors.title)?,
            price_whole: parse_selector(&selectors.price_whole)?,
            price_fraction: parse_selector(&selectors.price_fraction)?,
            non_numeric: Regex::new(r"[^\d.]")
                .map_err(|e| AppError::Internal(format!("Invalid price pattern: {}", e)))?,
        })
    }

    pub fn parse(&self, url: &str, html: &str) -> Result<ProductInfo, FetchError> {
        let document = Html::parse_document(html);

        let title = document
            .select(&self.title)
            .next()
            .map(|element| element.text().collect::<String>().trim().to_string())
            .filter(|title| !title.is_empty())
            .ok_or_else(|| FetchError::Layout {
                url: url.to_string(),
                message: "title element not found".to_string(),
            })?;

        let whole = document
            .select(&self.price_whole)
            .next()
            .map(|element| element.text().collect::<String>())
            .ok_or_else(|| FetchError::Layout {
                url: url.to_string(),
                message: "price element not found".to_string(),
            })?;
        let fraction = document
            .select(&self.price_fraction)
            .next()
            .map(|element| element.text().collect::<String>());

        let price = self
            .parse_price(&whole, fraction.as_deref())
            .ok_or_else(|| FetchError::Layout {
                url: url.to_string(),
                message: format!("unreadable price '{}'", whole.trim()),
            })?;

        Ok(ProductInfo {
            url: url.to_string(),
            title,
            price,
        })
    }

    /// Join the whole and fraction fragments and keep only digits and points,
    /// so "1,299." + "00" reads as 1299.00.
    pub fn parse_price(&self, whole: &str, fraction: Option<&str>) -> Option<Decimal> {
        let mut price_str = self.non_numeric.replace_all(whole, "").into_owned();

        if let Some(fraction) = fraction {
            let fraction = self.non_numeric.replace_all(fraction, "");
            if !fraction.is_empty() {
                // Markup normally renders the point inside the whole fragment.
                if !price_str.contains('.') {
                    price_str.push('.');
                }
                price_str.push_str(&fraction);
            }
        }

        Decimal::from_str(&price_str).ok()
    }
}

fn parse_selector(selector: &str) -> Result<Selector, AppError> {
    Selector::parse(selector)
        .map_err(|e| AppError::Validation(format!("Invalid CSS selector '{}': {:?}", selector, e)))
}

/// Plain HTTP fetcher that presents itself as a desktop browser.
pub struct WebScraper {
    client: Client,
    parser: PageParser,
}

impl WebScraper {
    pub fn new(config: &ScraperConfig) -> Result<Self, AppError> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, header_value(&config.user_agent)?);
        headers.insert(ACCEPT, header_value(&config.accept)?);
        headers.insert(ACCEPT_LANGUAGE, header_value(&config.accept_language)?);

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.request_timeout))
            .build()?;

        Ok(Self {
            client,
            parser: PageParser::new(&config.selectors)?,
        })
    }
}

fn header_value(value: &str) -> Result<HeaderValue, AppError> {
    HeaderValue::from_str(value)
        .map_err(|e| AppError::Validation(format!("Invalid header value '{}': {}", value, e)))
}

#[async_trait]
impl ProductFetcher for WebScraper {
    async fn fetch(&self, url: &str) -> Result<ProductInfo, FetchError> {
        let start_time = Instant::now();

        let response = self.client.get(url).send().await.map_err(|e| FetchError::Transport {
            url: url.to_string(),
            message: e.to_string(),
        })?;

        let status = response.status();
        tracing::info!(
            "Request to {} returned status code {} in {}ms",
            url,
            status,
            start_time.elapsed().as_millis()
        );

        if !status.is_success() {
            return Err(FetchError::Transport {
                url: url.to_string(),
                message: format!("HTTP status {}", status),
            });
        }

        let body = response.text().await.map_err(|e| FetchError::Transport {
            url: url.to_string(),
            message: e.to_string(),
        })?;

        let result = self.parser.parse(url, &body);
        if let Err(e) = &result {
            tracing::warn!("Could not find title or price: {}", e);
        }
        result
    }
}
