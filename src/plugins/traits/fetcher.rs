use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// What a product page yields when it can be read.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProductInfo {
    pub url: String,
    pub title: String,
    pub price: Decimal,
}

/// Why a product page produced no info. Callers treat both alike.
#[derive(Error, Debug)]
pub enum FetchError {
    /// Network failure, timeout or a non-2xx status.
    #[error("failed to fetch {url}: {message}")]
    Transport { url: String, message: String },

    /// The page loaded but the expected elements were missing or unreadable.
    #[error("page layout may have changed for {url}: {message}")]
    Layout { url: String, message: String },
}

/// Source of current product details for a URL.
#[async_trait]
pub trait ProductFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<ProductInfo, FetchError>;
}
