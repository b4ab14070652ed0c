use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tokio::time::Instant;

use crate::affiliate::build_affiliate_link;
use crate::bot::responses::MessageFormatter;
use crate::config::AppConfig;
use crate::models::{PriceChange, TrackedProduct, Watchlist};
use crate::plugins::traits::{FetchError, Notifier, PriceDropAlert, ProductFetcher};
use crate::store::SharedStore;
use crate::utils::error::{AppError, StoreError};

/// What the user is told after a product was added.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrackConfirmation {
    pub title: String,
    pub price: Decimal,
    pub link: String,
}

#[derive(Error, Debug)]
pub enum TrackError {
    #[error("not a trackable product link (missing '{marker}'): {url}")]
    InvalidUrl { url: String, marker: String },

    #[error("product details unavailable: {0}")]
    ProductUnavailable(#[from] FetchError),

    #[error("failed to persist watchlist: {0}")]
    Storage(#[from] StoreError),
}

/// Outcome of one sweep over every tracked product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleReport {
    pub started_at: DateTime<Utc>,
    pub products_checked: usize,
    pub products_failed: usize,
    pub price_drops: usize,
    pub notifications_failed: usize,
    pub saved: bool,
    pub total_time_ms: u64,
}

/// Owns the add-to-watchlist workflow and the periodic price check.
pub struct ProductManager {
    store: SharedStore,
    fetcher: Arc<dyn ProductFetcher>,
    notifier: Arc<dyn Notifier>,
    formatter: MessageFormatter,
    affiliate_tag: String,
    site_marker: String,
    follow_increases: bool,
}

impl ProductManager {
    pub fn new(
        store: SharedStore,
        fetcher: Arc<dyn ProductFetcher>,
        notifier: Arc<dyn Notifier>,
        config: &AppConfig,
    ) -> Self {
        Self {
            store,
            fetcher,
            notifier,
            formatter: MessageFormatter::new(config.bot.currency_symbol.clone()),
            affiliate_tag: config.affiliate.tag.clone(),
            site_marker: config.scraper.site_marker.clone(),
            follow_increases: config.scheduler.track_price_increases,
        }
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    pub fn formatter(&self) -> &MessageFormatter {
        &self.formatter
    }

    pub fn is_trackable(&self, url: &str) -> bool {
        url.contains(&self.site_marker)
    }

    pub fn affiliate_link(&self, url: &str) -> String {
        build_affiliate_link(url, &self.affiliate_tag)
    }

    /// Start watching `url` for `user_id`, replacing any earlier entry for it.
    pub async fn track_product(&self, user_id: &str, url: &str) -> Result<TrackConfirmation, TrackError> {
        if !self.is_trackable(url) {
            return Err(TrackError::InvalidUrl {
                url: url.to_string(),
                marker: self.site_marker.clone(),
            });
        }

        let info = self.fetcher.fetch(url).await?;
        let product = TrackedProduct::new(url, info.title.clone(), info.price);

        {
            let mut store = self.store.lock().await;
            let previous = store.upsert(user_id, product);
            if let Err(e) = store.save() {
                // Keep memory in line with disk so a failed add is not tracked anyway.
                store.restore(user_id, url, previous);
                return Err(e.into());
            }
        }

        tracing::info!("User {} is now tracking {} at {}", user_id, url, info.price);

        Ok(TrackConfirmation {
            title: info.title,
            price: info.price,
            link: self.affiliate_link(url),
        })
    }

    pub async fn list_products(&self, user_id: &str) -> Option<Watchlist> {
        self.store.lock().await.watchlist(user_id).cloned()
    }

    /// Re-check every tracked product once, alerting on drops, then persist.
    ///
    /// Products are checked one at a time from a snapshot; the store lock is
    /// never held across a fetch or a send.
    pub async fn check_all_products(&self) -> CycleReport {
        let started_at = Utc::now();
        let start_time = Instant::now();
        let snapshot = self.store.lock().await.snapshot();

        tracing::info!("Running periodic price check over {} products", snapshot.len());

        let mut report = CycleReport {
            started_at,
            products_checked: 0,
            products_failed: 0,
            price_drops: 0,
            notifications_failed: 0,
            saved: false,
            total_time_ms: 0,
        };

        for (user_id, product) in snapshot {
            let info = match self.fetcher.fetch(&product.url).await {
                Ok(info) => info,
                Err(e) => {
                    report.products_failed += 1;
                    tracing::warn!("Skipping {} for user {} this cycle: {}", product.url, user_id, e);
                    continue;
                }
            };
            report.products_checked += 1;

            let change = {
                let mut store = self.store.lock().await;
                store
                    .product_mut(&user_id, &product.url)
                    .map(|stored| stored.observe_price(info.price, self.follow_increases))
            };

            match change {
                Some(PriceChange::Dropped { old_price }) => {
                    report.price_drops += 1;
                    let alert = PriceDropAlert {
                        chat_id: user_id.clone(),
                        title: info.title,
                        old_price,
                        new_price: info.price,
                        link: self.affiliate_link(&product.url),
                    };
                    if let Err(e) = self.notify_price_drop(&alert).await {
                        report.notifications_failed += 1;
                        tracing::warn!("Failed to deliver price drop alert to {}: {}", user_id, e);
                    }
                }
                Some(PriceChange::Increased { old_price }) => {
                    tracing::debug!("{} went up from {} to {}", product.url, old_price, info.price);
                }
                Some(PriceChange::Unchanged) => {}
                None => {
                    tracing::debug!("{} left the store during the cycle", product.url);
                }
            }
        }

        match self.store.lock().await.save() {
            Ok(()) => report.saved = true,
            Err(e) => tracing::error!("Failed to save store after price check: {}", e),
        }

        report.total_time_ms = start_time.elapsed().as_millis() as u64;
        tracing::info!(
            "Price check finished: {} checked, {} failed, {} drops in {}ms",
            report.products_checked,
            report.products_failed,
            report.price_drops,
            report.total_time_ms
        );
        report
    }

    async fn notify_price_drop(&self, alert: &PriceDropAlert) -> Result<(), AppError> {
        tracing::info!(
            "Price drop for {}: {} -> {}",
            alert.title,
            alert.old_price,
            alert.new_price
        );
        let message = self.formatter.price_drop(alert);
        self.notifier.send_message(&alert.chat_id, &message).await
    }
}
