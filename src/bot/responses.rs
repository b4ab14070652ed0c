use rust_decimal::Decimal;

use crate::models::Watchlist;
use crate::plugins::traits::PriceDropAlert;
use crate::product_manager::TrackConfirmation;

pub const GREETING: &str =
    "Hey there! 👋 I'm your personal Amazon deal finder. Send me an Amazon product link to get started!";

pub const HELP: &str = "Just send me a link to an Amazon product and I'll start tracking it. \
Use /list to see your tracked items.";

pub const NOT_A_PRODUCT_LINK: &str = "Hmm, that doesn't look like an Amazon link. Please try again! 🤔";

pub const CHECKING_PRODUCT: &str = "On it! Let me check this product out... 🕵️";

pub const PRODUCT_UNAVAILABLE: &str =
    "Sorry, I couldn't get the details for that product. Please check the link. 😥";

pub const SAVE_FAILED: &str = "Sorry, something went wrong while saving your product. Please try again later.";

pub const EMPTY_WATCHLIST: &str =
    "You're not tracking any products yet. Send me an Amazon link to get started! 🚀";

/// Telegram rejects messages longer than this many UTF-16 code units.
pub const MESSAGE_LIMIT: usize = 4096;

const MAX_TITLE_CHARS: usize = 512;

const WATCHLIST_HEADER: &str = "Here's what I'm tracking for you: 👀";

/// Renders prices with a fixed currency sign and two decimals.
#[derive(Debug, Clone)]
pub struct MessageFormatter {
    currency_symbol: String,
}

impl MessageFormatter {
    pub fn new(currency_symbol: impl Into<String>) -> Self {
        Self {
            currency_symbol: currency_symbol.into(),
        }
    }

    pub fn price(&self, price: Decimal) -> String {
        format!("{}{:.2}", self.currency_symbol, price)
    }

    pub fn track_confirmation(&self, confirmation: &TrackConfirmation) -> String {
        format!(
            "Awesome! I've added this to your tracking list. 👀\n\n\
             {}\n\
             Current Price: {}\n\n\
             Buy it here: {}\n\n\
             I'll let you know when the price drops! 📉",
            confirmation.title,
            self.price(confirmation.price),
            confirmation.link
        )
    }

    pub fn price_drop(&self, alert: &PriceDropAlert) -> String {
        format!(
            "PRICE DROP ALERT! 📉 GO GO GO!\n\n\
             {}\n\n\
             😭 Old Price: {}\n\
             🤩 New Price: {}\n\n\
             Grab it here: {}",
            alert.title,
            self.price(alert.old_price),
            self.price(alert.new_price),
            alert.link
        )
    }

    /// Numbered entries in insertion order, or the empty-state message.
    ///
    /// Long lists are split between entries so every message fits
    /// `MESSAGE_LIMIT`; numbering carries on across messages.
    pub fn watchlist(&self, watchlist: Option<&Watchlist>) -> Vec<String> {
        let Some(watchlist) = watchlist.filter(|w| !w.is_empty()) else {
            return vec![EMPTY_WATCHLIST.to_string()];
        };

        let mut messages = Vec::new();
        let mut current = String::from(WATCHLIST_HEADER);
        let mut entries_in_current = 0;

        for (i, product) in watchlist.iter().enumerate() {
            let entry = format!(
                "{}. {}\n   - Now: {}\n   - Highest: {}\n   - Lowest: {}",
                i + 1,
                clip(&product.title, MAX_TITLE_CHARS),
                self.price(product.price),
                self.price(product.high_price),
                self.price(product.low_price)
            );

            if entries_in_current > 0 && utf16_len(&current) + 2 + utf16_len(&entry) > MESSAGE_LIMIT {
                messages.push(std::mem::take(&mut current));
                entries_in_current = 0;
            }
            if !current.is_empty() {
                current.push_str("\n\n");
            }
            current.push_str(&entry);
            entries_in_current += 1;
        }

        messages.push(current);
        messages
    }
}

fn utf16_len(text: &str) -> usize {
    text.encode_utf16().count()
}

fn clip(title: &str, max_chars: usize) -> String {
    match title.char_indices().nth(max_chars) {
        Some((end, _)) => format!("{}…", &title[..end]),
        None => title.to_string(),
    }
}

impl Default for MessageFormatter {
    fn default() -> Self {
        Self::new("₹")
    }
}
