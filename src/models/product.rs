use rust_decimal::Decimal;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// A product on one user's watchlist together with its price watermarks.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(from = "StoredProduct")]
pub struct TrackedProduct {
    pub url: String,
    pub title: String,
    #[serde(serialize_with = "rust_decimal::serde::arbitrary_precision::serialize")]
    pub price: Decimal,
    #[serde(serialize_with = "rust_decimal::serde::arbitrary_precision::serialize")]
    pub high_price: Decimal,
    #[serde(serialize_with = "rust_decimal::serde::arbitrary_precision::serialize")]
    pub low_price: Decimal,
}

/// On-disk shape. Older files carry no watermarks, so they fall back to `price`.
/// Prices are exact JSON numbers, never routed through `f64`.
#[derive(Deserialize)]
struct StoredProduct {
    #[serde(default)]
    url: String,
    title: String,
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    price: Decimal,
    #[serde(default, with = "rust_decimal::serde::arbitrary_precision_option")]
    high_price: Option<Decimal>,
    #[serde(default, with = "rust_decimal::serde::arbitrary_precision_option")]
    low_price: Option<Decimal>,
}

impl From<StoredProduct> for TrackedProduct {
    fn from(stored: StoredProduct) -> Self {
        Self {
            high_price: stored.high_price.unwrap_or(stored.price),
            low_price: stored.low_price.unwrap_or(stored.price),
            url: stored.url,
            title: stored.title,
            price: stored.price,
        }
    }
}

/// Result of comparing a freshly fetched price with the stored record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PriceChange {
    Dropped { old_price: Decimal },
    Unchanged,
    Increased { old_price: Decimal },
}

impl TrackedProduct {
    /// A freshly tracked product: every watermark starts at the fetched price.
    pub fn new(url: impl Into<String>, title: impl Into<String>, price: Decimal) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
            price,
            high_price: price,
            low_price: price,
        }
    }

    /// Fold an observed price into the record.
    ///
    /// Watermarks always move. The stored `price` follows a drop, and follows an
    /// increase only when `follow_increases` is set.
    pub fn observe_price(&mut self, new_price: Decimal, follow_increases: bool) -> PriceChange {
        let old_price = self.price;
        self.high_price = self.high_price.max(new_price);
        self.low_price = self.low_price.min(new_price);

        if new_price < old_price {
            self.price = new_price;
            PriceChange::Dropped { old_price }
        } else if new_price > old_price {
            if follow_increases {
                self.price = new_price;
            }
            PriceChange::Increased { old_price }
        } else {
            PriceChange::Unchanged
        }
    }
}

/// One user's tracked products, keyed by URL, in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Watchlist {
    products: Vec<TrackedProduct>,
}

impl Watchlist {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace by URL. A replaced entry keeps its position and is returned.
    pub fn upsert(&mut self, product: TrackedProduct) -> Option<TrackedProduct> {
        match self.products.iter_mut().find(|p| p.url == product.url) {
            Some(existing) => Some(std::mem::replace(existing, product)),
            None => {
                self.products.push(product);
                None
            }
        }
    }

    pub fn remove(&mut self, url: &str) -> Option<TrackedProduct> {
        let index = self.products.iter().position(|p| p.url == url)?;
        Some(self.products.remove(index))
    }

    pub fn get(&self, url: &str) -> Option<&TrackedProduct> {
        self.products.iter().find(|p| p.url == url)
    }

    pub fn get_mut(&mut self, url: &str) -> Option<&mut TrackedProduct> {
        self.products.iter_mut().find(|p| p.url == url)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TrackedProduct> {
        self.products.iter()
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}

impl Serialize for Watchlist {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.products.len()))?;
        for product in &self.products {
            map.serialize_entry(&product.url, product)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Watchlist {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct WatchlistVisitor;

        impl<'de> Visitor<'de> for WatchlistVisitor {
            type Value = Watchlist;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of product URL to tracked product")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Watchlist, A::Error> {
                let mut watchlist = Watchlist::new();
                while let Some((url, mut product)) = access.next_entry::<String, TrackedProduct>()? {
                    // The map key is the identity; the embedded url is informational.
                    product.url = url;
                    watchlist.upsert(product);
                }
                Ok(watchlist)
            }
        }

        deserializer.deserialize_map(WatchlistVisitor)
    }
}
