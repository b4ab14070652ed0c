use std::collections::BTreeMap;

pub mod product;

// Re-exports for convenience
pub use product::*;

/// Every user's watchlist, keyed by chat id.
pub type Users = BTreeMap<String, Watchlist>;
