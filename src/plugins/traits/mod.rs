pub mod fetcher;
pub mod notifier;

pub use fetcher::{FetchError, ProductFetcher, ProductInfo};
pub use notifier::{Notifier, PriceDropAlert};
