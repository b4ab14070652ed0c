pub mod affiliate;
pub mod bot;
pub mod config;
pub mod models;
pub mod plugins;
pub mod product_manager;
pub mod scheduler;
pub mod scraper;
pub mod store;
pub mod utils;

// Re-export commonly used types
pub use affiliate::build_affiliate_link;
pub use config::AppConfig;
pub use product_manager::{CycleReport, ProductManager, TrackConfirmation, TrackError};
pub use scheduler::PriceCheckScheduler;
pub use store::{ProductStore, SharedStore};
pub use utils::error::AppError;

pub type Result<T> = std::result::Result<T, AppError>;
