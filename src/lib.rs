pub mod adapters;
pub mod config;
pub mod extractor;
pub mod fetch;
pub mod ledger;
pub mod models;
pub mod normalizer;
pub mod scheduler;
pub mod store;
pub mod tracker;
pub mod utils;
pub mod web;

// Re-export commonly used types
pub use utils::error::AppError;

pub type Result<T> = std::result::Result<T, AppError>;
