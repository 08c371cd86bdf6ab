use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Could not determine price for {url}")]
    PriceNotFound { url: String },

    #[error("Page unreachable after {attempts} attempts: {url}: {reason}")]
    Unreachable {
        url: String,
        attempts: u32,
        reason: String,
    },

    #[error("Browser render error: {0}")]
    Render(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// True for failures that a later scheduled run might clear on its own.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            AppError::Unreachable { .. } | AppError::Http(_) | AppError::Render(_)
        )
    }
}

// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;
