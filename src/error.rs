use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Root error type for the balancer service
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid portfolio: {0}")]
    Portfolio(#[from] PortfolioError),

    #[error("Storage failed: {0}")]
    Store(#[from] StoreError),

    #[error("Configuration failed: {0}")]
    Config(#[from] ConfigError),

    #[error("Background task was canceled")]
    Canceled,
}

/// Precondition violations on a portfolio or one of its positions.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PortfolioError {
    #[error("balance must be a finite amount >= 0, got {0}")]
    InvalidBalance(f64),

    #[error("ticker must not be empty")]
    EmptyTicker,

    #[error("duplicate ticker '{0}'")]
    DuplicateTicker(String),

    #[error("unknown ticker '{0}'")]
    UnknownTicker(String),

    #[error("price for '{ticker}' must be finite and > 0, got {price}")]
    InvalidPrice { ticker: String, price: f64 },

    #[error("target for '{ticker}' must be within [0, 100], got {target}")]
    InvalidTarget { ticker: String, target: f64 },

    #[error("targets must add up to 100%, got {0}%")]
    TargetsDoNotSum(f64),

    #[error("gave up after {0} passes")]
    PassLimit(u64),

    #[error("quantity of '{0}' would overflow")]
    QuantityOverflow(String),
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("store file does not hold a JSON object")]
    NotAnObject,

    #[error("store lock poisoned")]
    Poisoned,
}

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("{var} has an invalid value '{value}'")]
    InvalidValue { var: &'static str, value: String },
}
