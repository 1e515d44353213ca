// src/error.rs
use warp::http::StatusCode;
use warp::reject::Reject;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Please fill out all fields. Missing: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),

    #[error("Please enter a stock ticker.")]
    EmptyTicker,

    #[error("Invalid ticker symbol: {0}")]
    InvalidTicker(String),

    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[error("Market data error: {0}")]
    MarketData(String),

    #[error("No price data found for {0}")]
    NoData(String),

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Model API error: {0}")]
    Model(String),
}

pub type Result<T> = std::result::Result<T, AppError>;

/// How an error is presented on the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

impl AppError {
    pub fn severity(&self) -> Severity {
        match self {
            AppError::MissingFields(_) | AppError::EmptyTicker => Severity::Warning,
            _ => Severity::Error,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::MissingFields(_) | AppError::InsufficientData(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            AppError::EmptyTicker | AppError::InvalidTicker(_) | AppError::InvalidDate(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::NoData(_) => StatusCode::NOT_FOUND,
            AppError::Http(_)
            | AppError::Json(_)
            | AppError::MarketData(_)
            | AppError::Model(_) => StatusCode::BAD_GATEWAY,
            AppError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl Reject for AppError {}
