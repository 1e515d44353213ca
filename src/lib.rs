// src/lib.rs
pub mod api;
pub mod chart;
pub mod config;
pub mod error;
pub mod llm;
pub mod market;
pub mod models;
pub mod predictor;
pub mod prompt;

pub use api::{advice_flow, prediction_flow, routes, AppState, Outcome};
pub use config::{Config, PredictorSettings};
pub use error::{AppError, Result};
pub use llm::{AdviceModel, GeminiClient};
pub use market::{PriceSource, YahooFinance};
