// src/config.rs
use crate::error::{AppError, Result};
use chrono::NaiveDate;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const GEMINI_BASE: &str = "https://generativelanguage.googleapis.com";
pub const YAHOO_BASE: &str = "https://query1.finance.yahoo.com";
pub const DEFAULT_BIND: &str = "127.0.0.1:3030";

#[derive(Debug, Clone)]
pub struct Config {
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub gemini_base: String,
    pub market_data_base: String,
    pub history_start: NaiveDate,
    pub predictor: PredictorSettings,
    pub http_timeout: Duration,
    pub bind_addr: SocketAddr,
}

/// Train/test split parameters for the next-close regression.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PredictorSettings {
    /// Share of rows held out from fitting, in `[0, 1)`. Zero fits on every row.
    pub test_fraction: f64,
    pub seed: u64,
}

impl Default for PredictorSettings {
    fn default() -> Self {
        Self {
            test_fraction: 0.2,
            seed: 42,
        }
    }
}

pub fn default_history_start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2015, 1, 1).unwrap_or(NaiveDate::MIN)
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads settings through `lookup`; blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let gemini_api_key = get("GEMINI_API_KEY")
            .ok_or_else(|| AppError::Config("GEMINI_API_KEY is not set".to_string()))?;

        let test_fraction: f64 = parse_or(get("HOLDOUT_FRACTION"), "HOLDOUT_FRACTION", 0.2)?;
        if !(0.0..1.0).contains(&test_fraction) {
            return Err(AppError::Config(format!(
                "HOLDOUT_FRACTION must be in [0, 1), got {}",
                test_fraction
            )));
        }

        Ok(Self {
            gemini_api_key,
            gemini_model: get("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            gemini_base: get("GEMINI_API_BASE").unwrap_or_else(|| GEMINI_BASE.to_string()),
            market_data_base: get("MARKET_DATA_BASE").unwrap_or_else(|| YAHOO_BASE.to_string()),
            history_start: parse_or(
                get("PRICE_HISTORY_START"),
                "PRICE_HISTORY_START",
                default_history_start(),
            )?,
            predictor: PredictorSettings {
                test_fraction,
                seed: parse_or(get("SPLIT_SEED"), "SPLIT_SEED", 42)?,
            },
            http_timeout: Duration::from_secs(parse_or(
                get("HTTP_TIMEOUT_SECS"),
                "HTTP_TIMEOUT_SECS",
                60,
            )?),
            bind_addr: parse_or(
                get("BIND_ADDR"),
                "BIND_ADDR",
                SocketAddr::from(([127, 0, 0, 1], 3030)),
            )?,
        })
    }
}

fn parse_or<T>(raw: Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        None => Ok(default),
        Some(value) => value
            .parse()
            .map_err(|e| AppError::Config(format!("{} = {:?}: {}", key, value, e))),
    }
}
