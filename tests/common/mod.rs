//! Fake backends for the HTTP-level tests.

#![allow(dead_code)]

use budget_buddy::models::{PricePoint, PriceSeries, UserProfile};
use budget_buddy::{AdviceModel, AppError, AppState, PredictorSettings, PriceSource, Result};
use chrono::NaiveDate;
use futures::future::BoxFuture;
use futures::FutureExt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Returns a canned reply, or a model error when `reply` is `None`.
pub struct FakeAdvisor {
    pub reply: Option<String>,
    pub calls: AtomicUsize,
    pub last_prompt: Mutex<Option<String>>,
}

impl FakeAdvisor {
    pub fn replying(text: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Some(text.to_string()),
            calls: AtomicUsize::new(0),
            last_prompt: Mutex::new(None),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            reply: None,
            calls: AtomicUsize::new(0),
            last_prompt: Mutex::new(None),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl AdviceModel for FakeAdvisor {
    fn generate<'a>(&'a self, prompt: &'a str) -> BoxFuture<'a, Result<String>> {
        async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_prompt.lock().unwrap() = Some(prompt.to_string());
            self.reply
                .clone()
                .ok_or_else(|| AppError::Model("HTTP 503: model overloaded".to_string()))
        }
        .boxed()
    }
}

/// Serves fixed closes for one ticker and records every request.
pub struct FakePrices {
    pub ticker: String,
    pub closes: Vec<f64>,
    pub requests: Mutex<Vec<(String, NaiveDate, NaiveDate)>>,
}

impl FakePrices {
    pub fn new(ticker: &str, closes: Vec<f64>) -> Arc<Self> {
        Arc::new(Self {
            ticker: ticker.to_string(),
            closes,
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn requests(&self) -> Vec<(String, NaiveDate, NaiveDate)> {
        self.requests.lock().unwrap().clone()
    }
}

impl PriceSource for FakePrices {
    fn daily_closes<'a>(
        &'a self,
        ticker: &'a str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> BoxFuture<'a, Result<PriceSeries>> {
        async move {
            self.requests
                .lock()
                .unwrap()
                .push((ticker.to_string(), start, end));
            if ticker != self.ticker {
                return Err(AppError::MarketData(format!(
                    "{}: No data found, symbol may be delisted",
                    ticker
                )));
            }
            if self.closes.is_empty() {
                return Err(AppError::NoData(ticker.to_string()));
            }
            Ok(PriceSeries::new(ticker, trading_days(start, &self.closes)))
        }
        .boxed()
    }
}

pub fn trading_days(start: NaiveDate, closes: &[f64]) -> Vec<PricePoint> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| PricePoint {
            date: start + chrono::Duration::days(i as i64),
            close,
        })
        .collect()
}

pub fn history_start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2015, 1, 1).unwrap()
}

pub fn state(advisor: Arc<FakeAdvisor>, prices: Arc<FakePrices>) -> AppState {
    AppState {
        advisor,
        prices,
        predictor: PredictorSettings::default(),
        history_start: history_start(),
    }
}

pub fn complete_profile() -> UserProfile {
    UserProfile {
        age: "34".into(),
        income: "6100".into(),
        expenses: "4200".into(),
        savings: "15000".into(),
        investments: "401(k) with employer match".into(),
        debt: "Car loan, $9,500 at 6.1%".into(),
        goal: "Pay off debt, then build an emergency fund".into(),
        risk: "Low".into(),
        location: "Austin, TX".into(),
        upcoming: "Wedding next summer".into(),
    }
}
