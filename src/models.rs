// src/models.rs
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Financial profile collected by the advice form.
///
/// Every field is free text. Keys absent from the request body come through
/// as empty strings so they are reported by validation instead of failing
/// body parsing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UserProfile {
    pub age: String,
    pub income: String,
    pub expenses: String,
    pub savings: String,
    pub investments: String,
    pub debt: String,
    pub goal: String,
    pub risk: String,
    pub location: String,
    pub upcoming: String,
}

impl UserProfile {
    /// Field names paired with their values, in form order.
    pub fn fields(&self) -> [(&'static str, &str); 10] {
        [
            ("age", self.age.as_str()),
            ("income", self.income.as_str()),
            ("expenses", self.expenses.as_str()),
            ("savings", self.savings.as_str()),
            ("investments", self.investments.as_str()),
            ("debt", self.debt.as_str()),
            ("goal", self.goal.as_str()),
            ("risk", self.risk.as_str()),
            ("location", self.location.as_str()),
            ("upcoming", self.upcoming.as_str()),
        ]
    }
}

/// Options offered by the risk tolerance select.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskTolerance {
    Low,
    Medium,
    High,
}

impl RiskTolerance {
    pub const ALL: [RiskTolerance; 3] = [RiskTolerance::Low, RiskTolerance::Medium, RiskTolerance::High];

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskTolerance::Low => "Low",
            RiskTolerance::Medium => "Medium",
            RiskTolerance::High => "High",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Advice {
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub close: f64,
}

/// Daily closes for one ticker, ascending by date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    pub ticker: String,
    pub points: Vec<PricePoint>,
}

/// A close paired with the close of the trading day before it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LaggedRow {
    pub date: NaiveDate,
    pub previous_close: f64,
    pub close: f64,
}

impl PriceSeries {
    pub fn new(ticker: impl Into<String>, points: Vec<PricePoint>) -> Self {
        Self {
            ticker: ticker.into(),
            points,
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Shifts closes by one row; the first row has no previous close and is dropped.
    pub fn lagged(&self) -> Vec<LaggedRow> {
        self.points
            .windows(2)
            .map(|pair| LaggedRow {
                date: pair[1].date,
                previous_close: pair[0].close,
                close: pair[1].close,
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Suggestion {
    Invest,
    Hold,
}

impl Suggestion {
    /// Invest only on a strictly higher predicted close.
    pub fn from_prediction(predicted_next_close: f64, last_close: f64) -> Self {
        if predicted_next_close > last_close {
            Suggestion::Invest
        } else {
            Suggestion::Hold
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Suggestion::Invest => "Consider investing. Trend shows growth.",
            Suggestion::Hold => "Hold off. Price may decrease or stay flat.",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionResult {
    pub last_close: f64,
    pub predicted_next_close: f64,
    pub suggestion: Suggestion,
}

/// Fitted line plus how it scored on the held-out rows.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelFit {
    pub slope: f64,
    pub intercept: f64,
    pub train_rows: usize,
    pub test_rows: usize,
    pub test_r2: Option<f64>,
    pub test_rmse: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockAnalysis {
    pub ticker: String,
    pub rows: usize,
    pub first_date: NaiveDate,
    pub last_date: NaiveDate,
    pub prediction: PredictionResult,
    pub fit: ModelFit,
    pub message: String,
    pub chart_svg: String,
}
