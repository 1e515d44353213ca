// src/api.rs
use crate::chart::render_svg;
use crate::config::PredictorSettings;
use crate::error::{AppError, Result, Severity};
use crate::llm::AdviceModel;
use crate::market::{normalize_ticker, PriceSource};
use crate::models::{Advice, RiskTolerance, StockAnalysis, UserProfile};
use crate::predictor::predict_next_close;
use crate::prompt::build_prompt;
use chrono::{NaiveDate, Utc};
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::convert::Infallible;
use std::sync::Arc;
use warp::http::StatusCode;
use warp::{Filter, Rejection, Reply};

const INDEX_HTML: &str = include_str!("../static/index.html");

/// Everything a request handler needs, shared read-only across requests.
#[derive(Clone)]
pub struct AppState {
    pub advisor: Arc<dyn AdviceModel>,
    pub prices: Arc<dyn PriceSource>,
    pub predictor: PredictorSettings,
    pub history_start: NaiveDate,
}

/// Response envelope shared by both flows.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome<T> {
    Ok { data: T },
    Warning { message: String },
    Error { message: String },
}

impl<T> Outcome<T> {
    pub fn from_error(err: &AppError) -> Self {
        match err.severity() {
            Severity::Warning => Outcome::Warning {
                message: err.to_string(),
            },
            Severity::Error => Outcome::Error {
                message: err.to_string(),
            },
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct StockQuery {
    pub end: Option<String>,
}

/// Validates the profile, builds the prompt and asks the model for advice.
/// The model is never called for an incomplete profile.
pub async fn advice_flow(profile: &UserProfile, advisor: &dyn AdviceModel) -> Result<Advice> {
    let prompt = build_prompt(profile)?;
    let text = advisor.generate(&prompt).await?;
    Ok(Advice { text })
}

/// Fetches closes for `ticker` up to `end` (exclusive), fits the one-lag
/// regression and renders the chart.
pub async fn prediction_flow(
    ticker: &str,
    end: NaiveDate,
    prices: &dyn PriceSource,
    settings: &PredictorSettings,
    start: NaiveDate,
) -> Result<StockAnalysis> {
    let ticker = normalize_ticker(ticker)?;
    let series = prices.daily_closes(&ticker, start, end).await?;
    let (prediction, fit) = predict_next_close(&series, settings)?;

    let rows = series.lagged();
    let chart_svg = render_svg(&ticker, &rows);
    let (first_date, last_date) = match (rows.first(), rows.last()) {
        (Some(first), Some(last)) => (first.date, last.date),
        _ => return Err(AppError::NoData(ticker)),
    };

    Ok(StockAnalysis {
        message: format!("Suggestion: {}", prediction.suggestion.message()),
        ticker,
        rows: rows.len(),
        first_date,
        last_date,
        prediction,
        fit,
        chart_svg,
    })
}

pub fn routes(state: AppState) -> impl Filter<Extract = impl Reply, Error = Infallible> + Clone {
    let index = warp::path::end()
        .and(warp::get())
        .map(|| warp::reply::html(index_html()));

    let health = warp::path("health")
        .and(warp::path::end())
        .and(warp::get())
        .map(|| warp::reply::json(&json!({ "status": "ok" })));

    let advice = warp::path!("api" / "advice")
        .and(warp::post())
        .and(warp::body::content_length_limit(64 * 1024))
        .and(warp::body::json())
        .and(with_state(state.clone()))
        .and_then(advice_handler);

    let stock = warp::path!("api" / "stock" / String)
        .and(warp::get())
        .and(warp::query::<StockQuery>())
        .and(with_state(state))
        .and_then(stock_handler);

    index
        .or(health)
        .or(advice)
        .or(stock)
        .recover(handle_rejection)
}

fn with_state(state: AppState) -> impl Filter<Extract = (AppState,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

/// The page with the risk tolerance options filled in.
pub fn index_html() -> String {
    let options = RiskTolerance::ALL
        .iter()
        .map(|r| format!(r#"<option value="{0}">{0}</option>"#, r.as_str()))
        .collect::<Vec<_>>()
        .join("");
    INDEX_HTML.replace("{{RISK_OPTIONS}}", &options)
}

async fn advice_handler(profile: UserProfile, state: AppState) -> std::result::Result<impl Reply, Rejection> {
    match advice_flow(&profile, state.advisor.as_ref()).await {
        Ok(advice) => {
            info!("Advice generated ({} chars).", advice.text.len());
            Ok(warp::reply::json(&Outcome::Ok { data: advice }))
        }
        Err(e) => {
            log_failure("advice", &e);
            Err(warp::reject::custom(e))
        }
    }
}

async fn stock_handler(
    ticker: String,
    query: StockQuery,
    state: AppState,
) -> std::result::Result<impl Reply, Rejection> {
    // Path segments arrive still percent-encoded (`%5EGSPC`, `EURUSD%3DX`).
    let ticker = match urlencoding::decode(&ticker) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => return Err(warp::reject::custom(AppError::InvalidTicker(ticker))),
    };

    let end = match query.end.as_deref() {
        Some(raw) => raw
            .parse::<NaiveDate>()
            .map_err(|_| warp::reject::custom(AppError::InvalidDate(raw.to_string())))?,
        None => Utc::now().date_naive(),
    };

    match prediction_flow(
        &ticker,
        end,
        state.prices.as_ref(),
        &state.predictor,
        state.history_start,
    )
    .await
    {
        Ok(analysis) => {
            info!(
                "Prediction for {}: last={:.2} next={:.2} -> {:?}",
                analysis.ticker,
                analysis.prediction.last_close,
                analysis.prediction.predicted_next_close,
                analysis.prediction.suggestion
            );
            Ok(warp::reply::json(&Outcome::Ok { data: analysis }))
        }
        Err(e) => {
            log_failure(&format!("stock {}", ticker), &e);
            Err(warp::reject::custom(e))
        }
    }
}

fn log_failure(flow: &str, e: &AppError) {
    match e.severity() {
        Severity::Warning => warn!("{} flow halted: {}", flow, e),
        Severity::Error => error!("{} flow failed: {}", flow, e),
    }
}

/// Turns every rejection into the JSON outcome envelope.
pub async fn handle_rejection(err: Rejection) -> std::result::Result<impl Reply, Infallible> {
    let (status, outcome): (StatusCode, Outcome<()>) = if let Some(e) = err.find::<AppError>() {
        (e.status(), Outcome::from_error(e))
    } else if err.is_not_found() {
        (
            StatusCode::NOT_FOUND,
            Outcome::Error {
                message: "Not found".to_string(),
            },
        )
    } else if let Some(e) = err.find::<warp::filters::body::BodyDeserializeError>() {
        (
            StatusCode::BAD_REQUEST,
            Outcome::Error {
                message: format!("Invalid request body: {}", e),
            },
        )
    } else if err.find::<warp::reject::InvalidQuery>().is_some() {
        (
            StatusCode::BAD_REQUEST,
            Outcome::Error {
                message: "Invalid query string".to_string(),
            },
        )
    } else if err.find::<warp::reject::PayloadTooLarge>().is_some() {
        (
            StatusCode::PAYLOAD_TOO_LARGE,
            Outcome::Error {
                message: "Request body too large".to_string(),
            },
        )
    } else if err.find::<warp::reject::LengthRequired>().is_some() {
        (
            StatusCode::LENGTH_REQUIRED,
            Outcome::Error {
                message: "Content-Length header required".to_string(),
            },
        )
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (
            StatusCode::METHOD_NOT_ALLOWED,
            Outcome::Error {
                message: "Method not allowed".to_string(),
            },
        )
    } else {
        error!("Unhandled rejection: {:?}", err);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Outcome::Error {
                message: "Internal server error".to_string(),
            },
        )
    };

    Ok(warp::reply::with_status(warp::reply::json(&outcome), status))
}
