// src/market.rs
use crate::config::Config;
use crate::error::{AppError, Result};
use crate::models::{PricePoint, PriceSeries};
use chrono::{DateTime, FixedOffset, NaiveDate, Offset, Utc};
use futures::future::BoxFuture;
use futures::FutureExt;
use log::{error, info, warn};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::Client;
use serde::Deserialize;

/// Source of daily closing prices.
pub trait PriceSource: Send + Sync {
    /// Closes for `ticker` from `start` (inclusive) to `end` (exclusive).
    fn daily_closes<'a>(
        &'a self,
        ticker: &'a str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> BoxFuture<'a, Result<PriceSeries>>;
}

#[derive(Debug, Deserialize)]
pub struct ChartResponse {
    pub chart: Chart,
}

#[derive(Debug, Deserialize)]
pub struct Chart {
    pub result: Option<Vec<ChartResult>>,
    pub error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
pub struct ChartError {
    pub code: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChartResult {
    #[serde(default)]
    pub meta: Option<ChartMeta>,
    #[serde(default)]
    pub timestamp: Vec<i64>,
    pub indicators: Indicators,
}

/// Exchange metadata. `gmtoffset` is the exchange's UTC offset in seconds.
#[derive(Debug, Default, Deserialize)]
pub struct ChartMeta {
    #[serde(default)]
    pub gmtoffset: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct Indicators {
    #[serde(default)]
    pub quote: Vec<Quote>,
    #[serde(default)]
    pub adjclose: Vec<AdjClose>,
}

#[derive(Debug, Deserialize)]
pub struct Quote {
    #[serde(default)]
    pub close: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
pub struct AdjClose {
    #[serde(default)]
    pub adjclose: Vec<Option<f64>>,
}

/// Yahoo Finance v8 chart endpoint, daily interval.
pub struct YahooFinance {
    client: Client,
    base_url: String,
}

impl YahooFinance {
    pub fn new(config: &Config) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static("Mozilla/5.0 (X11; Linux x86_64) budget-buddy/0.1"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.http_timeout)
            .build()?;
        Ok(Self {
            client,
            base_url: config.market_data_base.trim_end_matches('/').to_string(),
        })
    }

    pub fn chart_url(&self, ticker: &str, start: NaiveDate, end: NaiveDate) -> String {
        format!(
            "{}/v8/finance/chart/{}?period1={}&period2={}&interval=1d&events=history&includeAdjustedClose=true",
            self.base_url,
            urlencoding::encode(ticker),
            unix_midnight(start),
            unix_midnight(end)
        )
    }

    async fn fetch(&self, ticker: &str, start: NaiveDate, end: NaiveDate) -> Result<PriceSeries> {
        let ticker = normalize_ticker(ticker)?;
        if end <= start {
            return Err(AppError::InvalidDate(format!(
                "end date {} is not after start date {}",
                end, start
            )));
        }

        let url = self.chart_url(&ticker, start, end);
        info!("Fetching daily closes for {} from {} to {}", ticker, start, end);

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        let body = response.text().await?;

        // Unknown symbols come back as 404 with a chart.error body.
        let parsed: ChartResponse = match serde_json::from_str(&body) {
            Ok(parsed) => parsed,
            Err(e) => {
                error!("Unreadable chart response for {} (HTTP {}): {}", ticker, status, e);
                return Err(AppError::MarketData(format!(
                    "unexpected response for {} (HTTP {})",
                    ticker, status
                )));
            }
        };

        let series = parse_chart(&ticker, parsed)?;
        info!("Fetched {} closes for {}", series.len(), ticker);
        Ok(series)
    }
}

impl PriceSource for YahooFinance {
    fn daily_closes<'a>(
        &'a self,
        ticker: &'a str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> BoxFuture<'a, Result<PriceSeries>> {
        self.fetch(ticker, start, end).boxed()
    }
}

/// Trims and uppercases a ticker, rejecting blanks and characters that do
/// not belong in a symbol.
pub fn normalize_ticker(raw: &str) -> Result<String> {
    let ticker = raw.trim().to_uppercase();
    if ticker.is_empty() {
        return Err(AppError::EmptyTicker);
    }
    if !ticker
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '^' | '=' | '_'))
    {
        return Err(AppError::InvalidTicker(raw.trim().to_string()));
    }
    Ok(ticker)
}

/// Turns a chart payload into an ascending series of finite closes.
///
/// Adjusted closes are used when present, raw closes otherwise. Bars are
/// dated in the exchange's local time, so a session opening before UTC
/// midnight keeps its local trading date.
pub fn parse_chart(ticker: &str, response: ChartResponse) -> Result<PriceSeries> {
    if let Some(err) = response.chart.error {
        let description = err
            .description
            .or(err.code)
            .unwrap_or_else(|| "unknown error".to_string());
        warn!("Chart API error for {}: {}", ticker, description);
        return Err(AppError::MarketData(format!("{}: {}", ticker, description)));
    }

    let result = response
        .chart
        .result
        .and_then(|results| results.into_iter().next())
        .ok_or_else(|| AppError::NoData(ticker.to_string()))?;

    let offset = result
        .meta
        .as_ref()
        .and_then(|meta| meta.gmtoffset)
        .and_then(FixedOffset::east_opt)
        .unwrap_or_else(|| Utc.fix());

    let closes = match result.indicators.adjclose.into_iter().next() {
        Some(adj) if !adj.adjclose.is_empty() => adj.adjclose,
        _ => result
            .indicators
            .quote
            .into_iter()
            .next()
            .map(|q| q.close)
            .unwrap_or_default(),
    };

    let mut points: Vec<PricePoint> = result
        .timestamp
        .iter()
        .zip(closes)
        .filter_map(|(&ts, close)| {
            let close = close.filter(|c| c.is_finite())?;
            let date = DateTime::<Utc>::from_timestamp(ts, 0)?
                .with_timezone(&offset)
                .date_naive();
            Some(PricePoint { date, close })
        })
        .collect();

    points.sort_by_key(|p| p.date);
    points.dedup_by_key(|p| p.date);

    if points.is_empty() {
        return Err(AppError::NoData(ticker.to_string()));
    }
    Ok(PriceSeries::new(ticker, points))
}

fn unix_midnight(date: NaiveDate) -> i64 {
    date.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc().timestamp())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use warp::http::StatusCode;
    use warp::Filter;

    fn chart(json: &str) -> ChartResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn parses_closes_and_skips_nulls() {
        let response = chart(
            r#"{"chart":{"result":[{
                "meta":{"symbol":"AAPL"},
                "timestamp":[1704205800,1704292200,1704378600,1704465000],
                "indicators":{"quote":[{"close":[185.64,null,181.91,181.18],"open":[187.15,184.22,182.15,181.99]}]}
            }],"error":null}}"#,
        );
        let series = parse_chart("AAPL", response).unwrap();
        assert_eq!(series.ticker, "AAPL");
        let closes: Vec<f64> = series.points.iter().map(|p| p.close).collect();
        assert_eq!(closes, vec![185.64, 181.91, 181.18]);
        assert_eq!(series.points[0].date, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
    }

    #[test]
    fn prefers_adjusted_closes() {
        let response = chart(
            r#"{"chart":{"result":[{
                "timestamp":[1704205800,1704292200],
                "indicators":{
                    "quote":[{"close":[185.64,184.25]}],
                    "adjclose":[{"adjclose":[184.53,183.15]}]
                }
            }],"error":null}}"#,
        );
        let series = parse_chart("AAPL", response).unwrap();
        assert_eq!(series.points[1].close, 183.15);
    }

    #[test]
    fn unknown_symbol_is_market_data_error() {
        let response = chart(
            r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found, symbol may be delisted"}}}"#,
        );
        match parse_chart("ZZZZZZ", response) {
            Err(AppError::MarketData(msg)) => assert!(msg.contains("delisted")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn empty_result_is_no_data() {
        let response = chart(
            r#"{"chart":{"result":[{"indicators":{"quote":[{}]}}],"error":null}}"#,
        );
        assert!(matches!(parse_chart("AAPL", response), Err(AppError::NoData(_))));
    }

    #[test]
    fn tickers_are_trimmed_and_uppercased() {
        assert_eq!(normalize_ticker("  msft ").unwrap(), "MSFT");
        assert_eq!(normalize_ticker("brk-b").unwrap(), "BRK-B");
        assert!(matches!(normalize_ticker("   "), Err(AppError::EmptyTicker)));
        assert_eq!(normalize_ticker("^gspc").unwrap(), "^GSPC");
        match normalize_ticker(" AAPL/../x ") {
            Err(AppError::InvalidTicker(raw)) => assert_eq!(raw, "AAPL/../x"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn bars_are_dated_in_exchange_time() {
        // ASX sessions open at 23:00 UTC the previous day.
        let response = chart(
            r#"{"chart":{"result":[{
                "meta":{"symbol":"BHP.AX","gmtoffset":39600,"timezone":"AEDT"},
                "timestamp":[1704236400,1704322800],
                "indicators":{"quote":[{"close":[49.12,48.35]}]}
            }],"error":null}}"#,
        );
        let series = parse_chart("BHP.AX", response).unwrap();
        let dates: Vec<NaiveDate> = series.points.iter().map(|p| p.date).collect();
        assert_eq!(
            dates,
            vec![
                NaiveDate::from_ymd_opt(2024, 1, 3).unwrap(),
                NaiveDate::from_ymd_opt(2024, 1, 4).unwrap(),
            ]
        );
    }

    #[test]
    fn chart_url_bounds_are_midnight_utc() {
        let config = Config::from_lookup(|key| match key {
            "GEMINI_API_KEY" => Some("k".to_string()),
            "MARKET_DATA_BASE" => Some("http://127.0.0.1:9/".to_string()),
            _ => None,
        })
        .unwrap();
        let yahoo = YahooFinance::new(&config).unwrap();
        let url = yahoo.chart_url(
            "AAPL",
            NaiveDate::from_ymd_opt(2015, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2015, 1, 2).unwrap(),
        );
        assert!(url.starts_with("http://127.0.0.1:9/v8/finance/chart/AAPL?"));
        assert!(url.contains("period1=1420070400"));
        assert!(url.contains("period2=1420156800"));

        let index = yahoo.chart_url(
            "^GSPC",
            NaiveDate::from_ymd_opt(2015, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2015, 1, 2).unwrap(),
        );
        assert!(index.starts_with("http://127.0.0.1:9/v8/finance/chart/%5EGSPC?"));
    }

    #[tokio::test]
    async fn blank_ticker_fails_before_any_request() {
        let config = Config::from_lookup(|key| match key {
            "GEMINI_API_KEY" => Some("k".to_string()),
            "MARKET_DATA_BASE" => Some("http://127.0.0.1:9".to_string()),
            _ => None,
        })
        .unwrap();
        let yahoo = YahooFinance::new(&config).unwrap();
        let start = NaiveDate::from_ymd_opt(2015, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let err = yahoo.daily_closes("  ", start, end).await.unwrap_err();
        assert!(matches!(err, AppError::EmptyTicker));
    }

    type Requests = Arc<Mutex<Vec<String>>>;

    /// Local chart endpoint answering every request with `status` and
    /// `reply`, recording the raw symbol segment and query of each call.
    fn stub_yahoo(status: StatusCode, reply: &'static str) -> (YahooFinance, Requests) {
        let requests: Requests = Arc::default();
        let log = requests.clone();
        let route = warp::get()
            .and(warp::path!("v8" / "finance" / "chart" / String))
            .and(warp::query::raw())
            .map(move |symbol: String, query: String| {
                log.lock().unwrap().push(format!("{}?{}", symbol, query));
                warp::reply::with_status(reply, status)
            });
        let (addr, server) = warp::serve(route).bind_ephemeral(([127, 0, 0, 1], 0));
        tokio::spawn(server);

        let base = format!("http://{}", addr);
        let config = Config::from_lookup(|key| match key {
            "GEMINI_API_KEY" => Some("k".to_string()),
            "MARKET_DATA_BASE" => Some(base.clone()),
            _ => None,
        })
        .unwrap();
        (YahooFinance::new(&config).unwrap(), requests)
    }

    fn window() -> (NaiveDate, NaiveDate) {
        (
            NaiveDate::from_ymd_opt(2015, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 6).unwrap(),
        )
    }

    #[tokio::test]
    async fn fetch_reads_chart_into_series() {
        let (yahoo, requests) = stub_yahoo(
            StatusCode::OK,
            r#"{"chart":{"result":[{
                "meta":{"symbol":"^GSPC","gmtoffset":-18000},
                "timestamp":[1704205800,1704292200,1704378600],
                "indicators":{
                    "quote":[{"close":[4742.83,4704.81,4688.68]}],
                    "adjclose":[{"adjclose":[4742.83,4704.81,4688.68]}]
                }
            }],"error":null}}"#,
        );
        let (start, end) = window();

        let series = yahoo.daily_closes(" ^gspc", start, end).await.unwrap();
        assert_eq!(series.ticker, "^GSPC");
        assert_eq!(series.len(), 3);
        assert_eq!(series.points[0].date, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        assert_eq!(series.points[2].close, 4688.68);

        let requests = requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].starts_with("%5EGSPC?period1=1420070400&period2=1704499200"));
        assert!(requests[0].contains("interval=1d"));
    }

    #[tokio::test]
    async fn html_body_is_market_data_error() {
        let (yahoo, _) = stub_yahoo(
            StatusCode::SERVICE_UNAVAILABLE,
            "<html><body>Will be right back...</body></html>",
        );
        let (start, end) = window();
        match yahoo.daily_closes("AAPL", start, end).await {
            Err(AppError::MarketData(msg)) => {
                assert!(msg.contains("AAPL"));
                assert!(msg.contains("503"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn not_found_chart_error_is_market_data_error() {
        let (yahoo, _) = stub_yahoo(
            StatusCode::NOT_FOUND,
            r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found, symbol may be delisted"}}}"#,
        );
        let (start, end) = window();
        match yahoo.daily_closes("ZZZZZZ", start, end).await {
            Err(AppError::MarketData(msg)) => assert!(msg.contains("delisted")),
            other => panic!("unexpected {:?}", other),
        }
    }
}
