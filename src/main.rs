// src/main.rs
use budget_buddy::api::{self, AppState};
use budget_buddy::{Config, GeminiClient, YahooFinance};
use env_logger::Builder;
use log::{error, info, LevelFilter};
use std::sync::Arc;

#[tokio::main]
async fn main() {
    Builder::new()
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .format_timestamp_secs()
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };
    info!(
        "Starting Budget Buddy (model {}, history from {})...",
        config.gemini_model, config.history_start
    );

    let advisor = match GeminiClient::new(&config) {
        Ok(client) => Arc::new(client),
        Err(e) => {
            error!("Failed to build LLM client: {}", e);
            std::process::exit(1);
        }
    };
    let prices = match YahooFinance::new(&config) {
        Ok(client) => Arc::new(client),
        Err(e) => {
            error!("Failed to build market data client: {}", e);
            std::process::exit(1);
        }
    };

    let state = AppState {
        advisor,
        prices,
        predictor: config.predictor,
        history_start: config.history_start,
    };

    let routes = api::routes(state);

    info!("Server running on http://{}", config.bind_addr);
    warp::serve(routes).run(config.bind_addr).await;
}
