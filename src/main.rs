mod routes;
mod controllers;
mod services;
mod models;
mod api_docs;
mod shared_state;
mod config;
mod errors;

use std::net::SocketAddr;
use std::path::Path;
use std::process::ExitCode;
use axum::{Router, routing::get, response::Html};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use crate::routes::forecast_routes::api_routes;
use utoipa::OpenApi;
use utoipa_scalar::Scalar;
use crate::api_docs::ApiDoc;
use crate::shared_state::{AppState, SharedState};
use crate::config::{Config, DEFAULT_OPTIONS_PATH};
use crate::services::forecast_cycle::ForecastCycle;
use crate::services::weather_service::{OpenMeteoClient, OPEN_METEO_URL};

use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

/// Maps add-on log levels onto `tracing` directives.
fn filter_directive(log_level: &str) -> String {
    match log_level.to_ascii_lowercase().as_str() {
        "warning" => "warn".into(),
        "critical" | "fatal" => "error".into(),
        other => other.into(),
    }
}

fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directive(log_level)));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> ExitCode {
    // 1. Load configuration
    let options_path = std::env::args().nth(1).unwrap_or_else(|| DEFAULT_OPTIONS_PATH.to_string());
    let config = match Config::load(&options_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load {}: {}", options_path, e);
            return ExitCode::FAILURE;
        }
    };

    init_tracing(&config.app.log_level);
    if !Path::new(&options_path).exists() {
        warn!(path = %options_path, "options file not found, using defaults");
    }
    config.log_summary();

    let point = match config.location() {
        Ok(p) => p,
        Err(e) => {
            error!(error = %e, "invalid site location");
            return ExitCode::FAILURE;
        }
    };
    if config.provider.provider != "open-meteo" {
        warn!(provider = %config.provider.provider, "unsupported provider, falling back to open-meteo");
    }

    // 2. Initialize shared state
    let state = AppState::new();

    // 3. Forecast cycle
    let client = match OpenMeteoClient::new(OPEN_METEO_URL) {
        Ok(c) => c,
        Err(e) => {
            error!(error = %e, "cannot build HTTP client");
            return ExitCode::FAILURE;
        }
    };
    tokio::spawn(ForecastCycle::new(client, config.clone(), point, state.clone()).run_forever());

    // 4. MQTT publisher
    tokio::spawn(services::mqtt_service::run_publisher(
        config.mqtt.clone(),
        config.site.site_id.clone(),
        state.clone(),
    ));

    // 5. Start Axum HTTP server
    let server_port = config.server.api_port;
    let shared = SharedState { app: state, config };
    let app = Router::new()
        .nest("/api", api_routes(shared))
        .route("/scalar", get(|| async {
            Html(Scalar::new(ApiDoc::openapi()).to_html())
        }))
        .fallback_service(ServeDir::new("static"))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = SocketAddr::from(([0, 0, 0, 0], server_port));
    info!("API Server listening on http://{}", addr);
    info!("Scalar UI: http://{}/scalar", addr);

    if let Err(e) = axum_server::bind(addr).serve(app.into_make_service()).await {
        error!(error = %e, "API server stopped");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
