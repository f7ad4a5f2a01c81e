use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use kijin_core::domain::recommendation::MarketAnalysis;
use kijin_core::engine::{AnalysisCache, EngineParams};
use kijin_core::error::EngineError;
use kijin_core::ingest::types::PricePoint;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = kijin_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let params = settings.engine_params()?;
    let cache_capacity = settings.cache_capacity()?;
    let port = settings.port()?;

    let state = AppState {
        params,
        cache: Arc::new(AnalysisCache::new(cache_capacity)),
    };

    let app = router(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));

    tracing::info!(
        %addr,
        rsi_period = params.rsi_period,
        forecast_window = params.forecast_window,
        cache_capacity,
        "api listening"
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/analyze", post(analyze))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn healthz() -> &'static str {
    "ok"
}

#[derive(Debug, Clone)]
struct AppState {
    params: EngineParams,
    cache: Arc<AnalysisCache>,
}

#[derive(Debug, Deserialize)]
struct AnalyzeRequest {
    #[serde(default = "default_coin")]
    coin: String,
    prices: Vec<PricePoint>,
    #[serde(default)]
    daily: bool,
}

fn default_coin() -> String {
    "bitcoin".to_string()
}

#[derive(Debug, Serialize)]
struct ApiAnalysis {
    analysis_id: Uuid,
    coin: String,
    generated_at: DateTime<Utc>,
    cached: bool,
    analysis: MarketAnalysis,
}

#[derive(Debug)]
enum ApiError {
    Unprocessable(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Unprocessable(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg).into_response(),
        }
    }
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        // The engine is pure, so a non-finite result can only come from the submitted prices
        // (magnitudes that overflow the regression sums).
        if let EngineError::NonFinite { field } = err {
            tracing::warn!(field, "submitted prices produced a non-finite result");
        }
        ApiError::Unprocessable(err.to_string())
    }
}

async fn analyze(
    State(state): State<AppState>,
    Json(req): Json<AnalyzeRequest>,
) -> Result<Json<ApiAnalysis>, ApiError> {
    let series = kijin_core::ingest::prices::series_from_points(req.prices, req.daily)
        .map_err(|e| ApiError::Unprocessable(format!("{e:#}")))?;

    let (analysis, cached) = state.cache.get_or_compute(&series, &state.params)?;

    tracing::info!(
        coin = %req.coin,
        len = series.len(),
        cached,
        recommendation = %analysis.signal.recommendation,
        "analysis served"
    );

    Ok(Json(ApiAnalysis {
        analysis_id: Uuid::new_v4(),
        coin: req.coin,
        generated_at: Utc::now(),
        cached,
        analysis,
    }))
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

fn init_sentry(settings: &kijin_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
