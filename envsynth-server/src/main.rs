// EnvSynth Server - HTTP service for environmental predictions
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! # EnvSynth Server
//!
//! Thin HTTP wrapper around the EnvSynth predictor.
//!
//! ## Usage
//!
//! ```bash
//! # Built-in model and tables, uniform noise
//! envsynth-server --port 5000
//!
//! # Reproducible output
//! envsynth-server --noise hash --model weights.json --tables tables.json
//! ```

mod metrics;
mod request;

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::Local;
use clap::{Parser, ValueEnum};
use envsynth::{
    sample, EngineConfig, HeatmapSamples, NoiseConfig, PredictionResult, PredictionSummary,
    Predictor, SamplingConfig,
};
use metrics::{encode_metrics, record_heatmap, record_prediction, Outcome};
use request::{coordinates, radius, ApiError, HeatmapBody, PredictBody};
use serde::Serialize;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tracing::{error, info, warn, Level};
use tracing_subscriber::EnvFilter;

/// Noise strategy selectable on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum NoiseArg {
    Uniform,
    Hash,
    Disabled,
}

/// EnvSynth HTTP server
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "5000")]
    port: u16,

    /// JSON surrogate model weights
    #[arg(short, long)]
    model: Option<PathBuf>,

    /// JSON regional tables
    #[arg(short, long)]
    tables: Option<PathBuf>,

    /// JSON engine configuration; flags override its fields
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Noise strategy
    #[arg(short, long, value_enum)]
    noise: Option<NoiseArg>,

    /// Seed for uniform noise
    #[arg(short, long)]
    seed: Option<u64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

/// Application state shared across handlers.
struct AppState {
    predictor: Arc<Predictor>,
    sampling: SamplingConfig,
    start_time: Instant,
}

/// Merge the configuration file (if any) with command-line overrides.
fn engine_config(args: &Args) -> envsynth::Result<EngineConfig> {
    let mut config = match &args.config {
        Some(path) => EngineConfig::from_json_file(path)?,
        None => EngineConfig::default(),
    };
    if let Some(path) = &args.model {
        config = config.with_model_path(path);
    }
    if let Some(path) = &args.tables {
        config = config.with_tables_path(path);
    }
    match (args.noise, args.seed) {
        (Some(NoiseArg::Hash), _) => config.noise = NoiseConfig::Hash,
        (Some(NoiseArg::Disabled), _) => config.noise = NoiseConfig::Disabled,
        (Some(NoiseArg::Uniform), seed) => config.noise = NoiseConfig::Uniform { seed },
        (None, Some(seed)) => config.noise = NoiseConfig::Uniform { seed: Some(seed) },
        (None, None) => {}
    }
    Ok(config)
}

fn build_predictor(args: &Args) -> envsynth::Result<Predictor> {
    let config = engine_config(args)?;
    Ok(Predictor::from_config(&config)?)
}

fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/predict", post(predict_handler))
        .route("/predict/full", post(predict_full_handler))
        .route("/heatmap-data", post(heatmap_handler))
        .route("/metrics", get(metrics_handler))
        .route("/health", get(health_handler))
        .route("/ready", get(ready_handler))
        .route("/status", get(status_handler))
        .with_state(state)
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = match args.log_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        };
        EnvFilter::from_default_env().add_directive(level.into())
    });

    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("EnvSynth Server v{}", env!("CARGO_PKG_VERSION"));

    // A predictor that cannot be built is fatal; never fail per request
    let predictor = match build_predictor(&args) {
        Ok(p) => p,
        Err(e) => {
            error!("Failed to initialize predictor: {}", e);
            std::process::exit(1);
        }
    };
    info!(
        "Predictor ready (model: {}, noise: {})",
        predictor.model_name(),
        predictor.noise_name()
    );

    let state = Arc::new(AppState {
        predictor: Arc::new(predictor),
        sampling: SamplingConfig::default(),
        start_time: Instant::now(),
    });

    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    info!("Starting server on http://{}", addr);

    let listener = match TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            error!("Failed to bind {}: {}", addr, e);
            std::process::exit(1);
        }
    };
    if let Err(e) = axum::serve(listener, app(state)).await {
        error!("Server error: {}", e);
        std::process::exit(1);
    }
}

/// Date and time strings for "now".
fn now_strings() -> (String, String) {
    let now = Local::now();
    (
        now.format("%Y%m%d").to_string(),
        now.format("%H:%M").to_string(),
    )
}

/// Run one prediction on the blocking pool and record metrics.
async fn run_prediction(
    state: &AppState,
    body: PredictBody,
) -> Result<PredictionResult, ApiError> {
    let (lat, lon) = coordinates(body.latitude.as_ref(), body.longitude.as_ref())?;
    let (now_date, now_time) = now_strings();
    let date = body.date.unwrap_or(now_date);
    let time = body.time.unwrap_or(now_time);

    let predictor = Arc::clone(&state.predictor);
    let started = Instant::now();
    let outcome = tokio::task::spawn_blocking(move || predictor.predict(&date, lat, lon, Some(&time)))
        .await
        .map_err(|e| ApiError::Task(e.to_string()))?;
    let elapsed = started.elapsed().as_secs_f64();

    match outcome {
        Ok(result) => {
            record_prediction(Outcome::Success, elapsed);
            info!("Prediction successful for lat={}, lon={}", lat, lon);
            Ok(result)
        }
        Err(e) => {
            record_prediction(Outcome::from(&e), elapsed);
            warn!("Prediction failed for lat={}, lon={}: {}", lat, lon, e);
            Err(e.into())
        }
    }
}

/// Compact, display-formatted prediction.
async fn predict_handler(
    State(state): State<Arc<AppState>>,
    Json(body): Json<PredictBody>,
) -> Result<Json<PredictionSummary>, ApiError> {
    let result = run_prediction(&state, body).await?;
    Ok(Json(result.summary()))
}

/// Full prediction result.
async fn predict_full_handler(
    State(state): State<Arc<AppState>>,
    Json(body): Json<PredictBody>,
) -> Result<Json<PredictionResult>, ApiError> {
    Ok(Json(run_prediction(&state, body).await?))
}

/// Jittered pollutant samples around a point, at the current time.
async fn heatmap_handler(
    State(state): State<Arc<AppState>>,
    Json(body): Json<HeatmapBody>,
) -> Result<Json<HeatmapSamples>, ApiError> {
    let (lat, lon) = coordinates(body.latitude.as_ref(), body.longitude.as_ref())?;
    let mut config = state.sampling;
    if let Some(r) = radius(body.radius.as_ref())? {
        config = config.with_radius(r);
    }
    let (date, time) = now_strings();

    let predictor = Arc::clone(&state.predictor);
    let outcome = tokio::task::spawn_blocking(move || {
        sample(&predictor, lat, lon, &date, Some(&time), &config)
    })
    .await
    .map_err(|e| ApiError::Task(e.to_string()))?;

    match outcome {
        Ok(samples) => {
            record_heatmap(samples.points.len(), samples.skipped);
            info!(
                "Heatmap around lat={}, lon={}: {} points, {} skipped",
                lat,
                lon,
                samples.points.len(),
                samples.skipped
            );
            Ok(Json(samples))
        }
        Err(e) => {
            if let envsynth::SamplingError::NoValidSamples { skipped } = e {
                record_heatmap(0, skipped);
            }
            warn!("Heatmap failed around lat={}, lon={}: {}", lat, lon, e);
            Err(e.into())
        }
    }
}

/// Metrics handler - returns Prometheus text format.
async fn metrics_handler() -> impl IntoResponse {
    let metrics = encode_metrics();
    (
        StatusCode::OK,
        [("Content-Type", "text/plain; charset=utf-8")],
        metrics,
    )
}

/// Health check handler.
async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// Readiness check handler. The predictor is built before the listener
/// opens, so a running server is always ready.
async fn ready_handler() -> impl IntoResponse {
    (StatusCode::OK, "Ready")
}

/// Status information response.
#[derive(Serialize)]
struct StatusResponse {
    version: String,
    engine_version: &'static str,
    uptime_secs: u64,
    model: String,
    noise: &'static str,
}

/// Status handler - returns JSON status information.
async fn status_handler(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    Json(StatusResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        engine_version: envsynth::VERSION,
        uptime_secs: state.start_time.elapsed().as_secs(),
        model: state.predictor.model_name().to_string(),
        noise: state.predictor.noise_name(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use envsynth::HashNoise;
    use serde_json::json;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn args(extra: &[&str]) -> Args {
        let mut argv = vec!["envsynth-server"];
        argv.extend_from_slice(extra);
        Args::parse_from(argv)
    }

    fn state() -> Arc<AppState> {
        let predictor = Predictor::builder()
            .noise(HashNoise)
            .self_test_seed(0)
            .build()
            .unwrap();
        Arc::new(AppState {
            predictor: Arc::new(predictor),
            sampling: SamplingConfig::default().with_points(5),
            start_time: Instant::now(),
        })
    }

    fn predict_body(value: serde_json::Value) -> PredictBody {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_cli_overrides() {
        let config = engine_config(&args(&["--noise", "hash", "--model", "/m.json"])).unwrap();
        assert_eq!(config.noise, NoiseConfig::Hash);
        assert_eq!(config.model_path, Some(PathBuf::from("/m.json")));

        let config = engine_config(&args(&["--seed", "9"])).unwrap();
        assert_eq!(config.noise, NoiseConfig::Uniform { seed: Some(9) });

        let config = engine_config(&args(&[])).unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_config_file_with_override() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"noise": {{"strategy": "disabled"}}, "self_test_seed": 4}}"#).unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let config = engine_config(&args(&["--config", &path])).unwrap();
        assert_eq!(config.noise, NoiseConfig::Disabled);
        assert_eq!(config.self_test_seed, Some(4));

        let config = engine_config(&args(&["--config", &path, "--noise", "uniform"])).unwrap();
        assert_eq!(config.noise, NoiseConfig::Uniform { seed: None });
    }

    #[test]
    fn test_missing_model_is_fatal() {
        assert!(build_predictor(&args(&["--model", "/no/such/weights.json"])).is_err());
    }

    #[tokio::test]
    async fn test_predict_summary() {
        let body = predict_body(json!({
            "latitude": 40.7, "longitude": "-74.0", "date": "20250615", "time": "14:00"
        }));
        let Json(summary) = predict_handler(State(state()), Json(body)).await.unwrap();
        assert!(summary.temperature.ends_with("°C"));
        assert!(summary.co2.ends_with(" ppm"));
    }

    #[tokio::test]
    async fn test_predict_full_defaults_to_now() {
        let body = predict_body(json!({ "latitude": 0, "longitude": 10 }));
        let Json(result) = predict_full_handler(State(state()), Json(body)).await.unwrap();
        assert_eq!(result.metadata.date.len(), 8);
        assert_eq!(result.metadata.time.len(), 5);
    }

    #[tokio::test]
    async fn test_predict_missing_coordinates() {
        let body = predict_body(json!({ "latitude": 40.7 }));
        let err = predict_handler(State(state()), Json(body)).await.unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_predict_bad_date_is_server_error() {
        let body = predict_body(json!({ "latitude": 1, "longitude": 2, "date": "June 15" }));
        let err = predict_handler(State(state()), Json(body)).await.unwrap_err();
        assert!(matches!(err, ApiError::Prediction(_)));
        assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_heatmap() {
        let body: HeatmapBody =
            serde_json::from_value(json!({ "latitude": 30.0, "longitude": 31.2, "radius": 0.05 }))
                .unwrap();
        let Json(samples) = heatmap_handler(State(state()), Json(body)).await.unwrap();
        assert_eq!(samples.points.len(), 5);
        assert_eq!(samples.radius_deg, 0.05);
    }

    #[tokio::test]
    async fn test_heatmap_huge_radius_is_client_error() {
        let body: HeatmapBody =
            serde_json::from_value(json!({ "latitude": 40.7, "longitude": -74.0, "radius": 1e308 }))
                .unwrap();
        let err = heatmap_handler(State(state()), Json(body)).await.unwrap_err();
        assert!(matches!(err, ApiError::Sampling(_)));
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_status() {
        let Json(status) = status_handler(State(state())).await;
        assert_eq!(status.noise, "hash");
        assert_eq!(status.model, "surrogate");
    }
}
