//! HTTP surface: health check, single and batch forecasts.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use slopebrain::forecast::{forecast_many, ForecastConfig, ForecastError, Forecaster, StepTrace};
use slopebrain::observer::{BrainAdapter, BrainSnapshot};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, info, warn};

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Forecast(#[from] ForecastError),
    #[error("{0}")]
    BadRequest(String),
    #[error("series has {got} points, the limit is {max}")]
    TooLarge { got: usize, max: usize },
    #[error("forecast worker failed: {0}")]
    Worker(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Forecast(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Worker(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

#[derive(Serialize)]
pub struct ErrorResponse {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            warn!(error = %self, "Request failed");
        }
        (status, Json(ErrorResponse { error: self.to_string() })).into_response()
    }
}

#[derive(Clone)]
pub struct ApiState {
    cfg: Arc<ForecastConfig>,
    max_series_len: usize,
}

impl ApiState {
    pub fn new(cfg: ForecastConfig, max_series_len: usize) -> Self {
        Self {
            cfg: Arc::new(cfg),
            max_series_len,
        }
    }

    fn check_len(&self, len: usize) -> Result<(), ApiError> {
        if len > self.max_series_len {
            return Err(ApiError::TooLarge {
                got: len,
                max: self.max_series_len,
            });
        }
        Ok(())
    }
}

#[derive(Serialize)]
pub struct HealthResponse {
    status: String,
    version: String,
}

#[derive(Debug, Deserialize)]
pub struct ForecastRequest {
    #[serde(rename = "timeSeriesData", alias = "series")]
    pub series: Vec<f64>,
    #[serde(default)]
    pub debug: bool,
}

#[derive(Debug, Serialize)]
pub struct ForecastResponse {
    pub forecast: f64,
    /// True when the model had no evidence and `forecast` is the last value.
    pub fallback: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub steps: Option<Vec<StepTrace>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<BrainSnapshot>,
}

#[derive(Debug, Deserialize)]
pub struct BatchRequest {
    pub series: Vec<Vec<f64>>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum BatchEntry {
    Forecast { forecast: f64, fallback: bool },
    Error { error: String },
}

#[derive(Debug, Serialize)]
pub struct BatchResponse {
    pub results: Vec<BatchEntry>,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

fn run_forecast(
    cfg: &ForecastConfig,
    req: ForecastRequest,
) -> Result<ForecastResponse, ForecastError> {
    let mut forecaster = Forecaster::new(cfg)?;
    let report = forecaster.run(&req.series)?;

    for step in &report.steps {
        debug!(
            index = step.index,
            symbol = %step.symbol,
            predicted = step.predicted.as_deref().unwrap_or("-"),
            accuracy = step.accuracy,
            "step"
        );
    }
    info!(
        len = req.series.len(),
        forecast = report.value_or_last(),
        fallback = report.is_fallback(),
        accuracy = report.mean_accuracy,
        "Forecast"
    );

    let snapshot = req
        .debug
        .then(|| BrainAdapter::new(forecaster.brain()).snapshot());
    Ok(ForecastResponse {
        forecast: report.value_or_last(),
        fallback: report.is_fallback(),
        accuracy: if req.debug { report.mean_accuracy } else { None },
        steps: req.debug.then_some(report.steps),
        snapshot,
    })
}

pub async fn post_forecast(
    State(state): State<ApiState>,
    payload: Result<Json<ForecastRequest>, JsonRejection>,
) -> Result<Json<ForecastResponse>, ApiError> {
    let Json(req) = payload?;
    state.check_len(req.series.len())?;

    let cfg = Arc::clone(&state.cfg);
    let response = tokio::task::spawn_blocking(move || run_forecast(&cfg, req))
        .await
        .map_err(|e| ApiError::Worker(e.to_string()))??;
    Ok(Json(response))
}

pub async fn post_forecast_batch(
    State(state): State<ApiState>,
    payload: Result<Json<BatchRequest>, JsonRejection>,
) -> Result<Json<BatchResponse>, ApiError> {
    let Json(req) = payload?;
    for s in &req.series {
        state.check_len(s.len())?;
    }

    let cfg = Arc::clone(&state.cfg);
    let count = req.series.len();
    let reports = tokio::task::spawn_blocking(move || forecast_many(&req.series, &cfg))
        .await
        .map_err(|e| ApiError::Worker(e.to_string()))?;

    let results: Vec<BatchEntry> = reports
        .into_iter()
        .map(|r| match r {
            Ok(report) => BatchEntry::Forecast {
                forecast: report.value_or_last(),
                fallback: report.is_fallback(),
            },
            Err(e) => BatchEntry::Error {
                error: e.to_string(),
            },
        })
        .collect();
    info!(count, "Batch forecast");
    Ok(Json(BatchResponse { results }))
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/forecast", post(post_forecast))
        .route("/api/forecast/batch", post(post_forecast_batch))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> ApiState {
        ApiState::new(ForecastConfig::default(), 8)
    }

    fn request(series: &[f64], debug: bool) -> Result<Json<ForecastRequest>, JsonRejection> {
        Ok(Json(ForecastRequest {
            series: series.to_vec(),
            debug,
        }))
    }

    async fn body_json(resp: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn request_accepts_both_field_names() {
        let a: ForecastRequest = serde_json::from_str(r#"{"timeSeriesData":[1,2,3]}"#).unwrap();
        let b: ForecastRequest =
            serde_json::from_str(r#"{"series":[1,2,3],"debug":true}"#).unwrap();
        assert_eq!(a.series, b.series);
        assert!(!a.debug);
        assert!(b.debug);
    }

    #[tokio::test]
    async fn rising_series_forecasts_higher() {
        let Json(resp) = post_forecast(State(state()), request(&[1.0, 2.0, 3.0, 4.0, 5.0], false))
            .await
            .unwrap();
        assert!(resp.forecast > 5.0);
        assert!(!resp.fallback);
        assert!(resp.steps.is_none());
        assert!(resp.snapshot.is_none());
    }

    #[tokio::test]
    async fn debug_adds_trace_and_snapshot() {
        let Json(resp) = post_forecast(State(state()), request(&[1.0, 2.0, 3.0, 4.0, 5.0], true))
            .await
            .unwrap();
        assert_eq!(resp.steps.as_ref().map(Vec::len), Some(4));
        assert_eq!(resp.accuracy, Some(100.0));
        let snapshot = resp.snapshot.unwrap();
        assert!(!snapshot.levels.is_empty());
    }

    #[tokio::test]
    async fn two_points_fall_back_to_last_value() {
        let Json(resp) = post_forecast(State(state()), request(&[3.0, 7.0], false))
            .await
            .unwrap();
        assert_eq!(resp.forecast, 7.0);
        assert!(resp.fallback);
    }

    #[tokio::test]
    async fn too_few_points_is_400() {
        let err = post_forecast(State(state()), request(&[1.0], false))
            .await
            .unwrap_err();
        let resp = err.into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body = body_json(resp).await;
        assert_eq!(body["error"], "Need at least 2 numbers for forecasting");
    }

    #[tokio::test]
    async fn oversized_series_is_413() {
        let series: Vec<f64> = (0..9).map(f64::from).collect();
        let err = post_forecast(State(state()), request(&series, false))
            .await
            .unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn batch_reports_each_series_independently() {
        let req = BatchRequest {
            series: vec![
                vec![1.0, 2.0, 3.0, 4.0, 5.0],
                vec![1.0],
                vec![5.0, 4.0, 3.0, 2.0, 1.0],
            ],
        };
        let Json(resp) = post_forecast_batch(State(state()), Ok(Json(req)))
            .await
            .unwrap();
        let body = serde_json::to_value(&resp).unwrap();
        let results = body["results"].as_array().unwrap();
        assert_eq!(results.len(), 3);
        assert!(results[0]["forecast"].as_f64().unwrap() > 5.0);
        assert_eq!(results[1]["error"], "Need at least 2 numbers for forecasting");
        assert!(results[2]["forecast"].as_f64().unwrap() < 1.0);
    }
}
