// 🌐 REST API with Axum
//
// Thin HTTP surface over the registry and the scan workflow. The client does
// the capture: a scan request carries the decoded QR payload plus the
// position reading (or the geolocation failure) the client observed.

use crate::config::TrackerConfig;
use crate::decoder::{ScanFrame, TextPayloadDecoder};
use crate::entities::{ObjectRegistry, TrackedObject};
use crate::error::TrackerError;
use crate::export::PrintSheet;
use crate::geolocation::{GeolocationError, ScriptedGeolocation};
use crate::location::{format_time_ago, LocationSample, RawPosition};
use crate::render::{QrRenderer, RenderedImage, SvgQrRenderer};
use crate::workflow::{ScanGate, ScanReport, ScanStatus, ScanWorkflow};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Json, Response},
    routing::get,
    Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub registry: ObjectRegistry,
    pub gate: ScanGate,
    pub config: Arc<TrackerConfig>,
}

impl AppState {
    pub fn new(registry: ObjectRegistry, config: TrackerConfig) -> Self {
        AppState {
            registry,
            gate: ScanGate::new(),
            config: Arc::new(config),
        }
    }
}

/// API Response wrapper
#[derive(Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

/// Error → status code + envelope
struct ApiError(TrackerError);

impl From<TrackerError> for ApiError {
    fn from(err: TrackerError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            TrackerError::Validation(_) => StatusCode::BAD_REQUEST,
            TrackerError::NoMatch { .. } => StatusCode::NOT_FOUND,
            TrackerError::ScanInProgress => StatusCode::CONFLICT,
            TrackerError::Acquisition(_) | TrackerError::Unreadable => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            TrackerError::Render(_) | TrackerError::Export(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = ApiResponse::<()> {
            success: false,
            data: None,
            error: Some(self.0.to_string()),
        };
        (status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

fn lookup(state: &AppState, token: &str) -> Result<TrackedObject, ApiError> {
    state.registry.find_by_token(token).ok_or_else(|| {
        ApiError(TrackerError::NoMatch {
            token: token.to_string(),
        })
    })
}

// ============================================================================
// Request / response bodies
// ============================================================================

#[derive(Deserialize)]
pub struct CreateObjectRequest {
    pub name: String,
}

#[derive(Serialize, Deserialize)]
pub struct LocatedObjectResponse {
    pub name: String,
    pub identity_token: String,
    pub address: Option<String>,
    pub seen: String,
}

#[derive(Deserialize)]
pub struct ScanRequest {
    /// Decoded QR payload
    pub payload: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// Failure the client's geolocation reported instead of a position
    pub error: Option<GeolocationError>,
}

impl ScanRequest {
    fn reading(&self) -> Result<RawPosition, GeolocationError> {
        if let Some(err) = self.error {
            return Err(err);
        }
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => Ok(RawPosition::new(lat, lon)),
            _ => Err(GeolocationError::PositionUnavailable),
        }
    }
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET /api/objects - All objects, insertion order
async fn list_objects(State(state): State<AppState>) -> ApiResult<Vec<TrackedObject>> {
    Ok(Json(ApiResponse::ok(state.registry.list())))
}

/// POST /api/objects - Register a new object
async fn create_object(
    State(state): State<AppState>,
    Json(request): Json<CreateObjectRequest>,
) -> Result<(StatusCode, Json<ApiResponse<TrackedObject>>), ApiError> {
    let object = state.registry.register(&request.name)?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(object))))
}

/// GET /api/objects/located - Objects with a known last location
async fn located_objects(State(state): State<AppState>) -> ApiResult<Vec<LocatedObjectResponse>> {
    let now = Utc::now();
    let located = state
        .registry
        .located()
        .into_iter()
        .filter_map(|object| {
            let last = object.last_location()?;
            Some(LocatedObjectResponse {
                name: object.name().to_string(),
                identity_token: object.identity_token().to_string(),
                address: last.address().map(str::to_string),
                seen: format_time_ago(last.timestamp(), now),
            })
        })
        .collect();
    Ok(Json(ApiResponse::ok(located)))
}

/// GET /api/objects/:token - One object
async fn get_object(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> ApiResult<TrackedObject> {
    Ok(Json(ApiResponse::ok(lookup(&state, &token)?)))
}

/// GET /api/objects/:token/history - Location history, newest first
async fn get_history(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> ApiResult<Vec<Arc<LocationSample>>> {
    let object = lookup(&state, &token)?;
    Ok(Json(ApiResponse::ok(object.location_history().to_vec())))
}

fn render_for(state: &AppState, object: &TrackedObject) -> Result<RenderedImage, ApiError> {
    SvgQrRenderer
        .render(object.identity_token(), &state.config.render)
        .map_err(|e| ApiError(e.into()))
}

/// GET /api/objects/:token/qr - QR image as data URI
async fn get_qr(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> ApiResult<RenderedImage> {
    let object = lookup(&state, &token)?;
    Ok(Json(ApiResponse::ok(render_for(&state, &object)?)))
}

/// GET /api/objects/:token/print - Printable label sheet
async fn get_print_sheet(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Html<String>, ApiError> {
    let object = lookup(&state, &token)?;
    let image = render_for(&state, &object)?;
    Ok(Html(PrintSheet::for_object(&object, &image).to_html()))
}

/// POST /api/scan - Record a scan reported by the client
async fn scan(State(state): State<AppState>, Json(request): Json<ScanRequest>) -> ApiResult<ScanReport> {
    let workflow = ScanWorkflow::new(
        state.registry.clone(),
        TextPayloadDecoder,
        ScriptedGeolocation::new([request.reading()]),
    )
    .with_options(state.config.geolocation)
    .with_gate(state.gate.clone());

    let report = workflow.trigger(ScanFrame::from_payload(&request.payload)).await?;
    Ok(Json(ApiResponse::ok(report)))
}

/// GET /api/scan/status - Workflow state and last outcome
async fn scan_status(State(state): State<AppState>) -> ApiResult<ScanStatus> {
    Ok(Json(ApiResponse::ok(state.gate.status())))
}

pub fn router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/objects", get(list_objects).post(create_object))
        .route("/objects/located", get(located_objects))
        .route("/objects/:token", get(get_object))
        .route("/objects/:token/history", get(get_history))
        .route("/objects/:token/qr", get(get_qr))
        .route("/objects/:token/print", get(get_print_sheet))
        .route("/scan", axum::routing::post(scan))
        .route("/scan/status", get(scan_status))
        .with_state(state);

    Router::new()
        .nest("/api", api_routes)
        .layer(CorsLayer::permissive())
}

// ============================================================================
// TESTS
// ============================================================================
