// Fund Catalog - REST API with Axum
//
// Read-only fund queries plus the CSV upload endpoint. Handlers are thin:
// every call goes straight to the store or the ingestion pipeline.

use crate::db::{get_fund, list_funds, sum_aum, UpsertReport};
use crate::entities::{Fund, Strategy};
use crate::error::{ErrorKind, FundError};
use crate::ingest::ingest;
use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Multipart field carrying the uploaded file
pub const UPLOAD_FIELD: &str = "upload_file";

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Mutex<Connection>>,
}

impl AppState {
    pub fn new(conn: Connection) -> Self {
        Self {
            db: Arc::new(Mutex::new(conn)),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, ApiError> {
        self.db
            .lock()
            .map_err(|_| ApiError::Internal("database lock poisoned".to_string()))
    }
}

/// API Response wrapper
#[derive(Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
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

impl ApiResponse<()> {
    fn err(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug)]
pub enum ApiError {
    Fund(FundError),
    BadRequest(String),
    NotFound(String),
    Internal(String),
}

impl From<FundError> for ApiError {
    fn from(err: FundError) -> Self {
        ApiError::Fund(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Fund(err) => {
                let status = match (&err, err.kind()) {
                    (FundError::DuplicateName(_), _) => StatusCode::CONFLICT,
                    (_, ErrorKind::Decoding | ErrorKind::MalformedRow | ErrorKind::Validation) => {
                        StatusCode::BAD_REQUEST
                    }
                    (_, ErrorKind::NotFound) => StatusCode::NOT_FOUND,
                    (_, ErrorKind::Store) => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (status, err.to_string())
            }
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, message),
            ApiError::Internal(message) => (StatusCode::INTERNAL_SERVER_ERROR, message),
        };

        if status.is_server_error() {
            error!(%status, %message, "request failed");
        } else {
            warn!(%status, %message, "request rejected");
        }

        (status, Json(ApiResponse::err(message))).into_response()
    }
}

// ============================================================================
// Request / response types
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct StrategyQuery {
    pub strategy: Option<String>,
}

/// Resolved strategy filter: no filter, one strategy, or a value that
/// cannot match any fund
enum StrategyFilter {
    Any,
    Only(Strategy),
    NoMatch,
}

impl StrategyQuery {
    fn filter(&self) -> StrategyFilter {
        match self.strategy.as_deref() {
            None | Some("") => StrategyFilter::Any,
            Some(raw) => match raw.parse() {
                Ok(strategy) => StrategyFilter::Only(strategy),
                Err(_) => StrategyFilter::NoMatch,
            },
        }
    }
}

#[derive(Serialize)]
pub struct FundListResponse {
    pub count: usize,
    pub results: Vec<Fund>,
}

#[derive(Serialize)]
pub struct StrategyOption {
    pub strategy: Strategy,
    pub selected: bool,
}

/// Everything the browsable list page shows
#[derive(Serialize)]
pub struct ListPageResponse {
    pub funds: Vec<Fund>,
    pub strategies: Vec<StrategyOption>,
    pub total_aum: Option<i64>,
}

#[derive(Serialize)]
pub struct UploadResponse {
    pub processed: usize,
    pub created: usize,
    pub updated: usize,
}

impl From<UpsertReport> for UploadResponse {
    fn from(report: UpsertReport) -> Self {
        Self {
            processed: report.processed(),
            created: report.created,
            updated: report.updated,
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

/// GET /api/fund - List funds ordered by name, `?strategy=` exact filter
async fn list_fund_handler(
    State(state): State<AppState>,
    Query(query): Query<StrategyQuery>,
) -> Result<Json<ApiResponse<FundListResponse>>, ApiError> {
    let funds = match query.filter() {
        StrategyFilter::Any => list_funds(&*state.lock()?, None)?,
        StrategyFilter::Only(strategy) => list_funds(&*state.lock()?, Some(strategy))?,
        StrategyFilter::NoMatch => Vec::new(),
    };

    Ok(Json(ApiResponse::ok(FundListResponse {
        count: funds.len(),
        results: funds,
    })))
}

/// GET /api/fund/:id - Retrieve one fund
async fn get_fund_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Fund>>, ApiError> {
    let id = Uuid::parse_str(&id).map_err(|_| ApiError::NotFound(format!("fund {} not found", id)))?;
    let fund = get_fund(&*state.lock()?, id)?;

    Ok(Json(ApiResponse::ok(fund)))
}

/// GET /api/list - Funds, strategy choices and total AUM for the list page
async fn list_page_handler(
    State(state): State<AppState>,
    Query(query): Query<StrategyQuery>,
) -> Result<Json<ApiResponse<ListPageResponse>>, ApiError> {
    let (funds, total_aum, selected) = match query.filter() {
        StrategyFilter::NoMatch => (Vec::new(), None, None),
        filter => {
            let strategy = match filter {
                StrategyFilter::Only(strategy) => Some(strategy),
                _ => None,
            };
            let conn = state.lock()?;
            (
                list_funds(&conn, strategy)?,
                sum_aum(&conn, strategy)?,
                strategy,
            )
        }
    };

    let strategies = Strategy::ALL
        .iter()
        .map(|&strategy| StrategyOption {
            strategy,
            selected: Some(strategy) == selected,
        })
        .collect();

    Ok(Json(ApiResponse::ok(ListPageResponse {
        funds,
        strategies,
        total_aum,
    })))
}

/// POST /api/upload - Ingest a CSV file sent as multipart form data
async fn upload_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ApiResponse<UploadResponse>>, ApiError> {
    let mut upload = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("invalid form data: {}", e)))?
    {
        if field.name() == Some(UPLOAD_FIELD) {
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ApiError::BadRequest(format!("failed to read upload: {}", e)))?;
            upload = Some(bytes);
        }
    }

    let bytes = upload.ok_or_else(|| {
        ApiError::BadRequest(format!("missing '{}' field", UPLOAD_FIELD))
    })?;

    info!(bytes = bytes.len(), "received fund upload");

    let report = {
        let mut conn = state.lock()?;
        ingest(&mut conn, &bytes)?
    };

    Ok(Json(ApiResponse::ok(report.into())))
}

// ============================================================================
// Router
// ============================================================================

/// Build the application router.
///
/// # Arguments
/// * `state` - Shared database handle
/// * `max_upload_bytes` - Body limit for the upload endpoint
pub fn create_router(state: AppState, max_upload_bytes: usize) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/fund", get(list_fund_handler))
        .route("/fund/", get(list_fund_handler))
        .route("/fund/:id", get(get_fund_handler))
        .route("/fund/:id/", get(get_fund_handler))
        .route("/list", get(list_page_handler))
        .route(
            "/upload",
            post(upload_handler).layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .with_state(state);

    Router::new()
        .nest("/api", api_routes)
        .layer(ServiceBuilder::new().layer(CorsLayer::permissive()))
}
