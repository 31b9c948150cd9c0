use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use billing_storage::{
    parse_month, PageRequest, QueryError, SummaryFilter, SummaryPage, SummaryReader,
    SummaryTotals, DEFAULT_PAGE_SIZE,
};
use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::error;

// ============================================================================
// State
// ============================================================================

pub struct AppState {
    database: PathBuf,
    reader: OnceCell<SummaryReader>,
}

impl AppState {
    pub fn new(database: PathBuf) -> Self {
        Self {
            database,
            reader: OnceCell::new(),
        }
    }

    /// The reader is opened on first use so the server can start before the
    /// pipeline has produced a database.
    async fn reader(&self) -> Result<&SummaryReader, QueryError> {
        self.reader
            .get_or_try_init(|| SummaryReader::open(&self.database))
            .await
    }
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Serialize)]
struct ErrorResponse {
    detail: String,
}

struct ApiError(QueryError);

impl From<QueryError> for ApiError {
    fn from(e: QueryError) -> Self {
        Self(e)
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self(QueryError::InvalidRequest(rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match &self.0 {
            QueryError::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg.clone()),
            QueryError::InvalidRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            QueryError::Internal(e) => {
                error!(error = %e, "summary query failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
        };
        (status, Json(ErrorResponse { detail })).into_response()
    }
}

// ============================================================================
// Handlers
// ============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    database: bool,
}

async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let database = match state.reader().await {
        Ok(reader) => reader.is_healthy().await,
        Err(_) => false,
    };

    Json(HealthResponse {
        status: if database { "OK" } else { "WARNING" },
        version: env!("CARGO_PKG_VERSION"),
        database,
    })
}

#[derive(Deserialize)]
struct SummaryQuery {
    creditor: Option<String>,
    status: Option<String>,
    month: Option<String>,
    page: Option<u32>,
    page_size: Option<u32>,
}

async fn summary_handler(
    State(state): State<Arc<AppState>>,
    params: Result<Query<SummaryQuery>, QueryRejection>,
) -> Result<Json<SummaryPage>, ApiError> {
    let Query(params) = params?;
    let month = params
        .month
        .as_deref()
        .filter(|m| !m.trim().is_empty())
        .map(parse_month)
        .transpose()?;
    let page = PageRequest::new(
        params.page.unwrap_or(1),
        params.page_size.unwrap_or(DEFAULT_PAGE_SIZE),
    )?;
    let filter = SummaryFilter {
        creditor: params.creditor,
        status: params.status,
        month,
    };

    let reader = state.reader().await?;
    Ok(Json(reader.list(&filter, page).await?))
}

async fn aggregations_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SummaryTotals>, ApiError> {
    let reader = state.reader().await?;
    Ok(Json(reader.totals().await?))
}

async fn months_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let reader = state.reader().await?;
    let months = reader.months().await?;
    Ok(Json(serde_json::json!({ "months": months })))
}

async fn creditors_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let reader = state.reader().await?;
    let creditors = reader.creditors().await?;
    Ok(Json(serde_json::json!({ "creditors": creditors })))
}

// ============================================================================
// Router
// ============================================================================

pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/summary", get(summary_handler))
        .route("/summary/aggregations", get(aggregations_handler))
        .route("/summary/months", get(months_handler))
        .route("/summary/creditors", get(creditors_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
