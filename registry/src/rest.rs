use crate::auth::{require_bearer, ApiToken};
use crate::errors::Error;
use crate::logging::correlate;
use crate::metrics::{
    gather_metrics, SENSORS_CREATED_TOTAL, SENSORS_DELETED_TOTAL, STORAGE_FAILURES_TOTAL,
};
use crate::model::{HealthResponse, Sensor, SensorInput, SensorList};
use crate::repository::SensorRepository;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

pub const SERVICE_NAME: &str = env!("CARGO_PKG_NAME");

#[derive(Debug, Clone)]
struct AppState<R> {
    repo: R,
}

/// Builds the full application: `/health` and `/metrics` are open, every
/// `/sensors` route requires `Authorization: Bearer <api_token>`.
pub fn create_router<R: SensorRepository>(repo: R, api_token: &str) -> Router {
    let state = AppState { repo };

    let sensors = Router::new()
        .route("/sensors", get(list_sensors::<R>).post(create_sensor::<R>))
        .route(
            "/sensors/:id",
            get(get_sensor::<R>)
                .put(update_sensor::<R>)
                .delete(delete_sensor::<R>),
        )
        .route_layer(middleware::from_fn_with_state(
            ApiToken::new(api_token),
            require_bearer,
        ))
        .with_state(state);

    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics_handler))
        .merge(sensors)
        .layer(middleware::from_fn(correlate))
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        service: SERVICE_NAME.to_string(),
    })
}

async fn metrics_handler() -> String {
    gather_metrics()
}

async fn list_sensors<R: SensorRepository>(
    State(state): State<AppState<R>>,
) -> Result<Json<SensorList>, ApiError> {
    let sensors = state
        .repo
        .list()
        .await
        .map_err(|e| ApiError::for_operation(Operation::List, e))?;

    Ok(Json(SensorList {
        count: sensors.len(),
        sensors,
    }))
}

async fn get_sensor<R: SensorRepository>(
    State(state): State<AppState<R>>,
    Path(id): Path<String>,
) -> Result<Json<Sensor>, ApiError> {
    match state.repo.get(&id).await {
        Ok(Some(sensor)) => Ok(Json(sensor)),
        Ok(None) => Err(ApiError::from(Error::NotFound(id))),
        Err(e) => Err(ApiError::for_operation(Operation::Get, e)),
    }
}

async fn create_sensor<R: SensorRepository>(
    State(state): State<AppState<R>>,
    body: Result<Json<SensorInput>, JsonRejection>,
) -> Result<(StatusCode, Json<Sensor>), ApiError> {
    let Json(input) = body?;
    let sensor = state
        .repo
        .create(&input)
        .await
        .map_err(|e| ApiError::for_operation(Operation::Create, e))?;

    SENSORS_CREATED_TOTAL.inc();
    info!("Created sensor {}", sensor.id);
    Ok((StatusCode::CREATED, Json(sensor)))
}

async fn update_sensor<R: SensorRepository>(
    State(state): State<AppState<R>>,
    Path(id): Path<String>,
    body: Result<Json<SensorInput>, JsonRejection>,
) -> Result<Json<Sensor>, ApiError> {
    let Json(input) = body?;
    let sensor = state
        .repo
        .update(&id, &input)
        .await
        .map_err(|e| ApiError::for_operation(Operation::Update, e))?;

    Ok(Json(sensor))
}

async fn delete_sensor<R: SensorRepository>(
    State(state): State<AppState<R>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state
        .repo
        .delete(&id)
        .await
        .map_err(|e| ApiError::for_operation(Operation::Delete, e))?;

    SENSORS_DELETED_TOTAL.inc();
    info!("Deleted sensor {}", id);
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Clone, Copy)]
enum Operation {
    List,
    Get,
    Create,
    Update,
    Delete,
}

impl Operation {
    fn failure_message(self) -> &'static str {
        match self {
            Operation::List => "Failed to retrieve sensors",
            Operation::Get => "Failed to retrieve sensor",
            Operation::Create => "Failed to create sensor",
            Operation::Update => "Failed to update sensor",
            Operation::Delete => "Failed to delete sensor",
        }
    }

    /// Writes report storage trouble as a rejected request, reads as a server fault.
    fn failure_status(self) -> StatusCode {
        match self {
            Operation::Create | Operation::Update => StatusCode::BAD_REQUEST,
            Operation::List | Operation::Get | Operation::Delete => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// JSON body of every error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorBody,
}

impl ApiError {
    fn new(status: StatusCode, error: &str, detail: Option<String>) -> Self {
        Self {
            status,
            body: ErrorBody {
                error: error.to_string(),
                detail,
            },
        }
    }

    fn for_operation(op: Operation, err: Error) -> Self {
        match err {
            Error::InvalidValue { .. } | Error::MissingField(_) => Self::new(
                StatusCode::BAD_REQUEST,
                op.failure_message(),
                Some(err.to_string()),
            ),
            e if e.is_client_error() => Self::from(e),
            e => {
                STORAGE_FAILURES_TOTAL.inc();
                error!("{}: {}", op.failure_message(), e);
                Self::new(op.failure_status(), op.failure_message(), None)
            }
        }
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        match err {
            Error::NotFound(_) => {
                Self::new(StatusCode::NOT_FOUND, "Sensor not found", Some(err.to_string()))
            }
            Error::Unauthorized(reason) => Self::new(StatusCode::UNAUTHORIZED, reason, None),
            Error::InvalidValue { .. } | Error::MissingField(_) => Self::new(
                StatusCode::BAD_REQUEST,
                "Invalid request body",
                Some(err.to_string()),
            ),
            e => {
                error!("Internal error: {}", e);
                Self::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error",
                    None,
                )
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            "Invalid request body",
            Some(rejection.body_text()),
        )
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}
