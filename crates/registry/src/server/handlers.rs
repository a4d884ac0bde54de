//! Axum request handlers for all service endpoints.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use common::{
    protocol::{ErrorResponse, HealthResponse, PersonRequest, PersonResponse},
    ServiceError,
};
use tracing::warn;
use uuid::Uuid;

use super::state::AppState;
use crate::persons::{service, Person};

/// `POST /persons` — validate and store a new person.
///
/// Returns `201 Created` with the decrypted record, or `422` with per-field
/// messages when validation fails.
pub async fn create_person(
    State(state): State<AppState>,
    body: Result<Json<PersonRequest>, JsonRejection>,
) -> Response {
    let req = match parse_body(body) {
        Ok(req) => req,
        Err(e) => return error_response(e),
    };
    match service::create(state.store.as_ref(), state.name_max_length, req).await {
        Ok(person) => (StatusCode::CREATED, Json(PersonResponse::from(person))).into_response(),
        Err(e) => error_response(e),
    }
}

/// `GET /persons/{id}` — load and decrypt a person.
pub async fn get_person(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(e) => return error_response(e),
    };
    match service::fetch(state.store.as_ref(), id).await {
        Ok(person) => (StatusCode::OK, Json(PersonResponse::from(person))).into_response(),
        Err(e) => error_response(e),
    }
}

/// `PUT /persons/{id}` — replace every field of a person.
pub async fn update_person(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<PersonRequest>, JsonRejection>,
) -> Response {
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(e) => return error_response(e),
    };
    let req = match parse_body(body) {
        Ok(req) => req,
        Err(e) => return error_response(e),
    };
    match service::update(state.store.as_ref(), state.name_max_length, id, req).await {
        Ok(person) => (StatusCode::OK, Json(PersonResponse::from(person))).into_response(),
        Err(e) => error_response(e),
    }
}

/// `GET /health` — liveness and readiness check.
///
/// Returns `200 OK` when the database answers a ping, `503` otherwise.
pub async fn health(State(state): State<AppState>) -> Response {
    let database = match state.store.ping().await {
        Ok(()) => true,
        Err(e) => {
            warn!(error = %e, "database ping failed");
            false
        }
    };

    let (status_code, status_str) = if database {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };

    let body = HealthResponse {
        status: status_str.into(),
        database,
    };
    (status_code, Json(body)).into_response()
}

/// Catch-all 404 handler.
pub async fn not_found() -> impl IntoResponse {
    let err = ErrorResponse::new("not_found", "the requested resource does not exist");
    (StatusCode::NOT_FOUND, Json(err))
}

/// Malformed JSON, wrong field types and a missing JSON content type all
/// become a 400 with a regular [`ErrorResponse`] body.
fn parse_body(
    body: Result<Json<PersonRequest>, JsonRejection>,
) -> Result<PersonRequest, ServiceError> {
    body.map(|Json(req)| req)
        .map_err(|rejection| ServiceError::BadRequest(rejection.body_text()))
}

fn parse_id(raw: &str) -> Result<Uuid, ServiceError> {
    Uuid::parse_str(raw).map_err(|_| ServiceError::BadRequest(format!("invalid person id: {raw}")))
}

/// Render a [`ServiceError`] as a JSON [`ErrorResponse`] with the matching status.
fn error_response(err: ServiceError) -> Response {
    let status =
        StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let body = match err {
        ServiceError::Validation(errors) => {
            ErrorResponse::new("validation_failed", "request failed validation").with_errors(errors)
        }
        other => ErrorResponse::new(other.code(), other.to_string()),
    };
    (status, Json(body)).into_response()
}

impl From<Person> for PersonResponse {
    fn from(p: Person) -> Self {
        Self {
            id: p.id,
            key: p.key,
            first_name: p.first_name,
            last_name: p.last_name,
        }
    }
}
