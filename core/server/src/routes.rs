//! Route table and request handlers.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    middleware,
    routing::{get, post},
    Json, Router,
};

use crate::error::ApiError;
use crate::middleware::log_requests;
use lockbox_common::api::{
    CredentialsRequest, ListResponse, StoreResponse, TokenResponse, UpdateRequest,
};
use lockbox_common::{NewRecord, Record, RecordId, SensitiveBytes};
use lockbox_vault::{RequestHandler, VersionInfo};

/// Shared state of every route.
#[derive(Clone)]
pub struct AppState {
    handler: RequestHandler,
}

/// Build the router exposing every vault operation.
pub fn router(handler: RequestHandler) -> Router {
    Router::new()
        .route("/v1/version", get(version))
        .route("/v1/register", post(register))
        .route("/v1/login", post(login))
        .route("/v1/records", post(store_record).get(list_records))
        .route(
            "/v1/records/{id}",
            get(retrieve_record)
                .put(update_record)
                .delete(delete_record),
        )
        .layer(middleware::from_fn(log_requests))
        .with_state(AppState { handler })
}

/// Extract the caller's token from `Authorization: Bearer <token>`.
///
/// A missing or non-bearer header yields an empty token, which the core
/// rejects like any other invalid token.
fn bearer_token(headers: &HeaderMap) -> &str {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .unwrap_or("")
}

fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    body.map(|Json(value)| value)
        .map_err(|rejection| ApiError::bad_request(rejection.body_text()))
}

fn record_id(path: Result<Path<i64>, PathRejection>) -> Result<RecordId, ApiError> {
    path.map(|Path(id)| RecordId::new(id))
        .map_err(|rejection| ApiError::bad_request(rejection.body_text()))
}

async fn version(State(state): State<AppState>) -> Json<VersionInfo> {
    Json(state.handler.version())
}

async fn register(
    State(state): State<AppState>,
    body: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<Json<TokenResponse>, ApiError> {
    let request = json_body(body)?;
    let password = SensitiveBytes::from(request.password);
    let token = state.handler.register(&request.username, &password).await?;
    Ok(Json(TokenResponse { token }))
}

async fn login(
    State(state): State<AppState>,
    body: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<Json<TokenResponse>, ApiError> {
    let request = json_body(body)?;
    let password = SensitiveBytes::from(request.password);
    let token = state.handler.login(&request.username, &password).await?;
    Ok(Json(TokenResponse { token }))
}

async fn store_record(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<NewRecord>, JsonRejection>,
) -> Result<Json<StoreResponse>, ApiError> {
    let record = json_body(body)?;
    let id = state.handler.store(bearer_token(&headers), record).await?;
    Ok(Json(StoreResponse { id }))
}

async fn list_records(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ListResponse>, ApiError> {
    let records = state.handler.list(bearer_token(&headers)).await?;
    Ok(Json(ListResponse { records }))
}

async fn retrieve_record(
    State(state): State<AppState>,
    headers: HeaderMap,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<Record>, ApiError> {
    let id = record_id(path)?;
    let record = state.handler.retrieve(bearer_token(&headers), id).await?;
    Ok(Json(record))
}

async fn update_record(
    State(state): State<AppState>,
    headers: HeaderMap,
    path: Result<Path<i64>, PathRejection>,
    body: Result<Json<UpdateRequest>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let id = record_id(path)?;
    let request = json_body(body)?;
    state
        .handler
        .update(bearer_token(&headers), id, &request.meta, &request.data)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_record(
    State(state): State<AppState>,
    headers: HeaderMap,
    path: Result<Path<i64>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let id = record_id(path)?;
    state.handler.delete(bearer_token(&headers), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_bearer_token_forwarded_unmodified() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc.def.ghi"));
        assert_eq!(bearer_token(&headers), "abc.def.ghi");
    }

    #[test]
    fn test_missing_or_foreign_scheme_is_empty() {
        assert_eq!(bearer_token(&HeaderMap::new()), "");

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic YWxpY2U6cHc="));
        assert_eq!(bearer_token(&headers), "");
    }
}
