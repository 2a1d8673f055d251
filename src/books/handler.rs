use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::{Map, Value};

use crate::api::{created, success};
use crate::error::HandlerError;
use crate::handler::AppState;

fn into_fields(payload: Result<Json<Value>, JsonRejection>) -> Result<Map<String, Value>, HandlerError> {
    let Json(value) = payload.map_err(|e| HandlerError::InvalidBody(e.body_text()))?;
    match value {
        Value::Object(fields) => Ok(fields),
        other => Err(HandlerError::InvalidBody(format!(
            "expected a JSON object, got {}",
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

pub async fn list_books(State(state): State<AppState>) -> Response {
    let books = state.db.list_all().await;
    tracing::debug!("got {} books", books.len());
    success(books)
}

pub async fn get_book(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, HandlerError> {
    match state.db.find_by_id(&id).await {
        Some(book) => Ok(success(book)),
        None => Err(HandlerError::NotFound(id)),
    }
}

pub async fn create_book(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Response, HandlerError> {
    let fields = into_fields(payload)?;
    let book = state.db.create(fields).await?;
    tracing::info!(id = %book.id, "created book");
    Ok(created(book))
}

pub async fn update_book(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Response, HandlerError> {
    let fields = into_fields(payload)?;
    match state.db.merge_into(&id, fields).await? {
        Some(book) => {
            tracing::info!(id = %book.id, "updated book");
            Ok(success(book))
        }
        None => Err(HandlerError::NotFound(id)),
    }
}

pub async fn delete_book(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, HandlerError> {
    match state.db.remove_by_id(&id).await? {
        Some(_) => {
            tracing::info!(id = %id, "deleted book");
            Ok(StatusCode::OK.into_response())
        }
        None => Err(HandlerError::NotFound(id)),
    }
}
