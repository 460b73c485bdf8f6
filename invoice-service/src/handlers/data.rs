use crate::dtos::{LoadFromFileRequest, LoadFromJsonRequest};
use crate::startup::AppState;
use axum::{extract::State, response::IntoResponse, Json};
use chrono::Utc;
use service_core::error::AppError;
use validator::Validate;

pub async fn load_from_file(
    State(state): State<AppState>,
    Json(req): Json<LoadFromFileRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()?;

    let result = state
        .ingestion
        .ingest_file(&req.file_path, Utc::now())
        .await?;

    Ok(Json(result))
}

pub async fn load_from_json(
    State(state): State<AppState>,
    Json(req): Json<LoadFromJsonRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()?;

    let result = state
        .ingestion
        .ingest_json(&req.json_content, Utc::now())
        .await?;

    Ok(Json(result))
}
