/*
 * Responsibility
 * - POST /archive: 入力チェック → source/destination workspace の bucket 解決
 * - GET /archive/{job_id}: ジョブ状態の参照 (未実装, 501)
 * - 認証済み (AuthCtx) 前提。credential は workspace service へそのまま転送する
 *
 * Notes
 * - ジョブの作成・永続化・storage transfer はここでは行わない
 */
use axum::{
    Json,
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, header},
};

use crate::{
    api::v1::{
        dto::archive::{ArchiveCreateResponse, validate_inputs},
        extractors::AuthCtxExtractor,
    },
    error::AppError,
    state::AppState,
};

pub async fn create_archive(
    State(state): State<AppState>,
    AuthCtxExtractor(auth): AuthCtxExtractor,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<ArchiveCreateResponse>, AppError> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok());
    let req = validate_inputs(content_type, &body)?;

    let source_bucket = state
        .workspaces
        .bucket(&req.source, &auth.credential)
        .await?;
    let destination_bucket = state
        .workspaces
        .bucket(&req.destination, &auth.credential)
        .await?;

    tracing::info!(
        identity = %auth.identity,
        source = %req.source,
        destination = %req.destination,
        "archive request validated"
    );

    Ok(Json(ArchiveCreateResponse {
        source_bucket,
        destination_bucket,
    }))
}

pub async fn read_archive(
    AuthCtxExtractor(auth): AuthCtxExtractor,
    Path(job_id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    tracing::debug!(identity = %auth.identity, job_id = %job_id, "archive status requested");
    Err(AppError::not_implemented(
        "Archive status lookup not implemented yet.",
    ))
}
