use std::convert::Infallible;

use axum::{
    body::Body,
    extract::{Multipart, State},
    http::{header, StatusCode},
    response::Response,
    Json,
};
use bytes::Bytes;
use futures::{Stream, StreamExt};
use tokio::sync::mpsc;

use crate::errors::AppError;
use crate::pipeline::{
    process_upload, process_upload_with_progress, ProgressEvent, UploadResponse, UploadedFile,
};
use crate::state::AppState;

/// POST /api/v1/resumes/upload
/// Buffered mode: runs the whole pipeline, answers with one JSON payload.
pub async fn handle_upload(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let upload = read_upload(multipart).await?;
    let response = process_upload(&state, upload, None).await?;
    Ok(Json(response))
}

/// POST /api/v1/resumes/upload/stream
/// Streamed mode: newline-delimited JSON progress events; the final record
/// carries the result payload.
pub async fn handle_upload_stream(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let upload = read_upload(multipart).await?;

    let (tx, rx) = mpsc::channel::<ProgressEvent>(16);
    tokio::spawn(process_upload_with_progress(state, upload, tx));

    let body = Body::from_stream(event_stream(rx).map(|event| {
        let mut line = serde_json::to_vec(&event).unwrap_or_default();
        line.push(b'\n');
        Ok::<Bytes, Infallible>(Bytes::from(line))
    }));

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/x-ndjson")
        .body(body)
        .map_err(|e| AppError::Internal(e.into()))
}

/// Pulls the single `file` field out of the multipart body. Rejects before
/// any processing when the field is absent, so no temp file is created.
async fn read_upload(mut multipart: Multipart) -> Result<UploadedFile, AppError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field
            .file_name()
            .map(str::to_string)
            .unwrap_or_else(|| "upload".to_string());
        let bytes = field.bytes().await?;
        return Ok(UploadedFile { file_name, bytes });
    }
    Err(AppError::MissingInput("No file uploaded".to_string()))
}

/// Drains the progress channel as a stream; ends when the pipeline task
/// drops its sender after the terminal event.
fn event_stream(rx: mpsc::Receiver<ProgressEvent>) -> impl Stream<Item = ProgressEvent> {
    futures::stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|event| (event, rx))
    })
}
