//! Upload pipeline: persist, convert, extract, redact, render.
//!
//! One synchronous run per upload, no internal parallelism. CPU-bound
//! conversion and rendering run under `spawn_blocking`. Progress mode sends
//! ordered events over a channel with strictly increasing percentages and
//! exactly one terminal event. There is no cancellation: a started run
//! completes or fails.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use base64::{engine::general_purpose, Engine as _};
use bytes::Bytes;
use chrono::Utc;
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::errors::AppError;
use crate::extract::ParsedFields;
use crate::redact::redact_markup;
use crate::state::AppState;

pub const UNSUPPORTED_FORMAT_ERROR: &str = "Only DOCX files are supported for parsing";
const PARSE_FAILED_ERROR: &str = "Failed to parse file";
const RENDER_FAILED_ERROR: &str = "Failed to render redacted preview";

/// One uploaded document: declared name plus the raw payload.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub bytes: Bytes,
}

/// Result payload for both response modes.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub success: bool,
    pub message: String,
    pub file_name: String,
    pub file_path: String,
    pub parsed_data: ParsedData,
}

/// Extraction output plus the redacted preview, or a structured error.
/// Field extraction happens before redaction, so a render failure still
/// carries the extracted fields alongside `error`.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedData {
    #[serde(flatten)]
    pub fields: Option<ParsedFields>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redacted_image_base64: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ParsedData {
    fn failed(error: &str, details: String) -> Self {
        Self {
            error: Some(error.to_string()),
            details: Some(details),
            ..Self::default()
        }
    }

    fn unsupported() -> Self {
        Self {
            error: Some(UNSUPPORTED_FORMAT_ERROR.to_string()),
            ..Self::default()
        }
    }
}

/// One progress record in the streamed response mode. The terminal record
/// carries `result` and percent 100.
#[derive(Debug, Clone, Serialize)]
pub struct ProgressEvent {
    pub step: String,
    pub percent: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<UploadResponse>,
}

impl ProgressEvent {
    pub fn stage(step: &str, percent: u8) -> Self {
        Self {
            step: step.to_string(),
            percent,
            result: None,
        }
    }

    pub fn terminal(result: UploadResponse) -> Self {
        Self {
            step: "Complete".to_string(),
            percent: 100,
            result: Some(result),
        }
    }
}

type Progress = Option<mpsc::Sender<ProgressEvent>>;

async fn report(progress: &Progress, step: &str, percent: u8) {
    if let Some(tx) = progress {
        // A dropped receiver never aborts the run; there is no cancellation.
        let _ = tx.send(ProgressEvent::stage(step, percent)).await;
    }
}

/// Runs the full pipeline for one upload.
///
/// Returns `Err` only for transport-level failures (storage, task join).
/// Conversion and rendering failures come back as `Ok` with
/// `parsedData.error` set, matching the structured-error contract.
pub async fn process_upload(
    state: &AppState,
    upload: UploadedFile,
    progress: Progress,
) -> Result<UploadResponse, AppError> {
    report(&progress, "Saving upload", 10).await;

    tokio::fs::create_dir_all(&state.config.temp_dir).await?;
    let unique_name = format!("{}-{}", Utc::now().timestamp_millis(), base_name(&upload.file_name));
    let file_path = state.config.temp_dir.join(&unique_name);
    tokio::fs::write(&file_path, &upload.bytes).await?;
    info!(file = %unique_name, size = upload.bytes.len(), "upload persisted");

    let respond = {
        let file_path = file_path.display().to_string();
        move |parsed_data: ParsedData| UploadResponse {
            success: true,
            message: "File uploaded and parsed successfully".to_string(),
            file_name: unique_name.clone(),
            file_path: file_path.clone(),
            parsed_data,
        }
    };

    if !upload.file_name.to_lowercase().ends_with(".docx") {
        return Ok(respond(ParsedData::unsupported()));
    }

    report(&progress, "Converting document", 30).await;
    let text = {
        let converter = Arc::clone(&state.converter);
        let path = file_path.clone();
        let converted = tokio::task::spawn_blocking(move || converter.extract_text(&path))
            .await
            .context("conversion task panicked")?;
        match converted {
            Ok(text) => text,
            Err(e) => {
                warn!("conversion failed: {e}");
                return Ok(respond(ParsedData::failed(PARSE_FAILED_ERROR, e.to_string())));
            }
        }
    };

    report(&progress, "Extracting fields", 55).await;
    let fields = state.extractor.parse(&text);

    report(&progress, "Redacting document", 75).await;
    let redacted = {
        let converter = Arc::clone(&state.converter);
        let path = file_path.clone();
        let pass_fields = fields.clone();
        let redacted = tokio::task::spawn_blocking(move || {
            converter
                .to_markup(&path)
                .map(|markup| redact_markup(&markup, &pass_fields))
        })
        .await
        .context("redaction task panicked")?;
        match redacted {
            Ok(markup) => markup,
            Err(e) => {
                warn!("markup conversion failed: {e}");
                return Ok(respond(ParsedData {
                    fields: Some(fields),
                    ..ParsedData::failed(PARSE_FAILED_ERROR, e.to_string())
                }));
            }
        }
    };

    report(&progress, "Rendering preview", 90).await;
    let image_base64 = {
        let renderer = Arc::clone(&state.renderer);
        let rendered = tokio::task::spawn_blocking(move || {
            renderer
                .render_png(&redacted)
                .map(|png| general_purpose::STANDARD.encode(png))
        })
        .await
        .context("render task panicked")?;
        match rendered {
            Ok(encoded) => encoded,
            Err(e) => {
                warn!("rendering failed: {e}");
                return Ok(respond(ParsedData {
                    fields: Some(fields),
                    ..ParsedData::failed(RENDER_FAILED_ERROR, e.to_string())
                }));
            }
        }
    };

    Ok(respond(ParsedData {
        fields: Some(fields),
        redacted_image_base64: Some(image_base64),
        error: None,
        details: None,
    }))
}

/// Runs the pipeline and relays progress, always ending the stream with
/// exactly one terminal event.
pub async fn process_upload_with_progress(
    state: AppState,
    upload: UploadedFile,
    tx: mpsc::Sender<ProgressEvent>,
) {
    let progress = Some(tx.clone());
    let terminal = match process_upload(&state, upload, progress).await {
        Ok(response) => ProgressEvent::terminal(response),
        Err(e) => ProgressEvent::terminal(UploadResponse {
            success: false,
            message: e.to_string(),
            file_name: String::new(),
            file_path: String::new(),
            parsed_data: ParsedData::failed("Upload failed", e.to_string()),
        }),
    };
    let _ = tx.send(terminal).await;
}

/// Final path component of the declared name; uploads must not be able to
/// escape the temp directory.
fn base_name(file_name: &str) -> String {
    Path::new(file_name)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parsed_data_flattens_fields_into_payload() {
        let data = ParsedData {
            fields: Some(ParsedFields {
                name: "John Smith".to_string(),
                ..ParsedFields::default()
            }),
            redacted_image_base64: Some("aGk=".to_string()),
            error: None,
            details: None,
        };
        let json = serde_json::to_value(&data).expect("serializes");
        assert_eq!(json["name"], "John Smith");
        assert_eq!(json["redactedImageBase64"], "aGk=");
        assert!(json.get("error").is_none());
        assert!(json.get("fields").is_none());
    }

    #[test]
    fn test_error_payload_has_no_field_keys() {
        let json = serde_json::to_value(ParsedData::unsupported()).expect("serializes");
        assert_eq!(json["error"], UNSUPPORTED_FORMAT_ERROR);
        assert!(json.get("name").is_none());
        assert!(json.get("details").is_none());
    }

    #[test]
    fn test_terminal_event_is_percent_100_with_result() {
        let event = ProgressEvent::terminal(UploadResponse {
            success: true,
            message: "ok".to_string(),
            file_name: "f".to_string(),
            file_path: "p".to_string(),
            parsed_data: ParsedData::default(),
        });
        assert_eq!(event.percent, 100);
        assert!(event.result.is_some());
        let json = serde_json::to_value(&event).expect("serializes");
        assert_eq!(json["result"]["fileName"], "f");
    }

    #[test]
    fn test_base_name_strips_directories() {
        assert_eq!(base_name("../../etc/passwd"), "passwd");
        assert_eq!(base_name("resume.docx"), "resume.docx");
        assert_eq!(base_name(""), "upload");
    }
}
