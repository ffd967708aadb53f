//! Report analysis endpoints.
//!
//! `POST /api/blood-report/upload`: multipart file upload.
//! `POST /api/blood-report/analyze-text`: raw report text as JSON.
//!
//! Both run the same pipeline under the caller's upload slot: one analysis
//! per client at a time, a second concurrent request gets 409.

use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::Deserialize;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, ClientIdentity};
use crate::pipeline::analyzer::{AnalysisError, AnalysisReport, ReportAnalyzer, ReportUpload};
use crate::pipeline::extraction::{sanitize_extracted_text, sanitize_filename};
use crate::upload_guard::UploadSlot;

const FILE_FIELD: &str = "file";
const NO_FILE_MESSAGE: &str = "Please select a file to upload";
const PASTED_TEXT_NAME: &str = "pasted-text";

#[derive(Deserialize)]
pub struct AnalyzeTextRequest {
    #[serde(default)]
    pub text: String,
}

/// `POST /api/blood-report/upload`: analyze an uploaded report file.
pub async fn upload(
    State(ctx): State<ApiContext>,
    Extension(client): Extension<ClientIdentity>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<AnalysisReport>, ApiError> {
    let mut multipart = multipart.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let slot = acquire_slot(&ctx, &client)?;
    let upload = read_report_file(&mut multipart).await?;

    tracing::info!(
        request_id = slot.request_id(),
        file_size = upload.bytes.len(),
        "Report upload accepted"
    );

    run_analysis(&ctx, slot, move |analyzer| analyzer.analyze_upload(&upload)).await
}

/// `POST /api/blood-report/analyze-text`: analyze pasted report text.
pub async fn analyze_text(
    State(ctx): State<ApiContext>,
    Extension(client): Extension<ClientIdentity>,
    payload: Result<Json<AnalyzeTextRequest>, JsonRejection>,
) -> Result<Json<AnalysisReport>, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let slot = acquire_slot(&ctx, &client)?;
    let text = sanitize_extracted_text(&request.text);
    let file_size = request.text.len() as u64;

    tracing::info!(
        request_id = slot.request_id(),
        text_length = text.len(),
        "Text analysis accepted"
    );

    run_analysis(&ctx, slot, move |analyzer| {
        analyzer.analyze_text(PASTED_TEXT_NAME, file_size, &text)
    })
    .await
}

fn acquire_slot(ctx: &ApiContext, client: &ClientIdentity) -> Result<UploadSlot, ApiError> {
    let request_id = Uuid::new_v4().to_string();
    ctx.upload_guard
        .try_acquire(client.as_str(), &request_id)
        .ok_or(ApiError::UploadInProgress)
}

/// Run `job` on a blocking worker. The slot moves into the worker so it is
/// released when the analysis actually ends, not when the client goes away.
async fn run_analysis<F>(
    ctx: &ApiContext,
    slot: UploadSlot,
    job: F,
) -> Result<Json<AnalysisReport>, ApiError>
where
    F: FnOnce(&ReportAnalyzer) -> Result<AnalysisReport, AnalysisError> + Send + 'static,
{
    let request_id = slot.request_id().to_string();
    let analyzer = ctx.analyzer.clone();

    let outcome = tokio::task::spawn_blocking(move || {
        let _slot = slot;
        job(&analyzer)
    })
    .await;

    match outcome {
        Ok(result) => {
            if let Err(e) = &result {
                tracing::warn!(request_id = %request_id, error = %e, "Report analysis failed");
            }
            Ok(Json(result?))
        }
        // The slot was released by its drop while the worker unwound.
        Err(join_error) => {
            tracing::error!(request_id = %request_id, "Analysis worker panicked");
            Err(ApiError::Internal(format!("Analysis worker failed: {join_error}")))
        }
    }
}

async fn read_report_file(multipart: &mut Multipart) -> Result<ReportUpload, ApiError> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let file_name = sanitize_filename(field.file_name().unwrap_or("report"));
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await.map_err(multipart_error)?;

        if bytes.is_empty() {
            return Err(ApiError::BadRequest(NO_FILE_MESSAGE.into()));
        }

        return Ok(ReportUpload {
            file_name,
            content_type,
            bytes: bytes.to_vec(),
        });
    }

    Err(ApiError::BadRequest(NO_FILE_MESSAGE.into()))
}

fn multipart_error(e: MultipartError) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge
    } else {
        tracing::warn!(error = %e, "Failed to read multipart body");
        ApiError::BadRequest(e.body_text())
    }
}
