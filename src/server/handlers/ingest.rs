use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::{Multipart, State};

use crate::core::errors::ApiError;
use crate::rag::loader::upload_target;
use crate::state::AppState;

/// Accepts `file` / `file[]` parts and `url` fields in one multipart form.
/// Files are stored under the uploads directory before loading.
pub async fn ingest(
    State(state): State<Arc<AppState>>,
    multipart: Option<Multipart>,
) -> Result<String, ApiError> {
    let mut files: Vec<PathBuf> = Vec::new();
    let mut urls: Vec<String> = Vec::new();

    if let Some(mut multipart) = multipart {
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?
        {
            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                "file" | "file[]" => {
                    let Some(target) = field
                        .file_name()
                        .and_then(|raw| upload_target(&state.uploads_dir, raw))
                    else {
                        continue;
                    };
                    let bytes = field
                        .bytes()
                        .await
                        .map_err(|e| ApiError::BadRequest(e.body_text()))?;
                    tokio::fs::create_dir_all(&state.uploads_dir)
                        .await
                        .map_err(ApiError::internal)?;
                    tokio::fs::write(&target, &bytes)
                        .await
                        .map_err(ApiError::internal)?;
                    tracing::info!("Saved upload {} ({} bytes)", target.display(), bytes.len());
                    files.push(target);
                }
                "url" => {
                    let value = field
                        .text()
                        .await
                        .map_err(|e| ApiError::BadRequest(e.body_text()))?;
                    let value = value.trim();
                    if !value.is_empty() {
                        urls.push(value.to_string());
                    }
                }
                other => tracing::debug!("Ignoring form field '{}'", other),
            }
        }
    }

    if files.is_empty() && urls.is_empty() {
        return Err(ApiError::BadRequest("No data provided".to_string()));
    }

    tracing::info!("Ingesting {} files and {} URLs", files.len(), urls.len());
    let report = state
        .ingest
        .ingest_sources(&files, &urls)
        .await
        .map_err(|err| {
            tracing::error!("Ingestion failed: {}", err);
            ApiError::from(err)
        })?;

    Ok(format!(
        "Successfully ingested {} documents ({} chunks).",
        report.documents, report.chunks
    ))
}
