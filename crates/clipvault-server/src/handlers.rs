use std::path::{Path, PathBuf};

use axum::{
    extract::{multipart::Field, Multipart, Path as UrlPath, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use clipvault::{Admission, JobStatus, MediaRecord, StagedUpload};
use serde::Serialize;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoResponse {
    pub id: String,
    pub title: String,
    pub format: String,
    pub url: String,
    pub created_at: DateTime<Utc>,
}

impl VideoResponse {
    fn from_record(state: &AppState, record: MediaRecord) -> Self {
        let url = state.ingest.public_uri(&record);
        Self {
            id: record.id,
            title: record.title,
            format: record.format,
            url,
            created_at: record.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub id: String,
    pub status: JobStatus,
}

/// Removes the staged file unless the upload was handed over.
struct StagedFile {
    path: PathBuf,
    armed: bool,
}

impl StagedFile {
    fn new(path: PathBuf) -> Self {
        Self { path, armed: true }
    }

    fn disarm(mut self) -> PathBuf {
        self.armed = false;
        std::mem::take(&mut self.path)
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        if self.armed {
            if let Err(e) = std::fs::remove_file(&self.path) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    log::warn!("Failed to remove staged upload {}: {}", self.path.display(), e);
                }
            }
        }
    }
}

/// POST /api/publish: multipart `title` and `file`.
pub async fn publish(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let mut title: Option<String> = None;
    let mut staged: Option<(StagedFile, u64)> = None;

    while let Some(field) = multipart.next_field().await? {
        match field.name() {
            Some("title") => title = Some(field.text().await?),
            Some("file") => {
                if staged.is_some() {
                    return Err(ApiError::bad_request("Only one file per upload"));
                }
                staged = Some(stream_to_staging(&state, field).await?);
            }
            _ => {}
        }
    }

    let title = title.ok_or_else(|| ApiError::bad_request("Missing 'title' field"))?;
    let (staged_file, size) = staged.ok_or_else(|| ApiError::bad_request("Missing 'file' field"))?;

    let upload = StagedUpload {
        title,
        staged_path: staged_file.disarm(),
        size,
    };

    let ingest = state.ingest.clone();
    let admission: Admission = tokio::task::spawn_blocking(move || ingest.admit(upload)).await??;

    Ok((StatusCode::ACCEPTED, Json(admission)))
}

async fn stream_to_staging(
    state: &AppState,
    mut field: Field<'_>,
) -> Result<(StagedFile, u64), ApiError> {
    let staging_dir = state.ingest.staging_dir();
    tokio::fs::create_dir_all(&staging_dir).await?;

    let staged = StagedFile::new(staging_path(&staging_dir));
    let mut file = tokio::fs::File::create(&staged.path).await?;
    let mut size: u64 = 0;

    while let Some(chunk) = field.chunk().await? {
        size += chunk.len() as u64;
        if size > state.max_file_size {
            return Err(clipvault::AdmissionError::TooLarge {
                size,
                max: state.max_file_size,
            }
            .into());
        }
        file.write_all(&chunk).await?;
    }
    file.flush().await?;

    Ok((staged, size))
}

fn staging_path(staging_dir: &Path) -> PathBuf {
    staging_dir.join(format!("{}.part", Uuid::new_v4()))
}

/// DELETE /api/delete/{id}
pub async fn delete(
    State(state): State<AppState>,
    UrlPath(id): UrlPath<String>,
) -> Result<StatusCode, ApiError> {
    let ingest = state.ingest.clone();
    tokio::task::spawn_blocking(move || ingest.remove(&id)).await??;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/videos
pub async fn list_videos(
    State(state): State<AppState>,
) -> Result<Json<Vec<VideoResponse>>, ApiError> {
    let ingest = state.ingest.clone();
    let records = tokio::task::spawn_blocking(move || ingest.list()).await??;
    let videos = records
        .into_iter()
        .map(|record| VideoResponse::from_record(&state, record))
        .collect();
    Ok(Json(videos))
}

/// GET /api/status/{id}
pub async fn status(
    State(state): State<AppState>,
    UrlPath(id): UrlPath<String>,
) -> Result<Json<StatusResponse>, ApiError> {
    match state.ingest.status(&id) {
        Some(status) => Ok(Json(StatusResponse { id, status })),
        None => Err(ApiError::not_found(format!("Unknown job {}", id))),
    }
}
