use axum::extract::{Multipart, Path, State};
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::Json;
use bytes::Bytes;
use futures::stream::{Stream, StreamExt};
use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::json;
use std::collections::HashSet;
use std::convert::Infallible;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_stream::wrappers::BroadcastStream;
use uuid::Uuid;

use crate::app_controller::JobFile;
use crate::errors::AppError;
use crate::file_utils::FileManager;
use crate::language_utils;

use super::AppState;

/// Response header carrying the job id
pub const JOB_ID_HEADER: &str = "x-job-id";

static JOB_ID_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9_-]{1,64}$").unwrap()
});

/// Fields of an upload request
struct UploadForm {
    files: Vec<JobFile>,
    language: Option<String>,
    job_id: Option<String>,
}

pub fn is_valid_job_id(job_id: &str) -> bool {
    JOB_ID_PATTERN.is_match(job_id)
}

/// `POST /upload`
pub async fn upload(State(state): State<AppState>, multipart: Multipart) -> Result<Response, AppError> {
    let config = state.controller.config();
    FileManager::ensure_dir(&config.server.upload_dir)?;

    let scratch = tempfile::Builder::new()
        .prefix("job-")
        .tempdir_in(&config.server.upload_dir)?;

    let form = read_upload_form(multipart, scratch.path().to_path_buf()).await?;
    if form.files.is_empty() {
        return Err(AppError::NoFiles);
    }

    let job_id = match form.job_id {
        Some(job_id) if is_valid_job_id(&job_id) => job_id,
        Some(job_id) => return Err(AppError::InvalidRequest(format!("Invalid job id: {}", job_id))),
        None => Uuid::new_v4().to_string(),
    };

    let language = form
        .language
        .filter(|language| !language.is_empty())
        .unwrap_or_else(|| config.default_target_language.clone());
    if !language_utils::is_known_code(&language) {
        warn!("Unknown language code '{}', passing it to the model as is", language);
    }

    let output_dir = scratch.path().join("translated");
    FileManager::ensure_dir(&output_dir)?;

    // The job owns the scratch directory so a dropped connection cannot pull
    // files out from under it
    let file_count = form.files.len();
    let job = {
        let controller = Arc::clone(&state.controller);
        let progress = Arc::clone(&state.progress);
        let job_id = job_id.clone();
        let files = form.files;
        let output_dir = output_dir.clone();

        tokio::spawn(async move {
            let sink = progress.open(&job_id);
            let report = controller.run_job(&job_id, &files, &language, &output_dir, &sink).await;
            drop(sink);
            progress.close(&job_id);
            (report, scratch)
        })
    };

    let (report, scratch) = job
        .await
        .map_err(|e| AppError::Unknown(format!("Translation task failed: {}", e)))?;

    if report.is_empty() {
        return Err(AppError::NothingTranslated);
    }

    let mut headers = HeaderMap::new();
    headers.insert(HeaderName::from_static(JOB_ID_HEADER), header_value(&job_id)?);

    if file_count == 1 {
        let translated = &report.translated[0];
        let body = tokio::fs::read(&translated.path).await?;
        drop(scratch);

        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"));
        headers.insert(header::CONTENT_DISPOSITION, header_value(&content_disposition(&translated.output_name))?);
        return Ok((StatusCode::OK, headers, body).into_response());
    }

    let archive_name = format!("{}.zip", job_id);
    let destination = config.server.download_dir.join(&archive_name);
    let entries: Vec<(String, PathBuf)> = report
        .translated
        .iter()
        .map(|file| (file.output_name.clone(), file.path.clone()))
        .collect();

    tokio::task::spawn_blocking(move || FileManager::create_zip_archive(destination, &entries))
        .await
        .map_err(|e| AppError::Archive(e.to_string()))?
        .map_err(|e| AppError::Archive(format!("{:#}", e)))?;
    drop(scratch);

    debug!("Job {}: archive {} ready", job_id, archive_name);
    let body = Json(json!({ "downloadUrl": format!("/downloads/{}", archive_name) }));
    Ok((StatusCode::OK, headers, body).into_response())
}

/// Collect files and text fields; any field with a file name is a file
async fn read_upload_form(mut multipart: Multipart, scratch_dir: PathBuf) -> Result<UploadForm, AppError> {
    let mut form = UploadForm {
        files: Vec::new(),
        language: None,
        job_id: None,
    };
    let mut used_names = HashSet::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidRequest(e.to_string()))?
    {
        let field_name = field.name().unwrap_or_default().to_string();

        if let Some(file_name) = field.file_name().map(str::to_string) {
            let bytes: Bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::InvalidRequest(format!("Failed to read file data: {}", e)))?;

            let name = unique_name(FileManager::sanitize_file_name(&file_name), form.files.len() + 1, &mut used_names);

            let path = scratch_dir.join(format!("upload_{}", form.files.len()));
            tokio::fs::write(&path, &bytes).await?;
            form.files.push(JobFile::new(name, path));
            continue;
        }

        let value = field
            .text()
            .await
            .map_err(|e| AppError::InvalidRequest(e.to_string()))?;
        match field_name.as_str() {
            "language" => form.language = Some(value.trim().to_string()),
            "jobId" => form.job_id = Some(value.trim().to_string()),
            _ => debug!("Ignoring form field '{}'", field_name),
        }
    }

    Ok(form)
}

/// `GET /progress/:job_id`
pub async fn progress(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    if !is_valid_job_id(&job_id) {
        return Err(AppError::InvalidRequest(format!("Invalid job id: {}", job_id)));
    }

    debug!("New progress listener for job {}", job_id);
    let receiver = state.progress.subscribe(&job_id);

    let stream = BroadcastStream::new(receiver).filter_map(|result| async move {
        match result {
            Ok(event) => match event.to_json() {
                Ok(data) => Some(Ok(Event::default().event(event.event_name()).data(data))),
                Err(e) => {
                    warn!("Failed to serialize progress event: {}", e);
                    None
                }
            },
            Err(e) => {
                warn!("Progress stream error: {}", e);
                None
            }
        }
    });

    Ok(Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    ))
}

/// `GET /downloads/:name`; the archive is deleted once served
pub async fn download(State(state): State<AppState>, Path(name): Path<String>) -> Result<Response, AppError> {
    if !FileManager::is_safe_file_name(&name) {
        return Err(AppError::InvalidRequest(format!("Invalid file name: {}", name)));
    }

    let path = state.controller.config().server.download_dir.join(&name);
    if !FileManager::file_exists(&path) {
        return Err(AppError::NotFound(name));
    }

    let body = tokio::task::spawn_blocking(move || FileManager::take_file(path))
        .await
        .map_err(|e| AppError::File(e.to_string()))?
        .map_err(|e| AppError::NotFound(format!("{}: {:#}", name, e)))?;

    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/zip"));
    headers.insert(header::CONTENT_DISPOSITION, header_value(&content_disposition(&name))?);
    Ok((StatusCode::OK, headers, body).into_response())
}

/// Prefix a repeated name with a counter until it no longer clashes
fn unique_name(name: String, first_prefix: usize, used_names: &mut HashSet<String>) -> String {
    if used_names.insert(name.clone()) {
        return name;
    }
    let mut prefix = first_prefix;
    loop {
        let candidate = format!("{}_{}", prefix, name);
        if used_names.insert(candidate.clone()) {
            return candidate;
        }
        prefix += 1;
    }
}

/// `GET /health`
pub async fn health() -> &'static str {
    "ok"
}

/// Attachment header with an ASCII fallback and the UTF-8 name
pub fn content_disposition(file_name: &str) -> String {
    let ascii: String = file_name
        .chars()
        .map(|c| if (c.is_ascii_graphic() && c != '"' && c != '\\') || c == ' ' { c } else { '_' })
        .collect();
    let encoded: String = url::form_urlencoded::byte_serialize(file_name.as_bytes())
        .collect::<String>()
        .replace('+', "%20");
    format!("attachment; filename=\"{}\"; filename*=UTF-8''{}", ascii, encoded)
}

fn header_value(value: &str) -> Result<HeaderValue, AppError> {
    HeaderValue::from_str(value).map_err(|e| AppError::Unknown(format!("Invalid header value: {}", e)))
}
