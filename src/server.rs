//! HTTP conversion service.
//!
//! | Route | Body | Response |
//! |---|---|---|
//! | `POST /api/convert-single` | multipart `file`, `format`, `inputType` | encoded bytes + `X-Output-Extension` |
//! | `POST /api/convert` | multipart, repeated `files` | `converted.zip` (JPEG, quality 90) |
//!
//! Every request is independent: the only state is the shared, immutable
//! codec backend. Codec work runs on the blocking pool so a slow decode
//! never stalls the async workers, and a failing request never takes the
//! process down.
//!
//! ## Errors
//!
//! | Status | Body |
//! |---|---|
//! | 400 | `{"error": "No file received"}` |
//! | 400 | `{"error": "Unsupported input format"}` |
//! | 400 | `{"error": "Unsupported output format"}` |
//! | 400 | `{"error": "Upload error"}` (malformed multipart) |
//! | 500 | `{"error": "Upload error"}` (malformed multipart on the bulk route) |
//! | 405 | `{"error": "Method not allowed"}` |
//! | 500 | `{"error": "Conversion failed"}` |
//!
//! Codec failures are logged with their cause but answered with the generic
//! 500 body.

use crate::archive::{ArchiveEntry, ArchiveError, write_zip};
use crate::config::{ConfigError, ServerConfig};
use crate::format::{FormatKey, FormatSpec, InputType};
use crate::imaging::{BackendError, ConvertedImage, ImageBackend, convert_bytes, convert_with_spec};
use crate::naming::{EntryNames, fallback_name, replace_extension, split_input_extension};
use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::{HeaderName, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;

pub const CONVERT_SINGLE_PATH: &str = "/api/convert-single";
pub const CONVERT_BULK_PATH: &str = "/api/convert";
/// Header carrying the output container's extension (`X-Output-Extension`).
pub const OUTPUT_EXTENSION_HEADER: &str = "x-output-extension";
/// File name of the legacy bulk download.
pub const BULK_ARCHIVE_NAME: &str = "converted.zip";

/// JSON error body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("No file received")]
    NoFile,
    #[error("Unsupported input format")]
    UnsupportedInput,
    #[error("Unsupported output format")]
    UnsupportedOutput,
    #[error("Upload error")]
    Upload(#[from] MultipartError),
    #[error("Upload error")]
    UploadRejected(#[from] MultipartRejection),
    /// Malformed upload on the legacy bulk route, which answers 500.
    #[error("Upload error")]
    BulkUpload(String),
    #[error("Method not allowed")]
    MethodNotAllowed,
    #[error("Conversion failed")]
    Conversion(#[from] BackendError),
    #[error("Conversion failed")]
    Archive(#[from] ArchiveError),
    #[error("Conversion failed")]
    Task(#[from] tokio::task::JoinError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NoFile | ApiError::UnsupportedInput | ApiError::UnsupportedOutput => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Upload(e) => e.status(),
            ApiError::UploadRejected(e) => e.status(),
            ApiError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::Conversion(_)
            | ApiError::Archive(_)
            | ApiError::Task(_)
            | ApiError::BulkUpload(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Re-map multipart failures for the legacy bulk route.
    fn bulk(error: impl Into<ApiError>) -> ApiError {
        match error.into() {
            ApiError::Upload(e) => ApiError::BulkUpload(e.to_string()),
            ApiError::UploadRejected(e) => ApiError::BulkUpload(e.to_string()),
            other => other,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            ApiError::Conversion(e) => tracing::error!(error = %e, "conversion error"),
            ApiError::Archive(e) => tracing::error!(error = %e, "archive error"),
            ApiError::Task(e) => tracing::error!(error = %e, "conversion task failed"),
            ApiError::Upload(e) => tracing::warn!(error = %e, "malformed upload"),
            ApiError::UploadRejected(e) => tracing::warn!(error = %e, "malformed upload"),
            ApiError::BulkUpload(e) => tracing::error!(error = %e, "malformed bulk upload"),
            _ => tracing::debug!(%status, error = %self, "rejected request"),
        }
        let body = ErrorBody {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

#[derive(Clone)]
struct AppState {
    backend: Arc<dyn ImageBackend>,
}

/// Build the service router.
pub fn router(backend: Arc<dyn ImageBackend>, max_upload_bytes: usize) -> Router {
    Router::new()
        .route(
            CONVERT_SINGLE_PATH,
            post(convert_single).fallback(method_not_allowed),
        )
        .route(
            CONVERT_BULK_PATH,
            post(convert_bulk).fallback(method_not_allowed),
        )
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .with_state(AppState { backend })
}

#[derive(Error, Debug)]
pub enum ServeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Bind and serve until Ctrl-C.
pub async fn serve(config: &ServerConfig, backend: Arc<dyn ImageBackend>) -> Result<(), ServeError> {
    let addr = config.bind_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(addr = %listener.local_addr()?, "conversion service listening");

    axum::serve(listener, router(backend, config.max_upload_bytes))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutting down");
        })
        .await?;
    Ok(())
}

async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}

/// An uploaded file part.
struct FilePart {
    name: String,
    bytes: Vec<u8>,
}

/// Text and file fields of a single-conversion form.
#[derive(Default)]
struct SingleForm {
    file: Option<FilePart>,
    format: Option<String>,
    input_type: Option<String>,
}

async fn read_single_form(multipart: &mut Multipart) -> Result<SingleForm, ApiError> {
    let mut form = SingleForm::default();
    while let Some(field) = multipart.next_field().await? {
        let Some(name) = field.name().map(str::to_owned) else {
            continue;
        };
        match name.as_str() {
            "file" => {
                let file_name = field.file_name().map(str::to_owned);
                let bytes = field.bytes().await?;
                form.file = Some(FilePart {
                    name: file_name.unwrap_or_default(),
                    bytes: bytes.to_vec(),
                });
            }
            "format" => form.format = Some(field.text().await?),
            "inputType" => form.input_type = Some(field.text().await?),
            _ => {}
        }
    }
    Ok(form)
}

/// Parse the declared input type; absent means HEIC.
fn parse_input_type(value: Option<&str>) -> Result<InputType, ApiError> {
    match value {
        None => Ok(InputType::default()),
        Some(v) => v.trim().parse().map_err(|_| ApiError::UnsupportedInput),
    }
}

/// Parse the output key; absent means `jpg-high`.
fn parse_format_key(value: Option<&str>) -> Result<FormatKey, ApiError> {
    match value {
        None => Ok(FormatKey::JpgHigh),
        Some(v) => v.trim().parse().map_err(|_| ApiError::UnsupportedOutput),
    }
}

async fn convert_single(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, ApiError> {
    let mut multipart = multipart?;
    let form = read_single_form(&mut multipart).await?;

    let file = form
        .file
        .filter(|f| !f.bytes.is_empty())
        .ok_or(ApiError::NoFile)?;
    let input = parse_input_type(form.input_type.as_deref())?;
    let key = parse_format_key(form.format.as_deref())?;

    let started = Instant::now();
    let file_name = file.name.clone();
    let size = file.bytes.len();
    let backend = Arc::clone(&state.backend);
    let converted: ConvertedImage =
        tokio::task::spawn_blocking(move || convert_bytes(&*backend, &file.bytes, input, key))
            .await??;

    tracing::info!(
        file = %file_name,
        input = %input,
        format = %key,
        in_bytes = size,
        out_bytes = converted.bytes.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "converted"
    );

    let extension = converted.extension;
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, extension.mime_type()),
            (HeaderName::from_static(OUTPUT_EXTENSION_HEADER), extension.as_str()),
        ],
        converted.bytes,
    )
        .into_response())
}

async fn convert_bulk(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, ApiError> {
    let mut multipart = multipart.map_err(ApiError::bulk)?;
    let files = read_bulk_files(&mut multipart)
        .await
        .map_err(ApiError::bulk)?;
    if files.is_empty() {
        return Err(ApiError::NoFile);
    }

    let count = files.len();
    let backend = Arc::clone(&state.backend);
    let archive =
        tokio::task::spawn_blocking(move || bulk_archive(&*backend, files)).await??;
    tracing::info!(files = count, bytes = archive.len(), "bulk conversion finished");

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/zip".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename={BULK_ARCHIVE_NAME}"),
            ),
        ],
        archive,
    )
        .into_response())
}

async fn read_bulk_files(multipart: &mut Multipart) -> Result<Vec<FilePart>, MultipartError> {
    let mut files = Vec::new();
    while let Some(field) = multipart.next_field().await? {
        if !matches!(field.name(), Some("files") | Some("file")) {
            continue;
        }
        let name = field.file_name().map(str::to_owned).unwrap_or_default();
        let bytes = field.bytes().await?;
        if !bytes.is_empty() {
            files.push(FilePart {
                name,
                bytes: bytes.to_vec(),
            });
        }
    }
    Ok(files)
}

/// Input type for a legacy upload, judged by its extension.
///
/// Anything that is not HEIC goes through the sniffing general decoder.
fn legacy_input_type(name: &str) -> InputType {
    split_input_extension(name)
        .and_then(|(_, ext)| InputType::from_extension(ext))
        .unwrap_or(InputType::Jpg)
}

/// Convert every file to JPEG and bundle the results.
///
/// Conversion is all-or-nothing: the first failure fails the request.
fn bulk_archive(backend: &dyn ImageBackend, files: Vec<FilePart>) -> Result<Vec<u8>, ApiError> {
    let spec = FormatSpec::legacy_jpeg();
    let converted: Vec<(String, ConvertedImage)> = files
        .into_par_iter()
        .map(|file| {
            let input = legacy_input_type(&file.name);
            let name = if file.name.trim().is_empty() {
                fallback_name(input)
            } else {
                file.name
            };
            convert_with_spec(backend, &file.bytes, input, &spec).map(|out| (name, out))
        })
        .collect::<Result<_, _>>()?;

    let mut names = EntryNames::new();
    let entries: Vec<ArchiveEntry> = converted
        .into_iter()
        .map(|(name, out)| ArchiveEntry {
            name: names.claim(&replace_extension(&name, out.extension.as_str())),
            bytes: out.bytes,
        })
        .collect();
    Ok(write_zip(&entries)?)
}
