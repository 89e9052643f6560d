//! Converters used by the batch orchestrator.
//!
//! - [`HttpConverter`] posts each file to the conversion endpoint as a
//!   multipart form and reads the encoded bytes plus `X-Output-Extension`
//!   back.
//! - [`LocalConverter`] runs the same conversion in-process on the blocking
//!   pool, for offline use.

use crate::batch::Converter;
use crate::format::{FormatKey, InputType, OutputExtension};
use crate::imaging::{BackendError, ConvertedImage, ImageBackend, convert_bytes};
use crate::server::{CONVERT_SINGLE_PATH, ErrorBody, OUTPUT_EXTENSION_HEADER};
use crate::upload::UploadedFile;
use reqwest::multipart::{Form, Part};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Server rejected conversion ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    #[error("Conversion failed: {0}")]
    Local(#[from] BackendError),
    #[error("Conversion task failed: {0}")]
    Task(String),
}

/// Converter backed by the HTTP conversion endpoint.
#[derive(Debug, Clone)]
pub struct HttpConverter {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpConverter {
    pub fn new(base_url: &str, connect_timeout: Duration) -> Result<Self, ConvertError> {
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .build()?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            endpoint: format!("{}{}", base_url.trim_end_matches('/'), CONVERT_SINGLE_PATH),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

/// Pull the reason out of an error response body.
///
/// The endpoint answers `{"error": "..."}`; anything else is passed through.
fn rejection_message(body: &str) -> String {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) => parsed.error,
        Err(_) if body.trim().is_empty() => "no response body".to_string(),
        Err(_) => body.trim().to_string(),
    }
}

impl Converter for HttpConverter {
    async fn convert(
        &self,
        file: &UploadedFile,
        input: InputType,
        key: FormatKey,
    ) -> Result<ConvertedImage, ConvertError> {
        let part = Part::bytes(file.bytes.clone())
            .file_name(file.name.clone())
            .mime_str(&file.mime_type)?;
        let form = Form::new()
            .part("file", part)
            .text("format", key.as_str())
            .text("inputType", input.as_str());

        tracing::debug!(file = %file.name, endpoint = %self.endpoint, "uploading");
        let response = self.client.post(&self.endpoint).multipart(form).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ConvertError::Rejected {
                status: status.as_u16(),
                message: rejection_message(&body),
            });
        }

        let extension = response
            .headers()
            .get(OUTPUT_EXTENSION_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                ConvertError::InvalidResponse(format!("missing {OUTPUT_EXTENSION_HEADER} header"))
            })?
            .parse::<OutputExtension>()
            .map_err(|e| ConvertError::InvalidResponse(e.to_string()))?;

        let bytes = response.bytes().await?.to_vec();
        if bytes.is_empty() {
            return Err(ConvertError::InvalidResponse("empty response body".into()));
        }

        Ok(ConvertedImage { bytes, extension })
    }
}

/// Converter that runs the codec in-process.
pub struct LocalConverter<B> {
    backend: Arc<B>,
}

impl<B: ImageBackend + 'static> LocalConverter<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend: Arc::new(backend),
        }
    }
}

impl<B: ImageBackend + 'static> Converter for LocalConverter<B> {
    async fn convert(
        &self,
        file: &UploadedFile,
        input: InputType,
        key: FormatKey,
    ) -> Result<ConvertedImage, ConvertError> {
        let backend = Arc::clone(&self.backend);
        let bytes = file.bytes.clone();
        let converted =
            tokio::task::spawn_blocking(move || convert_bytes(&*backend, &bytes, input, key))
                .await
                .map_err(|e| ConvertError::Task(e.to_string()))??;
        Ok(converted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::{Batch, JobStatus};
    use crate::imaging::RustBackend;
    use crate::test_helpers::{png_bytes, transparent_corner_rgba};

    #[test]
    fn endpoint_joins_base_url() {
        let converter = HttpConverter::with_client(reqwest::Client::new(), "http://host:3000/");
        assert_eq!(converter.endpoint(), "http://host:3000/api/convert-single");
    }

    #[test]
    fn rejection_message_reads_json_error() {
        assert_eq!(
            rejection_message(r#"{"error":"Unsupported input format"}"#),
            "Unsupported input format"
        );
        assert_eq!(rejection_message("Bad Gateway"), "Bad Gateway");
        assert_eq!(rejection_message(""), "no response body");
    }

    #[tokio::test]
    async fn local_batch_isolates_corrupt_file() {
        let good = png_bytes(&transparent_corner_rgba(16, 16));
        let mut batch = Batch::new();
        batch.load(vec![
            UploadedFile::new(Some("one.png"), None, good.clone(), InputType::Png),
            UploadedFile::new(Some("two.png"), None, b"corrupt bytes".to_vec(), InputType::Png),
            UploadedFile::new(Some("three.png"), None, good, InputType::Png),
        ]);

        let converter = LocalConverter::new(RustBackend::new());
        batch
            .run(
                &converter,
                InputType::Png,
                FormatKey::JpgHigh,
                Duration::from_millis(5),
                None,
            )
            .await;

        assert_eq!(
            batch.statuses(),
            vec![JobStatus::Done, JobStatus::Error, JobStatus::Done]
        );
        for job in batch.completed() {
            let bytes = job.result_bytes.as_ref().unwrap();
            assert_eq!(image::guess_format(bytes).unwrap(), image::ImageFormat::Jpeg);
            assert_eq!(job.result_size, Some(bytes.len() as u64));
        }
    }
}
