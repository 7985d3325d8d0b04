use std::path::Path;

use async_trait::async_trait;

use crate::domain::user::ports::MediaStore;
use crate::domain::user::ports::UploadedMedia;
use crate::user::errors::MediaStoreError;

/// Media host client.
///
/// Posts staged local files to the configured upload endpoint as multipart
/// form data and reads the hosted URL out of the JSON reply. A rejected
/// upload maps to `Ok(None)` per the media-host contract; only transport
/// and decoding problems are errors.
pub struct HttpMediaStore {
    http: reqwest::Client,
    upload_url: String,
}

impl HttpMediaStore {
    pub fn new(upload_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            upload_url: upload_url.into(),
        }
    }
}

#[derive(Debug, serde::Deserialize)]
struct UploadResponseBody {
    url: Option<String>,
}

#[async_trait]
impl MediaStore for HttpMediaStore {
    async fn upload(
        &self,
        local_path: &Path,
    ) -> Result<Option<UploadedMedia>, MediaStoreError> {
        let bytes = tokio::fs::read(local_path)
            .await
            .map_err(|e| MediaStoreError::StagedFileUnreadable(e.to_string()))?;

        let file_name = local_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());

        let part = reqwest::multipart::Part::bytes(bytes).file_name(file_name);
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self
            .http
            .post(&self.upload_url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| MediaStoreError::RequestFailed(e.to_string()))?;

        if !response.status().is_success() {
            tracing::warn!(
                status = response.status().as_u16(),
                path = %local_path.display(),
                "Media host rejected upload"
            );
            return Ok(None);
        }

        let body: UploadResponseBody = response
            .json()
            .await
            .map_err(|e| MediaStoreError::InvalidResponse(e.to_string()))?;

        Ok(body.url.map(|url| UploadedMedia { url }))
    }
}
