//! Media object-storage client (datastore storage REST API)

use bytes::Bytes;
use reqwest::Client;
use serde_json::Value;

#[derive(Debug)]
pub enum StorageError {
    Http(reqwest::Error),
    Api(String),
}

impl From<reqwest::Error> for StorageError {
    fn from(e: reqwest::Error) -> Self {
        StorageError::Http(e)
    }
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::Http(e) => write!(f, "HTTP error: {}", e),
            StorageError::Api(s) => write!(f, "Storage API error: {}", s),
        }
    }
}

impl std::error::Error for StorageError {}

#[derive(Clone)]
pub struct MediaStorageClient {
    base_url: String,
    service_key: String,
    http: Client,
}

impl MediaStorageClient {
    pub fn new(base_url: &str, service_key: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            service_key: service_key.to_string(),
            http: Client::new(),
        }
    }

    /// Upload an object; fails if the path already exists
    pub async fn upload(
        &self,
        bucket: &str,
        path: &str,
        content_type: &str,
        data: Bytes,
    ) -> Result<(), StorageError> {
        let url = format!("{}/storage/v1/object/{}/{}", self.base_url, bucket, path);

        let resp = self
            .http
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.service_key))
            .header("Content-Type", content_type.to_string())
            .body(data)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body: Value = resp.json().await.unwrap_or(Value::Null);
            let message = body
                .get("message")
                .or_else(|| body.get("error"))
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| format!("Upload failed: {}", status));
            return Err(StorageError::Api(message));
        }

        Ok(())
    }

    /// Public download URL for an uploaded object
    pub fn public_url(&self, bucket: &str, path: &str) -> String {
        format!("{}/storage/v1/object/public/{}/{}", self.base_url, bucket, path)
    }

    pub async fn delete(&self, bucket: &str, path: &str) -> Result<(), StorageError> {
        let url = format!("{}/storage/v1/object/{}/{}", self.base_url, bucket, path);

        let resp = self
            .http
            .delete(&url)
            .header("Authorization", format!("Bearer {}", self.service_key))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(StorageError::Api(format!("Delete failed: {}", status)));
        }

        Ok(())
    }
}
