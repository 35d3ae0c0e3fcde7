// src/services/uploader.rs

//! CDN uploader.

use std::path::Path;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;

use crate::error::{AppError, Result};
use crate::utils::http::describe_failure;

/// Puts a local image somewhere the platform can fetch it from.
#[async_trait]
pub trait ImageUploader: Send + Sync {
    /// Public URL of the uploaded file.
    async fn upload(&self, path: &Path) -> Result<String>;
}

#[derive(Debug, Deserialize)]
struct CdnResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    data: Option<CdnData>,
}

#[derive(Debug, Deserialize)]
struct CdnData {
    #[serde(default)]
    urls: Vec<String>,
}

/// Multipart uploader for the image CDN.
pub struct CdnUploader {
    client: Client,
    endpoint: String,
    token: String,
}

impl CdnUploader {
    pub fn new(client: Client, endpoint: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            token: token.into(),
        }
    }
}

fn mime_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}

#[async_trait]
impl ImageUploader for CdnUploader {
    async fn upload(&self, path: &Path) -> Result<String> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| AppError::upload(path, e))?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());

        let part = Part::bytes(bytes)
            .file_name(file_name)
            .mime_str(mime_for(path))
            .map_err(|e| AppError::upload(path, e))?;
        let form = Form::new().part("files", part);

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.token)
            .multipart(form)
            .send()
            .await
            .map_err(|e| AppError::upload(path, e))?;

        if !response.status().is_success() {
            return Err(AppError::upload(path, describe_failure(response).await));
        }

        let body: CdnResponse = response
            .json()
            .await
            .map_err(|e| AppError::upload(path, format!("unreadable response: {e}")))?;

        if !body.success {
            return Err(AppError::upload(path, "CDN reported success=false"));
        }
        body.data
            .and_then(|d| d.urls.into_iter().next())
            .ok_or_else(|| AppError::upload(path, "CDN response has no urls"))
    }
}
