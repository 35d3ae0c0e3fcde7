// src/utils/http.rs

//! HTTP client utilities.

use std::time::Duration;

use crate::error::Result;
use crate::models::HttpConfig;

/// Create the shared asynchronous HTTP client.
pub fn create_client(config: &HttpConfig) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .user_agent(&config.user_agent)
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?;
    Ok(client)
}

/// Turn a non-success response into a readable message, keeping the body.
pub async fn describe_failure(response: reqwest::Response) -> String {
    let status = response.status();
    match response.text().await {
        Ok(body) if !body.trim().is_empty() => format!("HTTP {status}: {}", body.trim()),
        _ => format!("HTTP {status}"),
    }
}
