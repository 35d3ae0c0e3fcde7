// src/services/publisher.rs

//! Instagram Graph API publisher.
//!
//! Publishing is a container protocol: stage each image as a media
//! container, wait for the platform to finish processing it, optionally wrap
//! the children in a carousel container, then publish. Only the final
//! `media_publish` call is visible to followers.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::error::{AppError, Result};
use crate::models::{
    ContainerStatus, MediaContainer, PublishedMedia, PublisherConfig, SocialCredentials,
};
use crate::utils::poll::{PollOutcome, PollPolicy, PollStep, poll_until};

/// Fewest finished children a carousel accepts.
pub const MIN_CAROUSEL_ITEMS: usize = 2;

/// Builds the caption from the image URLs that actually made it into the post.
pub type CaptionBuilder<'a> = &'a (dyn Fn(&[String]) -> String + Send + Sync);

/// Publishes a set of public image URLs as one post.
#[async_trait]
pub trait SocialPublisher: Send + Sync {
    async fn publish(
        &self,
        image_urls: &[String],
        caption: CaptionBuilder<'_>,
    ) -> Result<PublishedMedia>;
}

#[derive(Debug, Deserialize)]
struct GraphIdResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct GraphStatusResponse {
    #[serde(default)]
    status_code: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GraphErrorBody {
    error: GraphError,
}

#[derive(Debug, Deserialize)]
struct GraphError {
    #[serde(default)]
    message: String,
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    code: Option<i64>,
}

/// Account fields returned by the verification call.
#[derive(Debug, Clone, Deserialize)]
pub struct AccountInfo {
    pub id: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub media_count: Option<u64>,
}

/// Graph API client bound to one business account.
pub struct GraphPublisher {
    client: Client,
    base: String,
    account_id: String,
    access_token: String,
    policy: PollPolicy,
    long_policy: PollPolicy,
}

impl GraphPublisher {
    pub fn new(client: Client, config: &PublisherConfig, credentials: &SocialCredentials) -> Self {
        Self {
            client,
            base: config.graph_api_base.trim_end_matches('/').to_string(),
            account_id: credentials.account_id.clone(),
            access_token: credentials.access_token.clone(),
            policy: PollPolicy::new(config.poll_interval(), config.max_wait()),
            long_policy: PollPolicy::new(config.long_poll_interval(), config.long_max_wait()),
        }
    }

    fn media_endpoint(&self) -> String {
        format!("{}/{}/media", self.base, self.account_id)
    }

    async fn send<T: DeserializeOwned>(&self, stage: &str, request: RequestBuilder) -> Result<T> {
        // Query strings carry the access token; keep URLs out of errors.
        let response = request
            .send()
            .await
            .map_err(|e| AppError::platform_unreachable(stage, e.without_url()))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| AppError::platform_unreachable(stage, e.without_url()))?;

        if !status.is_success() {
            return Err(AppError::platform(stage, graph_error_message(status, &text)));
        }
        serde_json::from_str(&text)
            .map_err(|e| AppError::platform(stage, format!("unexpected response ({e}): {text}")))
    }

    /// Stage a single image; `caption` only for standalone posts.
    pub async fn create_image_container(
        &self,
        image_url: &str,
        caption: Option<&str>,
        carousel_item: bool,
    ) -> Result<String> {
        let mut form = vec![
            ("image_url", image_url),
            ("access_token", self.access_token.as_str()),
        ];
        if carousel_item {
            form.push(("is_carousel_item", "true"));
        }
        if let Some(caption) = caption {
            form.push(("caption", caption));
        }

        let created: GraphIdResponse = self
            .send(
                "create container",
                self.client.post(self.media_endpoint()).form(&form),
            )
            .await?;
        Ok(created.id)
    }

    /// Wrap finished children into a carousel.
    pub async fn create_carousel_container(
        &self,
        children: &[String],
        caption: &str,
    ) -> Result<String> {
        let children = children.join(",");
        let form = [
            ("media_type", "CAROUSEL"),
            ("children", children.as_str()),
            ("caption", caption),
            ("access_token", self.access_token.as_str()),
        ];

        let created: GraphIdResponse = self
            .send(
                "create carousel",
                self.client.post(self.media_endpoint()).form(&form),
            )
            .await?;
        Ok(created.id)
    }

    pub async fn container_status(&self, container_id: &str) -> Result<MediaContainer> {
        let status: GraphStatusResponse = self
            .send(
                "container status",
                self.client
                    .get(format!("{}/{}", self.base, container_id))
                    .query(&[
                        ("fields", "status_code"),
                        ("access_token", self.access_token.as_str()),
                    ]),
            )
            .await?;

        Ok(MediaContainer {
            id: container_id.to_string(),
            status: ContainerStatus::from_code(status.status_code.as_deref().unwrap_or_default()),
        })
    }

    /// Poll until `FINISHED`.
    ///
    /// `ERROR`/`EXPIRED` and a rejected status request stop immediately;
    /// only an unreachable platform is retried until the budget runs out.
    pub async fn wait_until_ready(&self, container_id: &str, policy: PollPolicy) -> Result<()> {
        let outcome = poll_until(policy, |attempt| async move {
            match self.container_status(container_id).await {
                Ok(container) if container.status == ContainerStatus::Finished => {
                    PollStep::Ready(Ok(()))
                }
                Ok(container) if container.status.is_failure() => {
                    PollStep::Failed(container.status.to_string())
                }
                Ok(container) => {
                    log::debug!(
                        "Container {} is {} (check {})",
                        container_id,
                        container.status,
                        attempt
                    );
                    PollStep::Pending
                }
                Err(e @ AppError::PlatformUnreachable { .. }) => {
                    log::warn!("Status check {} for {} failed: {}", attempt, container_id, e);
                    PollStep::Pending
                }
                Err(e) => PollStep::Ready(Err(e)),
            }
        })
        .await;

        match outcome {
            PollOutcome::Ready(result) => result,
            PollOutcome::Failed(status) => Err(AppError::ContainerFailed {
                container_id: container_id.to_string(),
                status,
            }),
            PollOutcome::TimedOut { attempts } => Err(AppError::ContainerTimeout {
                container_id: container_id.to_string(),
                attempts,
            }),
        }
    }

    /// Make a finished container public.
    pub async fn publish_container(&self, creation_id: &str) -> Result<String> {
        let form = [
            ("creation_id", creation_id),
            ("access_token", self.access_token.as_str()),
        ];
        let published: GraphIdResponse = self
            .send(
                "media_publish",
                self.client
                    .post(format!("{}/{}/media_publish", self.base, self.account_id))
                    .form(&form),
            )
            .await?;
        Ok(published.id)
    }

    async fn publish_single(
        &self,
        image_url: &str,
        caption: &str,
        policy: PollPolicy,
    ) -> Result<PublishedMedia> {
        let container_id = self
            .create_image_container(image_url, Some(caption), false)
            .await?;
        log::info!("Container {} created", container_id);

        self.wait_until_ready(&container_id, policy).await?;
        let media_id = self.publish_container(&container_id).await?;

        Ok(PublishedMedia {
            media_id,
            container_id,
            published_urls: vec![image_url.to_string()],
        })
    }

    async fn publish_carousel(
        &self,
        image_urls: &[String],
        caption: CaptionBuilder<'_>,
    ) -> Result<PublishedMedia> {
        let mut children = Vec::new();
        let mut ready_urls = Vec::new();

        for (i, url) in image_urls.iter().enumerate() {
            log::info!("[{}/{}] Creating carousel item", i + 1, image_urls.len());
            let child = match self.create_image_container(url, None, true).await {
                Ok(id) => id,
                Err(e) => {
                    log::warn!("Skipping {}: {}", url, e);
                    continue;
                }
            };
            match self.wait_until_ready(&child, self.policy).await {
                Ok(()) => {
                    children.push(child);
                    ready_urls.push(url.clone());
                }
                Err(e) => log::warn!("Skipping {}: {}", url, e),
            }
        }

        if children.len() < MIN_CAROUSEL_ITEMS {
            return Err(AppError::InsufficientImages {
                ready: children.len(),
                required: MIN_CAROUSEL_ITEMS,
            });
        }

        let text = caption(&ready_urls);
        let container_id = self.create_carousel_container(&children, &text).await?;
        log::info!(
            "Carousel {} created with {} items",
            container_id,
            children.len()
        );
        self.wait_until_ready(&container_id, self.policy).await?;
        let media_id = self.publish_container(&container_id).await?;

        Ok(PublishedMedia {
            media_id,
            container_id,
            published_urls: ready_urls,
        })
    }

    /// Single image with the long poll budget.
    pub async fn publish_single_url(
        &self,
        image_url: &str,
        caption: &str,
    ) -> Result<PublishedMedia> {
        self.publish_single(image_url, caption, self.long_policy).await
    }

    /// Check the token against the configured account.
    pub async fn verify_account(&self) -> Result<AccountInfo> {
        self.send(
            "verify account",
            self.client
                .get(format!("{}/{}", self.base, self.account_id))
                .query(&[
                    ("fields", "id,username,name,media_count"),
                    ("access_token", self.access_token.as_str()),
                ]),
        )
        .await
    }
}

#[async_trait]
impl SocialPublisher for GraphPublisher {
    async fn publish(
        &self,
        image_urls: &[String],
        caption: CaptionBuilder<'_>,
    ) -> Result<PublishedMedia> {
        match image_urls {
            [] => Err(AppError::validation("no image URLs to publish")),
            [single] => self.publish_single(single, &caption(image_urls), self.policy).await,
            many => self.publish_carousel(many, caption).await,
        }
    }
}

/// Prefer the Graph `error.message`, fall back to the raw body.
fn graph_error_message(status: reqwest::StatusCode, body: &str) -> String {
    match serde_json::from_str::<GraphErrorBody>(body) {
        Ok(GraphErrorBody { error }) => {
            let mut message = format!("HTTP {status}: {}", error.message);
            if let Some(kind) = error.kind {
                message.push_str(&format!(" [{kind}]"));
            }
            if let Some(code) = error.code {
                message.push_str(&format!(" (code {code})"));
            }
            message
        }
        Err(_) if body.trim().is_empty() => format!("HTTP {status}"),
        Err(_) => format!("HTTP {status}: {}", body.trim()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn graph_error_is_summarized() {
        let message = graph_error_message(
            reqwest::StatusCode::BAD_REQUEST,
            r#"{"error":{"message":"Invalid OAuth access token.","type":"OAuthException","code":190}}"#,
        );
        assert_eq!(
            message,
            "HTTP 400 Bad Request: Invalid OAuth access token. [OAuthException] (code 190)"
        );
    }

    #[test]
    fn non_graph_error_keeps_body() {
        let message = graph_error_message(reqwest::StatusCode::BAD_GATEWAY, "upstream down");
        assert_eq!(message, "HTTP 502 Bad Gateway: upstream down");
    }
}
