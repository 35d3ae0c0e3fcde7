// src/pipeline/single.rs

//! Publish an already-hosted image.

use crate::error::Result;
use crate::models::{Config, PublishedMedia, SocialCredentials};
use crate::services::GraphPublisher;
use crate::utils::http::create_client;
use crate::utils::log;

/// Post one public image URL with a caption, using the long poll budget.
///
/// No ledger is involved; the image is not tied to a registry record.
pub async fn run_post_url(
    config: &Config,
    social: &SocialCredentials,
    image_url: &str,
    caption: &str,
) -> Result<PublishedMedia> {
    log::header("Posting a single image");
    log::sub_item(&format!("Image: {}", image_url));

    let client = create_client(&config.http)?;
    let publisher = GraphPublisher::new(client, &config.publisher, social);
    let published = publisher.publish_single_url(image_url, caption).await?;

    log::success(&format!("Published media {}", published.media_id));
    Ok(published)
}
