// src/pipeline/validate.rs

use crate::error::Result;
use crate::models::{Config, Credentials, PostVariant};
use crate::services::GraphPublisher;
use crate::utils::http::create_client;
use crate::utils::log;

/// Validate configuration and credentials; with `online`, check the Graph
/// API token against the account.
pub async fn run_validate(config: &Config, online: bool) -> Result<()> {
    log::header("Validating configuration");

    if let Err(e) = config.validate() {
        log::error(&format!("Config validation failed: {}", e));
        return Err(e);
    }
    log::success("Config OK");
    log::sub_item(&format!("User agent: {}", config.http.user_agent));
    log::sub_item(&format!("Timeout: {}s", config.http.timeout_secs));
    log::sub_item(&format!("CDN endpoint: {}", config.cdn.endpoint));
    for variant in PostVariant::ALL {
        let profile = config.variant(variant);
        log::sub_item(&format!(
            "{}: {} animals per post, {} priority regions, ledger {}",
            variant,
            profile.default_count,
            profile.priority_regions.len(),
            profile.ledger_file
        ));
    }

    let credentials = match Credentials::from_env(online) {
        Ok(credentials) => credentials,
        Err(e) => {
            log::error(&format!("Credential check failed: {}", e));
            return Err(e);
        }
    };
    log::success("Credentials present");

    if let Some(social) = credentials.social.filter(|_| online) {
        let client = create_client(&config.http)?;
        let publisher = GraphPublisher::new(client, &config.publisher, &social);
        let account = publisher.verify_account().await?;
        log::success(&format!(
            "Instagram account {} (@{}) reachable, {} media",
            account.id,
            account.username.as_deref().unwrap_or("?"),
            account
                .media_count
                .map(|c| c.to_string())
                .unwrap_or_else(|| "?".to_string())
        ));
    }

    log::success("All validations passed");
    Ok(())
}
