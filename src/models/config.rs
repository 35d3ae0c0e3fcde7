//! Application configuration structures.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::PostVariant;

/// Environment variable that overrides `cdn.endpoint`.
pub const CDN_URL_ENV: &str = "FINDYOU_CDN_URL";

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// HTTP client settings
    #[serde(default)]
    pub http: HttpConfig,

    /// Registry API paging and probing
    #[serde(default)]
    pub registry: RegistryConfig,

    /// Abandoned-animal post profile
    #[serde(default = "defaults::abandoned")]
    pub abandoned: VariantConfig,

    /// Lost-animal post profile
    #[serde(default = "defaults::lost")]
    pub lost: VariantConfig,

    /// Image hosting backend
    #[serde(default)]
    pub cdn: CdnConfig,

    /// Graph API publishing settings
    #[serde(default)]
    pub publisher: PublisherConfig,

    /// Image card rendering settings
    #[serde(default)]
    pub renderer: RendererConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Apply overrides taken from the process environment.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(endpoint) = lookup(CDN_URL_ENV).filter(|v| !v.trim().is_empty()) {
            self.cdn.endpoint = endpoint;
        }
    }

    /// Profile for the given post variant.
    pub fn variant(&self, variant: PostVariant) -> &VariantConfig {
        match variant {
            PostVariant::Abandoned => &self.abandoned,
            PostVariant::Lost => &self.lost,
        }
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.http.user_agent.trim().is_empty() {
            return Err(AppError::validation("http.user_agent is empty"));
        }
        if self.http.timeout_secs == 0 {
            return Err(AppError::validation("http.timeout_secs must be > 0"));
        }
        if self.registry.max_pages == 0 {
            return Err(AppError::validation("registry.max_pages must be > 0"));
        }
        for variant in PostVariant::ALL {
            self.variant(variant).validate(variant)?;
        }
        if self.cdn.endpoint.trim().is_empty() {
            return Err(AppError::validation(format!(
                "cdn.endpoint is empty (set it in config.toml or {CDN_URL_ENV})"
            )));
        }
        url::Url::parse(&self.cdn.endpoint)?;
        url::Url::parse(&self.publisher.graph_api_base)?;
        if self.publisher.poll_interval_secs == 0 || self.publisher.long_poll_interval_secs == 0 {
            return Err(AppError::validation(
                "publisher poll intervals must be > 0",
            ));
        }
        if self.publisher.max_wait_secs < self.publisher.poll_interval_secs {
            return Err(AppError::validation(
                "publisher.max_wait_secs must be >= publisher.poll_interval_secs",
            ));
        }
        if self.renderer.browser_bin.trim().is_empty() {
            return Err(AppError::validation("renderer.browser_bin is empty"));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http: HttpConfig::default(),
            registry: RegistryConfig::default(),
            abandoned: defaults::abandoned(),
            lost: defaults::lost(),
            cdn: CdnConfig::default(),
            publisher: PublisherConfig::default(),
            renderer: RendererConfig::default(),
        }
    }
}

/// HTTP client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
        }
    }
}

/// Registry API settings shared by both variants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Upper bound on pages walked per query
    #[serde(default = "defaults::max_pages")]
    pub max_pages: u32,

    /// Timeout for image reachability probes
    #[serde(default = "defaults::probe_timeout")]
    pub probe_timeout_secs: u64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            max_pages: defaults::max_pages(),
            probe_timeout_secs: defaults::probe_timeout(),
        }
    }
}

/// Everything that differs between the abandoned and lost post flows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariantConfig {
    /// Registry endpoint queried for this variant
    pub endpoint: String,

    /// Ledger file name, relative to the data directory
    pub ledger_file: String,

    /// Path fragment every usable image URL contains
    pub image_path_marker: String,

    /// Image URLs must be strictly longer than this
    #[serde(default)]
    pub min_image_url_len: usize,

    /// Region codes (`upr_cd`) that each get one guaranteed slot
    #[serde(default)]
    pub priority_regions: Vec<String>,

    /// Number of animals per post when `--count` is not given
    pub default_count: usize,

    /// Days before the target date included in the query
    #[serde(default)]
    pub lookback_days: u32,

    /// Rows requested per registry page (max 1000)
    pub page_size: u32,

    /// HEAD-check image URLs before sampling
    #[serde(default)]
    pub probe_images: bool,

    /// Public listing linked from the caption
    pub listing_url: String,
}

impl VariantConfig {
    fn validate(&self, variant: PostVariant) -> Result<()> {
        url::Url::parse(&self.endpoint)?;
        if self.ledger_file.trim().is_empty() {
            return Err(AppError::validation(format!("{variant}.ledger_file is empty")));
        }
        if self.default_count == 0 {
            return Err(AppError::validation(format!(
                "{variant}.default_count must be > 0"
            )));
        }
        if self.page_size == 0 || self.page_size > 1000 {
            return Err(AppError::validation(format!(
                "{variant}.page_size must be within 1..=1000"
            )));
        }
        Ok(())
    }
}

/// Image hosting backend settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CdnConfig {
    /// Multipart upload endpoint
    #[serde(default)]
    pub endpoint: String,
}

/// Graph API publishing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublisherConfig {
    /// Versioned Graph API root
    #[serde(default = "defaults::graph_api_base")]
    pub graph_api_base: String,

    /// Status poll interval for batch posts
    #[serde(default = "defaults::poll_interval")]
    pub poll_interval_secs: u64,

    /// Maximum wait per container for batch posts
    #[serde(default = "defaults::max_wait")]
    pub max_wait_secs: u64,

    /// Status poll interval for the single-URL flow
    #[serde(default = "defaults::long_poll_interval")]
    pub long_poll_interval_secs: u64,

    /// Maximum wait for the single-URL flow
    #[serde(default = "defaults::long_max_wait")]
    pub long_max_wait_secs: u64,
}

impl PublisherConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn max_wait(&self) -> Duration {
        Duration::from_secs(self.max_wait_secs)
    }

    pub fn long_poll_interval(&self) -> Duration {
        Duration::from_secs(self.long_poll_interval_secs)
    }

    pub fn long_max_wait(&self) -> Duration {
        Duration::from_secs(self.long_max_wait_secs)
    }
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            graph_api_base: defaults::graph_api_base(),
            poll_interval_secs: defaults::poll_interval(),
            max_wait_secs: defaults::max_wait(),
            long_poll_interval_secs: defaults::long_poll_interval(),
            long_max_wait_secs: defaults::long_max_wait(),
        }
    }
}

/// Image card rendering settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RendererConfig {
    /// Headless browser executable
    #[serde(default = "defaults::browser_bin")]
    pub browser_bin: String,

    /// Output directory, relative to the data directory
    #[serde(default = "defaults::output_dir")]
    pub output_dir: String,

    /// Canvas width in pixels
    #[serde(default = "defaults::canvas_width")]
    pub width: u32,

    /// Canvas height in pixels
    #[serde(default = "defaults::canvas_height")]
    pub height: u32,

    /// Time allowed for one screenshot
    #[serde(default = "defaults::render_timeout")]
    pub timeout_secs: u64,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            browser_bin: defaults::browser_bin(),
            output_dir: defaults::output_dir(),
            width: defaults::canvas_width(),
            height: defaults::canvas_height(),
            timeout_secs: defaults::render_timeout(),
        }
    }
}

mod defaults {
    use super::VariantConfig;

    // HTTP defaults
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; findyou/0.1)".into()
    }
    pub fn timeout() -> u64 {
        30
    }

    // Registry defaults
    pub fn max_pages() -> u32 {
        3
    }
    pub fn probe_timeout() -> u64 {
        5
    }

    // Variant defaults
    pub fn abandoned() -> VariantConfig {
        VariantConfig {
            endpoint: "https://apis.data.go.kr/1543061/abandonmentPublicService_v2/abandonmentPublic_v2"
                .into(),
            ledger_file: "posted_abandoned_animals.json".into(),
            image_path_marker: "/shelter/".into(),
            min_image_url_len: 80,
            priority_regions: vec![
                "6110000".into(), // 서울특별시
                "6410000".into(), // 경기도
            ],
            default_count: 7,
            lookback_days: 0,
            page_size: 100,
            probe_images: false,
            listing_url: "https://www.animal.go.kr/front/awtis/public/publicList.do".into(),
        }
    }
    pub fn lost() -> VariantConfig {
        VariantConfig {
            endpoint: "https://apis.data.go.kr/1543061/lossInfoService/lossInfo".into(),
            ledger_file: "posted_lost_animals.json".into(),
            image_path_marker: "/files/".into(),
            min_image_url_len: 0,
            priority_regions: Vec::new(),
            default_count: 5,
            lookback_days: 6,
            page_size: 1000,
            probe_images: true,
            listing_url: "https://www.animal.go.kr/front/awtis/loss/lossList.do".into(),
        }
    }

    // Publisher defaults
    pub fn graph_api_base() -> String {
        "https://graph.facebook.com/v20.0".into()
    }
    pub fn poll_interval() -> u64 {
        2
    }
    pub fn max_wait() -> u64 {
        60
    }
    pub fn long_poll_interval() -> u64 {
        30
    }
    pub fn long_max_wait() -> u64 {
        300
    }

    // Renderer defaults
    pub fn browser_bin() -> String {
        "chromium".into()
    }
    pub fn output_dir() -> String {
        "generated_images".into()
    }
    pub fn canvas_width() -> u32 {
        1080
    }
    pub fn canvas_height() -> u32 {
        1500
    }
    pub fn render_timeout() -> u64 {
        60
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn configured() -> Config {
        let mut config = Config::default();
        config.cdn.endpoint = "https://cdn.example.com/upload".to_string();
        config
    }

    #[test]
    fn validate_default_config_needs_cdn_endpoint() {
        assert!(Config::default().validate().is_err());
        assert!(configured().validate().is_ok());
    }

    #[test]
    fn validate_rejects_empty_user_agent() {
        let mut config = configured();
        config.http.user_agent = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_oversized_page() {
        let mut config = configured();
        config.lost.page_size = 5000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn env_override_sets_cdn_endpoint() {
        let mut config = Config::default();
        config.apply_env_overrides(|key| {
            (key == CDN_URL_ENV).then(|| "https://cdn.example.com/u".to_string())
        });
        assert_eq!(config.cdn.endpoint, "https://cdn.example.com/u");
    }

    #[test]
    fn variants_keep_their_own_policies() {
        let config = Config::default();
        assert_eq!(config.abandoned.priority_regions.len(), 2);
        assert!(config.lost.priority_regions.is_empty());
        assert_eq!(config.lost.lookback_days, 6);
        assert!(config.lost.probe_images);
    }

    #[test]
    fn shipped_config_matches_defaults() {
        let mut config: Config = toml::from_str(include_str!("../../data/config.toml")).unwrap();
        assert_eq!(config.abandoned.priority_regions, Config::default().abandoned.priority_regions);
        assert_eq!(config.lost.page_size, 1000);
        assert!(config.validate().is_err());
        config.apply_env_overrides(|_| Some("https://cdn.example.com/upload".to_string()));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_toml_falls_back_to_defaults() {
        let config: Config = toml::from_str(
            r#"
            [http]
            timeout_secs = 10

            [cdn]
            endpoint = "https://cdn.example.com/upload"
            "#,
        )
        .unwrap();
        assert_eq!(config.http.timeout_secs, 10);
        assert_eq!(config.abandoned.default_count, 7);
        assert_eq!(config.publisher.max_wait_secs, 60);
        assert!(config.validate().is_ok());
    }
}
