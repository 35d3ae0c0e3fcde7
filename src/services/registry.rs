// src/services/registry.rs

//! Registry fetcher service.
//!
//! Queries the public animal-protection registry for one post variant and
//! normalizes every returned item into an [`AnimalRecord`].

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;

use crate::error::Result;
use crate::models::{AnimalRecord, PostVariant, RegistryConfig, RegistryPage, VariantConfig};
use crate::utils::decode_service_key;

/// Largest page the registry serves.
pub const MAX_ROWS_PER_PAGE: u32 = 1000;

/// Registry date parameter format.
const DATE_FORMAT: &str = "%Y%m%d";

/// One registry query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryQuery {
    /// First day, `YYYYMMDD`
    pub bgnde: String,
    /// Last day (inclusive), `YYYYMMDD`
    pub endde: String,
    pub page_no: u32,
    pub num_of_rows: u32,
    /// Province code filter
    pub upr_cd: Option<String>,
}

impl RegistryQuery {
    /// Query covering `start..=end`.
    pub fn for_range(start: NaiveDate, end: NaiveDate, num_of_rows: u32) -> Self {
        Self {
            bgnde: start.format(DATE_FORMAT).to_string(),
            endde: end.format(DATE_FORMAT).to_string(),
            page_no: 1,
            num_of_rows: num_of_rows.clamp(1, MAX_ROWS_PER_PAGE),
            upr_cd: None,
        }
    }

    /// Query for a variant ending on `target`, honoring its lookback window.
    pub fn for_variant(config: &VariantConfig, target: NaiveDate) -> Self {
        let start = target - chrono::Duration::days(i64::from(config.lookback_days));
        Self::for_range(start, target, config.page_size)
    }

    pub fn with_region(mut self, upr_cd: impl Into<String>) -> Self {
        self.upr_cd = Some(upr_cd.into());
        self
    }

    pub fn with_page(mut self, page_no: u32) -> Self {
        self.page_no = page_no.max(1);
        self
    }

    fn params(&self, service_key: &str) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("serviceKey", service_key.to_string()),
            ("bgnde", self.bgnde.clone()),
            ("endde", self.endde.clone()),
            ("pageNo", self.page_no.to_string()),
            ("numOfRows", self.num_of_rows.clamp(1, MAX_ROWS_PER_PAGE).to_string()),
            ("_type", "json".to_string()),
        ];
        if let Some(upr_cd) = &self.upr_cd {
            params.push(("upr_cd", upr_cd.clone()));
        }
        params
    }
}

/// Where animal records come from.
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Every record matching the query, across pages.
    async fn fetch_records(&self, query: &RegistryQuery) -> Result<Vec<AnimalRecord>>;

    /// Whether an image URL currently answers.
    async fn is_reachable(&self, url: &str) -> bool;
}

/// HTTP client for one registry endpoint.
pub struct RegistryClient {
    client: Client,
    endpoint: String,
    service_key: String,
    variant: PostVariant,
    max_pages: u32,
    probe_timeout: Duration,
}

impl RegistryClient {
    pub fn new(
        client: Client,
        variant: PostVariant,
        variant_config: &VariantConfig,
        registry: &RegistryConfig,
        api_key: &str,
    ) -> Self {
        Self {
            client,
            endpoint: variant_config.endpoint.clone(),
            service_key: decode_service_key(api_key),
            variant,
            max_pages: registry.max_pages.max(1),
            probe_timeout: Duration::from_secs(registry.probe_timeout_secs),
        }
    }

    /// Fetch and decode a single page.
    pub async fn fetch_page(&self, query: &RegistryQuery) -> Result<RegistryPage> {
        log::debug!(
            "Registry query {} {}..{} page {} upr_cd={:?}",
            self.variant,
            query.bgnde,
            query.endde,
            query.page_no,
            query.upr_cd
        );

        let response = self
            .client
            .get(&self.endpoint)
            .query(&query.params(&self.service_key))
            .send()
            .await?
            .error_for_status()?;
        let text = response.text().await?;

        Ok(RegistryPage::parse(&text))
    }

    /// Records on a single page.
    pub async fn fetch(&self, query: &RegistryQuery) -> Result<Vec<AnimalRecord>> {
        let page = self.fetch_page(query).await?;
        Ok(self.normalize(page))
    }

    /// Walk pages until `totalCount` is reached or the page budget runs out.
    pub async fn fetch_all(&self, query: &RegistryQuery) -> Result<Vec<AnimalRecord>> {
        let mut records = Vec::new();
        let mut page_no = query.page_no.max(1);
        let mut pages = 0;

        loop {
            let page = self.fetch_page(&query.clone().with_page(page_no)).await?;
            let total = page.total_count;
            let received = page.items.len();
            records.extend(self.normalize(page));
            pages += 1;

            if received == 0 || records.len() as u64 >= total {
                break;
            }
            if pages >= self.max_pages {
                log::warn!(
                    "Stopping after {} pages with {}/{} {} records",
                    pages,
                    records.len(),
                    total,
                    self.variant
                );
                break;
            }
            page_no += 1;
        }

        Ok(records)
    }

    /// `HEAD` the URL with a short timeout.
    pub async fn probe_image(&self, url: &str) -> bool {
        match self
            .client
            .head(url)
            .timeout(self.probe_timeout)
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                log::debug!("Image probe failed for {}: {}", url, e);
                false
            }
        }
    }

    fn normalize(&self, page: RegistryPage) -> Vec<AnimalRecord> {
        page.items
            .into_iter()
            .map(|raw| AnimalRecord::from_raw(raw, self.variant))
            .collect()
    }
}

#[async_trait]
impl RecordSource for RegistryClient {
    async fn fetch_records(&self, query: &RegistryQuery) -> Result<Vec<AnimalRecord>> {
        self.fetch_all(query).await
    }

    async fn is_reachable(&self, url: &str) -> bool {
        self.probe_image(url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Config;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn abandoned_query_covers_single_day() {
        let config = Config::default();
        let query = RegistryQuery::for_variant(&config.abandoned, date("2026-01-13"));
        assert_eq!(query.bgnde, "20260113");
        assert_eq!(query.endde, "20260113");
        assert_eq!(query.num_of_rows, 100);
    }

    #[test]
    fn lost_query_covers_seven_days() {
        let config = Config::default();
        let query = RegistryQuery::for_variant(&config.lost, date("2026-01-13"));
        assert_eq!(query.bgnde, "20260107");
        assert_eq!(query.endde, "20260113");
        assert_eq!(query.num_of_rows, 1000);
    }

    #[test]
    fn rows_are_clamped() {
        let query = RegistryQuery::for_range(date("2026-01-01"), date("2026-01-01"), 5000);
        assert_eq!(query.num_of_rows, MAX_ROWS_PER_PAGE);
    }

    #[test]
    fn params_include_region_only_when_set() {
        let query = RegistryQuery::for_range(date("2026-01-01"), date("2026-01-01"), 10);
        assert!(!query.params("k").iter().any(|(k, _)| *k == "upr_cd"));

        let query = query.with_region("6110000");
        let params = query.params("k");
        assert!(params.contains(&("upr_cd", "6110000".to_string())));
        assert!(params.contains(&("_type", "json".to_string())));
    }
}
