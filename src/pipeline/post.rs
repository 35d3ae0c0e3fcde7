// src/pipeline/post.rs

//! Posting pipeline.
//!
//! fetch → select → render → upload → publish → record
//!
//! Every stage runs sequentially. Per-record failures in render and upload
//! are skipped with a warning; a stage that ends up with nothing aborts the
//! run. The ledger is only written after the platform confirms the publish.

use std::path::Path;

use chrono::NaiveDate;
use rand::Rng;
use rand::seq::SliceRandom;

use crate::error::{AppError, Result};
use crate::models::{
    AnimalRecord, Config, Credentials, PostBatch, PostVariant, RunOutcome, RunReport,
    VariantConfig,
};
use crate::services::caption::generate_caption;
use crate::services::{
    CandidatePools, CdnUploader, GraphPublisher, HeadlessRenderer, ImageRenderer, ImageUploader,
    RecordSource, RegistryClient, RegistryQuery, Selector, SocialPublisher,
};
use crate::storage::{PostedLedger, load_ledger};
use crate::utils::http::create_client;
use crate::utils::log;

const TOTAL_STEPS: usize = 6;

/// Per-run knobs.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub target_date: NaiveDate,
    /// Batch size
    pub count: usize,
    /// Run every stage except publishing
    pub dry_run: bool,
}

/// One variant's pipeline wired to its collaborators.
pub struct PostPipeline<'a> {
    variant: PostVariant,
    config: &'a VariantConfig,
    source: &'a dyn RecordSource,
    renderer: &'a dyn ImageRenderer,
    uploader: &'a dyn ImageUploader,
    publisher: Option<&'a dyn SocialPublisher>,
    ledger: &'a mut PostedLedger,
}

impl<'a> PostPipeline<'a> {
    pub fn new(
        variant: PostVariant,
        config: &'a VariantConfig,
        source: &'a dyn RecordSource,
        renderer: &'a dyn ImageRenderer,
        uploader: &'a dyn ImageUploader,
        ledger: &'a mut PostedLedger,
    ) -> Self {
        Self {
            variant,
            config,
            source,
            renderer,
            uploader,
            publisher: None,
            ledger,
        }
    }

    pub fn with_publisher(mut self, publisher: &'a dyn SocialPublisher) -> Self {
        self.publisher = Some(publisher);
        self
    }

    /// Run one batch end to end.
    pub async fn run<R: Rng + ?Sized>(
        &mut self,
        options: &RunOptions,
        rng: &mut R,
    ) -> Result<RunReport> {
        let date = options.target_date;
        log::header(&format!("Posting {} animals for {}", self.variant, date));

        // Stage 1: registry
        log::step(1, TOTAL_STEPS, "Fetch - Querying the registry");
        let pools = self.fetch_pools(date).await?;
        let fetched = pools.total();
        log::sub_item(&format!("{} records fetched", fetched));

        // Stage 2: selection
        log::step(2, TOTAL_STEPS, "Select - Filtering and sampling");
        let selector = Selector::for_variant(self.config);
        let pools = if self.config.probe_images {
            self.probe_pools(pools, &selector, options.count, rng).await
        } else {
            pools
        };
        let selected = selector.select(pools, options.count, &*self.ledger, rng);
        if selected.is_empty() {
            log::warn(&format!(
                "No eligible {} animals for {}; nothing to post",
                self.variant, date
            ));
            return Ok(RunReport::nothing_to_post(fetched));
        }
        for (i, record) in selected.iter().enumerate() {
            log::sub_item(&format!("{}. {}", i + 1, record.label()));
        }
        let selected_count = selected.len();
        let mut batch = PostBatch::new(self.variant, date, selected);

        // Stage 3: render
        log::step(3, TOTAL_STEPS, "Render - Generating image cards");
        for entry in batch.entries.iter_mut() {
            match self.renderer.render(&entry.record, date).await {
                Ok(path) => {
                    log::sub_item(&format!("✓ {}", path.display()));
                    entry.image_path = Some(path);
                }
                Err(e) => log::warn(&format!("Render failed for {}: {}", entry.record.label(), e)),
            }
        }
        let rendered = batch.rendered().count();
        if rendered == 0 {
            return Err(AppError::pipeline("no images were rendered"));
        }

        // Stage 4: upload
        log::step(4, TOTAL_STEPS, "Upload - Sending images to the CDN");
        for entry in batch.entries.iter_mut() {
            let Some(path) = entry.image_path.as_deref() else {
                continue;
            };
            match self.uploader.upload(path).await {
                Ok(url) => {
                    log::sub_item(&format!("✓ {}", url));
                    entry.image_url = Some(url);
                }
                Err(e) => log::warn(&format!("Upload failed: {}", e)),
            }
        }
        let uploaded = batch.uploaded().count();
        if uploaded == 0 {
            return Err(AppError::pipeline("no images were uploaded"));
        }

        let urls = batch.uploaded_urls();
        let variant = self.variant;
        let listing_url = self.config.listing_url.as_str();
        let build_caption = |urls: &[String]| {
            generate_caption(&batch.records_for_urls(urls), variant, date, listing_url)
        };
        log::debug(&format!("Caption:\n{}", build_caption(&urls)));

        // Stage 5: publish
        if options.dry_run {
            log::step(5, TOTAL_STEPS, "Publish - Skipped (dry run)");
            log::info(&format!("Dry run: {} images ready, nothing published", urls.len()));
            return Ok(RunReport {
                outcome: RunOutcome::DryRun { urls },
                fetched,
                selected: selected_count,
                rendered,
                uploaded,
                ledger_added: Vec::new(),
            });
        }

        log::step(5, TOTAL_STEPS, "Publish - Creating the post");
        let publisher = self
            .publisher
            .ok_or_else(|| AppError::config("publishing requires Instagram credentials"))?;
        let published = publisher.publish(&urls, &build_caption).await?;
        log::success(&format!("Published media {}", published.media_id));

        // Stage 6: ledger and cleanup
        log::step(6, TOTAL_STEPS, "Record - Updating the ledger");
        let ledger_added = batch.ids_for_urls(&published.published_urls);
        for id in &ledger_added {
            self.ledger.add(id.clone());
        }
        if let Err(e) = self.ledger.persist().await {
            log::error(&format!(
                "Post {} is live but the ledger could not be saved: {}",
                published.media_id, e
            ));
            return Err(e);
        }
        log::sub_item(&format!(
            "{} ids added, {} total",
            ledger_added.len(),
            self.ledger.len()
        ));

        for path in batch.rendered_paths() {
            if let Err(e) = tokio::fs::remove_file(&path).await {
                log::warn(&format!("Failed to delete {}: {}", path.display(), e));
            }
        }

        Ok(RunReport {
            outcome: RunOutcome::Published {
                media_id: published.media_id,
            },
            fetched,
            selected: selected_count,
            rendered,
            uploaded,
            ledger_added,
        })
    }

    /// Priority-region pools first, then the unfiltered pool.
    async fn fetch_pools(&self, date: NaiveDate) -> Result<CandidatePools> {
        let query = RegistryQuery::for_variant(self.config, date);
        let mut pools = CandidatePools::default();

        for region in &self.config.priority_regions {
            let records = self
                .source
                .fetch_records(&query.clone().with_region(region.clone()))
                .await?;
            log::sub_item(&format!("Region {}: {} records", region, records.len()));
            pools.priority.push((region.clone(), records));
        }

        pools.general = self.source.fetch_records(&query).await?;
        log::sub_item(&format!("All regions: {} records", pools.general.len()));
        Ok(pools)
    }

    /// Keep only records whose image answers, probing in random order.
    async fn probe_pools<R: Rng + ?Sized>(
        &self,
        pools: CandidatePools,
        selector: &Selector,
        count: usize,
        rng: &mut R,
    ) -> CandidatePools {
        let mut probed = CandidatePools::default();
        for (region, pool) in pools.priority {
            let eligible = selector.eligible(pool, &*self.ledger);
            probed
                .priority
                .push((region, self.reachable(eligible, 1, rng).await));
        }

        // Priority picks may also sit in the general pool.
        let limit = count + probed.priority.len();
        let eligible = selector.eligible(pools.general, &*self.ledger);
        probed.general = self.reachable(eligible, limit, rng).await;
        probed
    }

    async fn reachable<R: Rng + ?Sized>(
        &self,
        mut records: Vec<AnimalRecord>,
        limit: usize,
        rng: &mut R,
    ) -> Vec<AnimalRecord> {
        records.shuffle(rng);
        let mut kept = Vec::new();
        for record in records {
            if kept.len() >= limit {
                break;
            }
            if self.source.is_reachable(&record.image_url).await {
                kept.push(record);
            } else {
                log::debug(&format!("Unreachable image skipped: {}", record.image_url));
            }
        }
        kept
    }
}

/// Build the real collaborators and run one batch.
pub async fn run_post(
    config: &Config,
    credentials: &Credentials,
    data_dir: &Path,
    variant: PostVariant,
    options: &RunOptions,
) -> Result<RunReport> {
    let client = create_client(&config.http)?;
    let variant_config = config.variant(variant);

    let source = RegistryClient::new(
        client.clone(),
        variant,
        variant_config,
        &config.registry,
        &credentials.registry_api_key,
    );
    let renderer = HeadlessRenderer::new(&config.renderer, data_dir);
    let uploader = CdnUploader::new(client.clone(), &config.cdn.endpoint, &credentials.cdn_token);
    let publisher = credentials
        .social
        .as_ref()
        .map(|social| GraphPublisher::new(client.clone(), &config.publisher, social));

    let mut ledger = load_ledger(config, data_dir, variant).await?;
    log::info(&format!(
        "Ledger {} holds {} ids",
        ledger.path().display(),
        ledger.len()
    ));

    let mut pipeline = PostPipeline::new(
        variant,
        variant_config,
        &source,
        &renderer,
        &uploader,
        &mut ledger,
    );
    if !options.dry_run {
        let publisher = publisher
            .as_ref()
            .ok_or_else(|| AppError::config("publishing requires Instagram credentials"))?;
        pipeline = pipeline.with_publisher(publisher);
    }

    let mut rng = rand::rng();
    let report = pipeline.run(options, &mut rng).await?;

    log::summary(
        &format!("{} post", variant),
        &[
            ("Fetched", report.fetched.to_string()),
            ("Selected", report.selected.to_string()),
            ("Rendered", report.rendered.to_string()),
            ("Uploaded", report.uploaded.to_string()),
            ("Ledger added", report.ledger_added.len().to_string()),
        ],
    );

    Ok(report)
}
