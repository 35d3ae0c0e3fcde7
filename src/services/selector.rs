// src/services/selector.rs

//! Candidate selection.
//!
//! Filters fetched records down to postable ones and samples the batch.
//! Priority regions each get one guaranteed slot; the remainder is a uniform
//! sample of the general pool.

use std::collections::HashSet;

use rand::Rng;
use rand::seq::IndexedRandom;

use crate::models::{AnimalRecord, VariantConfig};
use crate::storage::PostedLedger;
use crate::utils::is_http_url;

/// Fetched records grouped the way selection consumes them.
#[derive(Debug, Clone, Default)]
pub struct CandidatePools {
    /// `(region code, records)` in priority order
    pub priority: Vec<(String, Vec<AnimalRecord>)>,
    pub general: Vec<AnimalRecord>,
}

impl CandidatePools {
    pub fn total(&self) -> usize {
        self.general.len() + self.priority.iter().map(|(_, p)| p.len()).sum::<usize>()
    }
}

/// Image URL rules plus the sampling policy for one variant.
#[derive(Debug, Clone)]
pub struct Selector {
    image_path_marker: String,
    min_image_url_len: usize,
}

impl Selector {
    pub fn new(image_path_marker: impl Into<String>, min_image_url_len: usize) -> Self {
        Self {
            image_path_marker: image_path_marker.into(),
            min_image_url_len,
        }
    }

    pub fn for_variant(config: &VariantConfig) -> Self {
        Self::new(config.image_path_marker.clone(), config.min_image_url_len)
    }

    /// Absolute http(s) URL with the expected path and length.
    pub fn is_valid_image(&self, url: &str) -> bool {
        !url.is_empty()
            && url.len() > self.min_image_url_len
            && url.contains(&self.image_path_marker)
            && is_http_url(url)
    }

    /// Records with a valid image, not yet posted, first of each dedup key.
    pub fn eligible(&self, records: Vec<AnimalRecord>, ledger: &PostedLedger) -> Vec<AnimalRecord> {
        let mut seen = HashSet::new();
        records
            .into_iter()
            .filter(|r| self.is_valid_image(&r.image_url))
            .filter(|r| !ledger.contains(&r.id))
            .filter(|r| seen.insert(r.dedup_key().to_string()))
            .collect()
    }

    /// Pick up to `n` records.
    pub fn select<R: Rng + ?Sized>(
        &self,
        pools: CandidatePools,
        n: usize,
        ledger: &PostedLedger,
        rng: &mut R,
    ) -> Vec<AnimalRecord> {
        let mut chosen: Vec<AnimalRecord> = Vec::with_capacity(n);
        let mut taken = Taken::default();

        for (region, pool) in pools.priority {
            if chosen.len() >= n {
                break;
            }
            let candidates: Vec<_> = self
                .eligible(pool, ledger)
                .into_iter()
                .filter(|r| !taken.contains(r))
                .collect();
            match candidates.choose(rng) {
                Some(pick) => {
                    log::debug!("Region {} slot: {}", region, pick.label());
                    taken.insert(pick);
                    chosen.push(pick.clone());
                }
                None => log::info!("No eligible animals for region {}, slot skipped", region),
            }
        }

        let remaining = n.saturating_sub(chosen.len());
        let general: Vec<_> = self
            .eligible(pools.general, ledger)
            .into_iter()
            .filter(|r| !taken.contains(r))
            .collect();
        chosen.extend(general.choose_multiple(rng, remaining).cloned());

        chosen
    }
}

/// Ids and dedup keys already in the batch.
#[derive(Default)]
struct Taken {
    ids: HashSet<String>,
    keys: HashSet<String>,
}

impl Taken {
    fn contains(&self, record: &AnimalRecord) -> bool {
        self.ids.contains(&record.id) || self.keys.contains(record.dedup_key())
    }

    fn insert(&mut self, record: &AnimalRecord) {
        self.ids.insert(record.id.clone());
        self.keys.insert(record.dedup_key().to_string());
    }
}
