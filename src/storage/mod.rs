//! Durable state.
//!
//! The pipeline persists exactly one thing: which animals were already
//! posted, one ledger file per post variant.

pub mod ledger;

use std::path::Path;

use crate::error::Result;
use crate::models::{Config, PostVariant};

pub use ledger::PostedLedger;

/// Load the ledger for a variant from the data directory.
pub async fn load_ledger(
    config: &Config,
    data_dir: &Path,
    variant: PostVariant,
) -> Result<PostedLedger> {
    let path = data_dir.join(&config.variant(variant).ledger_file);
    PostedLedger::load(path).await
}
