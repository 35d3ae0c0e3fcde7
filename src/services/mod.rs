//! Service layer for the posting pipeline.
//!
//! This module contains the business logic for:
//! - Registry fetching (`RegistryClient`)
//! - Candidate selection (`Selector`)
//! - Card rendering (`HeadlessRenderer`)
//! - CDN upload (`CdnUploader`)
//! - Graph API publishing (`GraphPublisher`)
//! - Captions and hashtags (`caption`)
//!
//! Every external collaborator sits behind a trait so the pipeline can run
//! against fakes.

pub mod caption;
mod publisher;
mod registry;
mod renderer;
mod selector;
mod uploader;

pub use publisher::{
    AccountInfo, CaptionBuilder, GraphPublisher, MIN_CAROUSEL_ITEMS, SocialPublisher,
};
pub use registry::{MAX_ROWS_PER_PAGE, RecordSource, RegistryClient, RegistryQuery};
pub use renderer::{HeadlessRenderer, ImageRenderer, card_html, notes_font_size};
pub use selector::{CandidatePools, Selector};
pub use uploader::{CdnUploader, ImageUploader};
