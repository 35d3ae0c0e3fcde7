// src/models/mod.rs

//! Domain models for the posting pipeline.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod animal;
mod config;
mod credentials;
mod envelope;
mod post;
mod variant;

// Re-export all public types
pub use animal::{AnimalRecord, RawAnimal, Sex, derive_id};
pub use config::{
    CDN_URL_ENV, CdnConfig, Config, HttpConfig, PublisherConfig, RegistryConfig, RendererConfig,
    VariantConfig,
};
pub use credentials::{Credentials, SocialCredentials};
pub use envelope::{Items, OneOrMany, RegistryPage, RegistryResponse};
pub use post::{
    BatchEntry, ContainerStatus, MediaContainer, PostBatch, PublishedMedia, RunOutcome, RunReport,
};
pub use variant::PostVariant;
