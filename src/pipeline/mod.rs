//! Pipeline entry points.
//!
//! - `run_post`: Fetch, select, render, upload and publish one batch
//! - `run_post_url`: Publish an image that is already hosted
//! - `run_validate`: Check configuration, credentials and the Graph account

pub mod post;
pub mod single;
pub mod validate;

pub use post::{PostPipeline, RunOptions, run_post};
pub use single::run_post_url;
pub use validate::run_validate;
