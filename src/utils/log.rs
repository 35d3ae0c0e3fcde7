// src/utils/log.rs

//! Step-by-step run narration.
//!
//! Thin helpers over the `log` facade so cron logs read as a sequence of
//! numbered stages with indented details. Call sites import this module as
//! `log` and use the plain functions; the `log` crate macros stay available
//! everywhere else.

/// Log a debug message
pub fn debug(message: &str) {
    log::debug!("{}", message);
}

/// Log an info message
pub fn info(message: &str) {
    log::info!("{}", message);
}

/// Log a warning message
pub fn warn(message: &str) {
    log::warn!("{}", message);
}

/// Log an error message
pub fn error(message: &str) {
    log::error!("{}", message);
}

/// Log a success message
pub fn success(message: &str) {
    log::info!("✓ {}", message);
}

/// Log a step in a process
pub fn step(step_num: usize, total: usize, message: &str) {
    log::info!("[STEP {}/{}] {}", step_num, total, message);
}

/// Log a header
pub fn header(title: &str) {
    let border = "═".repeat(60);
    log::info!("{}", border);
    log::info!("  {}", title);
    log::info!("{}", border);
}

/// Log a sub-item (indented)
pub fn sub_item(message: &str) {
    log::info!("    {}", message);
}

/// Log a summary section
pub fn summary(title: &str, items: &[(&str, String)]) {
    log::info!("[SUMMARY] {}", title);
    for (key, value) in items {
        log::info!("    {}: {}", key, value);
    }
}
