// src/lib.rs

//! findyou: registry-to-Instagram posting pipeline for abandoned and lost
//! animals.

pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;
