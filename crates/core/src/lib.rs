//! Core library: folder scanning, per-image classification and reporting,
//! and batch delivery to a result sink.

pub mod classifier;
pub mod config;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod processor;
pub mod report;
pub mod scanner;
