//! Batch Imagery Inference Pipeline
//!
//! Coordinates large batch image-inference jobs: resolves input imagery into
//! independent work items, dispatches them to a remote compute tier over a
//! request channel, tracks completion by watching result artifacts appear in
//! a durable store, and aggregates per-item results into one deduplicated,
//! threshold-filtered feature collection.

pub mod config;
pub mod context;
pub mod models;
pub mod pipeline;
pub mod services;
