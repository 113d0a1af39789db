//! Aggregation policy definitions.

pub mod aggregation;

pub use aggregation::{AggregationPolicy, DEFAULT_THRESHOLD, THRESHOLD_ENV};
