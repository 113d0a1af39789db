//! Aggregation policy v1: distance thresholds and statistics knobs.
//!
//! Thresholds are expressed in the shared perceptual unit described in
//! [`crate::metric`]: ΔE00 for colors, percent difference for scalars.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::canonical::{canonical_hash_hex, quantize_float};
use crate::error::TokenError;
use crate::types::Category;
use crate::DEFAULT_POLICY_VERSION;

/// Environment variable overriding the default threshold.
pub const THRESHOLD_ENV: &str = "TOKEN_KERNEL_THRESHOLD";

/// Roughly one just-noticeable difference in ΔE00.
pub const DEFAULT_THRESHOLD: f64 = 2.3;

/// Default number of top representatives per category in statistics.
pub const DEFAULT_TOP_REPRESENTATIVES: usize = 3;

/// Policy controlling how candidates are clustered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregationPolicy {
    /// Policy version identifier.
    pub version: String,
    /// Merge threshold used when a category has no override.
    pub threshold: f64,
    /// Per-category threshold overrides.
    #[serde(default)]
    pub category_thresholds: BTreeMap<Category, f64>,
    /// How many representatives per category the statistics report.
    #[serde(default = "default_top")]
    pub top_representatives: usize,
}

fn default_top() -> usize {
    DEFAULT_TOP_REPRESENTATIVES
}

/// Quantized policy parameters for deterministic hashing.
#[derive(Serialize)]
struct QuantizedPolicyParams {
    version: String,
    threshold: i64,
    category_thresholds: BTreeMap<Category, i64>,
    top_representatives: usize,
}

impl AggregationPolicy {
    /// Create a policy with one threshold for every category.
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            ..Self::default()
        }
    }

    /// Override the threshold for one category.
    pub fn with_category_threshold(mut self, category: Category, threshold: f64) -> Self {
        self.category_thresholds.insert(category, threshold);
        self
    }

    /// Set the number of top representatives reported per category.
    pub fn with_top_representatives(mut self, n: usize) -> Self {
        self.top_representatives = n;
        self
    }

    /// Build the default policy, taking the threshold from
    /// `TOKEN_KERNEL_THRESHOLD` when it is set and parses.
    pub fn from_env() -> Self {
        let threshold = match std::env::var(THRESHOLD_ENV) {
            Ok(raw) => match raw.trim().parse::<f64>() {
                Ok(value) if value.is_finite() && value >= 0.0 => value,
                _ => {
                    tracing::warn!(
                        value = %raw,
                        default = DEFAULT_THRESHOLD,
                        "{} is not a non-negative number, using default",
                        THRESHOLD_ENV
                    );
                    DEFAULT_THRESHOLD
                }
            },
            Err(_) => DEFAULT_THRESHOLD,
        };
        Self::new(threshold)
    }

    /// Get the policy ID.
    pub fn policy_id(&self) -> &str {
        &self.version
    }

    /// Threshold that applies to a category.
    pub fn threshold_for(&self, category: Category) -> f64 {
        self.category_thresholds
            .get(&category)
            .copied()
            .unwrap_or(self.threshold)
    }

    /// Reject negative or non-finite thresholds.
    pub fn validate(&self) -> Result<(), TokenError> {
        std::iter::once(self.threshold)
            .chain(self.category_thresholds.values().copied())
            .find(|t| !t.is_finite() || *t < 0.0)
            .map_or(Ok(()), |bad| Err(TokenError::InvalidThreshold(bad)))
    }

    /// Compute a hash of the policy parameters.
    ///
    /// Floats are quantized before hashing so the hash is stable across
    /// platforms and serializer settings.
    pub fn params_hash(&self) -> String {
        let quantized = QuantizedPolicyParams {
            version: self.version.clone(),
            threshold: quantize_float(self.threshold),
            category_thresholds: self
                .category_thresholds
                .iter()
                .map(|(c, t)| (*c, quantize_float(*t)))
                .collect(),
            top_representatives: self.top_representatives,
        };
        canonical_hash_hex(&quantized)
    }
}

impl Default for AggregationPolicy {
    fn default() -> Self {
        Self {
            version: DEFAULT_POLICY_VERSION.to_string(),
            threshold: DEFAULT_THRESHOLD,
            category_thresholds: BTreeMap::new(),
            top_representatives: DEFAULT_TOP_REPRESENTATIVES,
        }
    }
}
