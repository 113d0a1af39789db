//! Library statistics.
//!
//! Always derived from the current token set on request; nothing here is
//! cached, so statistics can never drift from the library they describe.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::TokenLibrary;
use crate::types::{CanonicalToken, Category, EdgeKind, TokenId};

/// Number of fixed-width confidence buckets over [0, 1].
pub const CONFIDENCE_BUCKETS: usize = 10;

/// Summary of aggregate confidences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceDistribution {
    /// Lowest confidence, if any tokens exist.
    pub min: Option<f64>,
    /// Highest confidence.
    pub max: Option<f64>,
    /// Arithmetic mean.
    pub mean: Option<f64>,
    /// Median.
    pub median: Option<f64>,
    /// Token counts per bucket `[i/10, (i+1)/10)`; the last bucket includes 1.0.
    pub buckets: Vec<usize>,
}

impl ConfidenceDistribution {
    /// Build from a list of confidences.
    pub fn from_values(mut values: Vec<f64>) -> Self {
        let mut buckets = vec![0; CONFIDENCE_BUCKETS];
        for v in &values {
            let i = ((v * CONFIDENCE_BUCKETS as f64).floor() as usize).min(CONFIDENCE_BUCKETS - 1);
            buckets[i] += 1;
        }

        if values.is_empty() {
            return Self {
                min: None,
                max: None,
                mean: None,
                median: None,
                buckets,
            };
        }

        values.sort_by(|a, b| a.total_cmp(b));
        let n = values.len();
        let median = if n % 2 == 1 {
            values[n / 2]
        } else {
            (values[n / 2 - 1] + values[n / 2]) / 2.0
        };

        Self {
            min: values.first().copied(),
            max: values.last().copied(),
            mean: Some(values.iter().sum::<f64>() / n as f64),
            median: Some(median),
            buckets,
        }
    }
}

/// A top-ranked token within its category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Representative {
    /// Token id.
    pub id: TokenId,
    /// Aggregate confidence.
    pub confidence: f64,
    /// Number of distinct contributing sources.
    pub source_count: usize,
}

/// Snapshot of derived library statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LibraryStats {
    /// Total number of tokens.
    pub token_count: usize,
    /// Total number of edges.
    pub edge_count: usize,
    /// Tokens per category (only non-empty categories).
    pub counts_by_category: BTreeMap<Category, usize>,
    /// Edges per kind (only kinds present).
    pub edges_by_kind: BTreeMap<EdgeKind, usize>,
    /// Confidence distribution over all tokens.
    pub confidence: ConfidenceDistribution,
    /// Tokens backed by more than one source.
    pub multi_source_tokens: usize,
    /// Tokens carrying a curator role.
    pub tokens_with_role: usize,
    /// Tokens nothing depends on.
    pub unreferenced_tokens: usize,
    /// Best tokens per category: confidence desc, then recency desc, then id.
    pub top_representatives: BTreeMap<Category, Vec<Representative>>,
}

impl LibraryStats {
    /// Compute statistics for a library.
    pub fn compute(library: &TokenLibrary, top_n: usize) -> Self {
        let tokens = library.all();

        let mut counts_by_category: BTreeMap<Category, usize> = BTreeMap::new();
        for token in &tokens {
            *counts_by_category.entry(token.category()).or_default() += 1;
        }

        let mut edges_by_kind: BTreeMap<EdgeKind, usize> = BTreeMap::new();
        for edge in library.edges() {
            *edges_by_kind.entry(edge.kind).or_default() += 1;
        }

        let top_representatives = counts_by_category
            .keys()
            .map(|category| {
                let mut ranked: Vec<&CanonicalToken> = library.get_by_category(*category);
                ranked.sort_by(|a, b| {
                    b.confidence
                        .total_cmp(&a.confidence)
                        .then_with(|| b.last_observed.cmp(&a.last_observed))
                        .then_with(|| a.id.cmp(&b.id))
                });
                let top = ranked
                    .into_iter()
                    .take(top_n)
                    .map(|t| Representative {
                        id: t.id.clone(),
                        confidence: t.confidence,
                        source_count: t.provenance.source_count(),
                    })
                    .collect();
                (*category, top)
            })
            .collect();

        Self {
            token_count: tokens.len(),
            edge_count: library.edge_count(),
            counts_by_category,
            edges_by_kind,
            confidence: ConfidenceDistribution::from_values(tokens.iter().map(|t| t.confidence).collect()),
            multi_source_tokens: tokens.iter().filter(|t| t.is_multi_source()).count(),
            tokens_with_role: tokens.iter().filter(|t| t.role.is_some()).count(),
            unreferenced_tokens: library.graph().leaf_tokens().len(),
            top_representatives,
        }
    }
}
