//! Perceptual deduplicator.
//!
//! Clusters raw candidates into canonical tokens, one category at a time.
//!
//! ## Algorithm
//!
//! 1. Validate every candidate; malformed ones are reported and skipped
//! 2. Order the rest by confidence (descending), ties by input position
//! 3. For each candidate, find every cluster of its category holding a
//!    member within the threshold
//!    - none: start a new cluster seeded with the candidate
//!    - one or more: fuse them into the earliest-created one, then add
//!      the candidate
//! 4. Mint ids per category in cluster creation order
//!
//! Linking on "any member within threshold" makes clusters the connected
//! components of the within-threshold graph. The partition therefore does
//! not depend on processing order, and raising the threshold can only
//! join clusters, never split them.
//!
//! The cost is chaining: the threshold bounds neighbouring members, not the
//! spread of a cluster. Forty spacings 1.9% apart, from 100px to 208px,
//! form one token at a 2% threshold, with a representative near 148px.
//!
//! Recency is the observation timestamp when every accepted candidate has
//! one, otherwise the position in the batch for all of them.
//!
//! The representative starts at the seed (the highest-confidence member)
//! and moves as a confidence-weighted running value.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::error::TokenError;
use crate::export::ExportOptions;
use crate::library::{BatchId, LibraryStats, TokenLibrary};
use crate::metric::{self, DISJOINT};
use crate::policy::AggregationPolicy;
use crate::types::{CanonicalToken, Category, Provenance, RawCandidate, TokenAttributes, TokenId};

/// Summary of one aggregation run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregationReport {
    /// Policy the run used.
    pub policy_id: String,
    /// Hash of the policy parameters.
    pub params_hash: String,
    /// Candidates received.
    pub candidates: usize,
    /// Candidates merged into the library.
    pub accepted: usize,
    /// Candidates rejected, each as a `MalformedCandidate` error.
    pub rejected: Vec<TokenError>,
    /// Cluster fusions caused by a candidate bridging two clusters.
    pub fusions: usize,
    /// Tokens produced per category.
    pub tokens_per_category: BTreeMap<Category, usize>,
    /// Representatives per category the policy asks statistics to report.
    pub top_representatives: usize,
}

/// Result of aggregation: the library plus its report.
#[derive(Debug, Clone)]
pub struct Aggregation {
    /// The deduplicated library.
    pub library: TokenLibrary,
    /// What happened to each candidate.
    pub report: AggregationReport,
}

impl Aggregation {
    /// Library statistics with the policy's representative count.
    pub fn stats(&self) -> LibraryStats {
        self.library.stats(self.report.top_representatives)
    }

    /// Export options whose report lists the policy's representative count.
    pub fn export_options(&self) -> ExportOptions {
        ExportOptions::default().with_report_top_n(self.report.top_representatives)
    }
}

/// Candidate that passed validation, with its input position.
struct Accepted<'a> {
    index: usize,
    candidate: &'a RawCandidate,
    recency: i64,
}

/// A cluster under construction.
struct Cluster<'a> {
    category: Category,
    members: Vec<&'a RawCandidate>,
    representative: TokenAttributes,
    weight: f64,
    provenance: Provenance,
    last_observed: i64,
}

impl<'a> Cluster<'a> {
    fn seed(accepted: &Accepted<'a>) -> Self {
        let mut provenance = Provenance::new();
        provenance.record(accepted.candidate.source_id.clone(), accepted.candidate.confidence);
        Self {
            category: accepted.candidate.category(),
            members: vec![accepted.candidate],
            representative: accepted.candidate.attributes.clone(),
            weight: accepted.candidate.confidence,
            provenance,
            last_observed: accepted.recency,
        }
    }

    fn absorb_candidate(&mut self, accepted: &Accepted<'a>) {
        let candidate = accepted.candidate;
        self.representative = metric::merge(
            &self.representative,
            self.weight,
            &candidate.attributes,
            candidate.confidence,
        );
        self.weight += candidate.confidence;
        self.provenance.record(candidate.source_id.clone(), candidate.confidence);
        self.members.push(candidate);
        self.last_observed = self.last_observed.max(accepted.recency);
    }

    fn absorb_cluster(&mut self, other: Cluster<'a>) {
        self.representative = metric::merge(&self.representative, self.weight, &other.representative, other.weight);
        self.weight += other.weight;
        for member in &other.members {
            self.provenance.record(member.source_id.clone(), member.confidence);
        }
        self.members.extend(other.members);
        self.last_observed = self.last_observed.max(other.last_observed);
    }
}

/// Perceptual deduplicator driven by an [`AggregationPolicy`].
#[derive(Debug, Clone)]
pub struct Aggregator {
    policy: AggregationPolicy,
    batch_id: Option<BatchId>,
}

impl Aggregator {
    /// Create an aggregator with one threshold for every category.
    pub fn new(threshold: f64) -> Self {
        Self::with_policy(AggregationPolicy::new(threshold))
    }

    /// Create an aggregator from a full policy.
    pub fn with_policy(policy: AggregationPolicy) -> Self {
        Self { policy, batch_id: None }
    }

    /// Use a known batch id instead of a random one.
    pub fn with_batch_id(mut self, batch_id: BatchId) -> Self {
        self.batch_id = Some(batch_id);
        self
    }

    /// The policy in use.
    pub fn policy(&self) -> &AggregationPolicy {
        &self.policy
    }

    /// Aggregate a batch of candidates into a library.
    ///
    /// Fails only when the policy itself is invalid; malformed candidates
    /// are skipped and listed in the report.
    pub fn aggregate(&self, candidates: &[RawCandidate]) -> Result<Aggregation, TokenError> {
        self.policy.validate()?;

        let mut rejected = Vec::new();
        let mut accepted: Vec<Accepted<'_>> = Vec::with_capacity(candidates.len());
        for (index, candidate) in candidates.iter().enumerate() {
            match candidate.validate() {
                Ok(()) => accepted.push(Accepted {
                    index,
                    candidate,
                    recency: index as i64,
                }),
                Err(reason) => rejected.push(reject(index, candidate, reason)),
            }
        }

        // Timestamps only when every accepted candidate has one; epoch
        // milliseconds and batch positions are not comparable.
        if accepted.iter().all(|a| a.candidate.observed_at.is_some()) {
            for entry in &mut accepted {
                if let Some(at) = entry.candidate.observed_at {
                    entry.recency = at.timestamp_millis();
                }
            }
        }

        // Stable sort keeps input order among equal confidences.
        accepted.sort_by(|x, y| y.candidate.confidence.total_cmp(&x.candidate.confidence));

        // Slots in creation order; fused clusters leave `None` behind.
        let mut clusters: Vec<Option<Cluster<'_>>> = Vec::new();
        let mut fusions = 0usize;
        let mut merged = 0usize;

        for entry in &accepted {
            let category = entry.candidate.category();
            let threshold = self.policy.threshold_for(category);

            let linked = match self.linked_clusters(&clusters, entry, threshold) {
                Ok(linked) => linked,
                Err(reason) => {
                    rejected.push(reject(entry.index, entry.candidate, reason));
                    continue;
                }
            };

            let Some((&target, rest)) = linked.split_first() else {
                clusters.push(Some(Cluster::seed(entry)));
                merged += 1;
                continue;
            };

            for &slot in rest {
                let Some(other) = clusters[slot].take() else {
                    return Err(TokenError::invariant(format!("cluster slot {slot} fused twice")));
                };
                let Some(into) = clusters[target].as_mut() else {
                    return Err(TokenError::invariant(format!("cluster slot {target} is empty")));
                };
                into.absorb_cluster(other);
                fusions += 1;
            }

            let Some(into) = clusters[target].as_mut() else {
                return Err(TokenError::invariant(format!("cluster slot {target} is empty")));
            };
            into.absorb_candidate(entry);
            merged += 1;
            tracing::debug!(
                index = entry.index,
                source = %entry.candidate.source_id,
                category = %category,
                cluster = target,
                bridged = rest.len(),
                "candidate merged"
            );
        }

        let mut library = match self.batch_id {
            Some(batch_id) => TokenLibrary::with_batch_id(batch_id),
            None => TokenLibrary::new(),
        };
        let mut tokens_per_category: BTreeMap<Category, usize> = BTreeMap::new();
        for cluster in clusters.into_iter().flatten() {
            let n = tokens_per_category.entry(cluster.category).or_default();
            *n += 1;
            let id = TokenId::sequential(cluster.category, *n);
            library.insert_token(CanonicalToken::new(
                id,
                cluster.representative,
                cluster.provenance,
                cluster.last_observed,
            ))?;
        }

        let report = AggregationReport {
            policy_id: self.policy.policy_id().to_string(),
            params_hash: self.policy.params_hash(),
            candidates: candidates.len(),
            accepted: merged,
            rejected,
            fusions,
            tokens_per_category,
            top_representatives: self.policy.top_representatives,
        };

        tracing::info!(
            batch = %library.batch_id(),
            candidates = report.candidates,
            accepted = report.accepted,
            rejected = report.rejected.len(),
            tokens = library.len(),
            policy = %report.policy_id,
            "aggregation complete"
        );

        Ok(Aggregation { library, report })
    }

    /// Slots of every live cluster of the candidate's category with a member
    /// within `threshold`, in creation order.
    fn linked_clusters(
        &self,
        clusters: &[Option<Cluster<'_>>],
        entry: &Accepted<'_>,
        threshold: f64,
    ) -> Result<Vec<usize>, String> {
        let category = entry.candidate.category();
        let mut linked = Vec::new();
        for (slot, cluster) in clusters.iter().enumerate() {
            let Some(cluster) = cluster.as_ref().filter(|c| c.category == category) else {
                continue;
            };
            let mut within = false;
            for member in &cluster.members {
                let d = metric::distance(&member.attributes, &entry.candidate.attributes);
                if d.is_nan() {
                    return Err("distance is not a number".to_string());
                }
                if d < DISJOINT && d <= threshold {
                    within = true;
                    break;
                }
            }
            if within {
                linked.push(slot);
            }
        }
        Ok(linked)
    }
}

impl Default for Aggregator {
    fn default() -> Self {
        Self::with_policy(AggregationPolicy::default())
    }
}

fn reject(index: usize, candidate: &RawCandidate, reason: String) -> TokenError {
    tracing::warn!(
        index,
        source = %candidate.source_id,
        category = %candidate.category(),
        reason = %reason,
        "candidate rejected"
    );
    TokenError::MalformedCandidate {
        index,
        source_id: candidate.source_id.clone(),
        reason,
    }
}

/// Aggregate with a single threshold, returning only the library.
pub fn aggregate(candidates: &[RawCandidate], threshold: f64) -> Result<TokenLibrary, TokenError> {
    Aggregator::new(threshold).aggregate(candidates).map(|a| a.library)
}
