//! Resolved snapshot: the only input export adapters see.
//!
//! Aliases are resolved away: an aliased token keeps its own id but carries
//! its terminal's value, and structural references point at terminals.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use crate::canonical::canonical_hash_hex;
use crate::error::TokenError;
use crate::library::{BatchId, TokenLibrary};
use crate::types::{Category, EdgeKind, Role, TokenAttributes, TokenId};
use crate::TOKEN_KERNEL_SCHEMA_VERSION;

/// A structural reference with its target alias-resolved.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedReference {
    /// Dependency or Composition.
    pub kind: EdgeKind,
    /// Terminal token the reference points at.
    pub target: TokenId,
    /// Category of the target.
    pub target_category: Category,
    /// Edge annotations.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

/// One token as exported.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedToken {
    /// Token id.
    pub id: TokenId,
    /// Category.
    pub category: Category,
    /// Value after alias resolution.
    pub value: TokenAttributes,
    /// Aggregate confidence.
    pub confidence: f64,
    /// Contributing sources, ordered.
    pub sources: Vec<String>,
    /// Number of merged observations.
    pub observations: usize,
    /// Curator role.
    pub role: Option<Role>,
    /// Structural references, ordered by (target, kind).
    pub references: Vec<ResolvedReference>,
}

/// Fixed, alias-free view of a library.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedSnapshot {
    /// Export schema version.
    pub schema_version: String,
    /// Batch the library came from.
    pub batch_id: BatchId,
    /// Tokens in canonical order.
    pub tokens: Vec<ResolvedToken>,
    /// Number of edges in the library.
    pub edge_count: usize,
    /// Content hash of everything above.
    #[serde(skip)]
    pub snapshot_id: String,
}

impl ResolvedSnapshot {
    /// Build the snapshot of a library.
    pub fn build(library: &TokenLibrary) -> Result<Self, TokenError> {
        let mut tokens = Vec::with_capacity(library.len());
        for token in library.all() {
            let terminal = library.resolve_alias(&token.id)?;

            let mut references = Vec::new();
            for edge in library.dependencies_of(&token.id)? {
                let target = library.resolve_alias(&edge.to)?;
                references.push(ResolvedReference {
                    kind: edge.kind,
                    target: target.id.clone(),
                    target_category: target.category(),
                    metadata: edge.metadata.clone(),
                });
            }
            references.sort_by(|a, b| a.target.cmp(&b.target).then_with(|| a.kind.cmp(&b.kind)));
            // Two edges may resolve onto the same terminal.
            references.dedup_by(|a, b| a.target == b.target && a.kind == b.kind);

            tokens.push(ResolvedToken {
                id: token.id.clone(),
                category: token.category(),
                value: terminal.attributes.clone(),
                confidence: token.confidence,
                sources: token.provenance.sources().map(str::to_string).collect(),
                observations: token.observation_count(),
                role: token.role,
                references,
            });
        }

        let mut snapshot = Self {
            schema_version: TOKEN_KERNEL_SCHEMA_VERSION.to_string(),
            batch_id: library.batch_id(),
            tokens,
            edge_count: library.edge_count(),
            snapshot_id: String::new(),
        };
        snapshot.snapshot_id = canonical_hash_hex(&snapshot);
        Ok(snapshot)
    }

    /// Whether the snapshot holds no tokens.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Tokens grouped by category, each group in id order.
    pub fn by_category(&self) -> BTreeMap<Category, Vec<&ResolvedToken>> {
        let mut groups: BTreeMap<Category, Vec<&ResolvedToken>> = BTreeMap::new();
        for token in &self.tokens {
            groups.entry(token.category).or_default().push(token);
        }
        groups
    }

    /// Token positions ordered so that every token follows the tokens it
    /// references, ties broken by canonical position. `None` when the
    /// resolved references contain a cycle.
    pub fn dependency_order(&self) -> Option<Vec<usize>> {
        let position: BTreeMap<&TokenId, usize> =
            self.tokens.iter().enumerate().map(|(i, t)| (&t.id, i)).collect();

        let mut pending: Vec<usize> = vec![0; self.tokens.len()];
        let mut dependents: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); self.tokens.len()];
        for (i, token) in self.tokens.iter().enumerate() {
            let targets: BTreeSet<usize> = token
                .references
                .iter()
                .filter_map(|r| position.get(&r.target).copied())
                .collect();
            pending[i] = targets.len();
            for target in targets {
                dependents[target].insert(i);
            }
        }

        let mut ready: BTreeSet<usize> = (0..self.tokens.len()).filter(|i| pending[*i] == 0).collect();
        let mut order = Vec::with_capacity(self.tokens.len());
        while let Some(i) = ready.pop_first() {
            order.push(i);
            for &dependent in &dependents[i] {
                pending[dependent] -= 1;
                if pending[dependent] == 0 {
                    ready.insert(dependent);
                }
            }
        }

        (order.len() == self.tokens.len()).then_some(order)
    }
}
