//! The token library: aggregate root for one extraction batch.
//!
//! A [`TokenLibrary`] exclusively owns its [`TokenStore`] and
//! [`ReferenceGraph`] and is the only write path to either, so the two can
//! never disagree about which tokens exist. Every successful mutation bumps
//! the library revision.

pub mod shared;
pub mod stats;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

use crate::error::TokenError;
use crate::graph::ReferenceGraph;
use crate::store::TokenStore;
use crate::types::{CanonicalToken, Category, Edge, EdgeKind, Role, TokenId};

pub use shared::{CacheConfig, CacheStats, RenderResult, SharedLibrary};
pub use stats::{ConfidenceDistribution, LibraryStats, Representative};

/// Identifier of the extraction batch a library was built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BatchId(Uuid);

impl BatchId {
    /// Create a batch id from a UUID.
    pub fn new(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Generate a fresh random batch id.
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the inner UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for BatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Canonical tokens plus the reference graph over them.
#[derive(Debug, Clone)]
pub struct TokenLibrary {
    batch_id: BatchId,
    revision: u64,
    store: TokenStore,
    graph: ReferenceGraph,
}

impl TokenLibrary {
    /// Create an empty library with a random batch id.
    pub fn new() -> Self {
        Self::with_batch_id(BatchId::random())
    }

    /// Create an empty library for a known batch.
    pub fn with_batch_id(batch_id: BatchId) -> Self {
        Self {
            batch_id,
            revision: 0,
            store: TokenStore::new(),
            graph: ReferenceGraph::new(),
        }
    }

    /// Batch this library was built from.
    pub fn batch_id(&self) -> BatchId {
        self.batch_id
    }

    /// Mutation counter; changes whenever the library changes.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Read access to the token store.
    pub fn store(&self) -> &TokenStore {
        &self.store
    }

    /// Read access to the reference graph.
    pub fn graph(&self) -> &ReferenceGraph {
        &self.graph
    }

    // ─────────────────────────────────────────────────────────────────────
    // Writes
    // ─────────────────────────────────────────────────────────────────────

    /// Add a canonical token.
    pub fn insert_token(&mut self, token: CanonicalToken) -> Result<(), TokenError> {
        let id = token.id.clone();
        self.store.insert(token)?;
        if let Err(e) = self.graph.add_node(id.clone()) {
            // Keep store and graph in step even when the graph refuses.
            let _ = self.store.remove(&id);
            return Err(e);
        }
        self.revision += 1;
        Ok(())
    }

    /// Assign a role to a token.
    pub fn set_role(&mut self, id: &TokenId, role: Role) -> Result<(), TokenError> {
        self.store.set_role(id, Some(role))?;
        self.revision += 1;
        Ok(())
    }

    /// Assign a role given as curator input text.
    pub fn assign_role(&mut self, id: &TokenId, role: &str) -> Result<(), TokenError> {
        let role = Role::parse(role)?;
        self.set_role(id, role)
    }

    /// Remove a token's role.
    pub fn clear_role(&mut self, id: &TokenId) -> Result<(), TokenError> {
        self.store.set_role(id, None)?;
        self.revision += 1;
        Ok(())
    }

    /// Declare an edge between two tokens.
    pub fn add_edge(
        &mut self,
        from: &TokenId,
        to: &TokenId,
        kind: EdgeKind,
        metadata: BTreeMap<String, String>,
    ) -> Result<(), TokenError> {
        self.insert_edge(Edge {
            from: from.clone(),
            to: to.clone(),
            kind,
            metadata,
        })
    }

    /// Declare an edge from a prepared record.
    pub fn insert_edge(&mut self, edge: Edge) -> Result<(), TokenError> {
        self.graph.add_edge(edge)?;
        self.revision += 1;
        Ok(())
    }

    /// Delete a token.
    ///
    /// Fails with `ReferencedToken` while edges touch the token unless
    /// `force` is set, in which case those edges are removed and returned.
    pub fn delete_token(&mut self, id: &TokenId, force: bool) -> Result<Vec<Edge>, TokenError> {
        let removed = self.graph.remove_node(id, force)?;
        self.store
            .remove(id)
            .map_err(|_| TokenError::invariant(format!("token {id} in graph but not in store")))?;
        self.revision += 1;
        tracing::info!(token = %id, cascaded_edges = removed.len(), "token deleted");
        Ok(removed)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Reads
    // ─────────────────────────────────────────────────────────────────────

    /// Fetch a token by id.
    pub fn get(&self, id: &TokenId) -> Option<&CanonicalToken> {
        self.store.get(id)
    }

    /// Fetch a token by id, failing with `UnknownToken`.
    pub fn token(&self, id: &TokenId) -> Result<&CanonicalToken, TokenError> {
        self.store
            .get(id)
            .ok_or_else(|| TokenError::UnknownToken(id.clone()))
    }

    /// Tokens of one category, ordered by id.
    pub fn get_by_category(&self, category: Category) -> Vec<&CanonicalToken> {
        self.store.get_by_category(category)
    }

    /// All tokens in canonical order.
    pub fn all(&self) -> Vec<&CanonicalToken> {
        self.store.all()
    }

    /// Number of tokens.
    pub fn len(&self) -> usize {
        self.store.len()
    }

    /// Whether the library holds no tokens.
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// All edges in canonical order.
    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.graph.edges()
    }

    /// Number of edges.
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Follow aliases from `id` to the token that carries the value.
    pub fn resolve_alias(&self, id: &TokenId) -> Result<&CanonicalToken, TokenError> {
        let terminal = self.graph.resolve_alias(id)?;
        self.store
            .get(&terminal)
            .ok_or_else(|| TokenError::invariant(format!("alias target {terminal} missing from store")))
    }

    /// Alias chain from `id` to its terminal, inclusive.
    pub fn alias_chain(&self, id: &TokenId) -> Result<Vec<TokenId>, TokenError> {
        self.graph.alias_chain(id)
    }

    /// Direct Dependency/Composition edges out of `id`.
    pub fn dependencies_of(&self, id: &TokenId) -> Result<Vec<&Edge>, TokenError> {
        self.graph.dependencies_of(id)
    }

    /// Direct Dependency/Composition edges into `id`.
    pub fn dependents_of(&self, id: &TokenId) -> Result<Vec<&Edge>, TokenError> {
        self.graph.dependents_of(id)
    }

    /// Tokens aliasing `id`.
    pub fn aliases_of(&self, id: &TokenId) -> Result<Vec<TokenId>, TokenError> {
        self.graph.aliases_of(id)
    }

    /// Base values: tokens that depend on nothing, in canonical order.
    pub fn root_tokens(&self) -> Vec<&CanonicalToken> {
        self.in_canonical_order(self.graph.root_tokens())
    }

    /// Tokens nothing depends on, in canonical order.
    pub fn leaf_tokens(&self) -> Vec<&CanonicalToken> {
        self.in_canonical_order(self.graph.leaf_tokens())
    }

    /// Derived statistics, computed fresh on every call.
    pub fn stats(&self, top_n: usize) -> LibraryStats {
        LibraryStats::compute(self, top_n)
    }

    /// Check every library invariant.
    ///
    /// Returns the first violation found.
    pub fn validate(&self) -> Result<(), TokenError> {
        if self.store.len() != self.graph.node_count() {
            return Err(TokenError::InvariantViolation(format!(
                "store has {} tokens, graph has {} nodes",
                self.store.len(),
                self.graph.node_count()
            )));
        }
        for edge in self.graph.edges() {
            for endpoint in [&edge.from, &edge.to] {
                if !self.store.contains(endpoint) {
                    return Err(TokenError::InvariantViolation(format!(
                        "edge endpoint {endpoint} has no token"
                    )));
                }
            }
        }
        for token in self.store.all() {
            if token.provenance.confidences().any(|c| !(0.0..=1.0).contains(&c)) {
                return Err(TokenError::InvariantViolation(format!(
                    "token {} has provenance confidence outside [0, 1]",
                    token.id
                )));
            }
            if token.confidence != token.provenance.aggregate_confidence() {
                return Err(TokenError::InvariantViolation(format!(
                    "token {} confidence does not match its provenance",
                    token.id
                )));
            }
            self.graph.resolve_alias(&token.id)?;
        }
        Ok(())
    }

    fn in_canonical_order(&self, ids: Vec<TokenId>) -> Vec<&CanonicalToken> {
        let mut tokens: Vec<&CanonicalToken> = ids.iter().filter_map(|id| self.store.get(id)).collect();
        tokens.sort_by(|a, b| a.category().cmp(&b.category()).then_with(|| a.id.cmp(&b.id)));
        tokens
    }
}

impl Default for TokenLibrary {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ColorValue, Provenance, TokenAttributes};

    fn id(s: &str) -> TokenId {
        TokenId::new(s).unwrap()
    }

    fn token(name: &str, attributes: TokenAttributes, confidence: f64) -> CanonicalToken {
        let mut provenance = Provenance::new();
        provenance.record("img-1", confidence);
        CanonicalToken::new(id(name), attributes, provenance, 0)
    }

    fn sample_library() -> TokenLibrary {
        let mut library = TokenLibrary::new();
        library
            .insert_token(token("ink", TokenAttributes::Color(ColorValue::from_srgb8(20, 20, 20)), 0.9))
            .unwrap();
        library
            .insert_token(token("brand", TokenAttributes::Color(ColorValue::from_srgb8(200, 20, 20)), 0.8))
            .unwrap();
        library
            .insert_token(token("inter", TokenAttributes::FontFamily { family: "Inter".into() }, 0.7))
            .unwrap();
        library
            .insert_token(token("gap", TokenAttributes::Spacing { px: 8.0 }, 0.6))
            .unwrap();
        library
    }

    #[test]
    fn test_revision_tracks_mutations() {
        let mut library = sample_library();
        let start = library.revision();
        library.set_role(&id("brand"), Role::Primary).unwrap();
        assert_eq!(library.revision(), start + 1);

        // Failed writes leave the revision alone.
        assert!(library.set_role(&id("missing"), Role::Primary).is_err());
        assert_eq!(library.revision(), start + 1);
    }

    #[test]
    fn test_assign_role_validates_input() {
        let mut library = sample_library();
        library.assign_role(&id("brand"), "accent").unwrap();
        assert_eq!(library.get(&id("brand")).unwrap().role, Some(Role::Accent));

        let err = library.assign_role(&id("brand"), "fuchsia").unwrap_err();
        assert_eq!(err, TokenError::InvalidRole("fuchsia".into()));

        library.clear_role(&id("brand")).unwrap();
        assert_eq!(library.get(&id("brand")).unwrap().role, None);
    }

    #[test]
    fn test_delete_requires_force_when_referenced() {
        let mut library = sample_library();
        library
            .add_edge(&id("gap"), &id("ink"), EdgeKind::Dependency, BTreeMap::new())
            .unwrap();

        let err = library.delete_token(&id("ink"), false).unwrap_err();
        assert!(matches!(err, TokenError::ReferencedToken { edge_count: 1, .. }));
        assert!(library.get(&id("ink")).is_some());

        let removed = library.delete_token(&id("ink"), true).unwrap();
        assert_eq!(removed.len(), 1);
        assert!(library.get(&id("ink")).is_none());
        assert_eq!(library.edge_count(), 0);
        library.validate().unwrap();
    }

    #[test]
    fn test_delete_unknown_token() {
        let mut library = sample_library();
        assert_eq!(
            library.delete_token(&id("ghost"), true).unwrap_err(),
            TokenError::UnknownToken(id("ghost"))
        );
    }

    #[test]
    fn test_resolve_alias_returns_terminal_token() {
        let mut library = sample_library();
        library.insert_edge(Edge::alias(id("brand"), id("ink"))).unwrap();
        let resolved = library.resolve_alias(&id("brand")).unwrap();
        assert_eq!(resolved.id, id("ink"));
        assert_eq!(library.aliases_of(&id("ink")).unwrap(), vec![id("brand")]);
    }

    #[test]
    fn test_roots_and_leaves_in_canonical_order() {
        let mut library = sample_library();
        library
            .add_edge(&id("gap"), &id("ink"), EdgeKind::Dependency, BTreeMap::new())
            .unwrap();

        let roots: Vec<_> = library.root_tokens().into_iter().map(|t| t.id.as_str()).collect();
        // Colors first (brand, ink), then font family; gap depends on ink.
        assert_eq!(roots, vec!["brand", "ink", "inter"]);

        let leaves: Vec<_> = library.leaf_tokens().into_iter().map(|t| t.id.as_str()).collect();
        assert_eq!(leaves, vec!["brand", "gap", "inter"]);
    }

    #[test]
    fn test_validate_clean_library() {
        let library = sample_library();
        library.validate().unwrap();
        assert_eq!(library.len(), 4);
    }
}
