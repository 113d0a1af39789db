//! Directed reference graph over canonical tokens.
//!
//! Nodes live in an arena of slots addressed by index; a `TokenId -> index`
//! map resolves ids once at the boundary and every traversal after that is
//! index based. Adjacency is kept in both directions and updated
//! incrementally on every insertion, so in/out lookups never scan edges.
//!
//! ## Invariants
//!
//! - Every edge endpoint is a live node.
//! - A node has at most one outgoing Alias edge.
//! - The Alias subgraph is acyclic; no self-edges of any kind.
//! - A rejected mutation leaves the graph unchanged.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use crate::error::TokenError;
use crate::types::{Edge, EdgeKind, TokenId};

type NodeIx = usize;
type EdgeKey = (TokenId, TokenId, EdgeKind);

#[derive(Debug, Clone)]
struct Node {
    id: TokenId,
    /// Target of this node's Alias edge.
    alias_target: Option<NodeIx>,
    /// Nodes whose Alias edge targets this node.
    aliased_by: BTreeSet<NodeIx>,
    /// Outgoing Dependency/Composition edges.
    structural_out: BTreeSet<(NodeIx, EdgeKind)>,
    /// Incoming Dependency/Composition edges.
    structural_in: BTreeSet<(NodeIx, EdgeKind)>,
}

impl Node {
    fn new(id: TokenId) -> Self {
        Self {
            id,
            alias_target: None,
            aliased_by: BTreeSet::new(),
            structural_out: BTreeSet::new(),
            structural_in: BTreeSet::new(),
        }
    }

    fn degree(&self) -> usize {
        usize::from(self.alias_target.is_some())
            + self.aliased_by.len()
            + self.structural_out.len()
            + self.structural_in.len()
    }
}

/// Reference graph: Alias, Dependency and Composition edges between tokens.
#[derive(Debug, Clone, Default)]
pub struct ReferenceGraph {
    /// Node arena; removed nodes leave a tombstone.
    slots: Vec<Option<Node>>,
    /// Token id -> slot.
    index: BTreeMap<TokenId, NodeIx>,
    /// All edges keyed in canonical order.
    edges: BTreeMap<EdgeKey, Edge>,
}

impl ReferenceGraph {
    /// Create a new empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a token as a node.
    ///
    /// Registering an id twice is an internal invariant violation.
    pub fn add_node(&mut self, id: TokenId) -> Result<(), TokenError> {
        if self.index.contains_key(&id) {
            return Err(TokenError::invariant(format!("node {id} registered twice")));
        }
        let ix = self.slots.len();
        self.slots.push(Some(Node::new(id.clone())));
        self.index.insert(id, ix);
        Ok(())
    }

    /// Whether the graph has a node for this id.
    pub fn contains(&self, id: &TokenId) -> bool {
        self.index.contains_key(id)
    }

    /// Number of live nodes.
    pub fn node_count(&self) -> usize {
        self.index.len()
    }

    /// Number of edges.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// All edges in canonical order.
    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.values()
    }

    /// Insert an edge.
    ///
    /// Fails with `UnknownToken` if an endpoint is missing, `CycleDetected`
    /// for self-edges and for aliases that would close a cycle,
    /// `AliasConflict` if `from` already aliases something, and
    /// `DuplicateEdge` if the same (from, to, kind) exists. The graph is
    /// unchanged on failure.
    pub fn add_edge(&mut self, edge: Edge) -> Result<(), TokenError> {
        let from = self.ix(&edge.from)?;
        let to = self.ix(&edge.to)?;

        if from == to {
            return Err(TokenError::CycleDetected {
                from: edge.from,
                to: edge.to,
            });
        }

        let key = (edge.from.clone(), edge.to.clone(), edge.kind);
        if self.edges.contains_key(&key) {
            return Err(TokenError::DuplicateEdge {
                from: edge.from,
                to: edge.to,
                kind: edge.kind,
            });
        }

        match edge.kind {
            EdgeKind::Alias => {
                if let Some(existing) = self.node(from).alias_target {
                    return Err(TokenError::AliasConflict {
                        from: edge.from,
                        existing: self.node(existing).id.clone(),
                    });
                }
                if self.alias_path_exists(to, from)? {
                    return Err(TokenError::CycleDetected {
                        from: edge.from,
                        to: edge.to,
                    });
                }
                self.node_mut(from).alias_target = Some(to);
                self.node_mut(to).aliased_by.insert(from);
            }
            kind => {
                self.node_mut(from).structural_out.insert((to, kind));
                self.node_mut(to).structural_in.insert((from, kind));
            }
        }

        tracing::debug!(from = %edge.from, to = %edge.to, kind = %edge.kind, "edge added");
        self.edges.insert(key, edge);
        Ok(())
    }

    /// Remove a node.
    ///
    /// Without `force`, fails with `ReferencedToken` if any edge touches the
    /// node. With `force`, every touching edge is removed first and returned.
    pub fn remove_node(&mut self, id: &TokenId, force: bool) -> Result<Vec<Edge>, TokenError> {
        let ix = self.ix(id)?;
        let degree = self.node(ix).degree();
        if degree > 0 && !force {
            return Err(TokenError::ReferencedToken {
                id: id.clone(),
                edge_count: degree,
            });
        }

        let removed_keys: Vec<EdgeKey> = self
            .edges
            .keys()
            .filter(|(from, to, _)| from == id || to == id)
            .cloned()
            .collect();

        let node = self.slots[ix].take().ok_or_else(|| TokenError::UnknownToken(id.clone()))?;
        self.index.remove(id);

        if let Some(target) = node.alias_target {
            self.node_mut(target).aliased_by.remove(&ix);
        }
        for source in &node.aliased_by {
            self.node_mut(*source).alias_target = None;
        }
        for (target, kind) in &node.structural_out {
            self.node_mut(*target).structural_in.remove(&(ix, *kind));
        }
        for (source, kind) in &node.structural_in {
            self.node_mut(*source).structural_out.remove(&(ix, *kind));
        }

        let removed: Vec<Edge> = removed_keys
            .iter()
            .filter_map(|key| self.edges.remove(key))
            .collect();
        if !removed.is_empty() {
            tracing::debug!(token = %id, edges = removed.len(), "cascaded edge removal");
        }
        Ok(removed)
    }

    /// Follow Alias edges from `id` to the terminal token.
    ///
    /// Terminates within |V| hops; exceeding that reports `CycleDetected`.
    pub fn resolve_alias(&self, id: &TokenId) -> Result<TokenId, TokenError> {
        self.alias_chain(id)
            .map(|chain| chain.last().cloned().unwrap_or_else(|| id.clone()))
    }

    /// The alias chain starting at `id`, inclusive of both ends.
    pub fn alias_chain(&self, id: &TokenId) -> Result<Vec<TokenId>, TokenError> {
        let mut current = self.ix(id)?;
        let mut chain = vec![id.clone()];
        let mut hops = 0;
        while let Some(next) = self.node(current).alias_target {
            hops += 1;
            if hops > self.node_count() {
                return Err(TokenError::CycleDetected {
                    from: id.clone(),
                    to: self.node(next).id.clone(),
                });
            }
            chain.push(self.node(next).id.clone());
            current = next;
        }
        Ok(chain)
    }

    /// Direct outgoing Dependency/Composition edges, in canonical order.
    pub fn dependencies_of(&self, id: &TokenId) -> Result<Vec<&Edge>, TokenError> {
        let ix = self.ix(id)?;
        let mut out: Vec<&Edge> = self
            .node(ix)
            .structural_out
            .iter()
            .filter_map(|(to, kind)| self.edge_between(ix, *to, *kind))
            .collect();
        out.sort();
        Ok(out)
    }

    /// Direct incoming Dependency/Composition edges, in canonical order.
    pub fn dependents_of(&self, id: &TokenId) -> Result<Vec<&Edge>, TokenError> {
        let ix = self.ix(id)?;
        let mut incoming: Vec<&Edge> = self
            .node(ix)
            .structural_in
            .iter()
            .filter_map(|(from, kind)| self.edge_between(*from, ix, *kind))
            .collect();
        incoming.sort();
        Ok(incoming)
    }

    /// Tokens whose Alias edge targets `id`, ordered by id.
    pub fn aliases_of(&self, id: &TokenId) -> Result<Vec<TokenId>, TokenError> {
        let ix = self.ix(id)?;
        let mut ids: Vec<TokenId> = self
            .node(ix)
            .aliased_by
            .iter()
            .map(|source| self.node(*source).id.clone())
            .collect();
        ids.sort();
        Ok(ids)
    }

    /// Tokens with no outgoing Dependency/Composition edges, ordered by id.
    pub fn root_tokens(&self) -> Vec<TokenId> {
        self.live_nodes()
            .filter(|node| node.structural_out.is_empty())
            .map(|node| node.id.clone())
            .collect()
    }

    /// Tokens with no incoming Dependency/Composition edges, ordered by id.
    pub fn leaf_tokens(&self) -> Vec<TokenId> {
        self.live_nodes()
            .filter(|node| node.structural_in.is_empty())
            .map(|node| node.id.clone())
            .collect()
    }

    /// Order in which every token appears after all of its structural
    /// dependencies, ties broken by id. `None` if the Dependency/Composition
    /// subgraph contains a cycle.
    pub fn structural_order(&self) -> Option<Vec<TokenId>> {
        let mut pending: BTreeMap<&TokenId, usize> = self
            .live_nodes()
            .map(|node| {
                let targets: BTreeSet<NodeIx> = node.structural_out.iter().map(|(to, _)| *to).collect();
                (&node.id, targets.len())
            })
            .collect();

        let mut ready: BTreeSet<&TokenId> = pending
            .iter()
            .filter(|(_, n)| **n == 0)
            .map(|(id, _)| *id)
            .collect();
        let mut order = Vec::with_capacity(pending.len());

        while let Some(id) = ready.pop_first() {
            order.push(id.clone());
            let ix = self.index[id];
            let dependents: BTreeSet<NodeIx> =
                self.node(ix).structural_in.iter().map(|(from, _)| *from).collect();
            for dependent in dependents {
                let dependent_id = &self.node(dependent).id;
                if let Some(n) = pending.get_mut(dependent_id) {
                    *n -= 1;
                    if *n == 0 {
                        ready.insert(dependent_id);
                    }
                }
            }
        }

        (order.len() == self.node_count()).then_some(order)
    }

    /// Whether an Alias path leads from `start` to `goal`.
    fn alias_path_exists(&self, start: NodeIx, goal: NodeIx) -> Result<bool, TokenError> {
        let mut queue = VecDeque::from([start]);
        let mut steps = 0;
        while let Some(current) = queue.pop_front() {
            if current == goal {
                return Ok(true);
            }
            steps += 1;
            if steps > self.node_count() {
                return Err(TokenError::invariant("alias subgraph contains a cycle"));
            }
            queue.extend(self.node(current).alias_target);
        }
        Ok(false)
    }

    fn ix(&self, id: &TokenId) -> Result<NodeIx, TokenError> {
        self.index
            .get(id)
            .copied()
            .ok_or_else(|| TokenError::UnknownToken(id.clone()))
    }

    fn node(&self, ix: NodeIx) -> &Node {
        self.slots[ix]
            .as_ref()
            .expect("adjacency only references live nodes")
    }

    fn node_mut(&mut self, ix: NodeIx) -> &mut Node {
        self.slots[ix]
            .as_mut()
            .expect("adjacency only references live nodes")
    }

    fn live_nodes(&self) -> impl Iterator<Item = &Node> {
        self.index.values().map(|ix| self.node(*ix))
    }

    fn edge_between(&self, from: NodeIx, to: NodeIx, kind: EdgeKind) -> Option<&Edge> {
        let key = (self.node(from).id.clone(), self.node(to).id.clone(), kind);
        self.edges.get(&key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> TokenId {
        TokenId::new(s).unwrap()
    }

    fn graph_with(ids: &[&str]) -> ReferenceGraph {
        let mut graph = ReferenceGraph::new();
        for s in ids {
            graph.add_node(id(s)).unwrap();
        }
        graph
    }

    #[test]
    fn test_add_edge_unknown_endpoint() {
        let mut graph = graph_with(&["a"]);
        let err = graph.add_edge(Edge::alias(id("a"), id("b"))).unwrap_err();
        assert_eq!(err, TokenError::UnknownToken(id("b")));
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn test_alias_chain_resolution() {
        let mut graph = graph_with(&["a", "b", "c"]);
        graph.add_edge(Edge::alias(id("a"), id("b"))).unwrap();
        graph.add_edge(Edge::alias(id("b"), id("c"))).unwrap();

        assert_eq!(graph.resolve_alias(&id("a")).unwrap(), id("c"));
        assert_eq!(graph.resolve_alias(&id("c")).unwrap(), id("c"));
        assert_eq!(graph.alias_chain(&id("a")).unwrap(), vec![id("a"), id("b"), id("c")]);
        assert_eq!(graph.aliases_of(&id("c")).unwrap(), vec![id("b")]);
    }

    #[test]
    fn test_alias_cycle_rejected() {
        let mut graph = graph_with(&["a", "b", "c"]);
        graph.add_edge(Edge::alias(id("a"), id("b"))).unwrap();
        graph.add_edge(Edge::alias(id("b"), id("c"))).unwrap();

        let err = graph.add_edge(Edge::alias(id("c"), id("a"))).unwrap_err();
        assert!(matches!(err, TokenError::CycleDetected { .. }));
        assert_eq!(graph.edge_count(), 2);
        assert!(graph.aliases_of(&id("a")).unwrap().is_empty());
    }

    #[test]
    fn test_self_edge_rejected() {
        let mut graph = graph_with(&["a"]);
        for kind in [EdgeKind::Alias, EdgeKind::Dependency, EdgeKind::Composition] {
            let err = graph.add_edge(Edge::new(id("a"), id("a"), kind)).unwrap_err();
            assert!(matches!(err, TokenError::CycleDetected { .. }));
        }
    }

    #[test]
    fn test_second_alias_conflicts() {
        let mut graph = graph_with(&["a", "b", "c"]);
        graph.add_edge(Edge::alias(id("a"), id("b"))).unwrap();
        let err = graph.add_edge(Edge::alias(id("a"), id("c"))).unwrap_err();
        assert_eq!(err, TokenError::AliasConflict { from: id("a"), existing: id("b") });
    }

    #[test]
    fn test_duplicate_edge_rejected() {
        let mut graph = graph_with(&["a", "b"]);
        graph.add_edge(Edge::new(id("a"), id("b"), EdgeKind::Dependency)).unwrap();
        let err = graph
            .add_edge(Edge::new(id("a"), id("b"), EdgeKind::Dependency).with_metadata("k", "v"))
            .unwrap_err();
        assert!(matches!(err, TokenError::DuplicateEdge { .. }));
        // A different kind between the same pair is a distinct edge.
        graph.add_edge(Edge::new(id("a"), id("b"), EdgeKind::Composition)).unwrap();
        assert_eq!(graph.edge_count(), 2);
    }

    #[test]
    fn test_dependency_queries() {
        //   type ──composition──> family
        //     └───composition──> ink
        //   shadow ──dependency──> ink
        let mut graph = graph_with(&["family", "ink", "shadow", "type"]);
        graph.add_edge(Edge::new(id("type"), id("family"), EdgeKind::Composition)).unwrap();
        graph.add_edge(Edge::new(id("type"), id("ink"), EdgeKind::Composition)).unwrap();
        graph.add_edge(Edge::new(id("shadow"), id("ink"), EdgeKind::Dependency)).unwrap();

        let deps: Vec<_> = graph.dependencies_of(&id("type")).unwrap().iter().map(|e| e.to.clone()).collect();
        assert_eq!(deps, vec![id("family"), id("ink")]);

        let dependents: Vec<_> = graph.dependents_of(&id("ink")).unwrap().iter().map(|e| e.from.clone()).collect();
        assert_eq!(dependents, vec![id("shadow"), id("type")]);

        assert_eq!(graph.root_tokens(), vec![id("family"), id("ink")]);
        assert_eq!(graph.leaf_tokens(), vec![id("shadow"), id("type")]);
    }

    #[test]
    fn test_aliases_do_not_count_as_structure() {
        let mut graph = graph_with(&["a", "b"]);
        graph.add_edge(Edge::alias(id("a"), id("b"))).unwrap();
        assert_eq!(graph.root_tokens(), vec![id("a"), id("b")]);
        assert_eq!(graph.leaf_tokens(), vec![id("a"), id("b")]);
    }

    #[test]
    fn test_remove_node_requires_force() {
        let mut graph = graph_with(&["a", "b", "c"]);
        graph.add_edge(Edge::alias(id("a"), id("b"))).unwrap();
        graph.add_edge(Edge::new(id("c"), id("b"), EdgeKind::Dependency)).unwrap();

        let err = graph.remove_node(&id("b"), false).unwrap_err();
        assert_eq!(err, TokenError::ReferencedToken { id: id("b"), edge_count: 2 });
        assert_eq!(graph.edge_count(), 2);

        let removed = graph.remove_node(&id("b"), true).unwrap();
        assert_eq!(removed.len(), 2);
        assert_eq!(graph.edge_count(), 0);
        assert!(!graph.contains(&id("b")));
        assert_eq!(graph.resolve_alias(&id("a")).unwrap(), id("a"));
        assert!(graph.dependencies_of(&id("c")).unwrap().is_empty());
    }

    #[test]
    fn test_remove_unreferenced_node() {
        let mut graph = graph_with(&["a"]);
        assert!(graph.remove_node(&id("a"), false).unwrap().is_empty());
        assert_eq!(graph.node_count(), 0);
    }

    #[test]
    fn test_structural_order() {
        let mut graph = graph_with(&["a", "b", "c"]);
        graph.add_edge(Edge::new(id("a"), id("c"), EdgeKind::Composition)).unwrap();
        graph.add_edge(Edge::new(id("c"), id("b"), EdgeKind::Dependency)).unwrap();
        assert_eq!(graph.structural_order().unwrap(), vec![id("b"), id("c"), id("a")]);

        graph.add_edge(Edge::new(id("b"), id("a"), EdgeKind::Dependency)).unwrap();
        assert!(graph.structural_order().is_none());
    }
}
