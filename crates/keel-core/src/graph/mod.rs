//! Directed content graph.
//!
//! The graph owns its nodes and two adjacency indexes:
//! - `from`: origin id -> destination id -> edge
//! - `to`: destination id -> origin id -> edge (the mirror)
//!
//! The two indexes are kept in lock-step on every mutation. Graphs are
//! write-once structures for a single assembly session: populated via
//! `add_node` / `add_edge`, then read-only for queries. There is no deletion
//! API and no internal synchronization; construction is single-writer,
//! queries after construction are safe from any number of readers.
//!
//! Root computation tolerates cycles: a node inside a cycle never has zero
//! in-degree, so a unique zero-in-degree node elsewhere still wins even if
//! parts of the graph are unreachable from it. Keep it that way.

use std::collections::BTreeMap;

mod node;

pub use node::{ArtifactNode, BuildNode, Node, NodeVisitor};

use crate::errors::{CoreError, CoreResult};

/// A directed edge between two node ids.
///
/// Edges carry no independent identity; the `(from, to)` pair is the key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    pub from: String,
    pub to: String,
}

/// A directed content graph over artifact and build nodes.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    nodes: BTreeMap<String, Node>,
    from: BTreeMap<String, BTreeMap<String, Edge>>,
    to: BTreeMap<String, BTreeMap<String, Edge>>,
}

impl Graph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of edges (counted once, via the forward index).
    pub fn edge_count(&self) -> usize {
        self.from.values().map(|m| m.len()).sum()
    }

    /// Insert a node. Fails with `NodeCollision` if the id is taken; the
    /// graph is left untouched on failure.
    pub fn add_node(&mut self, node: impl Into<Node>) -> CoreResult<()> {
        let node = node.into();
        let id = node.id().to_string();
        if self.nodes.contains_key(&id) {
            return Err(CoreError::NodeCollision { id });
        }
        self.nodes.insert(id, node);
        Ok(())
    }

    /// Insert a directed edge between two existing nodes.
    ///
    /// Fails with `SelfEdge` when `from == to` and with `DanglingEdge` when
    /// either endpoint is absent. Re-adding an edge already present in both
    /// indexes is a silent no-op.
    pub fn add_edge(&mut self, from: &str, to: &str) -> CoreResult<()> {
        if from == to {
            return Err(CoreError::SelfEdge {
                id: from.to_string(),
            });
        }
        if !self.nodes.contains_key(from) {
            return Err(CoreError::DanglingEdge {
                id: from.to_string(),
            });
        }
        if !self.nodes.contains_key(to) {
            return Err(CoreError::DanglingEdge { id: to.to_string() });
        }

        if self.connected_to(from, to) && self.connected_from(to, from) {
            return Ok(());
        }

        let edge = Edge {
            from: from.to_string(),
            to: to.to_string(),
        };
        self.from
            .entry(from.to_string())
            .or_default()
            .insert(to.to_string(), edge.clone());
        self.to
            .entry(to.to_string())
            .or_default()
            .insert(from.to_string(), edge);
        Ok(())
    }

    /// Look up a node by id. Absence is not an error.
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Look up the edge keyed by the forward index. Absence is not an error.
    pub fn edge(&self, from: &str, to: &str) -> Option<&Edge> {
        self.from.get(from).and_then(|m| m.get(to))
    }

    /// Whether `to` points at `from`; consults the reverse index.
    ///
    /// Note the asymmetry: this predicate (and its sibling) query the
    /// opposite index from what the name's primary direction suggests. The
    /// pair composes in `add_edge` to detect a fully mirrored edge.
    pub fn connected_from(&self, from: &str, to: &str) -> bool {
        self.to.get(from).is_some_and(|m| m.contains_key(to))
    }

    /// Whether `from` points at `to`; consults the forward index.
    pub fn connected_to(&self, from: &str, to: &str) -> bool {
        self.from.get(from).is_some_and(|m| m.contains_key(to))
    }

    /// Nodes reachable over one forward edge from `id`. Order is unspecified;
    /// callers must not depend on it.
    pub fn nodes_from(&self, id: &str) -> Vec<&Node> {
        self.from
            .get(id)
            .map(|m| m.keys().filter_map(|k| self.nodes.get(k)).collect())
            .unwrap_or_default()
    }

    /// Nodes with a forward edge into `id`. Order is unspecified.
    pub fn nodes_to(&self, id: &str) -> Vec<&Node> {
        self.to
            .get(id)
            .map(|m| m.keys().filter_map(|k| self.nodes.get(k)).collect())
            .unwrap_or_default()
    }

    /// Compute the unique root: the single node with zero in-degree.
    ///
    /// In-degree is tallied by scanning every node's outgoing edges. Zero
    /// candidates fails with `NoRoot`; more than one fails with
    /// `MultipleRoots` listing the candidate ids in sorted order.
    pub fn root(&self) -> CoreResult<&Node> {
        let mut in_degree: BTreeMap<&str, usize> = BTreeMap::new();
        for id in self.nodes.keys() {
            in_degree.entry(id.as_str()).or_insert(0);
            if let Some(out) = self.from.get(id) {
                for dest in out.keys() {
                    *in_degree.entry(dest.as_str()).or_insert(0) += 1;
                }
            }
        }

        let candidates: Vec<&str> = in_degree
            .iter()
            .filter(|(_, deg)| **deg == 0)
            .map(|(id, _)| *id)
            .collect();

        match candidates.as_slice() {
            [] => Err(CoreError::NoRoot),
            [id] => self
                .node(id)
                .ok_or_else(|| CoreError::invariant(format!("root id not in node map: {id}"))),
            many => Err(CoreError::MultipleRoots {
                ids: many.iter().map(|s| s.to_string()).collect(),
            }),
        }
    }
}
