//! The topologically-ordered dependency DAG.
//!
//! Node ids are assigned densely starting at zero, in the order nodes are
//! added, and the only structural invariant the container enforces is that
//! every predecessor id of a node is strictly less than the node's own id.
//! That single rule makes the graph acyclic and already topologically
//! sorted by construction: there is no separate sort step anywhere in this
//! crate.

#![forbid(unsafe_code)]

use crate::error::DagError;
use crate::util::FlatMultivec;

/// A dense node identifier, strictly greater than every id it depends on.
#[repr(transparent)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u32);

impl NodeId {
    /// Wraps a raw index. Exposed for callers that need to reconstruct a
    /// `NodeId` from a stored `u32` (e.g. deserialized configuration).
    #[inline]
    pub const fn new(raw: u32) -> Self {
        NodeId(raw)
    }

    /// The id's raw index, for use as a slice/array index.
    #[inline]
    pub const fn as_usize(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<usize> for NodeId {
    fn from(raw: usize) -> Self {
        NodeId(raw as u32)
    }
}

/// Aggregate counts over the current graph, for diagnostics.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DagStats {
    /// Number of nodes.
    pub nodes: usize,
    /// Number of predecessor edges.
    pub edges: usize,
    /// Largest in-degree (predecessor count) of any node.
    pub max_degree: usize,
    /// Average in-degree across all nodes.
    pub avg_degree: f64,
    /// Nodes with zero predecessors.
    pub roots: usize,
    /// Nodes that are not a predecessor of any other node.
    pub leaves: usize,
}

/// An append-only directed acyclic dependency graph with a built-in
/// topological order: node `i`'s predecessors are always a subset of
/// `0..i`.
#[derive(Debug, Default, Clone)]
pub struct Dag {
    predecessors: FlatMultivec<NodeId>,
}

impl Dag {
    /// An empty DAG.
    pub fn new() -> Self {
        Self {
            predecessors: FlatMultivec::new(),
        }
    }

    /// Reserve capacity for `node_cap` nodes and `edge_cap` total predecessor
    /// edges.
    pub fn reserve(&mut self, node_cap: usize, edge_cap: usize) {
        self.predecessors.reserve(node_cap, edge_cap);
    }

    /// Number of nodes currently in the graph.
    #[inline]
    pub fn len(&self) -> usize {
        self.predecessors.num_rows()
    }

    /// Whether the graph has no nodes.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Checks whether `preds` would be valid predecessors for the *next*
    /// node to be added, without mutating the graph.
    pub fn validate(&self, preds: &[NodeId]) -> bool {
        let next_id = self.len();
        preds.iter().all(|p| p.as_usize() < next_id)
    }

    /// Appends a new node with the given predecessors, returning its id.
    ///
    /// Fails, leaving the graph unchanged, if any predecessor id is not
    /// strictly less than the id the new node would receive.
    pub fn add(&mut self, preds: &[NodeId]) -> Result<NodeId, DagError> {
        let next_id = self.len();
        for &p in preds {
            if p.as_usize() >= next_id {
                return Err(DagError::InvalidDependency {
                    bad: p,
                    next_id: NodeId::from(next_id),
                });
            }
        }
        self.predecessors.push_row(preds.iter().copied());
        Ok(NodeId::from(next_id))
    }

    /// Borrows the predecessor list of `id`.
    pub fn predecessors(&self, id: NodeId) -> &[NodeId] {
        debug_assert!(id.as_usize() < self.len(), "node id out of range");
        self.predecessors.row(id.as_usize())
    }

    /// Computes the list of nodes that directly depend on `id`.
    ///
    /// This is an O(E) scan; it is meant for build-time/diagnostic use, not
    /// the per-step hot path.
    pub fn successors(&self, id: NodeId) -> Vec<NodeId> {
        (0..self.len())
            .filter(|&i| self.predecessors.row(i).contains(&id))
            .map(NodeId::from)
            .collect()
    }

    /// Whether `id` has no predecessors.
    pub fn is_root(&self, id: NodeId) -> bool {
        self.predecessors(id).is_empty()
    }

    /// All nodes with no predecessors.
    pub fn roots(&self) -> Vec<NodeId> {
        (0..self.len())
            .filter(|&i| self.predecessors.row(i).is_empty())
            .map(NodeId::from)
            .collect()
    }

    /// All nodes that are not a predecessor of any other node.
    pub fn leaves(&self) -> Vec<NodeId> {
        let mut has_successor = vec![false; self.len()];
        for i in 0..self.len() {
            for &p in self.predecessors.row(i) {
                has_successor[p.as_usize()] = true;
            }
        }
        (0..self.len())
            .filter(|&i| !has_successor[i])
            .map(NodeId::from)
            .collect()
    }

    /// Whether `a` transitively depends on `b` (i.e. `b` is reachable from
    /// `a` by following predecessor edges).
    pub fn depends_on(&self, a: NodeId, b: NodeId) -> bool {
        if a == b {
            return false;
        }
        let mut visited = vec![false; self.len()];
        let mut stack = vec![a];
        while let Some(n) = stack.pop() {
            if visited[n.as_usize()] {
                continue;
            }
            visited[n.as_usize()] = true;
            for &p in self.predecessors(n) {
                if p == b {
                    return true;
                }
                if !visited[p.as_usize()] {
                    stack.push(p);
                }
            }
        }
        false
    }

    /// Drops all nodes and edges.
    pub fn clear(&mut self) {
        self.predecessors.clear();
    }

    /// Aggregate counts over the graph.
    pub fn statistics(&self) -> DagStats {
        let nodes = self.len();
        let mut edges = 0usize;
        let mut max_degree = 0usize;
        for i in 0..nodes {
            let deg = self.predecessors.row(i).len();
            edges += deg;
            max_degree = max_degree.max(deg);
        }
        let avg_degree = if nodes == 0 {
            0.0
        } else {
            edges as f64 / nodes as f64
        };
        DagStats {
            nodes,
            edges,
            max_degree,
            avg_degree,
            roots: self.roots().len(),
            leaves: self.leaves().len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn n(i: usize) -> NodeId {
        NodeId::from(i)
    }

    #[test]
    fn diamond_depends_on_and_roots_leaves() {
        let mut dag = Dag::new();
        let root = dag.add(&[]).unwrap();
        let left = dag.add(&[root]).unwrap();
        let right = dag.add(&[root]).unwrap();
        let sink = dag.add(&[left, right]).unwrap();

        assert!(dag.depends_on(sink, root));
        assert!(!dag.depends_on(root, sink));
        assert_eq!(dag.roots(), vec![root]);
        assert_eq!(dag.leaves(), vec![sink]);
        assert_eq!(dag.predecessors(sink), &[left, right]);
    }

    #[test]
    fn add_rejects_forward_or_self_reference() {
        let mut dag = Dag::new();
        dag.add(&[]).unwrap();
        let err = dag.add(&[n(5)]).unwrap_err();
        assert_eq!(
            err,
            DagError::InvalidDependency {
                bad: n(5),
                next_id: n(1)
            }
        );
        // graph is unchanged after a rejected add
        assert_eq!(dag.len(), 1);
    }

    #[test]
    fn validate_matches_add_without_mutating() {
        let mut dag = Dag::new();
        dag.add(&[]).unwrap();
        assert!(dag.validate(&[n(0)]));
        assert!(!dag.validate(&[n(1)]));
        assert_eq!(dag.len(), 1);
    }

    #[test]
    fn statistics_on_diamond() {
        let mut dag = Dag::new();
        let root = dag.add(&[]).unwrap();
        let left = dag.add(&[root]).unwrap();
        let right = dag.add(&[root]).unwrap();
        dag.add(&[left, right]).unwrap();

        let stats = dag.statistics();
        assert_eq!(stats.nodes, 4);
        assert_eq!(stats.edges, 4);
        assert_eq!(stats.max_degree, 2);
        assert_eq!(stats.roots, 1);
        assert_eq!(stats.leaves, 1);
    }
}
