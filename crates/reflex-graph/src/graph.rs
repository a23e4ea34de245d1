//! Dataflow multigraph of operation and value nodes.

use std::fmt;

use petgraph::Direction;
use petgraph::algo::has_path_connecting;
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::visit::{EdgeRef, IntoEdgeReferences};
use reflex_ir::{Opcode, VarnodeId};
use rustc_hash::FxHashMap;

use crate::attrs::{AttrKind, Attributes};

/// Node identity.
///
/// Operations are numbered in listing order; values keep the decompiler's
/// varnode identity. The two never share an id space.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeId {
    Op(u32),
    Value(VarnodeId),
}

impl NodeId {
    pub const fn is_op(self) -> bool {
        matches!(self, Self::Op(_))
    }

    pub const fn is_value(self) -> bool {
        matches!(self, Self::Value(_))
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Op(n) => write!(f, "op{n}"),
            Self::Value(id) => write!(f, "vn{id}"),
        }
    }
}

/// Graph node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Node {
    pub id: NodeId,
    pub attrs: Attributes,
}

impl Node {
    pub fn new(id: NodeId) -> Self {
        Self {
            id,
            attrs: Attributes::new(),
        }
    }

    /// Opcode of an operation node.
    pub fn opcode(&self) -> Option<Opcode> {
        if !self.id.is_op() {
            return None;
        }
        let code = self.attrs.get_int(AttrKind::Op)?;
        u32::try_from(code).ok().and_then(Opcode::from_code)
    }
}

/// Graph edge. Each edge owns its attributes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Edge {
    pub attrs: Attributes,
}

impl Edge {
    /// Edge at argument position `order` (0 for output edges).
    pub fn new(order: u32) -> Self {
        let mut attrs = Attributes::new();
        attrs.set(AttrKind::Order, order);
        Self { attrs }
    }

    pub fn order(&self) -> u64 {
        self.attrs.get_int(AttrKind::Order).unwrap_or(0)
    }
}

/// Directed multigraph; parallel edges differ by order.
#[derive(Clone, Debug, Default)]
pub struct DataflowGraph {
    graph: StableDiGraph<Node, Edge>,
    index: FxHashMap<NodeId, NodeIndex>,
}

impl DataflowGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a node, or return the existing one with the same id.
    pub fn add_node(&mut self, node: Node) -> NodeIndex {
        if let Some(&idx) = self.index.get(&node.id) {
            return idx;
        }
        let id = node.id;
        let idx = self.graph.add_node(node);
        self.index.insert(id, idx);
        idx
    }

    /// Fetch the node for `id`, creating an empty one first if needed.
    pub fn get_or_insert(&mut self, id: NodeId) -> &mut Node {
        let idx = self.add_node(Node::new(id));
        &mut self.graph[idx]
    }

    /// Add an edge between two existing nodes.
    ///
    /// Returns `false` if either endpoint is missing.
    pub fn add_edge(&mut self, from: NodeId, to: NodeId, edge: Edge) -> bool {
        match (self.index.get(&from), self.index.get(&to)) {
            (Some(&a), Some(&b)) => {
                self.graph.add_edge(a, b, edge);
                true
            }
            _ => false,
        }
    }

    /// Remove a node and every edge touching it.
    pub fn remove_node(&mut self, id: NodeId) -> Option<Node> {
        let idx = self.index.remove(&id)?;
        self.graph.remove_node(idx)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.index.contains_key(&id)
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.index.get(&id).map(|&idx| &self.graph[idx])
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        let idx = *self.index.get(&id)?;
        self.graph.node_weight_mut(idx)
    }

    /// Nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> + '_ {
        self.graph.node_indices().map(|idx| &self.graph[idx])
    }

    pub fn op_nodes(&self) -> impl Iterator<Item = &Node> + '_ {
        self.nodes().filter(|n| n.id.is_op())
    }

    pub fn value_nodes(&self) -> impl Iterator<Item = &Node> + '_ {
        self.nodes().filter(|n| n.id.is_value())
    }

    /// Edges as `(source, target, edge)` in insertion order.
    pub fn edges(&self) -> impl Iterator<Item = (NodeId, NodeId, &Edge)> + '_ {
        self.graph.edge_references().map(|e| {
            (
                self.graph[e.source()].id,
                self.graph[e.target()].id,
                e.weight(),
            )
        })
    }

    /// Outgoing edges of `id` as `(target, edge)`.
    pub fn out_edges(&self, id: NodeId) -> Vec<(NodeId, &Edge)> {
        self.neighbor_edges(id, Direction::Outgoing)
    }

    /// Incoming edges of `id` as `(source, edge)`.
    pub fn in_edges(&self, id: NodeId) -> Vec<(NodeId, &Edge)> {
        self.neighbor_edges(id, Direction::Incoming)
    }

    fn neighbor_edges(&self, id: NodeId, dir: Direction) -> Vec<(NodeId, &Edge)> {
        let Some(&idx) = self.index.get(&id) else {
            return Vec::new();
        };
        let mut edges: Vec<_> = self
            .graph
            .edges_directed(idx, dir)
            .map(|e| {
                let other = match dir {
                    Direction::Outgoing => e.target(),
                    Direction::Incoming => e.source(),
                };
                (e.id(), self.graph[other].id, e.weight())
            })
            .collect();
        // petgraph walks adjacency lists newest first.
        edges.sort_by_key(|(edge_id, _, _)| *edge_id);
        edges.into_iter().map(|(_, other, edge)| (other, edge)).collect()
    }

    pub fn in_degree(&self, id: NodeId) -> usize {
        self.degree(id, Direction::Incoming)
    }

    pub fn out_degree(&self, id: NodeId) -> usize {
        self.degree(id, Direction::Outgoing)
    }

    fn degree(&self, id: NodeId, dir: Direction) -> usize {
        self.index
            .get(&id)
            .map_or(0, |&idx| self.graph.edges_directed(idx, dir).count())
    }

    /// Check for an edge `from -> to`.
    pub fn has_edge(&self, from: NodeId, to: NodeId) -> bool {
        match (self.index.get(&from), self.index.get(&to)) {
            (Some(&a), Some(&b)) => self.graph.contains_edge(a, b),
            _ => false,
        }
    }

    /// Check for a directed path `from -> ... -> to`.
    pub fn has_path(&self, from: NodeId, to: NodeId) -> bool {
        match (self.index.get(&from), self.index.get(&to)) {
            (Some(&a), Some(&b)) => has_path_connecting(&self.graph, a, b, None),
            _ => false,
        }
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn op_count(&self) -> usize {
        self.op_nodes().count()
    }

    pub fn value_count(&self) -> usize {
        self.value_nodes().count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn value(id: u32) -> NodeId {
        NodeId::Value(VarnodeId(id))
    }

    #[test]
    fn test_op_and_value_ids_are_disjoint() {
        let mut graph = DataflowGraph::new();
        graph.add_node(Node::new(NodeId::Op(1)));
        graph.add_node(Node::new(value(1)));
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.op_count(), 1);
        assert_eq!(graph.value_count(), 1);
    }

    #[test]
    fn test_add_node_deduplicates() {
        let mut graph = DataflowGraph::new();
        let a = graph.add_node(Node::new(value(7)));
        let b = graph.add_node(Node::new(value(7)));
        assert_eq!(a, b);
        assert_eq!(graph.node_count(), 1);
    }

    #[test]
    fn test_parallel_edges() {
        let mut graph = DataflowGraph::new();
        graph.add_node(Node::new(value(1)));
        graph.add_node(Node::new(NodeId::Op(0)));
        assert!(graph.add_edge(value(1), NodeId::Op(0), Edge::new(0)));
        assert!(graph.add_edge(value(1), NodeId::Op(0), Edge::new(1)));
        assert_eq!(graph.out_degree(value(1)), 2);
        let orders: Vec<u64> = graph.in_edges(NodeId::Op(0)).iter().map(|(_, e)| e.order()).collect();
        assert_eq!(orders, vec![0, 1]);
    }

    #[test]
    fn test_remove_node_drops_edges() {
        let mut graph = DataflowGraph::new();
        graph.add_node(Node::new(value(1)));
        graph.add_node(Node::new(NodeId::Op(0)));
        graph.add_edge(value(1), NodeId::Op(0), Edge::new(0));
        graph.remove_node(NodeId::Op(0));
        assert_eq!(graph.edge_count(), 0);
        assert!(!graph.contains(NodeId::Op(0)));
        assert!(!graph.add_edge(value(1), NodeId::Op(0), Edge::new(0)));
    }
}
