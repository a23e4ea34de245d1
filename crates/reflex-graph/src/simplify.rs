//! Graph simplification.
//!
//! Value nodes that only forward one producer's result are folded into the
//! edges between operations; optionally, COPY operations are bypassed and
//! INDIRECT operations dropped. The input graph is never modified: all
//! rewriting happens on a fresh graph, and new edges are computed before any
//! are inserted.

use tracing::debug;

use crate::attrs::AttrKind;
use crate::graph::{DataflowGraph, Edge, Node, NodeId};

/// Counters describing one simplification run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SimplifyStats {
    pub interior_values: usize,
    pub isolated_values: usize,
    pub copies: usize,
    pub indirects: usize,
}

impl DataflowGraph {
    /// Check that every value node has at most one defining operation.
    pub fn has_single_definitions(&self) -> bool {
        self.value_nodes().all(|node| self.in_degree(node.id) <= 1)
    }

    /// Simplify the graph.
    ///
    /// Returns `None` if some value has more than one producer.
    pub fn simplify(&self, remove_copies: bool, remove_indirects: bool) -> Option<Self> {
        self.simplify_with_stats(remove_copies, remove_indirects)
            .map(|(graph, _)| graph)
    }

    /// [`DataflowGraph::simplify`] that also reports what was removed.
    pub fn simplify_with_stats(
        &self,
        remove_copies: bool,
        remove_indirects: bool,
    ) -> Option<(Self, SimplifyStats)> {
        if let Some(node) = self.value_nodes().find(|node| self.in_degree(node.id) > 1) {
            debug!(
                value = %node.id,
                producers = self.in_degree(node.id),
                "value has several producers, not simplifying"
            );
            return None;
        }

        let mut stats = SimplifyStats::default();
        let mut out = self.collapse_values(&mut stats);
        if remove_copies {
            stats.copies = out.elide_copies();
        }
        if remove_indirects {
            stats.indirects = out.elide_indirects();
        }

        debug!(
            nodes = out.node_count(),
            edges = out.edge_count(),
            interior = stats.interior_values,
            isolated = stats.isolated_values,
            copies = stats.copies,
            indirects = stats.indirects,
            "simplified graph"
        );
        Some((out, stats))
    }

    /// Drop interior and isolated values, splicing producers to consumers.
    fn collapse_values(&self, stats: &mut SimplifyStats) -> Self {
        let mut out = Self::new();

        for node in self.nodes() {
            if node.id.is_op() {
                out.add_node(node.clone());
                continue;
            }
            let has_in = self.in_degree(node.id) > 0;
            let has_out = self.out_degree(node.id) > 0;
            match (has_in, has_out) {
                (true, true) => stats.interior_values += 1,
                (false, false) => stats.isolated_values += 1,
                _ => {
                    let mut kept = node.clone();
                    kept.attrs.set(AttrKind::IsSource, has_out);
                    kept.attrs.set(AttrKind::IsSink, has_in);
                    out.add_node(kept);
                }
            }
        }

        let mut new_edges: Vec<(NodeId, NodeId, Edge)> = Vec::new();
        for (from, to, edge) in self.edges() {
            if from.is_value() {
                // Reads of a kept source value stay; reads of interior values
                // are rebuilt from the producer side below.
                if out.contains(from) {
                    new_edges.push((from, to, edge.clone()));
                }
                continue;
            }

            let consumers = self.out_edges(to);
            if to.is_op() || consumers.is_empty() {
                new_edges.push((from, to, edge.clone()));
                continue;
            }
            let Some(value) = self.node(to) else {
                continue;
            };
            for (consumer, next) in consumers {
                let mut spliced = next.clone();
                spliced.attrs.overwrite_from(&value.attrs);
                new_edges.push((from, consumer, spliced));
            }
        }

        for (from, to, edge) in new_edges {
            out.add_edge(from, to, edge);
        }
        out
    }

    /// Bypass COPY operations one at a time, so chains of copies resolve.
    fn elide_copies(&mut self) -> usize {
        let copies: Vec<NodeId> = self
            .op_nodes()
            .filter(|node| node.opcode().is_some_and(|op| op.is_copy()))
            .map(|node| node.id)
            .collect();

        for &copy in &copies {
            let producers: Vec<NodeId> = self
                .in_edges(copy)
                .into_iter()
                .map(|(from, _)| from)
                .filter(|&from| from != copy)
                .collect();
            let consumers: Vec<(NodeId, Edge)> = self
                .out_edges(copy)
                .into_iter()
                .filter(|&(to, _)| to != copy)
                .map(|(to, edge)| (to, edge.clone()))
                .collect();

            for &from in &producers {
                for (to, edge) in &consumers {
                    self.add_edge(from, *to, edge.clone());
                }
            }
            self.remove_node(copy);
        }
        copies.len()
    }

    /// Drop INDIRECT operations with all their edges.
    fn elide_indirects(&mut self) -> usize {
        let indirects: Vec<NodeId> = self
            .op_nodes()
            .filter(|node| node.opcode().is_some_and(|op| op.is_indirect()))
            .map(|node| node.id)
            .collect();
        for &id in &indirects {
            self.remove_node(id);
        }
        indirects.len()
    }
}

/// Check whether a kept value node is a source (read, never defined here).
pub fn is_source(node: &Node) -> bool {
    node.attrs.is_set(AttrKind::IsSource)
}

/// Check whether a kept value node is a sink (defined, never read).
pub fn is_sink(node: &Node) -> bool {
    node.attrs.is_set(AttrKind::IsSink)
}
