//! Graph construction from a p-code listing.

use reflex_ir::{FunctionIr, MemoryMap, PcodeOp, Varnode};
use tracing::{debug, trace};

use crate::extract::{AttributeExtractor, ValueUse};
use crate::graph::{DataflowGraph, Edge, NodeId};

/// Builds the dataflow graph of one function.
///
/// Each operation gets its own node; each tracked varnode gets one node no
/// matter how often it is referenced. Input edges carry the argument
/// position, output edges carry order 0.
pub struct GraphBuilder<'a> {
    extractor: AttributeExtractor<'a>,
    graph: DataflowGraph,
    next_op: u32,
}

impl<'a> GraphBuilder<'a> {
    pub fn new(memory: &'a MemoryMap) -> Self {
        Self {
            extractor: AttributeExtractor::new(memory),
            graph: DataflowGraph::new(),
            next_op: 0,
        }
    }

    /// Add every operation of `func`, in listing order.
    #[must_use]
    pub fn with_function(mut self, func: &FunctionIr) -> Self {
        for op in &func.ops {
            self.add_op(op);
        }
        self
    }

    /// Add one operation and the values it touches.
    pub fn add_op(&mut self, op: &PcodeOp) -> NodeId {
        let op_id = NodeId::Op(self.next_op);
        self.next_op += 1;

        let extractor = self.extractor;
        extractor.extract_op(&mut self.graph.get_or_insert(op_id).attrs, op);

        for (index, input) in op.dataflow_inputs() {
            let Some(value_id) = self.value_node(input) else {
                trace!(op = %op_id, index, "skipping untracked input");
                continue;
            };
            self.graph
                .add_edge(value_id, op_id, Edge::new(index as u32));
        }

        if let Some(output) = &op.output {
            if let Some(value_id) = output.id.map(NodeId::Value) {
                extractor.extract_definition(&mut self.graph.get_or_insert(value_id).attrs, output, op);
                self.graph.add_edge(op_id, value_id, Edge::new(0));
            }
        }

        op_id
    }

    /// Fetch or create the node for a tracked varnode and refresh its attributes.
    fn value_node(&mut self, vn: &Varnode) -> Option<NodeId> {
        let id = NodeId::Value(vn.id?);
        let extractor = self.extractor;
        extractor.extract_value(&mut self.graph.get_or_insert(id).attrs, vn, ValueUse::Input);
        Some(id)
    }

    pub fn finish(self) -> DataflowGraph {
        debug!(
            ops = self.graph.op_count(),
            values = self.graph.value_count(),
            edges = self.graph.edge_count(),
            "built dataflow graph"
        );
        self.graph
    }
}

/// Build the dataflow graph of `func`.
pub fn build_graph(func: &FunctionIr, memory: &MemoryMap) -> DataflowGraph {
    GraphBuilder::new(memory).with_function(func).finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attrs::AttrKind;
    use reflex_ir::{MemoryBlock, Opcode, Space, VarnodeId};

    fn memory() -> MemoryMap {
        MemoryMap::new(64).with_block(MemoryBlock::new(".rodata", 0x601000, 0x602000).backed_by(0x1000))
    }

    fn value(id: u32) -> NodeId {
        NodeId::Value(VarnodeId(id))
    }

    fn reg(id: u32, offset: u64) -> Varnode {
        Varnode::new(id, Space::Register, offset, 8)
    }

    #[test]
    fn test_one_node_per_op_and_per_identity() {
        let func = FunctionIr::new(vec![
            PcodeOp::with_output(Opcode::IntAdd, vec![reg(1, 0), reg(2, 8)], reg(3, 0x10)),
            PcodeOp::with_output(Opcode::IntMult, vec![reg(3, 0x10), reg(3, 0x10)], reg(4, 0x18)),
            PcodeOp::with_output(Opcode::IntSub, vec![reg(4, 0x18), reg(1, 0)], reg(5, 0x20)),
        ]);
        let graph = build_graph(&func, &memory());

        assert_eq!(graph.op_count(), 3);
        assert_eq!(graph.value_count(), 5);
        // INT_MULT reads value 3 twice: two parallel edges.
        let orders: Vec<u64> = graph
            .in_edges(NodeId::Op(1))
            .iter()
            .map(|(from, e)| {
                assert_eq!(*from, value(3));
                e.order()
            })
            .collect();
        assert_eq!(orders, vec![0, 1]);
        assert_eq!(graph.out_edges(NodeId::Op(2)), vec![(value(5), &Edge::new(0))]);
    }

    #[test]
    fn test_load_store_skip_space_selector() {
        let func = FunctionIr::new(vec![
            PcodeOp::with_output(
                Opcode::Load,
                vec![Varnode::constant(1, 0x1b1, 4), Varnode::constant(2, 0x601000, 8)],
                reg(3, 0),
            ),
            PcodeOp::new(
                Opcode::Store,
                vec![Varnode::constant(4, 0x1b1, 4), reg(5, 8), reg(3, 0)],
            ),
        ]);
        let graph = build_graph(&func, &memory());

        assert!(!graph.contains(value(1)));
        assert!(!graph.contains(value(4)));
        let load_inputs: Vec<u64> = graph.in_edges(NodeId::Op(0)).iter().map(|(_, e)| e.order()).collect();
        assert_eq!(load_inputs, vec![1]);
        let store_inputs: Vec<u64> = graph.in_edges(NodeId::Op(1)).iter().map(|(_, e)| e.order()).collect();
        assert_eq!(store_inputs, vec![1, 2]);
    }

    #[test]
    fn test_indirect_skips_effect_operand() {
        let func = FunctionIr::new(vec![PcodeOp::with_output(
            Opcode::Indirect,
            vec![reg(1, 0), Varnode::constant(2, 7, 4)],
            reg(3, 0),
        )]);
        let graph = build_graph(&func, &memory());

        assert!(!graph.contains(value(2)));
        assert_eq!(graph.in_degree(NodeId::Op(0)), 1);
        assert_eq!(graph.out_degree(NodeId::Op(0)), 1);
    }

    #[test]
    fn test_untracked_inputs_are_skipped() {
        let func = FunctionIr::new(vec![PcodeOp::with_output(
            Opcode::IntAdd,
            vec![reg(1, 0), Varnode::raw(Space::Const, 4, 8)],
            reg(2, 0),
        )]);
        let graph = build_graph(&func, &memory());

        assert_eq!(graph.value_count(), 2);
        assert_eq!(graph.in_degree(NodeId::Op(0)), 1);
    }

    #[test]
    fn test_table_flag_on_load_address() {
        let func = FunctionIr::new(vec![PcodeOp::with_output(
            Opcode::Load,
            vec![Varnode::constant(1, 0x1b1, 4), Varnode::constant(2, 0x601040, 8)],
            reg(3, 0),
        )]);
        let graph = build_graph(&func, &memory());

        let node = graph.node(value(2)).unwrap();
        assert!(node.attrs.is_set(AttrKind::CouldBeTable));
        assert_eq!(node.attrs.get_int(AttrKind::FileOffset), Some(0x1040));
        let out = graph.node(value(3)).unwrap();
        assert!(!out.attrs.contains(AttrKind::CouldBeTable));
        assert_eq!(graph.node(NodeId::Op(0)).unwrap().opcode(), Some(Opcode::Load));
    }
}
