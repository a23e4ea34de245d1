//! Attributed export model.

use reflex_graph::{AttrKind, AttrValue, Attributes, DataflowGraph, NodeId};
use tracing::debug;

use crate::schema::{AttrSchema, AttrType};

/// An exported attribute value with its declared type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Field {
    pub kind: AttrKind,
    pub ty: AttrType,
    pub value: AttrValue,
}

impl Field {
    /// Textual form of the value.
    pub fn render(&self) -> String {
        self.value.to_string()
    }
}

/// Exported node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeRecord {
    pub id: NodeId,
    pub fields: Vec<Field>,
}

/// Exported edge.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EdgeRecord {
    pub source: NodeId,
    pub target: NodeId,
    pub fields: Vec<Field>,
}

impl NodeRecord {
    pub fn get(&self, kind: AttrKind) -> Option<&Field> {
        self.fields.iter().find(|f| f.kind == kind)
    }
}

impl EdgeRecord {
    pub fn get(&self, kind: AttrKind) -> Option<&Field> {
        self.fields.iter().find(|f| f.kind == kind)
    }
}

/// Schema plus node and edge records restricted to schema kinds.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExportModel {
    pub schema: AttrSchema,
    pub nodes: Vec<NodeRecord>,
    pub edges: Vec<EdgeRecord>,
}

impl ExportModel {
    pub fn from_graph(graph: &DataflowGraph) -> Self {
        let schema = AttrSchema::new();

        let nodes = graph
            .nodes()
            .map(|node| NodeRecord {
                id: node.id,
                fields: fields(&schema, &node.attrs),
            })
            .collect();
        let edges = graph
            .edges()
            .map(|(source, target, edge)| EdgeRecord {
                source,
                target,
                fields: fields(&schema, &edge.attrs),
            })
            .collect::<Vec<_>>();

        debug!(nodes = graph.node_count(), edges = edges.len(), "built export model");
        Self {
            schema,
            nodes,
            edges,
        }
    }

    pub fn node(&self, id: NodeId) -> Option<&NodeRecord> {
        self.nodes.iter().find(|n| n.id == id)
    }
}

/// Keep attributes whose kind is in the schema and whose value fits its type.
fn fields(schema: &AttrSchema, attrs: &Attributes) -> Vec<Field> {
    attrs
        .iter()
        .filter_map(|(kind, value)| {
            let entry = schema.get(kind)?;
            entry.ty.accepts(value).then(|| Field {
                kind,
                ty: entry.ty,
                value: value.clone(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use reflex_graph::{Edge, Node};
    use reflex_ir::VarnodeId;

    fn sample() -> DataflowGraph {
        let mut graph = DataflowGraph::new();
        let mut value = Node::new(NodeId::Value(VarnodeId(1)));
        value.attrs.set(AttrKind::IsVarnode, true);
        value.attrs.set(AttrKind::AsString, "(const, 0x601000, 8)");
        value.attrs.set(AttrKind::Address, 0x601000u64);
        // Mistyped values are dropped, not coerced.
        value.attrs.set(AttrKind::Size, "eight");
        graph.add_node(value);

        let mut op = Node::new(NodeId::Op(0));
        op.attrs.set(AttrKind::IsOp, true);
        op.attrs.set(AttrKind::AsString, "LOAD");
        op.attrs.set(AttrKind::OpMnemonic, "LOAD");
        graph.add_node(op);

        let mut edge = Edge::new(1);
        edge.attrs.set(AttrKind::AsString, "debug");
        edge.attrs.set(AttrKind::Name, "const:0x601000");
        graph.add_edge(NodeId::Value(VarnodeId(1)), NodeId::Op(0), edge);
        graph
    }

    #[test]
    fn test_records_only_carry_schema_kinds() {
        let model = ExportModel::from_graph(&sample());
        let all_fields = model
            .nodes
            .iter()
            .flat_map(|n| &n.fields)
            .chain(model.edges.iter().flat_map(|e| &e.fields));
        for field in all_fields {
            assert!(model.schema.contains(field.kind));
            assert!(field.ty.accepts(&field.value));
            assert_ne!(field.kind, AttrKind::AsString);
        }
    }

    #[test]
    fn test_model_contents() {
        let model = ExportModel::from_graph(&sample());
        assert_eq!(model.nodes.len(), 2);
        assert_eq!(model.edges.len(), 1);

        let value = model.node(NodeId::Value(VarnodeId(1))).unwrap();
        assert_eq!(value.get(AttrKind::Address).map(Field::render).as_deref(), Some("6295552"));
        assert!(value.get(AttrKind::Size).is_none());

        let edge = &model.edges[0];
        assert_eq!(edge.get(AttrKind::Order).map(|f| f.ty), Some(AttrType::Int));
        assert_eq!(edge.get(AttrKind::Name).map(Field::render).as_deref(), Some("const:0x601000"));
    }
}
