//! Graphviz rendering.

use reflex_graph::{DataflowGraph, Node};

/// Escape text for a double-quoted DOT string.
fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n")
}

/// Multi-line node label listing every non-diagnostic attribute.
fn node_label(node: &Node) -> String {
    let mut label = format!("<node id={}>\n", node.id);
    for (kind, value) in node.attrs.iter() {
        if kind.is_diagnostic() {
            continue;
        }
        label.push_str(&format!("{kind}={value}\n"));
    }
    label.push_str("</node>\n");
    label
}

/// Render a graph as a Graphviz digraph.
///
/// Edges are emitted in argument order so `ordering=in` lays out operands
/// left to right.
pub fn render_graphviz(graph: &DataflowGraph) -> String {
    let mut out = String::from("digraph Out {\n    ordering=in;\n");

    for node in graph.nodes() {
        out.push_str(&format!(
            "    \"{}\" [ label=\"{}\" ];\n",
            node.id,
            escape(&node_label(node))
        ));
    }

    let mut edges: Vec<_> = graph.edges().collect();
    edges.sort_by_key(|(_, _, edge)| edge.order());
    for (from, to, edge) in edges {
        out.push_str(&format!(
            "    \"{from}\" -> \"{to}\" [ label=\"{}\" ];\n",
            edge.order()
        ));
    }

    out.push_str("}\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use reflex_graph::{AttrKind, Edge, NodeId};
    use reflex_ir::VarnodeId;

    #[test]
    fn test_render_graphviz() {
        let mut graph = DataflowGraph::new();
        let mut value = Node::new(NodeId::Value(VarnodeId(3)));
        value.attrs.set(AttrKind::Name, "const:0x10");
        value.attrs.set(AttrKind::AsString, "(const, 0x10, 4)");
        graph.add_node(value);
        graph.add_node(Node::new(NodeId::Op(0)));
        graph.add_edge(NodeId::Value(VarnodeId(3)), NodeId::Op(0), Edge::new(2));
        graph.add_edge(NodeId::Value(VarnodeId(3)), NodeId::Op(0), Edge::new(1));

        let dot = render_graphviz(&graph);
        assert!(dot.starts_with("digraph Out {\n    ordering=in;\n"));
        assert!(dot.contains("\"vn3\" [ label=\"<node id=vn3>\\nNAME=const:0x10\\n</node>\\n\" ];"));
        assert!(!dot.contains("AS_STRING"));
        let first = dot.find("[ label=\"1\" ]").unwrap();
        let second = dot.find("[ label=\"2\" ]").unwrap();
        assert!(first < second);
        assert!(dot.ends_with("}\n"));
    }

    #[test]
    fn test_escape() {
        assert_eq!(escape("a\"b\\c\nd"), "a\\\"b\\\\c\\nd");
    }
}
