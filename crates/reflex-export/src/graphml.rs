//! GraphML rendering.

use crate::model::{ExportModel, Field};

fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}

fn push_fields(out: &mut String, fields: &[Field]) {
    for field in fields {
        out.push_str(&format!(
            "      <data key=\"{}\">{}</data>\n",
            field.kind.name(),
            escape_xml(&field.render())
        ));
    }
}

/// Render an export model as a GraphML document.
///
/// Nodes carry the `:Ghidra` label so graph databases importing the file
/// group them together.
pub fn render_graphml(model: &ExportModel) -> String {
    let mut out = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<graphml>\n");

    for entry in model.schema.entries() {
        out.push_str(&format!(
            "  <key id=\"{}\" attr.name=\"{}\" attr.type=\"{}\"/>\n",
            entry.id(),
            entry.attr_name(),
            entry.ty
        ));
    }

    out.push_str("  <graph id=\"G\" edgedefault=\"directed\">\n");
    for node in &model.nodes {
        out.push_str(&format!("    <node id=\"{}\" labels=\":Ghidra\">\n", node.id));
        push_fields(&mut out, &node.fields);
        out.push_str("    </node>\n");
    }
    for edge in &model.edges {
        out.push_str(&format!(
            "    <edge source=\"{}\" target=\"{}\">\n",
            edge.source, edge.target
        ));
        push_fields(&mut out, &edge.fields);
        out.push_str("    </edge>\n");
    }
    out.push_str("  </graph>\n</graphml>\n");
    out
}
