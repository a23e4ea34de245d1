//! Export of reflex dataflow graphs.
//!
//! [`ExportModel`] is the typed, schema-described view of a graph that
//! leaves the process; [`render_graphml`] and [`render_graphviz`] turn it
//! (or a raw graph) into text, and the `write_*` helpers put that text on
//! disk.

mod dot;
mod graphml;
mod model;
mod schema;

use std::fs;
use std::path::Path;

pub use dot::*;
pub use graphml::*;
pub use model::*;
pub use schema::*;

use reflex_graph::DataflowGraph;
use tracing::trace;

/// Write a graph as a Graphviz digraph.
pub fn write_graphviz(path: &Path, graph: &DataflowGraph) -> std::io::Result<()> {
    let dot = render_graphviz(graph);
    trace!(path = %path.display(), nodes = graph.node_count(), "writing graphviz");
    fs::write(path, dot)
}

/// Write an export model as a GraphML document.
pub fn write_graphml(path: &Path, model: &ExportModel) -> std::io::Result<()> {
    let xml = render_graphml(model);
    trace!(path = %path.display(), nodes = model.nodes.len(), "writing graphml");
    fs::write(path, xml)
}
