//! Analysis pipeline - p-code → dataflow graph → table guesses → simplified graph.

use std::path::{Path, PathBuf};
use std::time::Duration;

use reflex_export::{ExportModel, write_graphml, write_graphviz};
use reflex_graph::{DataflowGraph, TableGuesses, build_graph, guess_tables};
use reflex_ir::{FunctionIr, MemoryMap};
use tracing::{debug, info, warn};

use crate::decompiler::{DECOMPILATION_TIMEOUT, Decompiler};
use crate::error::AnalysisError;

/// Raw graph output file.
pub const RAW_GRAPH_FILE: &str = "out.dot";
/// Simplified graph output file.
pub const SIMPLE_GRAPH_FILE: &str = "simple.dot";
/// Attributed export output file.
pub const GRAPHML_FILE: &str = "out.graphml";

/// Options for an analysis run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AnalysisOptions {
    /// Elide COPY operations while simplifying.
    pub remove_copies: bool,
    /// Elide INDIRECT operations while simplifying.
    pub remove_indirects: bool,
    /// Time allowed for decompilation.
    pub timeout: Duration,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalysisOptions {
    pub const fn new() -> Self {
        Self {
            remove_copies: true,
            remove_indirects: true,
            timeout: DECOMPILATION_TIMEOUT,
        }
    }

    #[must_use]
    pub const fn with_remove_copies(mut self, remove_copies: bool) -> Self {
        self.remove_copies = remove_copies;
        self
    }

    #[must_use]
    pub const fn with_remove_indirects(mut self, remove_indirects: bool) -> Self {
        self.remove_indirects = remove_indirects;
        self
    }

    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Observer notified once table guesses are known.
pub trait AnalysisListener {
    fn on_tables_guessed(&mut self, guesses: &TableGuesses);
}

impl<F: FnMut(&TableGuesses)> AnalysisListener for F {
    fn on_tables_guessed(&mut self, guesses: &TableGuesses) {
        self(guesses);
    }
}

/// Result of a completed analysis.
#[derive(Clone, Debug)]
pub enum AnalysisOutcome {
    /// The graph was simplified and exported.
    Simplified {
        guesses: TableGuesses,
        graph: DataflowGraph,
        simple: DataflowGraph,
        model: ExportModel,
    },
    /// Some value has several producers; only the raw graph is available.
    Unsimplified {
        guesses: TableGuesses,
        graph: DataflowGraph,
    },
}

impl AnalysisOutcome {
    pub const fn guesses(&self) -> &TableGuesses {
        match self {
            Self::Simplified { guesses, .. } | Self::Unsimplified { guesses, .. } => guesses,
        }
    }

    /// The graph as built from the p-code.
    pub const fn graph(&self) -> &DataflowGraph {
        match self {
            Self::Simplified { graph, .. } | Self::Unsimplified { graph, .. } => graph,
        }
    }

    pub const fn simplified(&self) -> Option<&DataflowGraph> {
        match self {
            Self::Simplified { simple, .. } => Some(simple),
            Self::Unsimplified { .. } => None,
        }
    }

    pub const fn model(&self) -> Option<&ExportModel> {
        match self {
            Self::Simplified { model, .. } => Some(model),
            Self::Unsimplified { .. } => None,
        }
    }

    pub const fn is_simplified(&self) -> bool {
        matches!(self, Self::Simplified { .. })
    }

    /// Write the graphs into `dir`, returning the files written.
    ///
    /// The raw graph is always written; the simplified graph and its GraphML
    /// export only when simplification succeeded.
    pub fn write_to(&self, dir: &Path) -> Result<Vec<PathBuf>, AnalysisError> {
        std::fs::create_dir_all(dir)?;
        let mut written = Vec::new();

        let raw = dir.join(RAW_GRAPH_FILE);
        write_graphviz(&raw, self.graph())?;
        written.push(raw);

        if let Self::Simplified { simple, model, .. } = self {
            let simple_path = dir.join(SIMPLE_GRAPH_FILE);
            write_graphviz(&simple_path, simple)?;
            written.push(simple_path);

            let graphml = dir.join(GRAPHML_FILE);
            write_graphml(&graphml, model)?;
            written.push(graphml);
        }

        debug!(dir = %dir.display(), files = written.len(), "wrote analysis outputs");
        Ok(written)
    }
}

/// One analysis of one scanner function.
pub struct ReflexAnalysis<'a> {
    memory: &'a MemoryMap,
    options: AnalysisOptions,
    listener: Option<Box<dyn AnalysisListener + 'a>>,
}

impl<'a> ReflexAnalysis<'a> {
    pub fn new(memory: &'a MemoryMap, options: AnalysisOptions) -> Self {
        Self {
            memory,
            options,
            listener: None,
        }
    }

    /// Notify `listener` when the table guesses are known.
    #[must_use]
    pub fn with_listener(mut self, listener: impl AnalysisListener + 'a) -> Self {
        self.listener = Some(Box::new(listener));
        self
    }

    pub const fn options(&self) -> &AnalysisOptions {
        &self.options
    }

    /// Fetch the function from `decompiler` and analyze it.
    pub fn run(&mut self, decompiler: &dyn Decompiler) -> Result<AnalysisOutcome, AnalysisError> {
        let func = decompiler.decompile(self.options.timeout)?;
        info!(
            function = func.name.as_deref().unwrap_or("<unnamed>"),
            ops = func.len(),
            "decompiled"
        );
        self.analyze(&func)
    }

    /// Analyze an already decompiled function.
    pub fn analyze(&mut self, func: &FunctionIr) -> Result<AnalysisOutcome, AnalysisError> {
        let graph = build_graph(func, self.memory);
        info!(
            ops = graph.op_count(),
            values = graph.value_count(),
            edges = graph.edge_count(),
            "built dataflow graph"
        );

        let guesses = guess_tables(&graph)?;
        info!(count = guesses.len(), "guessed table bases");
        if let Some(listener) = self.listener.as_mut() {
            listener.on_tables_guessed(&guesses);
        }

        let Some((simple, stats)) =
            graph.simplify_with_stats(self.options.remove_copies, self.options.remove_indirects)
        else {
            warn!("dataflow graph has values with several producers, skipping simplification");
            return Ok(AnalysisOutcome::Unsimplified { guesses, graph });
        };
        info!(
            nodes = simple.node_count(),
            edges = simple.edge_count(),
            interior = stats.interior_values,
            isolated = stats.isolated_values,
            copies = stats.copies,
            indirects = stats.indirects,
            "simplified graph"
        );

        let model = ExportModel::from_graph(&simple);
        Ok(AnalysisOutcome::Simplified {
            guesses,
            graph,
            simple,
            model,
        })
    }
}
