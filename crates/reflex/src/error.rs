use std::time::Duration;

use reflex_graph::GraphError;
use reflex_ir::IrError;
use thiserror::Error;

/// Reasons a single analysis run stops.
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Decompilation unavailable: {0}")]
    DecompilationUnavailable(String),
    #[error("Decompilation did not finish within {0:?}")]
    DecompilationTimeout(Duration),
    #[error("Malformed decompiler output: {0}")]
    Ir(#[from] IrError),
    #[error("Insufficient table candidates: found {found}, need at least {needed}")]
    InsufficientTables { found: usize, needed: usize },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<GraphError> for AnalysisError {
    fn from(err: GraphError) -> Self {
        match err {
            GraphError::InsufficientTables { found } => Self::InsufficientTables {
                found,
                needed: reflex_graph::MIN_TABLE_GUESSES,
            },
        }
    }
}
