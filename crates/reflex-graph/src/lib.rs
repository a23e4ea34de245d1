//! Dataflow graph analysis for flex table recovery.
//!
//! A decompiled function is turned into a graph of operation and value
//! nodes ([`GraphBuilder`]), annotated with derived metadata
//! ([`AttributeExtractor`]), scanned for candidate table bases
//! ([`guess_tables`]) and finally collapsed into a smaller graph that keeps
//! only operations and the values entering or leaving them
//! ([`DataflowGraph::simplify`]).

mod attrs;
mod builder;
mod extract;
mod graph;
mod simplify;
mod tables;

pub use attrs::*;
pub use builder::*;
pub use extract::*;
pub use graph::*;
pub use simplify::*;
pub use tables::*;

use thiserror::Error;

/// Graph analysis errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("Insufficient table candidates: found {found}, need at least {MIN_TABLE_GUESSES}")]
    InsufficientTables { found: usize },
}

pub type Result<T> = std::result::Result<T, GraphError>;
