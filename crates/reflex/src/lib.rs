//! Reflex - flex scanner table recovery
//!
//! Finds the seven compressed DFA tables of a flex-generated scanner by
//! following the dataflow of its decompiled `yylex` function, then rebuilds
//! the scanner automaton from those tables.
//!
//! # Example
//!
//! ```ignore
//! use reflex::{AnalysisOptions, ElfImage, ListingDecompiler, ReflexAnalysis};
//!
//! let image = ElfImage::parse(&std::fs::read("scanner")?)?;
//! let memory = image.memory_map();
//! let outcome = ReflexAnalysis::new(&memory, AnalysisOptions::new())
//!     .run(&ListingDecompiler::new("yylex.json"))?;
//! for addr in outcome.guesses().addresses() {
//!     println!("{addr:#x}");
//! }
//! ```

// Re-export from sub-crates
pub use reflex_dfa::{
    Dfa, DfaError, DfaOptions, Endianness, FlexTables, SizedOffset, TableKind, TableReader,
    reconstruct, render_dfa, render_dot, render_exits,
};
pub use reflex_elf::{ElfError, ElfImage, MemorySegment, get_elf_address_bits};
pub use reflex_export::{ExportModel, render_graphml, render_graphviz, write_graphml, write_graphviz};
pub use reflex_graph::{
    AttrKind, AttrValue, DataflowGraph, GraphError, MIN_TABLE_GUESSES, NodeId, SimplifyStats,
    TableGuesses, build_graph, guess_tables,
};
pub use reflex_ir::{
    FunctionIr, IrError, MemoryBlock, MemoryMap, Opcode, PcodeOp, Space, Varnode, VarnodeId,
};

mod decompiler;
mod error;
mod pipeline;

pub use decompiler::*;
pub use error::AnalysisError;
pub use pipeline::*;

use thiserror::Error;

/// Top-level errors.
#[derive(Error, Debug)]
pub enum Error {
    #[error("ELF error: {0}")]
    Elf(#[from] ElfError),
    #[error("IR error: {0}")]
    Ir(#[from] IrError),
    #[error("DFA error: {0}")]
    Dfa(#[from] DfaError),
    #[error("Analysis failed: {0}")]
    Analysis(#[from] AnalysisError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Load an ELF binary and build its memory map.
pub fn load_memory_map(path: &std::path::Path) -> Result<MemoryMap> {
    let data = std::fs::read(path)?;
    let image = ElfImage::parse(&data)?;
    Ok(image.memory_map())
}
