//! Scanner DFA reconstruction.
//!
//! Once the seven flex tables have been located in the binary, the scanner
//! automaton can be rebuilt by replaying flex's own transition lookup for
//! every state and equivalence class.

mod dfa;
mod reader;
mod render;
mod tables;

pub use dfa::*;
pub use reader::*;
pub use render::*;
pub use tables::*;

use thiserror::Error;

/// DFA reconstruction errors.
#[derive(Error, Debug)]
pub enum DfaError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Unsupported table element size: {0} (expected 1, 2 or 4)")]
    UnsupportedElementSize(u8),
    #[error("Read of {table}[{index}] at file offset {offset:#x} is out of bounds")]
    OutOfBounds {
        table: TableKind,
        index: u64,
        offset: u64,
    },
    #[error("Transition lookup for state {state}, class {class} does not terminate")]
    TransitionCycle { state: u32, class: u32 },
    #[error("Invalid max state: {0}")]
    InvalidMaxState(u32),
}

pub type Result<T> = std::result::Result<T, DfaError>;
