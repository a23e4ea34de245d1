//! P-code IR for flex table recovery.
//!
//! This crate holds the types the decompiler hands over for a single
//! function: the ordered p-code operations, their varnodes, and a model of
//! the program's memory layout used to decide whether a constant points
//! into a read-only table.

mod function;
mod memory;
mod op;
mod opcode;
mod varnode;

pub use function::*;
pub use memory::*;
pub use op::*;
pub use opcode::*;
pub use varnode::*;

use thiserror::Error;

/// IR loading errors.
#[derive(Error, Debug)]
pub enum IrError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Malformed function listing: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Unknown p-code mnemonic: {0}")]
    UnknownMnemonic(String),
    #[error("Unknown address space: {0}")]
    UnknownSpace(String),
}

pub type Result<T> = std::result::Result<T, IrError>;
