//! ELF loader for flex table recovery.
//!
//! Parses 32- and 64-bit ELF files of either byte order and exposes the
//! loaded image as a [`reflex_ir::MemoryMap`].

mod constants;
mod file;
mod header;
mod image;

pub use constants::*;
pub use file::*;
pub use header::*;
pub use image::*;

use thiserror::Error;

/// ELF parsing errors.
#[derive(Error, Debug)]
pub enum ElfError {
    #[error("ELF data too small")]
    TooSmall,
    #[error("Invalid ELF magic number")]
    InvalidMagic,
    #[error("Unsupported ELF class: {0}")]
    UnsupportedClass(u8),
    #[error("Unsupported ELF data encoding: {0}")]
    UnsupportedEncoding(u8),
    #[error("Section header out of bounds")]
    SectionOutOfBounds,
    #[error("Program header out of bounds")]
    ProgramOutOfBounds,
    #[error("Segment extends beyond file")]
    SegmentBeyondFile,
    #[error("Virtual address overflow")]
    VirtualAddressOverflow,
    #[error("No loadable segments found")]
    NoLoadableSegments,
}

pub type Result<T> = std::result::Result<T, ElfError>;
