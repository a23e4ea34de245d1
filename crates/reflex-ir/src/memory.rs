//! Program memory model.
//!
//! Mirrors what the decompiler host knows about the loaded binary: a set of
//! memory blocks with permissions, and for initialized blocks the file byte
//! ranges backing them. The graph builder uses it to decide whether a
//! constant can be the base address of a static lexer table.

use crate::varnode::Varnode;

/// A contiguous run of file bytes backing part of a memory block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SourceRange {
    /// First virtual address covered.
    pub start: u64,
    /// Number of bytes covered.
    pub len: u64,
    /// File offset of `start`.
    pub file_offset: u64,
}

impl SourceRange {
    /// Check if `addr` falls inside this range.
    pub const fn contains(&self, addr: u64) -> bool {
        addr >= self.start && addr - self.start < self.len
    }

    /// File offset of `addr`, if covered.
    pub const fn file_offset_of(&self, addr: u64) -> Option<u64> {
        if self.contains(addr) {
            Some(self.file_offset + (addr - self.start))
        } else {
            None
        }
    }
}

/// A memory block of the program.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MemoryBlock {
    pub name: String,
    /// First address of the block.
    pub start: u64,
    /// One past the last address of the block.
    pub end: u64,
    /// Block has defined contents (not zero-fill).
    pub initialized: bool,
    /// Block is part of the loaded image (not an overlay or debug block).
    pub loaded: bool,
    pub read: bool,
    pub write: bool,
    pub execute: bool,
    /// File ranges backing the block.
    pub sources: Vec<SourceRange>,
}

impl MemoryBlock {
    /// Create a loaded, initialized, read-only block.
    pub fn new(name: impl Into<String>, start: u64, end: u64) -> Self {
        Self {
            name: name.into(),
            start,
            end,
            initialized: true,
            loaded: true,
            read: true,
            write: false,
            execute: false,
            sources: Vec::new(),
        }
    }

    /// Set the write permission.
    #[must_use]
    pub fn writable(mut self, write: bool) -> Self {
        self.write = write;
        self
    }

    /// Set the execute permission.
    #[must_use]
    pub fn executable(mut self, execute: bool) -> Self {
        self.execute = execute;
        self
    }

    /// Mark the block as initialized or zero-filled.
    #[must_use]
    pub fn initialized(mut self, initialized: bool) -> Self {
        self.initialized = initialized;
        self
    }

    /// Mark the block as loaded or not.
    #[must_use]
    pub fn loaded(mut self, loaded: bool) -> Self {
        self.loaded = loaded;
        self
    }

    /// Back the whole block by file bytes starting at `file_offset`.
    #[must_use]
    pub fn backed_by(mut self, file_offset: u64) -> Self {
        self.sources.push(SourceRange {
            start: self.start,
            len: self.size(),
            file_offset,
        });
        self
    }

    /// Block size in bytes.
    pub const fn size(&self) -> u64 {
        self.end - self.start
    }

    /// Check if `addr` falls inside this block.
    pub const fn contains(&self, addr: u64) -> bool {
        addr >= self.start && addr < self.end
    }

    /// Readable, initialized, loaded and not writable: where flex keeps its tables.
    pub const fn is_table_region(&self) -> bool {
        self.initialized && self.loaded && self.read && !self.write
    }

    /// File offset of `addr` through the covering source range.
    pub fn file_offset_of(&self, addr: u64) -> Option<u64> {
        self.sources
            .iter()
            .find(|src| src.contains(addr))
            .and_then(|src| src.file_offset_of(addr))
    }
}

/// Memory layout of the analyzed program.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MemoryMap {
    /// Width of addresses in the default space.
    address_bits: u8,
    /// Blocks sorted by start address.
    blocks: Vec<MemoryBlock>,
}

impl MemoryMap {
    /// Create an empty map for a default space of `address_bits` bits.
    pub const fn new(address_bits: u8) -> Self {
        Self {
            address_bits,
            blocks: Vec::new(),
        }
    }

    /// Add a block, keeping blocks ordered by start address.
    pub fn add_block(&mut self, block: MemoryBlock) {
        let idx = self.blocks.partition_point(|b| b.start <= block.start);
        self.blocks.insert(idx, block);
    }

    /// Builder-style [`MemoryMap::add_block`].
    #[must_use]
    pub fn with_block(mut self, block: MemoryBlock) -> Self {
        self.add_block(block);
        self
    }

    /// Address width of the default space.
    pub const fn address_bits(&self) -> u8 {
        self.address_bits
    }

    /// All blocks, sorted by start address.
    pub fn blocks(&self) -> &[MemoryBlock] {
        &self.blocks
    }

    /// Highest address of the default space.
    pub const fn max_address(&self) -> u64 {
        if self.address_bits >= 64 {
            u64::MAX
        } else {
            (1u64 << self.address_bits) - 1
        }
    }

    /// Check that `[addr, addr + size)` fits in the default space.
    pub const fn is_valid_range(&self, addr: u64, size: u64) -> bool {
        let last = match addr.checked_add(size.saturating_sub(1)) {
            Some(last) => last,
            None => return false,
        };
        last <= self.max_address()
    }

    /// Block containing `addr`.
    pub fn block_at(&self, addr: u64) -> Option<&MemoryBlock> {
        let idx = self.blocks.partition_point(|b| b.start <= addr);
        // Blocks may nest (a section inside a segment), so scan back.
        self.blocks[..idx].iter().rev().find(|b| b.contains(addr))
    }

    /// Check if `addr` lies in a readable, initialized, loaded, read-only block.
    pub fn is_table_address(&self, addr: u64) -> bool {
        self.block_at(addr).is_some_and(MemoryBlock::is_table_region)
    }

    /// Decode a constant varnode as a table-eligible address.
    pub fn resolve_constant(&self, vn: &Varnode) -> Option<u64> {
        let addr = vn.constant_value()?;
        if !self.is_valid_range(addr, u64::from(vn.size)) {
            return None;
        }
        self.is_table_address(addr).then_some(addr)
    }

    /// File offset backing `addr`.
    pub fn file_offset(&self, addr: u64) -> Option<u64> {
        self.block_at(addr)?.file_offset_of(addr)
    }
}
