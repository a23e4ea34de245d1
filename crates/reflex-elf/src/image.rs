//! ELF image and its memory map.

use reflex_ir::{MemoryBlock, MemoryMap};
use tracing::debug;

use crate::constants::*;
use crate::file::ElfFile;
use crate::header::{LoadedSection, ProgramHeader, Symbol};
use crate::{ElfError, Result};

/// A loadable segment as laid out in memory.
///
/// The first `filesz` bytes come from the file at `file_offset`; anything
/// from there up to `virtual_end` is zero-filled.
#[derive(Clone, Debug)]
pub struct MemorySegment {
    pub virtual_start: u64,
    pub virtual_end: u64,
    pub file_offset: u64,
    pub filesz: u64,
    pub flags: u32,
}

impl MemorySegment {
    /// Total memory size including the zero-filled tail.
    pub const fn memsz(&self) -> u64 {
        self.virtual_end - self.virtual_start
    }

    /// Size of the zero-filled tail.
    pub const fn bss_size(&self) -> u64 {
        self.memsz() - self.filesz
    }

    /// Check if segment is read-only (no write flag).
    pub const fn is_readonly(&self) -> bool {
        (self.flags & PF_W) == 0
    }

    /// Check if segment is executable.
    pub const fn is_executable(&self) -> bool {
        (self.flags & PF_X) != 0
    }

    fn blocks(&self, index: usize) -> impl Iterator<Item = MemoryBlock> {
        let file_end = self.virtual_start + self.filesz;
        let mut data = MemoryBlock::new(format!("segment_{index}"), self.virtual_start, file_end)
            .writable(!self.is_readonly())
            .executable(self.is_executable())
            .backed_by(self.file_offset);
        data.read = self.flags & PF_R != 0;

        let mut bss = MemoryBlock::new(format!("segment_{index}.bss"), file_end, self.virtual_end)
            .writable(!self.is_readonly())
            .initialized(false);
        bss.read = data.read;

        [data, bss].into_iter().filter(|block| block.size() > 0)
    }
}

/// Parsed ELF image.
#[derive(Clone, Debug)]
pub struct ElfImage {
    pub entry_point: u64,
    pub address_bits: u8,
    pub big_endian: bool,
    pub memory_segments: Vec<MemorySegment>,
    pub sections: Vec<LoadedSection>,
    pub symbols: Vec<Symbol>,
}

impl ElfImage {
    /// Parse ELF from raw bytes.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let elf = ElfFile::parse(data)?;
        let loadable = Self::validate_segments(&elf, data)?;
        Self::validate_sections(&elf.sections, data)?;

        let memory_segments = loadable
            .iter()
            .map(|phdr| MemorySegment {
                virtual_start: phdr.vaddr,
                virtual_end: phdr.vaddr + phdr.memsz,
                file_offset: phdr.offset,
                filesz: phdr.filesz.min(phdr.memsz),
                flags: phdr.flags,
            })
            .collect();

        Ok(Self {
            entry_point: elf.entry_point(),
            address_bits: elf.header.address_bits(),
            big_endian: elf.header.data == ELF_DATA_MSB,
            memory_segments,
            sections: elf.sections,
            symbols: elf.symbols,
        })
    }

    /// Build the program memory map.
    ///
    /// Allocatable sections give the finest view (a `.rodata` next to `.data`
    /// in one segment keeps its own permissions), so they are used when
    /// present. Stripped images fall back to the loadable segments.
    pub fn memory_map(&self) -> MemoryMap {
        let mut map = MemoryMap::new(self.address_bits);

        if self.sections.is_empty() {
            for (index, segment) in self.memory_segments.iter().enumerate() {
                for block in segment.blocks(index) {
                    map.add_block(block);
                }
            }
        } else {
            for section in &self.sections {
                map.add_block(section_block(section));
            }
        }

        debug!(
            blocks = map.blocks().len(),
            address_bits = self.address_bits,
            from_sections = !self.sections.is_empty(),
            "built memory map"
        );
        map
    }

    /// Look up a symbol by name.
    pub fn lookup_symbol(&self, name: &str) -> Option<u64> {
        self.symbols.iter().find(|s| s.name == name).map(|s| s.value)
    }

    /// Total loaded size (sum of all segment memsz).
    pub fn total_size(&self) -> u64 {
        self.memory_segments.iter().map(MemorySegment::memsz).sum()
    }

    fn validate_segments(elf: &ElfFile, file_data: &[u8]) -> Result<Vec<ProgramHeader>> {
        let mut loadable = Vec::new();

        for phdr in &elf.program_headers {
            if phdr.p_type != PT_LOAD || phdr.memsz == 0 {
                continue;
            }
            let in_file = phdr
                .offset
                .checked_add(phdr.filesz)
                .is_some_and(|end| end <= file_data.len() as u64);
            if !in_file {
                return Err(ElfError::SegmentBeyondFile);
            }
            if phdr.vaddr.checked_add(phdr.memsz).is_none() {
                return Err(ElfError::VirtualAddressOverflow);
            }
            loadable.push(phdr.clone());
        }

        if loadable.is_empty() && elf.sections.is_empty() {
            return Err(ElfError::NoLoadableSegments);
        }

        Ok(loadable)
    }

    fn validate_sections(sections: &[LoadedSection], file_data: &[u8]) -> Result<()> {
        for section in sections {
            if section.addr.checked_add(section.size).is_none() {
                return Err(ElfError::VirtualAddressOverflow);
            }
            let in_file = !section.has_file_data()
                || section
                    .offset
                    .checked_add(section.size)
                    .is_some_and(|end| end <= file_data.len() as u64);
            if !in_file {
                return Err(ElfError::SectionOutOfBounds);
            }
        }
        Ok(())
    }
}

fn section_block(section: &LoadedSection) -> MemoryBlock {
    let block = MemoryBlock::new(section.name.clone(), section.addr, section.addr + section.size)
        .writable(section.flags & SHF_WRITE != 0)
        .executable(section.flags & SHF_EXECINSTR != 0)
        .initialized(section.has_file_data());
    if section.has_file_data() {
        block.backed_by(section.offset)
    } else {
        block
    }
}
