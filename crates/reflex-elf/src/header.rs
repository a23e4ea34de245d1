//! ELF header structures.
//!
//! Addresses and sizes are widened to `u64` for both ELF classes.

/// ELF header.
#[derive(Clone, Debug)]
pub struct ElfHeader {
    pub class: u8,
    pub data: u8,
    pub machine: u16,
    pub entry: u64,
    pub phoff: u64,
    pub shoff: u64,
    pub flags: u32,
    pub phentsize: u16,
    pub phnum: u16,
    pub shentsize: u16,
    pub shnum: u16,
    pub shstrndx: u16,
}

impl ElfHeader {
    /// Check if this is a 64-bit ELF.
    pub const fn is_64(&self) -> bool {
        self.class == crate::ELF_CLASS_64
    }

    /// Address width of the target.
    pub const fn address_bits(&self) -> u8 {
        if self.is_64() { 64 } else { 32 }
    }
}

/// Program header.
#[derive(Clone, Debug)]
pub struct ProgramHeader {
    pub p_type: u32,
    pub offset: u64,
    pub vaddr: u64,
    pub filesz: u64,
    pub memsz: u64,
    pub flags: u32,
}

/// Section header.
#[derive(Clone, Debug)]
pub struct SectionHeader {
    pub name: u32,
    pub sh_type: u32,
    pub flags: u64,
    pub addr: u64,
    pub offset: u64,
    pub size: u64,
    pub link: u32,
    pub entsize: u64,
}

/// Allocatable section resolved to its name.
#[derive(Clone, Debug)]
pub struct LoadedSection {
    pub name: String,
    pub addr: u64,
    pub size: u64,
    pub flags: u64,
    pub sh_type: u32,
    /// File offset of the section contents.
    pub offset: u64,
}

impl LoadedSection {
    /// Check if the section occupies file bytes.
    pub const fn has_file_data(&self) -> bool {
        self.sh_type != crate::SHT_NOBITS
    }
}

/// ELF symbol.
#[derive(Clone, Debug)]
pub struct Symbol {
    /// Symbol name.
    pub name: String,
    /// Symbol value (address for functions and objects).
    pub value: u64,
    /// Symbol size.
    pub size: u64,
    /// Symbol type (`STT_FUNC`, `STT_OBJECT`, etc.).
    pub sym_type: u8,
}
