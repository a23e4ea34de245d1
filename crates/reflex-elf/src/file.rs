//! ELF file parser.

use tracing::debug;

use crate::constants::*;
use crate::header::*;
use crate::{ElfError, Result};

/// Bounds-checked reader honouring the file's byte order.
#[derive(Clone, Copy)]
struct ByteReader<'a> {
    data: &'a [u8],
    big_endian: bool,
}

impl<'a> ByteReader<'a> {
    const fn new(data: &'a [u8], big_endian: bool) -> Self {
        Self { data, big_endian }
    }

    fn bytes<const N: usize>(&self, offset: usize) -> Option<[u8; N]> {
        let end = offset.checked_add(N)?;
        self.data.get(offset..end)?.try_into().ok()
    }

    fn u8(&self, offset: usize) -> Option<u8> {
        self.data.get(offset).copied()
    }

    fn u16(&self, offset: usize) -> Option<u16> {
        let b = self.bytes::<2>(offset)?;
        Some(if self.big_endian { u16::from_be_bytes(b) } else { u16::from_le_bytes(b) })
    }

    fn u32(&self, offset: usize) -> Option<u32> {
        let b = self.bytes::<4>(offset)?;
        Some(if self.big_endian { u32::from_be_bytes(b) } else { u32::from_le_bytes(b) })
    }

    fn u64(&self, offset: usize) -> Option<u64> {
        let b = self.bytes::<8>(offset)?;
        Some(if self.big_endian { u64::from_be_bytes(b) } else { u64::from_le_bytes(b) })
    }

    /// Byte range `[offset, offset + size)` if it lies inside the file.
    fn range(&self, offset: u64, size: u64) -> Option<(usize, usize)> {
        let start = usize::try_from(offset).ok()?;
        let end = start.checked_add(usize::try_from(size).ok()?)?;
        (end <= self.data.len()).then_some((start, end))
    }

    /// Offset of entry `index` in a header table, if it starts inside the file.
    fn entry_offset(&self, table: u64, index: u16, entsize: u16) -> Option<usize> {
        let offset = usize::try_from(table)
            .ok()?
            .checked_add(usize::from(index) * usize::from(entsize))?;
        (offset < self.data.len()).then_some(offset)
    }

    /// Read an address-sized word (4 or 8 bytes).
    fn word(&self, offset: usize, is_64: bool) -> Option<u64> {
        if is_64 {
            self.u64(offset)
        } else {
            self.u32(offset).map(u64::from)
        }
    }

    /// Read a NUL-terminated string at `base + index`.
    ///
    /// Offsets past the end of the file (or not representable) read as empty.
    fn cstr(&self, base: u64, index: u32) -> String {
        let offset = usize::try_from(base)
            .ok()
            .and_then(|base| base.checked_add(index as usize));
        let Some(tail) = offset.and_then(|offset| self.data.get(offset..)) else {
            return String::new();
        };
        let len = tail.iter().position(|&b| b == 0).unwrap_or(tail.len());
        String::from_utf8_lossy(&tail[..len]).into_owned()
    }
}

/// Parsed ELF file.
#[derive(Clone, Debug)]
pub struct ElfFile {
    pub header: ElfHeader,
    pub sections: Vec<LoadedSection>,
    pub program_headers: Vec<ProgramHeader>,
    pub symbols: Vec<Symbol>,
}

impl ElfFile {
    /// Parse ELF file from raw bytes.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let header = Self::parse_header(data)?;
        let reader = ByteReader::new(data, header.data == ELF_DATA_MSB);

        let program_headers = Self::parse_program_headers(reader, &header)?;
        let all_sections = Self::parse_all_sections(reader, &header)?;
        let sections = Self::load_allocatable_sections(reader, &all_sections, &header);
        let symbols = Self::parse_symbols(reader, &all_sections, header.is_64());

        Ok(Self {
            header,
            sections,
            program_headers,
            symbols,
        })
    }

    /// Entry point address.
    pub const fn entry_point(&self) -> u64 {
        self.header.entry
    }

    /// Look up a symbol by name.
    ///
    /// Returns the symbol's value (address) if found.
    pub fn lookup_symbol(&self, name: &str) -> Option<u64> {
        self.symbols.iter().find(|s| s.name == name).map(|s| s.value)
    }

    /// Look up a function symbol by name.
    ///
    /// Only returns symbols with `STT_FUNC` type.
    pub fn lookup_function(&self, name: &str) -> Option<u64> {
        self.symbols
            .iter()
            .find(|s| s.name == name && s.sym_type == STT_FUNC)
            .map(|s| s.value)
    }

    fn parse_header(data: &[u8]) -> Result<ElfHeader> {
        if data.len() < 16 {
            return Err(ElfError::TooSmall);
        }
        if data[..4] != ELF_MAGIC {
            return Err(ElfError::InvalidMagic);
        }

        let class = data[4];
        let encoding = data[5];
        let is_64 = match class {
            ELF_CLASS_32 => false,
            ELF_CLASS_64 => true,
            other => return Err(ElfError::UnsupportedClass(other)),
        };
        if encoding != ELF_DATA_LSB && encoding != ELF_DATA_MSB {
            return Err(ElfError::UnsupportedEncoding(encoding));
        }

        let min_size = if is_64 { 64 } else { 52 };
        if data.len() < min_size {
            return Err(ElfError::TooSmall);
        }

        let r = ByteReader::new(data, encoding == ELF_DATA_MSB);
        // Offsets after e_entry shift by the word size.
        let w = if is_64 { 8 } else { 4 };
        let after_words = 24 + 3 * w;
        let header = (|| {
            Some(ElfHeader {
                class,
                data: encoding,
                machine: r.u16(18)?,
                entry: r.word(24, is_64)?,
                phoff: r.word(24 + w, is_64)?,
                shoff: r.word(24 + 2 * w, is_64)?,
                flags: r.u32(after_words)?,
                phentsize: r.u16(after_words + 6)?,
                phnum: r.u16(after_words + 8)?,
                shentsize: r.u16(after_words + 10)?,
                shnum: r.u16(after_words + 12)?,
                shstrndx: r.u16(after_words + 14)?,
            })
        })();
        header.ok_or(ElfError::TooSmall)
    }

    fn parse_program_headers(r: ByteReader<'_>, header: &ElfHeader) -> Result<Vec<ProgramHeader>> {
        let mut headers = Vec::with_capacity(header.phnum as usize);

        for i in 0..header.phnum {
            let offset = r
                .entry_offset(header.phoff, i, header.phentsize)
                .ok_or(ElfError::ProgramOutOfBounds)?;
            let ph = Self::parse_program_header(r, offset, header.is_64())
                .ok_or(ElfError::ProgramOutOfBounds)?;
            headers.push(ph);
        }

        Ok(headers)
    }

    fn parse_program_header(r: ByteReader<'_>, offset: usize, is_64: bool) -> Option<ProgramHeader> {
        if is_64 {
            Some(ProgramHeader {
                p_type: r.u32(offset)?,
                flags: r.u32(offset + 4)?,
                offset: r.u64(offset + 8)?,
                vaddr: r.u64(offset + 16)?,
                filesz: r.u64(offset + 32)?,
                memsz: r.u64(offset + 40)?,
            })
        } else {
            Some(ProgramHeader {
                p_type: r.u32(offset)?,
                offset: u64::from(r.u32(offset + 4)?),
                vaddr: u64::from(r.u32(offset + 8)?),
                filesz: u64::from(r.u32(offset + 16)?),
                memsz: u64::from(r.u32(offset + 20)?),
                flags: r.u32(offset + 24)?,
            })
        }
    }

    fn parse_all_sections(r: ByteReader<'_>, header: &ElfHeader) -> Result<Vec<SectionHeader>> {
        let mut sections = Vec::with_capacity(header.shnum as usize);

        for i in 0..header.shnum {
            let offset = r
                .entry_offset(header.shoff, i, header.shentsize)
                .ok_or(ElfError::SectionOutOfBounds)?;
            let sh = Self::parse_section_header(r, offset, header.is_64())
                .ok_or(ElfError::SectionOutOfBounds)?;
            sections.push(sh);
        }

        Ok(sections)
    }

    fn parse_section_header(r: ByteReader<'_>, offset: usize, is_64: bool) -> Option<SectionHeader> {
        if is_64 {
            Some(SectionHeader {
                name: r.u32(offset)?,
                sh_type: r.u32(offset + 4)?,
                flags: r.u64(offset + 8)?,
                addr: r.u64(offset + 16)?,
                offset: r.u64(offset + 24)?,
                size: r.u64(offset + 32)?,
                link: r.u32(offset + 40)?,
                entsize: r.u64(offset + 56)?,
            })
        } else {
            Some(SectionHeader {
                name: r.u32(offset)?,
                sh_type: r.u32(offset + 4)?,
                flags: u64::from(r.u32(offset + 8)?),
                addr: u64::from(r.u32(offset + 12)?),
                offset: u64::from(r.u32(offset + 16)?),
                size: u64::from(r.u32(offset + 20)?),
                link: r.u32(offset + 24)?,
                entsize: u64::from(r.u32(offset + 36)?),
            })
        }
    }

    fn load_allocatable_sections(
        r: ByteReader<'_>,
        sections: &[SectionHeader],
        header: &ElfHeader,
    ) -> Vec<LoadedSection> {
        let strtab = sections.get(header.shstrndx as usize);

        sections
            .iter()
            .filter(|section| section.flags & SHF_ALLOC != 0 && section.size > 0)
            .map(|section| {
                let name = strtab.map_or_else(
                    || "unknown".to_string(),
                    |strtab| r.cstr(strtab.offset, section.name),
                );
                LoadedSection {
                    name,
                    addr: section.addr,
                    size: section.size,
                    flags: section.flags,
                    sh_type: section.sh_type,
                    offset: section.offset,
                }
            })
            .collect()
    }

    /// Parse symbol table from ELF sections.
    fn parse_symbols(r: ByteReader<'_>, sections: &[SectionHeader], is_64: bool) -> Vec<Symbol> {
        let mut symbols = Vec::new();

        let Some(symtab) = sections.iter().find(|s| s.sh_type == SHT_SYMTAB) else {
            return symbols;
        };
        // String table for symbol names is linked via sh_link
        let Some(strtab) = sections.get(symtab.link as usize) else {
            return symbols;
        };
        let Ok(entsize) = usize::try_from(symtab.entsize) else {
            return symbols;
        };
        if entsize == 0 {
            return symbols;
        }
        let Some((start, end)) = r.range(symtab.offset, symtab.size) else {
            debug!(
                offset = symtab.offset,
                size = symtab.size,
                "symbol table extends beyond file, ignoring"
            );
            return symbols;
        };

        for offset in (start..end).step_by(entsize) {
            if let Some(sym) = Self::parse_symbol(r, offset, strtab.offset, is_64) {
                symbols.push(sym);
            }
        }

        symbols
    }

    /// Parse a single symbol entry.
    fn parse_symbol(r: ByteReader<'_>, offset: usize, strtab_offset: u64, is_64: bool) -> Option<Symbol> {
        let name_idx = r.u32(offset)?;
        let (info, value, size) = if is_64 {
            // ELF64 symbol: 24 bytes
            (r.u8(offset + 4)?, r.u64(offset + 8)?, r.u64(offset + 16)?)
        } else {
            // ELF32 symbol: 16 bytes
            (
                r.u8(offset + 12)?,
                u64::from(r.u32(offset + 4)?),
                u64::from(r.u32(offset + 8)?),
            )
        };

        Some(Symbol {
            name: r.cstr(strtab_offset, name_idx),
            value,
            size,
            sym_type: info & 0xf,
        })
    }
}

/// Peek at the ELF header to determine the address width without full parsing.
pub fn get_elf_address_bits(data: &[u8]) -> Result<u8> {
    if data.len() < 5 {
        return Err(ElfError::TooSmall);
    }
    if data[..4] != ELF_MAGIC {
        return Err(ElfError::InvalidMagic);
    }
    match data[4] {
        ELF_CLASS_32 => Ok(32),
        ELF_CLASS_64 => Ok(64),
        other => Err(ElfError::UnsupportedClass(other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Section {
        name: u32,
        sh_type: u32,
        flags: u64,
        offset: u64,
        size: u64,
        link: u32,
        entsize: u64,
    }

    const fn section(sh_type: u32, offset: u64, size: u64) -> Section {
        Section { name: 0, sh_type, flags: 0, offset, size, link: 0, entsize: 0 }
    }

    /// Little-endian ELF64 with `payload` at offset 64 and the section
    /// headers (a null entry first) after it.
    fn elf64(payload: &[u8], sections: &[Section], shstrndx: u16) -> Vec<u8> {
        let shoff = 64 + payload.len();
        let mut data = vec![0u8; shoff + 64 * (sections.len() + 1)];
        data[..4].copy_from_slice(&ELF_MAGIC);
        data[4] = ELF_CLASS_64;
        data[5] = ELF_DATA_LSB;
        data[40..48].copy_from_slice(&(shoff as u64).to_le_bytes());
        data[58..60].copy_from_slice(&64u16.to_le_bytes());
        data[60..62].copy_from_slice(&(sections.len() as u16 + 1).to_le_bytes());
        data[62..64].copy_from_slice(&shstrndx.to_le_bytes());
        data[64..shoff].copy_from_slice(payload);

        for (i, sec) in sections.iter().enumerate() {
            let at = shoff + 64 * (i + 1);
            data[at..at + 4].copy_from_slice(&sec.name.to_le_bytes());
            data[at + 4..at + 8].copy_from_slice(&sec.sh_type.to_le_bytes());
            data[at + 8..at + 16].copy_from_slice(&sec.flags.to_le_bytes());
            data[at + 16..at + 24].copy_from_slice(&0x1000u64.to_le_bytes());
            data[at + 24..at + 32].copy_from_slice(&sec.offset.to_le_bytes());
            data[at + 32..at + 40].copy_from_slice(&sec.size.to_le_bytes());
            data[at + 40..at + 44].copy_from_slice(&sec.link.to_le_bytes());
            data[at + 56..at + 64].copy_from_slice(&sec.entsize.to_le_bytes());
        }
        data
    }

    #[test]
    fn test_section_names_with_unrepresentable_string_table() {
        let text = Section { name: 1, flags: SHF_ALLOC, ..section(SHT_PROGBITS, 64, 4) };
        let shstrtab = section(SHT_STRTAB, u64::MAX, 16);
        let data = elf64(&[0; 4], &[text, shstrtab], 2);

        let elf = ElfFile::parse(&data).unwrap();
        assert_eq!(elf.sections.len(), 1);
        assert_eq!(elf.sections[0].name, "");
    }

    #[test]
    fn test_section_names_resolve() {
        let names = b"\0.rodata\0";
        let rodata = Section { name: 1, flags: SHF_ALLOC, ..section(SHT_PROGBITS, 64, 4) };
        let shstrtab = section(SHT_STRTAB, 64, names.len() as u64);
        let data = elf64(names, &[rodata, shstrtab], 2);

        let elf = ElfFile::parse(&data).unwrap();
        assert_eq!(elf.sections[0].name, ".rodata");
    }

    #[test]
    fn test_oversized_symbol_table_is_ignored() {
        let symtab = Section { entsize: 1, ..section(SHT_SYMTAB, 64, u64::MAX) };
        let data = elf64(&[0; 8], &[symtab], 0);

        let elf = ElfFile::parse(&data).unwrap();
        assert!(elf.symbols.is_empty());
    }

    #[test]
    fn test_symbol_name_offset_overflow() {
        let mut entry = [0u8; 24];
        entry[..4].copy_from_slice(&u32::MAX.to_le_bytes());
        entry[4] = STT_FUNC;
        entry[8..16].copy_from_slice(&0x1234u64.to_le_bytes());
        let symtab = Section { link: 2, entsize: 24, ..section(SHT_SYMTAB, 64, 24) };
        let strtab = section(SHT_STRTAB, u64::MAX - 1, 8);
        let data = elf64(&entry, &[symtab, strtab], 0);

        let elf = ElfFile::parse(&data).unwrap();
        assert_eq!(elf.symbols.len(), 1);
        assert_eq!(elf.symbols[0].name, "");
        assert_eq!(elf.symbols[0].value, 0x1234);
    }

    #[test]
    fn test_symbols_resolve() {
        let mut payload = vec![0u8; 24];
        payload[..4].copy_from_slice(&1u32.to_le_bytes());
        payload[4] = STT_FUNC;
        payload[8..16].copy_from_slice(&0x4010u64.to_le_bytes());
        payload.extend_from_slice(b"\0yylex\0");
        let symtab = Section { link: 2, entsize: 24, ..section(SHT_SYMTAB, 64, 24) };
        let strtab = section(SHT_STRTAB, 64 + 24, 7);
        let data = elf64(&payload, &[symtab, strtab], 0);

        let elf = ElfFile::parse(&data).unwrap();
        assert_eq!(elf.lookup_function("yylex"), Some(0x4010));
    }

    #[test]
    fn test_section_header_table_past_end() {
        let mut data = elf64(&[], &[], 0);
        data[40..48].copy_from_slice(&(u64::MAX - 8).to_le_bytes());
        assert!(matches!(ElfFile::parse(&data), Err(ElfError::SectionOutOfBounds)));
    }

    #[test]
    fn test_get_elf_address_bits_32() {
        let data = [0x7F, 0x45, 0x4C, 0x46, 0x01, 0x01, 0x01, 0x00];
        assert_eq!(get_elf_address_bits(&data).unwrap(), 32);
    }

    #[test]
    fn test_get_elf_address_bits_64() {
        let data = [0x7F, 0x45, 0x4C, 0x46, 0x02, 0x01, 0x01, 0x00];
        assert_eq!(get_elf_address_bits(&data).unwrap(), 64);
    }

    #[test]
    fn test_invalid_magic() {
        let data = [0x00, 0x00, 0x00, 0x00, 0x02];
        assert!(matches!(get_elf_address_bits(&data), Err(ElfError::InvalidMagic)));
    }

    #[test]
    fn test_unsupported_encoding() {
        let mut data = vec![0u8; 64];
        data[..4].copy_from_slice(&ELF_MAGIC);
        data[4] = ELF_CLASS_64;
        data[5] = 7;
        assert!(matches!(ElfFile::parse(&data), Err(ElfError::UnsupportedEncoding(7))));
    }

    #[test]
    fn test_truncated_header() {
        let mut data = vec![0u8; 40];
        data[..4].copy_from_slice(&ELF_MAGIC);
        data[4] = ELF_CLASS_64;
        data[5] = ELF_DATA_LSB;
        assert!(matches!(ElfFile::parse(&data), Err(ElfError::TooSmall)));
    }
}
