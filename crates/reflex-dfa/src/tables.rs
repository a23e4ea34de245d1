//! Locations of the flex tables in the binary.

use std::fmt;

use crate::{DfaError, Result};

/// Byte order of table elements.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Endianness {
    #[default]
    Little,
    Big,
}

/// The seven tables of a compressed flex scanner.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TableKind {
    /// Rule accepted in each state (0 when not accepting).
    Accept,
    /// Offset of each state's row in `chk`/`nxt`.
    Base,
    /// Owner state of each `nxt` slot.
    Chk,
    /// Fallback state when the owner check fails.
    Def,
    /// Byte to equivalence class.
    Ec,
    /// Equivalence class to meta class, used past the last real state.
    Meta,
    /// Next state.
    Nxt,
}

impl TableKind {
    pub const ALL: [Self; 7] = [
        Self::Accept,
        Self::Base,
        Self::Chk,
        Self::Def,
        Self::Ec,
        Self::Meta,
        Self::Nxt,
    ];

    /// Name as emitted by flex (`yy_accept`, ...).
    pub const fn name(self) -> &'static str {
        match self {
            Self::Accept => "yy_accept",
            Self::Base => "yy_base",
            Self::Chk => "yy_chk",
            Self::Def => "yy_def",
            Self::Ec => "yy_ec",
            Self::Meta => "yy_meta",
            Self::Nxt => "yy_nxt",
        }
    }
}

impl fmt::Display for TableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// File offset and element size of one table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SizedOffset {
    pub offset: u64,
    pub size: u8,
}

impl SizedOffset {
    /// Create a table location; `size` must be 1, 2 or 4.
    pub fn new(offset: u64, size: u8) -> Result<Self> {
        match size {
            1 | 2 | 4 => Ok(Self { offset, size }),
            other => Err(DfaError::UnsupportedElementSize(other)),
        }
    }

    /// File offset of element `index`.
    pub const fn element_offset(&self, index: u64) -> Option<u64> {
        match index.checked_mul(self.size as u64) {
            Some(rel) => self.offset.checked_add(rel),
            None => None,
        }
    }
}

/// Locations of all seven tables.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FlexTables {
    pub accept: SizedOffset,
    pub base: SizedOffset,
    pub chk: SizedOffset,
    pub def: SizedOffset,
    pub ec: SizedOffset,
    pub meta: SizedOffset,
    pub nxt: SizedOffset,
    pub endianness: Endianness,
}

impl FlexTables {
    pub const fn get(&self, kind: TableKind) -> SizedOffset {
        match kind {
            TableKind::Accept => self.accept,
            TableKind::Base => self.base,
            TableKind::Chk => self.chk,
            TableKind::Def => self.def,
            TableKind::Ec => self.ec,
            TableKind::Meta => self.meta,
            TableKind::Nxt => self.nxt,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_sizes() {
        assert!(SizedOffset::new(0x100, 1).is_ok());
        assert!(SizedOffset::new(0x100, 2).is_ok());
        assert!(SizedOffset::new(0x100, 4).is_ok());
        assert!(matches!(
            SizedOffset::new(0x100, 8),
            Err(DfaError::UnsupportedElementSize(8))
        ));
    }

    #[test]
    fn test_element_offset() {
        let table = SizedOffset::new(0x100, 2).unwrap();
        assert_eq!(table.element_offset(3), Some(0x106));
        assert_eq!(table.element_offset(u64::MAX), None);
    }
}
