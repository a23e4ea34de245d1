//! Element reads from the scanner binary.

use crate::tables::{Endianness, FlexTables, TableKind};
use crate::{DfaError, Result};

/// Reads table elements out of the raw file bytes.
#[derive(Clone, Copy, Debug)]
pub struct TableReader<'a> {
    data: &'a [u8],
    tables: FlexTables,
}

impl<'a> TableReader<'a> {
    pub const fn new(data: &'a [u8], tables: FlexTables) -> Self {
        Self { data, tables }
    }

    pub const fn tables(&self) -> &FlexTables {
        &self.tables
    }

    /// Read element `index` of `kind`, zero-extended.
    pub fn read(&self, kind: TableKind, index: u64) -> Result<u32> {
        let table = self.tables.get(kind);
        let out_of_bounds = |offset| DfaError::OutOfBounds {
            table: kind,
            index,
            offset,
        };

        let offset = table.element_offset(index).ok_or_else(|| out_of_bounds(u64::MAX))?;
        let start = usize::try_from(offset).map_err(|_| out_of_bounds(offset))?;
        let end = start
            .checked_add(usize::from(table.size))
            .ok_or_else(|| out_of_bounds(offset))?;
        let bytes = self.data.get(start..end).ok_or_else(|| out_of_bounds(offset))?;

        let mut buf = [0u8; 4];
        let value = match self.tables.endianness {
            Endianness::Little => {
                buf[..bytes.len()].copy_from_slice(bytes);
                u32::from_le_bytes(buf)
            }
            Endianness::Big => {
                buf[4 - bytes.len()..].copy_from_slice(bytes);
                u32::from_be_bytes(buf)
            }
        };
        Ok(value)
    }

    pub fn accept(&self, state: u32) -> Result<u32> {
        self.read(TableKind::Accept, u64::from(state))
    }

    pub fn base(&self, state: u32) -> Result<u32> {
        self.read(TableKind::Base, u64::from(state))
    }

    pub fn chk(&self, index: u64) -> Result<u32> {
        self.read(TableKind::Chk, index)
    }

    pub fn def(&self, state: u32) -> Result<u32> {
        self.read(TableKind::Def, u64::from(state))
    }

    pub fn ec(&self, byte: u8) -> Result<u32> {
        self.read(TableKind::Ec, u64::from(byte))
    }

    pub fn meta(&self, class: u32) -> Result<u32> {
        self.read(TableKind::Meta, u64::from(class))
    }

    pub fn nxt(&self, index: u64) -> Result<u32> {
        self.read(TableKind::Nxt, index)
    }
}
