//! Attribute extraction for graph nodes.

use reflex_ir::{MemoryMap, PcodeOp, Varnode};

use crate::attrs::{AttrKind, Attributes};

/// How a value node was reached from an operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValueUse {
    /// Read by the operation.
    Input,
    /// Written by the operation.
    Definition,
}

/// Computes node attributes against the program's memory map.
///
/// Extraction only ever overwrites slots, so running it again for a node
/// that is referenced several times leaves the same values in place.
#[derive(Clone, Copy, Debug)]
pub struct AttributeExtractor<'a> {
    memory: &'a MemoryMap,
}

impl<'a> AttributeExtractor<'a> {
    pub const fn new(memory: &'a MemoryMap) -> Self {
        Self { memory }
    }

    /// Address a constant varnode points to, if it lands in a table region.
    pub fn resolve_address(&self, vn: &Varnode) -> Option<u64> {
        self.memory.resolve_constant(vn)
    }

    /// Populate a value node's attributes for one reference to it.
    pub fn extract_value(&self, attrs: &mut Attributes, vn: &Varnode, usage: ValueUse) {
        let address = self.resolve_address(vn);

        attrs.set(AttrKind::IsVarnode, true);
        // Recorded for the first reference only.
        if !attrs.contains(AttrKind::IsInput) {
            attrs.set(AttrKind::IsInput, usage == ValueUse::Input);
        }
        attrs.set(AttrKind::AsString, vn.to_string());
        attrs.set(AttrKind::Name, vn.location());
        attrs.set(AttrKind::Size, vn.size);
        attrs.set_opt(AttrKind::Address, address);
        attrs.set_opt(AttrKind::PcAddress, vn.pc);
        attrs.set_opt(AttrKind::ConstValue, vn.constant_value());
        attrs.set_opt(
            AttrKind::FileOffset,
            address.and_then(|addr| self.memory.file_offset(addr)),
        );

        if usage == ValueUse::Input {
            attrs.set(AttrKind::CouldBeTable, address.is_some());
        }
    }

    /// Populate the attributes of the value `op` writes.
    ///
    /// A definition without its own instruction address takes the op's.
    pub fn extract_definition(&self, attrs: &mut Attributes, vn: &Varnode, op: &PcodeOp) {
        self.extract_value(attrs, vn, ValueUse::Definition);
        if vn.pc.is_none() {
            attrs.set_opt(AttrKind::PcAddress, op.pc);
        }
    }

    /// Populate an operation node's attributes.
    pub fn extract_op(&self, attrs: &mut Attributes, op: &PcodeOp) {
        attrs.set(AttrKind::IsOp, true);
        attrs.set(AttrKind::AsString, op.to_string());
        attrs.set(AttrKind::Op, op.opcode.code());
        attrs.set(AttrKind::OpMnemonic, op.mnemonic());
        attrs.set_opt(AttrKind::OpSize, op.output.as_ref().map(|out| out.size));
    }
}
