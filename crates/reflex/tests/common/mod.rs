//! Synthetic scanner fixtures shared by the integration tests.

#![allow(dead_code)]

use reflex::{FunctionIr, NodeId, Opcode, PcodeOp, Space, Varnode, VarnodeId};

pub const RODATA: u64 = 0x601000;
pub const OUT: u32 = 70;

pub fn table_address(i: u32) -> u64 {
    RODATA + u64::from(i) * 0x100
}

pub fn unique(id: u32) -> Varnode {
    Varnode::new(id, Space::Unique, u64::from(id) * 8, 8)
}

pub fn value(id: u32) -> NodeId {
    NodeId::Value(VarnodeId(id))
}

/// `tables` lookups `yy_X[idx]` summed into a register through a copy,
/// plus an INDIRECT memory effect on the side.
pub fn scanner(tables: u32) -> FunctionIr {
    let idx = Varnode::new(50, Space::Register, 0x10, 8);
    let mut ops = Vec::new();

    for i in 0..tables {
        ops.push(
            PcodeOp::with_output(
                Opcode::IntAdd,
                vec![Varnode::constant(i + 1, table_address(i), 8), idx.clone()],
                unique(11 + i),
            )
            .at(0x401000 + u64::from(i) * 8),
        );
        ops.push(PcodeOp::with_output(
            Opcode::Load,
            vec![Varnode::constant(31 + i, 0x1b1, 4), unique(11 + i)],
            unique(21 + i),
        ));
    }

    sum_into_out(&mut ops, tables);
    ops.push(PcodeOp::with_output(
        Opcode::Indirect,
        vec![
            Varnode::new(80, Space::Ram, 0x603000, 8),
            Varnode::constant(82, 5, 4),
        ],
        Varnode::new(81, Space::Ram, 0x603000, 8),
    ));

    FunctionIr::new(ops).with_name("yylex")
}

/// `tables` loads straight from each table's base address, summed into a
/// register through a copy.
pub fn direct_scanner(tables: u32) -> FunctionIr {
    let mut ops = Vec::new();
    for i in 0..tables {
        ops.push(
            PcodeOp::with_output(
                Opcode::Load,
                vec![Varnode::constant(31 + i, 0x1b1, 4), Varnode::constant(i + 1, table_address(i), 8)],
                unique(21 + i),
            )
            .at(0x402000 + u64::from(i) * 4),
        );
    }
    sum_into_out(&mut ops, tables);
    FunctionIr::new(ops).with_name("yylex")
}

/// Add up `unique(21..21 + tables)` and copy the total to register `OUT`.
fn sum_into_out(ops: &mut Vec<PcodeOp>, tables: u32) {
    let mut acc = unique(21);
    for i in 1..tables {
        let next = unique(60 + i);
        ops.push(PcodeOp::with_output(Opcode::IntAdd, vec![acc, unique(21 + i)], next.clone()));
        acc = next;
    }
    ops.push(PcodeOp::with_output(
        Opcode::Copy,
        vec![acc],
        Varnode::new(OUT, Space::Register, 0, 8),
    ));
}
