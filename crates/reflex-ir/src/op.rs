//! Single p-code operation.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::opcode::Opcode;
use crate::varnode::Varnode;

/// One p-code operation of a decompiled function.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PcodeOp {
    pub opcode: Opcode,
    /// Address of the machine instruction this op was lifted from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pc: Option<u64>,
    #[serde(default)]
    pub inputs: Vec<Varnode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Varnode>,
}

impl PcodeOp {
    /// Create an operation without output.
    pub const fn new(opcode: Opcode, inputs: Vec<Varnode>) -> Self {
        Self {
            opcode,
            pc: None,
            inputs,
            output: None,
        }
    }

    /// Create an operation writing `output`.
    pub const fn with_output(opcode: Opcode, inputs: Vec<Varnode>, output: Varnode) -> Self {
        Self {
            opcode,
            pc: None,
            inputs,
            output: Some(output),
        }
    }

    /// Set the instruction address.
    #[must_use]
    pub fn at(mut self, pc: u64) -> Self {
        self.pc = Some(pc);
        self
    }

    /// Mnemonic of the opcode.
    pub const fn mnemonic(&self) -> &'static str {
        self.opcode.mnemonic()
    }

    /// Inputs that carry data, paired with their position.
    pub fn dataflow_inputs(&self) -> impl Iterator<Item = (usize, &Varnode)> + '_ {
        self.inputs
            .iter()
            .enumerate()
            .filter(|(i, _)| self.opcode.is_dataflow_input(*i))
    }
}

impl fmt::Display for PcodeOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(out) = &self.output {
            write!(f, "{out} ")?;
        }
        f.write_str(self.mnemonic())?;
        for (i, input) in self.inputs.iter().enumerate() {
            if i == 0 {
                write!(f, " {input}")?;
            } else {
                write!(f, " , {input}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::varnode::Space;

    #[test]
    fn test_display_load() {
        let op = PcodeOp::with_output(
            Opcode::Load,
            vec![
                Varnode::constant(1, 0x1b1, 4),
                Varnode::constant(2, 0x601000, 8),
            ],
            Varnode::new(3, Space::Unique, 0x100, 4),
        );
        assert_eq!(
            op.to_string(),
            "(unique, 0x100, 4) LOAD (const, 0x1b1, 4) , (const, 0x601000, 8)"
        );
    }

    #[test]
    fn test_dataflow_inputs_skip_space_selector() {
        let op = PcodeOp::new(
            Opcode::Store,
            vec![
                Varnode::constant(1, 0x1b1, 4),
                Varnode::new(2, Space::Register, 0x0, 8),
                Varnode::new(3, Space::Register, 0x8, 8),
            ],
        );
        let positions: Vec<usize> = op.dataflow_inputs().map(|(i, _)| i).collect();
        assert_eq!(positions, vec![1, 2]);
    }
}
