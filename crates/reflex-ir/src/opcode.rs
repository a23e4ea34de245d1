//! P-code opcodes.
//!
//! Numeric values follow the decompiler's own numbering so that the `OP`
//! attribute of an exported node can be matched against its listings.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::IrError;

macro_rules! opcodes {
    ($($variant:ident = $code:literal => $mnemonic:literal,)+) => {
        /// A p-code opcode.
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "&'static str")]
        pub enum Opcode {
            $($variant,)+
        }

        impl Opcode {
            /// Every opcode, in numeric order.
            pub const ALL: &'static [Self] = &[$(Self::$variant,)+];

            /// Numeric opcode.
            pub const fn code(self) -> u32 {
                match self {
                    $(Self::$variant => $code,)+
                }
            }

            /// Upper-case mnemonic as printed in p-code listings.
            pub const fn mnemonic(self) -> &'static str {
                match self {
                    $(Self::$variant => $mnemonic,)+
                }
            }

            /// Look up an opcode by number.
            pub const fn from_code(code: u32) -> Option<Self> {
                match code {
                    $($code => Some(Self::$variant),)+
                    _ => None,
                }
            }
        }

        impl FromStr for Opcode {
            type Err = IrError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($mnemonic => Ok(Self::$variant),)+
                    other => Err(IrError::UnknownMnemonic(other.to_string())),
                }
            }
        }
    };
}

opcodes! {
    Copy = 1 => "COPY",
    Load = 2 => "LOAD",
    Store = 3 => "STORE",
    Branch = 4 => "BRANCH",
    CBranch = 5 => "CBRANCH",
    BranchInd = 6 => "BRANCHIND",
    Call = 7 => "CALL",
    CallInd = 8 => "CALLIND",
    CallOther = 9 => "CALLOTHER",
    Return = 10 => "RETURN",
    IntEqual = 11 => "INT_EQUAL",
    IntNotEqual = 12 => "INT_NOTEQUAL",
    IntSLess = 13 => "INT_SLESS",
    IntSLessEqual = 14 => "INT_SLESSEQUAL",
    IntLess = 15 => "INT_LESS",
    IntLessEqual = 16 => "INT_LESSEQUAL",
    IntZExt = 17 => "INT_ZEXT",
    IntSExt = 18 => "INT_SEXT",
    IntAdd = 19 => "INT_ADD",
    IntSub = 20 => "INT_SUB",
    IntCarry = 21 => "INT_CARRY",
    IntSCarry = 22 => "INT_SCARRY",
    IntSBorrow = 23 => "INT_SBORROW",
    Int2Comp = 24 => "INT_2COMP",
    IntNegate = 25 => "INT_NEGATE",
    IntXor = 26 => "INT_XOR",
    IntAnd = 27 => "INT_AND",
    IntOr = 28 => "INT_OR",
    IntLeft = 29 => "INT_LEFT",
    IntRight = 30 => "INT_RIGHT",
    IntSRight = 31 => "INT_SRIGHT",
    IntMult = 32 => "INT_MULT",
    IntDiv = 33 => "INT_DIV",
    IntSDiv = 34 => "INT_SDIV",
    IntRem = 35 => "INT_REM",
    IntSRem = 36 => "INT_SREM",
    BoolNegate = 37 => "BOOL_NEGATE",
    BoolXor = 38 => "BOOL_XOR",
    BoolAnd = 39 => "BOOL_AND",
    BoolOr = 40 => "BOOL_OR",
    FloatEqual = 41 => "FLOAT_EQUAL",
    FloatNotEqual = 42 => "FLOAT_NOTEQUAL",
    FloatLess = 43 => "FLOAT_LESS",
    FloatLessEqual = 44 => "FLOAT_LESSEQUAL",
    FloatNan = 46 => "FLOAT_NAN",
    FloatAdd = 47 => "FLOAT_ADD",
    FloatDiv = 48 => "FLOAT_DIV",
    FloatMult = 49 => "FLOAT_MULT",
    FloatSub = 50 => "FLOAT_SUB",
    FloatNeg = 51 => "FLOAT_NEG",
    FloatAbs = 52 => "FLOAT_ABS",
    FloatSqrt = 53 => "FLOAT_SQRT",
    FloatInt2Float = 54 => "INT2FLOAT",
    FloatFloat2Float = 55 => "FLOAT2FLOAT",
    FloatTrunc = 56 => "TRUNC",
    FloatCeil = 57 => "CEIL",
    FloatFloor = 58 => "FLOOR",
    FloatRound = 59 => "ROUND",
    MultiEqual = 60 => "MULTIEQUAL",
    Indirect = 61 => "INDIRECT",
    Piece = 62 => "PIECE",
    SubPiece = 63 => "SUBPIECE",
    Cast = 64 => "CAST",
    PtrAdd = 65 => "PTRADD",
    PtrSub = 66 => "PTRSUB",
    SegmentOp = 67 => "SEGMENTOP",
    CPoolRef = 68 => "CPOOLREF",
    New = 69 => "NEW",
    Insert = 70 => "INSERT",
    Extract = 71 => "EXTRACT",
    PopCount = 72 => "POPCOUNT",
    LzCount = 73 => "LZCOUNT",
}

impl Opcode {
    /// Check if this is a memory access (first input selects the address space).
    pub const fn is_memory_access(self) -> bool {
        matches!(self, Self::Load | Self::Store)
    }

    /// Check if this is an INDIRECT (second input encodes the affecting op).
    pub const fn is_indirect(self) -> bool {
        matches!(self, Self::Indirect)
    }

    /// Check if this is a plain data copy.
    pub const fn is_copy(self) -> bool {
        matches!(self, Self::Copy)
    }

    /// Whether input `index` carries data rather than effect classification.
    ///
    /// The space selector of LOAD/STORE and the op reference of INDIRECT are
    /// annotations, not dataflow.
    pub const fn is_dataflow_input(self, index: usize) -> bool {
        !((index == 0 && self.is_memory_access()) || (index == 1 && self.is_indirect()))
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

impl TryFrom<String> for Opcode {
    type Error = IrError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Opcode> for &'static str {
    fn from(op: Opcode) -> Self {
        op.mnemonic()
    }
}
