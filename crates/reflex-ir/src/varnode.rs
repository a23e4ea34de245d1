//! Varnodes: the storage locations and constants p-code operates on.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::IrError;

/// Address space a varnode lives in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "&'static str")]
pub enum Space {
    /// Constant space: the offset is the literal value.
    Const,
    /// Processor registers.
    Register,
    /// Decompiler temporaries.
    Unique,
    /// Default data/code space of the program.
    Ram,
    /// Stack frame of the function.
    Stack,
    /// Values split across several storage locations.
    Join,
}

impl Space {
    /// Space name as printed in listings.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Const => "const",
            Self::Register => "register",
            Self::Unique => "unique",
            Self::Ram => "ram",
            Self::Stack => "stack",
            Self::Join => "join",
        }
    }
}

impl fmt::Display for Space {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Space {
    type Err = IrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "const" => Ok(Self::Const),
            "register" => Ok(Self::Register),
            "unique" => Ok(Self::Unique),
            "ram" => Ok(Self::Ram),
            "stack" => Ok(Self::Stack),
            "join" => Ok(Self::Join),
            other => Err(IrError::UnknownSpace(other.to_string())),
        }
    }
}

impl TryFrom<String> for Space {
    type Error = IrError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Space> for &'static str {
    fn from(space: Space) -> Self {
        space.name()
    }
}

/// Per-function varnode identity assigned by the decompiler.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VarnodeId(pub u32);

impl fmt::Display for VarnodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A varnode referenced by a p-code operation.
///
/// Varnodes without an `id` are raw operands the decompiler never tracked
/// (they carry no def-use information and are ignored by the graph).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Varnode {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<VarnodeId>,
    pub space: Space,
    pub offset: u64,
    pub size: u32,
    /// Address of the instruction defining this varnode, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pc: Option<u64>,
}

impl Varnode {
    /// Create a tracked varnode.
    pub const fn new(id: u32, space: Space, offset: u64, size: u32) -> Self {
        Self {
            id: Some(VarnodeId(id)),
            space,
            offset,
            size,
            pc: None,
        }
    }

    /// Create a tracked constant.
    pub const fn constant(id: u32, value: u64, size: u32) -> Self {
        Self::new(id, Space::Const, value, size)
    }

    /// Create an untracked (raw) operand.
    pub const fn raw(space: Space, offset: u64, size: u32) -> Self {
        Self {
            id: None,
            space,
            offset,
            size,
            pc: None,
        }
    }

    /// Set the defining instruction address.
    #[must_use]
    pub const fn with_pc(mut self, pc: u64) -> Self {
        self.pc = Some(pc);
        self
    }

    /// Check if this varnode is a constant.
    pub fn is_constant(&self) -> bool {
        self.space == Space::Const
    }

    /// Literal value for constants.
    pub fn constant_value(&self) -> Option<u64> {
        self.is_constant().then_some(self.offset)
    }

    /// Storage location name, e.g. `register:0x20`.
    pub fn location(&self) -> String {
        format!("{}:0x{:x}", self.space, self.offset)
    }
}

impl fmt::Display for Varnode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, 0x{:x}, {})", self.space, self.offset, self.size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let vn = Varnode::constant(3, 0x601000, 8);
        assert_eq!(vn.to_string(), "(const, 0x601000, 8)");
        assert_eq!(vn.location(), "const:0x601000");
        assert_eq!(vn.constant_value(), Some(0x601000));
    }

    #[test]
    fn test_register_is_not_constant() {
        let vn = Varnode::new(1, Space::Register, 0x20, 8);
        assert!(!vn.is_constant());
        assert_eq!(vn.constant_value(), None);
    }

    #[test]
    fn test_deserialize_untracked() {
        let vn: Varnode =
            serde_json::from_str(r#"{"space": "const", "offset": 433, "size": 4}"#).unwrap();
        assert_eq!(vn.id, None);
        assert_eq!(vn.space, Space::Const);
    }

    #[test]
    fn test_deserialize_unknown_space() {
        let err = serde_json::from_str::<Varnode>(
            r#"{"id": 1, "space": "mystery", "offset": 0, "size": 4}"#,
        );
        assert!(err.is_err());
    }
}
