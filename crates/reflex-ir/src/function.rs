//! Decompiled function: the p-code listing of one function.

use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::op::PcodeOp;
use crate::Result;

/// P-code of one decompiled function, in the decompiler's iteration order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionIr {
    /// Function name, if the host knows it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Entry point address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry: Option<u64>,
    pub ops: Vec<PcodeOp>,
}

impl FunctionIr {
    /// Create a listing from a sequence of operations.
    pub const fn new(ops: Vec<PcodeOp>) -> Self {
        Self {
            name: None,
            entry: None,
            ops,
        }
    }

    /// Set the function name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Parse a JSON listing.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read a JSON listing.
    pub fn from_reader(reader: impl Read) -> Result<Self> {
        Ok(serde_json::from_reader(reader)?)
    }

    /// Load a JSON listing from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(std::io::BufReader::new(file))
    }

    /// Serialize as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Number of operations.
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Check if the listing is empty.
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}
