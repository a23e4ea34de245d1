//! Attribute schema.

use std::fmt;

use reflex_graph::{AttrKind, AttrValue};

/// Serializable attribute type, named as in GraphML `attr.type`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AttrType {
    Boolean,
    Int,
    Long,
    String,
}

impl AttrType {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Boolean => "boolean",
            Self::Int => "int",
            Self::Long => "long",
            Self::String => "string",
        }
    }

    /// Check that `value` can be rendered as this type.
    pub const fn accepts(self, value: &AttrValue) -> bool {
        matches!(
            (self, value),
            (Self::Boolean, AttrValue::Bool(_))
                | (Self::Int | Self::Long, AttrValue::Int(_))
                | (Self::String, AttrValue::Str(_))
        )
    }
}

impl fmt::Display for AttrType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Declared type of an attribute kind; `None` for kinds that are never exported.
pub const fn declared_type(kind: AttrKind) -> Option<AttrType> {
    match kind {
        AttrKind::Address
        | AttrKind::PcAddress
        | AttrKind::FileOffset
        | AttrKind::ConstValue
        | AttrKind::Size
        | AttrKind::Op
        | AttrKind::OpSize => Some(AttrType::Long),
        AttrKind::CouldBeTable
        | AttrKind::IsOp
        | AttrKind::IsVarnode
        | AttrKind::IsInput
        | AttrKind::IsSink
        | AttrKind::IsSource => Some(AttrType::Boolean),
        AttrKind::Name | AttrKind::OpMnemonic => Some(AttrType::String),
        AttrKind::Order => Some(AttrType::Int),
        AttrKind::AsString => None,
    }
}

/// One schema entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SchemaEntry {
    pub kind: AttrKind,
    pub ty: AttrType,
}

impl SchemaEntry {
    /// Key id (the upper-case kind name).
    pub const fn id(&self) -> &'static str {
        self.kind.name()
    }

    /// Lower-case attribute name.
    pub fn attr_name(&self) -> String {
        self.kind.name().to_lowercase()
    }
}

/// Every exportable attribute kind with its type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttrSchema {
    entries: Vec<SchemaEntry>,
}

impl AttrSchema {
    pub fn new() -> Self {
        let entries = AttrKind::ALL
            .iter()
            .filter_map(|&kind| declared_type(kind).map(|ty| SchemaEntry { kind, ty }))
            .collect();
        Self { entries }
    }

    pub fn entries(&self) -> &[SchemaEntry] {
        &self.entries
    }

    pub fn get(&self, kind: AttrKind) -> Option<&SchemaEntry> {
        self.entries.iter().find(|entry| entry.kind == kind)
    }

    pub fn contains(&self, kind: AttrKind) -> bool {
        self.get(kind).is_some()
    }
}

impl Default for AttrSchema {
    fn default() -> Self {
        Self::new()
    }
}
