//! Node and edge attributes.
//!
//! Attribute kinds form a closed set; every node and edge stores its values
//! in a fixed array indexed by the kind.

use std::fmt;

macro_rules! attr_kinds {
    ($($variant:ident => $name:literal),+ $(,)?) => {
        /// Attribute kind.
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum AttrKind {
            $($variant,)+
        }

        impl AttrKind {
            /// Every kind, in declaration order.
            pub const ALL: &'static [Self] = &[$(Self::$variant,)+];

            /// Number of kinds.
            pub const COUNT: usize = Self::ALL.len();

            /// Upper-case kind name.
            pub const fn name(self) -> &'static str {
                match self {
                    $(Self::$variant => $name,)+
                }
            }
        }
    };
}

attr_kinds! {
    Address => "ADDRESS",
    PcAddress => "PC_ADDRESS",
    FileOffset => "FILE_OFFSET",
    CouldBeTable => "COULD_BE_TABLE",
    IsOp => "IS_OP",
    IsVarnode => "IS_VARNODE",
    IsInput => "IS_INPUT",
    IsSink => "IS_SINK",
    IsSource => "IS_SOURCE",
    ConstValue => "CONST_VALUE",
    Size => "SIZE",
    Op => "OP",
    Name => "NAME",
    OpMnemonic => "OP_MNEMONIC",
    OpSize => "OP_SIZE",
    AsString => "AS_STRING",
    // Edges
    Order => "ORDER",
}

impl AttrKind {
    /// Position in an [`Attributes`] array.
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Diagnostic-only kinds never leave the process.
    pub const fn is_diagnostic(self) -> bool {
        matches!(self, Self::AsString)
    }
}

impl fmt::Display for AttrKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Attribute value.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum AttrValue {
    Bool(bool),
    Int(u64),
    Str(String),
}

impl AttrValue {
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub const fn as_int(&self) -> Option<u64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Str(s) => f.write_str(s),
        }
    }
}

impl From<bool> for AttrValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<u64> for AttrValue {
    fn from(value: u64) -> Self {
        Self::Int(value)
    }
}

impl From<u32> for AttrValue {
    fn from(value: u32) -> Self {
        Self::Int(u64::from(value))
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

/// Attribute map with one slot per [`AttrKind`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Attributes {
    slots: [Option<AttrValue>; AttrKind::COUNT],
}

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, kind: AttrKind) -> Option<&AttrValue> {
        self.slots[kind.index()].as_ref()
    }

    pub fn contains(&self, kind: AttrKind) -> bool {
        self.slots[kind.index()].is_some()
    }

    pub fn get_bool(&self, kind: AttrKind) -> Option<bool> {
        self.get(kind).and_then(AttrValue::as_bool)
    }

    pub fn get_int(&self, kind: AttrKind) -> Option<u64> {
        self.get(kind).and_then(AttrValue::as_int)
    }

    pub fn get_str(&self, kind: AttrKind) -> Option<&str> {
        self.get(kind).and_then(AttrValue::as_str)
    }

    /// Check if a boolean flag is set to `true`.
    pub fn is_set(&self, kind: AttrKind) -> bool {
        self.get_bool(kind) == Some(true)
    }

    /// Set a value, replacing any previous one.
    pub fn set(&mut self, kind: AttrKind, value: impl Into<AttrValue>) {
        self.slots[kind.index()] = Some(value.into());
    }

    /// Set a value if present; leaves the slot untouched otherwise.
    pub fn set_opt<V: Into<AttrValue>>(&mut self, kind: AttrKind, value: Option<V>) {
        if let Some(value) = value {
            self.set(kind, value);
        }
    }

    pub fn remove(&mut self, kind: AttrKind) -> Option<AttrValue> {
        self.slots[kind.index()].take()
    }

    /// Copy every value set in `other` over this map.
    pub fn overwrite_from(&mut self, other: &Self) {
        for (slot, value) in self.slots.iter_mut().zip(&other.slots) {
            if value.is_some() {
                slot.clone_from(value);
            }
        }
    }

    /// Set values in kind order.
    pub fn iter(&self) -> impl Iterator<Item = (AttrKind, &AttrValue)> + '_ {
        AttrKind::ALL
            .iter()
            .zip(&self.slots)
            .filter_map(|(kind, slot)| slot.as_ref().map(|value| (*kind, value)))
    }

    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }
}
