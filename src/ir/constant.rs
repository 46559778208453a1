//! Module-wide constant interning.
//!
//! Literals are interned once per [`Module`](crate::ir::Module) in a
//! [`ConstantPool`] keyed by literal value, so two functions asking for the
//! literal `2` share one [`ConstantId`]. Each function additionally caches one
//! [`ValueId`](crate::ir::ValueId) per interned constant it uses.

use std::{
    fmt,
    hash::{Hash, Hasher},
    sync::Arc,
};

use rustc_hash::FxHashMap;

/// A literal constant.
///
/// Equality is by value. Floats compare by bit pattern so that `NaN` can be
/// interned and `0.0` and `-0.0` stay distinct.
#[derive(Debug, Clone)]
pub enum Literal {
    /// The absent value.
    Nil,
    /// A boolean.
    Bool(bool),
    /// A 64-bit integer.
    Int(i64),
    /// A 64-bit float.
    Float(f64),
    /// An immutable string.
    Str(Arc<str>),
}

impl PartialEq for Literal {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Literal::Nil, Literal::Nil) => true,
            (Literal::Bool(a), Literal::Bool(b)) => a == b,
            (Literal::Int(a), Literal::Int(b)) => a == b,
            (Literal::Float(a), Literal::Float(b)) => a.to_bits() == b.to_bits(),
            (Literal::Str(a), Literal::Str(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Literal {}

impl Hash for Literal {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Literal::Nil => {}
            Literal::Bool(b) => b.hash(state),
            Literal::Int(i) => i.hash(state),
            Literal::Float(f) => f.to_bits().hash(state),
            Literal::Str(s) => s.hash(state),
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Nil => f.write_str("nil"),
            Literal::Bool(b) => write!(f, "{b}"),
            Literal::Int(i) => write!(f, "{i}"),
            Literal::Float(x) => write!(f, "{x:?}"),
            Literal::Str(s) => write!(f, "{s:?}"),
        }
    }
}

impl From<bool> for Literal {
    fn from(value: bool) -> Self {
        Literal::Bool(value)
    }
}

impl From<i64> for Literal {
    fn from(value: i64) -> Self {
        Literal::Int(value)
    }
}

impl From<f64> for Literal {
    fn from(value: f64) -> Self {
        Literal::Float(value)
    }
}

impl From<&str> for Literal {
    fn from(value: &str) -> Self {
        Literal::Str(Arc::from(value))
    }
}

/// Identifier of an interned constant.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConstantId(pub(crate) u32);

impl ConstantId {
    /// Creates a constant identifier from a pool index.
    #[must_use]
    pub const fn new(index: u32) -> Self {
        ConstantId(index)
    }

    /// Returns the underlying pool index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for ConstantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ConstantId({})", self.0)
    }
}

impl fmt::Display for ConstantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "k{}", self.0)
    }
}

/// Value-keyed table of literals shared by all functions of a module.
#[derive(Debug, Clone, Default)]
pub struct ConstantPool {
    literals: Vec<Literal>,
    index: FxHashMap<Literal, ConstantId>,
}

impl ConstantPool {
    /// Creates an empty pool.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Interns a literal, returning the existing id if an equal literal is
    /// already present.
    pub fn intern(&mut self, literal: impl Into<Literal>) -> ConstantId {
        let literal = literal.into();
        if let Some(&id) = self.index.get(&literal) {
            return id;
        }
        // Pools never approach u32::MAX entries in practice; saturate rather than wrap.
        let id = ConstantId(u32::try_from(self.literals.len()).unwrap_or(u32::MAX));
        self.literals.push(literal.clone());
        self.index.insert(literal, id);
        id
    }

    /// Looks up an already-interned literal without inserting it.
    #[must_use]
    pub fn find(&self, literal: &Literal) -> Option<ConstantId> {
        self.index.get(literal).copied()
    }

    /// Returns the literal for an id.
    #[must_use]
    pub fn get(&self, id: ConstantId) -> Option<&Literal> {
        self.literals.get(id.index())
    }

    /// Returns the number of interned literals.
    #[must_use]
    pub fn len(&self) -> usize {
        self.literals.len()
    }

    /// Returns `true` if nothing has been interned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.literals.is_empty()
    }

    /// Iterates over all interned literals in interning order.
    pub fn iter(&self) -> impl Iterator<Item = (ConstantId, &Literal)> {
        self.literals
            .iter()
            .enumerate()
            .map(|(i, lit)| (ConstantId(i as u32), lit))
    }
}
