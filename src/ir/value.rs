//! Values and their use lists.
//!
//! Every consumable thing in a [`Function`](crate::ir::Function) is a [`Value`]:
//! instruction results, arguments, phi results, constants and upvalues. Each
//! value records who consumes it as a multiset of [`User`]s, so that
//! replacing a value is one pass over its users and destroying a value can be
//! refused while consumers remain.

use std::{collections::BTreeMap, fmt};

use crate::ir::{ConstantId, InstId, PhiId};

/// A strongly-typed value identifier.
///
/// Value identifiers are arena indices into the owning function and stay
/// stable when other values are destroyed.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ValueId(pub(crate) usize);

impl ValueId {
    /// Creates a value identifier from an arena index.
    #[must_use]
    #[inline]
    pub const fn new(index: usize) -> Self {
        ValueId(index)
    }

    /// Returns the underlying arena index.
    #[must_use]
    #[inline]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Debug for ValueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ValueId({})", self.0)
    }
}

impl fmt::Display for ValueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// The storage class of a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum ValueKind {
    /// An ordinary first-class value; the only kind that occupies a slot.
    Value,
    /// A multi-value result (call results, varargs).
    Tuple,
    /// A mutable cell. Read and written through `get_ref`/`set_ref`.
    Reference,
}

/// How an upvalue was captured by its function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Capture {
    /// Captured by address; behaves like a [`ValueKind::Reference`].
    Open,
    /// Captured by copy; behaves like a [`ValueKind::Value`].
    Closed,
}

impl Capture {
    /// Returns the value kind an upvalue of this capture mode has.
    #[must_use]
    pub const fn kind(self) -> ValueKind {
        match self {
            Capture::Open => ValueKind::Reference,
            Capture::Closed => ValueKind::Value,
        }
    }
}

/// Where a value comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueDef {
    /// Result of an instruction.
    Instruction(InstId),
    /// The n-th declared argument of the function.
    Argument(usize),
    /// Result of a phi node.
    Phi(PhiId),
    /// An interned module constant.
    Constant(ConstantId),
    /// The n-th upvalue of the given capture mode.
    Upvalue(Capture, usize),
}

impl ValueDef {
    /// Returns `true` if the value is a candidate for a storage slot.
    ///
    /// Constants and upvalues live outside the slot frame.
    #[must_use]
    pub const fn is_slot_resident(&self) -> bool {
        matches!(
            self,
            ValueDef::Instruction(_) | ValueDef::Argument(_) | ValueDef::Phi(_)
        )
    }
}

/// A consumer of a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum User {
    /// An instruction consumes the value as an operand.
    Inst(InstId),
    /// A phi consumes the value as a source.
    Phi(PhiId),
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            User::Inst(inst) => write!(f, "{inst}"),
            User::Phi(phi) => write!(f, "{phi}"),
        }
    }
}

/// A value together with its use multiset.
#[derive(Debug, Clone)]
pub struct Value {
    kind: ValueKind,
    def: ValueDef,
    /// Each consumer with the number of times it consumes this value.
    users: BTreeMap<User, usize>,
}

impl Value {
    pub(crate) fn new(kind: ValueKind, def: ValueDef) -> Self {
        Self {
            kind,
            def,
            users: BTreeMap::new(),
        }
    }

    /// Returns the storage class of the value.
    #[must_use]
    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    /// Returns the definition site of the value.
    #[must_use]
    pub fn def(&self) -> ValueDef {
        self.def
    }

    /// Iterates over each distinct consumer and its multiplicity.
    pub fn users(&self) -> impl Iterator<Item = (User, usize)> + '_ {
        self.users.iter().map(|(&user, &count)| (user, count))
    }

    /// Returns the number of distinct consumers.
    #[must_use]
    pub fn unique_users(&self) -> usize {
        self.users.len()
    }

    /// Returns the total number of uses, counting multiplicity.
    #[must_use]
    pub fn use_count(&self) -> usize {
        self.users.values().sum()
    }

    /// Returns `true` if nothing consumes this value.
    #[must_use]
    pub fn is_unused(&self) -> bool {
        self.users.is_empty()
    }

    /// Returns how many times `user` consumes this value.
    #[must_use]
    pub fn uses_by(&self, user: User) -> usize {
        self.users.get(&user).copied().unwrap_or(0)
    }

    pub(crate) fn add_use(&mut self, user: User, count: usize) {
        if count > 0 {
            *self.users.entry(user).or_insert(0) += count;
        }
    }

    /// Drops one use by `user`. Returns `false` if `user` held no use.
    pub(crate) fn remove_use(&mut self, user: User) -> bool {
        match self.users.get_mut(&user) {
            Some(count) if *count > 1 => {
                *count -= 1;
                true
            }
            Some(_) => {
                self.users.remove(&user);
                true
            }
            None => false,
        }
    }

    /// Drops every use by `user`, returning how many there were.
    pub(crate) fn take_uses(&mut self, user: User) -> usize {
        self.users.remove(&user).unwrap_or(0)
    }
}
