//! Compilation units.

use std::fmt;

use crate::{
    ir::{ConstantPool, Function, Literal, ValueId},
    Error, Result,
};

/// Identifier of a function within its [`Module`].
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FunctionId(pub(crate) usize);

impl FunctionId {
    /// Creates a function identifier from an index.
    #[must_use]
    pub const fn new(index: usize) -> Self {
        FunctionId(index)
    }

    /// Returns the underlying index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Debug for FunctionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FunctionId({})", self.0)
    }
}

impl fmt::Display for FunctionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "f{}", self.0)
    }
}

/// The functions of one compilation unit plus their shared constant pool.
#[derive(Debug, Clone, Default)]
pub struct Module {
    constants: ConstantPool,
    functions: Vec<Function>,
}

impl Module {
    /// Creates an empty module.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a function, returning its id.
    pub fn add_function(&mut self, function: Function) -> FunctionId {
        self.functions.push(function);
        FunctionId(self.functions.len() - 1)
    }

    /// Returns a function.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FunctionNotFound`] for unknown ids.
    pub fn function(&self, id: FunctionId) -> Result<&Function> {
        self.functions
            .get(id.index())
            .ok_or(Error::FunctionNotFound(id))
    }

    /// Returns a function mutably.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FunctionNotFound`] for unknown ids.
    pub fn function_mut(&mut self, id: FunctionId) -> Result<&mut Function> {
        self.functions
            .get_mut(id.index())
            .ok_or(Error::FunctionNotFound(id))
    }

    /// Iterates over all functions with their ids.
    pub fn functions(&self) -> impl Iterator<Item = (FunctionId, &Function)> {
        self.functions
            .iter()
            .enumerate()
            .map(|(i, f)| (FunctionId(i), f))
    }

    /// Returns all function ids in insertion order.
    #[must_use]
    pub fn function_ids(&self) -> Vec<FunctionId> {
        (0..self.functions.len()).map(FunctionId).collect()
    }

    /// Returns the number of functions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.functions.len()
    }

    /// Returns `true` if the module has no functions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// Returns the constant pool.
    #[must_use]
    pub fn constants(&self) -> &ConstantPool {
        &self.constants
    }

    /// Returns the constant pool mutably.
    pub fn constants_mut(&mut self) -> &mut ConstantPool {
        &mut self.constants
    }

    /// Returns `function`'s value for `literal`, interning it module-wide.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FunctionNotFound`] for unknown ids.
    pub fn constant(&mut self, function: FunctionId, literal: impl Into<Literal>) -> Result<ValueId> {
        let func = self
            .functions
            .get_mut(function.index())
            .ok_or(Error::FunctionNotFound(function))?;
        Ok(func.constant(&mut self.constants, literal))
    }
}
