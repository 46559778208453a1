//! Typed construction helpers.
//!
//! Thin wrappers over [`Function::append`] that encode the operand
//! conventions of each opcode and hand back the produced value directly.

use crate::{
    ir::{BinaryOp, Function, InstId, Opcode, UnaryOp, ValueId},
    utils::graph::NodeId,
    Result,
};

impl Function {
    fn append_value(&mut self, block: NodeId, opcode: Opcode, operands: Vec<ValueId>) -> Result<ValueId> {
        let inst = self.append(block, opcode, operands)?;
        self.instruction(inst)?
            .result()
            .ok_or_else(|| invariant_error!("'{}' produced no value", opcode))
    }

    /// Appends an unconditional branch.
    ///
    /// # Errors
    ///
    /// See [`Function::append`].
    pub fn branch(&mut self, block: NodeId, target: NodeId) -> Result<InstId> {
        self.append(block, Opcode::Branch(target), Vec::new())
    }

    /// Appends a two-way branch on `condition`.
    ///
    /// # Errors
    ///
    /// See [`Function::append`].
    pub fn cond_branch(
        &mut self,
        block: NodeId,
        condition: ValueId,
        if_true: NodeId,
        if_false: NodeId,
    ) -> Result<InstId> {
        self.append(
            block,
            Opcode::CondBranch { if_true, if_false },
            vec![condition],
        )
    }

    /// Appends a return of `values`.
    ///
    /// # Errors
    ///
    /// See [`Function::append`].
    pub fn ret(&mut self, block: NodeId, values: &[ValueId]) -> Result<InstId> {
        self.append(block, Opcode::Return, values.to_vec())
    }

    /// Appends a cell allocation initialized with `initial`, returning the cell.
    ///
    /// # Errors
    ///
    /// See [`Function::append`].
    pub fn new_ref(&mut self, block: NodeId, initial: ValueId) -> Result<ValueId> {
        self.append_value(block, Opcode::NewRef, vec![initial])
    }

    /// Appends a read of `cell`.
    ///
    /// # Errors
    ///
    /// See [`Function::append`]; `cell` must be Reference-kind.
    pub fn get_ref(&mut self, block: NodeId, cell: ValueId) -> Result<ValueId> {
        self.append_value(block, Opcode::GetRef, vec![cell])
    }

    /// Appends a write of `value` into `cell`.
    ///
    /// # Errors
    ///
    /// See [`Function::append`]; `cell` must be Reference-kind.
    pub fn set_ref(&mut self, block: NodeId, cell: ValueId, value: ValueId) -> Result<InstId> {
        self.append(block, Opcode::SetRef, vec![cell, value])
    }

    /// Appends a closure instantiation of prototype `proto`.
    ///
    /// Reference-kind captures are captured by address, anything else by copy.
    ///
    /// # Errors
    ///
    /// See [`Function::append`].
    pub fn closure(&mut self, block: NodeId, proto: u32, captures: &[ValueId]) -> Result<ValueId> {
        self.append_value(block, Opcode::Closure(proto), captures.to_vec())
    }

    /// Appends a binary operation.
    ///
    /// # Errors
    ///
    /// See [`Function::append`].
    pub fn binary(&mut self, block: NodeId, op: BinaryOp, lhs: ValueId, rhs: ValueId) -> Result<ValueId> {
        self.append_value(block, Opcode::Binary(op), vec![lhs, rhs])
    }

    /// Appends a unary operation.
    ///
    /// # Errors
    ///
    /// See [`Function::append`].
    pub fn unary(&mut self, block: NodeId, op: UnaryOp, operand: ValueId) -> Result<ValueId> {
        self.append_value(block, Opcode::Unary(op), vec![operand])
    }

    /// Appends a call, returning its Tuple result.
    ///
    /// # Errors
    ///
    /// See [`Function::append`].
    pub fn call(&mut self, block: NodeId, callee: ValueId, args: &[ValueId]) -> Result<ValueId> {
        let mut operands = Vec::with_capacity(args.len() + 1);
        operands.push(callee);
        operands.extend_from_slice(args);
        self.append_value(block, Opcode::Call, operands)
    }

    /// Appends an access to the variadic arguments.
    ///
    /// In a non-variadic function the access is padded with an empty tuple,
    /// since the front end has already reported the misuse.
    ///
    /// # Errors
    ///
    /// See [`Function::append`].
    pub fn vararg(&mut self, block: NodeId) -> Result<ValueId> {
        if self.is_variadic() {
            self.append_value(block, Opcode::Vararg, Vec::new())
        } else {
            log::debug!(
                "{}: vararg access in non-variadic function, padding with empty tuple",
                self.name()
            );
            self.append_value(block, Opcode::MakeTuple, Vec::new())
        }
    }

    /// Appends a tuple element extraction.
    ///
    /// # Errors
    ///
    /// See [`Function::append`].
    pub fn select(&mut self, block: NodeId, tuple: ValueId, index: u32) -> Result<ValueId> {
        self.append_value(block, Opcode::Select(index), vec![tuple])
    }

    /// Appends a tuple construction.
    ///
    /// # Errors
    ///
    /// See [`Function::append`].
    pub fn make_tuple(&mut self, block: NodeId, elements: &[ValueId]) -> Result<ValueId> {
        self.append_value(block, Opcode::MakeTuple, elements.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use crate::ir::{Function, Opcode, ValueKind};

    #[test]
    fn test_vararg_padding() {
        let mut func = Function::new("f");
        let entry = func.entry();
        let padded = func.vararg(entry).unwrap();
        assert_eq!(func.value(padded).unwrap().kind(), ValueKind::Tuple);

        func.set_variadic(true);
        let real = func.vararg(entry).unwrap();
        let insts = func.block(entry).unwrap().instructions().to_vec();
        assert_eq!(func.instruction(insts[0]).unwrap().opcode(), Opcode::MakeTuple);
        assert_eq!(func.instruction(insts[1]).unwrap().opcode(), Opcode::Vararg);
        assert_ne!(padded, real);
    }

    #[test]
    fn test_call_and_select() {
        let mut func = Function::new("f");
        let entry = func.entry();
        let callee = func.add_argument();
        let arg = func.add_argument();
        let tuple = func.call(entry, callee, &[arg, arg]).unwrap();
        let first = func.select(entry, tuple, 0).unwrap();
        func.ret(entry, &[first]).unwrap();

        assert_eq!(func.value(tuple).unwrap().kind(), ValueKind::Tuple);
        assert_eq!(func.value(arg).unwrap().use_count(), 2);
        func.verify().unwrap();
    }
}
