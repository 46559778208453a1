//! Shared fixtures for unit tests.
//!
//! - [`EdgeListGraph`] - a minimal graph for exercising the generic algorithms
//! - `build_*` - small functions covering the control-flow shapes the
//!   analyses care about (diamond, ternary assignment, loops, irreducible)

#![allow(dead_code)]

use crate::{
    ir::{BinaryOp, ConstantPool, Function, InstId, Literal, ValueId},
    utils::graph::{GraphBase, NodeId, Predecessors, RootedGraph, Successors},
};

/// Graph built from an explicit edge list. Node 0 is the entry.
pub struct EdgeListGraph {
    successors: Vec<Vec<NodeId>>,
    predecessors: Vec<Vec<NodeId>>,
}

impl EdgeListGraph {
    pub fn new(node_count: usize, edges: &[(usize, usize)]) -> Self {
        let mut successors = vec![Vec::new(); node_count];
        let mut predecessors: Vec<Vec<NodeId>> = vec![Vec::new(); node_count];
        for &(from, to) in edges {
            successors[from].push(NodeId::new(to));
            if !predecessors[to].contains(&NodeId::new(from)) {
                predecessors[to].push(NodeId::new(from));
            }
        }
        Self {
            successors,
            predecessors,
        }
    }
}

impl GraphBase for EdgeListGraph {
    fn node_count(&self) -> usize {
        self.successors.len()
    }

    fn node_ids(&self) -> impl Iterator<Item = NodeId> {
        (0..self.successors.len()).map(NodeId::new)
    }
}

impl Successors for EdgeListGraph {
    fn successors(&self, node: NodeId) -> impl Iterator<Item = NodeId> {
        self.successors[node.index()].iter().copied()
    }
}

impl Predecessors for EdgeListGraph {
    fn predecessors(&self, node: NodeId) -> impl Iterator<Item = NodeId> {
        self.predecessors[node.index()].iter().copied()
    }
}

impl RootedGraph for EdgeListGraph {
    fn entry(&self) -> NodeId {
        NodeId::new(0)
    }
}

/// `b0 -> {b1, b2} -> b3`, branching on argument `cond`.
pub struct DiamondFixture {
    pub func: Function,
    pub cond: ValueId,
    pub left: NodeId,
    pub right: NodeId,
    pub join: NodeId,
}

pub fn build_diamond() -> DiamondFixture {
    let mut func = Function::new("diamond");
    let entry = func.entry();
    let left = func.add_block();
    let right = func.add_block();
    let join = func.add_block();
    let cond = func.add_argument();

    func.cond_branch(entry, cond, left, right).unwrap();
    func.branch(left, join).unwrap();
    func.branch(right, join).unwrap();
    func.ret(join, &[]).unwrap();

    DiamondFixture {
        func,
        cond,
        left,
        right,
        join,
    }
}

/// `local x = nil; if cond then x = 2 else x = 3 end; return x`
pub struct TernaryFixture {
    pub func: Function,
    pub pool: ConstantPool,
    pub cell: ValueId,
    pub cell_inst: InstId,
    pub nil: ValueId,
    pub two: ValueId,
    pub three: ValueId,
    pub left: NodeId,
    pub right: NodeId,
    pub join: NodeId,
}

pub fn build_ternary() -> TernaryFixture {
    let mut pool = ConstantPool::new();
    let mut func = Function::new("ternary");
    let entry = func.entry();
    let left = func.add_block();
    let right = func.add_block();
    let join = func.add_block();
    let cond = func.add_argument();

    let nil = func.constant(&mut pool, Literal::Nil);
    let two = func.constant(&mut pool, 2i64);
    let three = func.constant(&mut pool, 3i64);

    let cell = func.new_ref(entry, nil).unwrap();
    let cell_inst = func.block(entry).unwrap().instructions()[0];
    func.cond_branch(entry, cond, left, right).unwrap();

    func.set_ref(left, cell, two).unwrap();
    func.branch(left, join).unwrap();

    func.set_ref(right, cell, three).unwrap();
    func.branch(right, join).unwrap();

    let x = func.get_ref(join, cell).unwrap();
    func.ret(join, &[x]).unwrap();

    TernaryFixture {
        func,
        pool,
        cell,
        cell_inst,
        nil,
        two,
        three,
        left,
        right,
        join,
    }
}

/// `b0 -> header; header -> {body, exit}; body -> header`
pub struct LoopFixture {
    pub func: Function,
    pub cond: ValueId,
    pub header: NodeId,
    pub body: NodeId,
    pub exit: NodeId,
}

pub fn build_loop() -> LoopFixture {
    let mut func = Function::new("loop");
    let entry = func.entry();
    let header = func.add_block();
    let body = func.add_block();
    let exit = func.add_block();
    let cond = func.add_argument();

    func.branch(entry, header).unwrap();
    func.cond_branch(header, cond, body, exit).unwrap();
    func.branch(body, header).unwrap();
    func.ret(exit, &[]).unwrap();

    LoopFixture {
        func,
        cond,
        header,
        body,
        exit,
    }
}

/// `local i = 0; while i < 10 do i = i + 1 end; return i`
pub struct CounterFixture {
    pub func: Function,
    pub pool: ConstantPool,
    pub cell: ValueId,
    pub zero: ValueId,
    pub header: NodeId,
    pub body: NodeId,
    pub exit: NodeId,
    /// `i + 1`, stored back into the cell at the end of the body
    pub incremented: ValueId,
}

pub fn build_counter() -> CounterFixture {
    let mut pool = ConstantPool::new();
    let mut func = Function::new("counter");
    let entry = func.entry();
    let header = func.add_block();
    let body = func.add_block();
    let exit = func.add_block();

    let zero = func.constant(&mut pool, 0i64);
    let one = func.constant(&mut pool, 1i64);
    let ten = func.constant(&mut pool, 10i64);

    let cell = func.new_ref(entry, zero).unwrap();
    func.branch(entry, header).unwrap();

    let current = func.get_ref(header, cell).unwrap();
    let cond = func.binary(header, BinaryOp::Lt, current, ten).unwrap();
    func.cond_branch(header, cond, body, exit).unwrap();

    let before = func.get_ref(body, cell).unwrap();
    let incremented = func.binary(body, BinaryOp::Add, before, one).unwrap();
    func.set_ref(body, cell, incremented).unwrap();
    func.branch(body, header).unwrap();

    let result = func.get_ref(exit, cell).unwrap();
    func.ret(exit, &[result]).unwrap();

    CounterFixture {
        func,
        pool,
        cell,
        zero,
        header,
        body,
        exit,
        incremented,
    }
}

/// `while true do end` after the loop test was folded to a plain branch:
/// `b0 -> header -> body -> header`.
pub struct WhileTrueFixture {
    pub func: Function,
    pub header: NodeId,
    pub body: NodeId,
}

pub fn build_while_true() -> WhileTrueFixture {
    let mut func = Function::new("while_true");
    let entry = func.entry();
    let header = func.add_block();
    let body = func.add_block();

    func.branch(entry, header).unwrap();
    func.branch(header, body).unwrap();
    func.branch(body, header).unwrap();

    WhileTrueFixture { func, header, body }
}

/// Two-entry cycle: `b0 -> {b1, b2}`, `b1 <-> b2`, `b1 -> b3`.
pub struct IrreducibleFixture {
    pub func: Function,
    pub a: NodeId,
    pub b: NodeId,
    pub exit: NodeId,
}

pub fn build_irreducible() -> IrreducibleFixture {
    let mut func = Function::new("irreducible");
    let entry = func.entry();
    let a = func.add_block();
    let b = func.add_block();
    let exit = func.add_block();
    let cond = func.add_argument();

    func.cond_branch(entry, cond, a, b).unwrap();
    func.cond_branch(a, cond, b, exit).unwrap();
    func.branch(b, a).unwrap();
    func.ret(exit, &[]).unwrap();

    IrreducibleFixture { func, a, b, exit }
}
