//! Reconstruction of structured control flow.
//!
//! Emitters for textual source or stack bytecode want nested `if`/`loop`
//! constructs, not a raw block graph. [`ControlTree::build`] groups the
//! reachable blocks of a function into [`ControlGroup`]s, each a sequence of
//! [`ControlNode`]s:
//!
//! - `Block` - a basic block's straight-line code
//! - `If` - a two-way branch with a nested body per arm
//! - `Jump` - an explicit transfer to the entry of another group
//!
//! # Algorithm
//!
//! Groups are built from a FIFO worklist of entry blocks, starting at the
//! function entry. From each entry a chain is extended:
//!
//! - an unconditional branch into a block with a single predecessor continues
//!   the chain; any other branch ends it with a `Jump`, and the target becomes
//!   a group entry once the group is finished
//! - a conditional branch builds both arms the same way; if both arms end in
//!   jumps to one block whose only predecessors are the two jump sources, the
//!   jumps are dropped and the chain continues through that join block
//! - a return ends the chain
//!
//! Arms are built with an explicit frame stack, so deeply nested branches do
//! not recurse.
//!
//! Each non-root group is nested under the nearest group whose entry lies on
//! its entry's immediate-dominator chain. A jump whose target dominates its
//! source is a back-edge: it is flagged as a loop tail and the target group
//! as a loop head.
//!
//! Irreducible regions are not an error: convergences that cannot be
//! attached as fall-through stay as plain jumps between groups.

use std::{
    collections::{BTreeMap, BTreeSet, VecDeque},
    fmt,
};

use crate::{
    analysis::Dominance,
    ir::{Function, Opcode, ValueId},
    utils::{
        graph::{GraphBase, NodeId},
        BitSet,
    },
    Result,
};

/// Index of a group inside a [`ControlTree`].
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GroupId(usize);

impl GroupId {
    /// Creates a group handle from a raw index.
    #[must_use]
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    /// Returns the raw index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Debug for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "g{}", self.0)
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "g{}", self.0)
    }
}

/// An explicit transfer of control to a group entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Jump {
    /// Block whose terminator takes the edge.
    pub source: NodeId,
    /// Entry block of the target group.
    pub target: NodeId,
    /// The jump closes a loop: its target dominates its source.
    pub loop_tail: bool,
}

impl Jump {
    fn new(source: NodeId, target: NodeId) -> Self {
        Self {
            source,
            target,
            loop_tail: false,
        }
    }
}

/// One element of a group body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlNode {
    /// The non-terminator code of a basic block.
    Block(NodeId),
    /// A conditional branch at the end of `block`.
    If {
        /// Block ending in the conditional branch.
        block: NodeId,
        /// The branch condition.
        condition: ValueId,
        /// Taken when the condition holds.
        then_body: Vec<ControlNode>,
        /// Taken otherwise.
        else_body: Vec<ControlNode>,
    },
    /// A transfer to another group.
    Jump(Jump),
}

/// A maximal structured region starting at one entry block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlGroup {
    entry: NodeId,
    body: Vec<ControlNode>,
    parent: Option<GroupId>,
    children: Vec<GroupId>,
    loop_head: bool,
}

impl ControlGroup {
    /// Returns the entry block.
    #[must_use]
    pub fn entry(&self) -> NodeId {
        self.entry
    }

    /// Returns the group body.
    #[must_use]
    pub fn body(&self) -> &[ControlNode] {
        &self.body
    }

    /// Returns the enclosing group; `None` for the root.
    #[must_use]
    pub fn parent(&self) -> Option<GroupId> {
        self.parent
    }

    /// Returns the directly nested groups in creation order.
    #[must_use]
    pub fn children(&self) -> &[GroupId] {
        &self.children
    }

    /// Returns `true` if a back-edge targets this group.
    #[must_use]
    pub fn is_loop_head(&self) -> bool {
        self.loop_head
    }
}

/// Structured control flow of one function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlTree {
    groups: Vec<ControlGroup>,
    entries: BTreeMap<NodeId, GroupId>,
}

/// Where a finished arm leaves control.
#[derive(Debug, Clone, Copy)]
enum Exit {
    /// Returns, or ends in nested branches that do not rejoin.
    Diverge,
    /// Ends with a jump node taking `source -> target`.
    Jump { source: NodeId, target: NodeId },
}

struct Arm {
    body: Vec<ControlNode>,
    exit: Exit,
}

/// A conditional branch whose arms are being built.
struct Pending {
    block: NodeId,
    condition: ValueId,
    if_false: NodeId,
    then_arm: Option<Arm>,
}

#[derive(Default)]
struct Frame {
    nodes: Vec<ControlNode>,
    pending: Option<Pending>,
}

/// Next action of the chain builder.
enum Step {
    /// Emit a block into the current frame.
    Continue(NodeId),
    /// Open a new arm frame starting at a block.
    Open(NodeId),
    /// Deliver an arm consisting of a single jump.
    ArmJump { source: NodeId, target: NodeId },
    /// Close the current frame.
    End(Exit),
}

struct Builder<'a> {
    func: &'a Function,
    dom: &'a Dominance,
    emitted: BitSet,
}

impl Builder<'_> {
    /// Predecessors of `block` that can actually branch to it.
    fn live_predecessors(&self, block: NodeId) -> Vec<NodeId> {
        self.dom
            .graph()
            .predecessor_list(block)
            .iter()
            .copied()
            .filter(|&pred| self.dom.is_reachable(pred))
            .collect()
    }

    fn inlinable(&self, block: NodeId) -> bool {
        block != self.func.entry()
            && !self.emitted.contains(block.index())
            && self.live_predecessors(block).len() == 1
    }

    fn joinable(&self, block: NodeId, a: NodeId, b: NodeId) -> bool {
        let preds = self.live_predecessors(block);
        block != self.func.entry()
            && !self.emitted.contains(block.index())
            && preds.len() == 2
            && preds.contains(&a)
            && preds.contains(&b)
    }

    fn arm_step(&self, block: NodeId, target: NodeId) -> Step {
        if self.inlinable(target) {
            Step::Open(target)
        } else {
            Step::ArmJump {
                source: block,
                target,
            }
        }
    }

    /// Emits `block` into `frame` and decides what follows it.
    fn emit(&mut self, frame: &mut Frame, block: NodeId) -> Result<Step> {
        self.emitted.insert(block.index());
        frame.nodes.push(ControlNode::Block(block));

        let terminator = self
            .func
            .terminator(block)?
            .ok_or_else(|| invariant_error!("{} has no terminator", block))?;
        let data = self.func.instruction(terminator)?;
        let target = match data.opcode() {
            Opcode::Branch(target) => target,
            Opcode::CondBranch { if_true, if_false } if if_true == if_false => if_true,
            Opcode::CondBranch { if_true, if_false } => {
                let condition = *data
                    .operands()
                    .first()
                    .ok_or_else(|| invariant_error!("{} branches on nothing", terminator))?;
                frame.pending = Some(Pending {
                    block,
                    condition,
                    if_false,
                    then_arm: None,
                });
                return Ok(self.arm_step(block, if_true));
            }
            _ => return Ok(Step::End(Exit::Diverge)),
        };

        if self.inlinable(target) {
            Ok(Step::Continue(target))
        } else {
            frame.nodes.push(ControlNode::Jump(Jump::new(block, target)));
            Ok(Step::End(Exit::Jump {
                source: block,
                target,
            }))
        }
    }

    /// Hands a finished arm to the pending branch of `parent`.
    fn deliver(&self, parent: &mut Frame, arm: Arm) -> Result<Step> {
        let pending = parent
            .pending
            .as_mut()
            .ok_or_else(|| invariant_error!("arm finished without a pending branch"))?;

        let Some(then_arm) = pending.then_arm.take() else {
            pending.then_arm = Some(arm);
            return Ok(self.arm_step(pending.block, pending.if_false));
        };
        let Some(pending) = parent.pending.take() else {
            return Err(invariant_error!("pending branch vanished"));
        };

        let join = match (then_arm.exit, arm.exit) {
            (
                Exit::Jump {
                    source: s1,
                    target: t1,
                },
                Exit::Jump {
                    source: s2,
                    target: t2,
                },
            ) if t1 == t2 && s1 != s2 && self.joinable(t1, s1, s2) => Some(t1),
            _ => None,
        };

        let mut then_body = then_arm.body;
        let mut else_body = arm.body;
        if join.is_some() {
            then_body.pop();
            else_body.pop();
        }
        parent.nodes.push(ControlNode::If {
            block: pending.block,
            condition: pending.condition,
            then_body,
            else_body,
        });

        Ok(match join {
            Some(join) => Step::Continue(join),
            None => Step::End(Exit::Diverge),
        })
    }

    /// Builds the body of the group entered at `entry`.
    fn build_group(&mut self, entry: NodeId) -> Result<Vec<ControlNode>> {
        let mut stack = vec![Frame::default()];
        let mut step = Step::Continue(entry);

        loop {
            step = match step {
                Step::Continue(block) => {
                    let frame = stack
                        .last_mut()
                        .ok_or_else(|| invariant_error!("empty frame stack"))?;
                    self.emit(frame, block)?
                }
                Step::Open(block) => {
                    let mut frame = Frame::default();
                    let next = self.emit(&mut frame, block)?;
                    stack.push(frame);
                    next
                }
                Step::ArmJump { source, target } => {
                    let arm = Arm {
                        body: vec![ControlNode::Jump(Jump::new(source, target))],
                        exit: Exit::Jump { source, target },
                    };
                    let parent = stack
                        .last_mut()
                        .ok_or_else(|| invariant_error!("empty frame stack"))?;
                    self.deliver(parent, arm)?
                }
                Step::End(exit) => {
                    let frame = stack
                        .pop()
                        .ok_or_else(|| invariant_error!("empty frame stack"))?;
                    if frame.pending.is_some() {
                        return Err(invariant_error!("frame closed with an open branch"));
                    }
                    let arm = Arm {
                        body: frame.nodes,
                        exit,
                    };
                    match stack.last_mut() {
                        Some(parent) => self.deliver(parent, arm)?,
                        None => return Ok(arm.body),
                    }
                }
            };
        }
    }
}

impl ControlTree {
    /// Structures the reachable blocks of `func`.
    ///
    /// # Errors
    ///
    /// Returns an error if dominance cannot be computed or a reachable block
    /// has no terminator.
    pub fn build(func: &mut Function) -> Result<Self> {
        let dom = func.dominance()?;
        Self::with_dominance(func, &dom)
    }

    /// Structures `func` against already validated dominance.
    ///
    /// # Errors
    ///
    /// Returns an error if a reachable block has no terminator.
    pub fn with_dominance(func: &Function, dom: &Dominance) -> Result<Self> {
        let mut builder = Builder {
            func,
            dom,
            emitted: BitSet::new(func.node_count()),
        };

        let mut groups: Vec<ControlGroup> = Vec::new();
        let mut entries = BTreeMap::new();
        let mut worklist = VecDeque::from([func.entry()]);
        let mut scheduled = BTreeSet::from([func.entry()]);

        while let Some(entry) = worklist.pop_front() {
            let body = builder.build_group(entry)?;
            for jump in collect_jumps(&body) {
                if !builder.emitted.contains(jump.target.index()) && scheduled.insert(jump.target) {
                    worklist.push_back(jump.target);
                }
            }
            entries.insert(entry, GroupId::new(groups.len()));
            groups.push(ControlGroup {
                entry,
                body,
                parent: None,
                children: Vec::new(),
                loop_head: false,
            });
        }

        for index in 1..groups.len() {
            let mut dominator = dom.immediate_dominator(groups[index].entry);
            while let Some(block) = dominator {
                if let Some(&parent) = entries.get(&block) {
                    groups[index].parent = Some(parent);
                    groups[parent.index()].children.push(GroupId::new(index));
                    break;
                }
                dominator = dom.immediate_dominator(block);
            }
        }

        let mut loop_heads = Vec::new();
        for group in &mut groups {
            for_each_jump_mut(&mut group.body, |jump| {
                if dom.dominates(jump.target, jump.source) {
                    jump.loop_tail = true;
                    loop_heads.push(jump.target);
                }
            });
        }
        for head in loop_heads {
            if let Some(&id) = entries.get(&head) {
                groups[id.index()].loop_head = true;
            }
        }

        log::debug!(
            "{}: structured into {} group(s)",
            func.name(),
            groups.len()
        );
        Ok(Self { groups, entries })
    }

    /// Returns the root group (entered at the function entry).
    #[must_use]
    pub fn root(&self) -> GroupId {
        GroupId::new(0)
    }

    /// Returns a group by id.
    #[must_use]
    pub fn group(&self, id: GroupId) -> Option<&ControlGroup> {
        self.groups.get(id.index())
    }

    /// Returns all groups in creation order.
    pub fn groups(&self) -> impl Iterator<Item = (GroupId, &ControlGroup)> {
        self.groups
            .iter()
            .enumerate()
            .map(|(i, g)| (GroupId::new(i), g))
    }

    /// Returns the number of groups.
    #[must_use]
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Returns the group entered at `block`, if any.
    #[must_use]
    pub fn group_of(&self, block: NodeId) -> Option<GroupId> {
        self.entries.get(&block).copied()
    }

    /// Returns the loop-head groups.
    #[must_use]
    pub fn loop_heads(&self) -> Vec<GroupId> {
        self.groups()
            .filter(|(_, g)| g.loop_head)
            .map(|(id, _)| id)
            .collect()
    }

    /// Returns every jump node, group by group in body order.
    #[must_use]
    pub fn jumps(&self) -> Vec<Jump> {
        self.groups
            .iter()
            .flat_map(|g| collect_jumps(&g.body))
            .collect()
    }

    /// Returns `true` if any group body contains an `If` node.
    #[must_use]
    pub fn has_branches(&self) -> bool {
        self.groups.iter().any(|g| {
            let mut found = false;
            walk(&g.body, |node| found |= matches!(node, ControlNode::If { .. }));
            found
        })
    }

    /// Returns the blocks in emission order: groups in creation order, each
    /// body depth-first with then-arms before else-arms.
    #[must_use]
    pub fn blocks(&self) -> Vec<NodeId> {
        let mut blocks = Vec::new();
        for group in &self.groups {
            walk(&group.body, |node| {
                if let ControlNode::Block(block) = node {
                    blocks.push(*block);
                }
            });
        }
        blocks
    }

    /// Re-derives the block graph edges the tree encodes.
    ///
    /// Fall-through between consecutive blocks, branches into arms, arms
    /// falling into a join block and explicit jumps each contribute one edge.
    #[must_use]
    pub fn edges(&self) -> BTreeSet<(NodeId, NodeId)> {
        let mut edges = BTreeSet::new();
        for group in &self.groups {
            // (sequence, position, block control falls into after the sequence)
            let mut stack: Vec<(&[ControlNode], usize, Option<NodeId>)> =
                vec![(&group.body, 0, None)];
            while let Some((nodes, index, follow)) = stack.pop() {
                let Some(node) = nodes.get(index) else {
                    continue;
                };
                let next = nodes.get(index + 1);
                match node {
                    ControlNode::Block(block) => {
                        match next {
                            Some(ControlNode::Block(succ)) => {
                                edges.insert((*block, *succ));
                            }
                            Some(_) => {}
                            None => {
                                if let Some(succ) = follow {
                                    edges.insert((*block, succ));
                                }
                            }
                        }
                        stack.push((nodes, index + 1, follow));
                    }
                    ControlNode::If {
                        block,
                        then_body,
                        else_body,
                        ..
                    } => {
                        let join = match next {
                            Some(ControlNode::Block(join)) => Some(*join),
                            _ => None,
                        };
                        for arm in [then_body, else_body] {
                            match arm.first() {
                                Some(ControlNode::Block(first)) => {
                                    edges.insert((*block, *first));
                                }
                                Some(_) => {}
                                None => {
                                    if let Some(join) = join {
                                        edges.insert((*block, join));
                                    }
                                }
                            }
                        }
                        stack.push((nodes, index + 1, follow));
                        stack.push((else_body, 0, join));
                        stack.push((then_body, 0, join));
                    }
                    ControlNode::Jump(jump) => {
                        edges.insert((jump.source, jump.target));
                        stack.push((nodes, index + 1, follow));
                    }
                }
            }
        }
        edges
    }
}

/// Visits `nodes` in preorder, then-arms before else-arms.
fn walk<'a>(nodes: &'a [ControlNode], mut visit: impl FnMut(&'a ControlNode)) {
    let mut stack = vec![nodes.iter()];
    while let Some(mut iter) = stack.pop() {
        let Some(node) = iter.next() else {
            continue;
        };
        stack.push(iter);
        visit(node);
        if let ControlNode::If {
            then_body,
            else_body,
            ..
        } = node
        {
            stack.push(else_body.iter());
            stack.push(then_body.iter());
        }
    }
}

fn collect_jumps(nodes: &[ControlNode]) -> Vec<Jump> {
    let mut jumps = Vec::new();
    walk(nodes, |node| {
        if let ControlNode::Jump(jump) = node {
            jumps.push(*jump);
        }
    });
    jumps
}

fn for_each_jump_mut(nodes: &mut [ControlNode], mut visit: impl FnMut(&mut Jump)) {
    let mut stack = vec![nodes.iter_mut()];
    while let Some(mut iter) = stack.pop() {
        let Some(node) = iter.next() else {
            continue;
        };
        stack.push(iter);
        match node {
            ControlNode::Jump(jump) => visit(jump),
            ControlNode::If {
                then_body,
                else_body,
                ..
            } => {
                stack.push(else_body.iter_mut());
                stack.push(then_body.iter_mut());
            }
            ControlNode::Block(_) => {}
        }
    }
}

impl fmt::Display for ControlTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        enum Line<'a> {
            Node(&'a ControlNode),
            Text(&'static str),
        }

        let mut groups = vec![(self.root(), 0usize)];
        while let Some((id, depth)) = groups.pop() {
            let Some(group) = self.group(id) else {
                continue;
            };
            let marker = if group.loop_head { " loop" } else { "" };
            writeln!(
                f,
                "{:indent$}{} ({}){}:",
                "",
                id,
                group.entry,
                marker,
                indent = depth * 2
            )?;

            let mut lines: Vec<(Line<'_>, usize)> = group
                .body
                .iter()
                .rev()
                .map(|n| (Line::Node(n), depth + 1))
                .collect();
            while let Some((line, level)) = lines.pop() {
                let pad = level * 2;
                match line {
                    Line::Text(text) => writeln!(f, "{:pad$}{}", "", text)?,
                    Line::Node(ControlNode::Block(block)) => writeln!(f, "{:pad$}{}", "", block)?,
                    Line::Node(ControlNode::Jump(jump)) => {
                        let tail = if jump.loop_tail { " (loop)" } else { "" };
                        writeln!(f, "{:pad$}jump {}{}", "", jump.target, tail)?;
                    }
                    Line::Node(ControlNode::If {
                        condition,
                        then_body,
                        else_body,
                        ..
                    }) => {
                        writeln!(f, "{:pad$}if {}", "", condition)?;
                        lines.push((Line::Text("end"), level));
                        for node in else_body.iter().rev() {
                            lines.push((Line::Node(node), level + 1));
                        }
                        lines.push((Line::Text("else"), level));
                        for node in then_body.iter().rev() {
                            lines.push((Line::Node(node), level + 1));
                        }
                    }
                }
            }

            for &child in group.children.iter().rev() {
                groups.push((child, depth + 1));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        analysis::SsaPromoter,
        test::{build_counter, build_diamond, build_irreducible, build_while_true},
        utils::graph::Successors,
    };

    fn original_edges(func: &Function) -> BTreeSet<(NodeId, NodeId)> {
        func.reachable_blocks()
            .into_iter()
            .flat_map(|b| func.successors(b).map(move |s| (b, s)))
            .collect()
    }

    #[test]
    fn test_diamond_is_one_group_with_if() {
        let fixture = build_diamond();
        let mut func = fixture.func;
        let tree = ControlTree::build(&mut func).unwrap();

        assert_eq!(tree.group_count(), 1);
        let root = tree.group(tree.root()).unwrap();
        assert_eq!(
            root.body(),
            &[
                ControlNode::Block(func.entry()),
                ControlNode::If {
                    block: func.entry(),
                    condition: fixture.cond,
                    then_body: vec![ControlNode::Block(fixture.left)],
                    else_body: vec![ControlNode::Block(fixture.right)],
                },
                ControlNode::Block(fixture.join),
            ]
        );
        assert!(tree.jumps().is_empty());
        assert_eq!(tree.edges(), original_edges(&func));
    }

    #[test]
    fn test_while_true_loop_head_and_tail() {
        let fixture = build_while_true();
        let mut func = fixture.func;
        let tree = ControlTree::build(&mut func).unwrap();

        assert_eq!(tree.group_count(), 2);
        let head = tree.group_of(fixture.header).unwrap();
        assert_eq!(tree.loop_heads(), vec![head]);
        assert_eq!(tree.group(head).unwrap().parent(), Some(tree.root()));
        assert_eq!(tree.group(tree.root()).unwrap().children(), &[head]);
        assert!(!tree.has_branches());

        let jumps = tree.jumps();
        assert_eq!(jumps.len(), 2);
        assert!(!jumps[0].loop_tail);
        assert_eq!(
            jumps[1],
            Jump {
                source: fixture.body,
                target: fixture.header,
                loop_tail: true
            }
        );
        assert_eq!(tree.edges(), original_edges(&func));
    }

    #[test]
    fn test_counter_loop() {
        let fixture = build_counter();
        let mut func = fixture.func;
        SsaPromoter::new().promote_all(&mut func).unwrap();
        let tree = ControlTree::build(&mut func).unwrap();

        let head = tree.group_of(fixture.header).unwrap();
        assert!(tree.group(head).unwrap().is_loop_head());
        assert!(tree.has_branches());
        assert_eq!(tree.edges(), original_edges(&func));
        assert_eq!(tree.blocks().len(), func.reachable_blocks().len());
    }

    #[test]
    fn test_irreducible_falls_back_to_jumps() {
        let fixture = build_irreducible();
        let mut func = fixture.func;
        let tree = ControlTree::build(&mut func).unwrap();

        assert_eq!(tree.group_count(), 3);
        assert!(tree.loop_heads().is_empty());
        assert!(tree.jumps().iter().all(|j| !j.loop_tail));
        let a = tree.group_of(fixture.a).unwrap();
        let b = tree.group_of(fixture.b).unwrap();
        assert_eq!(tree.group(a).unwrap().parent(), Some(tree.root()));
        assert_eq!(tree.group(b).unwrap().parent(), Some(tree.root()));
        assert_eq!(tree.edges(), original_edges(&func));
    }

    #[test]
    fn test_if_without_else_falls_through() {
        let mut func = Function::new("f");
        let entry = func.entry();
        let then = func.add_block();
        let join = func.add_block();
        let cond = func.add_argument();
        func.cond_branch(entry, cond, then, join).unwrap();
        func.branch(then, join).unwrap();
        func.ret(join, &[]).unwrap();

        let tree = ControlTree::build(&mut func).unwrap();
        assert_eq!(tree.group_count(), 1);
        let body = tree.group(tree.root()).unwrap().body();
        assert!(matches!(
            &body[1],
            ControlNode::If { then_body, else_body, .. }
                if then_body == &vec![ControlNode::Block(then)] && else_body.is_empty()
        ));
        assert_eq!(body[2], ControlNode::Block(join));
        assert_eq!(tree.edges(), original_edges(&func));
    }

    #[test]
    fn test_nested_diamonds_converge() {
        let mut func = Function::new("f");
        let entry = func.entry();
        let cond = func.add_argument();
        let outer_left = func.add_block();
        let inner_left = func.add_block();
        let inner_right = func.add_block();
        let inner_join = func.add_block();
        let outer_right = func.add_block();
        let outer_join = func.add_block();
        func.cond_branch(entry, cond, outer_left, outer_right).unwrap();
        func.cond_branch(outer_left, cond, inner_left, inner_right).unwrap();
        func.branch(inner_left, inner_join).unwrap();
        func.branch(inner_right, inner_join).unwrap();
        func.branch(inner_join, outer_join).unwrap();
        func.branch(outer_right, outer_join).unwrap();
        func.ret(outer_join, &[]).unwrap();

        let tree = ControlTree::build(&mut func).unwrap();
        assert_eq!(tree.group_count(), 1);
        assert!(tree.jumps().is_empty());
        assert_eq!(tree.blocks().len(), 7);
        assert_eq!(tree.edges(), original_edges(&func));
    }

    #[test]
    fn test_dead_predecessors_do_not_block_chaining() {
        let mut fixture = build_diamond();
        let func = &mut fixture.func;
        let ret = func.terminator(fixture.join).unwrap().unwrap();
        func.remove_instruction(ret).unwrap();
        let tail = func.add_block();
        func.branch(fixture.join, tail).unwrap();
        func.ret(tail, &[]).unwrap();

        let dead = func.add_block();
        func.cond_branch(dead, fixture.cond, fixture.join, tail).unwrap();

        let tree = ControlTree::build(func).unwrap();
        assert_eq!(tree.group_count(), 1);
        assert!(tree.jumps().is_empty());
        assert_eq!(
            tree.blocks(),
            vec![func.entry(), fixture.left, fixture.right, fixture.join, tail]
        );
        assert_eq!(tree.group_of(dead), None);
        assert_eq!(tree.edges(), original_edges(func));
    }

    #[test]
    fn test_structuring_is_idempotent() {
        let mut func = build_irreducible().func;
        let first = ControlTree::build(&mut func).unwrap();
        let second = ControlTree::build(&mut func).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.to_string(), second.to_string());
    }

    #[test]
    fn test_display() {
        let mut func = build_while_true().func;
        let tree = ControlTree::build(&mut func).unwrap();
        assert_eq!(
            tree.to_string(),
            "g0 (b0):\n  b0\n  jump b1\n  g1 (b1) loop:\n    b1\n    b2\n    jump b1 (loop)\n"
        );
    }
}
