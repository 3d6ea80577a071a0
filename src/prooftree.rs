//! The proof tree produced by the game engine.
//!
//! Nodes live in an arena and refer to each other by [`NodeId`].
//! A reduction points back at an earlier node with the same state,
//! either an ancestor (closing a cycle) or a node in an unrelated branch
//! that was proven bisimilar before.

pub mod graphml;

use std::fmt;
use std::mem;
use std::ops::{Index, IndexMut};

use crate::error::ProofError;
use crate::game::GameState;
use crate::net::PetriNet;

/// Index of a node within its [`ProofTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct NodeId(pub u32);

impl NodeId {
    pub const ROOT: NodeId = NodeId(0);

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Which side of the parent state attacked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Order {
    /// The first marking attacked, the second one defended.
    Direct,
    /// The second marking attacked. The child state lists the attacker first.
    Reverse,
}

impl Order {
    pub fn as_str(self) -> &'static str {
        match self {
            Order::Direct => "direct",
            Order::Reverse => "reverse",
        }
    }
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a node came to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Move {
    /// The starting state of the check.
    Root,
    /// The attacker fired `attacker`, the defender answered with the
    /// same-labeled transition `defender`.
    Expand {
        attacker: u32,
        defender: u32,
        order: Order,
    },
    /// The state of the parent node is already justified by `target`.
    Reduce {
        target: NodeId,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Terminal {
    /// Still being explored. Does not occur in a finished tree.
    #[default]
    Pending,
    Success,
    Fail,
}

impl Terminal {
    pub fn tag(self) -> Option<&'static str> {
        match self {
            Terminal::Pending => None,
            Terminal::Success => Some("SUCCESS"),
            Terminal::Fail => Some("FAIL"),
        }
    }
}

/// An attacker move that the defender could not answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Attack {
    pub transition: u32,
    pub order: Order,
}

/// A vertex of the proof tree.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Node {
    pub id: NodeId,
    pub state: GameState,
    pub step: Move,
    pub terminal: Terminal,
    /// For failed nodes, the attack for which every defence failed.
    pub attack: Option<Attack>,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
}

impl Node {
    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    #[inline]
    pub fn is_success(&self) -> bool {
        self.terminal == Terminal::Success
    }

    #[inline]
    pub fn is_reduce(&self) -> bool {
        matches!(self.step, Move::Reduce { .. })
    }
}


/// Rooted tree of game states, certificate of a bisimilarity check.
///
/// If the root is [`Success`](Terminal::Success), every node is,
/// and the tree shows how the defender answers every attack.
/// Otherwise following the failed nodes from the root,
/// see [`counterexample()`](ProofTree::counterexample),
/// leads to an attack that can't be answered.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ProofTree {
    nodes: Vec<Node>,
}

impl ProofTree {
    pub(crate) fn with_root(state: GameState) -> Self {
        let mut tree = ProofTree::default();
        tree.push(state, Move::Root, None);
        tree
    }

    // Create a new unattached node
    pub(crate) fn push(&mut self, state: GameState, step: Move, parent: Option<NodeId>) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node {
            id,
            state,
            step,
            terminal: Terminal::Pending,
            attack: None,
            parent,
            children: Vec::new(),
        });
        id
    }

    pub(crate) fn attach(&mut self, parent: NodeId, child: NodeId) {
        self[parent].children.push(child);
    }

    pub(crate) fn resolve(&mut self, id: NodeId, terminal: Terminal) {
        self[id].terminal = terminal;
    }

    /// Drop all nodes that are not reachable from the root and renumber the
    /// rest in depth-first preorder.
    ///
    /// Returns the new id of each old node, or `None` if it was dropped.
    pub(crate) fn compact(&mut self) -> Vec<Option<NodeId>> {
        let mut mapping = vec![None; self.nodes.len()];
        if self.nodes.is_empty() {
            return mapping;
        }
        let mut preorder = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![NodeId::ROOT];
        while let Some(id) = stack.pop() {
            mapping[id.index()] = Some(NodeId(preorder.len() as u32));
            preorder.push(id);
            stack.extend(self.nodes[id.index()].children.iter().rev());
        }

        let remap = |id: NodeId| mapping[id.index()].expect("Reference to a discarded node");
        let mut old: Vec<Option<Node>> = mem::take(&mut self.nodes).into_iter().map(Some).collect();
        self.nodes = preorder.iter()
            .map(|&id| {
                let mut node = old[id.index()].take().expect("Node visited twice");
                node.id = remap(node.id);
                node.parent = node.parent.map(remap);
                for child in &mut node.children {
                    *child = remap(*child);
                }
                if let Move::Reduce { target } = &mut node.step {
                    *target = remap(*target);
                }
                node
            })
            .collect();
        mapping
    }

    /// # Panics
    ///
    /// Panics if the tree is empty. Trees returned by the engine never are.
    #[inline]
    pub fn root(&self) -> &Node {
        &self.nodes[0]
    }

    /// `true` if the markings at the root were proven bisimilar.
    #[inline]
    pub fn verdict(&self) -> bool {
        self.nodes.first().is_some_and(Node::is_success)
    }

    #[inline]
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All nodes in depth-first preorder.
    pub fn iter(&self) -> impl Iterator<Item=&Node> {
        self.nodes.iter()
    }

    pub fn children(&self, id: NodeId) -> impl Iterator<Item=&Node> {
        self[id].children.iter().map(|&c| &self[c])
    }

    pub fn leaves(&self) -> impl Iterator<Item=&Node> {
        self.nodes.iter().filter(|n| n.is_leaf())
    }

    /// All reductions as pairs of the reducing node and the node it refers to.
    pub fn reductions(&self) -> impl Iterator<Item=(NodeId, NodeId)> + '_ {
        self.nodes.iter().filter_map(|n| match n.step {
            Move::Reduce { target } => Some((n.id, target)),
            _ => None,
        })
    }

    /// Length of the longest path from the root to a leaf, counted in edges.
    pub fn depth(&self) -> usize {
        let mut depth = vec![0; self.nodes.len()];
        let mut max = 0;
        // Parents always precede their children
        for node in &self.nodes {
            if let Some(parent) = node.parent {
                depth[node.id.index()] = depth[parent.index()] + 1;
                max = max.max(depth[node.id.index()]);
            }
        }
        max
    }

    /// The nodes from the root down to `id`, both included.
    pub fn path_to(&self, id: NodeId) -> Vec<NodeId> {
        let mut path = vec![id];
        let mut current = id;
        while let Some(parent) = self[current].parent {
            path.push(parent);
            current = parent;
        }
        path.reverse();
        path
    }

    /// Path from the root along failed nodes down to the attack that
    /// distinguishes the two markings.
    ///
    /// Empty if the markings are bisimilar.
    pub fn counterexample(&self) -> Vec<NodeId> {
        let mut path = Vec::new();
        let mut current = match self.nodes.first() {
            Some(root) if root.terminal == Terminal::Fail => root,
            _ => return path,
        };
        loop {
            path.push(current.id);
            match self.children(current.id).find(|c| c.terminal == Terminal::Fail) {
                Some(child) => current = child,
                None => return path,
            }
        }
    }

    /// Verify that the tree certifies its verdict for the given net.
    ///
    /// Every expansion must result from firing its recorded transitions,
    /// every reduction must refer to an earlier node with the same state,
    /// successful nodes must answer every enabled attack of both sides,
    /// and failed nodes must show an attack for which every possible defence fails.
    pub fn audit(&self, net: &PetriNet) -> Result<(), ProofError> {
        let root = self.nodes.first().ok_or(ProofError::Empty)?;
        if root.step != Move::Root || root.parent.is_some() {
            return Err(ProofError::Root(root.id));
        }
        for node in &self.nodes {
            self.audit_structure(node)?;
            self.audit_step(node, net)?;
            match node.terminal {
                Terminal::Pending => return Err(ProofError::Pending(node.id)),
                Terminal::Success => self.audit_success(node, net)?,
                Terminal::Fail => self.audit_fail(node, net)?,
            }
        }
        Ok(())
    }

    fn audit_structure(&self, node: &Node) -> Result<(), ProofError> {
        for &c in &node.children {
            let child = self.get(c).ok_or(ProofError::Structure(node.id))?;
            if child.parent != Some(node.id) || c <= node.id {
                return Err(ProofError::Structure(node.id));
            }
        }
        Ok(())
    }

    fn audit_step(&self, node: &Node, net: &PetriNet) -> Result<(), ProofError> {
        match node.step {
            Move::Root if node.id != NodeId::ROOT => Err(ProofError::Root(node.id)),
            Move::Root => Ok(()),
            Move::Expand { attacker, defender, order } => {
                let parent = node.parent
                    .and_then(|p| self.get(p))
                    .ok_or(ProofError::Structure(node.id))?;
                if net.transition(attacker).label != net.transition(defender).label {
                    return Err(ProofError::Label(node.id));
                }
                let (attacking, defending) = parent.state.sides(order);
                let first = net.fire(attacking, attacker).map_err(|_| ProofError::Firing(node.id))?;
                let second = net.fire(defending, defender).map_err(|_| ProofError::Firing(node.id))?;
                if node.state.first != first || node.state.second != second {
                    return Err(ProofError::Firing(node.id));
                }
                Ok(())
            },
            Move::Reduce { target } => {
                let reduced = node.parent.and_then(|p| self.get(p));
                let justification = self.get(target);
                match (reduced, justification) {
                    (Some(reduced), Some(justification))
                        if target < node.id
                        && node.is_leaf()
                        && node.is_success()
                        && reduced.children.len() == 1
                        && reduced.state == node.state
                        && justification.state == node.state => Ok(()),
                    _ => Err(ProofError::Reduction(node.id)),
                }
            },
        }
    }

    fn audit_success(&self, node: &Node, net: &PetriNet) -> Result<(), ProofError> {
        if self.children(node.id).any(|c| !c.is_success()) {
            return Err(ProofError::Inconsistent(node.id));
        }
        let reduced = self.children(node.id).any(Node::is_reduce);
        let identity = node.is_leaf() && node.state.is_identity();
        if node.is_reduce() || reduced || identity {
            return Ok(());
        }
        for order in [Order::Direct, Order::Reverse] {
            let (attacking, _) = node.state.sides(order);
            for t in net.enabled_transitions(attacking) {
                let answered = self.children(node.id).any(|c| matches!(c.step,
                    Move::Expand { attacker, order: o, .. } if attacker == t && o == order));
                if !answered {
                    return Err(ProofError::Uncovered { node: node.id, transition: t });
                }
            }
        }
        Ok(())
    }

    fn audit_fail(&self, node: &Node, net: &PetriNet) -> Result<(), ProofError> {
        let attack = node.attack.ok_or(ProofError::Refutation(node.id))?;
        let (attacking, defending) = node.state.sides(attack.order);
        if !net.enabled(attacking, attack.transition) {
            return Err(ProofError::Refutation(node.id));
        }
        for &d in net.same_label(attack.transition) {
            if !net.enabled(defending, d) {
                continue;
            }
            let refuted = self.children(node.id).any(|c| c.terminal == Terminal::Fail
                && c.step == Move::Expand { attacker: attack.transition, defender: d, order: attack.order });
            if !refuted {
                return Err(ProofError::Refutation(node.id));
            }
        }
        Ok(())
    }

    /// Human readable, indented rendering of the tree using transition ids of `net`.
    pub fn display<'a>(&'a self, net: &'a PetriNet) -> TreeDisplay<'a> {
        TreeDisplay { tree: self, net }
    }
}

impl Index<NodeId> for ProofTree {
    type Output = Node;

    #[inline]
    fn index(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }
}

impl IndexMut<NodeId> for ProofTree {
    #[inline]
    fn index_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index()]
    }
}

pub struct TreeDisplay<'a> {
    tree: &'a ProofTree,
    net: &'a PetriNet,
}

impl fmt::Display for TreeDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.tree.is_empty() {
            return Ok(());
        }
        let mut stack = vec![(NodeId::ROOT, 0)];
        while let Some((id, indent)) = stack.pop() {
            let node = &self.tree[id];
            write!(f, "{:indent$}#{} {} {}", "", node.id, node.state.first, node.state.second,
                   indent = indent * 2)?;
            match node.step {
                Move::Root => {},
                Move::Expand { attacker, defender, order } => write!(f, " EXPAND({}, {}, {order})",
                    self.net.transition(attacker).id, self.net.transition(defender).id)?,
                Move::Reduce { target } => write!(f, " REDUCE(#{target})")?,
            }
            if let Some(tag) = node.terminal.tag() {
                write!(f, " {tag}")?;
            }
            if let Some(attack) = node.attack {
                write!(f, " by {} ({})", self.net.transition(attack.transition).id, attack.order)?;
            }
            writeln!(f)?;
            stack.extend(node.children.iter().rev().map(|&c| (c, indent + 1)));
        }
        Ok(())
    }
}


/// Proven equivalences that the proof actually relied on.
///
/// Each entry is a state proven bisimilar by `node`,
/// which is referenced by at least one reduction in the tree.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Basis {
    pub entries: Vec<(GameState, NodeId)>,
}

impl Basis {
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item=&(GameState, NodeId)> {
        self.entries.iter()
    }

    pub fn contains(&self, state: &GameState) -> bool {
        self.entries.iter().any(|(s, _)| s == state)
    }
}
