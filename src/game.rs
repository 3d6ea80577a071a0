//! The bisimulation game on two markings of a Petri net.
//!
//! In every state the attacker picks a side and fires an enabled transition there.
//! The defender must fire a transition with the same label on the other side,
//! and the game continues in the resulting state.
//! The markings are bisimilar if the defender can answer every attack forever.
//!
//! [`Solver`] searches this game depth-first, building a [`ProofTree`].
//! Infinite plays are cut off in two ways:
//! a state that repeats one of its ancestors is assumed bisimilar
//! (the play is periodic, so the defender survives it),
//! and a state that has been proven bisimilar before is looked up in the
//! [`EquivalenceCache`] instead of being explored again.
//! Both cases leave a [`Reduce`](Move::Reduce) node in the tree.

#[cfg(test)]
mod tests;

use std::fmt;

use log::Level::Trace;
use log::{debug, log_enabled, trace};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::cache::{Checkpoint, EquivalenceCache};
use crate::error::{FireError, MarkingError};
use crate::marking::Marking;
use crate::net::PetriNet;
use crate::prooftree::{Attack, Basis, Move, NodeId, Order, ProofTree, Terminal};

/// A pair of markings, one for each side of the game.
///
/// The order matters: the cache does not identify `(a, b)` with `(b, a)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GameState {
    pub first: Marking,
    pub second: Marking,
}

impl GameState {
    pub fn new(first: Marking, second: Marking) -> Self {
        GameState { first, second }
    }

    /// Both sides hold the same marking.
    #[inline]
    pub fn is_identity(&self) -> bool {
        self.first == self.second
    }

    /// The attacking and the defending marking for an attack of the given order.
    #[inline]
    pub fn sides(&self, order: Order) -> (&Marking, &Marking) {
        match order {
            Order::Direct => (&self.first, &self.second),
            Order::Reverse => (&self.second, &self.first),
        }
    }
}

impl fmt::Display for GameState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.first, self.second)
    }
}


/// Options for one run of the [`Solver`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SolverConf {
    /// Collect the cached equivalences the proof relied on into a [`Basis`].
    pub compute_basis: bool,
    /// Treat a state with two equal markings as bisimilar without exploring it.
    pub identity_shortcut: bool,
}

impl SolverConf {
    pub const STANDARD: Self = SolverConf { compute_basis: false, identity_shortcut: true };
    pub const WITH_BASIS: Self = SolverConf { compute_basis: true, identity_shortcut: true };
    /// Explore every state, including identical marking pairs.
    pub const EXHAUSTIVE: Self = SolverConf { compute_basis: true, identity_shortcut: false };
}

impl Default for SolverConf {
    fn default() -> Self {
        SolverConf::STANDARD
    }
}


/// Result of a bisimilarity check.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Outcome {
    /// `true` if the two markings are bisimilar.
    pub verdict: bool,
    pub tree: ProofTree,
    /// Only present if requested by [`SolverConf::compute_basis`].
    pub basis: Option<Basis>,
}


/// Depth-first solver for the bisimulation game.
///
/// Each solver performs a single run and owns the cache of that run,
/// so independent checks never share state.
/// The search keeps its own stack of open expansions,
/// so the depth of a proof is only limited by memory.
///
/// # Example
///
/// ```
/// use resbisim::{PetriNet, Marking, Solver, SolverConf};
///
/// // Tokens move back and forth between two places with the same action
/// let net = PetriNet::from_vectors(2, vec![
///     ("t0", "a", vec![1, 0], vec![0, 1]),
///     ("t1", "a", vec![0, 1], vec![1, 0]),
/// ]).unwrap();
///
/// let outcome = Solver::new(&net, SolverConf::STANDARD)
///     .run(Marking::from([1, 0]), Marking::from([0, 1]))
///     .unwrap();
/// assert!(outcome.verdict);
/// assert!(outcome.tree.audit(&net).is_ok());
/// ```
#[derive(Debug)]
pub struct Solver<'a> {
    net: &'a PetriNet,
    conf: SolverConf,
    tree: ProofTree,
    cache: EquivalenceCache,
    // States on the path from the root to the node being explored
    ancestors: FxHashMap<GameState, NodeId>,
    // Expansions in progress, innermost last
    stack: Vec<Frame>,
}

// A node whose attacks are being answered.
#[derive(Debug)]
struct Frame {
    id: NodeId,
    state: GameState,
    // Cache length when the expansion started
    checkpoint: Checkpoint,
    // Enabled attacks, the first side before the second, each in transition order
    attacks: Vec<Attack>,
    // Current attack, all earlier ones are answered
    attack: usize,
    // Next candidate in the `same_label` list of the current attack
    defence: usize,
    // Failed defences against the current attack
    refuted: Vec<NodeId>,
}

impl<'a> Solver<'a> {
    pub fn new(net: &'a PetriNet, conf: SolverConf) -> Self {
        Solver {
            net,
            conf,
            tree: ProofTree::default(),
            cache: EquivalenceCache::new(),
            ancestors: FxHashMap::default(),
            stack: Vec::new(),
        }
    }

    /// Decide whether `first` and `second` are bisimilar.
    ///
    /// The search terminates whenever only finitely many markings are
    /// reachable from the two starting markings.
    ///
    /// # Errors
    ///
    /// Returns a [`MarkingError`] if either marking does not have one entry
    /// per place of the net, or if a reachable marking holds more than
    /// `u32::MAX` tokens in a place.
    pub fn run(mut self, first: Marking, second: Marking) -> Result<Outcome, MarkingError> {
        self.net.check_marking(&first)?;
        self.net.check_marking(&second)?;
        self.tree = ProofTree::with_root(GameState::new(first, second));
        let verdict = self.solve()?;

        let explored = self.tree.len();
        let mapping = self.tree.compact();
        debug!("Explored {} nodes, proof tree has {} nodes, {} cached equivalences, bisimilar: {}",
               explored, self.tree.len(), self.cache.len(), verdict);
        if log_enabled!(Trace) {
            trace!("Proof tree:\n{}", self.tree.display(self.net));
        }

        let basis = self.conf.compute_basis.then(|| self.basis(&mapping));
        Ok(Outcome {
            verdict,
            tree: self.tree,
            basis,
        })
    }

    // Decide the root and build the tree below it.
    fn solve(&mut self) -> Result<bool, MarkingError> {
        // Node decided last, its verdict is handed to the frame of its parent
        let mut decided = self.enter(NodeId::ROOT).map(|success| (NodeId::ROOT, success));
        while let Some(mut frame) = self.stack.pop() {
            if let Some((child, success)) = decided.take() {
                if success {
                    // Earlier refuted attempts stay unattached and are dropped by compaction
                    self.tree.attach(frame.id, child);
                    frame.attack += 1;
                    frame.defence = 0;
                    frame.refuted.clear();
                } else {
                    frame.refuted.push(child);
                    frame.defence += 1;
                }
            }

            match self.next_defence(&mut frame)? {
                Some((state, step)) => {
                    let parent = frame.id;
                    self.stack.push(frame);
                    let child = self.tree.push(state, step, Some(parent));
                    decided = self.enter(child).map(|success| (child, success));
                },
                None => {
                    let id = frame.id;
                    decided = Some((id, self.finish(frame)));
                },
            }
        }
        Ok(decided.is_some_and(|(_, success)| success))
    }

    // Start on node `id`. Returns its verdict if it can be decided right away,
    // otherwise opens a frame for its attacks.
    fn enter(&mut self, id: NodeId) -> Option<bool> {
        let state = self.tree[id].state.clone();
        if let Some(target) = self.cache.lookup(&state) {
            trace!("Node {id}: {state} proven by node {target}");
            self.reduce(id, target);
            return Some(true);
        }
        if let Some(&target) = self.ancestors.get(&state) {
            trace!("Node {id}: {state} repeats ancestor {target}");
            self.reduce(id, target);
            return Some(true);
        }
        if self.conf.identity_shortcut && state.is_identity() {
            self.tree.resolve(id, Terminal::Success);
            self.cache.insert(state, id);
            return Some(true);
        }

        trace!("Node {id}: expanding {state}");
        let mut attacks = Vec::new();
        for order in [Order::Direct, Order::Reverse] {
            let (attacking, _) = state.sides(order);
            attacks.extend(self.net.enabled_transitions(attacking)
                .map(|transition| Attack { transition, order }));
        }
        self.ancestors.insert(state.clone(), id);
        self.stack.push(Frame {
            id,
            state,
            checkpoint: self.cache.checkpoint(),
            attacks,
            attack: 0,
            defence: 0,
            refuted: Vec::new(),
        });
        None
    }

    // Close node `id` with a reduction to `target`.
    fn reduce(&mut self, id: NodeId, target: NodeId) {
        let state = self.tree[id].state.clone();
        let leaf = self.tree.push(state, Move::Reduce { target }, Some(id));
        self.tree.resolve(leaf, Terminal::Success);
        self.tree.attach(id, leaf);
        self.tree.resolve(id, Terminal::Success);
    }

    // The next enabled defence, in transition order, against the current attack
    // of `frame`, as the resulting state and move.
    // `None` if all attacks are answered or the current one can't be.
    fn next_defence(&self, frame: &mut Frame) -> Result<Option<(GameState, Move)>, MarkingError> {
        let Some(&Attack { transition: attack, order }) = frame.attacks.get(frame.attack) else {
            return Ok(None);
        };
        let (attacking, defending) = frame.state.sides(order);
        let candidates = &self.net.same_label(attack)[frame.defence..];
        let Some(offset) = candidates.iter().position(|&d| self.net.enabled(defending, d)) else {
            return Ok(None);
        };
        frame.defence += offset;
        let defence = candidates[offset];
        let next = GameState::new(fire(self.net, attacking, attack)?, fire(self.net, defending, defence)?);
        Ok(Some((next, Move::Expand { attacker: attack, defender: defence, order })))
    }

    // Resolve the node of a frame that has run out of moves.
    // It succeeds if every attack was answered.
    fn finish(&mut self, frame: Frame) -> bool {
        let Frame { id, state, checkpoint, attacks, attack: current, refuted, .. } = frame;
        self.ancestors.remove(&state);
        match attacks.get(current) {
            None => {
                self.tree.resolve(id, Terminal::Success);
                self.cache.insert(state, id);
                true
            },
            Some(&attack) => {
                trace!("Node {id}: {state} fails on {} ({})",
                       self.net.transition(attack.transition).id, attack.order);
                self.tree[id].attack = Some(attack);
                for child in refuted {
                    self.tree.attach(id, child);
                }
                self.tree.resolve(id, Terminal::Fail);
                // Anything proven below may have assumed this node to be bisimilar
                self.cache.rollback(checkpoint);
                false
            },
        }
    }

    // Collect cache entries referenced by reductions of the compacted tree.
    fn basis(&mut self, mapping: &[Option<NodeId>]) -> Basis {
        let referenced: FxHashSet<NodeId> = self.tree.reductions()
            .map(|(_, target)| target)
            .collect();
        let used: Vec<NodeId> = self.cache.iter()
            .filter(|&(_, node)| mapping[node.index()].is_some_and(|new| referenced.contains(&new)))
            .map(|(_, node)| node)
            .collect();
        for node in used {
            self.cache.reused(node);
        }
        let entries = self.cache.basis()
            .filter_map(|(state, node)| mapping[node.index()].map(|new| (state.clone(), new)))
            .collect();
        Basis { entries }
    }
}

// Engine-internal firing. Only transitions checked to be enabled are fired,
// so apart from an overflow a failure here is a bug.
fn fire(net: &PetriNet, marking: &Marking, t: u32) -> Result<Marking, MarkingError> {
    match net.fire(marking, t) {
        Ok(next) => Ok(next),
        Err(FireError::Overflow { transition, place }) => Err(MarkingError::Overflow { transition, place }),
        Err(e @ FireError::NotEnabled { .. }) => panic!("{e} in {marking}, although it was checked before"),
    }
}
