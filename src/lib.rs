//! Decide resource bisimilarity of two markings of a labeled Petri net.
//!
//! Two markings of the same net are *resource-bisimilar* if every transition
//! enabled in one of them can be matched by a transition with the same label
//! in the other, such that the resulting markings are again bisimilar,
//! and so on without bound.
//! Although the state space of a Petri net is in general infinite,
//! the check is carried out as a finite game search that recognizes repeated
//! states, either on the current path or anywhere in the proof built so far.
//!
//! Apart from the verdict, every check produces a [`ProofTree`]:
//! a certificate of bisimilarity or a counter-example,
//! which can be verified independently with [`ProofTree::audit()`]
//! and exported to GraphML with the [`graphml`] module.
//!
//! # Usage
//!
//! ```
//! use resbisim::{PetriNet, Marking, SolverConf, check_bisimilarity};
//!
//! let net = PetriNet::from_vectors(2, vec![
//!     // Move a token from the first to the second place
//!     ("t0", "a", vec![1, 0], vec![0, 1]),
//! ]).unwrap();
//!
//! // `a` is enabled in the first marking, but not in the second
//! let outcome = check_bisimilarity(&net, Marking::from([1, 0]), Marking::from([0, 1]),
//!                                  SolverConf::STANDARD).unwrap();
//! assert!(!outcome.verdict);
//! // The root of the proof tree records the distinguishing attack
//! let attack = outcome.tree.root().attack.unwrap();
//! assert_eq!(net.transition(attack.transition).id, "t0");
//! ```
//!
//! ### Basis
//!
//! With [`SolverConf::compute_basis`] set, the outcome additionally contains a
//! [`Basis`]: the pairs of markings that were proven bisimilar once and then
//! reused elsewhere in the proof.
//!
//! # Serde
//!
//! When compiled with the feature flag `serde` (enabled by default through `cli`),
//! nets are read from JSON descriptions (see [`NetDescription`]),
//! and markings, proof trees and outcomes implement serde's
//! `Serialize` and `Deserialize` traits.
//!
//! # PNML
//!
//! The feature flag `pnml` (also enabled through `cli`) adds
//! `NetDescription::from_pnml_str` and `PetriNet::from_pnml_file`
//! for nets exchanged in the Petri Net Markup Language.

pub mod cache;
pub mod game;
pub mod net;
pub mod prooftree;
mod error;
mod marking;

// Re-exports
pub use error::*;
pub use marking::*;
pub use cache::EquivalenceCache;
pub use game::{GameState, Outcome, Solver, SolverConf};
pub use net::{NetDescription, PetriNet, Transition};
pub use prooftree::{graphml, Attack, Basis, Move, Node, NodeId, Order, ProofTree, Terminal};

use std::path::Path;
use std::result;
use std::sync::Arc;
use std::thread;

/// Check two markings of `net` for bisimilarity.
///
/// # Errors
///
/// Returns a [`MarkingError`] if either marking does not have one entry
/// per place of `net`, or if the game reaches a marking with more than
/// `u32::MAX` tokens in a place. Non-bisimilarity is not an error,
/// it is reported through [`Outcome::verdict`].
pub fn check_bisimilarity(
    net: &PetriNet,
    first: Marking,
    second: Marking,
    conf: SolverConf,
) -> result::Result<Outcome, MarkingError> {
    Solver::new(net, conf).run(first, second)
}

/// Check two markings and write the proof tree, and the basis if requested,
/// as GraphML files.
///
/// Returns the verdict.
pub fn check_to_files<P: AsRef<Path>, Q: AsRef<Path>>(
    net: &PetriNet,
    first: Marking,
    second: Marking,
    conf: SolverConf,
    tree_path: P,
    basis_path: Option<Q>,
) -> Result<bool> {
    let outcome = check_bisimilarity(net, first, second, conf)?;
    graphml::write_tree_file(tree_path, &outcome.tree, net)?;
    if let (Some(path), Some(basis)) = (basis_path, &outcome.basis) {
        graphml::write_basis_file(path, basis)?;
    }
    Ok(outcome.verdict)
}

/// Run a check on a dedicated thread.
///
/// The search can take long, this keeps an interactive caller responsive.
/// Every spawned check owns its own cache, so any number of them may run at once.
pub fn spawn_check(
    net: Arc<PetriNet>,
    first: Marking,
    second: Marking,
    conf: SolverConf,
) -> thread::JoinHandle<result::Result<Outcome, MarkingError>> {
    thread::spawn(move || check_bisimilarity(&net, first, second, conf))
}
