use super::*;
use crate::prooftree::Node;

fn run(net: &PetriNet, first: &[u32], second: &[u32], conf: SolverConf) -> Outcome {
    Solver::new(net, conf)
        .run(Marking::from(first.to_vec()), Marking::from(second.to_vec()))
        .unwrap()
}

fn state(first: &[u32], second: &[u32]) -> GameState {
    GameState::new(Marking::from(first.to_vec()), Marking::from(second.to_vec()))
}

// Tokens move between two places, with the same action in both directions
fn swap_net() -> PetriNet {
    PetriNet::from_vectors(2, vec![
        ("t0", "a", vec![1, 0], vec![0, 1]),
        ("t1", "a", vec![0, 1], vec![1, 0]),
    ]).unwrap()
}

// x -a-> x1 -b->   versus   y -a-> y1 -c->
fn ab_vs_ac() -> PetriNet {
    PetriNet::from_vectors(4, vec![
        ("ta", "a", vec![1, 0, 0, 0], vec![0, 1, 0, 0]),
        ("tb", "b", vec![0, 1, 0, 0], vec![0, 0, 0, 0]),
        ("ua", "a", vec![0, 0, 1, 0], vec![0, 0, 0, 1]),
        ("uc", "c", vec![0, 0, 0, 1], vec![0, 0, 0, 0]),
    ]).unwrap()
}

#[test]
fn state_sides() {
    let s = state(&[1, 0], &[0, 1]);
    assert_eq!(s.sides(Order::Direct), (&Marking::from([1, 0]), &Marking::from([0, 1])));
    assert_eq!(s.sides(Order::Reverse), (&Marking::from([0, 1]), &Marking::from([1, 0])));
    assert!(!s.is_identity());
    assert_eq!(s.to_string(), "((1, 0), (0, 1))");
}

#[test]
fn identity_shortcut() {
    let net = swap_net();
    let outcome = run(&net, &[1, 0], &[1, 0], SolverConf::STANDARD);
    assert!(outcome.verdict);
    assert_eq!(outcome.tree.len(), 1);
    assert_eq!(outcome.tree.root().step, Move::Root);
    assert!(outcome.tree.root().is_leaf());
    assert_eq!(outcome.basis, None);
}

#[test]
fn reverse_children_swap_roles() {
    let net = swap_net();
    let outcome = run(&net, &[1, 0], &[0, 1], SolverConf::STANDARD);
    assert!(outcome.verdict);
    let tree = &outcome.tree;
    let children: Vec<&Node> = tree.children(NodeId::ROOT).collect();
    assert_eq!(children.len(), 2);

    assert_eq!(children[0].step, Move::Expand { attacker: 0, defender: 1, order: Order::Direct });
    assert_eq!(children[0].state, state(&[0, 1], &[1, 0]));

    // The second marking attacks with t1, the attacker's result comes first
    assert_eq!(children[1].step, Move::Expand { attacker: 1, defender: 0, order: Order::Reverse });
    assert_eq!(children[1].state, state(&[1, 0], &[0, 1]));
    // ...which is the root state again
    let reduce: Vec<&Node> = tree.children(children[1].id).collect();
    assert_eq!(reduce.len(), 1);
    assert_eq!(reduce[0].step, Move::Reduce { target: NodeId::ROOT });
    assert!(tree.audit(&net).is_ok());
}

#[test]
fn preorder_ids() {
    let net = swap_net();
    let outcome = run(&net, &[1, 0], &[0, 1], SolverConf::STANDARD);
    for (i, node) in outcome.tree.iter().enumerate() {
        assert_eq!(node.id, NodeId(i as u32));
        for &c in &node.children {
            assert!(c > node.id);
            assert_eq!(outcome.tree[c].parent, Some(node.id));
        }
    }
}

#[test]
fn deep_refutation() {
    let net = ab_vs_ac();
    let outcome = run(&net, &[1, 0, 0, 0], &[0, 0, 1, 0], SolverConf::STANDARD);
    assert!(!outcome.verdict);
    let tree = &outcome.tree;
    assert_eq!(tree.root().attack, Some(Attack { transition: 0, order: Order::Direct }));

    let path = tree.counterexample();
    assert_eq!(path.len(), 2);
    let refuted = &tree[path[1]];
    assert_eq!(refuted.step, Move::Expand { attacker: 0, defender: 2, order: Order::Direct });
    assert_eq!(refuted.state, state(&[0, 1, 0, 0], &[0, 0, 0, 1]));
    // `b` can't be answered by `c`
    assert_eq!(refuted.attack, Some(Attack { transition: 1, order: Order::Direct }));
    assert!(refuted.is_leaf());
    assert_eq!(tree.path_to(path[1]), path);
    assert!(tree.audit(&net).is_ok());
}

#[test]
fn all_refuted_defences_are_kept() {
    // Two ways to answer `a` on the second side, both lead to a dead end
    let net = PetriNet::from_vectors(4, vec![
        ("ta", "a", vec![1, 0, 0, 0], vec![0, 1, 0, 0]),
        ("tb", "b", vec![0, 1, 0, 0], vec![0, 1, 0, 0]),
        ("ua", "a", vec![0, 0, 1, 0], vec![0, 0, 0, 1]),
        ("va", "a", vec![0, 0, 1, 0], vec![0, 0, 0, 0]),
    ]).unwrap();
    let outcome = run(&net, &[1, 0, 0, 0], &[0, 0, 1, 0], SolverConf::STANDARD);
    assert!(!outcome.verdict);
    let defences: Vec<Move> = outcome.tree.children(NodeId::ROOT).map(|c| c.step).collect();
    assert_eq!(defences, vec![
        Move::Expand { attacker: 0, defender: 2, order: Order::Direct },
        Move::Expand { attacker: 0, defender: 3, order: Order::Direct },
    ]);
    assert!(outcome.tree.children(NodeId::ROOT).all(|c| c.terminal == Terminal::Fail));
    assert!(outcome.tree.audit(&net).is_ok());
}

#[test]
fn superseded_attempts_are_dropped() {
    // Against `ta` the first defence `ua` leads to a dead end, the second one `va`
    // to an equal marking
    let net = PetriNet::from_vectors(4, vec![
        ("ta", "a", vec![1, 0, 0, 0], vec![0, 1, 0, 0]),
        ("tb", "b", vec![0, 1, 0, 0], vec![0, 1, 0, 0]),
        ("ua", "a", vec![0, 0, 1, 0], vec![0, 0, 0, 1]),
        ("va", "a", vec![0, 0, 1, 0], vec![0, 1, 0, 0]),
        ("tz", "a", vec![1, 0, 0, 0], vec![0, 0, 0, 1]),
    ]).unwrap();
    let outcome = run(&net, &[1, 0, 0, 0], &[0, 0, 1, 0], SolverConf::STANDARD);
    assert!(outcome.verdict);
    let tree = &outcome.tree;
    assert!(tree.iter().all(Node::is_success));
    let steps: Vec<Move> = tree.children(NodeId::ROOT).map(|c| c.step).collect();
    assert_eq!(steps, vec![
        Move::Expand { attacker: 0, defender: 3, order: Order::Direct },
        Move::Expand { attacker: 4, defender: 2, order: Order::Direct },
        Move::Expand { attacker: 2, defender: 4, order: Order::Reverse },
        Move::Expand { attacker: 3, defender: 0, order: Order::Reverse },
    ]);
    // The reverse attacks end in identical markings proven by the direct ones
    assert_eq!(tree.reductions().count(), 2);
    assert!(tree.audit(&net).is_ok());
}

#[test]
fn failed_root_has_empty_basis() {
    // From (x, y) the attack `a` leads to (x, z) on the first defence and to
    // (x, x) on the second one. (x, z) fails.
    let net = PetriNet::from_vectors(3, vec![
        ("loop", "a", vec![1, 0, 0], vec![1, 0, 0]),
        ("bad", "a", vec![0, 1, 0], vec![0, 0, 1]),
        ("good", "a", vec![0, 1, 0], vec![1, 0, 0]),
        ("only_x", "b", vec![1, 0, 0], vec![1, 0, 0]),
    ]).unwrap();
    let outcome = run(&net, &[1, 0, 0], &[0, 1, 0], SolverConf::WITH_BASIS);
    // y can't do `b`
    assert!(!outcome.verdict);
    assert!(outcome.tree.audit(&net).is_ok());
    let basis = outcome.basis.unwrap();
    assert!(basis.is_empty(), "Nothing is proven when the root fails");
}

#[test]
fn cache_hit_across_branches() {
    // Both `a` and `b` lead from (p, q) to the same pair (r, r') which is not an identity
    let net = PetriNet::from_vectors(4, vec![
        ("pa", "a", vec![1, 0, 0, 0], vec![0, 0, 1, 0]),
        ("pb", "b", vec![1, 0, 0, 0], vec![0, 0, 1, 0]),
        ("qa", "a", vec![0, 1, 0, 0], vec![0, 0, 0, 1]),
        ("qb", "b", vec![0, 1, 0, 0], vec![0, 0, 0, 1]),
        ("r", "c", vec![0, 0, 1, 0], vec![0, 0, 0, 0]),
        ("r'", "c", vec![0, 0, 0, 1], vec![0, 0, 0, 0]),
    ]).unwrap();
    let outcome = run(&net, &[1, 0, 0, 0], &[0, 1, 0, 0], SolverConf::WITH_BASIS);
    assert!(outcome.verdict);
    let tree = &outcome.tree;
    assert!(tree.audit(&net).is_ok());

    let first = tree.children(NodeId::ROOT).next().unwrap();
    assert_eq!(first.state, state(&[0, 0, 1, 0], &[0, 0, 0, 1]));
    assert!(!first.is_leaf());
    let reused: Vec<NodeId> = tree.reductions()
        .filter(|&(_, target)| target == first.id)
        .map(|(id, _)| id)
        .collect();
    assert!(!reused.is_empty(), "Attack with `b` reuses the proof of the `a` branch");

    let basis = outcome.basis.unwrap();
    assert!(basis.contains(&first.state));
    for (state, node) in basis.iter() {
        assert_eq!(&tree[*node].state, state);
    }
}

#[test]
fn proofs_under_a_failed_node_are_forgotten() {
    // Places r1 r2 u v1 v2 w z u1. Against `ra` the defence `d1` reaches (u, v1),
    // which proves (w, z) and then fails on `ub`. The defence `d2` reaches
    // (u, v2) and meets (w, z) again.
    let net = PetriNet::from_vectors(8, vec![
        ("ra", "a", vec![1, 0, 0, 0, 0, 0, 0, 0], vec![0, 0, 1, 0, 0, 0, 0, 0]),
        ("ra1", "a", vec![1, 0, 0, 0, 0, 0, 0, 0], vec![0, 0, 0, 0, 0, 0, 0, 1]),
        ("d1", "a", vec![0, 1, 0, 0, 0, 0, 0, 0], vec![0, 0, 0, 1, 0, 0, 0, 0]),
        ("d2", "a", vec![0, 1, 0, 0, 0, 0, 0, 0], vec![0, 0, 0, 0, 1, 0, 0, 0]),
        ("us", "s", vec![0, 0, 1, 0, 0, 0, 0, 0], vec![0, 0, 0, 0, 0, 1, 0, 0]),
        ("u1s", "s", vec![0, 0, 0, 0, 0, 0, 0, 1], vec![0, 0, 0, 0, 0, 1, 0, 0]),
        ("v1s", "s", vec![0, 0, 0, 1, 0, 0, 0, 0], vec![0, 0, 0, 0, 0, 0, 1, 0]),
        ("v2s", "s", vec![0, 0, 0, 0, 1, 0, 0, 0], vec![0, 0, 0, 0, 0, 0, 1, 0]),
        ("ub", "b", vec![0, 0, 1, 0, 0, 0, 0, 0], vec![0, 0, 0, 0, 0, 0, 0, 0]),
        ("v2b", "b", vec![0, 0, 0, 0, 1, 0, 0, 0], vec![0, 0, 0, 0, 0, 0, 0, 0]),
    ]).unwrap();
    let outcome = run(&net, &[1, 0, 0, 0, 0, 0, 0, 0], &[0, 1, 0, 0, 0, 0, 0, 0], SolverConf::WITH_BASIS);
    assert!(outcome.verdict);
    let tree = &outcome.tree;
    if let Err(e) = tree.audit(&net) {
        panic!("{e}\n{}", tree.display(&net));
    }
    assert!(tree.iter().all(Node::is_success), "Failed attempts are superseded");

    let answer = tree.children(NodeId::ROOT).next().unwrap();
    assert_eq!(answer.step, Move::Expand { attacker: 0, defender: 3, order: Order::Direct });
    assert_eq!(answer.state, state(&[0, 0, 1, 0, 0, 0, 0, 0], &[0, 0, 0, 0, 1, 0, 0, 0]));

    // (w, z) is proven again below (u, v2), not reduced to the discarded proof
    let wz = state(&[0, 0, 0, 0, 0, 1, 0, 0], &[0, 0, 0, 0, 0, 0, 1, 0]);
    let proofs: Vec<&Node> = tree.iter()
        .filter(|n| n.state == wz && !n.is_reduce() && !tree.children(n.id).any(Node::is_reduce))
        .collect();
    assert_eq!(proofs.len(), 1);
    let proof = proofs[0];
    assert!(proof.is_leaf());
    assert_eq!(proof.parent, Some(answer.id));
    let reductions: Vec<NodeId> = tree.reductions()
        .filter(|&(id, _)| tree[id].state == wz)
        .map(|(_, target)| target)
        .collect();
    assert!(!reductions.is_empty(), "The `ra1` branch reuses (w, z)");
    assert!(reductions.iter().all(|&target| target == proof.id));

    let basis = outcome.basis.unwrap();
    assert!(basis.iter().any(|(s, node)| s == &wz && *node == proof.id));
    for (state, node) in basis.iter() {
        assert_eq!(&tree[*node].state, state);
    }
}

#[test]
#[should_panic(expected = "not enabled")]
fn firing_disabled_is_a_bug() {
    let net = swap_net();
    let _ = fire(&net, &Marking::from([0, 0]), 0);
}
