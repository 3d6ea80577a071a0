// Two subtrees reach the same pair of markings. The second one is closed by a
// reduction, which makes the pair part of the basis.
// The proof tree and the basis are written as GraphML files.

use resbisim::{check_to_files, Marking, PetriNet, Result, SolverConf};

fn main() -> Result<()> {
    env_logger::init();
    let net = PetriNet::from_vectors(2, vec![
        ("t0", "a", vec![1, 1], vec![2, 1]),
        ("t1", "a", vec![2, 0], vec![2, 1]),
    ])?;
    let bisimilar = check_to_files(&net, Marking::from([1, 1]), Marking::from([2, 0]),
                                   SolverConf::WITH_BASIS, "tree.graphml", Some("basis.graphml"))?;
    println!("Bisimilar: {bisimilar}, written to tree.graphml and basis.graphml");
    Ok(())
}
