// Compare two markings of a small producer/consumer net and print the proof tree.

use resbisim::{check_bisimilarity, Marking, PetriNet, Result, SolverConf};

fn main() -> Result<()> {
    env_logger::init();
    // Places: idle, busy, buffer
    let net = PetriNet::from_vectors(3, vec![
     // (Id, Label, Consumption, Production)
        ("start", "work", vec![1, 0, 0], vec![0, 1, 0]),
        ("finish", "deliver", vec![0, 1, 0], vec![0, 0, 1]),
        ("take", "consume", vec![0, 0, 1], vec![1, 0, 0]),
        // Starts work only while the buffer is full
        ("rush", "work", vec![1, 0, 1], vec![0, 1, 1]),
    ])?;

    for (first, second) in [([1, 0, 0], [0, 0, 1]), ([1, 0, 1], [1, 0, 1]), ([0, 1, 0], [0, 0, 1])] {
        let outcome = check_bisimilarity(&net, Marking::from(first), Marking::from(second),
                                         SolverConf::EXHAUSTIVE)?;
        println!("{} vs {}: {}", Marking::from(first), Marking::from(second),
                 if outcome.verdict { "bisimilar" } else { "not bisimilar" });
        print!("{}", outcome.tree.display(&net));
        println!();
    }
    Ok(())
}
