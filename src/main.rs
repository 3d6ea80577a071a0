use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use log::{debug, info};

use resbisim::*;

/// Decide whether two markings of a labeled Petri net are resource-bisimilar.
///
/// Exits with 0 if they are, 1 if they are not and 2 on invalid input.
#[derive(Parser, Debug)]
#[command(name = "resbisim")]
#[command(version)]
struct Cli {
    /// Net description in JSON, or in PNML if the file ends in `.pnml`
    net: PathBuf,

    /// CSV table with place ids and the two markings to compare
    #[arg(required_unless_present_all = ["first", "second"], conflicts_with_all = ["first", "second"])]
    resources: Option<PathBuf>,

    /// First marking, for example "(1, 0)"
    #[arg(long, requires = "second")]
    first: Option<String>,

    /// Second marking
    #[arg(long, requires = "first")]
    second: Option<String>,

    /// Collect the equivalences the proof reuses
    #[arg(long)]
    basis: bool,

    /// Explore pairs of equal markings instead of accepting them right away
    #[arg(long)]
    no_identity: bool,

    /// Write the proof tree as GraphML
    #[arg(long, value_name = "OUT.graphml")]
    tree: Option<PathBuf>,

    /// Write the basis as GraphML, implies --basis
    #[arg(long, value_name = "OUT.graphml")]
    basis_out: Option<PathBuf>,

    /// Write the complete outcome as JSON
    #[arg(long, value_name = "OUT.json")]
    json: Option<PathBuf>,

    /// Print the proof tree
    #[arg(short, long)]
    print: bool,
}

impl Cli {
    fn conf(&self) -> SolverConf {
        SolverConf {
            compute_basis: self.basis || self.basis_out.is_some(),
            identity_shortcut: !self.no_identity,
        }
    }

    fn markings(&self, net: &PetriNet) -> Result<(Marking, Marking)> {
        let markings = match (&self.resources, &self.first, &self.second) {
            (Some(path), _, _) => read_resources(path, net.places())?,
            (None, Some(first), Some(second)) => (Marking::parse(first)?, Marking::parse(second)?),
            // Ruled out by the argument parser
            _ => unreachable!("Neither a resource table nor two markings given"),
        };
        Ok(markings)
    }
}

fn read_net(path: &Path) -> Result<PetriNet> {
    let net = if path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("pnml")) {
        PetriNet::from_pnml_file(path)?
    } else {
        PetriNet::from_json_file(path)?
    };
    Ok(net)
}

fn run(cli: &Cli) -> Result<bool> {
    let net = read_net(&cli.net)?;
    debug!("Read net with {} places and {} transitions", net.n_places(), net.n_transitions());
    let (first, second) = cli.markings(&net)?;
    info!("Comparing {first} and {second}");

    let outcome = check_bisimilarity(&net, first, second, cli.conf())?;
    if cli.print {
        print!("{}", outcome.tree.display(&net));
    }
    if let Some(path) = &cli.tree {
        graphml::write_tree_file(path, &outcome.tree, &net)?;
    }
    if let (Some(path), Some(basis)) = (&cli.basis_out, &outcome.basis) {
        graphml::write_basis_file(path, basis)?;
    } else if let Some(basis) = &outcome.basis {
        for (state, node) in basis.iter() {
            println!("basis: {state} by node {node}");
        }
    }
    if let Some(path) = &cli.json {
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut writer, &outcome)
            .map_err(io::Error::from)?;
        writer.flush()?;
    }

    if outcome.verdict {
        println!("bisimilar");
    } else {
        println!("not bisimilar");
        // The last failed node shows an attack without any defence left
        if let Some(&id) = outcome.tree.counterexample().last() {
            let node = &outcome.tree[id];
            if let Some(attack) = node.attack {
                println!("{} ({}) cannot be answered in {}",
                         net.transition(attack.transition).id, attack.order, node.state);
            }
        }
    }
    Ok(outcome.verdict)
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();
    match run(&cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(2)
        },
    }
}
