//! GraphML export of proof trees and bases.
//!
//! Every node of the tree becomes a `<node>` element carrying the two markings
//! and the move that produced it as attributes,
//! every parent-child link becomes an `<edge>`.
//! Markings are written as `(a, b, c)`, transitions as `id, label`.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use super::{Basis, Move, ProofTree};
use crate::net::PetriNet;

const HEADER: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<graphml xmlns="http://graphml.graphdrawing.org/xmlns">"#;

/// Write `tree` to `writer`, resolving transition names through `net`.
pub fn write_tree<W: Write>(mut writer: W, tree: &ProofTree, net: &PetriNet) -> io::Result<()> {
    writeln!(writer, "{HEADER}")?;
    writeln!(writer, r#"  <graph id="proof" edgedefault="directed">"#)?;
    for node in tree.iter() {
        write!(writer, r#"    <node id="{}" first="{}" second="{}""#,
               node.id, node.state.first, node.state.second)?;
        if let Some(tag) = node.terminal.tag() {
            write!(writer, r#" terminal="{tag}""#)?;
        }
        match node.step {
            Move::Root => {},
            Move::Expand { attacker, defender, order } => {
                let delta = net.transition(attacker);
                let gamma = net.transition(defender);
                write!(writer, r#" delta="{}, {}" gamma="{}, {}" order="{order}""#,
                       escape(&delta.id), escape(&delta.label),
                       escape(&gamma.id), escape(&gamma.label))?;
            },
            Move::Reduce { target } => write!(writer, r#" reduce="{target}""#)?,
        }
        if let Some(attack) = node.attack {
            write!(writer, r#" attack="{}" attack_order="{}""#,
                   escape(&net.transition(attack.transition).id), attack.order)?;
        }
        writeln!(writer, "/>")?;
    }
    for node in tree.iter() {
        for child in &node.children {
            writeln!(writer, r#"    <edge source="{}" target="{child}"/>"#, node.id)?;
        }
    }
    writeln!(writer, "  </graph>")?;
    writeln!(writer, "</graphml>")
}

/// Write the equivalences of `basis` as `<pair>` elements.
pub fn write_basis<W: Write>(mut writer: W, basis: &Basis) -> io::Result<()> {
    writeln!(writer, "{HEADER}")?;
    writeln!(writer, "  <basis>")?;
    for (state, node) in basis.iter() {
        writeln!(writer, r#"    <pair first="{}" second="{}" node="{node}"/>"#,
                 state.first, state.second)?;
    }
    writeln!(writer, "  </basis>")?;
    writeln!(writer, "</graphml>")
}

pub fn write_tree_file<P: AsRef<Path>>(path: P, tree: &ProofTree, net: &PetriNet) -> io::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    write_tree(&mut writer, tree, net)?;
    writer.flush()
}

pub fn write_basis_file<P: AsRef<Path>>(path: P, basis: &Basis) -> io::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    write_basis(&mut writer, basis)?;
    writer.flush()
}

// Escape characters with special meaning inside XML attribute values
fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
