use std::{fmt, io, error, result};

use crate::prooftree::NodeId;

/// Top-level error of the crate, returned by the file-based entry points.
#[derive(Debug)]
pub enum Error {
    Net(NetError),
    Marking(MarkingError),
    Io(io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Net(source) => write!(f, "malformed net: {source}"),
            Error::Marking(source) => write!(f, "invalid marking: {source}"),
            Error::Io(source) => source.fmt(f),
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Error::Net(source) => Some(source),
            Error::Marking(source) => Some(source),
            Error::Io(source) => Some(source),
        }
    }
}

impl From<NetError> for Error {
    fn from(err: NetError) -> Error {
        Error::Net(err)
    }
}

impl From<MarkingError> for Error {
    fn from(err: MarkingError) -> Error {
        Error::Marking(err)
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        Error::Io(err)
    }
}

/// Type alias for `Result<T, resbisim::Error>`
pub type Result<T> = result::Result<T, Error>;


/// The net description could not be turned into a [`PetriNet`](crate::PetriNet).
#[derive(Debug)]
pub enum NetError {
    DuplicatePlace(String),
    DuplicateTransition(String),
    /// An arc does not connect a known place with a known transition.
    UnknownArcEndpoint {
        source: String,
        target: String,
    },
    /// A consumption or production vector does not have one entry per place.
    VectorLength {
        transition: String,
        expected: usize,
        found: usize,
    },
    /// The arcs between a place and a transition add up to more than `u32::MAX`.
    WeightOverflow {
        source: String,
        target: String,
    },
    /// An arc inscription is not a non-negative integer.
    InvalidWeight {
        source: String,
        target: String,
        value: String,
    },
    /// A PNML element lacks a mandatory attribute.
    MissingAttribute {
        element: String,
        attribute: &'static str,
    },
    #[cfg(feature = "serde")]
    Json(serde_json::Error),
    #[cfg(feature = "pnml")]
    Xml(quick_xml::Error),
    Io(io::Error),
}

impl fmt::Display for NetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetError::DuplicatePlace(id) => write!(f, "duplicate place id `{id}`"),
            NetError::DuplicateTransition(id) => write!(f, "duplicate transition id `{id}`"),
            NetError::UnknownArcEndpoint { source, target } => {
                write!(f, "arc from `{source}` to `{target}` does not connect a place and a transition")
            },
            NetError::VectorLength { transition, expected, found } => {
                write!(f, "transition `{transition}` has a vector of length {found}, expected {expected}")
            },
            NetError::WeightOverflow { source, target } => {
                write!(f, "arcs from `{source}` to `{target}` weigh more than {}", u32::MAX)
            },
            NetError::InvalidWeight { source, target, value } => {
                write!(f, "arc from `{source}` to `{target}` has weight `{value}`, expected a non-negative integer")
            },
            NetError::MissingAttribute { element, attribute } => {
                write!(f, "`{element}` element without `{attribute}` attribute")
            },
            #[cfg(feature = "serde")]
            NetError::Json(source) => source.fmt(f),
            #[cfg(feature = "pnml")]
            NetError::Xml(source) => source.fmt(f),
            NetError::Io(source) => source.fmt(f),
        }
    }
}

impl error::Error for NetError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            #[cfg(feature = "serde")]
            NetError::Json(source) => Some(source),
            #[cfg(feature = "pnml")]
            NetError::Xml(source) => Some(source),
            NetError::Io(source) => Some(source),
            _ => None,
        }
    }
}

impl From<io::Error> for NetError {
    fn from(e: io::Error) -> Self {
        NetError::Io(e)
    }
}

#[cfg(feature = "serde")]
impl From<serde_json::Error> for NetError {
    fn from(e: serde_json::Error) -> Self {
        NetError::Json(e)
    }
}

#[cfg(feature = "pnml")]
impl From<quick_xml::Error> for NetError {
    fn from(e: quick_xml::Error) -> Self {
        NetError::Xml(e)
    }
}


/// A resource vector was rejected before it could reach the game engine.
#[derive(Debug)]
pub enum MarkingError {
    WrongLength {
        expected: usize,
        found: usize,
    },
    /// A value is not a non-negative integer.
    NotANumber(String),
    /// The resource table must have exactly three rows.
    RowCount(usize),
    /// The place ids of the resource table differ from the ones of the net.
    PlaceMismatch,
    DuplicatePlace(String),
    /// A reachable marking holds more tokens in a place than can be counted.
    Overflow {
        transition: u32,
        place: usize,
    },
    IOError(io::Error),
}

impl fmt::Display for MarkingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarkingError::WrongLength { expected, found } => {
                write!(f, "marking has {found} entries, but the net has {expected} places")
            },
            MarkingError::NotANumber(value) => {
                write!(f, "`{value}` is not a non-negative integer")
            },
            MarkingError::RowCount(rows) => {
                write!(f, "resource table has {rows} rows instead of 3")
            },
            MarkingError::PlaceMismatch => write!(f, "place ids do not match the ones in the net"),
            MarkingError::DuplicatePlace(id) => write!(f, "resource table contains place `{id}` twice"),
            MarkingError::Overflow { transition, place } => {
                write!(f, "transition {transition} puts more than {} tokens on place {place}", u32::MAX)
            },
            MarkingError::IOError(source) => source.fmt(f),
        }
    }
}

impl error::Error for MarkingError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            MarkingError::IOError(source) => Some(source),
            _ => None,
        }
    }
}

impl From<io::Error> for MarkingError {
    fn from(e: io::Error) -> Self {
        MarkingError::IOError(e)
    }
}

impl From<MarkingError> for io::Error {
    fn from(e: MarkingError) -> io::Error {
        match e {
            MarkingError::IOError(source) => source,
            _ => io::Error::new(io::ErrorKind::InvalidData, e),
        }
    }
}


/// A transition could not be fired under the given marking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FireError {
    /// The marking does not cover the consumption of the transition.
    NotEnabled {
        transition: u32,
    },
    /// A place would hold more than `u32::MAX` tokens afterwards.
    Overflow {
        transition: u32,
        place: usize,
    },
}

impl fmt::Display for FireError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FireError::NotEnabled { transition } => write!(f, "transition {transition} is not enabled"),
            FireError::Overflow { transition, place } => {
                write!(f, "firing transition {transition} overflows the token count of place {place}")
            },
        }
    }
}

impl error::Error for FireError {}


/// A proof tree does not certify its verdict, see
/// [`ProofTree::audit()`](crate::ProofTree::audit).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProofError {
    Empty,
    /// Parent and child links disagree.
    Structure(NodeId),
    /// The first node of the tree is not a root, or a root appears elsewhere.
    Root(NodeId),
    Pending(NodeId),
    /// The markings of a child do not result from firing the recorded transitions.
    Firing(NodeId),
    /// Attacker and defender transitions carry different labels.
    Label(NodeId),
    /// A reduction refers to a missing node or one with a different state.
    Reduction(NodeId),
    /// A successful node leaves an enabled attack unanswered.
    Uncovered {
        node: NodeId,
        transition: u32,
    },
    /// A failed node does not show a distinguishing attack.
    Refutation(NodeId),
    /// A successful node has a failed child.
    Inconsistent(NodeId),
}

impl fmt::Display for ProofError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProofError::Empty => write!(f, "proof tree has no nodes"),
            ProofError::Structure(id) => write!(f, "node {id}: inconsistent parent and child links"),
            ProofError::Root(id) => write!(f, "node {id}: misplaced root"),
            ProofError::Pending(id) => write!(f, "node {id}: unresolved"),
            ProofError::Firing(id) => write!(f, "node {id}: markings do not match the recorded move"),
            ProofError::Label(id) => write!(f, "node {id}: attacker and defender labels differ"),
            ProofError::Reduction(id) => write!(f, "node {id}: invalid reduction"),
            ProofError::Uncovered { node, transition } => {
                write!(f, "node {node}: attack by transition {transition} is not answered")
            },
            ProofError::Refutation(id) => write!(f, "node {id}: failure without a distinguishing attack"),
            ProofError::Inconsistent(id) => write!(f, "node {id}: success with a failed child"),
        }
    }
}

impl error::Error for ProofError {}
