//! Labeled Petri nets, the static transition generator the game is played on.

#[cfg(feature = "pnml")]
mod pnml;

use std::fmt;
#[cfg(feature = "serde")]
use std::{fs::File, io};
#[cfg(any(feature = "serde", feature = "pnml"))]
use std::path::Path;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::{FireError, MarkingError, NetError};
use crate::marking::Marking;

/// A single labeled transition of a [`PetriNet`].
///
/// Firing the transition removes `consumption` from a marking and adds `production`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    /// Unique identifier of the transition
    pub id: String,
    /// Action name. Transitions with the same label can match each other.
    pub label: String,
    pub consumption: Marking,
    pub production: Marking,
}

impl Transition {
    pub fn new(id: impl Into<String>, label: impl Into<String>, consumption: Marking, production: Marking) -> Self {
        Transition {
            id: id.into(),
            label: label.into(),
            consumption,
            production,
        }
    }

    /// Net change of tokens per place when firing this transition.
    pub fn effect(&self) -> Vec<i64> {
        self.production.tokens().iter()
            .zip(self.consumption.tokens())
            .map(|(&post, &pre)| post as i64 - pre as i64)
            .collect()
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}, {:?}", self.id, self.label, self.effect())
    }
}


/// Place/transition net with labeled transitions.
///
/// The net is immutable once built and shared by both sides of a comparison.
/// Transitions are addressed by their index in [`transitions()`](PetriNet::transitions).
///
/// # Creation
///
/// A net can be built from consumption and production vectors directly:
///
/// ```
/// use resbisim::{PetriNet, Transition, Marking};
///
/// // A single place with a self-loop labeled `a`
/// let net = PetriNet::new(
///     vec!["p".to_string()],
///     vec![Transition::new("t", "a", Marking::from([1]), Marking::from([1]))],
/// ).unwrap();
/// assert!(net.enabled(&Marking::from([1]), 0));
/// assert!(!net.enabled(&Marking::from([0]), 0));
/// ```
///
/// More commonly it is read from a [`NetDescription`],
/// which lists places, transitions and the arcs between them.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "NetDescription", into = "NetDescription"))]
pub struct PetriNet {
    places: Vec<String>,
    transitions: Vec<Transition>,
    // All transitions sharing a label, in index order
    labels: FxHashMap<String, Vec<u32>>,
}

impl PetriNet {
    /// Build a net from its places and transitions.
    ///
    /// # Errors
    ///
    /// Returns a [`NetError`] if place or transition ids are not unique,
    /// or if any consumption or production vector does not have one entry per place.
    pub fn new(places: Vec<String>, transitions: Vec<Transition>) -> Result<Self, NetError> {
        let mut seen = FxHashSet::default();
        for p in &places {
            if !seen.insert(p.as_str()) {
                return Err(NetError::DuplicatePlace(p.clone()));
            }
        }
        let mut seen = FxHashSet::default();
        for t in &transitions {
            if !seen.insert(t.id.as_str()) {
                return Err(NetError::DuplicateTransition(t.id.clone()));
            }
            for vector in [&t.consumption, &t.production] {
                if vector.len() != places.len() {
                    return Err(NetError::VectorLength {
                        transition: t.id.clone(),
                        expected: places.len(),
                        found: vector.len(),
                    });
                }
            }
        }

        let mut labels: FxHashMap<String, Vec<u32>> = FxHashMap::default();
        for (i, t) in transitions.iter().enumerate() {
            labels.entry(t.label.clone()).or_default().push(i as u32);
        }
        Ok(PetriNet {
            places,
            transitions,
            labels,
        })
    }

    /// Build a net with anonymous places `p0, p1, ...` from a list of
    /// `(id, label, consumption, production)` tuples.
    pub fn from_vectors<S: Into<String>>(
        n_places: usize,
        transitions: Vec<(S, S, Vec<u32>, Vec<u32>)>,
    ) -> Result<Self, NetError> {
        let places = (0..n_places).map(|i| format!("p{i}")).collect();
        let transitions = transitions.into_iter()
            .map(|(id, label, pre, post)| Transition::new(id, label, pre.into(), post.into()))
            .collect();
        PetriNet::new(places, transitions)
    }

    /// Read a net from a JSON encoded [`NetDescription`].
    ///
    /// # Errors
    ///
    /// Returns a [`NetError`] if the file can't be read or parsed,
    /// or if the description is malformed.
    #[cfg(feature = "serde")]
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, NetError> {
        let file = File::open(path)?;
        Self::from_json_reader(io::BufReader::new(file))
    }

    /// Read a net from a PNML file, see [`NetDescription::from_pnml_str()`].
    ///
    /// # Errors
    ///
    /// Returns a [`NetError`] if the file can't be read or parsed,
    /// or if the description is malformed.
    #[cfg(feature = "pnml")]
    pub fn from_pnml_file<P: AsRef<Path>>(path: P) -> Result<Self, NetError> {
        let xml = std::fs::read_to_string(path)?;
        PetriNet::try_from(NetDescription::from_pnml_str(&xml)?)
    }

    #[cfg(feature = "serde")]
    pub fn from_json_reader<R: io::Read>(reader: R) -> Result<Self, NetError> {
        let description: NetDescription = serde_json::from_reader(reader)?;
        PetriNet::try_from(description)
    }

    /// Number of places, the length of every marking of this net.
    #[inline]
    pub fn n_places(&self) -> usize {
        self.places.len()
    }

    #[inline]
    pub fn n_transitions(&self) -> u32 {
        self.transitions.len() as u32
    }

    /// Place ids in marking order.
    #[inline]
    pub fn places(&self) -> &[String] {
        &self.places
    }

    #[inline]
    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    /// # Panics
    ///
    /// Panics if `t` is not a transition of this net.
    #[inline]
    pub fn transition(&self, t: u32) -> &Transition {
        &self.transitions[t as usize]
    }

    /// All transitions that carry the same label as `t`, including `t` itself,
    /// ordered by index.
    pub fn same_label(&self, t: u32) -> &[u32] {
        self.labels.get(&self.transition(t).label)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Returns `true` if `marking` holds enough tokens in every place to fire `t`.
    #[inline]
    pub fn enabled(&self, marking: &Marking, t: u32) -> bool {
        marking.covers(&self.transition(t).consumption)
    }

    /// Iterate over all transitions enabled under `marking`, in index order.
    pub fn enabled_transitions<'a>(&'a self, marking: &'a Marking) -> impl Iterator<Item=u32> + 'a {
        (0..self.n_transitions())
            .filter(move |&t| self.enabled(marking, t))
    }

    /// Fire transition `t`, returning the resulting marking.
    ///
    /// # Errors
    ///
    /// Returns [`FireError::NotEnabled`] if `marking` does not cover the consumption of `t`,
    /// and [`FireError::Overflow`] if a place can't hold the produced tokens.
    pub fn fire(&self, marking: &Marking, t: u32) -> Result<Marking, FireError> {
        let transition = self.transition(t);
        let mut tokens = marking.checked_sub(&transition.consumption)
            .ok_or(FireError::NotEnabled { transition: t })?
            .into_inner();
        for (place, (n, &post)) in tokens.iter_mut().zip(transition.production.tokens()).enumerate() {
            *n = n.checked_add(post).ok_or(FireError::Overflow { transition: t, place })?;
        }
        Ok(Marking::new(tokens))
    }

    /// Check that `marking` has one entry per place of this net.
    pub fn check_marking(&self, marking: &Marking) -> Result<(), MarkingError> {
        if marking.len() != self.n_places() {
            return Err(MarkingError::WrongLength { expected: self.n_places(), found: marking.len() });
        }
        Ok(())
    }

    /// Convert back into a description with one arc per place/transition pair.
    pub fn description(&self) -> NetDescription {
        let mut arcs = Vec::new();
        for t in &self.transitions {
            for (p, place) in self.places.iter().enumerate() {
                let pre = t.consumption[p];
                if pre > 0 {
                    arcs.push(ArcDesc { source: place.clone(), target: t.id.clone(), weight: pre });
                }
                let post = t.production[p];
                if post > 0 {
                    arcs.push(ArcDesc { source: t.id.clone(), target: place.clone(), weight: post });
                }
            }
        }
        NetDescription {
            places: self.places.clone(),
            transitions: self.transitions.iter()
                .map(|t| TransitionDesc { id: t.id.clone(), label: Some(t.label.clone()) })
                .collect(),
            arcs,
        }
    }
}


/// Place/transition graph as found in a net file.
///
/// Consumption and production vectors of the transitions are derived from the arcs:
/// an arc from a place to a transition adds to the consumption of that transition,
/// an arc from a transition to a place adds to its production.
///
/// With the `serde` feature this is the JSON format for nets:
///
/// ```json
/// {
///   "places": ["p0", "p1"],
///   "transitions": [{"id": "t0", "label": "a"}],
///   "arcs": [{"source": "p0", "target": "t0"}, {"source": "t0", "target": "p1", "weight": 2}]
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NetDescription {
    pub places: Vec<String>,
    pub transitions: Vec<TransitionDesc>,
    pub arcs: Vec<ArcDesc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TransitionDesc {
    pub id: String,
    /// Defaults to the id of the transition
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub label: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ArcDesc {
    pub source: String,
    pub target: String,
    #[cfg_attr(feature = "serde", serde(default = "unit_weight"))]
    pub weight: u32,
}

#[cfg(feature = "serde")]
fn unit_weight() -> u32 {
    1
}

impl TryFrom<NetDescription> for PetriNet {
    type Error = NetError;

    fn try_from(description: NetDescription) -> Result<Self, Self::Error> {
        let n_places = description.places.len();
        let mut place_idx = FxHashMap::default();
        for (i, p) in description.places.iter().enumerate() {
            if place_idx.insert(p.clone(), i).is_some() {
                return Err(NetError::DuplicatePlace(p.clone()));
            }
        }
        let mut transition_idx = FxHashMap::default();
        let mut transitions = Vec::with_capacity(description.transitions.len());
        for (i, t) in description.transitions.into_iter().enumerate() {
            if transition_idx.insert(t.id.clone(), i).is_some() {
                return Err(NetError::DuplicateTransition(t.id));
            }
            let label = t.label.unwrap_or_else(|| t.id.clone());
            transitions.push(Transition::new(t.id, label, Marking::zero(n_places), Marking::zero(n_places)));
        }

        // Repeated arcs accumulate
        let mut pre = vec![vec![0u32; n_places]; transitions.len()];
        let mut post = vec![vec![0u32; n_places]; transitions.len()];
        for arc in description.arcs {
            let source = arc.source.as_str();
            let target = arc.target.as_str();
            let weight = match (place_idx.get(source), transition_idx.get(target), transition_idx.get(source), place_idx.get(target)) {
                (Some(&p), Some(&t), _, _) => &mut pre[t][p],
                (_, _, Some(&t), Some(&p)) => &mut post[t][p],
                _ => return Err(NetError::UnknownArcEndpoint { source: arc.source, target: arc.target }),
            };
            *weight = weight.checked_add(arc.weight)
                .ok_or(NetError::WeightOverflow { source: arc.source, target: arc.target })?;
        }
        for ((t, pre), post) in transitions.iter_mut().zip(pre).zip(post) {
            t.consumption = pre.into();
            t.production = post.into();
        }
        PetriNet::new(description.places, transitions)
    }
}

impl From<PetriNet> for NetDescription {
    fn from(net: PetriNet) -> Self {
        net.description()
    }
}
