//! Reading nets from PNML, the XML interchange format for Petri nets.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use super::{ArcDesc, NetDescription, TransitionDesc};
use crate::error::NetError;

impl NetDescription {
    /// Parse a place/transition net in PNML.
    ///
    /// Places, transitions and arcs are collected in document order from
    /// anywhere in the document, so nets split into pages are flattened.
    /// The label of a transition is the text of its `<name>`, defaulting to its id.
    /// Arc weights are read from `<inscription>` and default to 1.
    /// Graphical and tool specific information is ignored.
    ///
    /// ```
    /// use resbisim::{NetDescription, PetriNet, Marking};
    ///
    /// let xml = r#"<pnml><net id="n" type="http://www.pnml.org/version-2009/grammar/ptnet"><page id="g">
    ///     <place id="p0"/>
    ///     <place id="p1"/>
    ///     <transition id="t0"><name><text>a</text></name></transition>
    ///     <arc id="a0" source="p0" target="t0"/>
    ///     <arc id="a1" source="t0" target="p1"><inscription><text>2</text></inscription></arc>
    /// </page></net></pnml>"#;
    /// let net = PetriNet::try_from(NetDescription::from_pnml_str(xml).unwrap()).unwrap();
    /// assert_eq!(net.transition(0).label, "a");
    /// assert_eq!(net.transition(0).production, Marking::from([0, 2]));
    /// ```
    ///
    /// # Errors
    ///
    /// Returns a [`NetError`] if the document is not well-formed XML,
    /// if a place, transition or arc lacks its identifying attributes,
    /// or if an inscription is not a non-negative integer.
    /// Dangling arcs are only detected when converting into a
    /// [`PetriNet`](crate::PetriNet).
    pub fn from_pnml_str(xml: &str) -> Result<Self, NetError> {
        let mut reader = Reader::from_str(xml);
        let mut description = NetDescription::default();
        // Local names of all open elements
        let mut path: Vec<Vec<u8>> = Vec::new();
        loop {
            match reader.read_event()? {
                Event::Start(element) => {
                    open(&mut description, &element)?;
                    path.push(element.local_name().as_ref().to_vec());
                },
                Event::Empty(element) => open(&mut description, &element)?,
                Event::End(_) => {
                    path.pop();
                },
                Event::Text(text) => {
                    let text = text.unescape()?;
                    let text = text.trim();
                    if !text.is_empty() {
                        content(&mut description, &path, text)?;
                    }
                },
                Event::Eof => break,
                _ => {},
            }
        }
        Ok(description)
    }
}

fn open(description: &mut NetDescription, element: &BytesStart) -> Result<(), NetError> {
    match element.local_name().as_ref() {
        b"place" => description.places.push(attribute(element, "id")?),
        b"transition" => {
            let id = attribute(element, "id")?;
            description.transitions.push(TransitionDesc { id, label: None });
        },
        b"arc" => {
            let source = attribute(element, "source")?;
            let target = attribute(element, "target")?;
            description.arcs.push(ArcDesc { source, target, weight: 1 });
        },
        _ => {},
    }
    Ok(())
}

// Text is only meaningful as a transition name or an arc inscription
fn content(description: &mut NetDescription, path: &[Vec<u8>], text: &str) -> Result<(), NetError> {
    let [.., owner, kind, leaf] = path else {
        return Ok(());
    };
    if leaf.as_slice() != b"text" {
        return Ok(());
    }
    match (owner.as_slice(), kind.as_slice()) {
        (b"transition", b"name") => {
            if let Some(transition) = description.transitions.last_mut() {
                transition.label = Some(text.to_string());
            }
        },
        (b"arc", b"inscription") => {
            if let Some(arc) = description.arcs.last_mut() {
                arc.weight = text.parse().map_err(|_| NetError::InvalidWeight {
                    source: arc.source.clone(),
                    target: arc.target.clone(),
                    value: text.to_string(),
                })?;
            }
        },
        _ => {},
    }
    Ok(())
}

fn attribute(element: &BytesStart, name: &'static str) -> Result<String, NetError> {
    let value = element.try_get_attribute(name)
        .map_err(quick_xml::Error::from)?
        .ok_or_else(|| NetError::MissingAttribute {
            element: String::from_utf8_lossy(element.local_name().as_ref()).into_owned(),
            attribute: name,
        })?;
    Ok(value.unescape_value()?.into_owned())
}
