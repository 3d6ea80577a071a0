//! Markings and the resource table they are read from.

use std::fmt;
use std::fs::File;
use std::io::{self, BufRead, Write};
use std::iter;
use std::ops::Index;
use std::path::Path;

use rustc_hash::FxHashMap;

use crate::error::MarkingError;

/// Token counts, one entry per place of a net.
///
/// Markings are only ever compared for equality by the game engine.
/// The pointwise order is used to decide enabledness,
/// see [`covers()`](Marking::covers).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Marking(Vec<u32>);

impl Marking {
    #[inline]
    pub fn new(tokens: Vec<u32>) -> Self {
        Marking(tokens)
    }

    /// The empty marking over `places` places.
    pub fn zero(places: usize) -> Self {
        Marking(vec![0; places])
    }

    /// Number of places this marking is defined over.
    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[inline]
    pub fn tokens(&self) -> &[u32] {
        &self.0
    }

    #[inline]
    pub fn into_inner(self) -> Vec<u32> {
        self.0
    }

    /// Returns `true` if every place holds at least as many tokens as in `other`.
    ///
    /// Both markings must have the same length.
    pub fn covers(&self, other: &Marking) -> bool {
        debug_assert_eq!(self.len(), other.len(), "Markings over different place sets");
        iter::zip(&self.0, &other.0).all(|(a, b)| a >= b)
    }

    /// Pointwise difference, or `None` if some place would become negative.
    pub fn checked_sub(&self, other: &Marking) -> Option<Marking> {
        iter::zip(&self.0, &other.0)
            .map(|(a, b)| a.checked_sub(*b))
            .collect()
    }

    /// Parse a marking written as a comma separated list of counts.
    ///
    /// Surrounding parentheses or brackets are optional, so `(1, 0, 2)`,
    /// `[1,0,2]` and `1,0,2` all denote the same marking.
    pub fn parse(s: &str) -> Result<Self, MarkingError> {
        let mut inner = s.trim();
        if (inner.starts_with('(') && inner.ends_with(')'))
            || (inner.starts_with('[') && inner.ends_with(']'))
        {
            inner = &inner[1 .. inner.len() - 1];
        }
        if inner.trim().is_empty() {
            return Ok(Marking::default());
        }
        inner.split(',')
            .map(parse_count)
            .collect()
    }
}

// Only plain ASCII digits are accepted, no signs or whitespace within the number.
fn parse_count(value: &str) -> Result<u32, MarkingError> {
    let value = value.trim();
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(MarkingError::NotANumber(value.to_string()));
    }
    value.parse().map_err(|_| MarkingError::NotANumber(value.to_string()))
}

impl Index<usize> for Marking {
    type Output = u32;

    #[inline]
    fn index(&self, place: usize) -> &u32 {
        &self.0[place]
    }
}

impl From<Vec<u32>> for Marking {
    fn from(tokens: Vec<u32>) -> Self {
        Marking(tokens)
    }
}

impl<const N: usize> From<[u32; N]> for Marking {
    fn from(tokens: [u32; N]) -> Self {
        Marking(tokens.to_vec())
    }
}

impl FromIterator<u32> for Marking {
    fn from_iter<I: IntoIterator<Item=u32>>(iter: I) -> Self {
        Marking(iter.into_iter().collect())
    }
}

impl fmt::Display for Marking {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, n) in self.0.iter().enumerate() {
            if i == 0 {
                write!(f, "{n}")?;
            } else {
                write!(f, ", {n}")?;
            }
        }
        write!(f, ")")
    }
}


/// Read the two resource vectors to compare from a CSV file.
///
/// The file must consist of exactly three rows:
/// the place ids, the first marking and the second marking.
/// For example
///
/// ```text
/// buffer,free,done
/// 2,1,0
/// 1,2,0
/// ```
///
/// Columns may be listed in any order, they are rearranged to match `places`,
/// the place ids of the net in their canonical order.
/// Quotes around place ids are optional.
///
/// # Errors
///
/// A [`MarkingError`] is returned if the table does not have three rows,
/// if its place ids are not exactly those of the net,
/// if any count is not a non-negative integer,
/// or if there were problems reading the file.
pub fn read_resources<P: AsRef<Path>>(
    path: P,
    places: &[String],
) -> Result<(Marking, Marking), MarkingError> {
    let file = File::open(path)?;
    let lines = io::BufReader::new(file).lines();
    resources_from_csv_lines(lines, places)
}

/// Read the resource table from an iterator of CSV lines.
/// The format is described at [`read_resources()`].
pub fn resources_from_csv_lines(
    lines: impl Iterator<Item=io::Result<String>>,
    places: &[String],
) -> Result<(Marking, Marking), MarkingError> {
    let mut rows = Vec::with_capacity(3);
    for l in lines {
        let l = l?;
        if l.trim().is_empty() {
            continue;
        }
        rows.push(l);
    }
    if rows.len() != 3 {
        return Err(MarkingError::RowCount(rows.len()));
    }

    // Column index in the table => place index in the net
    let place_idx: FxHashMap<&str, usize> = places.iter()
        .enumerate()
        .map(|(i, p)| (p.as_str(), i))
        .collect();
    let mut columns = Vec::with_capacity(places.len());
    let mut seen = vec![false; places.len()];
    for tag in rows[0].split(',').map(strip_quotes) {
        let &idx = place_idx.get(tag).ok_or(MarkingError::PlaceMismatch)?;
        if seen[idx] {
            return Err(MarkingError::DuplicatePlace(tag.to_string()));
        }
        seen[idx] = true;
        columns.push(idx);
    }
    if columns.len() != places.len() {
        return Err(MarkingError::PlaceMismatch);
    }

    let mut markings = rows[1..].iter().map(|row| {
        let values: Vec<&str> = row.split(',').collect();
        if values.len() != columns.len() {
            return Err(MarkingError::WrongLength { expected: columns.len(), found: values.len() });
        }
        let mut tokens = vec![0; places.len()];
        for (&idx, value) in columns.iter().zip(values) {
            tokens[idx] = parse_count(value)?;
        }
        Ok(Marking(tokens))
    });
    // Exactly two rows remain
    let first = markings.next().unwrap_or(Err(MarkingError::RowCount(1)))?;
    let second = markings.next().unwrap_or(Err(MarkingError::RowCount(2)))?;
    Ok((first, second))
}

fn strip_quotes(tag: &str) -> &str {
    let tag = tag.trim();
    if tag.starts_with('"') && tag.ends_with('"') && tag.len() >= 2 {
        &tag[1 .. tag.len() - 1]
    } else {
        tag
    }
}

/// Write a resource table that can be read again with [`read_resources()`].
pub fn write_resources<W: Write>(
    mut writer: W,
    places: &[String],
    first: &Marking,
    second: &Marking,
) -> io::Result<()> {
    writeln!(writer, "{}", places.join(","))?;
    for marking in [first, second] {
        let row: Vec<String> = marking.tokens().iter().map(u32::to_string).collect();
        writeln!(writer, "{}", row.join(","))?;
    }
    Ok(())
}
