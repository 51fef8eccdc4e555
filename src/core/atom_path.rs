//! Hierarchical names built from atoms
//!
//! A path is written as `/`-separated atoms, e.g. `/plant/Line2/pumps/7`.
//! `.` segments are skipped and `..` becomes the empty atom, which inside
//! a path means "parent". An empty segment is an error.

use crate::core::atom::{Atom, AtomFormat};
use crate::core::scratch::{Scratch, SCRATCH_ATOMS};
use crate::error::InvalidInputReason;
use std::fmt;
use std::ops::{Add, AddAssign, Deref};
use std::str::FromStr;

/// Deepest path that can be parsed from text
pub const MAX_DEPTH: usize = SCRATCH_ATOMS;

const PARENT: &str = "..";

/// Upper bound of the number of atoms `text` parses into
///
/// Never smaller than the depth [`parse_into`] returns.
pub fn capacity_guess(text: &str) -> usize {
    text.bytes().filter(|&b| b == b'/').count() + 1
}

/// UTF-16 variant of [`capacity_guess`]
pub fn capacity_guess_utf16(text: &[u16]) -> usize {
    text.iter().filter(|&&c| c == b'/' as u16).count() + 1
}

/// Parse `text` into `atoms`, returning the depth
///
/// # Errors
/// - `EmptyAtomInPath` for `a//b` or a segment such as `__`
/// - `PathTooLong` if `atoms` cannot hold every segment
/// - any atom parse error
pub fn parse_into(text: &str, atoms: &mut [Atom]) -> Result<usize, InvalidInputReason> {
    let text = text.strip_prefix('/').unwrap_or(text);
    let text = text.strip_suffix('/').unwrap_or(text);
    if text.is_empty() {
        return Ok(0);
    }

    let mut depth = 0;
    for segment in text.split('/') {
        let atom = match segment {
            "" => return Err(InvalidInputReason::EmptyAtomInPath),
            "." => continue,
            PARENT => Atom::EMPTY,
            _ => {
                let atom = Atom::parse(segment)?;
                if atom.is_empty() {
                    return Err(InvalidInputReason::EmptyAtomInPath);
                }
                atom
            }
        };
        let slot = atoms
            .get_mut(depth)
            .ok_or(InvalidInputReason::PathTooLong)?;
        *slot = atom;
        depth += 1;
    }
    Ok(depth)
}

/// UTF-16 variant of [`parse_into`]
pub fn parse_utf16_into(text: &[u16], atoms: &mut [Atom]) -> Result<usize, InvalidInputReason> {
    let text = String::from_utf16(text).map_err(|_| InvalidInputReason::InvalidCharacter)?;
    parse_into(&text, atoms)
}

fn formatted_length_of(atoms: &[Atom], format: &AtomFormat) -> usize {
    if atoms.is_empty() {
        return 0;
    }
    let separators = atoms.len() - 1;
    separators
        + atoms
            .iter()
            .map(|a| {
                if a.is_empty() {
                    PARENT.len()
                } else {
                    a.formatted_length_with(format)
                }
            })
            .sum::<usize>()
}

fn format_atoms(atoms: &[Atom], format: &AtomFormat) -> String {
    let mut text = String::with_capacity(formatted_length_of(atoms, format));
    for (i, atom) in atoms.iter().enumerate() {
        if i > 0 {
            text.push('/');
        }
        if atom.is_empty() {
            text.push_str(PARENT);
        } else {
            text.push_str(&atom.format_with(format));
        }
    }
    text
}

fn parse_owned(text: &str, guess: usize) -> Result<Vec<Atom>, InvalidInputReason> {
    let mut atoms = vec![Atom::EMPTY; guess.min(MAX_DEPTH)];
    let depth = parse_into(text, &mut atoms)?;
    atoms.truncate(depth);
    Ok(atoms)
}

/// Owned sequence of atoms
#[derive(Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AtomPath(Vec<Atom>);

impl AtomPath {
    pub fn new() -> Self {
        AtomPath(Vec::new())
    }

    /// Empty path with room for `capacity` atoms
    pub fn with_capacity(capacity: usize) -> Self {
        AtomPath(Vec::with_capacity(capacity))
    }

    pub fn parse(text: &str) -> Result<Self, InvalidInputReason> {
        parse_owned(text, capacity_guess(text)).map(AtomPath)
    }

    pub fn parse_utf16(text: &[u16]) -> Result<Self, InvalidInputReason> {
        let text = String::from_utf16(text).map_err(|_| InvalidInputReason::InvalidCharacter)?;
        Self::parse(&text)
    }

    pub fn as_slice(&self) -> &[Atom] {
        &self.0
    }

    pub fn push(&mut self, atom: Atom) {
        self.0.push(atom);
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    /// Resize, filling new slots with the empty (parent) atom
    pub fn resize(&mut self, depth: usize) {
        self.0.resize(depth, Atom::EMPTY);
    }

    pub fn view(&self) -> AtomPathView<'_> {
        AtomPathView::from(self.as_slice())
    }

    pub fn format(&self) -> String {
        format_atoms(&self.0, &AtomFormat::default())
    }

    pub fn format_with(&self, format: &AtomFormat) -> String {
        format_atoms(&self.0, format)
    }

    pub fn formatted_length(&self) -> usize {
        formatted_length_of(&self.0, &AtomFormat::default())
    }

    pub fn into_vec(self) -> Vec<Atom> {
        self.0
    }
}

impl Deref for AtomPath {
    type Target = [Atom];

    fn deref(&self) -> &[Atom] {
        &self.0
    }
}

impl From<Vec<Atom>> for AtomPath {
    fn from(atoms: Vec<Atom>) -> Self {
        AtomPath(atoms)
    }
}

impl From<&[Atom]> for AtomPath {
    fn from(atoms: &[Atom]) -> Self {
        AtomPath(atoms.to_vec())
    }
}

impl From<Atom> for AtomPath {
    fn from(atom: Atom) -> Self {
        AtomPath(vec![atom])
    }
}

impl From<&AtomPathView<'_>> for AtomPath {
    fn from(view: &AtomPathView<'_>) -> Self {
        AtomPath(view.to_vec())
    }
}

impl FromStr for AtomPath {
    type Err = InvalidInputReason;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AtomPath::parse(s)
    }
}

impl fmt::Display for AtomPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format())
    }
}

impl fmt::Debug for AtomPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AtomPath({:?})", self.format())
    }
}

impl AddAssign<Atom> for AtomPath {
    fn add_assign(&mut self, atom: Atom) {
        self.0.push(atom);
    }
}

impl AddAssign<&[Atom]> for AtomPath {
    fn add_assign(&mut self, atoms: &[Atom]) {
        self.0.extend_from_slice(atoms);
    }
}

impl AddAssign<&AtomPath> for AtomPath {
    fn add_assign(&mut self, path: &AtomPath) {
        self.0.extend_from_slice(&path.0);
    }
}

impl AddAssign<&AtomPathView<'_>> for AtomPath {
    fn add_assign(&mut self, view: &AtomPathView<'_>) {
        self.0.extend_from_slice(view.as_slice());
    }
}

impl Add<Atom> for AtomPath {
    type Output = AtomPath;

    fn add(mut self, atom: Atom) -> AtomPath {
        self += atom;
        self
    }
}

impl Add<&AtomPath> for AtomPath {
    type Output = AtomPath;

    fn add(mut self, path: &AtomPath) -> AtomPath {
        self += path;
        self
    }
}

impl Add<&AtomPathView<'_>> for AtomPath {
    type Output = AtomPath;

    fn add(mut self, view: &AtomPathView<'_>) -> AtomPath {
        self += view;
        self
    }
}

enum Storage<'a> {
    Borrowed(&'a [Atom]),
    Scratch(Scratch, usize),
}

/// Read-only view of a path
///
/// Borrows existing atoms, or owns a pooled scratch buffer when parsed
/// from text. The scratch buffer goes back to the pool when the view is
/// dropped, and also when parsing fails.
pub struct AtomPathView<'a> {
    storage: Storage<'a>,
}

impl<'a> AtomPathView<'a> {
    /// Empty view
    pub const fn empty() -> Self {
        AtomPathView {
            storage: Storage::Borrowed(&[]),
        }
    }

    pub fn as_slice(&self) -> &[Atom] {
        match &self.storage {
            Storage::Borrowed(atoms) => *atoms,
            Storage::Scratch(scratch, depth) => &scratch[..*depth],
        }
    }

    /// Whether the view owns a scratch buffer
    pub fn is_owning(&self) -> bool {
        matches!(self.storage, Storage::Scratch(..))
    }

    /// `n` atoms starting at `offset`, clamped to the view
    pub fn sub(&self, offset: usize, n: usize) -> AtomPathView<'_> {
        let atoms = self.as_slice();
        if offset < atoms.len() {
            let n = n.min(atoms.len() - offset);
            AtomPathView::from(&atoms[offset..offset + n])
        } else {
            AtomPathView::empty()
        }
    }

    pub fn to_path(&self) -> AtomPath {
        AtomPath::from(self.as_slice())
    }

    pub fn format(&self) -> String {
        format_atoms(self.as_slice(), &AtomFormat::default())
    }

    pub fn format_with(&self, format: &AtomFormat) -> String {
        format_atoms(self.as_slice(), format)
    }

    pub fn formatted_length(&self) -> usize {
        formatted_length_of(self.as_slice(), &AtomFormat::default())
    }
}

impl AtomPathView<'static> {
    /// Parse text into a scratch-backed view
    pub fn parse(text: &str) -> Result<Self, InvalidInputReason> {
        let mut scratch = Scratch::take();
        let depth = parse_into(text, &mut scratch)?;
        Ok(AtomPathView {
            storage: Storage::Scratch(scratch, depth),
        })
    }

    pub fn parse_utf16(text: &[u16]) -> Result<Self, InvalidInputReason> {
        let mut scratch = Scratch::take();
        let depth = parse_utf16_into(text, &mut scratch)?;
        Ok(AtomPathView {
            storage: Storage::Scratch(scratch, depth),
        })
    }
}

impl Default for AtomPathView<'_> {
    fn default() -> Self {
        AtomPathView::empty()
    }
}

impl Deref for AtomPathView<'_> {
    type Target = [Atom];

    fn deref(&self) -> &[Atom] {
        self.as_slice()
    }
}

impl<'a> From<&'a [Atom]> for AtomPathView<'a> {
    fn from(atoms: &'a [Atom]) -> Self {
        AtomPathView {
            storage: Storage::Borrowed(atoms),
        }
    }
}

impl<'a> From<&'a AtomPath> for AtomPathView<'a> {
    fn from(path: &'a AtomPath) -> Self {
        AtomPathView::from(path.as_slice())
    }
}

impl PartialEq for AtomPathView<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl Eq for AtomPathView<'_> {}

impl PartialEq<AtomPath> for AtomPathView<'_> {
    fn eq(&self, other: &AtomPath) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl fmt::Display for AtomPathView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format())
    }
}

impl fmt::Debug for AtomPathView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AtomPathView")
            .field("path", &self.format())
            .field("owning", &self.is_owning())
            .finish()
    }
}

impl Add<&AtomPathView<'_>> for &AtomPathView<'_> {
    type Output = AtomPath;

    fn add(self, other: &AtomPathView<'_>) -> AtomPath {
        self.to_path() + other
    }
}

impl Add<Atom> for &AtomPathView<'_> {
    type Output = AtomPath;

    fn add(self, atom: Atom) -> AtomPath {
        self.to_path() + atom
    }
}

impl Add<&AtomPathView<'_>> for Atom {
    type Output = AtomPath;

    fn add(self, view: &AtomPathView<'_>) -> AtomPath {
        AtomPath::from(self) + view
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn atom(text: &str) -> Atom {
        Atom::parse(text).unwrap()
    }

    #[test]
    fn test_parse_simple() {
        let path = AtomPath::parse("/plant/Line2/7").unwrap();
        assert_eq!(path.as_slice(), &[atom("plant"), atom("Line2"), Atom::from(7u8)]);
        assert_eq!(path.format(), "plant/Line2/7");
    }

    #[test]
    fn test_parse_dots() {
        let path = AtomPath::parse("a/./../b/").unwrap();
        assert_eq!(path.as_slice(), &[atom("a"), Atom::EMPTY, atom("b")]);
        assert_eq!(path.format(), "a/../b");
    }

    #[test]
    fn test_empty_segments() {
        assert_eq!(AtomPath::parse("a//b"), Err(InvalidInputReason::EmptyAtomInPath));
        assert_eq!(AtomPath::parse("a/__/b"), Err(InvalidInputReason::EmptyAtomInPath));
        assert_eq!(AtomPath::parse("a/b//"), Err(InvalidInputReason::EmptyAtomInPath));
        assert!(AtomPath::parse("").unwrap().is_empty());
        assert!(AtomPath::parse("/").unwrap().is_empty());
    }

    #[test]
    fn test_atom_errors_propagate() {
        assert_eq!(AtomPath::parse("a/b.c"), Err(InvalidInputReason::InvalidCharacter));
        assert_eq!(
            AtomPath::parse("a/abcdefghijklmnop"),
            Err(InvalidInputReason::TextTooLong)
        );
    }

    #[test]
    fn test_path_too_long() {
        let mut atoms = [Atom::EMPTY; 2];
        assert_eq!(parse_into("a/b/c", &mut atoms), Err(InvalidInputReason::PathTooLong));
        assert_eq!(parse_into("a/b", &mut atoms), Ok(2));
        assert_eq!(parse_into("a/./b", &mut atoms), Ok(2));
    }

    #[test]
    fn test_capacity_guess_upper_bound() {
        for text in ["", "/", "a", "/a/b/", "a/./b", "x/../y/z"] {
            let depth = AtomPath::parse(text).unwrap().len();
            assert!(capacity_guess(text) >= depth, "{}", text);
        }
        let wide: Vec<u16> = "/a/b".encode_utf16().collect();
        assert_eq!(capacity_guess_utf16(&wide), 3);
    }

    #[test]
    fn test_formatted_length() {
        let path = AtomPath::parse("pumps/../Tank3/#x10000000").unwrap();
        assert_eq!(path.formatted_length(), path.format().len());
        assert_eq!(AtomPath::new().formatted_length(), 0);
    }

    #[test]
    fn test_view_from_text_owns_scratch() {
        let view = AtomPathView::parse("/a/b").unwrap();
        assert!(view.is_owning());
        assert_eq!(view.len(), 2);
        assert_eq!(view, AtomPath::parse("a/b").unwrap());
    }

    #[test]
    fn test_view_borrowed() {
        let path = AtomPath::parse("a/b/c").unwrap();
        let view = AtomPathView::from(&path);
        assert!(!view.is_owning());
        assert_eq!(view.sub(1, 5).as_slice(), &path[1..]);
        assert_eq!(view.sub(1, 1).as_slice(), &path[1..2]);
        assert!(view.sub(3, 1).is_empty());
    }

    #[test]
    fn test_failed_view_parse() {
        assert_eq!(
            AtomPathView::parse("a//b").unwrap_err(),
            InvalidInputReason::EmptyAtomInPath
        );
    }

    #[test]
    fn test_concatenation() {
        let mut path = AtomPath::parse("a").unwrap();
        path += atom("b");
        path += &AtomPath::parse("c/d").unwrap();
        let view = AtomPathView::parse("e").unwrap();
        path += &view;
        assert_eq!(path.format(), "a/b/c/d/e");

        let joined = &AtomPathView::from(&path) + &view;
        assert_eq!(joined.len(), 6);
        let prefixed = atom("root") + &view;
        assert_eq!(prefixed.format(), "root/e");
    }

    #[test]
    fn test_utf16_paths() {
        let wide: Vec<u16> = "/Area1/valves".encode_utf16().collect();
        let path = AtomPath::parse_utf16(&wide).unwrap();
        assert_eq!(path.format(), "Area1/valves");
        let view = AtomPathView::parse_utf16(&wide).unwrap();
        assert_eq!(view, path);
    }
}
