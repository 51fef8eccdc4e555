//! Atom: a 64-bit interned name
//!
//! An atom is either a 63-bit unsigned number or a short string packed
//! into the same machine word, so that directory keys compare with a
//! single integer comparison.
//!
//! # Layout
//!
//! ```text
//! bit 63      : 1 = numeric, 0 = string
//! numeric     : bits 0..=62 hold the value (0 ..= 2^63-1)
//! string      : bits 62..=3 hold twelve 5-bit code units (unit 0 first)
//!               bit 2 = final character is wide, stored in slot 11
//!               bit 1 = reserved (zero)
//!               bit 0 = trailing 's'
//! ```
//!
//! Narrow code units: `0` space, `1` wide escape, `2..=27` `a..=z`,
//! `28..=31` `0..=3`. A wide character is the escape unit followed by a
//! unit selecting `A..=Z` (0..=25) or `4..=9` (26..=31).
//!
//! Parsing normalizes `_` and `-` to spaces and drops trailing spaces, so
//! the encoding of a given text is unique and raw equality is text
//! equality.

use crate::error::InvalidInputReason;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const NUMERIC_BIT: u64 = 1 << 63;
const WIDE_TAIL_BIT: u64 = 1 << 2;
const TRAILING_S_BIT: u64 = 1;

const UNIT_BITS: u32 = 5;
const UNIT_MASK: u64 = 0x1F;
const SLOTS: usize = 12;
const WIDE_TAIL_SLOT: usize = SLOTS - 1;

const SPACE: u8 = 0;
const ESCAPE: u8 = 1;
const LETTER_S: u8 = 2 + (b's' - b'a');

/// Largest value a numeric atom can hold
pub const MAX_NUMBER: u64 = NUMERIC_BIT - 1;

/// Most characters a string atom can decode to
pub const MAX_CHARACTERS: usize = 14;

/// Options for converting an atom to text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AtomFormat {
    /// Numbers at or above this value print as hexadecimal; 0 = always decimal
    pub hexadecimal_threshold: u64,
    /// Prefix written before hexadecimal digits
    pub hexadecimal_prefix: String,
    /// Character written for spaces; ' ', '-' or '_' round-trip
    pub space_character: char,
    /// Character opening string atoms
    pub string_enclosure: Option<char>,
    /// Character closing string atoms, defaults to `string_enclosure`
    pub string_enclosure_end: Option<char>,
}

impl Default for AtomFormat {
    fn default() -> Self {
        AtomFormat {
            hexadecimal_threshold: 10_000_000,
            hexadecimal_prefix: "#x".to_string(),
            space_character: '_',
            string_enclosure: None,
            string_enclosure_end: None,
        }
    }
}

impl AtomFormat {
    fn enclosure(&self) -> (Option<char>, Option<char>) {
        (
            self.string_enclosure,
            self.string_enclosure_end.or(self.string_enclosure),
        )
    }
}

/// One character of a decomposed string atom
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DecomposedCharacter {
    /// Spans an escape unit plus a value unit (or sits in the wide tail)
    pub wide: bool,
    /// Encoded as the trailing-'s' bit rather than as a code unit
    pub trail: bool,
    /// 5-bit code unit value (the second unit for wide characters)
    pub value: u8,
    /// Character as formatted
    pub character: char,
}

/// Character breakdown of a string atom, see [`Atom::decompose`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Decomposition {
    length: u8,
    characters: [DecomposedCharacter; MAX_CHARACTERS],
}

impl Decomposition {
    fn push(&mut self, character: DecomposedCharacter) {
        if (self.length as usize) < MAX_CHARACTERS {
            self.characters[self.length as usize] = character;
            self.length += 1;
        }
    }

    /// Number of characters, trailing spaces excluded
    pub fn len(&self) -> usize {
        self.length as usize
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    pub fn characters(&self) -> &[DecomposedCharacter] {
        &self.characters[..self.length as usize]
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Code {
    Narrow(u8),
    Wide(u8),
}

fn classify(c: char) -> Option<Code> {
    match c {
        ' ' | '_' | '-' => Some(Code::Narrow(SPACE)),
        'a'..='z' => Some(Code::Narrow(2 + (c as u8 - b'a'))),
        '0'..='3' => Some(Code::Narrow(28 + (c as u8 - b'0'))),
        'A'..='Z' => Some(Code::Wide(c as u8 - b'A')),
        '4'..='9' => Some(Code::Wide(26 + (c as u8 - b'4'))),
        _ => None,
    }
}

fn narrow_character(value: u8) -> char {
    match value {
        2..=27 => (b'a' + value - 2) as char,
        28..=31 => (b'0' + value - 28) as char,
        _ => ' ',
    }
}

fn wide_character(value: u8) -> char {
    match value {
        0..=25 => (b'A' + value) as char,
        _ => (b'4' + (value & UNIT_MASK as u8) - 26) as char,
    }
}

fn slot_shift(slot: usize) -> u32 {
    63 - UNIT_BITS * (slot as u32 + 1)
}

/// 64-bit value holding a 63-bit number or a short string
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(transparent)]
pub struct Atom(u64);

impl Atom {
    /// The empty string atom; means "parent" inside a path
    pub const EMPTY: Atom = Atom(0);

    /// Reinterpret a raw 64-bit word
    pub const fn from_raw(raw: u64) -> Self {
        Atom(raw)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }

    /// Numeric atom, fails with `NumberTooLarge` at 2^63 and above
    pub fn from_number(number: u64) -> Result<Self, InvalidInputReason> {
        if number <= MAX_NUMBER {
            Ok(Atom(NUMERIC_BIT | number))
        } else {
            Err(InvalidInputReason::NumberTooLarge)
        }
    }

    pub fn numeric(self) -> Option<u64> {
        if self.is_numeric() {
            Some(self.0 & MAX_NUMBER)
        } else {
            None
        }
    }

    pub fn is_numeric(self) -> bool {
        self.0 & NUMERIC_BIT != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Reset to the empty string atom
    pub fn clear(&mut self) {
        self.0 = 0;
    }

    /// Parse a number (decimal, or hexadecimal after `#`, `#x`, `#X`) or a short string
    pub fn parse(text: &str) -> Result<Self, InvalidInputReason> {
        if let Some(hex) = text.strip_prefix('#') {
            let digits = hex
                .strip_prefix('x')
                .or_else(|| hex.strip_prefix('X'))
                .unwrap_or(hex);
            return Self::parse_number(digits, 16);
        }
        // trailing spaces are dropped, so "12 " is the number 12
        let digits = text.trim_end_matches([' ', '_', '-']);
        if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
            return Self::parse_number(digits, 10);
        }
        Self::parse_string(text)
    }

    /// Parse UTF-16 input, see [`Atom::parse`]
    pub fn parse_utf16(text: &[u16]) -> Result<Self, InvalidInputReason> {
        let text = String::from_utf16(text).map_err(|_| InvalidInputReason::InvalidCharacter)?;
        Self::parse(&text)
    }

    fn parse_number(digits: &str, radix: u32) -> Result<Self, InvalidInputReason> {
        if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
            return Err(InvalidInputReason::InvalidCharacter);
        }
        let mut value: u64 = 0;
        for c in digits.chars() {
            let digit = c.to_digit(radix).unwrap_or(0) as u64;
            value = value
                .checked_mul(radix as u64)
                .and_then(|v| v.checked_add(digit))
                .ok_or(InvalidInputReason::NumberTooLarge)?;
        }
        Self::from_number(value)
    }

    fn parse_string(text: &str) -> Result<Self, InvalidInputReason> {
        let mut codes = Vec::with_capacity(MAX_CHARACTERS);
        for c in text.chars() {
            let code = classify(c).ok_or(InvalidInputReason::InvalidCharacter)?;
            codes.push(code);
        }
        while codes.last() == Some(&Code::Narrow(SPACE)) {
            codes.pop();
        }
        if codes.is_empty() {
            return Ok(Atom::EMPTY);
        }

        let ends_in_space = |codes: &[Code]| codes.last() == Some(&Code::Narrow(SPACE));
        let mut raw = 0u64;

        if codes.last() == Some(&Code::Narrow(LETTER_S)) && !ends_in_space(&codes[..codes.len() - 1]) {
            codes.pop();
            raw |= TRAILING_S_BIT;
        }

        let mut wide_tail = None;
        if let Some(&Code::Wide(value)) = codes.last() {
            if !ends_in_space(&codes[..codes.len() - 1]) {
                codes.pop();
                wide_tail = Some(value);
            }
        }

        let capacity = if wide_tail.is_some() { SLOTS - 1 } else { SLOTS };
        let mut slot = 0usize;
        for code in codes {
            let (units, used) = match code {
                Code::Narrow(value) => ([value, 0], 1),
                Code::Wide(value) => ([ESCAPE, value], 2),
            };
            if slot + used > capacity {
                return Err(InvalidInputReason::TextTooLong);
            }
            for &unit in &units[..used] {
                raw |= (unit as u64) << slot_shift(slot);
                slot += 1;
            }
        }
        if let Some(value) = wide_tail {
            raw |= WIDE_TAIL_BIT | ((value as u64) << slot_shift(WIDE_TAIL_SLOT));
        }
        Ok(Atom(raw))
    }

    fn unit(self, slot: usize) -> u8 {
        ((self.0 >> slot_shift(slot)) & UNIT_MASK) as u8
    }

    /// Character breakdown of a string atom; `None` for numeric atoms
    pub fn decompose(self) -> Option<Decomposition> {
        self.decompose_with(&AtomFormat::default())
    }

    pub fn decompose_with(self, format: &AtomFormat) -> Option<Decomposition> {
        if self.is_numeric() {
            return None;
        }

        let mut result = Decomposition::default();
        let has_wide_tail = self.0 & WIDE_TAIL_BIT != 0;
        let body = if has_wide_tail { WIDE_TAIL_SLOT } else { SLOTS };

        let mut slot = 0;
        while slot < body {
            let unit = self.unit(slot);
            if unit == ESCAPE {
                if slot + 1 >= body {
                    break;
                }
                let value = self.unit(slot + 1);
                result.push(DecomposedCharacter {
                    wide: true,
                    trail: false,
                    value,
                    character: wide_character(value),
                });
                slot += 2;
            } else {
                result.push(DecomposedCharacter {
                    wide: false,
                    trail: false,
                    value: unit,
                    character: if unit == SPACE {
                        format.space_character
                    } else {
                        narrow_character(unit)
                    },
                });
                slot += 1;
            }
        }
        while let Some(last) = result.characters().last() {
            if last.wide || last.value != SPACE {
                break;
            }
            result.length -= 1;
        }

        if has_wide_tail {
            let value = self.unit(WIDE_TAIL_SLOT);
            result.push(DecomposedCharacter {
                wide: true,
                trail: false,
                value,
                character: wide_character(value),
            });
        }
        if self.0 & TRAILING_S_BIT != 0 {
            result.push(DecomposedCharacter {
                wide: false,
                trail: true,
                value: LETTER_S,
                character: 's',
            });
        }
        Some(result)
    }

    /// Text form using the given options
    pub fn format_with(self, format: &AtomFormat) -> String {
        let mut text = String::with_capacity(self.formatted_length_with(format));
        self.write_to(&mut text, format);
        text
    }

    /// Text form using default options, `parse(format(a)) == a`
    pub fn format(self) -> String {
        self.format_with(&AtomFormat::default())
    }

    fn write_to(self, out: &mut String, format: &AtomFormat) {
        match (self.numeric(), self.decompose_with(format)) {
            (Some(number), _) => {
                if format.hexadecimal_threshold != 0 && number >= format.hexadecimal_threshold {
                    out.push_str(&format.hexadecimal_prefix);
                    out.push_str(&format!("{:X}", number));
                } else {
                    out.push_str(&number.to_string());
                }
            }
            (None, Some(decomposition)) => {
                let (open, close) = format.enclosure();
                if let Some(open) = open {
                    out.push(open);
                }
                out.extend(decomposition.characters().iter().map(|c| c.character));
                if let Some(close) = close {
                    out.push(close);
                }
            }
            (None, None) => {}
        }
    }

    /// Length in bytes of [`Atom::format`]
    pub fn formatted_length(self) -> usize {
        self.formatted_length_with(&AtomFormat::default())
    }

    pub fn formatted_length_with(self, format: &AtomFormat) -> usize {
        if let Some(number) = self.numeric() {
            if format.hexadecimal_threshold != 0 && number >= format.hexadecimal_threshold {
                format.hexadecimal_prefix.len() + hex_digits(number)
            } else {
                decimal_digits(number)
            }
        } else {
            let (open, close) = format.enclosure();
            let characters = self
                .decompose_with(format)
                .map(|d| d.characters().iter().map(|c| c.character.len_utf8()).sum())
                .unwrap_or(0);
            characters + open.map_or(0, char::len_utf8) + close.map_or(0, char::len_utf8)
        }
    }
}

fn decimal_digits(mut number: u64) -> usize {
    let mut digits = 1;
    while number >= 10 {
        number /= 10;
        digits += 1;
    }
    digits
}

fn hex_digits(number: u64) -> usize {
    if number == 0 {
        1
    } else {
        (64 - number.leading_zeros() as usize).div_ceil(4)
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format())
    }
}

impl fmt::Debug for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.numeric() {
            Some(number) => write!(f, "Atom({})", number),
            None => write!(f, "Atom({:?})", self.format()),
        }
    }
}

impl FromStr for Atom {
    type Err = InvalidInputReason;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Atom::parse(s)
    }
}

impl TryFrom<u64> for Atom {
    type Error = InvalidInputReason;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        Atom::from_number(value)
    }
}

impl From<u32> for Atom {
    fn from(value: u32) -> Self {
        Atom(NUMERIC_BIT | value as u64)
    }
}

impl From<u16> for Atom {
    fn from(value: u16) -> Self {
        Atom(NUMERIC_BIT | value as u64)
    }
}

impl From<u8> for Atom {
    fn from(value: u8) -> Self {
        Atom(NUMERIC_BIT | value as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_atom() {
        let atom = Atom::parse("42").unwrap();
        assert!(atom.is_numeric());
        assert_eq!(atom.numeric(), Some(42));
        assert_eq!(atom.format(), "42");
        assert_eq!(Atom::from(42u32), atom);
        assert_eq!(Atom::parse("42_").unwrap(), atom);
        assert!(!Atom::parse("_42").unwrap().is_numeric());
    }

    #[test]
    fn test_hexadecimal_parsing() {
        assert_eq!(Atom::parse("#x1F").unwrap().numeric(), Some(31));
        assert_eq!(Atom::parse("#X1f").unwrap().numeric(), Some(31));
        assert_eq!(Atom::parse("#10").unwrap().numeric(), Some(16));
        assert_eq!(Atom::parse("#x"), Err(InvalidInputReason::InvalidCharacter));
        assert_eq!(Atom::parse("#x1_0"), Err(InvalidInputReason::InvalidCharacter));
        assert_eq!(Atom::parse("#"), Err(InvalidInputReason::InvalidCharacter));
    }

    #[test]
    fn test_number_limits() {
        let max = Atom::parse("9223372036854775807").unwrap();
        assert_eq!(max.numeric(), Some(MAX_NUMBER));
        assert_eq!(
            Atom::parse("9223372036854775808"),
            Err(InvalidInputReason::NumberTooLarge)
        );
        assert_eq!(
            Atom::parse("99999999999999999999999"),
            Err(InvalidInputReason::NumberTooLarge)
        );
        assert_eq!(Atom::from_number(1 << 63), Err(InvalidInputReason::NumberTooLarge));
    }

    #[test]
    fn test_hexadecimal_threshold() {
        let atom = Atom::from_number(10_000_000).unwrap();
        assert_eq!(atom.format(), "#x989680");
        assert_eq!(atom.formatted_length(), 8);
        assert_eq!(Atom::parse(&atom.format()).unwrap(), atom);

        let decimal = AtomFormat {
            hexadecimal_threshold: 0,
            ..AtomFormat::default()
        };
        assert_eq!(atom.format_with(&decimal), "10000000");
    }

    #[test]
    fn test_string_atom() {
        let atom = Atom::parse("pump").unwrap();
        assert!(!atom.is_numeric());
        assert_eq!(atom.format(), "pump");
        assert_eq!(atom.formatted_length(), 4);
    }

    #[test]
    fn test_spaces_and_dashes() {
        let a = Atom::parse("main-pump").unwrap();
        let b = Atom::parse("main_pump").unwrap();
        let c = Atom::parse("main pump  ").unwrap();
        assert_eq!(a, b);
        assert_eq!(b, c);
        assert_eq!(a.format(), "main_pump");

        let spaced = AtomFormat {
            space_character: ' ',
            ..AtomFormat::default()
        };
        assert_eq!(a.format_with(&spaced), "main pump");
    }

    #[test]
    fn test_wide_characters() {
        let atom = Atom::parse("Pump7").unwrap();
        assert_eq!(atom.format(), "Pump7");
        let atom = Atom::parse("A").unwrap();
        assert_eq!(atom.format(), "A");
        assert_ne!(atom, Atom::EMPTY);
        let atom = Atom::parse("xAB").unwrap();
        assert_eq!(atom.format(), "xAB");
    }

    #[test]
    fn test_trailing_s_bit() {
        let atom = Atom::parse("pumps").unwrap();
        assert_eq!(atom.raw() & TRAILING_S_BIT, 1);
        assert_eq!(atom.format(), "pumps");

        // the 's' after a space must stay a regular unit
        let atom = Atom::parse("a s").unwrap();
        assert_eq!(atom.raw() & TRAILING_S_BIT, 0);
        assert_eq!(atom.format(), "a_s");
    }

    #[test]
    fn test_capacity() {
        assert!(Atom::parse("abcdefghijkl").is_ok());
        assert!(Atom::parse("abcdefghijkls").is_ok());
        assert!(Atom::parse("abcdefghijkX").is_ok());
        assert!(Atom::parse("abcdefghijkXs").is_ok());
        assert_eq!(
            Atom::parse("abcdefghijklm"),
            Err(InvalidInputReason::TextTooLong)
        );
        assert_eq!(Atom::parse("ABCDEFG"), Err(InvalidInputReason::TextTooLong));
    }

    #[test]
    fn test_invalid_character() {
        assert_eq!(Atom::parse("pump.1"), Err(InvalidInputReason::InvalidCharacter));
        assert_eq!(Atom::parse("čerpadlo"), Err(InvalidInputReason::InvalidCharacter));
    }

    #[test]
    fn test_empty() {
        assert_eq!(Atom::parse("").unwrap(), Atom::EMPTY);
        assert_eq!(Atom::parse("__").unwrap(), Atom::EMPTY);
        assert!(Atom::EMPTY.is_empty());
        assert_eq!(Atom::EMPTY.format(), "");
    }

    #[test]
    fn test_decompose_agrees_with_format() {
        for text in ["pump", "Pump7s", "a_b_c", "x", "ABC", "temps", "zone3A"] {
            let atom = Atom::parse(text).unwrap();
            let decomposition = atom.decompose().unwrap();
            let joined: String = decomposition.characters().iter().map(|c| c.character).collect();
            assert_eq!(joined, atom.format(), "{}", text);
        }
        assert!(Atom::from(5u8).decompose().is_none());
    }

    #[test]
    fn test_decompose_flags() {
        let decomposition = Atom::parse("Tanks").unwrap().decompose().unwrap();
        let chars = decomposition.characters();
        assert_eq!(chars.len(), 5);
        assert!(chars[0].wide);
        assert_eq!(chars[0].value, b'T' - b'A');
        assert!(chars[4].trail);
        assert_eq!(chars[4].character, 's');
    }

    #[test]
    fn test_enclosure() {
        let quoted = AtomFormat {
            string_enclosure: Some('\''),
            ..AtomFormat::default()
        };
        let atom = Atom::parse("pump").unwrap();
        assert_eq!(atom.format_with(&quoted), "'pump'");
        assert_eq!(atom.formatted_length_with(&quoted), 6);
        assert_eq!(Atom::from(7u8).format_with(&quoted), "7");
    }

    #[test]
    fn test_utf16() {
        let wide: Vec<u16> = "Valve2".encode_utf16().collect();
        assert_eq!(Atom::parse_utf16(&wide).unwrap(), Atom::parse("Valve2").unwrap());
    }
}
