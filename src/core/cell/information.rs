//! Value tag and payload of a cell
//!
//! ```text
//! byte 0     : type
//! byte 1     : width
//! byte 2     : count
//! byte 3     : flags
//! bytes 4..36: payload
//! ```

use crate::core::address::{family, Address};
use crate::core::atom::Atom;
use crate::core::atom_path::{AtomPath, AtomPathView};
use crate::core::cell::expression::Expression;
use crate::core::cell::payload::{Bits, Elements, Floats, Integers, Payload, Text, Unsigneds, MAX_ATOMS};
use crate::core::filetime::FileTime;
use crate::core::wide::{I256, U256};
use crate::error::{CellError, Result};

/// Size of the value tag
pub const SPECS_SIZE: usize = 4;

/// Size of the value payload
pub const PAYLOAD_SIZE: usize = 32;

/// Wire size of an [`Information`]
pub const INFORMATION_SIZE: usize = SPECS_SIZE + PAYLOAD_SIZE;

/// Most leading `..` atoms an `Atom` value can carry
pub const MAX_PARENTS: usize = 255;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ValueType {
    Null = 0x00,
    TimeStamp = 0x01,
    Atom = 0x02,
    Float = 0x03,
    Integer = 0x04,
    Unsigned = 0x05,
    Address = 0x06,
    Data = 0x07,
    Text = 0x08,
    Expression = 0x10,
    Stream = 0x81,
}

impl ValueType {
    pub fn from_u8(value: u8) -> Option<Self> {
        Some(match value {
            0x00 => ValueType::Null,
            0x01 => ValueType::TimeStamp,
            0x02 => ValueType::Atom,
            0x03 => ValueType::Float,
            0x04 => ValueType::Integer,
            0x05 => ValueType::Unsigned,
            0x06 => ValueType::Address,
            0x07 => ValueType::Data,
            0x08 => ValueType::Text,
            0x10 => ValueType::Expression,
            0x81 => ValueType::Stream,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            ValueType::Null => "Null",
            ValueType::TimeStamp => "TimeStamp",
            ValueType::Atom => "Atom",
            ValueType::Float => "Float",
            ValueType::Integer => "Integer",
            ValueType::Unsigned => "Unsigned",
            ValueType::Address => "Address",
            ValueType::Data => "Data",
            ValueType::Text => "Text",
            ValueType::Expression => "Expression",
            ValueType::Stream => "Stream",
        }
    }
}

/// Value flag bits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(transparent)]
pub struct Flags(pub u8);

impl Flags {
    /// Value is not valid; conversions fail with `InvalidFlagSet`
    pub const INVALID: u8 = 0x01;
    /// Source has not refreshed the value in time
    pub const STALE: u8 = 0x02;
    /// Text or Data lives outside the cell
    pub const EXTERNAL: u8 = 0x08;
    pub const BASE_CELL_DEPENDENT: u8 = 0x10;
    /// Type, width and count may not change
    pub const FIXED_TYPE: u8 = 0x40;
    pub const CONSTANT: u8 = 0x80;

    /// Flags owned by the cell rather than by the written value
    pub const PERSISTENT: u8 = Self::BASE_CELL_DEPENDENT | Self::FIXED_TYPE | Self::CONSTANT;

    pub fn contains(self, mask: u8) -> bool {
        self.0 & mask == mask
    }

    pub fn set(&mut self, mask: u8, value: bool) {
        if value {
            self.0 |= mask;
        } else {
            self.0 &= !mask;
        }
    }

    pub fn invalid(self) -> bool {
        self.contains(Self::INVALID)
    }

    pub fn stale(self) -> bool {
        self.contains(Self::STALE)
    }

    pub fn external(self) -> bool {
        self.contains(Self::EXTERNAL)
    }

    pub fn base_cell_dependent(self) -> bool {
        self.contains(Self::BASE_CELL_DEPENDENT)
    }

    pub fn fixed_type(self) -> bool {
        self.contains(Self::FIXED_TYPE)
    }

    pub fn constant(self) -> bool {
        self.contains(Self::CONSTANT)
    }
}

/// Value tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Specs {
    /// Raw type code, see [`ValueType`]
    pub value_type: u8,
    pub width: u8,
    pub count: u8,
    pub flags: Flags,
}

impl Specs {
    pub fn to_bytes(self) -> [u8; SPECS_SIZE] {
        [self.value_type, self.width, self.count, self.flags.0]
    }

    pub fn from_bytes(bytes: [u8; SPECS_SIZE]) -> Self {
        Specs {
            value_type: bytes[0],
            width: bytes[1],
            count: bytes[2],
            flags: Flags(bytes[3]),
        }
    }

    pub fn kind(self) -> Option<ValueType> {
        ValueType::from_u8(self.value_type)
    }

    /// Same type and width, and same count for numeric vectors
    pub fn same_type(self, other: Specs) -> bool {
        if self.value_type != other.value_type || self.width != other.width {
            return false;
        }
        match self.kind() {
            Some(ValueType::Integer) | Some(ValueType::Unsigned) | Some(ValueType::Float) => {
                self.count == other.count
            }
            _ => true,
        }
    }
}

/// Tagged cell value
#[derive(Debug, Clone, Copy, Default)]
pub struct Information {
    pub specs: Specs,
    pub payload: [u8; PAYLOAD_SIZE],
}

impl Information {
    /// Null value with no flags
    pub const NULL: Information = Information {
        specs: Specs {
            value_type: 0,
            width: 0,
            count: 0,
            flags: Flags(0),
        },
        payload: [0; PAYLOAD_SIZE],
    };

    pub fn from_bytes(bytes: &[u8; INFORMATION_SIZE]) -> Self {
        let mut specs = [0u8; SPECS_SIZE];
        specs.copy_from_slice(&bytes[..SPECS_SIZE]);
        let mut payload = [0u8; PAYLOAD_SIZE];
        payload.copy_from_slice(&bytes[SPECS_SIZE..]);
        Information {
            specs: Specs::from_bytes(specs),
            payload,
        }
    }

    pub fn to_bytes(&self) -> [u8; INFORMATION_SIZE] {
        let mut bytes = [0u8; INFORMATION_SIZE];
        bytes[..SPECS_SIZE].copy_from_slice(&self.specs.to_bytes());
        bytes[SPECS_SIZE..].copy_from_slice(&self.payload);
        bytes
    }

    /// Build a value in one step
    pub fn from_value<T: IntoInformation>(value: T) -> Result<Self> {
        let mut info = Information::default();
        info.initialize(value)?;
        Ok(info)
    }

    pub fn kind(&self) -> Option<ValueType> {
        self.specs.kind()
    }

    pub fn flags(&self) -> Flags {
        self.specs.flags
    }

    pub fn is_invalid(&self) -> bool {
        self.specs.flags.invalid()
    }

    /// Typed view of the value, see [`Payload::decode`]
    pub fn decode(&self) -> std::result::Result<Payload<'_>, crate::error::Conversion> {
        Payload::decode(self)
    }

    /// Store `value`; lower flag bits are cleared, the upper four kept
    pub fn initialize<T: IntoInformation>(&mut self, value: T) -> Result<()> {
        value.write_into(self)
    }

    pub fn set_payload(&mut self, payload: &Payload<'_>) -> Result<()> {
        payload.encode(self)
    }

    /// Text stored as ASCII; bytes above 127 are rejected
    pub fn initialize_ascii(&mut self, text: &str) -> Result<()> {
        if !text.is_ascii() {
            return Err(CellError::UnsupportedValue(format!("not ASCII: {:?}", text)));
        }
        Payload::Text(Text::Ascii(text.as_bytes())).encode(self)
    }

    /// Text stored as at most 16 UTF-16 code units
    pub fn initialize_utf16(&mut self, units: &[u16]) -> Result<()> {
        let units = Elements::from_slice(units).ok_or(CellError::ValueTooLarge {
            size: units.len(),
            capacity: PAYLOAD_SIZE / 2,
        })?;
        Payload::Text(Text::Utf16(units)).encode(self)
    }

    /// Raw bytes, at most 32
    pub fn initialize_data(&mut self, bytes: &[u8]) -> Result<()> {
        Payload::Data(bytes).encode(self)
    }

    /// Path with `parents` leading `..` and at most four atoms
    pub fn initialize_atoms(&mut self, parents: usize, atoms: &[Atom]) -> Result<()> {
        if parents > MAX_PARENTS {
            return Err(CellError::ValueTooLarge {
                size: parents,
                capacity: MAX_PARENTS,
            });
        }
        let atoms = Elements::from_slice(atoms).ok_or(CellError::ValueTooLarge {
            size: atoms.len(),
            capacity: MAX_ATOMS,
        })?;
        Payload::Atoms {
            parents: parents as u8,
            atoms,
        }
        .encode(self)
    }

    /// Path split into its leading empty atoms and the rest
    pub fn initialize_path(&mut self, path: &[Atom]) -> Result<()> {
        let parents = path.iter().take_while(|atom| atom.is_empty()).count();
        self.initialize_atoms(parents, &path[parents..])
    }
}

impl PartialEq for Information {
    /// Equal tags and equal significant payload bytes
    fn eq(&self, other: &Self) -> bool {
        if self.specs != other.specs {
            return false;
        }
        let specs = self.specs;
        let count = specs.count as usize;
        let n = match specs.kind() {
            None => PAYLOAD_SIZE,
            Some(ValueType::Null) | Some(ValueType::Stream) => return true,
            Some(ValueType::TimeStamp) => 8,
            Some(ValueType::Address) => match specs.width {
                family::INET => 16,
                family::INET6 => 28,
                family::BTH => 30,
                _ => PAYLOAD_SIZE,
            },
            Some(ValueType::Integer) | Some(ValueType::Unsigned) if specs.width == 0 => {
                let bits = count + 1;
                let whole = bits / 8;
                if self.payload[..whole] != other.payload[..whole] {
                    return false;
                }
                let rest = bits % 8;
                if rest == 0 {
                    return true;
                }
                let mask = (1u8 << rest) - 1;
                return self.payload[whole] & mask == other.payload[whole] & mask;
            }
            Some(ValueType::Float) | Some(ValueType::Integer) | Some(ValueType::Unsigned) => {
                (count + 1) * specs.width as usize
            }
            Some(ValueType::Atom) => count * 8,
            Some(ValueType::Text) => count * (specs.width as usize).max(1),
            Some(ValueType::Data) => count,
            Some(ValueType::Expression) => PAYLOAD_SIZE,
        };
        // a corrupt count covers the whole payload
        let n = n.min(PAYLOAD_SIZE);
        self.payload[..n] == other.payload[..n]
    }
}

/// Host values that can be stored in an [`Information`]
pub trait IntoInformation {
    fn write_into(self, info: &mut Information) -> Result<()>;
}

impl IntoInformation for bool {
    fn write_into(self, info: &mut Information) -> Result<()> {
        let bits = Bits::from_bools(&[self]).unwrap_or_default();
        Payload::Unsigned(Unsigneds::Bits(bits)).encode(info)
    }
}

impl IntoInformation for &[bool] {
    fn write_into(self, info: &mut Information) -> Result<()> {
        let bits = Bits::from_bools(self).ok_or(CellError::ValueTooLarge {
            size: self.len(),
            capacity: crate::core::cell::payload::MAX_BITS,
        })?;
        Payload::Unsigned(Unsigneds::Bits(bits)).encode(info)
    }
}

macro_rules! into_information_vector {
    ($($ty:ty => $kind:ident($vector:ident::$variant:ident)),* $(,)?) => {
        $(
            impl IntoInformation for $ty {
                fn write_into(self, info: &mut Information) -> Result<()> {
                    Payload::$kind($vector::$variant(Elements::one(self))).encode(info)
                }
            }

            impl IntoInformation for &[$ty] {
                fn write_into(self, info: &mut Information) -> Result<()> {
                    let elements = Elements::from_slice(self).ok_or(CellError::ValueTooLarge {
                        size: std::mem::size_of_val(self),
                        capacity: PAYLOAD_SIZE,
                    })?;
                    Payload::$kind($vector::$variant(elements)).encode(info)
                }
            }
        )*
    };
}

into_information_vector! {
    i8 => Integer(Integers::W8),
    i16 => Integer(Integers::W16),
    i32 => Integer(Integers::W32),
    i64 => Integer(Integers::W64),
    i128 => Integer(Integers::W128),
    u8 => Unsigned(Unsigneds::W8),
    u16 => Unsigned(Unsigneds::W16),
    u32 => Unsigned(Unsigneds::W32),
    u64 => Unsigned(Unsigneds::W64),
    u128 => Unsigned(Unsigneds::W128),
    f32 => Float(Floats::F32),
    f64 => Float(Floats::F64),
}

impl IntoInformation for I256 {
    fn write_into(self, info: &mut Information) -> Result<()> {
        Payload::Integer(Integers::W256(self)).encode(info)
    }
}

impl IntoInformation for U256 {
    fn write_into(self, info: &mut Information) -> Result<()> {
        Payload::Unsigned(Unsigneds::W256(self)).encode(info)
    }
}

impl IntoInformation for &str {
    fn write_into(self, info: &mut Information) -> Result<()> {
        Payload::Text(Text::Utf8(self.as_bytes())).encode(info)
    }
}

impl IntoInformation for FileTime {
    fn write_into(self, info: &mut Information) -> Result<()> {
        Payload::TimeStamp(self).encode(info)
    }
}

impl IntoInformation for &Address {
    fn write_into(self, info: &mut Information) -> Result<()> {
        Payload::Address(self.clone()).encode(info)
    }
}

impl IntoInformation for Address {
    fn write_into(self, info: &mut Information) -> Result<()> {
        Payload::Address(self).encode(info)
    }
}

impl IntoInformation for Atom {
    fn write_into(self, info: &mut Information) -> Result<()> {
        info.initialize_path(&[self])
    }
}

impl IntoInformation for &[Atom] {
    fn write_into(self, info: &mut Information) -> Result<()> {
        info.initialize_path(self)
    }
}

impl IntoInformation for &AtomPath {
    fn write_into(self, info: &mut Information) -> Result<()> {
        info.initialize_path(self.as_slice())
    }
}

impl IntoInformation for &AtomPathView<'_> {
    fn write_into(self, info: &mut Information) -> Result<()> {
        info.initialize_path(self.as_slice())
    }
}

impl IntoInformation for Expression {
    fn write_into(self, info: &mut Information) -> Result<()> {
        Payload::Expression(self).encode(info)
    }
}

impl IntoInformation for &Payload<'_> {
    fn write_into(self, info: &mut Information) -> Result<()> {
        self.encode(info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bool_is_single_bit() {
        let info = Information::from_value(true).unwrap();
        assert_eq!(info.specs.value_type, ValueType::Unsigned as u8);
        assert_eq!(info.specs.width, 0);
        assert_eq!(info.specs.count, 0);
        assert_eq!(info.payload[0], 1);
    }

    #[test]
    fn test_native_widths() {
        let info = Information::from_value(-3i64).unwrap();
        assert_eq!((info.specs.value_type, info.specs.width, info.specs.count), (4, 8, 0));
        let info = Information::from_value(2.5f32).unwrap();
        assert_eq!((info.specs.value_type, info.specs.width), (3, 4));
        let info = Information::from_value(&[1u16, 2, 3][..]).unwrap();
        assert_eq!((info.specs.value_type, info.specs.width, info.specs.count), (5, 2, 2));
    }

    #[test]
    fn test_too_large_fails() {
        let mut info = Information::default();
        assert!(matches!(
            info.initialize("this text is longer than thirty-two bytes"),
            Err(CellError::ValueTooLarge { size: 41, capacity: 32 })
        ));
        assert!(info.initialize_data(&[0u8; 33]).is_err());
        assert!(info.initialize_utf16(&[0x41; 17]).is_err());
        assert!(info.initialize(&[0u64; 5][..]).is_err());
        assert!(info.initialize(&[true; 257][..]).is_err());
        assert!(info.initialize_ascii("grüße").is_err());
        assert_eq!(info, Information::NULL);
    }

    #[test]
    fn test_path_prefix() {
        let mut path = vec![Atom::EMPTY; 3];
        path.push(Atom::from_number(7).unwrap());
        let info = Information::from_value(&path[..]).unwrap();
        assert_eq!(info.specs.value_type, ValueType::Atom as u8);
        assert_eq!(info.specs.width, 3);
        assert_eq!(info.specs.count, 1);

        let long = vec![Atom::from_number(1).unwrap(); 5];
        assert!(Information::from_value(&long[..]).is_err());
        let deep = vec![Atom::EMPTY; 256];
        assert!(Information::from_value(&deep[..]).is_err());
    }

    #[test]
    fn test_flags_keep_upper_nibble() {
        let mut info = Information::default();
        info.specs.flags = Flags(Flags::CONSTANT | Flags::STALE | Flags::INVALID);
        info.initialize(5u8).unwrap();
        assert_eq!(info.specs.flags, Flags(Flags::CONSTANT));
    }

    #[test]
    fn test_equality_ignores_unused_bytes() {
        let a = Information::from_value("pump1").unwrap();
        let mut b = a;
        b.payload[20] = 0xAA;
        assert_eq!(a, b);
        b.payload[4] = b'2';
        assert_ne!(a, b);

        let mut bits = Information::from_value(&[true, false, true][..]).unwrap();
        let copy = bits;
        bits.payload[0] |= 0x80;
        assert_eq!(bits, copy);
        bits.payload[0] &= !0x04;
        assert_ne!(bits, copy);
    }

    #[test]
    fn test_equality_with_corrupt_count() {
        let mut a = Information::from_value("pump1").unwrap();
        a.specs.count = 40;
        let mut b = a;
        assert_eq!(a, a);
        assert_eq!(a, b);
        b.payload[31] ^= 1;
        assert_ne!(a, b);
    }

    #[test]
    fn test_equality_needs_equal_tags() {
        let a = Information::from_value(1u32).unwrap();
        let b = Information::from_value(1i32).unwrap();
        assert_ne!(a, b);
        let mut c = a;
        c.specs.flags.set(Flags::STALE, true);
        assert_ne!(a, c);
    }

    #[test]
    fn test_bytes_round_trip() {
        let info = Information::from_value(&[1.5f64, -2.0][..]).unwrap();
        let bytes = info.to_bytes();
        assert_eq!(&bytes[..4], &[3, 8, 1, 0]);
        assert_eq!(Information::from_bytes(&bytes), info);
    }
}
