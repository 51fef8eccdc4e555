//! Typed view of the 32-byte value payload
//!
//! [`Payload`] is decoded from the raw bytes of an [`Information`] and
//! encoded back by [`Payload::encode`]; both directions spell out the
//! little endian layout explicitly.

use crate::core::address::Address;
use crate::core::atom::Atom;
use crate::core::cell::expression::Expression;
use crate::core::cell::information::{Information, ValueType, PAYLOAD_SIZE};
use crate::core::filetime::FileTime;
use crate::core::wide::{I256, U256};
use crate::error::{CellError, Conversion, Result};

/// Most atoms an `Atom` value holds after its parent prefix
pub const MAX_ATOMS: usize = 4;

/// Most bits a bit vector holds
pub const MAX_BITS: usize = 256;

/// Fixed-capacity vector of value elements
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Elements<T, const N: usize> {
    items: [T; N],
    len: usize,
}

impl<T: Copy + Default, const N: usize> Elements<T, N> {
    /// `None` if `values` holds more than `N` elements
    pub fn from_slice(values: &[T]) -> Option<Self> {
        if values.len() > N {
            return None;
        }
        let mut items = [T::default(); N];
        items[..values.len()].copy_from_slice(values);
        Some(Elements {
            items,
            len: values.len(),
        })
    }

    pub fn one(value: T) -> Self {
        let mut items = [T::default(); N];
        items[0] = value;
        Elements { items, len: 1 }
    }

    pub fn get(&self, index: usize) -> Option<T> {
        self.as_slice().get(index).copied()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items[..self.len]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

fn read_elements<T: Copy + Default, const N: usize, const W: usize>(
    payload: &[u8; PAYLOAD_SIZE],
    len: usize,
    read: fn([u8; W]) -> T,
) -> Elements<T, N> {
    let mut items = [T::default(); N];
    for (item, chunk) in items.iter_mut().zip(payload.chunks_exact(W)) {
        let mut bytes = [0u8; W];
        bytes.copy_from_slice(chunk);
        *item = read(bytes);
    }
    Elements {
        items,
        len: len.min(N),
    }
}

fn write_elements<T: Copy + Default, const N: usize, const W: usize>(
    elements: &Elements<T, N>,
    payload: &mut [u8; PAYLOAD_SIZE],
    write: fn(T) -> [u8; W],
) {
    for (chunk, &item) in payload.chunks_exact_mut(W).zip(elements.as_slice()) {
        chunk.copy_from_slice(&write(item));
    }
}

/// Bit vector stored in 32-bit little endian lanes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Bits {
    lanes: [u32; 8],
    len: usize,
}

impl Bits {
    pub fn from_bools(values: &[bool]) -> Option<Self> {
        if values.len() > MAX_BITS {
            return None;
        }
        let mut lanes = [0u32; 8];
        for (i, _) in values.iter().enumerate().filter(|(_, &bit)| bit) {
            lanes[i / 32] |= 1 << (i % 32);
        }
        Some(Bits {
            lanes,
            len: values.len(),
        })
    }

    pub fn get(&self, index: usize) -> Option<bool> {
        (index < self.len).then(|| self.lanes[index / 32] >> (index % 32) & 1 == 1)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn read(payload: &[u8; PAYLOAD_SIZE], len: usize) -> Self {
        let elements: Elements<u32, 8> = read_elements(payload, 8, u32::from_le_bytes);
        Bits {
            lanes: elements.items,
            len: len.min(MAX_BITS),
        }
    }

    fn write(&self, payload: &mut [u8; PAYLOAD_SIZE]) {
        for (chunk, lane) in payload.chunks_exact_mut(4).zip(self.lanes.iter()) {
            chunk.copy_from_slice(&lane.to_le_bytes());
        }
    }
}

/// One element of a numeric value
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scalar {
    Bit(bool),
    Int(i128),
    UInt(u128),
    I256(I256),
    U256(U256),
    F32(f32),
    F64(f64),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Integers {
    Bits(Bits),
    W8(Elements<i8, 32>),
    W16(Elements<i16, 16>),
    W32(Elements<i32, 8>),
    W64(Elements<i64, 4>),
    W128(Elements<i128, 2>),
    W256(I256),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Unsigneds {
    Bits(Bits),
    W8(Elements<u8, 32>),
    W16(Elements<u16, 16>),
    W32(Elements<u32, 8>),
    W64(Elements<u64, 4>),
    W128(Elements<u128, 2>),
    W256(U256),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Floats {
    F32(Elements<f32, 8>),
    F64(Elements<f64, 4>),
}

macro_rules! vector_accessors {
    ($ty:ident, $scalar:ident, $wide:ident, $t8:ty, $t16:ty, $t32:ty, $t64:ty, $t128:ty) => {
        impl $ty {
            pub fn get(&self, index: usize) -> Option<Scalar> {
                match self {
                    $ty::Bits(bits) => bits.get(index).map(Scalar::Bit),
                    $ty::W8(e) => e.get(index).map(|v| Scalar::$scalar(v as _)),
                    $ty::W16(e) => e.get(index).map(|v| Scalar::$scalar(v as _)),
                    $ty::W32(e) => e.get(index).map(|v| Scalar::$scalar(v as _)),
                    $ty::W64(e) => e.get(index).map(|v| Scalar::$scalar(v as _)),
                    $ty::W128(e) => e.get(index).map(|v| Scalar::$scalar(v as _)),
                    $ty::W256(v) => (index == 0).then_some(Scalar::$wide(*v)),
                }
            }

            pub fn width(&self) -> u8 {
                match self {
                    $ty::Bits(_) => 0,
                    $ty::W8(_) => 1,
                    $ty::W16(_) => 2,
                    $ty::W32(_) => 4,
                    $ty::W64(_) => 8,
                    $ty::W128(_) => 16,
                    $ty::W256(_) => 32,
                }
            }

            pub fn len(&self) -> usize {
                match self {
                    $ty::Bits(bits) => bits.len(),
                    $ty::W8(e) => e.len(),
                    $ty::W16(e) => e.len(),
                    $ty::W32(e) => e.len(),
                    $ty::W64(e) => e.len(),
                    $ty::W128(e) => e.len(),
                    $ty::W256(_) => 1,
                }
            }

            pub fn is_empty(&self) -> bool {
                self.len() == 0
            }

            fn read(width: u8, count: u8, payload: &[u8; PAYLOAD_SIZE]) -> std::result::Result<Self, Conversion> {
                let len = count as usize + 1;
                Ok(match width {
                    0 => $ty::Bits(Bits::read(payload, len)),
                    1 => $ty::W8(read_elements(payload, len, <$t8>::from_le_bytes)),
                    2 => $ty::W16(read_elements(payload, len, <$t16>::from_le_bytes)),
                    4 => $ty::W32(read_elements(payload, len, <$t32>::from_le_bytes)),
                    8 => $ty::W64(read_elements(payload, len, <$t64>::from_le_bytes)),
                    16 => $ty::W128(read_elements(payload, len, <$t128>::from_le_bytes)),
                    32 => $ty::W256(<$wide>::from_le_slice(payload).ok_or(Conversion::Corrupted)?),
                    _ => return Err(Conversion::UnsupportedWidth),
                })
            }

            fn write(&self, payload: &mut [u8; PAYLOAD_SIZE]) {
                match self {
                    $ty::Bits(bits) => bits.write(payload),
                    $ty::W8(e) => write_elements(e, payload, <$t8>::to_le_bytes),
                    $ty::W16(e) => write_elements(e, payload, <$t16>::to_le_bytes),
                    $ty::W32(e) => write_elements(e, payload, <$t32>::to_le_bytes),
                    $ty::W64(e) => write_elements(e, payload, <$t64>::to_le_bytes),
                    $ty::W128(e) => write_elements(e, payload, <$t128>::to_le_bytes),
                    $ty::W256(v) => {
                        v.write_le(payload);
                    }
                }
            }
        }
    };
}

vector_accessors!(Integers, Int, I256, i8, i16, i32, i64, i128);
vector_accessors!(Unsigneds, UInt, U256, u8, u16, u32, u64, u128);

impl Floats {
    pub fn get(&self, index: usize) -> Option<Scalar> {
        match self {
            Floats::F32(e) => e.get(index).map(Scalar::F32),
            Floats::F64(e) => e.get(index).map(Scalar::F64),
        }
    }

    pub fn width(&self) -> u8 {
        match self {
            Floats::F32(_) => 4,
            Floats::F64(_) => 8,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Floats::F32(e) => e.len(),
            Floats::F64(e) => e.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Stored text in its original encoding
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Text<'a> {
    Utf8(&'a [u8]),
    Ascii(&'a [u8]),
    Utf16(Elements<u16, 16>),
}

impl Text<'_> {
    pub fn width(&self) -> u8 {
        match self {
            Text::Utf8(_) => 0,
            Text::Ascii(_) => 1,
            Text::Utf16(_) => 2,
        }
    }

    /// Number of code units
    pub fn units(&self) -> usize {
        match self {
            Text::Utf8(bytes) | Text::Ascii(bytes) => bytes.len(),
            Text::Utf16(units) => units.len(),
        }
    }

    /// Transcode to UTF-8; ASCII bytes above 127 map to Latin-1
    pub fn decode(&self) -> std::result::Result<String, Conversion> {
        match self {
            Text::Utf8(bytes) => {
                String::from_utf8(bytes.to_vec()).map_err(|_| Conversion::FailedConversion)
            }
            Text::Ascii(bytes) => Ok(bytes.iter().map(|&b| b as char).collect()),
            Text::Utf16(units) => {
                String::from_utf16(units.as_slice()).map_err(|_| Conversion::FailedConversion)
            }
        }
    }
}

/// Decoded value
#[derive(Debug, Clone, PartialEq)]
pub enum Payload<'a> {
    Null,
    TimeStamp(FileTime),
    /// `parents` leading `..` atoms followed by `atoms`
    Atoms { parents: u8, atoms: Elements<Atom, MAX_ATOMS> },
    Float(Floats),
    Integer(Integers),
    Unsigned(Unsigneds),
    Address(Address),
    Data(&'a [u8]),
    Text(Text<'a>),
    Expression(Expression),
    Stream,
}

impl<'a> Payload<'a> {
    /// Decode the value of `info`
    ///
    /// Fails with `External` for externally stored Text/Data and with
    /// `Corrupted` when `count` exceeds the local storage.
    pub fn decode(info: &'a Information) -> std::result::Result<Self, Conversion> {
        let specs = info.specs;
        let payload = &info.payload;
        let value_type = ValueType::from_u8(specs.value_type).ok_or(Conversion::UnsupportedType)?;
        let count = specs.count as usize;

        Ok(match value_type {
            ValueType::Null => Payload::Null,
            ValueType::TimeStamp => {
                let mut ticks = [0u8; 8];
                ticks.copy_from_slice(&payload[..8]);
                Payload::TimeStamp(FileTime(u64::from_le_bytes(ticks)))
            }
            ValueType::Atom => {
                if count > MAX_ATOMS {
                    return Err(Conversion::Corrupted);
                }
                Payload::Atoms {
                    parents: specs.width,
                    atoms: read_elements(payload, count, |b| Atom::from_raw(u64::from_le_bytes(b))),
                }
            }
            ValueType::Float => {
                let len = count + 1;
                Payload::Float(match specs.width {
                    4 => Floats::F32(read_elements(payload, len, f32::from_le_bytes)),
                    8 => Floats::F64(read_elements(payload, len, f64::from_le_bytes)),
                    _ => return Err(Conversion::UnsupportedWidth),
                })
            }
            ValueType::Integer => Payload::Integer(Integers::read(specs.width, specs.count, payload)?),
            ValueType::Unsigned => Payload::Unsigned(Unsigneds::read(specs.width, specs.count, payload)?),
            ValueType::Address => Payload::Address(Address::from_payload(specs.width, payload)?),
            ValueType::Data => {
                if specs.flags.external() {
                    return Err(Conversion::External);
                }
                Payload::Data(payload.get(..count).ok_or(Conversion::Corrupted)?)
            }
            ValueType::Text => {
                if specs.flags.external() {
                    return Err(Conversion::External);
                }
                Payload::Text(match specs.width {
                    0 => Text::Utf8(payload.get(..count).ok_or(Conversion::Corrupted)?),
                    1 => Text::Ascii(payload.get(..count).ok_or(Conversion::Corrupted)?),
                    2 => {
                        if count > PAYLOAD_SIZE / 2 {
                            return Err(Conversion::Corrupted);
                        }
                        Text::Utf16(read_elements(payload, count, u16::from_le_bytes))
                    }
                    _ => return Err(Conversion::UnsupportedWidth),
                })
            }
            ValueType::Expression => {
                Payload::Expression(Expression::from_bytes(payload)?)
            }
            ValueType::Stream => Payload::Stream,
        })
    }

    /// Store this value into `info`
    ///
    /// Sets type, width, count and payload; clears the lower four flag
    /// bits and keeps the upper four.
    pub fn encode(&self, info: &mut Information) -> Result<()> {
        let mut payload = [0u8; PAYLOAD_SIZE];
        let (value_type, width, count) = match self {
            Payload::Null => (ValueType::Null, 0, 0),
            Payload::TimeStamp(time) => {
                payload[..8].copy_from_slice(&time.ticks().to_le_bytes());
                (ValueType::TimeStamp, 8, 0)
            }
            Payload::Atoms { parents, atoms } => {
                write_elements(atoms, &mut payload, |atom: Atom| atom.raw().to_le_bytes());
                (ValueType::Atom, *parents, atoms.len() as u8)
            }
            Payload::Float(floats) => {
                match floats {
                    Floats::F32(e) => write_elements(e, &mut payload, f32::to_le_bytes),
                    Floats::F64(e) => write_elements(e, &mut payload, f64::to_le_bytes),
                }
                (ValueType::Float, floats.width(), vector_count(floats.len())?)
            }
            Payload::Integer(integers) => {
                integers.write(&mut payload);
                (ValueType::Integer, integers.width(), vector_count(integers.len())?)
            }
            Payload::Unsigned(unsigneds) => {
                unsigneds.write(&mut payload);
                (ValueType::Unsigned, unsigneds.width(), vector_count(unsigneds.len())?)
            }
            Payload::Address(address) => {
                address.write_payload(&mut payload)?;
                (ValueType::Address, address.family(), 0)
            }
            Payload::Data(bytes) => {
                fits(bytes.len(), PAYLOAD_SIZE)?;
                payload[..bytes.len()].copy_from_slice(bytes);
                (ValueType::Data, 0, bytes.len() as u8)
            }
            Payload::Text(text) => {
                match text {
                    Text::Utf8(bytes) | Text::Ascii(bytes) => {
                        fits(bytes.len(), PAYLOAD_SIZE)?;
                        payload[..bytes.len()].copy_from_slice(bytes);
                    }
                    Text::Utf16(units) => write_elements(units, &mut payload, u16::to_le_bytes),
                }
                (ValueType::Text, text.width(), text.units() as u8)
            }
            Payload::Expression(expression) => {
                payload = expression.to_bytes();
                (ValueType::Expression, 0, 0)
            }
            Payload::Stream => return Err(CellError::StreamNotStorable),
        };

        info.specs.value_type = value_type as u8;
        info.specs.width = width;
        info.specs.count = count;
        info.specs.flags.0 &= 0xF0;
        info.payload = payload;
        Ok(())
    }
}

fn fits(size: usize, capacity: usize) -> Result<()> {
    if size > capacity {
        Err(CellError::ValueTooLarge { size, capacity })
    } else {
        Ok(())
    }
}

/// `count` of a vector value holding `len` elements
fn vector_count(len: usize) -> Result<u8> {
    match len {
        0 => Err(CellError::UnsupportedValue("empty numeric vector".to_string())),
        1..=MAX_BITS => Ok((len - 1) as u8),
        _ => Err(CellError::ValueTooLarge {
            size: len,
            capacity: MAX_BITS,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoded(payload: &Payload<'_>) -> Information {
        let mut info = Information::default();
        payload.encode(&mut info).unwrap();
        info
    }

    #[test]
    fn test_bits_use_32_bit_lanes() {
        let mut values = [false; 65];
        values[31] = true;
        values[32] = true;
        values[64] = true;
        let info = encoded(&Payload::Unsigned(Unsigneds::Bits(Bits::from_bools(&values).unwrap())));
        assert_eq!(info.specs.count, 64);
        assert_eq!(&info.payload[0..4], &0x8000_0000u32.to_le_bytes());
        assert_eq!(&info.payload[4..8], &1u32.to_le_bytes());
        assert_eq!(&info.payload[8..12], &1u32.to_le_bytes());

        match Payload::decode(&info).unwrap() {
            Payload::Unsigned(Unsigneds::Bits(bits)) => {
                assert_eq!(bits.len(), 65);
                assert_eq!(bits.get(31), Some(true));
                assert_eq!(bits.get(32), Some(true));
                assert_eq!(bits.get(63), Some(false));
                assert_eq!(bits.get(64), Some(true));
                assert_eq!(bits.get(65), None);
            }
            other => panic!("unexpected payload {:?}", other),
        }
    }

    #[test]
    fn test_integer_vector_layout() {
        let values = Elements::<i16, 16>::from_slice(&[1, -2, 300]).unwrap();
        let info = encoded(&Payload::Integer(Integers::W16(values)));
        assert_eq!(info.specs.value_type, ValueType::Integer as u8);
        assert_eq!(info.specs.width, 2);
        assert_eq!(info.specs.count, 2);
        assert_eq!(&info.payload[0..6], &[1, 0, 0xFE, 0xFF, 0x2C, 0x01]);
    }

    #[test]
    fn test_count_beyond_storage_is_clamped() {
        let mut info = Information::default();
        info.specs.value_type = ValueType::Unsigned as u8;
        info.specs.width = 8;
        info.specs.count = 9;
        match Payload::decode(&info).unwrap() {
            Payload::Unsigned(u) => {
                assert_eq!(u.len(), 4);
                assert_eq!(u.get(4), None);
            }
            other => panic!("unexpected payload {:?}", other),
        }
    }

    #[test]
    fn test_unsupported_width() {
        let mut info = Information::default();
        info.specs.value_type = ValueType::Integer as u8;
        info.specs.width = 3;
        assert_eq!(Payload::decode(&info), Err(Conversion::UnsupportedWidth));
        info.specs.value_type = 0x55;
        assert_eq!(Payload::decode(&info), Err(Conversion::UnsupportedType));
    }

    #[test]
    fn test_text_corrupt_count() {
        let mut info = Information::default();
        info.specs.value_type = ValueType::Text as u8;
        info.specs.count = 33;
        assert_eq!(Payload::decode(&info), Err(Conversion::Corrupted));
    }

    #[test]
    fn test_stream_not_storable() {
        let mut info = Information::default();
        assert!(matches!(
            Payload::Stream.encode(&mut info),
            Err(CellError::StreamNotStorable)
        ));
    }

    #[test]
    fn test_encode_keeps_upper_flags() {
        let mut info = Information::default();
        info.specs.flags.0 = 0xFF;
        Payload::Null.encode(&mut info).unwrap();
        assert_eq!(info.specs.flags.0, 0xF0);
    }
}
