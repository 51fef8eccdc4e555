//! Conversions from a stored value to host types
//!
//! Every conversion checks in the same order: the `invalid` flag, the
//! element index, the `external` flag, then the stored bytes. Failures
//! never modify the value.

use std::borrow::Cow;

use crate::core::address::Address;
use crate::core::atom::{Atom, AtomFormat};
use crate::core::atom_path::AtomPath;
use crate::core::cell::information::{Information, ValueType, PAYLOAD_SIZE};
use crate::core::cell::payload::{Payload, Scalar, Text, MAX_ATOMS};
use crate::core::filetime::FileTime;
use crate::core::wide::U256;
use crate::error::Conversion;

type Converted<T> = std::result::Result<T, Conversion>;

/// Formatting requested from [`Information::to_string`]
///
/// Passing a format always takes the general path, even for text values
/// that could be copied directly.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TextFormat {
    pub atoms: AtomFormat,
    /// Digits after the decimal point of floats
    pub precision: Option<usize>,
    /// Integers in upper case hexadecimal
    pub hexadecimal: bool,
    /// Minimum width, right aligned
    pub width: usize,
}

/// Integer types a value converts to with range checking
pub trait IntegerTarget: Sized + Copy {
    fn from_i128(value: i128) -> Converted<Self>;
    fn from_u128(value: u128) -> Converted<Self>;

    /// Rounds to the nearest integer
    fn from_f64(value: f64) -> Converted<Self> {
        if value.is_nan() {
            return Err(Conversion::FailedConversion);
        }
        let value = value.round();
        if value < 0.0 {
            if value < i128::MIN as f64 {
                return Err(Conversion::ValueOutOfRangeBelow);
            }
            Self::from_i128(value as i128)
        } else {
            if value >= u128::MAX as f64 {
                return Err(Conversion::ValueOutOfRangeAbove);
            }
            Self::from_u128(value as u128)
        }
    }

    fn from_scalar(scalar: Scalar) -> Converted<Self> {
        match scalar {
            Scalar::Bit(bit) => Self::from_u128(bit as u128),
            Scalar::Int(value) => Self::from_i128(value),
            Scalar::UInt(value) => Self::from_u128(value),
            Scalar::I256(value) => match (value.to_i128(), value.to_u128()) {
                (Some(value), _) => Self::from_i128(value),
                (None, Some(value)) => Self::from_u128(value),
                _ if value.is_negative() => Err(Conversion::ValueOutOfRangeBelow),
                _ => Err(Conversion::ValueOutOfRangeAbove),
            },
            Scalar::U256(value) => value
                .to_u128()
                .map_or(Err(Conversion::ValueOutOfRangeAbove), Self::from_u128),
            Scalar::F32(value) => Self::from_f64(value as f64),
            Scalar::F64(value) => Self::from_f64(value),
        }
    }
}

macro_rules! impl_integer_target {
    ($($ty:ty),*) => {
        $(
            impl IntegerTarget for $ty {
                fn from_i128(value: i128) -> Converted<Self> {
                    <$ty>::try_from(value).map_err(|_| {
                        if value < 0 {
                            Conversion::ValueOutOfRangeBelow
                        } else {
                            Conversion::ValueOutOfRangeAbove
                        }
                    })
                }

                fn from_u128(value: u128) -> Converted<Self> {
                    <$ty>::try_from(value).map_err(|_| Conversion::ValueOutOfRangeAbove)
                }
            }
        )*
    };
}

impl_integer_target!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);

/// Floating point types a value converts to
pub trait FloatTarget: Sized + Copy {
    fn from_f64(value: f64) -> Converted<Self>;
}

impl FloatTarget for f64 {
    fn from_f64(value: f64) -> Converted<Self> {
        Ok(value)
    }
}

impl FloatTarget for f32 {
    fn from_f64(value: f64) -> Converted<Self> {
        if value.is_finite() && value.abs() > f32::MAX as f64 {
            return Err(if value < 0.0 {
                Conversion::ValueOutOfRangeBelow
            } else {
                Conversion::ValueOutOfRangeAbove
            });
        }
        Ok(value as f32)
    }
}

/// Case-insensitive `true/yes/y/t/1` and `false/no/n/f/0`
pub fn parse_bool(text: &str) -> Converted<bool> {
    match text.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "y" | "t" | "1" => Ok(true),
        "false" | "no" | "n" | "f" | "0" => Ok(false),
        _ => Err(Conversion::FailedConversion),
    }
}

fn parse_integer<T: IntegerTarget>(text: &str) -> Converted<T> {
    let text = text.trim();
    if text.starts_with('-') {
        let value: i128 = text.parse().map_err(|_| Conversion::FailedConversion)?;
        T::from_i128(value)
    } else {
        let value: u128 = text
            .trim_start_matches('+')
            .parse()
            .map_err(|_| Conversion::FailedConversion)?;
        T::from_u128(value)
    }
}

fn scalar_to_f64(scalar: Scalar) -> f64 {
    match scalar {
        Scalar::Bit(bit) => bit as u8 as f64,
        Scalar::Int(value) => value as f64,
        Scalar::UInt(value) => value as f64,
        Scalar::I256(value) => value.to_f64(),
        Scalar::U256(value) => value.to_f64(),
        Scalar::F32(value) => value as f64,
        Scalar::F64(value) => value,
    }
}

fn scalar_is_nonzero(scalar: Scalar) -> bool {
    match scalar {
        Scalar::Bit(bit) => bit,
        Scalar::Int(value) => value != 0,
        Scalar::UInt(value) => value != 0,
        Scalar::I256(value) => !value.is_zero(),
        Scalar::U256(value) => !value.is_zero(),
        Scalar::F32(value) => value != 0.0,
        Scalar::F64(value) => value != 0.0,
    }
}

fn format_scalar(scalar: Scalar, format: Option<&TextFormat>) -> String {
    let hexadecimal = format.is_some_and(|f| f.hexadecimal);
    let precision = format.and_then(|f| f.precision);
    match scalar {
        Scalar::Bit(bit) => bit.to_string(),
        Scalar::Int(value) if hexadecimal => format!("{:X}", value),
        Scalar::UInt(value) if hexadecimal => format!("{:X}", value),
        Scalar::Int(value) => value.to_string(),
        Scalar::UInt(value) => value.to_string(),
        Scalar::I256(value) => value.to_string(),
        Scalar::U256(value) => value.to_string(),
        Scalar::F32(value) => match precision {
            Some(digits) => format!("{:.*}", digits, value),
            None => value.to_string(),
        },
        Scalar::F64(value) => match precision {
            Some(digits) => format!("{:.*}", digits, value),
            None => value.to_string(),
        },
    }
}

fn scalar_to_atom(scalar: Scalar) -> Converted<Atom> {
    let number = match scalar {
        Scalar::F32(_) | Scalar::F64(_) => return Err(Conversion::UnsupportedType),
        scalar => u64::from_scalar(scalar)?,
    };
    Atom::from_number(number).map_err(|_| Conversion::ValueOutOfRangeAbove)
}

/// Bytes as space separated hexadecimal pairs
pub(crate) fn hex_bytes(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

impl Information {
    fn check_valid(&self) -> Converted<()> {
        if self.specs.flags.invalid() {
            Err(Conversion::InvalidFlagSet)
        } else {
            Ok(())
        }
    }

    fn kind_or_unsupported(&self) -> Converted<ValueType> {
        self.kind().ok_or(Conversion::UnsupportedType)
    }

    fn check_single(index: usize) -> Converted<()> {
        if index != 0 {
            Err(Conversion::IndexOutOfTypeBounds)
        } else {
            Ok(())
        }
    }

    /// Element `index` of a numeric vector
    fn element(&self, index: usize) -> Converted<Scalar> {
        if index > self.specs.count as usize {
            return Err(Conversion::IndexOutOfTypeBounds);
        }
        let scalar = match self.decode()? {
            Payload::Integer(values) => values.get(index),
            Payload::Unsigned(values) => values.get(index),
            Payload::Float(values) => values.get(index),
            _ => return Err(Conversion::UnsupportedType),
        };
        scalar.ok_or(Conversion::IndexOutOfSupportedBounds)
    }

    /// Atom `index` counting the parent prefix; `None` inside the prefix
    fn atom_at(&self, index: usize) -> Converted<Option<Atom>> {
        let parents = self.specs.width as usize;
        if index < parents {
            return Ok(None);
        }
        let index = index - parents;
        if index >= self.specs.count as usize {
            return Err(Conversion::IndexOutOfTypeBounds);
        }
        if index >= MAX_ATOMS {
            return Err(Conversion::IndexOutOfSupportedBounds);
        }
        match self.decode()? {
            Payload::Atoms { atoms, .. } => atoms.get(index).map(Some).ok_or(Conversion::Corrupted),
            _ => Err(Conversion::UnsupportedType),
        }
    }

    fn text(&self, index: usize) -> Converted<Text<'_>> {
        Self::check_single(index)?;
        match self.decode()? {
            Payload::Text(text) => Ok(text),
            _ => Err(Conversion::UnsupportedType),
        }
    }

    fn data(&self, index: usize) -> Converted<&[u8]> {
        Self::check_single(index)?;
        match self.decode()? {
            Payload::Data(bytes) => Ok(bytes),
            _ => Err(Conversion::UnsupportedType),
        }
    }

    fn time_stamp(&self, index: usize) -> Converted<FileTime> {
        if index > self.specs.count as usize {
            return Err(Conversion::IndexOutOfTypeBounds);
        }
        match self.decode()? {
            Payload::TimeStamp(time) => Ok(time),
            _ => Err(Conversion::UnsupportedType),
        }
    }

    /// Generic conversion through [`FromInformation`]
    pub fn to<T: FromInformation>(&self, index: usize) -> Converted<T> {
        T::from_information(self, index)
    }

    pub fn to_boolean(&self, index: usize) -> Converted<bool> {
        self.check_valid()?;
        match self.kind_or_unsupported()? {
            ValueType::TimeStamp => Ok(self.time_stamp(index)?.ticks() != 0),
            ValueType::Atom => match self.atom_at(index)? {
                None => Ok(false),
                Some(atom) => match atom.numeric() {
                    Some(number) => Ok(number != 0),
                    None => parse_bool(&atom.format()),
                },
            },
            ValueType::Float | ValueType::Integer | ValueType::Unsigned => {
                Ok(scalar_is_nonzero(self.element(index)?))
            }
            ValueType::Text => parse_bool(&self.text(index)?.decode()?),
            ValueType::Data => Ok(self.data(index)?.iter().any(|&b| b != 0)),
            _ => Err(Conversion::UnsupportedType),
        }
    }

    /// Integer conversion, range checked against `T`; floats are rounded
    pub fn to_integer<T: IntegerTarget>(&self, index: usize) -> Converted<T> {
        self.check_valid()?;
        match self.kind_or_unsupported()? {
            ValueType::TimeStamp => T::from_u128(self.time_stamp(index)?.ticks() as u128),
            ValueType::Atom => match self.atom_at(index)?.and_then(Atom::numeric) {
                Some(number) => T::from_u128(number as u128),
                None => Err(Conversion::FailedConversion),
            },
            ValueType::Float | ValueType::Integer | ValueType::Unsigned => {
                T::from_scalar(self.element(index)?)
            }
            ValueType::Text => parse_integer(&self.text(index)?.decode()?),
            ValueType::Data => {
                let mut bytes = [0u8; PAYLOAD_SIZE];
                let data = self.data(index)?;
                bytes[..data.len()].copy_from_slice(data);
                let value = U256::from_le_slice(&bytes).ok_or(Conversion::Corrupted)?;
                T::from_scalar(Scalar::U256(value))
            }
            _ => Err(Conversion::UnsupportedType),
        }
    }

    pub fn to_float<T: FloatTarget>(&self, index: usize) -> Converted<T> {
        self.check_valid()?;
        match self.kind_or_unsupported()? {
            ValueType::TimeStamp => T::from_f64(self.time_stamp(index)?.ticks() as f64),
            ValueType::Atom => match self.atom_at(index)?.and_then(Atom::numeric) {
                Some(number) => T::from_f64(number as f64),
                None => Err(Conversion::FailedConversion),
            },
            ValueType::Float | ValueType::Integer | ValueType::Unsigned => {
                T::from_f64(scalar_to_f64(self.element(index)?))
            }
            ValueType::Text => {
                let text = self.text(index)?.decode()?;
                let value: f64 = text.trim().parse().map_err(|_| Conversion::FailedConversion)?;
                T::from_f64(value)
            }
            _ => Err(Conversion::UnsupportedType),
        }
    }

    /// Element `index` as UTF-8 text
    ///
    /// Without a format, UTF-8 and ASCII text is copied as stored.
    pub fn to_string(&self, index: usize, format: Option<&TextFormat>) -> Converted<String> {
        self.check_valid()?;
        let text = match self.kind_or_unsupported()? {
            ValueType::Null => {
                Self::check_single(index)?;
                String::new()
            }
            ValueType::TimeStamp => {
                let time = self.time_stamp(index)?;
                if time.to_datetime().is_none() {
                    return Err(Conversion::Corrupted);
                }
                time.to_string()
            }
            ValueType::Atom => match (self.atom_at(index)?, format) {
                (None, _) => String::new(),
                (Some(atom), Some(format)) => atom.format_with(&format.atoms),
                (Some(atom), None) => atom.format(),
            },
            ValueType::Float | ValueType::Integer | ValueType::Unsigned => {
                format_scalar(self.element(index)?, format)
            }
            ValueType::Address => self.to_address(index)?.to_string(),
            ValueType::Data => hex_bytes(self.data(index)?),
            ValueType::Text => {
                let text = self.text(index)?.decode()?;
                if format.is_none() {
                    return Ok(text);
                }
                text
            }
            ValueType::Expression | ValueType::Stream => return Err(Conversion::UnsupportedType),
        };

        Ok(match format {
            Some(format) if format.width > text.chars().count() => {
                format!("{:>width$}", text, width = format.width)
            }
            _ => text,
        })
    }

    /// Element `index` as ASCII; fails if the text needs more
    pub fn to_ascii(&self, index: usize, format: Option<&TextFormat>) -> Converted<String> {
        self.check_valid()?;
        if format.is_none() && self.kind() == Some(ValueType::Text) {
            if let Text::Ascii(bytes) = self.text(index)? {
                return match bytes.is_ascii() {
                    true => Ok(bytes.iter().map(|&b| b as char).collect()),
                    false => Err(Conversion::FailedConversion),
                };
            }
        }
        let text = self.to_string(index, format)?;
        if text.is_ascii() {
            Ok(text)
        } else {
            Err(Conversion::FailedConversion)
        }
    }

    /// Element `index` as UTF-16 code units
    pub fn to_utf16(&self, index: usize, format: Option<&TextFormat>) -> Converted<Vec<u16>> {
        self.check_valid()?;
        if format.is_none() && self.kind() == Some(ValueType::Text) {
            if let Text::Utf16(units) = self.text(index)? {
                return Ok(units.as_slice().to_vec());
            }
        }
        Ok(self.to_string(index, format)?.encode_utf16().collect())
    }

    /// Whole value as text, borrowing UTF-8 and ASCII text in place
    pub fn to_str(&self) -> Converted<Cow<'_, str>> {
        self.check_valid()?;
        if self.kind() == Some(ValueType::Text) {
            match self.text(0)? {
                Text::Utf8(bytes) => {
                    return std::str::from_utf8(bytes)
                        .map(Cow::Borrowed)
                        .map_err(|_| Conversion::FailedConversion)
                }
                Text::Ascii(bytes) if bytes.is_ascii() => {
                    return std::str::from_utf8(bytes)
                        .map(Cow::Borrowed)
                        .map_err(|_| Conversion::FailedConversion)
                }
                _ => {}
            }
        }
        self.to_string(0, None).map(Cow::Owned)
    }

    /// TimeStamp, text (`YYYY-MM-DD hh:mm:ss[.fff]`), 32-bit unix
    /// seconds or 64-bit raw ticks
    pub fn to_file_time(&self, index: usize) -> Converted<FileTime> {
        self.check_valid()?;
        match self.kind_or_unsupported()? {
            ValueType::TimeStamp => self.time_stamp(index),
            ValueType::Text => {
                FileTime::parse(&self.text(index)?.decode()?).ok_or(Conversion::FailedConversion)
            }
            ValueType::Unsigned => match self.specs.width {
                4 => {
                    let seconds = u64::from_scalar(self.element(index)?)?;
                    FileTime::from_unix_seconds(seconds).ok_or(Conversion::ValueOutOfRangeAbove)
                }
                8 => Ok(FileTime(u64::from_scalar(self.element(index)?)?)),
                _ => Err(Conversion::UnsupportedWidth),
            },
            _ => Err(Conversion::UnsupportedType),
        }
    }

    pub fn to_address(&self, index: usize) -> Converted<Address> {
        self.check_valid()?;
        match self.kind_or_unsupported()? {
            ValueType::Address => {
                Self::check_single(index)?;
                match self.decode()? {
                    Payload::Address(address) => Ok(address),
                    _ => Err(Conversion::UnsupportedType),
                }
            }
            ValueType::Text => self
                .text(index)?
                .decode()?
                .parse()
                .map_err(|_| Conversion::FailedConversion),
            _ => Err(Conversion::UnsupportedType),
        }
    }

    pub fn to_atom(&self, index: usize) -> Converted<Atom> {
        self.check_valid()?;
        match self.kind_or_unsupported()? {
            ValueType::Null => Ok(Atom::EMPTY),
            ValueType::TimeStamp => {
                Atom::from_number(self.time_stamp(index)?.ticks()).map_err(|_| Conversion::ValueOutOfRangeAbove)
            }
            ValueType::Atom => Ok(self.atom_at(index)?.unwrap_or(Atom::EMPTY)),
            ValueType::Integer | ValueType::Unsigned => scalar_to_atom(self.element(index)?),
            ValueType::Data => {
                let data = self.data(index)?;
                if data.len() > 8 {
                    return Err(Conversion::ValueOutOfRangeAbove);
                }
                let mut raw = [0u8; 8];
                raw[..data.len()].copy_from_slice(data);
                Ok(Atom::from_raw(u64::from_le_bytes(raw)))
            }
            ValueType::Text => {
                Atom::parse(&self.text(index)?.decode()?).map_err(|_| Conversion::FailedConversion)
            }
            _ => Err(Conversion::UnsupportedType),
        }
    }

    /// Whole value as a path
    pub fn to_atom_path(&self) -> Converted<AtomPath> {
        self.check_valid()?;
        match self.kind_or_unsupported()? {
            ValueType::Null => Ok(AtomPath::new()),
            ValueType::TimeStamp => Ok(AtomPath::from(self.to_atom(0)?)),
            ValueType::Atom => match self.decode()? {
                Payload::Atoms { parents, atoms } => {
                    let mut path = AtomPath::with_capacity(parents as usize + atoms.len());
                    path.resize(parents as usize);
                    path += atoms.as_slice();
                    Ok(path)
                }
                _ => Err(Conversion::UnsupportedType),
            },
            ValueType::Integer | ValueType::Unsigned => (0..=self.specs.count as usize)
                .map(|index| self.to_atom(index))
                .collect::<Converted<Vec<_>>>()
                .map(AtomPath::from),
            ValueType::Text => {
                AtomPath::parse(&self.text(0)?.decode()?).map_err(|_| Conversion::FailedConversion)
            }
            _ => Err(Conversion::UnsupportedType),
        }
    }

    /// Byte length of [`Information::to_raw_data`] and whether the bytes
    /// are copied verbatim from the payload
    pub fn raw_data_size(&self) -> Converted<(usize, bool)> {
        self.check_valid()?;
        let count = self.specs.count as usize;
        let width = self.specs.width as usize;
        let (length, direct) = match self.kind_or_unsupported()? {
            ValueType::Null => (0, true),
            ValueType::TimeStamp => (8, true),
            ValueType::Atom => (count * 8, true),
            ValueType::Float => match width {
                4 | 8 => (width * (count + 1), true),
                _ => return Err(Conversion::UnsupportedWidth),
            },
            ValueType::Integer | ValueType::Unsigned => match width {
                0 => (1 + count / 8, false),
                1 | 2 | 4 | 8 | 16 => (width * (count + 1), true),
                32 => (32, true),
                _ => return Err(Conversion::UnsupportedWidth),
            },
            ValueType::Address => {
                Address::sockaddr_len(self.specs.width).ok_or(Conversion::UnsupportedData)?
            }
            ValueType::Data | ValueType::Text if self.specs.flags.external() => {
                return Err(Conversion::External)
            }
            ValueType::Data => (count, true),
            ValueType::Text => match width {
                0 | 1 => (count, true),
                2 => (count * 2, true),
                _ => return Err(Conversion::UnsupportedWidth),
            },
            ValueType::Expression | ValueType::Stream => return Err(Conversion::UnsupportedType),
        };
        if direct && length > PAYLOAD_SIZE {
            return Err(Conversion::Corrupted);
        }
        Ok((length, direct))
    }

    /// Copy the value bytes into `buffer`, returning the length
    ///
    /// Bit vectors and UNIX or Hyper-V addresses are synthesized.
    pub fn to_raw_data(&self, buffer: &mut [u8]) -> Converted<usize> {
        let (length, direct) = self.raw_data_size()?;
        if buffer.len() < length {
            return Err(Conversion::InsufficientBuffer);
        }
        if direct {
            buffer[..length].copy_from_slice(&self.payload[..length]);
            return Ok(length);
        }
        match self.decode()? {
            Payload::Integer(_) | Payload::Unsigned(_) => {
                buffer[..length].copy_from_slice(&self.payload[..length]);
            }
            Payload::Address(address) => {
                let bytes = address.to_sockaddr().map_err(|_| Conversion::Corrupted)?;
                if bytes.len() != length {
                    return Err(Conversion::Corrupted);
                }
                buffer[..length].copy_from_slice(&bytes);
            }
            _ => return Err(Conversion::UnsupportedType),
        }
        Ok(length)
    }

    pub fn to_raw_data_vec(&self) -> Converted<Vec<u8>> {
        let (length, _) = self.raw_data_size()?;
        let mut bytes = vec![0u8; length];
        let written = self.to_raw_data(&mut bytes)?;
        bytes.truncate(written);
        Ok(bytes)
    }
}

/// Host types an element of a value converts to
pub trait FromInformation: Sized {
    fn from_information(info: &Information, index: usize) -> Converted<Self>;
}

macro_rules! from_information_integer {
    ($($ty:ty),*) => {
        $(
            impl FromInformation for $ty {
                fn from_information(info: &Information, index: usize) -> Converted<Self> {
                    info.to_integer(index)
                }
            }
        )*
    };
}

from_information_integer!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);

impl FromInformation for bool {
    fn from_information(info: &Information, index: usize) -> Converted<Self> {
        info.to_boolean(index)
    }
}

impl FromInformation for f32 {
    fn from_information(info: &Information, index: usize) -> Converted<Self> {
        info.to_float(index)
    }
}

impl FromInformation for f64 {
    fn from_information(info: &Information, index: usize) -> Converted<Self> {
        info.to_float(index)
    }
}

impl FromInformation for String {
    fn from_information(info: &Information, index: usize) -> Converted<Self> {
        info.to_string(index, None)
    }
}

impl FromInformation for Vec<u16> {
    fn from_information(info: &Information, index: usize) -> Converted<Self> {
        info.to_utf16(index, None)
    }
}

impl FromInformation for FileTime {
    fn from_information(info: &Information, index: usize) -> Converted<Self> {
        info.to_file_time(index)
    }
}

impl FromInformation for Address {
    fn from_information(info: &Information, index: usize) -> Converted<Self> {
        info.to_address(index)
    }
}

impl FromInformation for Atom {
    fn from_information(info: &Information, index: usize) -> Converted<Self> {
        info.to_atom(index)
    }
}

impl FromInformation for AtomPath {
    fn from_information(info: &Information, index: usize) -> Converted<Self> {
        if index != 0 {
            return Err(Conversion::IndexOutOfTypeBounds);
        }
        info.to_atom_path()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::cell::expression::Expression;
    use crate::core::cell::information::Flags;

    fn info<T: crate::core::cell::information::IntoInformation>(value: T) -> Information {
        Information::from_value(value).unwrap()
    }

    #[test]
    fn test_invalid_is_checked_first() {
        let mut value = info(5u8);
        value.specs.flags.set(Flags::INVALID, true);
        assert_eq!(value.to_boolean(7), Err(Conversion::InvalidFlagSet));
        assert_eq!(value.to_integer::<u8>(0), Err(Conversion::InvalidFlagSet));
        assert_eq!(value.to_string(0, None), Err(Conversion::InvalidFlagSet));
        assert_eq!(value.raw_data_size(), Err(Conversion::InvalidFlagSet));
    }

    #[test]
    fn test_integer_range() {
        let value = info(300i32);
        assert_eq!(value.to_integer::<i16>(0), Ok(300));
        assert_eq!(value.to_integer::<u8>(0), Err(Conversion::ValueOutOfRangeAbove));
        let value = info(-1i8);
        assert_eq!(value.to_integer::<u64>(0), Err(Conversion::ValueOutOfRangeBelow));
        assert_eq!(value.to_integer::<i128>(0), Ok(-1));
        let value = info(2.6f64);
        assert_eq!(value.to_integer::<u8>(0), Ok(3));
        let value = info(f64::NAN);
        assert_eq!(value.to_integer::<u8>(0), Err(Conversion::FailedConversion));
    }

    #[test]
    fn test_vector_bounds() {
        let value = info(&[1u64, 2, 3][..]);
        assert_eq!(value.to_integer::<u64>(2), Ok(3));
        assert_eq!(value.to_integer::<u64>(3), Err(Conversion::IndexOutOfTypeBounds));

        let mut value = info(&[1u64, 2, 3, 4][..]);
        value.specs.count = 6;
        assert_eq!(value.to_integer::<u64>(5), Err(Conversion::IndexOutOfSupportedBounds));
        assert_eq!(value.to_integer::<u64>(7), Err(Conversion::IndexOutOfTypeBounds));
    }

    #[test]
    fn test_boolean_text() {
        for text in ["true", "YES", "y", "T", "1"] {
            assert_eq!(info(text).to_boolean(0), Ok(true), "{}", text);
        }
        for text in ["false", "No", "n", "F", "0"] {
            assert_eq!(info(text).to_boolean(0), Ok(false), "{}", text);
        }
        assert_eq!(info("maybe").to_boolean(0), Err(Conversion::FailedConversion));
        assert_eq!(info("true").to_boolean(1), Err(Conversion::IndexOutOfTypeBounds));
    }

    #[test]
    fn test_external_text() {
        let mut value = info("pump1");
        value.specs.flags.set(Flags::EXTERNAL, true);
        assert_eq!(value.to_string(0, None), Err(Conversion::External));
        assert_eq!(value.to_string(1, None), Err(Conversion::IndexOutOfTypeBounds));
        assert_eq!(value.raw_data_size(), Err(Conversion::External));
    }

    #[test]
    fn test_text_fast_path_borrows() {
        let value = info("pump1");
        assert!(matches!(value.to_str(), Ok(Cow::Borrowed("pump1"))));
        let mut ascii = Information::default();
        ascii.initialize_ascii("valve").unwrap();
        assert!(matches!(ascii.to_str(), Ok(Cow::Borrowed("valve"))));
        assert_eq!(ascii.to_ascii(0, None).unwrap(), "valve");
        let number = info(42u8);
        assert!(matches!(number.to_str(), Ok(Cow::Owned(ref s)) if s == "42"));
    }

    #[test]
    fn test_utf16_text() {
        let units: Vec<u16> = "Grüße".encode_utf16().collect();
        let mut value = Information::default();
        value.initialize_utf16(&units).unwrap();
        assert_eq!(value.to_utf16(0, None).unwrap(), units);
        assert_eq!(value.to_string(0, None).unwrap(), "Grüße");
        assert_eq!(value.to_ascii(0, None), Err(Conversion::FailedConversion));
        assert_eq!(value.raw_data_size(), Ok((10, true)));
    }

    #[test]
    fn test_formatting() {
        let format = TextFormat {
            precision: Some(2),
            width: 8,
            ..TextFormat::default()
        };
        assert_eq!(info(1.5f64).to_string(0, Some(&format)).unwrap(), "    1.50");
        let hex = TextFormat {
            hexadecimal: true,
            ..TextFormat::default()
        };
        assert_eq!(info(255u32).to_string(0, Some(&hex)).unwrap(), "FF");
        assert_eq!(info(true).to_string(0, None).unwrap(), "true");
    }

    #[test]
    fn test_atom_prefix() {
        let mut value = Information::default();
        value
            .initialize_atoms(2, &[Atom::from_number(42).unwrap()])
            .unwrap();
        assert_eq!(value.to_boolean(0), Ok(false));
        assert_eq!(value.to_atom(1), Ok(Atom::EMPTY));
        assert_eq!(value.to_integer::<u32>(2), Ok(42));
        assert_eq!(value.to_integer::<u32>(1), Err(Conversion::FailedConversion));
        assert_eq!(value.to_string(2, None).unwrap(), "42");
        assert_eq!(value.to_atom(3), Err(Conversion::IndexOutOfTypeBounds));
        assert_eq!(value.to_atom_path().unwrap().len(), 3);
    }

    #[test]
    fn test_numeric_atom_from_integer() {
        assert_eq!(info(42u16).to_atom(0), Ok(Atom::from_number(42).unwrap()));
        assert_eq!(info(-1i32).to_atom(0), Err(Conversion::ValueOutOfRangeBelow));
        assert_eq!(info(u64::MAX).to_atom(0), Err(Conversion::ValueOutOfRangeAbove));
        assert_eq!(info(1.0f32).to_atom(0), Err(Conversion::UnsupportedType));
        let path = info(&[1u8, 2, 3][..]).to_atom_path().unwrap();
        assert_eq!(path.format(), "1/2/3");
    }

    #[test]
    fn test_data_conversions() {
        let mut value = Information::default();
        value.initialize_data(&[0x01, 0x02, 0xff]).unwrap();
        assert_eq!(value.to_string(0, None).unwrap(), "01 02 ff");
        assert_eq!(value.to_boolean(0), Ok(true));
        assert_eq!(value.to_integer::<u32>(0), Ok(0x00ff_0201));
        assert_eq!(value.to_atom(0), Ok(Atom::from_raw(0x00ff_0201)));
        value.initialize_data(&[0u8; 9]).unwrap();
        assert_eq!(value.to_boolean(0), Ok(false));
        assert_eq!(value.to_atom(0), Err(Conversion::ValueOutOfRangeAbove));
    }

    #[test]
    fn test_file_time_sources() {
        let time = FileTime::parse("2024-03-05 07:08:09.123").unwrap();
        assert_eq!(info(time).to_file_time(0), Ok(time));
        assert_eq!(info("2024-03-05 07:08:09.123").to_file_time(0), Ok(time));
        assert_eq!(info(0u32).to_file_time(0), FileTime::from_unix_seconds(0).ok_or(Conversion::Corrupted));
        assert_eq!(info(7u64).to_file_time(0), Ok(FileTime(7)));
        assert_eq!(info(7u16).to_file_time(0), Err(Conversion::UnsupportedWidth));
        assert_eq!(info(time).to_string(0, None).unwrap(), "2024-03-05 07:08:09.123");
    }

    #[test]
    fn test_address_sources() {
        let address: Address = "10.0.0.1:502".parse().unwrap();
        assert_eq!(info(&address).to_address(0), Ok(address.clone()));
        assert_eq!(info("10.0.0.1:502").to_address(0), Ok(address));
        assert_eq!(info(5u8).to_address(0), Err(Conversion::UnsupportedType));
    }

    #[test]
    fn test_raw_data() {
        let value = info(&[1u16, 2][..]);
        assert_eq!(value.raw_data_size(), Ok((4, true)));
        assert_eq!(value.to_raw_data_vec().unwrap(), vec![1, 0, 2, 0]);
        let mut short = [0u8; 3];
        assert_eq!(value.to_raw_data(&mut short), Err(Conversion::InsufficientBuffer));

        let bits = info(&[true; 9][..]);
        assert_eq!(bits.raw_data_size(), Ok((2, false)));
        assert_eq!(bits.to_raw_data_vec().unwrap(), vec![0xFF, 0x01]);

        let unix = info(Address::unix("/run/plc.sock").unwrap());
        let bytes = unix.to_raw_data_vec().unwrap();
        assert_eq!(bytes.len(), 35);
        assert_eq!(&bytes[..2], &[1, 0]);
        assert_eq!(&bytes[2..15], b"/run/plc.sock");

        assert_eq!(info(Expression::default()).raw_data_size(), Err(Conversion::UnsupportedType));
    }

    #[test]
    fn test_raw_data_rejects_unknown_widths() {
        let mut float = info(&[1.0f32, 2.0][..]);
        float.specs.width = 3;
        assert_eq!(float.raw_data_size(), Err(Conversion::UnsupportedWidth));
        assert_eq!(float.to_raw_data_vec(), Err(Conversion::UnsupportedWidth));

        let mut text = info("pump1");
        assert_eq!(text.raw_data_size(), Ok((5, true)));
        text.specs.width = 3;
        assert_eq!(text.raw_data_size(), Err(Conversion::UnsupportedWidth));
    }

    #[test]
    fn test_generic_to() {
        let value = info(&[10i32, 20][..]);
        assert_eq!(value.to::<i64>(1), Ok(20));
        assert_eq!(value.to::<f64>(0), Ok(10.0));
        assert_eq!(value.to::<String>(1).unwrap(), "20");
        assert_eq!(value.to::<bool>(0), Ok(true));
    }
}
