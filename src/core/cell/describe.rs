//! Human readable rendering of values and cell records
//!
//! ```text
//! NULL
//! "pump1" (5) UTF-8
//! 01 02 ff (3B)
//! (1,2,3)u:3×8
//! -4:32
//! ../plant/pump:
//! = {1:7} + {1:8} [2024-03-05 07:08:09.123]
//! ```

use std::fmt;

use crate::core::cell::conversion::hex_bytes;
use crate::core::cell::id::CellId;
use crate::core::cell::information::{Information, ValueType};
use crate::core::cell::payload::{Payload, Scalar, Text};
use crate::core::cell::{Cell, WireCell};
use crate::core::filetime::FileTime;

fn describe_scalar(scalar: Scalar) -> String {
    match scalar {
        Scalar::Bit(bit) => (bit as u8).to_string(),
        Scalar::Int(value) => value.to_string(),
        Scalar::UInt(value) => value.to_string(),
        Scalar::I256(value) => value.to_string(),
        Scalar::U256(value) => value.to_string(),
        Scalar::F32(value) => describe_float(value.to_string(), value.is_finite()),
        Scalar::F64(value) => describe_float(value.to_string(), value.is_finite()),
    }
}

fn describe_float(mut text: String, finite: bool) -> String {
    if finite && !text.contains('.') {
        text.push_str(".0");
    }
    text
}

fn write_vector(
    f: &mut fmt::Formatter<'_>,
    info: &Information,
    elements: impl Iterator<Item = Scalar>,
    unsigned: bool,
) -> fmt::Result {
    let values: Vec<String> = elements.map(describe_scalar).collect();
    if values.len() == 1 {
        f.write_str(&values[0])?;
    } else {
        write!(f, "({})", values.join(","))?;
    }
    if unsigned {
        f.write_str("u")?;
    }
    f.write_str(":")?;
    let count = info.specs.count as usize;
    if count > 0 {
        write!(f, "{}×", count + 1)?;
    }
    match info.specs.width {
        0 => f.write_str("1"),
        width => write!(f, "{}", width as usize * 8),
    }
}

fn write_text(f: &mut fmt::Formatter<'_>, text: Text<'_>) -> fmt::Result {
    let encoding = match text {
        Text::Utf8(_) => "UTF-8",
        Text::Ascii(_) => "ASCII",
        Text::Utf16(_) => "UTF-16",
    };
    match text.decode() {
        Ok(decoded) => write!(f, "{:?}", decoded)?,
        Err(err) => write!(f, "{}", err)?,
    }
    write!(f, " ({}) {}", text.units(), encoding)
}

impl fmt::Display for Information {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.decode() {
            Ok(Payload::Null) => f.write_str("NULL")?,
            Ok(Payload::Stream) => f.write_str("STREAM")?,
            Ok(Payload::TimeStamp(time)) => write!(f, "{}", time)?,
            Ok(Payload::Address(address)) => write!(f, "{}", address)?,
            Ok(Payload::Data(bytes)) => write!(f, "{} ({}B)", hex_bytes(bytes), bytes.len())?,
            Ok(Payload::Text(text)) => write_text(f, text)?,
            Ok(Payload::Expression(expression)) => write!(f, "{}", expression)?,
            Ok(Payload::Atoms { parents, atoms }) => {
                let parts: Vec<String> = std::iter::repeat("..".to_string())
                    .take(parents as usize)
                    .chain(atoms.as_slice().iter().map(|atom| atom.format()))
                    .collect();
                write!(f, "{}:", parts.join("/"))?;
            }
            Ok(Payload::Float(floats)) => {
                let values = (0..floats.len()).filter_map(|i| floats.get(i));
                write_vector(f, self, values, false)?;
            }
            Ok(Payload::Integer(integers)) => {
                let values = (0..integers.len()).filter_map(|i| integers.get(i));
                write_vector(f, self, values, false)?;
            }
            Ok(Payload::Unsigned(unsigneds)) => {
                let values = (0..unsigneds.len()).filter_map(|i| unsigneds.get(i));
                write_vector(f, self, values, true)?;
            }
            Err(err) => match self.kind() {
                Some(kind) => write!(f, "{} ({})", kind.name(), err)?,
                None => write!(f, "?{:#04x}", self.specs.value_type)?,
            },
        }
        if self.is_invalid() {
            f.write_str(" !invalid")?;
        }
        Ok(())
    }
}

/// Fields shared by the live and the wire rendering
struct Record {
    information: Information,
    time: FileTime,
    base: CellId,
    expression_id: CellId,
    checksum_ok: bool,
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.information.kind() == Some(ValueType::Expression) {
            write!(f, "= {{{}}}", self.base)?;
        }
        write!(f, "{} [{}]", self.information, self.time)?;
        if !self.checksum_ok {
            f.write_str(" CHECKSUM MISMATCH!")?;
        }
        if !self.expression_id.is_none() {
            write!(f, " = {{{}}}", self.expression_id)?;
        }
        Ok(())
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let wire = self.snapshot(CellId::NONE);
        Record {
            information: wire.information(),
            time: wire.timestamp(),
            base: wire.base(),
            expression_id: wire.expression_id(),
            checksum_ok: wire.verify_checksum(),
        }
        .fmt(f)
    }
}

impl fmt::Display for WireCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}}} ", self.id())?;
        Record {
            information: self.information(),
            time: self.timestamp(),
            base: self.base(),
            expression_id: self.expression_id(),
            checksum_ok: self.verify_checksum(),
        }
        .fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::atom::Atom;
    use crate::core::cell::expression::{Expression, Input, Operation};
    use crate::core::cell::information::Flags;

    fn describe<T: crate::core::cell::information::IntoInformation>(value: T) -> String {
        format!("{}", Information::from_value(value).unwrap())
    }

    #[test]
    fn test_numbers() {
        assert_eq!(describe(&[1u8, 2, 3][..]), "(1,2,3)u:3×8");
        assert_eq!(describe(-4i32), "-4:32");
        assert_eq!(describe(5u16), "5u:16");
        assert_eq!(describe(3.0f64), "3.0:64");
        assert_eq!(describe(&[1.5f32, -2.0][..]), "(1.5,-2.0):2×32");
        assert_eq!(describe(true), "1u:1");
    }

    #[test]
    fn test_text_and_data() {
        assert_eq!(describe("pump1"), "\"pump1\" (5) UTF-8");
        let mut info = Information::default();
        info.initialize_ascii("ab").unwrap();
        assert_eq!(format!("{}", info), "\"ab\" (2) ASCII");
        info.initialize_data(&[1, 2, 0xff]).unwrap();
        assert_eq!(format!("{}", info), "01 02 ff (3B)");
    }

    #[test]
    fn test_null_and_invalid() {
        let mut info = Information::default();
        assert_eq!(format!("{}", info), "NULL");
        info.specs.flags.set(Flags::INVALID, true);
        assert_eq!(format!("{}", info), "NULL !invalid");
    }

    #[test]
    fn test_atoms() {
        let mut info = Information::default();
        info.initialize_atoms(1, &[Atom::from_number(7).unwrap(), Atom::from_number(9).unwrap()])
            .unwrap();
        assert_eq!(format!("{}", info), "../7/9:");
        info.initialize_atoms(0, &[]).unwrap();
        assert_eq!(format!("{}", info), ":");
    }

    #[test]
    fn test_expression() {
        let expression = Expression::from_inputs(&[Input::new(CellId::new(1, 8), Operation::Add)]).unwrap();
        assert_eq!(describe(expression), format!("{}", expression));
    }

    #[test]
    fn test_unknown_type() {
        let mut info = Information::default();
        info.specs.value_type = 0x42;
        assert_eq!(format!("{}", info), "?0x42");
    }
}
