//! Computed-cell expression model
//!
//! An expression names up to four input cells and the operation applied
//! with each. Evaluation happens elsewhere; this module only defines the
//! stored form.

use crate::core::cell::id::CellId;
use crate::error::Conversion;
use std::fmt;

pub const MAX_INPUTS: usize = 4;

/// Bytes per input: cell id, operation, flags
pub const INPUT_SIZE: usize = CellId::SIZE + 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum Operation {
    #[default]
    Nop = 0x00,
    Add = 0x01,
    Subtract = 0x02,
    Multiply = 0x03,
    Divide = 0x04,
    Equals = 0x05,
    EqualsAnyOf = 0x06,
    NotEquals = 0x07,
    BitwiseAnd = 0x08,
    ExtractIndex = 0x42,
    ExtractIndexSignExtended = 0x43,
    ExtractBits = 0x44,
    ExtractBitsSignExtended = 0x45,
    ExtractFull = 0x46,
    ExtractFullSignExtended = 0x47,
    Restrict = 0x80,
}

impl Operation {
    pub fn from_u8(value: u8) -> Option<Self> {
        use Operation::*;
        Some(match value {
            0x00 => Nop,
            0x01 => Add,
            0x02 => Subtract,
            0x03 => Multiply,
            0x04 => Divide,
            0x05 => Equals,
            0x06 => EqualsAnyOf,
            0x07 => NotEquals,
            0x08 => BitwiseAnd,
            0x42 => ExtractIndex,
            0x43 => ExtractIndexSignExtended,
            0x44 => ExtractBits,
            0x45 => ExtractBitsSignExtended,
            0x46 => ExtractFull,
            0x47 => ExtractFullSignExtended,
            0x80 => Restrict,
            _ => return None,
        })
    }

    pub fn symbol(self) -> &'static str {
        use Operation::*;
        match self {
            Nop => "NOP",
            Add => "+",
            Subtract => "-",
            Multiply => "\u{00D7}",
            Divide => "\u{00F7}",
            Equals => "==",
            EqualsAnyOf => "==:",
            NotEquals => "\u{2260}",
            BitwiseAnd => "&",
            ExtractIndex => "extract(index)",
            ExtractIndexSignExtended => "extract(index) signed",
            ExtractBits => "extract(bits)",
            ExtractBitsSignExtended => "extract(bits) signed",
            ExtractFull => "extract",
            ExtractFullSignExtended => "extract signed",
            Restrict => "restrict",
        }
    }
}

/// Per-input flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct InputFlags(pub u8);

impl InputFlags {
    /// Do not copy the input cell when instantiating
    pub const ABSOLUTE: u8 = 0x01;
    pub const DEPENDENT: u8 = 0x02;
    /// Convert to the target cell type before applying the operation
    pub const CONVERT: u8 = 0x04;
    pub const BYTESWAP: u8 = 0x08;

    pub fn contains(self, flag: u8) -> bool {
        self.0 & flag == flag
    }

    pub fn absolute(self) -> bool {
        self.contains(Self::ABSOLUTE)
    }

    pub fn dependent(self) -> bool {
        self.contains(Self::DEPENDENT)
    }

    pub fn convert(self) -> bool {
        self.contains(Self::CONVERT)
    }

    pub fn byteswap(self) -> bool {
        self.contains(Self::BYTESWAP)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Input {
    pub cell: CellId,
    pub operation: Operation,
    pub flags: InputFlags,
}

impl Input {
    pub fn new(cell: CellId, operation: Operation) -> Self {
        Input {
            cell,
            operation,
            flags: InputFlags::default(),
        }
    }

    pub fn with_flags(mut self, flags: u8) -> Self {
        self.flags = InputFlags(flags);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Expression {
    pub inputs: [Input; MAX_INPUTS],
}

impl Expression {
    /// Expression from up to four inputs; unused slots stay `Nop`
    pub fn from_inputs(inputs: &[Input]) -> Option<Self> {
        if inputs.len() > MAX_INPUTS {
            return None;
        }
        let mut expression = Expression::default();
        expression.inputs[..inputs.len()].copy_from_slice(inputs);
        Some(expression)
    }

    /// Inputs that do something
    pub fn active(&self) -> impl Iterator<Item = &Input> {
        self.inputs.iter().filter(|i| i.operation != Operation::Nop)
    }

    pub fn to_bytes(&self) -> [u8; MAX_INPUTS * INPUT_SIZE] {
        let mut bytes = [0u8; MAX_INPUTS * INPUT_SIZE];
        for (chunk, input) in bytes.chunks_exact_mut(INPUT_SIZE).zip(self.inputs.iter()) {
            chunk[..CellId::SIZE].copy_from_slice(&input.cell.to_bytes());
            chunk[CellId::SIZE] = input.operation as u8;
            chunk[CellId::SIZE + 1] = input.flags.0;
        }
        bytes
    }

    /// Decode the stored form; unknown operation codes are `UnsupportedData`
    pub fn from_bytes(bytes: &[u8; MAX_INPUTS * INPUT_SIZE]) -> Result<Self, Conversion> {
        let mut expression = Expression::default();
        for (input, chunk) in expression.inputs.iter_mut().zip(bytes.chunks_exact(INPUT_SIZE)) {
            let mut id = [0u8; CellId::SIZE];
            id.copy_from_slice(&chunk[..CellId::SIZE]);
            *input = Input {
                cell: CellId::from_bytes(&id),
                operation: Operation::from_u8(chunk[CellId::SIZE]).ok_or(Conversion::UnsupportedData)?,
                flags: InputFlags(chunk[CellId::SIZE + 1]),
            };
        }
        Ok(expression)
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for input in self.active() {
            write!(f, " {} ", input.operation.symbol())?;
            if input.flags.absolute() {
                f.write_str("$")?;
            }
            write!(f, "{{{}}}", input.cell)?;
            if input.flags.dependent() {
                f.write_str("!")?;
            }
            if input.flags.convert() {
                f.write_str(" convert")?;
            }
        }
        Ok(())
    }
}
