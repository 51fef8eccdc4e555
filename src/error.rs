//! Error types for atom parsing, value conversion and cell operations

use thiserror::Error;

/// Cell operation result type
pub type Result<T> = std::result::Result<T, CellError>;

/// Reasons an atom or an atom path failed to parse
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum InvalidInputReason {
    /// Numeric input does not fit into 63 bits
    #[error("number too large")]
    NumberTooLarge = 1,

    /// Text does not fit into the 64-bit encoding
    #[error("text too long")]
    TextTooLong = 2,

    /// Character outside the atom alphabet
    #[error("invalid character")]
    InvalidCharacter = 3,

    /// More atoms than the target buffer can hold
    #[error("path too long to fit buffer")]
    PathTooLong = 4,

    /// Empty segment in the middle of a path
    #[error("empty atom not allowed in paths")]
    EmptyAtomInPath = 5,
}

/// Failure of an `Information` to host type conversion
///
/// A successful conversion is `Ok(_)`; the numeric codes of the
/// variants follow the wire codes where `0` means success.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Conversion {
    /// Not produced by conversions themselves; the failure is elsewhere
    #[error("not a conversion error")]
    NotConversionError = 1,

    /// Payload lives in external storage, query the database instead
    #[error("externally stored data")]
    External = 2,

    /// The `invalid` flag is set on the value
    #[error("invalid flag set")]
    InvalidFlagSet = 3,

    /// Stored bytes contradict the tag
    #[error("data corrupt")]
    Corrupted = 4,

    /// Possibly valid value this implementation does not handle
    #[error("unsupported data")]
    UnsupportedData = 5,

    /// The stored type cannot be converted to the requested one
    #[error("unsupported type")]
    UnsupportedType = 6,

    /// Misconfigured or unimplemented `width`
    #[error("unsupported width")]
    UnsupportedWidth = 7,

    /// Element beyond `count`, e.g. element 1 of a single value
    #[error("index out of type bounds")]
    IndexOutOfTypeBounds = 8,

    /// Element the storage can never hold, e.g. `u64` element 5
    #[error("index out of supported bounds")]
    IndexOutOfSupportedBounds = 9,

    /// Stored value is too small for the target type
    #[error("value out of range (underflow)")]
    ValueOutOfRangeBelow = 10,

    /// Stored value is too large for the target type
    #[error("value out of range (overflow)")]
    ValueOutOfRangeAbove = 11,

    /// Parsing or charset conversion failed
    #[error("cannot convert")]
    FailedConversion = 12,

    /// Output buffer is smaller than the value
    #[error("insufficient output buffer")]
    InsufficientBuffer = 13,
}

impl Conversion {
    /// Wire code of the failure (`0` is reserved for success)
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Parse a wire code; `0` (success) and unknown codes yield `None`
    pub fn from_code(code: u8) -> Option<Self> {
        use Conversion::*;
        Some(match code {
            1 => NotConversionError,
            2 => External,
            3 => InvalidFlagSet,
            4 => Corrupted,
            5 => UnsupportedData,
            6 => UnsupportedType,
            7 => UnsupportedWidth,
            8 => IndexOutOfTypeBounds,
            9 => IndexOutOfSupportedBounds,
            10 => ValueOutOfRangeBelow,
            11 => ValueOutOfRangeAbove,
            12 => FailedConversion,
            13 => InsufficientBuffer,
            _ => return None,
        })
    }
}

#[derive(Error, Debug)]
pub enum CellError {
    #[error("Invalid input: {0}")]
    InvalidInput(#[from] InvalidInputReason),

    #[error("Conversion failed: {0}")]
    Conversion(#[from] Conversion),

    #[error("Value too large: {size} (capacity: {capacity})")]
    ValueTooLarge { size: usize, capacity: usize },

    #[error("Unsupported value: {0}")]
    UnsupportedValue(String),

    #[error("Cell type is fixed: cannot change {from} to {to}")]
    FixedType { from: String, to: String },

    #[error("Cell is constant and cannot be modified")]
    Constant,

    #[error("Stream values are delivered to listeners and never stored")]
    StreamNotStorable,

    #[error("Cell checksum verification failed")]
    ChecksumMismatch,

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Configuration parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversion_codes() {
        for code in 1..=13u8 {
            let conversion = Conversion::from_code(code).unwrap();
            assert_eq!(conversion.code(), code);
        }
        assert_eq!(Conversion::from_code(0), None);
        assert_eq!(Conversion::from_code(14), None);
    }

    #[test]
    fn test_error_messages() {
        let err = CellError::from(InvalidInputReason::TextTooLong);
        assert_eq!(err.to_string(), "Invalid input: text too long");

        let err = CellError::ValueTooLarge { size: 40, capacity: 32 };
        assert_eq!(err.to_string(), "Value too large: 40 (capacity: 32)");
    }
}
