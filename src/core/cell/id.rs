use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a cell's storage slot
///
/// Segment 0 holds system metadata, segments 1 and up hold data. `0:0`
/// means "no such object".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct CellId {
    pub segment: u16,
    pub index: u32,
}

impl CellId {
    pub const NONE: CellId = CellId { segment: 0, index: 0 };

    /// Size of the wire form
    pub const SIZE: usize = 6;

    pub const fn new(segment: u16, index: u32) -> Self {
        CellId { segment, index }
    }

    pub fn is_none(&self) -> bool {
        *self == CellId::NONE
    }

    /// `index` little endian, then `segment` little endian
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut bytes = [0u8; Self::SIZE];
        bytes[0..4].copy_from_slice(&self.index.to_le_bytes());
        bytes[4..6].copy_from_slice(&self.segment.to_le_bytes());
        bytes
    }

    pub fn from_bytes(bytes: &[u8; Self::SIZE]) -> Self {
        CellId {
            index: u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            segment: u16::from_le_bytes([bytes[4], bytes[5]]),
        }
    }
}

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.segment, self.index)
    }
}
