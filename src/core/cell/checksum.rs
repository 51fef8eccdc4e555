//! 16-bit cell checksum
//!
//! CRC-32 rounds over the eight 8-byte lanes of the record, run as three
//! interleaved chains and folded to 16 bits. The lock word and the
//! checksum itself (bytes 0..4) never take part; a wire copy additionally
//! ignores bytes 4..8 where it carries the cell id.

use crate::core::cell::CELL_SIZE;
use crc32fast::Hasher;

const LANES: usize = CELL_SIZE / 8;

const LIVE_MASK: u64 = 0xFFFF_FFFF_0000_0000;
const WIRE_MASK: u64 = 0;

#[inline]
fn crc_round(crc: u32, lane: u64) -> u32 {
    let mut hasher = Hasher::new_with_initial(crc);
    hasher.update(&lane.to_le_bytes());
    hasher.finalize()
}

#[inline]
fn lanes(record: &[u8; CELL_SIZE]) -> [u64; LANES] {
    let mut lanes = [0u64; LANES];
    for (lane, chunk) in lanes.iter_mut().zip(record.chunks_exact(8)) {
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(chunk);
        *lane = u64::from_le_bytes(bytes);
    }
    lanes
}

fn fold(lanes: [u64; LANES]) -> u16 {
    let mut a = crc_round(0, lanes[0]);
    let mut b = crc_round(0, lanes[1]);
    let mut c = crc_round(0, lanes[2]);
    a = crc_round(a, lanes[3]);
    b = crc_round(b, lanes[4]);
    c = crc_round(c, lanes[5]);
    a = crc_round(a, lanes[6]);
    b = crc_round(b, lanes[7]);

    b = crc_round(b, c as u64);
    c = crc_round(a, b as u64);

    (c as u16) ^ ((c >> 16) as u16)
}

/// Checksum of a live record, bytes 4..64
pub fn compute(record: &[u8; CELL_SIZE]) -> u16 {
    let mut lanes = lanes(record);
    lanes[0] &= LIVE_MASK;
    fold(lanes)
}

/// Checksum of a wire copy, bytes 8..64
///
/// Equal to [`compute`] for any record whose bytes 4..8 are zero.
pub fn compute_wire(record: &[u8; CELL_SIZE]) -> u16 {
    let mut lanes = lanes(record);
    lanes[0] &= WIRE_MASK;
    fold(lanes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_vectors() {
        assert_eq!(compute(&[0u8; CELL_SIZE]), 0xC9F8);

        let mut record = [0u8; CELL_SIZE];
        for (i, byte) in record.iter_mut().enumerate() {
            *byte = i as u8;
        }
        assert_eq!(compute(&record), 0xB4AE);
        assert_eq!(compute_wire(&record), 0xE953);
    }

    #[test]
    fn test_lock_and_checksum_bytes_ignored() {
        let mut record = [0x5Au8; CELL_SIZE];
        let reference = compute(&record);
        record[0] = 0xFF;
        record[1] = 0x01;
        record[2] = 0x33;
        record[3] = 0x44;
        assert_eq!(compute(&record), reference);
    }

    #[test]
    fn test_wire_ignores_id() {
        let mut record = [0u8; CELL_SIZE];
        record[40] = 7;
        let live = compute(&record);
        record[4..8].copy_from_slice(&1234u32.to_le_bytes());
        assert_eq!(compute_wire(&record), live);
        assert_ne!(compute(&record), live);
    }

    #[test]
    fn test_every_bit_matters() {
        let record = [0u8; CELL_SIZE];
        let reference = compute(&record);
        for byte in 4..CELL_SIZE {
            for bit in 0..8 {
                let mut flipped = record;
                flipped[byte] ^= 1 << bit;
                assert_ne!(compute(&flipped), reference, "byte {} bit {}", byte, bit);
            }
        }
    }
}
