//! Integers composed of two halves
//!
//! Cells store 256-bit integers as a low and a high limb. The value is
//! `hi * 2^bits(lo) + lo` with the low limb always unsigned; the high
//! limb carries the sign.

use std::cmp::Ordering;
use std::fmt;

/// Native integer usable as one half of a [`DoubleInteger`]
pub trait Limb: Copy + Eq + Ord + Default + fmt::Debug {
    /// Number of 64-bit words in the limb
    const WORDS: usize;
    const SIGNED: bool;

    /// Raw two's complement words, least significant first
    fn to_words(self) -> [u64; 2];

    /// Inverse of [`Limb::to_words`], ignoring words beyond `WORDS`
    fn from_words(words: &[u64]) -> Self;

    fn is_negative(self) -> bool {
        Self::SIGNED && self.to_words()[Self::WORDS - 1] >> 63 == 1
    }
}

macro_rules! impl_limb {
    ($ty:ty, $unsigned:ty, $signed:expr) => {
        impl Limb for $ty {
            const WORDS: usize = std::mem::size_of::<$ty>() / 8;
            const SIGNED: bool = $signed;

            fn to_words(self) -> [u64; 2] {
                let bits = (self as $unsigned) as u128;
                [bits as u64, (bits >> 64) as u64]
            }

            fn from_words(words: &[u64]) -> Self {
                let lo = words.first().copied().unwrap_or(0) as u128;
                let hi = if Self::WORDS > 1 {
                    words.get(1).copied().unwrap_or(0) as u128
                } else {
                    0
                };
                ((lo | (hi << 64)) as $unsigned) as $ty
            }
        }
    };
}

impl_limb!(u64, u64, false);
impl_limb!(i64, u64, true);
impl_limb!(u128, u128, false);
impl_limb!(i128, u128, true);

/// Two-limb integer
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct DoubleInteger<Lo: Limb, Hi: Limb> {
    pub lo: Lo,
    pub hi: Hi,
}

/// Signed 256-bit integer
pub type I256 = DoubleInteger<u128, i128>;

/// Unsigned 256-bit integer
pub type U256 = DoubleInteger<u128, u128>;

const MAX_WORDS: usize = 4;

impl<Lo: Limb, Hi: Limb> DoubleInteger<Lo, Hi> {
    /// Size in bytes
    pub const BYTES: usize = (Lo::WORDS + Hi::WORDS) * 8;

    pub const fn new(lo: Lo, hi: Hi) -> Self {
        DoubleInteger { lo, hi }
    }

    pub fn is_negative(&self) -> bool {
        self.hi.is_negative()
    }

    pub fn is_zero(&self) -> bool {
        self.words().iter().all(|&w| w == 0)
    }

    /// Two's complement words sign extended to 256 bits
    fn words(&self) -> [u64; MAX_WORDS] {
        let fill = if self.is_negative() { u64::MAX } else { 0 };
        let mut words = [fill; MAX_WORDS];
        let lo = self.lo.to_words();
        let hi = self.hi.to_words();
        words[..Lo::WORDS].copy_from_slice(&lo[..Lo::WORDS]);
        words[Lo::WORDS..Lo::WORDS + Hi::WORDS].copy_from_slice(&hi[..Hi::WORDS]);
        words
    }

    fn from_words(words: &[u64; MAX_WORDS]) -> Self {
        DoubleInteger {
            lo: Lo::from_words(&words[..Lo::WORDS]),
            hi: Hi::from_words(&words[Lo::WORDS..]),
        }
    }

    /// Read from little endian bytes; `None` if `bytes` is too short
    pub fn from_le_slice(bytes: &[u8]) -> Option<Self> {
        let bytes = bytes.get(..Self::BYTES)?;
        let mut words = [0u64; MAX_WORDS];
        for (word, chunk) in words.iter_mut().zip(bytes.chunks_exact(8)) {
            let mut raw = [0u8; 8];
            raw.copy_from_slice(chunk);
            *word = u64::from_le_bytes(raw);
        }
        Some(Self::from_words(&words))
    }

    /// Write little endian bytes into the first `BYTES` of `out`
    ///
    /// Returns the number of bytes written, 0 if `out` is too short.
    pub fn write_le(&self, out: &mut [u8]) -> usize {
        let Some(out) = out.get_mut(..Self::BYTES) else {
            return 0;
        };
        let words = self.words();
        for (chunk, word) in out.chunks_exact_mut(8).zip(words.iter()) {
            chunk.copy_from_slice(&word.to_le_bytes());
        }
        Self::BYTES
    }

    pub fn from_i128(value: i128) -> Self {
        let fill = if value < 0 { u64::MAX } else { 0 };
        Self::from_words(&[value as u64, (value >> 64) as u64, fill, fill])
    }

    pub fn from_u128(value: u128) -> Self {
        Self::from_words(&[value as u64, (value >> 64) as u64, 0, 0])
    }

    /// Narrow to `i128` if the value fits
    pub fn to_i128(&self) -> Option<i128> {
        let words = self.words();
        let fill = if self.is_negative() { u64::MAX } else { 0 };
        let top_bit_matches = (words[1] >> 63 == 1) == self.is_negative();
        if words[2] == fill && words[3] == fill && top_bit_matches {
            Some(((words[1] as u128) << 64 | words[0] as u128) as i128)
        } else {
            None
        }
    }

    /// Narrow to `u128` if the value fits
    pub fn to_u128(&self) -> Option<u128> {
        let words = self.words();
        if !self.is_negative() && words[2] == 0 && words[3] == 0 {
            Some((words[1] as u128) << 64 | words[0] as u128)
        } else {
            None
        }
    }

    /// Absolute value as words, least significant first
    fn magnitude(&self) -> [u64; MAX_WORDS] {
        let mut words = self.words();
        if self.is_negative() {
            let mut carry = true;
            for word in words.iter_mut() {
                let (inverted, overflow) = (!*word).overflowing_add(carry as u64);
                *word = inverted;
                carry = overflow;
            }
        }
        words
    }

    pub fn to_f64(&self) -> f64 {
        let magnitude = self
            .magnitude()
            .iter()
            .rev()
            .fold(0.0f64, |acc, &w| acc * 18_446_744_073_709_551_616.0 + w as f64);
        if self.is_negative() {
            -magnitude
        } else {
            magnitude
        }
    }
}

fn divide_by(words: &mut [u64; MAX_WORDS], divisor: u64) -> u64 {
    let mut remainder: u128 = 0;
    for word in words.iter_mut().rev() {
        let current = (remainder << 64) | *word as u128;
        *word = (current / divisor as u128) as u64;
        remainder = current % divisor as u128;
    }
    remainder as u64
}

impl<Lo: Limb, Hi: Limb> Ord for DoubleInteger<Lo, Hi> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.hi.cmp(&other.hi).then(self.lo.cmp(&other.lo))
    }
}

impl<Lo: Limb, Hi: Limb> PartialOrd for DoubleInteger<Lo, Hi> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<Lo: Limb, Hi: Limb> fmt::Display for DoubleInteger<Lo, Hi> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const CHUNK: u64 = 10_000_000_000_000_000_000;

        let mut words = self.magnitude();
        let mut chunks = Vec::with_capacity(5);
        loop {
            chunks.push(divide_by(&mut words, CHUNK));
            if words.iter().all(|&w| w == 0) {
                break;
            }
        }

        let mut digits = String::with_capacity(chunks.len() * 19);
        let mut iter = chunks.iter().rev();
        if let Some(first) = iter.next() {
            digits.push_str(&first.to_string());
        }
        for chunk in iter {
            digits.push_str(&format!("{:019}", chunk));
        }
        f.pad_integral(!self.is_negative(), "", &digits)
    }
}

impl<Lo: Limb, Hi: Limb> fmt::Debug for DoubleInteger<Lo, Hi> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout() {
        assert_eq!(I256::BYTES, 32);
        assert_eq!(U256::BYTES, 32);
        assert_eq!(DoubleInteger::<u64, i64>::BYTES, 16);
    }

    #[test]
    fn test_bytes_round_trip() {
        let mut bytes = [0u8; 32];
        bytes[0] = 0x01;
        bytes[31] = 0x80;
        let value = I256::from_le_slice(&bytes).unwrap();
        assert!(value.is_negative());
        let mut out = [0u8; 32];
        assert_eq!(value.write_le(&mut out), 32);
        assert_eq!(out, bytes);
        assert!(I256::from_le_slice(&bytes[..31]).is_none());
    }

    #[test]
    fn test_narrowing() {
        assert_eq!(I256::from_i128(-5).to_i128(), Some(-5));
        assert_eq!(I256::from_i128(-5).to_u128(), None);
        assert_eq!(I256::from_i128(i128::MIN).to_i128(), Some(i128::MIN));
        assert_eq!(U256::from_u128(u128::MAX).to_u128(), Some(u128::MAX));
        assert_eq!(U256::from_u128(u128::MAX).to_i128(), None);
        assert_eq!(U256::new(0, 1).to_u128(), None);
        assert_eq!(DoubleInteger::<u64, i64>::from_i128(-1).to_i128(), Some(-1));
    }

    #[test]
    fn test_display() {
        assert_eq!(I256::from_i128(-42).to_string(), "-42");
        assert_eq!(U256::default().to_string(), "0");
        assert_eq!(
            U256::new(0, 1).to_string(),
            "340282366920938463463374607431768211456"
        );
        assert_eq!(
            U256::from_u128(u128::MAX).to_string(),
            u128::MAX.to_string()
        );
    }

    #[test]
    fn test_to_f64() {
        assert_eq!(I256::from_i128(-3).to_f64(), -3.0);
        assert_eq!(U256::new(0, 1).to_f64(), 2f64.powi(128));
    }

    #[test]
    fn test_ordering() {
        assert!(I256::from_i128(-1) < I256::from_i128(0));
        assert!(I256::from_i128(1) < I256::new(0, 1));
    }
}
